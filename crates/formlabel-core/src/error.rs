//! Error types for the label and schema engines.

use crate::feature::FeatureCategory;
use crate::schema::FieldType;
use crate::storage::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while decoding a stored schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Array field {0} has no itemType")]
    MissingItemType(String),
    #[error("Object field {0} has no child fields")]
    MissingFields(String),
    #[error("Field {0} cannot be used as a table cell template")]
    InvalidReference(String),
}

/// Errors raised by label assignment and schema mutation.
///
/// On any error the in-memory state is left unchanged.
#[derive(Debug, Error)]
pub enum LabelError {
    #[error("Field {label} of type {field_type} cannot hold a {category:?} region")]
    IncompatibleFieldType {
        label: String,
        field_type: FieldType,
        category: FeatureCategory,
    },

    #[error(
        "Cross-page labeling is not supported: {label} already has values on page {existing_page}, new values are on page {page}"
    )]
    CrossPage {
        label: String,
        existing_page: u32,
        page: u32,
    },

    #[error("A field named {0} already exists")]
    DuplicateField(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Invariant violated: {0}")]
    Invariant(String),
}

impl LabelError {
    /// Short name shown as the error title.
    pub fn name(&self) -> &str {
        match self {
            LabelError::IncompatibleFieldType { .. } => "Invalid field type",
            LabelError::CrossPage { .. } => "Cross-page label error",
            LabelError::DuplicateField(_) => "Duplicate field",
            LabelError::Storage(e) => e.code(),
            LabelError::Schema(_) => "SchemaError",
            LabelError::Invariant(_) => "InvariantViolation",
        }
    }

    /// Whether this is a user-facing validation failure rather than a fault.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LabelError::IncompatibleFieldType { .. }
                | LabelError::CrossPage { .. }
                | LabelError::DuplicateField(_)
        )
    }

    pub fn to_info(&self) -> ErrorInfo {
        ErrorInfo {
            name: self.name().to_string(),
            message: self.to_string(),
        }
    }
}

/// Serializable error summary kept in the published state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub name: String,
    pub message: String,
}

/// Result type for label and schema operations.
pub type LabelResult<T> = Result<T, LabelError>;

/// Log and build an invariant violation.
pub(crate) fn invariant(message: impl Into<String>) -> LabelError {
    let message = message.into();
    log::error!("Invariant violated: {}", message);
    LabelError::Invariant(message)
}
