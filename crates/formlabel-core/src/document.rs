//! Documents being labeled and the loader that renders their pages.

use crate::storage::{BoxFuture, StorageResult};
use kurbo::Size;
use serde::{Deserialize, Serialize};

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentMimeType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "application/pdf")]
    Pdf,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/tiff")]
    Tiff,
    #[serde(rename = "unknown")]
    Unknown,
}

impl DocumentMimeType {
    /// Guess the type from a file extension.
    pub fn from_path(path: &str) -> Self {
        let extension = path.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Self::Pdf,
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "tif" | "tiff" => Self::Tiff,
            _ => Self::Unknown,
        }
    }
}

/// Whether a stored file is a document that can be labeled.
pub fn is_supported_file(path: &str) -> bool {
    path.contains('.') && DocumentMimeType::from_path(path) != DocumentMimeType::Unknown
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    Loading,
    Loaded,
    Analyzing,
    Analyzed,
    AnalyzeFailed,
    Labeled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStates {
    pub loading_status: DocumentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzing_status: Option<DocumentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labeling_status: Option<DocumentStatus>,
}

impl Default for DocumentStates {
    fn default() -> Self {
        Self {
            loading_status: DocumentStatus::Loading,
            analyzing_status: None,
            labeling_status: None,
        }
    }
}

/// A stored file known to be a document, before its metadata is loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: DocumentMimeType,
    pub url: String,
}

impl RawDocument {
    /// Describe the stored file at `path`. The name is its last path segment.
    pub fn from_path(path: &str) -> Self {
        Self {
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            mime_type: DocumentMimeType::from_path(path),
            url: path.to_string(),
        }
    }
}

/// Page count and thumbnail produced by a [`DocumentLoader`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    pub num_pages: u32,
    pub thumbnail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: DocumentMimeType,
    pub url: String,
    pub thumbnail: String,
    pub num_pages: u32,
    /// 1-based.
    pub current_page: u32,
    pub states: DocumentStates,
}

impl Document {
    pub fn new(raw: RawDocument, meta: DocumentMeta) -> Self {
        Self {
            name: raw.name,
            mime_type: raw.mime_type,
            url: raw.url,
            thumbnail: meta.thumbnail,
            num_pages: meta.num_pages.max(1),
            current_page: 1,
            states: DocumentStates {
                loading_status: DocumentStatus::Loaded,
                ..DocumentStates::default()
            },
        }
    }

    pub fn raw(&self) -> RawDocument {
        RawDocument {
            name: self.name.clone(),
            mime_type: self.mime_type,
            url: self.url.clone(),
        }
    }

    pub fn has_page(&self, page: u32) -> bool {
        (1..=self.num_pages).contains(&page)
    }
}

/// A rendered page: image location, pixel size and rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCanvas {
    pub image_url: String,
    pub width: f64,
    pub height: f64,
    /// Clockwise rotation in degrees.
    #[serde(default)]
    pub angle: f64,
}

impl PageCanvas {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Renders documents. Rasterization is out of scope for this crate; hosts
/// plug in their own loader.
pub trait DocumentLoader: Send + Sync {
    fn load_document_meta(&self, document: &RawDocument) -> BoxFuture<'_, StorageResult<DocumentMeta>>;

    /// Render the 1-based `page`.
    fn load_document_page(
        &self,
        document: &RawDocument,
        page: u32,
    ) -> BoxFuture<'_, StorageResult<PageCanvas>>;
}
