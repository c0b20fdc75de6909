//! On-surface features and their content-addressed identifiers.

use crate::geometry::Polygon;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Namespace for feature identifiers.
const FEATURE_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a4e_8b3d_4f57_9a61_0c2e_7d94_b3a8);

/// What kind of content a feature represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureCategory {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "checkbox")]
    Checkbox,
    #[serde(rename = "label")]
    Label,
    #[serde(rename = "region")]
    DrawnRegion,
}

/// Deterministic feature identifier.
///
/// Derived from the normalized polygon and page number only, so the same
/// region on the same page always maps to the same id regardless of which
/// layer or session produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(Uuid);

impl FeatureId {
    pub fn from_polygon(normalized: &Polygon, page: u32) -> Self {
        Self(Uuid::new_v5(
            &FEATURE_NAMESPACE,
            canonical_key(normalized, page).as_bytes(),
        ))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical string form `x0,y0,...:page` with coordinates at 6 decimals.
pub fn canonical_key(normalized: &Polygon, page: u32) -> String {
    let coords: Vec<String> = normalized
        .to_flat()
        .into_iter()
        // `+ 0.0` folds -0.0 into 0.0
        .map(|c| format!("{:.6}", c + 0.0))
        .collect();
    format!("{}:{}", coords.join(","), page)
}

/// A geometric region shown on the page surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    /// Polygon in image pixels.
    pub geometry: Polygon,
    /// Polygon as fractions of the page size.
    pub bounding_box: Polygon,
    pub category: FeatureCategory,
    pub page: u32,
    pub text: String,
    pub assigned_label: Option<String>,
    pub selected: bool,
    pub highlighted: bool,
    pub is_ocr_proposal: bool,
}

impl Feature {
    /// Create a feature from a pixel polygon on a page of the given size.
    pub fn from_pixels(
        category: FeatureCategory,
        geometry: Polygon,
        page_size: Size,
        page: u32,
    ) -> Self {
        let bounding_box = geometry.normalize(page_size);
        Self::build(category, geometry, bounding_box, page)
    }

    /// Create a feature from a normalized polygon on a page of the given size.
    pub fn from_normalized(
        category: FeatureCategory,
        bounding_box: Polygon,
        page_size: Size,
        page: u32,
    ) -> Self {
        let geometry = bounding_box.denormalize(page_size);
        Self::build(category, geometry, bounding_box, page)
    }

    fn build(category: FeatureCategory, geometry: Polygon, bounding_box: Polygon, page: u32) -> Self {
        Self {
            id: FeatureId::from_polygon(&bounding_box, page),
            geometry,
            bounding_box,
            category,
            page,
            text: String::new(),
            assigned_label: None,
            selected: false,
            highlighted: false,
            is_ocr_proposal: false,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.assigned_label = Some(label.into());
        self
    }

    pub fn as_ocr_proposal(mut self) -> Self {
        self.is_ocr_proposal = true;
        self
    }

    /// Recompute the normalized box and id after the pixel geometry changed.
    ///
    /// Returns the previous id.
    pub fn refresh(&mut self, page_size: Size) -> FeatureId {
        let old = self.id;
        self.bounding_box = self.geometry.normalize(page_size);
        self.id = FeatureId::from_polygon(&self.bounding_box, self.page);
        old
    }
}
