//! Tunables for the labeling surface.

use serde::{Deserialize, Serialize};

/// Geometry of the inline label menu relative to the pointer, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuLayout {
    pub height: f64,
    pub shift_x: f64,
    /// Offset when the menu opens below the pointer.
    pub down_shift_y: f64,
    /// Offset when the menu opens above the pointer.
    pub up_shift_y: f64,
    /// Space kept free under the menu before it flips above the pointer.
    pub bottom_offset: f64,
}

impl Default for MenuLayout {
    fn default() -> Self {
        Self {
            height: 180.0,
            shift_x: -125.0,
            down_shift_y: 10.0,
            up_shift_y: -30.0,
            bottom_offset: 20.0,
        }
    }
}

/// Labeling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    /// Vertex snap radius in screen pixels.
    pub snap_tolerance_px: f64,
    /// Drawn regions narrower or shorter than this (image pixels) are discarded.
    pub min_region_size: f64,
    /// Load recognized lines as OCR-proposal features.
    pub show_ocr_proposals: bool,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Zoom factor applied per scroll notch.
    pub zoom_step: f64,
    pub menu: MenuLayout,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            snap_tolerance_px: 10.0,
            min_region_size: 1.0,
            show_ocr_proposals: false,
            min_zoom: 0.1,
            max_zoom: 10.0,
            zoom_step: 1.1,
            menu: MenuLayout::default(),
        }
    }
}

impl LabelingConfig {
    /// Parse from JSON; missing keys fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
