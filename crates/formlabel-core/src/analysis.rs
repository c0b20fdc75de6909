//! Layout analysis results consumed from the OCR service.

use crate::feature::FeatureId;
use crate::geometry::Polygon;
use crate::label::RegionOrders;
use kurbo::Size;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMarkState {
    Selected,
    Unselected,
}

impl SelectionMarkState {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionMarkState::Selected => "selected",
            SelectionMarkState::Unselected => "unselected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub content: String,
    /// Polygon in page units.
    pub polygon: Polygon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub content: String,
    pub polygon: Polygon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionMark {
    pub state: SelectionMarkState,
    pub polygon: Polygon,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// One analyzed page. Polygons are in page units (`unit`), origin top-left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedPage {
    pub page_number: u32,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub angle: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default)]
    pub words: Vec<Word>,
    #[serde(default)]
    pub lines: Vec<Line>,
    #[serde(default)]
    pub selection_marks: Vec<SelectionMark>,
}

impl AnalyzedPage {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Page-unit polygon to fractions of the page.
    pub fn normalize(&self, polygon: &Polygon) -> Polygon {
        polygon.normalize(self.size())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default)]
    pub pages: Vec<AnalyzedPage>,
}

impl AnalyzeResult {
    pub fn page(&self, page_number: u32) -> Option<&AnalyzedPage> {
        self.pages.iter().find(|p| p.page_number == page_number)
    }

    /// Reading order over the whole document.
    ///
    /// Pages in page-number order; within a page words, then selection
    /// marks, then lines.
    pub fn region_orders(&self) -> RegionOrders {
        let mut pages: Vec<&AnalyzedPage> = self.pages.iter().collect();
        pages.sort_by_key(|p| p.page_number);

        let mut orders = RegionOrders::new();
        for page in pages {
            let anchor = |polygon: &Polygon| {
                FeatureId::from_polygon(&page.normalize(polygon), page.page_number)
            };
            for word in &page.words {
                orders.push(anchor(&word.polygon));
            }
            for mark in &page.selection_marks {
                orders.push(anchor(&mark.polygon));
            }
            for line in &page.lines {
                orders.push(anchor(&line.polygon));
            }
        }
        orders
    }
}

/// Stored analysis file: `<document>.ocr.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub analyze_result: AnalyzeResult,
}
