//! Labels, label values and label paths.

use crate::feature::{FeatureCategory, FeatureId};
use crate::geometry::Polygon;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Marks a label whose only value came from one user-drawn region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelType {
    Region,
}

/// One labeled occurrence: text plus normalized boxes on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelValue {
    pub page: u32,
    pub text: String,
    pub bounding_boxes: Vec<Polygon>,
}

impl LabelValue {
    /// Anchor used to look the value up in the reading order.
    pub fn anchor(&self) -> Option<FeatureId> {
        self.bounding_boxes
            .first()
            .map(|polygon| FeatureId::from_polygon(polygon, self.page))
    }

    fn top_left(&self) -> (f64, f64) {
        self.bounding_boxes
            .first()
            .map(|polygon| {
                let p = polygon.top_left();
                (p.y, p.x)
            })
            .unwrap_or((f64::INFINITY, f64::INFINITY))
    }
}

/// A persisted assignment of values to a field path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub label: String,
    pub value: Vec<LabelValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_type: Option<LabelType>,
}

impl Label {
    pub fn is_region(&self) -> bool {
        self.label_type == Some(LabelType::Region)
    }

    /// Page of the first value, if any.
    pub fn page(&self) -> Option<u32> {
        self.value.first().map(|v| v.page)
    }

    /// Decoded top-level field key.
    pub fn field_key(&self) -> String {
        field_key_of(&self.label)
    }
}

/// Label lists of every document, keyed by document name.
pub type DocumentLabels = HashMap<String, Vec<Label>>;

/// A selected feature projected into a label value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelValueCandidate {
    pub bounding_boxes: Vec<Polygon>,
    pub page: u32,
    pub text: String,
    pub category: FeatureCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub already_assigned_label: Option<String>,
}

impl From<&LabelValueCandidate> for LabelValue {
    fn from(candidate: &LabelValueCandidate) -> Self {
        Self {
            page: candidate.page,
            text: candidate.text.clone(),
            bounding_boxes: candidate.bounding_boxes.clone(),
        }
    }
}

/// Encode one path segment: `%` as `%25`, `/` as `%2F`.
pub fn encode_label_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of [`encode_label_segment`]. Unknown escapes are kept verbatim.
pub fn decode_label_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("%25") {
            out.push('%');
            rest = &tail[3..];
        } else if tail.starts_with("%2F") || tail.starts_with("%2f") {
            out.push('/');
            rest = &tail[3..];
        } else {
            out.push('%');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Build a label path from raw segment names.
pub fn make_label_path<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| encode_label_segment(s.as_ref()))
        .collect::<Vec<_>>()
        .join("/")
}

/// Split a label path into decoded segments.
pub fn split_label_path(path: &str) -> Vec<String> {
    path.split('/').map(decode_label_segment).collect()
}

/// Decoded top-level field key of a label path.
pub fn field_key_of(path: &str) -> String {
    decode_label_segment(path.split('/').next().unwrap_or_default())
}

/// Decoded segment at `index`, if present.
pub fn path_segment(path: &str, index: usize) -> Option<String> {
    path.split('/').nth(index).map(decode_label_segment)
}

/// Replace the segment at `index` with `new_name` (encoded).
pub fn replace_path_segment(path: &str, index: usize, new_name: &str) -> String {
    let mut segments: Vec<String> = path.split('/').map(str::to_string).collect();
    if let Some(segment) = segments.get_mut(index) {
        *segment = encode_label_segment(new_name);
    }
    segments.join("/")
}

/// Per-document reading order: value anchor to rank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionOrders {
    ranks: HashMap<FeatureId, usize>,
}

impl RegionOrders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an anchor with the next rank. Existing anchors keep their rank.
    pub fn push(&mut self, id: FeatureId) {
        let next = self.ranks.len();
        self.ranks.entry(id).or_insert(next);
    }

    pub fn rank(&self, value: &LabelValue) -> Option<usize> {
        self.ranks.get(&value.anchor()?).copied()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

/// Reading-order comparison of two label values.
///
/// Ranked values come first in rank order. Values without a rank follow,
/// ordered by the top edge and then the left edge of their first box.
pub fn compare_order(a: &LabelValue, b: &LabelValue, orders: Option<&RegionOrders>) -> Ordering {
    let rank_a = orders.and_then(|o| o.rank(a));
    let rank_b = orders.and_then(|o| o.rank(b));
    match (rank_a, rank_b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => {
            let (ta, la) = a.top_left();
            let (tb, lb) = b.top_left();
            ta.total_cmp(&tb).then(la.total_cmp(&lb))
        }
    }
}

/// Sort values in reading order.
pub fn sort_values(values: &mut [LabelValue], orders: Option<&RegionOrders>) {
    values.sort_by(|a, b| compare_order(a, b, orders));
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;

    fn value_at(x: f64, y: f64) -> LabelValue {
        LabelValue {
            page: 1,
            text: format!("{x},{y}"),
            bounding_boxes: vec![Polygon::from_rect(Rect::new(x, y, x + 0.05, y + 0.02))],
        }
    }

    #[test]
    fn test_segment_encoding() {
        assert_eq!(encode_label_segment("a/b%c"), "a%2Fb%25c");
        assert_eq!(decode_label_segment("a%2Fb%25c"), "a/b%c");
        assert_eq!(decode_label_segment("%252F"), "%2F");
        assert_eq!(decode_label_segment("100%"), "100%");
        for raw in ["plain", "a/b", "%", "%2F", "x%/y"] {
            assert_eq!(decode_label_segment(&encode_label_segment(raw)), raw);
        }
    }

    #[test]
    fn test_path_helpers() {
        let path = make_label_path(&["Unit/Price", "0", "Amount"]);
        assert_eq!(path, "Unit%2FPrice/0/Amount");
        assert_eq!(field_key_of(&path), "Unit/Price");
        assert_eq!(path_segment(&path, 2).as_deref(), Some("Amount"));
        assert_eq!(path_segment(&path, 3), None);
        assert_eq!(replace_path_segment(&path, 0, "Cost/Unit"), "Cost%2FUnit/0/Amount");
        assert_eq!(split_label_path(&path), vec!["Unit/Price", "0", "Amount"]);
    }

    #[test]
    fn test_sort_by_rank() {
        let values = [value_at(0.1, 0.1), value_at(0.2, 0.1), value_at(0.3, 0.1)];
        let mut orders = RegionOrders::new();
        // Reading order: second, third, first
        orders.push(values[1].anchor().unwrap());
        orders.push(values[2].anchor().unwrap());
        orders.push(values[0].anchor().unwrap());

        let mut shuffled = vec![values[0].clone(), values[1].clone(), values[2].clone()];
        sort_values(&mut shuffled, Some(&orders));
        assert_eq!(shuffled, vec![values[1].clone(), values[2].clone(), values[0].clone()]);
    }

    #[test]
    fn test_unranked_fall_back_to_position() {
        let mut values = vec![value_at(0.5, 0.3), value_at(0.1, 0.3), value_at(0.9, 0.1)];
        sort_values(&mut values, None);
        let texts: Vec<&str> = values.iter().map(|v| v.text.as_str()).collect();
        assert_eq!(texts, vec!["0.9,0.1", "0.1,0.3", "0.5,0.3"]);
    }

    #[test]
    fn test_label_serde_shape() {
        let label = Label {
            label: "Total".into(),
            value: vec![value_at(0.1, 0.1)],
            label_type: Some(LabelType::Region),
        };
        let json = serde_json::to_value(&label).unwrap();
        assert_eq!(json["labelType"], "region");
        assert_eq!(json["value"][0]["boundingBoxes"][0].as_array().unwrap().len(), 8);

        let plain: Label = serde_json::from_str(
            r#"{"label": "Name", "value": [{"page": 2, "text": "Ada", "boundingBoxes": [[0,0,1,0,1,1,0,1]]}]}"#,
        )
        .unwrap();
        assert!(!plain.is_region());
        assert_eq!(plain.page(), Some(2));
    }
}
