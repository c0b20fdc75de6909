//! Layered store of on-surface features.
//!
//! Features are partitioned into role-tagged layers. Drawn content (the
//! drawn-region layer, and the drawn-region-label layer while visible) is
//! mirrored into a shared editable collection, which is the only set of
//! features vertex modification and snapping operate on.

use crate::analysis::AnalyzedPage;
use crate::feature::{Feature, FeatureCategory, FeatureId};
use crate::label::Label;
use kurbo::{Point, Rect, Size};
use std::collections::HashMap;

/// Role of a feature layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    /// Recognized words.
    Text,
    /// Recognized selection marks.
    Checkbox,
    /// Recognized lines offered as label proposals.
    Pod,
    /// Committed labels.
    Label,
    /// User-drawn regions not yet committed.
    DrawnRegion,
    /// Committed region labels.
    DrawnRegionLabel,
}

impl Layer {
    pub const ALL: [Layer; 6] = [
        Layer::Text,
        Layer::Checkbox,
        Layer::Pod,
        Layer::Label,
        Layer::DrawnRegion,
        Layer::DrawnRegionLabel,
    ];

    /// Order in which a pointer hit is resolved; the first layer with a hit wins.
    pub const HIT_PRIORITY: [Layer; 6] = [
        Layer::Label,
        Layer::Checkbox,
        Layer::Text,
        Layer::Pod,
        Layer::DrawnRegion,
        Layer::DrawnRegionLabel,
    ];

    /// Category reported for selections made on this layer.
    pub fn category(self) -> FeatureCategory {
        match self {
            Layer::Text => FeatureCategory::Text,
            Layer::Checkbox => FeatureCategory::Checkbox,
            Layer::Pod | Layer::Label => FeatureCategory::Label,
            Layer::DrawnRegion | Layer::DrawnRegionLabel => FeatureCategory::DrawnRegion,
        }
    }

    pub fn is_drawn(self) -> bool {
        matches!(self, Layer::DrawnRegion | Layer::DrawnRegionLabel)
    }

    fn index(self) -> usize {
        match self {
            Layer::Text => 0,
            Layer::Checkbox => 1,
            Layer::Pod => 2,
            Layer::Label => 3,
            Layer::DrawnRegion => 4,
            Layer::DrawnRegionLabel => 5,
        }
    }
}

#[derive(Debug, Clone)]
struct LayerData {
    features: HashMap<FeatureId, Feature>,
    order: Vec<FeatureId>,
    visible: bool,
}

impl Default for LayerData {
    fn default() -> Self {
        Self {
            features: HashMap::new(),
            order: Vec::new(),
            visible: true,
        }
    }
}

/// Canonical set of features on the current page.
#[derive(Debug, Clone)]
pub struct FeatureStore {
    layers: [LayerData; 6],
    editable: Vec<(Layer, FeatureId)>,
    page_size: Size,
}

impl Default for FeatureStore {
    fn default() -> Self {
        Self::new(Size::ZERO)
    }
}

impl FeatureStore {
    /// Create an empty store for a page image of the given pixel size.
    pub fn new(page_size: Size) -> Self {
        Self {
            layers: Default::default(),
            editable: Vec::new(),
            page_size,
        }
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: Size) {
        self.page_size = page_size;
    }

    fn layer(&self, layer: Layer) -> &LayerData {
        &self.layers[layer.index()]
    }

    fn layer_mut(&mut self, layer: Layer) -> &mut LayerData {
        &mut self.layers[layer.index()]
    }

    fn joins_editable(&self, layer: Layer) -> bool {
        match layer {
            Layer::DrawnRegion => true,
            Layer::DrawnRegionLabel => self.layer(layer).visible,
            _ => false,
        }
    }

    /// Add a feature. An existing feature with the same id is replaced and returned.
    pub fn add(&mut self, layer: Layer, feature: Feature) -> Option<Feature> {
        let id = feature.id;
        let data = &mut self.layers[layer.index()];
        let previous = data.features.insert(id, feature);
        if previous.is_some() {
            log::debug!("Replacing feature {} on {:?}", id, layer);
        } else {
            data.order.push(id);
        }
        if self.joins_editable(layer) && !self.editable.contains(&(layer, id)) {
            self.editable.push((layer, id));
        }
        previous
    }

    pub fn add_many(&mut self, layer: Layer, features: impl IntoIterator<Item = Feature>) {
        for feature in features {
            self.add(layer, feature);
        }
    }

    pub fn remove(&mut self, layer: Layer, id: FeatureId) -> Option<Feature> {
        let data = self.layer_mut(layer);
        let removed = data.features.remove(&id)?;
        data.order.retain(|other| *other != id);
        self.editable.retain(|entry| *entry != (layer, id));
        Some(removed)
    }

    pub fn remove_many(&mut self, layer: Layer, ids: &[FeatureId]) -> Vec<Feature> {
        ids.iter().filter_map(|id| self.remove(layer, *id)).collect()
    }

    pub fn get(&self, layer: Layer, id: FeatureId) -> Option<&Feature> {
        self.layer(layer).features.get(&id)
    }

    pub fn get_mut(&mut self, layer: Layer, id: FeatureId) -> Option<&mut Feature> {
        self.layer_mut(layer).features.get_mut(&id)
    }

    pub fn contains(&self, layer: Layer, id: FeatureId) -> bool {
        self.layer(layer).features.contains_key(&id)
    }

    /// Features of a layer in insertion order.
    pub fn features(&self, layer: Layer) -> impl Iterator<Item = &Feature> {
        let data = self.layer(layer);
        data.order.iter().filter_map(|id| data.features.get(id))
    }

    pub fn len(&self, layer: Layer) -> usize {
        self.layer(layer).features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|data| data.features.is_empty())
    }

    pub fn clear_layer(&mut self, layer: Layer) {
        let data = self.layer_mut(layer);
        data.features.clear();
        data.order.clear();
        self.editable.retain(|(l, _)| *l != layer);
    }

    pub fn clear(&mut self) {
        for layer in Layer::ALL {
            self.clear_layer(layer);
        }
    }

    /// Ids of features on `layer` whose polygon contains the pixel point.
    pub fn features_at_point(&self, layer: Layer, point: Point) -> Vec<FeatureId> {
        self.features(layer)
            .filter(|f| f.geometry.contains(point))
            .map(|f| f.id)
            .collect()
    }

    /// Ids of features on `layer` overlapping the pixel rectangle.
    pub fn features_in_rect(&self, layer: Layer, rect: Rect) -> Vec<FeatureId> {
        self.features(layer)
            .filter(|f| f.geometry.intersects_rect(rect))
            .map(|f| f.id)
            .collect()
    }

    pub fn is_visible(&self, layer: Layer) -> bool {
        self.layer(layer).visible
    }

    /// Show or hide a layer. Hiding the drawn-region-label layer also takes
    /// its features out of the editable collection.
    pub fn set_visible(&mut self, layer: Layer, visible: bool) {
        self.layer_mut(layer).visible = visible;
        if layer != Layer::DrawnRegionLabel {
            return;
        }
        if visible {
            let ids: Vec<FeatureId> = self.layer(layer).order.clone();
            for id in ids {
                if !self.editable.contains(&(layer, id)) {
                    self.editable.push((layer, id));
                }
            }
        } else {
            self.editable.retain(|(l, _)| *l != layer);
        }
    }

    /// The actively editable features.
    pub fn editable(&self) -> impl Iterator<Item = (Layer, &Feature)> {
        self.editable
            .iter()
            .filter_map(|(layer, id)| self.get(*layer, *id).map(|f| (*layer, f)))
    }

    pub fn is_editable(&self, layer: Layer, id: FeatureId) -> bool {
        self.editable.contains(&(layer, id))
    }

    /// Recompute a feature's normalized box and id from its pixel geometry.
    ///
    /// The feature keeps its position in the layer and in the editable
    /// collection. If the new id collides with another feature on the same
    /// layer, the refreshed feature replaces it. Returns the new id.
    pub fn refresh_feature(&mut self, layer: Layer, id: FeatureId) -> Option<FeatureId> {
        let page_size = self.page_size;
        let data = &mut self.layers[layer.index()];
        let mut feature = data.features.remove(&id)?;
        feature.refresh(page_size);
        let new_id = feature.id;

        if new_id != id {
            if data.features.remove(&new_id).is_some() {
                log::debug!("Feature {} replaced by refreshed {} on {:?}", new_id, id, layer);
                data.order.retain(|other| *other != new_id);
                self.editable.retain(|entry| *entry != (layer, new_id));
            }
            for slot in data.order.iter_mut().filter(|slot| **slot == id) {
                *slot = new_id;
            }
            for entry in self.editable.iter_mut().filter(|entry| **entry == (layer, id)) {
                entry.1 = new_id;
            }
        }
        data.features.insert(new_id, feature);
        Some(new_id)
    }

    pub fn set_selected(&mut self, layer: Layer, id: FeatureId, selected: bool) {
        if let Some(feature) = self.get_mut(layer, id) {
            feature.selected = selected;
        }
    }

    /// Highlight every committed label feature carrying `label_name`; clear
    /// the highlight on all others. `None` clears every highlight.
    pub fn highlight_label(&mut self, label_name: Option<&str>) {
        for layer in [Layer::Label, Layer::DrawnRegionLabel] {
            for feature in self.layer_mut(layer).features.values_mut() {
                feature.highlighted =
                    label_name.is_some() && feature.assigned_label.as_deref() == label_name;
            }
        }
    }

    /// Replace the recognized-content layers with one analyzed page.
    pub fn load_analysis_page(&mut self, page: &AnalyzedPage, include_lines: bool) {
        for layer in [Layer::Text, Layer::Checkbox, Layer::Pod] {
            self.clear_layer(layer);
        }
        let size = self.page_size;
        let number = page.page_number;

        let words: Vec<Feature> = page
            .words
            .iter()
            .map(|word| {
                let polygon = page.normalize(&word.polygon);
                Feature::from_normalized(FeatureCategory::Text, polygon, size, number)
                    .with_text(&word.content)
                    .as_ocr_proposal()
            })
            .collect();
        self.add_many(Layer::Text, words);

        let marks: Vec<Feature> = page
            .selection_marks
            .iter()
            .map(|mark| {
                Feature::from_normalized(
                    FeatureCategory::Checkbox,
                    page.normalize(&mark.polygon),
                    size,
                    number,
                )
                .with_text(mark.state.as_str())
                .as_ocr_proposal()
            })
            .collect();
        self.add_many(Layer::Checkbox, marks);

        if include_lines {
            let lines: Vec<Feature> = page
                .lines
                .iter()
                .map(|line| {
                    let polygon = page.normalize(&line.polygon);
                    Feature::from_normalized(FeatureCategory::Label, polygon, size, number)
                        .with_text(&line.content)
                        .as_ocr_proposal()
                })
                .collect();
            self.add_many(Layer::Pod, lines);
        }
        log::debug!(
            "Loaded page {}: {} words, {} marks, {} proposals",
            number,
            self.len(Layer::Text),
            self.len(Layer::Checkbox),
            self.len(Layer::Pod)
        );
    }

    /// Replace committed-label features with the labels' values on `page`.
    ///
    /// Region labels go to the drawn-region-label layer, all others to the
    /// label layer. Uncommitted drawn regions are discarded.
    pub fn load_labels(&mut self, labels: &[Label], page: u32) {
        for layer in [Layer::Label, Layer::DrawnRegionLabel, Layer::DrawnRegion] {
            self.clear_layer(layer);
        }
        let size = self.page_size;
        for label in labels {
            let (layer, category) = if label.is_region() {
                (Layer::DrawnRegionLabel, FeatureCategory::DrawnRegion)
            } else {
                (Layer::Label, FeatureCategory::Label)
            };
            for value in label.value.iter().filter(|v| v.page == page) {
                for bounding_box in &value.bounding_boxes {
                    let feature =
                        Feature::from_normalized(category, bounding_box.clone(), size, page)
                            .with_text(&value.text)
                            .with_label(&label.label);
                    self.add(layer, feature);
                }
            }
        }
    }
}
