//! Selected features, their label value candidates and the inline menu.

use crate::config::MenuLayout;
use crate::feature::{FeatureCategory, FeatureId};
use crate::feature_store::{FeatureStore, Layer};
use crate::label::LabelValueCandidate;
use crate::schema::FieldType;
use kurbo::{Point, Size};

const TEXT_TYPES: &[FieldType] = &[
    FieldType::String,
    FieldType::Date,
    FieldType::Time,
    FieldType::Integer,
    FieldType::Number,
];

const DRAWABLE_TYPES: &[FieldType] = &[
    FieldType::String,
    FieldType::Date,
    FieldType::Time,
    FieldType::Integer,
    FieldType::Number,
    FieldType::SelectionMark,
    FieldType::Signature,
];

/// Field types a value of the given category may be assigned to.
pub fn supported_field_types(category: FeatureCategory) -> &'static [FieldType] {
    match category {
        FeatureCategory::Text => TEXT_TYPES,
        FeatureCategory::Checkbox => &[FieldType::SelectionMark],
        FeatureCategory::Label | FeatureCategory::DrawnRegion => DRAWABLE_TYPES,
    }
}

/// Field types offered for a selection with the given categories (one entry
/// per selected feature).
pub fn enabled_field_types(categories: &[FeatureCategory]) -> Vec<FieldType> {
    let types = if categories.len() == 1 && categories[0] == FeatureCategory::Checkbox {
        supported_field_types(FeatureCategory::Checkbox)
    } else if categories.contains(&FeatureCategory::DrawnRegion) {
        supported_field_types(FeatureCategory::DrawnRegion)
    } else if categories.contains(&FeatureCategory::Label) {
        supported_field_types(FeatureCategory::Label)
    } else {
        supported_field_types(FeatureCategory::Text)
    };
    types.to_vec()
}

/// Top-left corner of the inline label menu in screen pixels.
///
/// The menu opens below the pointer, or above it when it would run past
/// the bottom of the viewport.
pub fn menu_position(pointer: Point, viewport: Size, layout: &MenuLayout) -> Point {
    let bottom = pointer.y + layout.down_shift_y + layout.height + layout.bottom_offset;
    let top = if bottom > viewport.height {
        pointer.y - layout.height + layout.up_shift_y
    } else {
        pointer.y + layout.down_shift_y
    };
    Point::new(pointer.x + layout.shift_x, top)
}

/// Ordered set of selected features.
///
/// The `selected` flag on each feature is kept in sync with membership.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    entries: Vec<(Layer, FeatureId)>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, layer: Layer, id: FeatureId) -> bool {
        self.entries.contains(&(layer, id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Layer, FeatureId)> + '_ {
        self.entries.iter().copied()
    }

    /// Add a feature if it exists and is not selected yet.
    pub fn add(&mut self, store: &mut FeatureStore, layer: Layer, id: FeatureId) {
        if self.contains(layer, id) || !store.contains(layer, id) {
            return;
        }
        store.set_selected(layer, id, true);
        self.entries.push((layer, id));
    }

    pub fn remove(&mut self, store: &mut FeatureStore, layer: Layer, id: FeatureId) {
        store.set_selected(layer, id, false);
        self.entries.retain(|entry| *entry != (layer, id));
    }

    /// Flip membership. Returns whether the feature is now selected.
    pub fn toggle(&mut self, store: &mut FeatureStore, layer: Layer, id: FeatureId) -> bool {
        if self.contains(layer, id) {
            self.remove(store, layer, id);
            false
        } else {
            self.add(store, layer, id);
            self.contains(layer, id)
        }
    }

    pub fn clear(&mut self, store: &mut FeatureStore) {
        for (layer, id) in self.entries.drain(..) {
            store.set_selected(layer, id, false);
        }
    }

    /// Follow a feature whose id changed after a geometry edit.
    pub fn rekey(&mut self, layer: Layer, old: FeatureId, new: FeatureId) {
        if old == new {
            return;
        }
        let had_new = self.contains(layer, new);
        for entry in self.entries.iter_mut().filter(|entry| **entry == (layer, old)) {
            entry.1 = new;
        }
        if had_new {
            let mut seen = false;
            self.entries.retain(|entry| {
                if *entry != (layer, new) {
                    return true;
                }
                let keep = !seen;
                seen = true;
                keep
            });
        }
    }

    /// Drop entries whose feature no longer exists.
    pub fn prune(&mut self, store: &FeatureStore) {
        self.entries.retain(|(layer, id)| store.contains(*layer, *id));
    }

    /// Categories of the selected features, in selection order.
    pub fn categories(&self, store: &FeatureStore) -> Vec<FeatureCategory> {
        self.entries
            .iter()
            .filter_map(|(layer, id)| store.get(*layer, *id).map(|f| f.category))
            .collect()
    }

    /// Project every selected feature into a label value candidate.
    pub fn candidates(&self, store: &FeatureStore) -> Vec<LabelValueCandidate> {
        self.entries
            .iter()
            .filter_map(|(layer, id)| store.get(*layer, *id))
            .map(|feature| LabelValueCandidate {
                bounding_boxes: vec![feature.bounding_box.clone()],
                page: feature.page,
                text: feature.text.clone(),
                category: feature.category,
                already_assigned_label: feature.assigned_label.clone(),
            })
            .collect()
    }

    pub fn enabled_field_types(&self, store: &FeatureStore) -> Vec<FieldType> {
        enabled_field_types(&self.categories(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::Feature;
    use crate::geometry::Polygon;
    use kurbo::Rect;

    fn size() -> Size {
        Size::new(1000.0, 1000.0)
    }

    fn feature(category: FeatureCategory, x: f64) -> Feature {
        Feature::from_pixels(
            category,
            Polygon::from_rect(Rect::new(x, 10.0, x + 40.0, 30.0)),
            size(),
            1,
        )
    }

    #[test]
    fn test_enabled_types() {
        use FeatureCategory::*;
        assert_eq!(enabled_field_types(&[Checkbox]), vec![FieldType::SelectionMark]);
        assert_eq!(enabled_field_types(&[Checkbox, Text]).len(), 5);
        assert!(enabled_field_types(&[Text, DrawnRegion]).contains(&FieldType::Signature));
        assert!(enabled_field_types(&[Label]).contains(&FieldType::SelectionMark));
        assert!(!enabled_field_types(&[Text, Text]).contains(&FieldType::SelectionMark));
    }

    #[test]
    fn test_menu_flips_above_near_bottom() {
        let layout = MenuLayout::default();
        let viewport = Size::new(800.0, 600.0);

        let below = menu_position(Point::new(300.0, 100.0), viewport, &layout);
        assert_eq!(below, Point::new(175.0, 110.0));

        let above = menu_position(Point::new(300.0, 500.0), viewport, &layout);
        assert_eq!(above, Point::new(175.0, 500.0 - 180.0 - 30.0));
    }

    #[test]
    fn test_toggle_and_candidates() {
        let mut store = FeatureStore::new(size());
        let word = feature(FeatureCategory::Text, 10.0).with_text("Total");
        let mark = feature(FeatureCategory::Checkbox, 100.0)
            .with_text("selected")
            .with_label("Agree");
        let (word_id, mark_id) = (word.id, mark.id);
        store.add(Layer::Text, word);
        store.add(Layer::Checkbox, mark);

        let mut selection = SelectionSet::new();
        assert!(selection.toggle(&mut store, Layer::Text, word_id));
        assert!(selection.toggle(&mut store, Layer::Checkbox, mark_id));
        assert!(store.get(Layer::Text, word_id).unwrap().selected);

        let candidates = selection.candidates(&store);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].text, "Total");
        assert_eq!(candidates[0].bounding_boxes[0].points()[0], Point::new(0.01, 0.01));
        assert_eq!(candidates[1].category, FeatureCategory::Checkbox);
        assert_eq!(candidates[1].already_assigned_label.as_deref(), Some("Agree"));

        assert!(!selection.toggle(&mut store, Layer::Text, word_id));
        assert!(!store.get(Layer::Text, word_id).unwrap().selected);
        assert_eq!(selection.enabled_field_types(&store), vec![FieldType::SelectionMark]);

        selection.clear(&mut store);
        assert!(selection.is_empty());
        assert!(!store.get(Layer::Checkbox, mark_id).unwrap().selected);
    }

    #[test]
    fn test_add_ignores_missing_feature() {
        let mut store = FeatureStore::new(size());
        let ghost = feature(FeatureCategory::Text, 10.0);
        let mut selection = SelectionSet::new();
        assert!(!selection.toggle(&mut store, Layer::Text, ghost.id));
        assert!(selection.is_empty());
    }
}
