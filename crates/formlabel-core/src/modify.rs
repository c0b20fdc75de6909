//! Vertex modification of editable regions.

use crate::feature::{Feature, FeatureId};
use crate::feature_store::{FeatureStore, Layer};
use crate::geometry::Polygon;
use crate::label::LabelValueCandidate;
use crate::snap::{SnapResult, snap_to_vertices, vertex_targets};
use kurbo::Point;
use std::collections::HashMap;

/// A committed geometry edit of a feature that carries a label.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryChange {
    pub label: String,
    pub old: LabelValueCandidate,
    pub new: LabelValueCandidate,
}

/// Result of ending a vertex modification.
#[derive(Debug, Clone, Default)]
pub struct ModifyOutcome {
    /// `(layer, old id, new id)` for every feature whose geometry changed.
    pub rekeyed: Vec<(Layer, FeatureId, FeatureId)>,
    pub changes: Vec<GeometryChange>,
}

/// An in-progress vertex drag.
#[derive(Debug, Clone)]
pub struct VertexModify {
    /// Touched features and the index of their grabbed vertex.
    touched: Vec<(Layer, FeatureId, usize)>,
    /// Flattened pixel coordinates of every touched feature at grab time.
    snapshot: HashMap<(Layer, FeatureId), Vec<f64>>,
}

fn candidate(feature: &Feature, bounding_box: Polygon) -> LabelValueCandidate {
    LabelValueCandidate {
        bounding_boxes: vec![bounding_box],
        page: feature.page,
        text: feature.text.clone(),
        category: feature.category,
        already_assigned_label: feature.assigned_label.clone(),
    }
}

impl VertexModify {
    /// Grab every editable feature with a vertex within `tolerance` of `point`.
    ///
    /// Returns `None` when no editable vertex is in range.
    pub fn begin(store: &FeatureStore, point: Point, tolerance: f64) -> Option<Self> {
        let mut touched = Vec::new();
        let mut snapshot = HashMap::new();
        for (layer, feature) in store.editable() {
            if let Some(vertex) = feature.geometry.vertex_near(point, tolerance) {
                touched.push((layer, feature.id, vertex));
                snapshot.insert((layer, feature.id), feature.geometry.to_flat());
            }
        }
        if touched.is_empty() {
            return None;
        }
        log::debug!("Modify started on {} features", touched.len());
        Some(Self { touched, snapshot })
    }

    pub fn touched(&self) -> impl Iterator<Item = (Layer, FeatureId)> + '_ {
        self.touched.iter().map(|(layer, id, _)| (*layer, *id))
    }

    fn is_touched(&self, layer: Layer, id: FeatureId) -> bool {
        self.snapshot.contains_key(&(layer, id))
    }

    /// Move the grabbed vertex of every touched feature to `point`, snapping
    /// to untouched editable vertices within `snap_tolerance`.
    pub fn update(&self, store: &mut FeatureStore, point: Point, snap_tolerance: f64) -> SnapResult {
        let targets: Vec<_> = vertex_targets(store)
            .into_iter()
            .filter(|target| !self.is_touched(target.layer, target.feature))
            .collect();
        let snap = snap_to_vertices(point, &targets, snap_tolerance);

        for (layer, id, vertex) in &self.touched {
            if let Some(slot) = store
                .get_mut(*layer, *id)
                .and_then(|feature| feature.geometry.points_mut().get_mut(*vertex))
            {
                *slot = snap.point;
            }
        }
        snap
    }

    /// Restore every touched feature's geometry from the snapshot.
    pub fn cancel(self, store: &mut FeatureStore) {
        for ((layer, id), coords) in self.snapshot {
            let Some(feature) = store.get_mut(layer, id) else {
                continue;
            };
            if feature.geometry.to_flat() == coords {
                continue;
            }
            if let Some(original) = Polygon::from_flat(&coords) {
                feature.geometry = original;
            }
        }
        log::debug!("Modify cancelled");
    }

    /// Re-key every changed feature and report label value changes.
    pub fn end(self, store: &mut FeatureStore) -> ModifyOutcome {
        let mut outcome = ModifyOutcome::default();
        for (layer, id, _) in &self.touched {
            let (layer, id) = (*layer, *id);
            let Some(feature) = store.get(layer, id) else {
                continue;
            };
            let unchanged = self
                .snapshot
                .get(&(layer, id))
                .is_some_and(|coords| *coords == feature.geometry.to_flat());
            if unchanged {
                continue;
            }

            let old = candidate(feature, feature.bounding_box.clone());
            let Some(new_id) = store.refresh_feature(layer, id) else {
                continue;
            };
            outcome.rekeyed.push((layer, id, new_id));

            let Some(feature) = store.get(layer, new_id) else {
                continue;
            };
            if let Some(label) = &feature.assigned_label {
                outcome.changes.push(GeometryChange {
                    label: label.clone(),
                    old,
                    new: candidate(feature, feature.bounding_box.clone()),
                });
            }
        }
        log::debug!(
            "Modify ended: {} features rekeyed, {} label changes",
            outcome.rekeyed.len(),
            outcome.changes.len()
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureCategory;
    use kurbo::{Rect, Size};

    fn size() -> Size {
        Size::new(1000.0, 1000.0)
    }

    fn region(rect: Rect) -> Feature {
        Feature::from_pixels(FeatureCategory::DrawnRegion, Polygon::from_rect(rect), size(), 1)
    }

    #[test]
    fn test_begin_requires_vertex_in_range() {
        let mut store = FeatureStore::new(size());
        store.add(Layer::DrawnRegion, region(Rect::new(10.0, 10.0, 50.0, 40.0)));
        assert!(VertexModify::begin(&store, Point::new(30.0, 30.0), 2.0).is_none());
        assert!(VertexModify::begin(&store, Point::new(51.0, 41.0), 2.0).is_some());
    }

    #[test]
    fn test_cancel_restores_exact_coordinates() {
        let mut store = FeatureStore::new(size());
        let feature = region(Rect::new(10.123456789, 10.0, 50.0, 40.987654321));
        let id = feature.id;
        let original = feature.geometry.to_flat();
        store.add(Layer::DrawnRegion, feature);

        let modify = VertexModify::begin(&store, Point::new(50.0, 40.987654321), 1.0).unwrap();
        modify.update(&mut store, Point::new(77.7, 66.6), 1.0);
        modify.update(&mut store, Point::new(80.0, 70.0), 1.0);
        assert_ne!(store.get(Layer::DrawnRegion, id).unwrap().geometry.to_flat(), original);

        modify.cancel(&mut store);
        let restored = store.get(Layer::DrawnRegion, id).unwrap();
        assert_eq!(restored.geometry.to_flat(), original);
        assert_eq!(restored.id, id);
    }

    #[test]
    fn test_shared_vertex_moves_all_touched_features() {
        let mut store = FeatureStore::new(size());
        let a = region(Rect::new(10.0, 10.0, 50.0, 40.0));
        let b = region(Rect::new(50.0, 40.0, 90.0, 80.0));
        let (a_id, b_id) = (a.id, b.id);
        store.add(Layer::DrawnRegion, a);
        store.add(Layer::DrawnRegion, b);

        let modify = VertexModify::begin(&store, Point::new(50.0, 40.0), 1.0).unwrap();
        assert_eq!(modify.touched().count(), 2);
        modify.update(&mut store, Point::new(55.0, 45.0), 1.0);

        assert_eq!(store.get(Layer::DrawnRegion, a_id).unwrap().geometry.points()[2], Point::new(55.0, 45.0));
        assert_eq!(store.get(Layer::DrawnRegion, b_id).unwrap().geometry.points()[0], Point::new(55.0, 45.0));
    }

    #[test]
    fn test_drag_snaps_to_untouched_vertex() {
        let mut store = FeatureStore::new(size());
        store.add(Layer::DrawnRegion, region(Rect::new(10.0, 10.0, 50.0, 40.0)));
        store.add(Layer::DrawnRegion, region(Rect::new(100.0, 100.0, 150.0, 140.0)));

        let modify = VertexModify::begin(&store, Point::new(50.0, 40.0), 1.0).unwrap();
        let snap = modify.update(&mut store, Point::new(97.0, 98.0), 5.0);
        assert!(snap.is_snapped());
        assert_eq!(snap.point, Point::new(100.0, 100.0));
    }

    #[test]
    fn test_end_rekeys_and_reports_label_changes() {
        let mut store = FeatureStore::new(size());
        let labeled = region(Rect::new(10.0, 10.0, 50.0, 40.0)).with_label("Signature");
        let old_id = labeled.id;
        let old_box = labeled.bounding_box.clone();
        store.add(Layer::DrawnRegionLabel, labeled);

        let modify = VertexModify::begin(&store, Point::new(50.0, 40.0), 1.0).unwrap();
        modify.update(&mut store, Point::new(60.0, 50.0), 1.0);
        let outcome = modify.end(&mut store);

        assert_eq!(outcome.rekeyed.len(), 1);
        let (layer, old, new) = outcome.rekeyed[0];
        assert_eq!((layer, old), (Layer::DrawnRegionLabel, old_id));
        assert!(store.contains(Layer::DrawnRegionLabel, new));
        assert!(!store.contains(Layer::DrawnRegionLabel, old_id));

        assert_eq!(outcome.changes.len(), 1);
        let change = &outcome.changes[0];
        assert_eq!(change.label, "Signature");
        assert_eq!(change.old.bounding_boxes, vec![old_box]);
        assert_eq!(change.new.bounding_boxes[0].points()[2], Point::new(0.06, 0.05));
    }

    #[test]
    fn test_end_without_movement_keeps_ids() {
        let mut store = FeatureStore::new(size());
        store.add(Layer::DrawnRegion, region(Rect::new(10.0, 10.0, 50.0, 40.0)));
        let modify = VertexModify::begin(&store, Point::new(10.0, 10.0), 1.0).unwrap();
        let outcome = modify.end(&mut store);
        assert!(outcome.rekeyed.is_empty());
        assert!(outcome.changes.is_empty());
    }
}
