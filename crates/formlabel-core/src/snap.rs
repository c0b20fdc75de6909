//! Vertex snapping against editable drawn regions.

use crate::feature::FeatureId;
use crate::feature_store::{FeatureStore, Layer};
use kurbo::Point;

/// A vertex of an editable feature that a pointer can snap to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapTarget {
    /// Vertex location in image pixels.
    pub point: Point,
    pub layer: Layer,
    pub feature: FeatureId,
    /// Index of the vertex within the feature polygon.
    pub vertex: usize,
}

/// Result of a snap operation.
#[derive(Debug, Clone, Copy)]
pub struct SnapResult {
    /// The snapped point (or the input point when nothing was in range).
    pub point: Point,
    /// The vertex snapped to.
    pub target: Option<SnapTarget>,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(point: Point) -> Self {
        Self { point, target: None }
    }

    pub fn is_snapped(&self) -> bool {
        self.target.is_some()
    }
}

/// Collect every vertex of every editable feature.
pub fn vertex_targets(store: &FeatureStore) -> Vec<SnapTarget> {
    store
        .editable()
        .flat_map(|(layer, feature)| {
            feature
                .geometry
                .points()
                .iter()
                .enumerate()
                .map(move |(vertex, point)| SnapTarget {
                    point: *point,
                    layer,
                    feature: feature.id,
                    vertex,
                })
        })
        .collect()
}

/// Snap to the nearest target within `threshold` (world units).
pub fn snap_to_vertices(point: Point, targets: &[SnapTarget], threshold: f64) -> SnapResult {
    let threshold_sq = threshold * threshold;
    let mut best: Option<(f64, SnapTarget)> = None;

    for target in targets {
        let dist_sq = (target.point - point).hypot2();
        if dist_sq <= threshold_sq && best.is_none_or(|(best_dist, _)| dist_sq < best_dist) {
            best = Some((dist_sq, *target));
        }
    }

    match best {
        Some((_, target)) => SnapResult {
            point: target.point,
            target: Some(target),
        },
        None => SnapResult::none(point),
    }
}
