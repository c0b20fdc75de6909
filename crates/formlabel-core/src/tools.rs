//! Region drawing tool.

use crate::geometry::{Polygon, bounding_rect_polygon};
use kurbo::Point;

/// State of a draw interaction.
#[derive(Debug, Clone, Default)]
pub enum ToolState {
    /// Waiting for a pointer-down.
    #[default]
    Idle,
    /// A region is being drawn.
    Active {
        /// Starting point of the interaction.
        start: Point,
        /// Current point of the interaction.
        current: Point,
    },
}

/// Accumulates a freehand path in image pixels and reduces it to a
/// rectangle when the draw ends.
#[derive(Debug, Clone)]
pub struct DrawManager {
    pub state: ToolState,
    path: Vec<Point>,
    /// Rectangles narrower or shorter than this are discarded.
    min_size: f64,
}

impl Default for DrawManager {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl DrawManager {
    pub fn new(min_size: f64) -> Self {
        Self {
            state: ToolState::Idle,
            path: Vec::new(),
            min_size,
        }
    }

    /// Begin drawing at `point`.
    pub fn begin(&mut self, point: Point) {
        self.path.clear();
        self.path.push(point);
        self.state = ToolState::Active {
            start: point,
            current: point,
        };
    }

    /// Extend the path.
    pub fn update(&mut self, point: Point) {
        if let ToolState::Active { current, .. } = &mut self.state {
            *current = point;
            self.path.push(point);
        }
    }

    /// Finish drawing and return the bounding rectangle, or `None` when
    /// nothing was being drawn or the rectangle is degenerate.
    pub fn end(&mut self, point: Point) -> Option<Polygon> {
        if !self.is_active() {
            return None;
        }
        self.path.push(point);
        let polygon = bounding_rect_polygon(&self.path);
        self.cancel();

        let polygon = polygon?;
        let bounds = polygon.bounds();
        if bounds.width() < self.min_size || bounds.height() < self.min_size {
            log::debug!(
                "Discarding degenerate region {:.1}x{:.1}",
                bounds.width(),
                bounds.height()
            );
            return None;
        }
        Some(polygon)
    }

    /// Drop the current path.
    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
        self.path.clear();
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ToolState::Active { .. })
    }

    /// Points sampled so far.
    pub fn path(&self) -> &[Point] {
        &self.path
    }

    /// Rectangle the current path would produce, for previews.
    pub fn preview(&self) -> Option<Polygon> {
        if self.is_active() {
            bounding_rect_polygon(&self.path)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freehand_reduces_to_rectangle() {
        let mut draw = DrawManager::new(1.0);
        draw.begin(Point::new(10.0, 10.0));
        draw.update(Point::new(30.0, 5.0 + 20.0));
        draw.update(Point::new(20.0, 35.0));
        let polygon = draw.end(Point::new(50.0, 40.0)).unwrap();

        assert_eq!(
            polygon.points(),
            &[
                Point::new(10.0, 10.0),
                Point::new(50.0, 10.0),
                Point::new(50.0, 40.0),
                Point::new(10.0, 40.0),
            ]
        );
        assert!(!draw.is_active());
        assert!(draw.path().is_empty());
    }

    #[test]
    fn test_degenerate_rectangle_discarded() {
        let mut draw = DrawManager::new(2.0);
        draw.begin(Point::new(10.0, 10.0));
        assert!(draw.end(Point::new(50.0, 11.0)).is_none());

        assert!(draw.end(Point::new(50.0, 40.0)).is_none());
    }

    #[test]
    fn test_cancel_drops_path() {
        let mut draw = DrawManager::default();
        draw.begin(Point::new(0.0, 0.0));
        draw.update(Point::new(10.0, 10.0));
        assert!(draw.preview().is_some());
        draw.cancel();
        assert!(draw.preview().is_none());
        assert!(draw.end(Point::new(20.0, 20.0)).is_none());
    }
}
