//! Camera module for pan/zoom/rotate transforms over the page image.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Camera manages the view transform for the page surface.
///
/// World coordinates are image pixels of the current page (origin top-left).
/// The page is rotated about its center, then scaled and translated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// Current translation offset (pan)
    pub offset: Vec2,
    /// Current zoom level (1.0 = one image pixel per screen pixel)
    pub zoom: f64,
    /// Page rotation in degrees, clockwise
    pub rotation_degrees: f64,
    /// Size of the page image in pixels
    pub page_size: Size,
    /// Minimum allowed zoom level
    pub min_zoom: f64,
    /// Maximum allowed zoom level
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
            rotation_degrees: 0.0,
            page_size: Size::ZERO,
            min_zoom: 0.1,
            max_zoom: 10.0,
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a camera with explicit zoom limits.
    pub fn with_zoom_limits(min_zoom: f64, max_zoom: f64) -> Self {
        Self {
            min_zoom,
            max_zoom,
            ..Self::default()
        }
    }

    fn page_center(&self) -> Point {
        Point::new(self.page_size.width / 2.0, self.page_size.height / 2.0)
    }

    /// World (image pixel) to screen transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset)
            * Affine::scale(self.zoom)
            * Affine::rotate_about(self.rotation_degrees.to_radians(), self.page_center())
    }

    /// Screen to world (image pixel) transform.
    pub fn inverse_transform(&self) -> Affine {
        self.transform().inverse()
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// Convert a screen distance to world units.
    pub fn screen_to_world_distance(&self, distance: f64) -> f64 {
        distance / self.zoom
    }

    /// Whether a world point lies on the page image.
    pub fn is_on_page(&self, world_point: Point) -> bool {
        Rect::from_origin_size(Point::ORIGIN, self.page_size).contains(world_point)
    }

    /// Pan the camera by a delta in screen coordinates.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom the camera, keeping the given screen point fixed.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }

        let world_point = self.screen_to_world(screen_point);
        self.zoom = new_zoom;

        // Adjust offset so world_point stays at screen_point
        let new_screen = self.world_to_screen(world_point);
        self.offset += screen_point - new_screen;
    }

    /// Set the page image and its rotation, then fit it into the viewport.
    pub fn set_page(&mut self, page_size: Size, rotation_degrees: f64, viewport: Size) {
        self.page_size = page_size;
        self.rotation_degrees = rotation_degrees;
        self.fit_to_viewport(viewport, 0.0);
    }

    /// Fit the (rotated) page into the viewport, centered.
    pub fn fit_to_viewport(&mut self, viewport: Size, padding: f64) {
        let rotated = Affine::rotate_about(self.rotation_degrees.to_radians(), self.page_center())
            .transform_rect_bbox(Rect::from_origin_size(Point::ORIGIN, self.page_size));
        if rotated.is_zero_area() {
            self.offset = Vec2::ZERO;
            self.zoom = 1.0;
            return;
        }

        let padded_viewport = Size::new(
            (viewport.width - padding * 2.0).max(1.0),
            (viewport.height - padding * 2.0).max(1.0),
        );

        let scale_x = padded_viewport.width / rotated.width();
        let scale_y = padded_viewport.height / rotated.height();
        self.zoom = scale_x.min(scale_y).clamp(self.min_zoom, self.max_zoom);

        let bounds_center = rotated.center();
        let viewport_center = Point::new(viewport.width / 2.0, viewport.height / 2.0);
        self.offset = Vec2::new(
            viewport_center.x - bounds_center.x * self.zoom,
            viewport_center.y - bounds_center.y * self.zoom,
        );
    }
}
