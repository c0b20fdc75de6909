//! Polygon geometry shared by features, labels and the analysis result.

use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// A closed polygon stored as its vertices.
///
/// Serialized as a flat coordinate list `[x0, y0, x1, y1, ...]`, which is the
/// shape used for label bounding boxes and analysis polygons on disk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Polygon {
    points: Vec<Point>,
}

impl TryFrom<Vec<f64>> for Polygon {
    type Error = String;

    fn try_from(coords: Vec<f64>) -> Result<Self, Self::Error> {
        Polygon::from_flat(&coords).ok_or_else(|| {
            format!("polygon needs an even number of coordinates, got {}", coords.len())
        })
    }
}

impl From<Polygon> for Vec<f64> {
    fn from(polygon: Polygon) -> Self {
        polygon.to_flat()
    }
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Build from a flat coordinate list. Returns `None` for odd lengths.
    pub fn from_flat(coords: &[f64]) -> Option<Self> {
        if coords.len() % 2 != 0 {
            return None;
        }
        let points = coords
            .chunks_exact(2)
            .map(|pair| Point::new(pair[0], pair[1]))
            .collect();
        Some(Self { points })
    }

    /// Axis-aligned rectangle as TL, TR, BR, BL.
    pub fn from_rect(rect: Rect) -> Self {
        let rect = rect.abs();
        Self::new(vec![
            Point::new(rect.x0, rect.y0),
            Point::new(rect.x1, rect.y0),
            Point::new(rect.x1, rect.y1),
            Point::new(rect.x0, rect.y1),
        ])
    }

    pub fn to_flat(&self) -> Vec<f64> {
        self.points.iter().flat_map(|p| [p.x, p.y]).collect()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut [Point] {
        &mut self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Bounding box of all vertices.
    pub fn bounds(&self) -> Rect {
        let Some(first) = self.points.first() else {
            return Rect::ZERO;
        };
        self.points
            .iter()
            .skip(1)
            .fold(Rect::from_points(*first, *first), |rect, p| {
                rect.union_pt(*p)
            })
    }

    /// Point-in-polygon test (ray casting).
    pub fn contains(&self, point: Point) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let pi = self.points[i];
            let pj = self.points[j];
            if (pi.y > point.y) != (pj.y > point.y)
                && point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Whether the polygon's bounds overlap the rectangle with non-zero area.
    pub fn intersects_rect(&self, rect: Rect) -> bool {
        rect.abs().intersect(self.bounds()).area() > 0.0
    }

    /// Scale every vertex independently on each axis.
    pub fn scale(&self, sx: f64, sy: f64) -> Self {
        Self::new(
            self.points
                .iter()
                .map(|p| Point::new(p.x * sx, p.y * sy))
                .collect(),
        )
    }

    /// Pixel polygon to fractions of the page size.
    pub fn normalize(&self, size: Size) -> Self {
        if size.width <= 0.0 || size.height <= 0.0 {
            return self.clone();
        }
        Self::new(
            self.points
                .iter()
                .map(|p| Point::new(p.x / size.width, p.y / size.height))
                .collect(),
        )
    }

    /// Fractional polygon to pixels of the page size.
    pub fn denormalize(&self, size: Size) -> Self {
        self.scale(size.width, size.height)
    }

    /// Index of the first vertex within `tolerance` of `point`.
    pub fn vertex_near(&self, point: Point, tolerance: f64) -> Option<usize> {
        let tolerance_sq = tolerance * tolerance;
        self.points
            .iter()
            .position(|p| (*p - point).hypot2() <= tolerance_sq)
    }

    /// Top-left anchor used as the reading-order fallback.
    pub fn top_left(&self) -> Point {
        let bounds = self.bounds();
        Point::new(bounds.x0, bounds.y0)
    }
}

/// Reduce a sampled freehand path to its axis-aligned bounding rectangle.
pub fn bounding_rect_polygon(path: &[Point]) -> Option<Polygon> {
    let first = path.first()?;
    let rect = path
        .iter()
        .skip(1)
        .fold(Rect::from_points(*first, *first), |rect, p| rect.union_pt(*p));
    Some(Polygon::from_rect(rect))
}
