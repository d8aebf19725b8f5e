//! Freehand stroke element.

use super::{ElementId, Rgba};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tool that produced a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeKind {
    Pen,
    Eraser,
}

/// A continuous pen or eraser drag.
///
/// Point coordinates are stored flattened (`x0, y0, x1, y1, ...`), matching
/// the wire format of the answer payload. Points accumulate while the stroke
/// is active and are never resampled; the element is immutable once
/// committed to a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineElement {
    pub id: ElementId,
    pub tool: StrokeKind,
    pub points: Vec<f64>,
    pub color: Rgba,
    pub stroke_width: f64,
}

impl LineElement {
    /// Begin a stroke with a single starting point.
    pub fn start(tool: StrokeKind, origin: Point, color: Rgba, stroke_width: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            tool,
            points: vec![origin.x, origin.y],
            color,
            stroke_width,
        }
    }

    /// Append a point to the stroke.
    pub fn push_point(&mut self, point: Point) {
        self.points.push(point.x);
        self.points.push(point.y);
    }

    /// Number of points in the stroke.
    pub fn point_count(&self) -> usize {
        self.points.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Last point of the stroke, if any.
    pub fn last_point(&self) -> Option<Point> {
        if self.points.len() < 2 {
            return None;
        }
        let y = self.points[self.points.len() - 1];
        let x = self.points[self.points.len() - 2];
        Some(Point::new(x, y))
    }
}
