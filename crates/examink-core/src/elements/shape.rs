//! Geometric shape element.

use super::{ElementId, Rgba};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of geometric shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeKind {
    Rectangle,
    Circle,
    LineSegment,
}

/// A shape defined by an anchor point plus an extent.
///
/// Width and height are the signed deltas from the anchor to the dragging
/// pointer; negative values are legal and render a shape extending left/up
/// of the anchor. The extent is `None` until the first pointer move (or the
/// pointer-up) resolves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeElement {
    pub id: ElementId,
    pub kind: ShapeKind,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub color: Rgba,
    pub stroke_width: f64,
}

impl ShapeElement {
    /// Begin a shape at its anchor point, extent unresolved.
    pub fn anchored(kind: ShapeKind, anchor: Point, color: Rgba, stroke_width: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            x: anchor.x,
            y: anchor.y,
            width: None,
            height: None,
            color,
            stroke_width,
        }
    }

    /// Recompute the extent as the signed delta from the anchor to `pointer`.
    pub fn drag_to(&mut self, pointer: Point) {
        self.width = Some(pointer.x - self.x);
        self.height = Some(pointer.y - self.y);
    }

    pub fn anchor(&self) -> Point {
        Point::new(self.x, self.y)
    }
}
