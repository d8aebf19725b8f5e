//! Normalized pointer input.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// A pointer event normalized across mouse and touch origin.
///
/// The platform layer maps whatever event objects it receives into this one
/// shape; the engine never sees device-specific input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point },
    Move { position: Point },
    Up { position: Point },
}

impl PointerEvent {
    /// Canvas-local position of the event.
    pub fn position(&self) -> Point {
        match self {
            PointerEvent::Down { position }
            | PointerEvent::Move { position }
            | PointerEvent::Up { position } => *position,
        }
    }
}
