//! Drawing primitives for exam answer pages.

mod line;
mod shape;

pub use line::{LineElement, StrokeKind};
pub use shape::{ShapeElement, ShapeKind};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for drawn elements.
pub type ElementId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::black()
    }
}
