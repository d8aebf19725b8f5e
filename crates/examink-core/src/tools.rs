//! Tool system translating pointer input into page elements.

use crate::elements::{LineElement, Rgba, ShapeElement, ShapeKind, StrokeKind};
use crate::input::PointerEvent;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Factor applied to the configured stroke width when erasing.
///
/// Erasing is drawing-over with the canvas background color, so the wider
/// stroke makes the eraser cover what a pen stroke of the same setting drew.
const ERASER_WIDTH_FACTOR: f64 = 2.0;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    #[default]
    Pen,
    Eraser,
    Rectangle,
    Circle,
    Segment,
}

/// State of a tool interaction.
#[derive(Debug, Clone, Default)]
pub enum ToolState {
    /// Tool is idle, waiting for a pointer-down.
    #[default]
    Idle,
    /// A stroke is accumulating points.
    Stroke { line: LineElement },
    /// A shape is being dragged out from its anchor.
    Shape { shape: ShapeElement },
}

/// An element produced by a finished tool interaction.
#[derive(Debug, Clone)]
pub enum CommittedElement {
    Line(LineElement),
    Shape(ShapeElement),
}

/// Interprets pointer events into page elements under the active tool.
#[derive(Debug, Clone)]
pub struct ToolEngine {
    /// Currently selected tool.
    pub current_tool: ToolKind,
    /// Current state of the tool interaction.
    state: ToolState,
    /// Stroke color for new elements.
    pub stroke_color: Rgba,
    /// Stroke width for new elements.
    pub stroke_width: f64,
    /// Canvas background color; the eraser draws with it.
    pub background: Rgba,
}

impl Default for ToolEngine {
    fn default() -> Self {
        Self {
            current_tool: ToolKind::default(),
            state: ToolState::default(),
            stroke_color: Rgba::black(),
            stroke_width: 2.0,
            background: Rgba::white(),
        }
    }
}

impl ToolEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current tool, discarding any in-progress interaction.
    pub fn set_tool(&mut self, tool: ToolKind) {
        self.current_tool = tool;
        self.state = ToolState::Idle;
    }

    /// Route a normalized pointer event, returning the committed element on
    /// pointer-up.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<CommittedElement> {
        match event {
            PointerEvent::Down { position } => {
                self.begin(position);
                None
            }
            PointerEvent::Move { position } => {
                self.update(position);
                None
            }
            PointerEvent::Up { position } => self.end(position),
        }
    }

    /// Begin a tool interaction at `point`.
    pub fn begin(&mut self, point: Point) {
        self.state = match self.current_tool {
            ToolKind::Pen => ToolState::Stroke {
                line: LineElement::start(StrokeKind::Pen, point, self.stroke_color, self.stroke_width),
            },
            ToolKind::Eraser => ToolState::Stroke {
                line: LineElement::start(
                    StrokeKind::Eraser,
                    point,
                    self.background,
                    self.stroke_width * ERASER_WIDTH_FACTOR,
                ),
            },
            ToolKind::Rectangle => ToolState::Shape {
                shape: ShapeElement::anchored(
                    ShapeKind::Rectangle,
                    point,
                    self.stroke_color,
                    self.stroke_width,
                ),
            },
            ToolKind::Circle => ToolState::Shape {
                shape: ShapeElement::anchored(
                    ShapeKind::Circle,
                    point,
                    self.stroke_color,
                    self.stroke_width,
                ),
            },
            ToolKind::Segment => ToolState::Shape {
                shape: ShapeElement::anchored(
                    ShapeKind::LineSegment,
                    point,
                    self.stroke_color,
                    self.stroke_width,
                ),
            },
        };
    }

    /// Update the current interaction. Moves received while idle are ignored.
    pub fn update(&mut self, point: Point) {
        match &mut self.state {
            ToolState::Idle => {}
            ToolState::Stroke { line } => line.push_point(point),
            ToolState::Shape { shape } => shape.drag_to(point),
        }
    }

    /// End the current interaction, committing the in-progress element.
    pub fn end(&mut self, point: Point) -> Option<CommittedElement> {
        match std::mem::take(&mut self.state) {
            ToolState::Idle => None,
            ToolState::Stroke { line } => Some(CommittedElement::Line(line)),
            ToolState::Shape { mut shape } => {
                shape.drag_to(point);
                Some(CommittedElement::Shape(shape))
            }
        }
    }

    /// Cancel the current interaction, discarding the in-progress element.
    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
    }

    /// Check if a tool interaction is active.
    pub fn is_active(&self) -> bool {
        !matches!(self.state, ToolState::Idle)
    }

    /// The in-progress interaction state, for preview rendering.
    pub fn state(&self) -> &ToolState {
        &self.state
    }
}
