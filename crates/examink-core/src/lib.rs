//! ExamInk Core Library
//!
//! Canvas state and timed-persistence engine for the ExamInk online-exam
//! platform: drawing tools over a multi-page canvas, per-page undo/redo,
//! interval-based durable autosave (local cache + remote sync) and the exam
//! countdown that forces submission on expiry.

pub mod clock;
pub mod elements;
pub mod history;
pub mod input;
pub mod page;
pub mod persist;
pub mod remote;
pub mod schedule;
pub mod session;
pub mod storage;
pub mod tools;

pub use clock::{format_remaining, ClockState, ClockTransition, ExamClock};
pub use elements::{ElementId, LineElement, Rgba, ShapeElement, ShapeKind, StrokeKind};
pub use history::HistoryStack;
pub use input::PointerEvent;
pub use page::{Page, PageSnapshot, PageStore};
pub use persist::{cache_key, AnswerPayload, PersistedExamState, PersistenceCoordinator};
pub use remote::{
    AnswerSaveRequest, AnswerSink, FinalAnswerArtifact, RemoteError, SubmissionSink,
};
pub use session::{ExamSession, SessionConfig, SessionEvent, SubmitOutcome};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use tools::{CommittedElement, ToolEngine, ToolKind, ToolState};
