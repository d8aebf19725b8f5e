//! Timed persistence: local cache writes and remote answer sync.

use crate::elements::{LineElement, ShapeElement};
use crate::page::{Page, PageStore};
use crate::remote::{AnswerSaveRequest, AnswerSink};
use crate::schedule::IntervalTimer;
use crate::storage::{Storage, StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Default interval between dirty-gated local cache writes.
pub const DEFAULT_LOCAL_SAVE_INTERVAL_SECS: u64 = 30;

/// Default interval between remote sync attempts.
pub const DEFAULT_REMOTE_SYNC_INTERVAL_SECS: u64 = 30;

/// Cache key isolating answers per exam and student.
pub fn cache_key(exam_id: &str, student_id: &str) -> String {
    format!("exam-{exam_id}-student-{student_id}")
}

/// The full durable snapshot written to the local cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedExamState {
    pub pages: BTreeMap<u32, Page>,
    pub current_page: u32,
    pub student_id: String,
    /// Milliseconds since the Unix epoch at save time.
    pub timestamp: u64,
}

/// One page's drawing payload as sent to the answer-storage service.
///
/// Lines and shapes both travel in the payload; the local cache and the
/// remote side see the same canonical shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPayload {
    pub lines: Vec<LineElement>,
    pub shapes: Vec<ShapeElement>,
    pub timestamp: u64,
}

/// Which save kinds became due after advancing the timers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DueSaves {
    pub local: bool,
    pub remote: bool,
}

/// Outcome of one remote sync attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteSyncOutcome {
    /// The payload was sent and accepted.
    Sent,
    /// The payload matched the last accepted one; no network call was made.
    Unchanged,
    /// The attempt failed; the next interval tick is the retry.
    Failed(String),
}

/// Durable local caching plus best-effort remote synchronization, decoupled
/// from the UI's edit rate.
///
/// The local timer only produces a save while the dirty flag is set; the
/// remote timer fires unconditionally but a content-equality check against
/// the last accepted payload short-circuits redundant network calls.
/// Everything serialized here is cloned out of the store first, so a save
/// in flight never observes concurrent edits.
pub struct PersistenceCoordinator<S: Storage, A: AnswerSink> {
    storage: Arc<S>,
    answers: Arc<A>,
    cache_key: String,
    exam_id: String,
    question_id: String,
    student_id: String,
    local_timer: IntervalTimer,
    remote_timer: IntervalTimer,
    dirty: bool,
    /// Content fingerprint (lines + shapes) of the last accepted payload.
    last_sent: Option<String>,
}

impl<S: Storage, A: AnswerSink> PersistenceCoordinator<S, A> {
    pub fn new(
        storage: Arc<S>,
        answers: Arc<A>,
        exam_id: impl Into<String>,
        question_id: impl Into<String>,
        student_id: impl Into<String>,
    ) -> Self {
        let exam_id = exam_id.into();
        let student_id = student_id.into();
        Self {
            cache_key: cache_key(&exam_id, &student_id),
            storage,
            answers,
            exam_id,
            question_id: question_id.into(),
            student_id,
            local_timer: IntervalTimer::new(Duration::from_secs(DEFAULT_LOCAL_SAVE_INTERVAL_SECS)),
            remote_timer: IntervalTimer::new(Duration::from_secs(DEFAULT_REMOTE_SYNC_INTERVAL_SECS)),
            dirty: false,
            last_sent: None,
        }
    }

    /// Override both save intervals.
    pub fn with_intervals(mut self, local: Duration, remote: Duration) -> Self {
        self.local_timer = IntervalTimer::new(local);
        self.remote_timer = IntervalTimer::new(remote);
        self
    }

    /// Mark the answer as having unsaved local mutations.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Advance both save timers, reporting which saves became due.
    pub fn advance(&mut self, dt: Duration) -> DueSaves {
        DueSaves {
            local: self.local_timer.advance(dt) > 0 && self.dirty,
            remote: self.remote_timer.advance(dt) > 0,
        }
    }

    /// Write the full exam state to the local cache, clearing the dirty flag
    /// on success.
    pub async fn save_local(&mut self, store: &PageStore, timestamp: u64) -> StorageResult<()> {
        let state = PersistedExamState {
            pages: store.clone_pages(),
            current_page: store.current_page(),
            student_id: self.student_id.clone(),
            timestamp,
        };
        self.storage.save(&self.cache_key, &state).await?;
        self.dirty = false;
        log::debug!("cached answer state under {}", self.cache_key);
        Ok(())
    }

    /// Serialize the active page and send it to the answer-storage service.
    ///
    /// The equality check covers the drawing content only, not the
    /// timestamp, so an unchanged page never re-sends.
    pub async fn sync_remote(&mut self, store: &PageStore, timestamp: u64) -> RemoteSyncOutcome {
        let page = store.active_page();
        let payload = AnswerPayload {
            lines: page.lines.clone(),
            shapes: page.shapes.clone(),
            timestamp,
        };

        let fingerprint = match serde_json::to_string(&(&payload.lines, &payload.shapes)) {
            Ok(f) => f,
            Err(e) => return RemoteSyncOutcome::Failed(e.to_string()),
        };
        if self.last_sent.as_deref() == Some(fingerprint.as_str()) {
            return RemoteSyncOutcome::Unchanged;
        }

        let serialized = match serde_json::to_string(&payload) {
            Ok(s) => s,
            Err(e) => return RemoteSyncOutcome::Failed(e.to_string()),
        };
        let request = AnswerSaveRequest {
            exam_id: self.exam_id.clone(),
            question_id: self.question_id.clone(),
            payload: serialized,
        };

        match self.answers.save_answer(&request).await {
            Ok(()) => {
                self.last_sent = Some(fingerprint);
                RemoteSyncOutcome::Sent
            }
            Err(e) => {
                log::warn!("remote answer save failed: {e}");
                RemoteSyncOutcome::Failed(e.to_string())
            }
        }
    }

    /// Load the cached state for this exam/student, if any.
    ///
    /// Malformed cache content is treated the same as an absent entry: the
    /// student starts from an empty answer rather than a crashed view.
    pub async fn load(&self) -> Option<PersistedExamState> {
        match self.storage.load(&self.cache_key).await {
            Ok(state) => Some(state),
            Err(StorageError::NotFound(_)) => None,
            Err(e) => {
                log::warn!("discarding unreadable answer cache {}: {e}", self.cache_key);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Rgba, StrokeKind};
    use crate::remote::MemoryAnswerSink;
    use crate::storage::MemoryStorage;
    use kurbo::Point;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

        fn dummy_raw_waker() -> RawWaker {
            fn no_op(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                dummy_raw_waker()
            }
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }

        let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
        let mut cx = Context::from_waker(&waker);
        let mut f = std::pin::pin!(f);

        loop {
            match f.as_mut().poll(&mut cx) {
                Poll::Ready(result) => return result,
                Poll::Pending => {}
            }
        }
    }

    fn coordinator() -> PersistenceCoordinator<MemoryStorage, MemoryAnswerSink> {
        PersistenceCoordinator::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryAnswerSink::new()),
            "e1",
            "q1",
            "s1",
        )
    }

    fn draw(store: &mut PageStore, x: f64) {
        store.active_page_mut().push_line(LineElement::start(
            StrokeKind::Pen,
            Point::new(x, x),
            Rgba::black(),
            2.0,
        ));
    }

    #[test]
    fn test_cache_key_isolates_exam_and_student() {
        assert_eq!(cache_key("e1", "s1"), "exam-e1-student-s1");
        assert_ne!(cache_key("e1", "s1"), cache_key("e1", "s2"));
        assert_ne!(cache_key("e1", "s1"), cache_key("e2", "s1"));
    }

    #[test]
    fn test_local_save_due_only_when_dirty() {
        let mut coordinator = coordinator();

        let due = coordinator.advance(Duration::from_secs(30));
        assert!(!due.local);
        assert!(due.remote);

        coordinator.mark_dirty();
        let due = coordinator.advance(Duration::from_secs(30));
        assert!(due.local);
    }

    #[test]
    fn test_save_local_clears_dirty() {
        let mut coordinator = coordinator();
        let store = PageStore::new();

        coordinator.mark_dirty();
        block_on(coordinator.save_local(&store, 1000)).unwrap();

        assert!(!coordinator.is_dirty());
    }

    #[test]
    fn test_save_local_round_trips_through_load() {
        let mut coordinator = coordinator();
        let mut store = PageStore::new();
        draw(&mut store, 5.0);

        block_on(coordinator.save_local(&store, 1000)).unwrap();
        let state = block_on(coordinator.load()).expect("cached state");

        assert_eq!(state.current_page, 1);
        assert_eq!(state.student_id, "s1");
        assert_eq!(state.pages[&1].lines.len(), 1);
    }

    #[test]
    fn test_load_absent_cache_is_none() {
        let coordinator = coordinator();
        assert!(block_on(coordinator.load()).is_none());
    }

    #[test]
    fn test_unchanged_payload_short_circuits_network() {
        let sink = Arc::new(MemoryAnswerSink::new());
        let mut coordinator = PersistenceCoordinator::new(
            Arc::new(MemoryStorage::new()),
            sink.clone(),
            "e1",
            "q1",
            "s1",
        );
        let mut store = PageStore::new();
        draw(&mut store, 1.0);

        let first = block_on(coordinator.sync_remote(&store, 1000));
        assert_eq!(first, RemoteSyncOutcome::Sent);

        // Identical content, later timestamp: exactly one network call total.
        let second = block_on(coordinator.sync_remote(&store, 2000));
        assert_eq!(second, RemoteSyncOutcome::Unchanged);
        assert_eq!(sink.call_count(), 1);

        draw(&mut store, 2.0);
        let third = block_on(coordinator.sync_remote(&store, 3000));
        assert_eq!(third, RemoteSyncOutcome::Sent);
        assert_eq!(sink.call_count(), 2);
    }

    #[test]
    fn test_failed_sync_retries_on_next_attempt() {
        let sink = Arc::new(MemoryAnswerSink::new());
        let mut coordinator = PersistenceCoordinator::new(
            Arc::new(MemoryStorage::new()),
            sink.clone(),
            "e1",
            "q1",
            "s1",
        );
        let mut store = PageStore::new();
        draw(&mut store, 1.0);

        sink.set_failure(Some(crate::remote::RemoteError::Network("offline".to_string())));
        let outcome = block_on(coordinator.sync_remote(&store, 1000));
        assert!(matches!(outcome, RemoteSyncOutcome::Failed(_)));

        // A failed send never counts as "last sent"; the next attempt sends.
        sink.set_failure(None);
        let outcome = block_on(coordinator.sync_remote(&store, 2000));
        assert_eq!(outcome, RemoteSyncOutcome::Sent);
        assert_eq!(sink.attempts(), 2);
    }

    #[test]
    fn test_payload_includes_lines_and_shapes() {
        let sink = Arc::new(MemoryAnswerSink::new());
        let mut coordinator = PersistenceCoordinator::new(
            Arc::new(MemoryStorage::new()),
            sink.clone(),
            "e1",
            "q1",
            "s1",
        );
        let mut store = PageStore::new();
        draw(&mut store, 1.0);
        let mut shape = ShapeElement::anchored(
            crate::elements::ShapeKind::Rectangle,
            Point::new(0.0, 0.0),
            Rgba::black(),
            2.0,
        );
        shape.drag_to(Point::new(4.0, 4.0));
        store.active_page_mut().push_shape(shape);

        block_on(coordinator.sync_remote(&store, 1000));

        let request = &sink.requests()[0];
        assert_eq!(request.exam_id, "e1");
        assert_eq!(request.question_id, "q1");
        let payload: AnswerPayload = serde_json::from_str(&request.payload).unwrap();
        assert_eq!(payload.lines.len(), 1);
        assert_eq!(payload.shapes.len(), 1);
        assert_eq!(payload.timestamp, 1000);
    }
}
