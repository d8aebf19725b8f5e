//! Exam answering session: canvas state, history, persistence and countdown.

use crate::clock::{ClockState, ClockTransition, ExamClock, DEFAULT_WARNING_THRESHOLD_SECS};
use crate::elements::Rgba;
use crate::input::PointerEvent;
use crate::page::PageStore;
use crate::persist::{
    PersistenceCoordinator, RemoteSyncOutcome, DEFAULT_LOCAL_SAVE_INTERVAL_SECS,
    DEFAULT_REMOTE_SYNC_INTERVAL_SECS,
};
use crate::remote::{AnswerSink, FinalAnswerArtifact, RemoteError, RemoteResult, SubmissionSink};
use crate::storage::Storage;
use crate::tools::{CommittedElement, ToolEngine, ToolKind};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Configuration for one exam answering session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub exam_id: String,
    pub question_id: String,
    pub student_id: String,
    /// Exam duration in seconds.
    pub duration_secs: u64,
    pub warning_threshold_secs: u64,
    pub local_save_interval: Duration,
    pub remote_sync_interval: Duration,
    /// Canvas background; the eraser draws with it.
    pub background: Rgba,
}

impl SessionConfig {
    pub fn new(
        exam_id: impl Into<String>,
        question_id: impl Into<String>,
        student_id: impl Into<String>,
        duration_secs: u64,
    ) -> Self {
        Self {
            exam_id: exam_id.into(),
            question_id: question_id.into(),
            student_id: student_id.into(),
            duration_secs,
            warning_threshold_secs: DEFAULT_WARNING_THRESHOLD_SECS,
            local_save_interval: Duration::from_secs(DEFAULT_LOCAL_SAVE_INTERVAL_SECS),
            remote_sync_interval: Duration::from_secs(DEFAULT_REMOTE_SYNC_INTERVAL_SECS),
            background: Rgba::white(),
        }
    }
}

/// Events surfaced to the embedding UI, drained via
/// [`ExamSession::drain_events`]. The engine never renders notifications
/// itself; presentation stays with the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LocalSaved,
    LocalSaveFailed(String),
    RemoteSaved,
    RemoteUnchanged,
    RemoteSaveFailed(String),
    WarningEntered,
    Expired,
    Submitted,
    AlreadySubmitted,
    SubmitFailed(String),
}

/// Outcome of a submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    /// The collaborator already holds a submission; tolerated, not an error.
    AlreadySubmitted,
}

/// One student's answering session for one exam question.
///
/// Owns the page store, tool engine, persistence coordinator and countdown
/// clock. All mutation enters through pointer events, the page/undo
/// operations and [`advance`](ExamSession::advance); the embedding UI drives
/// `advance` with real elapsed time and drains [`SessionEvent`]s after each
/// call.
pub struct ExamSession<S: Storage, A: AnswerSink, F: SubmissionSink> {
    config: SessionConfig,
    store: PageStore,
    tools: ToolEngine,
    persistence: PersistenceCoordinator<S, A>,
    submission: Arc<F>,
    clock: ExamClock,
    events: Vec<SessionEvent>,
    closed: bool,
}

impl<S: Storage, A: AnswerSink, F: SubmissionSink> ExamSession<S, A, F> {
    /// Start a session, restoring drawing state from the local cache when a
    /// readable entry exists for this exam and student.
    pub async fn load_or_new(
        config: SessionConfig,
        storage: Arc<S>,
        answers: Arc<A>,
        submission: Arc<F>,
    ) -> Self {
        let persistence = PersistenceCoordinator::new(
            storage,
            answers,
            config.exam_id.clone(),
            config.question_id.clone(),
            config.student_id.clone(),
        )
        .with_intervals(config.local_save_interval, config.remote_sync_interval);

        let store = match persistence.load().await {
            Some(state) => {
                log::info!(
                    "restored cached answer for exam {} ({} pages)",
                    config.exam_id,
                    state.pages.len()
                );
                PageStore::from_parts(state.pages, state.current_page)
            }
            None => PageStore::new(),
        };

        let clock = ExamClock::new(config.duration_secs)
            .with_warning_threshold(config.warning_threshold_secs);

        let mut tools = ToolEngine::new();
        tools.background = config.background;

        Self {
            config,
            store,
            tools,
            persistence,
            submission,
            clock,
            events: Vec::new(),
            closed: false,
        }
    }

    /// Route a normalized pointer event to the active tool.
    ///
    /// Committed elements land on the active page, push a history snapshot
    /// and mark the state dirty. Input after expiry or teardown is ignored.
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        if self.closed || self.clock.is_expired() {
            return;
        }
        if let Some(committed) = self.tools.handle_pointer(event) {
            match committed {
                CommittedElement::Line(line) => self.store.active_page_mut().push_line(line),
                CommittedElement::Shape(shape) => self.store.active_page_mut().push_shape(shape),
            }
            self.store.commit_edit();
            self.persistence.mark_dirty();
        }
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tools.set_tool(tool);
    }

    pub fn set_stroke_color(&mut self, color: Rgba) {
        self.tools.stroke_color = color;
    }

    pub fn set_stroke_width(&mut self, width: f64) {
        self.tools.stroke_width = width;
    }

    /// Undo the last committed edit on the active page.
    pub fn undo(&mut self) -> bool {
        if self.closed {
            return false;
        }
        let changed = self.store.undo();
        if changed {
            self.persistence.mark_dirty();
        }
        changed
    }

    /// Redo the last undone edit on the active page.
    pub fn redo(&mut self) -> bool {
        if self.closed {
            return false;
        }
        let changed = self.store.redo();
        if changed {
            self.persistence.mark_dirty();
        }
        changed
    }

    /// Switch the active page, creating it (and any gap pages) when missing.
    /// A page switch is itself a save-worthy event.
    pub fn switch_page(&mut self, page: u32) -> bool {
        if self.closed {
            return false;
        }
        let switched = self.store.switch_to(page);
        if switched {
            self.tools.cancel();
            self.persistence.mark_dirty();
        }
        switched
    }

    /// Advance the session by elapsed wall time: countdown ticks, due local
    /// saves and due remote syncs. On expiry the finalize path runs (last
    /// save, last sync, forced submission). A closed session ignores this
    /// entirely.
    pub async fn advance(&mut self, dt: Duration) {
        if self.closed {
            return;
        }

        let transitions = self.clock.advance(dt);

        let due = self.persistence.advance(dt);
        if due.local {
            self.do_local_save().await;
        }
        if due.remote {
            self.do_remote_sync().await;
        }

        for transition in transitions {
            match transition {
                ClockTransition::EnteredWarning => self.events.push(SessionEvent::WarningEntered),
                ClockTransition::Expired => {
                    self.events.push(SessionEvent::Expired);
                    self.finalize().await;
                }
            }
        }
    }

    /// Explicit user-invoked save: writes the local cache and attempts a
    /// remote sync immediately.
    pub async fn save_now(&mut self) {
        if self.closed {
            return;
        }
        self.do_local_save().await;
        self.do_remote_sync().await;
    }

    /// Submit the finalized answer artifact.
    ///
    /// A duplicate-submission rejection from the collaborator is a tolerated
    /// outcome, not an error.
    pub async fn submit(&mut self) -> RemoteResult<SubmitOutcome> {
        self.do_local_save().await;
        let artifact = self.artifact();
        match self.submission.submit(&artifact).await {
            Ok(()) => {
                self.events.push(SessionEvent::Submitted);
                Ok(SubmitOutcome::Accepted)
            }
            Err(RemoteError::AlreadySubmitted) => {
                self.events.push(SessionEvent::AlreadySubmitted);
                Ok(SubmitOutcome::AlreadySubmitted)
            }
            Err(e) => {
                log::warn!("submission failed: {e}");
                self.events.push(SessionEvent::SubmitFailed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Tear the session down: stop the countdown, cancel any in-progress
    /// stroke and suppress every future tick. Late `advance` calls after
    /// this are no-ops by contract.
    pub fn close(&mut self) {
        self.closed = true;
        self.tools.cancel();
        self.clock.stop();
    }

    /// Drain events accumulated since the last call.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn store(&self) -> &PageStore {
        &self.store
    }

    pub fn tools(&self) -> &ToolEngine {
        &self.tools
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.clock.remaining_secs()
    }

    pub fn is_dirty(&self) -> bool {
        self.persistence.is_dirty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Forced-submit path on expiry: flush the final state, then submit.
    async fn finalize(&mut self) {
        self.do_remote_sync().await;
        // submit() performs the last local save itself.
        let _ = self.submit().await;
    }

    async fn do_local_save(&mut self) {
        match self
            .persistence
            .save_local(&self.store, unix_timestamp_ms())
            .await
        {
            Ok(()) => self.events.push(SessionEvent::LocalSaved),
            Err(e) => {
                log::warn!("local answer save failed: {e}");
                self.events.push(SessionEvent::LocalSaveFailed(e.to_string()));
            }
        }
    }

    async fn do_remote_sync(&mut self) {
        match self
            .persistence
            .sync_remote(&self.store, unix_timestamp_ms())
            .await
        {
            RemoteSyncOutcome::Sent => self.events.push(SessionEvent::RemoteSaved),
            RemoteSyncOutcome::Unchanged => self.events.push(SessionEvent::RemoteUnchanged),
            RemoteSyncOutcome::Failed(e) => self.events.push(SessionEvent::RemoteSaveFailed(e)),
        }
    }

    fn artifact(&self) -> FinalAnswerArtifact {
        FinalAnswerArtifact {
            exam_id: self.config.exam_id.clone(),
            question_id: self.config.question_id.clone(),
            student_id: self.config.student_id.clone(),
            pages: self.store.clone_pages(),
            current_page: self.store.current_page(),
            timestamp: unix_timestamp_ms(),
        }
    }
}

/// Milliseconds since the Unix epoch.
fn unix_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MemoryAnswerSink, MemorySubmissionSink};
    use crate::storage::{FileStorage, MemoryStorage};
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

    type TestSession = ExamSession<MemoryStorage, MemoryAnswerSink, MemorySubmissionSink>;

    struct TestRig {
        session: TestSession,
        answers: Arc<MemoryAnswerSink>,
        submissions: Arc<MemorySubmissionSink>,
    }

    fn rig_with(config: SessionConfig) -> TestRig {
        let answers = Arc::new(MemoryAnswerSink::new());
        let submissions = Arc::new(MemorySubmissionSink::new());
        let session = block_on(ExamSession::load_or_new(
            config,
            Arc::new(MemoryStorage::new()),
            answers.clone(),
            submissions.clone(),
        ));
        TestRig {
            session,
            answers,
            submissions,
        }
    }

    fn rig() -> TestRig {
        rig_with(SessionConfig::new("e1", "q1", "s1", 3600))
    }

    fn stroke<S: Storage, A: AnswerSink, F: SubmissionSink>(
        session: &mut ExamSession<S, A, F>,
        from: Point,
        to: Point,
    ) {
        session.handle_pointer(PointerEvent::Down { position: from });
        session.handle_pointer(PointerEvent::Move { position: to });
        session.handle_pointer(PointerEvent::Up { position: to });
    }

    #[test]
    fn test_stroke_commits_and_marks_dirty() {
        let mut rig = rig();
        assert!(!rig.session.is_dirty());

        stroke(&mut rig.session, Point::new(0.0, 0.0), Point::new(10.0, 10.0));

        assert_eq!(rig.session.store().active_page().lines.len(), 1);
        assert!(rig.session.is_dirty());
    }

    #[test]
    fn test_undo_redo_round_trip_restores_page() {
        let mut rig = rig();

        stroke(&mut rig.session, Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        stroke(&mut rig.session, Point::new(20.0, 20.0), Point::new(30.0, 30.0));
        let after_edits = rig.session.store().active_page().clone();

        assert!(rig.session.undo());
        assert!(rig.session.undo());
        assert!(rig.session.store().active_page().is_empty());
        assert!(!rig.session.undo());

        assert!(rig.session.redo());
        assert!(rig.session.redo());
        assert!(!rig.session.redo());
        assert_eq!(rig.session.store().active_page(), &after_edits);
    }

    #[test]
    fn test_rectangle_commit_through_session() {
        let mut rig = rig();
        rig.session.set_tool(ToolKind::Rectangle);

        rig.session.handle_pointer(PointerEvent::Down {
            position: Point::new(10.0, 10.0),
        });
        rig.session.handle_pointer(PointerEvent::Up {
            position: Point::new(50.0, 30.0),
        });

        let shape = &rig.session.store().active_page().shapes[0];
        assert_eq!(shape.x, 10.0);
        assert_eq!(shape.y, 10.0);
        assert_eq!(shape.width, Some(40.0));
        assert_eq!(shape.height, Some(20.0));
    }

    #[test]
    fn test_page_switch_marks_dirty_and_preserves_content() {
        let mut rig = rig();
        stroke(&mut rig.session, Point::new(0.0, 0.0), Point::new(5.0, 5.0));
        let page_one = rig.session.store().active_page().clone();
        block_on(rig.session.save_now());
        assert!(!rig.session.is_dirty());

        assert!(rig.session.switch_page(2));
        assert!(rig.session.is_dirty());
        assert!(rig.session.store().active_page().is_empty());

        assert!(rig.session.switch_page(1));
        assert_eq!(rig.session.store().active_page(), &page_one);

        // Switching to the active page is a no-op.
        assert!(!rig.session.switch_page(1));
    }

    #[test]
    fn test_interval_local_save_when_dirty() {
        let mut rig = rig();
        stroke(&mut rig.session, Point::new(0.0, 0.0), Point::new(5.0, 5.0));

        block_on(rig.session.advance(Duration::from_secs(30)));
        let events = rig.session.drain_events();

        assert!(events.contains(&SessionEvent::LocalSaved));
        assert!(!rig.session.is_dirty());
    }

    #[test]
    fn test_remote_short_circuit_over_intervals() {
        let mut rig = rig();
        stroke(&mut rig.session, Point::new(0.0, 0.0), Point::new(5.0, 5.0));

        block_on(rig.session.advance(Duration::from_secs(30)));
        block_on(rig.session.advance(Duration::from_secs(30)));
        let events = rig.session.drain_events();

        // Two remote intervals fired but the content never changed between
        // them: exactly one network call.
        assert_eq!(rig.answers.call_count(), 1);
        assert!(events.contains(&SessionEvent::RemoteSaved));
        assert!(events.contains(&SessionEvent::RemoteUnchanged));
    }

    #[test]
    fn test_remote_failure_surfaces_and_retries_next_tick() {
        let mut rig = rig();
        stroke(&mut rig.session, Point::new(0.0, 0.0), Point::new(5.0, 5.0));

        rig.answers
            .set_failure(Some(RemoteError::Network("offline".to_string())));
        block_on(rig.session.advance(Duration::from_secs(30)));
        assert!(rig
            .session
            .drain_events()
            .iter()
            .any(|e| matches!(e, SessionEvent::RemoteSaveFailed(_))));

        rig.answers.set_failure(None);
        block_on(rig.session.advance(Duration::from_secs(30)));
        assert!(rig.session.drain_events().contains(&SessionEvent::RemoteSaved));
    }

    #[test]
    fn test_expiry_forces_submission_once() {
        let mut rig = rig_with(SessionConfig::new("e1", "q1", "s1", 5));
        stroke(&mut rig.session, Point::new(0.0, 0.0), Point::new(5.0, 5.0));

        block_on(rig.session.advance(Duration::from_secs(5)));
        let events = rig.session.drain_events();

        assert_eq!(rig.session.clock_state(), ClockState::Expired);
        assert!(events.contains(&SessionEvent::Expired));
        assert!(events.contains(&SessionEvent::Submitted));
        let submitted = rig.submissions.submission().expect("forced submission");
        assert_eq!(submitted.pages[&1].lines.len(), 1);

        // Further time changes nothing.
        block_on(rig.session.advance(Duration::from_secs(60)));
        assert_eq!(rig.session.remaining_secs(), 0);
        assert!(!rig.session.drain_events().contains(&SessionEvent::Expired));
    }

    #[test]
    fn test_pointer_input_after_expiry_is_ignored() {
        let mut rig = rig_with(SessionConfig::new("e1", "q1", "s1", 1));
        block_on(rig.session.advance(Duration::from_secs(1)));

        stroke(&mut rig.session, Point::new(0.0, 0.0), Point::new(5.0, 5.0));
        assert!(rig.session.store().active_page().is_empty());
    }

    #[test]
    fn test_duplicate_submission_is_tolerated() {
        let mut rig = rig();

        let first = block_on(rig.session.submit()).unwrap();
        assert_eq!(first, SubmitOutcome::Accepted);

        let second = block_on(rig.session.submit()).unwrap();
        assert_eq!(second, SubmitOutcome::AlreadySubmitted);
    }

    #[test]
    fn test_warning_event_surfaces() {
        let mut rig = rig_with(SessionConfig::new("e1", "q1", "s1", 302));

        block_on(rig.session.advance(Duration::from_secs(2)));
        let events = rig.session.drain_events();

        assert!(events.contains(&SessionEvent::WarningEntered));
        assert_eq!(rig.session.clock_state(), ClockState::Warning);
    }

    #[test]
    fn test_close_makes_advance_a_noop() {
        let mut rig = rig_with(SessionConfig::new("e1", "q1", "s1", 5));
        stroke(&mut rig.session, Point::new(0.0, 0.0), Point::new(5.0, 5.0));

        rig.session.close();
        block_on(rig.session.advance(Duration::from_secs(600)));

        assert!(rig.session.drain_events().is_empty());
        assert_eq!(rig.session.remaining_secs(), 5);
        assert!(rig.submissions.submission().is_none());
        assert!(!rig.session.undo());
        assert!(!rig.session.switch_page(2));
    }

    #[test]
    fn test_restores_state_from_raw_cache_json() {
        let dir = tempfile::tempdir().unwrap();
        let cache = r#"{
            "pages": {
                "1": {
                    "lines": [
                        {"id":"6b7e1e0a-8f0f-4af7-9a3f-111111111111","tool":"pen","points":[1.0,2.0,3.0,4.0],"color":{"r":0,"g":0,"b":0,"a":255},"strokeWidth":2.0},
                        {"id":"6b7e1e0a-8f0f-4af7-9a3f-222222222222","tool":"pen","points":[5.0,6.0],"color":{"r":0,"g":0,"b":0,"a":255},"strokeWidth":2.0}
                    ],
                    "shapes": []
                }
            },
            "currentPage": 1,
            "studentId": "s1",
            "timestamp": 1700000000000
        }"#;
        std::fs::write(dir.path().join("exam-e1-student-s1.json"), cache).unwrap();

        let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()).unwrap());
        let session = block_on(ExamSession::load_or_new(
            SessionConfig::new("e1", "q1", "s1", 3600),
            storage,
            Arc::new(MemoryAnswerSink::new()),
            Arc::new(MemorySubmissionSink::new()),
        ));

        let page = session.store().active_page();
        assert_eq!(session.store().current_page(), 1);
        assert_eq!(page.lines.len(), 2);
        assert_eq!(page.lines[0].points, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(page.lines[1].points, vec![5.0, 6.0]);
        assert!(page.shapes.is_empty());
    }

    #[test]
    fn test_malformed_cache_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("exam-e1-student-s1.json"), "{broken").unwrap();

        let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()).unwrap());
        let session = block_on(ExamSession::load_or_new(
            SessionConfig::new("e1", "q1", "s1", 3600),
            storage,
            Arc::new(MemoryAnswerSink::new()),
            Arc::new(MemorySubmissionSink::new()),
        ));

        assert_eq!(session.store().page_count(), 1);
        assert!(session.store().active_page().is_empty());
    }

    #[test]
    fn test_state_survives_session_restart() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()).unwrap());

        let mut session = block_on(ExamSession::load_or_new(
            SessionConfig::new("e1", "q1", "s1", 3600),
            storage.clone(),
            Arc::new(MemoryAnswerSink::new()),
            Arc::new(MemorySubmissionSink::new()),
        ));
        stroke(&mut session, Point::new(0.0, 0.0), Point::new(9.0, 9.0));
        session.switch_page(2);
        block_on(session.save_now());
        session.close();

        let restored = block_on(ExamSession::load_or_new(
            SessionConfig::new("e1", "q1", "s1", 3600),
            storage,
            Arc::new(MemoryAnswerSink::new()),
            Arc::new(MemorySubmissionSink::new()),
        ));

        assert_eq!(restored.store().current_page(), 2);
        assert_eq!(restored.store().pages()[&1].lines.len(), 1);
    }
}
