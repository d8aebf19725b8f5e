//! Collaborator contracts for answer storage and submission.
//!
//! The engine never talks to a transport directly; the embedding application
//! implements these traits over whatever client it uses. In-memory
//! implementations are provided for tests and offline development.

use crate::page::Page;
use crate::storage::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use thiserror::Error;

/// Errors surfaced by the remote collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The collaborator already holds a submission for this exam/student.
    /// Tolerated by the engine, never a crash.
    #[error("submission already recorded")]
    AlreadySubmitted,
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// One page's serialized drawing payload keyed for the answer-storage
/// service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSaveRequest {
    pub exam_id: String,
    pub question_id: String,
    /// Serialized [`crate::persist::AnswerPayload`].
    pub payload: String,
}

/// Finalized answer artifact accepted by the exam-submission service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalAnswerArtifact {
    pub exam_id: String,
    pub question_id: String,
    pub student_id: String,
    pub pages: BTreeMap<u32, Page>,
    pub current_page: u32,
    pub timestamp: u64,
}

/// Remote save endpoint (answer-storage service).
pub trait AnswerSink: Send + Sync {
    /// Store a page's drawing payload. Only "accepted" is communicated back.
    fn save_answer(&self, request: &AnswerSaveRequest) -> BoxFuture<'_, RemoteResult<()>>;
}

/// Submission endpoint (exam-submission service).
///
/// At-most-one submission per (exam, student) is enforced by the
/// collaborator, which signals a duplicate with
/// [`RemoteError::AlreadySubmitted`].
pub trait SubmissionSink: Send + Sync {
    fn submit(&self, artifact: &FinalAnswerArtifact) -> BoxFuture<'_, RemoteResult<()>>;
}

/// In-memory answer sink recording every accepted request.
#[derive(Default)]
pub struct MemoryAnswerSink {
    requests: Mutex<Vec<AnswerSaveRequest>>,
    attempts: Mutex<usize>,
    /// When set, every save attempt fails with this error.
    failure: Mutex<Option<RemoteError>>,
}

impl MemoryAnswerSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests accepted so far.
    pub fn requests(&self) -> Vec<AnswerSaveRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of accepted save calls.
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Number of network calls that reached the sink, failed included.
    pub fn attempts(&self) -> usize {
        self.attempts.lock().map(|a| *a).unwrap_or(0)
    }

    /// Make subsequent saves fail with `error` (`None` restores success).
    pub fn set_failure(&self, error: Option<RemoteError>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = error;
        }
    }
}

impl AnswerSink for MemoryAnswerSink {
    fn save_answer(&self, request: &AnswerSaveRequest) -> BoxFuture<'_, RemoteResult<()>> {
        let request = request.clone();
        Box::pin(async move {
            if let Ok(mut attempts) = self.attempts.lock() {
                *attempts += 1;
            }
            if let Some(error) = self.failure.lock().ok().and_then(|f| f.clone()) {
                return Err(error);
            }
            self.requests
                .lock()
                .map_err(|e| RemoteError::Network(format!("lock error: {e}")))?
                .push(request);
            Ok(())
        })
    }
}

/// In-memory submission sink enforcing the collaborator's at-most-one rule.
#[derive(Default)]
pub struct MemorySubmissionSink {
    submitted: Mutex<Option<FinalAnswerArtifact>>,
}

impl MemorySubmissionSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded submission, if any.
    pub fn submission(&self) -> Option<FinalAnswerArtifact> {
        self.submitted.lock().ok().and_then(|s| s.clone())
    }
}

impl SubmissionSink for MemorySubmissionSink {
    fn submit(&self, artifact: &FinalAnswerArtifact) -> BoxFuture<'_, RemoteResult<()>> {
        let artifact = artifact.clone();
        Box::pin(async move {
            let mut submitted = self
                .submitted
                .lock()
                .map_err(|e| RemoteError::Network(format!("lock error: {e}")))?;
            if submitted.is_some() {
                return Err(RemoteError::AlreadySubmitted);
            }
            *submitted = Some(artifact);
            Ok(())
        })
    }
}
