//! Submission workflow states and the forward-only tracker that walks them.
//!
//! ```text
//! idle → uploading-file → converting → uploading-image → persisting-draft
//!      → inferring → persisting-result → complete
//!
//! any non-terminal state ──▶ error
//! ```

use crate::progress::ReviewProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowState {
    Idle,
    UploadingFile,
    Converting,
    UploadingImage,
    PersistingDraft,
    Inferring,
    PersistingResult,
    Complete,
    Error,
}

impl WorkflowState {
    /// Position in the forward order; `Error` sits outside it.
    fn rank(self) -> Option<u8> {
        Some(match self {
            WorkflowState::Idle => 0,
            WorkflowState::UploadingFile => 1,
            WorkflowState::Converting => 2,
            WorkflowState::UploadingImage => 3,
            WorkflowState::PersistingDraft => 4,
            WorkflowState::Inferring => 5,
            WorkflowState::PersistingResult => 6,
            WorkflowState::Complete => 7,
            WorkflowState::Error => return None,
        })
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowState::Complete | WorkflowState::Error)
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_advance_to(self, next: WorkflowState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(a), Some(b)) => b == a + 1,
            (None, _) => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::UploadingFile => "uploading-file",
            WorkflowState::Converting => "converting",
            WorkflowState::UploadingImage => "uploading-image",
            WorkflowState::PersistingDraft => "persisting-draft",
            WorkflowState::Inferring => "inferring",
            WorkflowState::PersistingResult => "persisting-result",
            WorkflowState::Complete => "complete",
            WorkflowState::Error => "error",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks one submission's state and its status line, forwarding both to a
/// progress callback.
///
/// Also implements [`ReviewProgressCallback`] so the orchestrator's status
/// updates land in the same line.
pub struct WorkflowTracker<'a> {
    inner: Mutex<TrackerState>,
    sink: &'a dyn ReviewProgressCallback,
}

struct TrackerState {
    state: WorkflowState,
    status: String,
}

impl<'a> WorkflowTracker<'a> {
    pub fn new(sink: &'a dyn ReviewProgressCallback) -> Self {
        Self {
            inner: Mutex::new(TrackerState {
                state: WorkflowState::Idle,
                status: String::new(),
            }),
            sink,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.lock().state
    }

    pub fn status(&self) -> String {
        self.lock().status.clone()
    }

    /// Move to `next` and set the status line.
    ///
    /// Illegal transitions are ignored and logged; the tracker never moves
    /// backwards or out of a terminal state.
    pub fn advance(&self, next: WorkflowState, status: &str) -> bool {
        {
            let mut inner = self.lock();
            if !inner.state.can_advance_to(next) {
                warn!("Ignoring workflow transition {} → {}", inner.state, next);
                return false;
            }
            debug!("Workflow {} → {}", inner.state, next);
            inner.state = next;
            inner.status = status.to_string();
        }
        self.sink.on_state(next);
        self.sink.on_status(status);
        true
    }

    /// Enter `error` with `Error: <message>` as the final status line.
    pub fn fail(&self, message: &str) -> WorkflowState {
        let failed_in = self.state();
        self.advance(WorkflowState::Error, &format!("Error: {message}"));
        failed_in
    }

    fn set_status(&self, status: &str) {
        self.lock().status = status.to_string();
        self.sink.on_status(status);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ReviewProgressCallback for WorkflowTracker<'_> {
    fn on_status(&self, status: &str) {
        self.set_status(status);
    }

    fn on_state(&self, state: WorkflowState) {
        self.sink.on_state(state);
    }

    fn on_model_start(&self, model: &str, position: usize, total: usize) {
        self.sink.on_model_start(model, position, total);
    }

    fn on_model_tick(&self, model: &str, elapsed: std::time::Duration) {
        self.sink.on_model_tick(model, elapsed);
    }

    fn on_model_error(&self, model: &str, error: &str) {
        self.sink.on_model_error(model, error);
    }

    fn on_complete(&self, submission_id: &str) {
        self.sink.on_complete(submission_id);
    }
}
