//! Progress-callback trait for submission workflow events.
//!
//! Inject an [`Arc<dyn ReviewProgressCallback>`] via
//! [`crate::config::ReviewConfigBuilder::progress_callback`] to receive the
//! status line and structured events as a submission moves through its stages.
//!
//! # Example
//!
//! ```rust
//! use resumind::{ReviewConfig, ReviewProgressCallback};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ReviewProgressCallback for Printer {
//!     fn on_status(&self, status: &str) {
//!         eprintln!("{status}");
//!     }
//! }
//!
//! let config = ReviewConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn ReviewProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::workflow::WorkflowState;
use std::sync::Arc;
use std::time::Duration;

/// Called by the workflow and the inference orchestrator as a submission
/// progresses.
///
/// All methods default to no-ops. Calls are made synchronously from the task
/// running the submission, in order.
pub trait ReviewProgressCallback: Send + Sync {
    /// The single human-readable status line changed.
    fn on_status(&self, status: &str) {
        let _ = status;
    }

    /// The workflow entered `state`.
    fn on_state(&self, state: WorkflowState) {
        let _ = state;
    }

    /// A model attempt is starting.
    ///
    /// # Arguments
    /// * `position` — 1-indexed position in the candidate list
    /// * `total`    — number of candidates
    fn on_model_start(&self, model: &str, position: usize, total: usize) {
        let _ = (model, position, total);
    }

    /// Periodic tick while a model attempt is in flight.
    fn on_model_tick(&self, model: &str, elapsed: Duration) {
        let _ = (model, elapsed);
    }

    /// A model attempt failed or timed out.
    fn on_model_error(&self, model: &str, error: &str) {
        let _ = (model, error);
    }

    /// The submission was stored with feedback.
    fn on_complete(&self, submission_id: &str) {
        let _ = submission_id;
    }
}

/// Default callback when none is configured.
pub struct NoopProgressCallback;

impl ReviewProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReviewConfig`].
pub type ProgressCallback = Arc<dyn ReviewProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        lines: Mutex<Vec<String>>,
    }

    impl ReviewProgressCallback for Recorder {
        fn on_status(&self, status: &str) {
            self.lines.lock().unwrap().push(status.to_string());
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_status("Uploading the file...");
        cb.on_state(WorkflowState::Converting);
        cb.on_model_start("m", 1, 3);
        cb.on_model_tick("m", Duration::from_secs(5));
        cb.on_model_error("m", "boom");
        cb.on_complete("id");
    }

    #[test]
    fn overridden_methods_receive_events() {
        let rec = Recorder::default();
        rec.on_status("one");
        rec.on_model_start("ignored", 1, 1);
        rec.on_status("two");
        assert_eq!(*rec.lines.lock().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_status("x");
    }
}
