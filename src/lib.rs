//! # resumind
//!
//! AI review of PDF resumes against a target job.
//!
//! A resume is uploaded, its first page is rendered to a PNG, and a vision
//! model scores it overall and across five categories (ATS, tone & style,
//! content, structure, skills) with tips for each. The scored record is kept
//! in a key-value store so it can be viewed later.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Upload     store the resume                      (uploading-file)
//!  ├─ 2. Render     page 1 at 4× via pdfium, PNG-encoded  (converting)
//!  ├─ 3. Upload     store the page image                  (uploading-image)
//!  ├─ 4. Draft      save the record with empty feedback   (persisting-draft)
//!  ├─ 5. Infer      three models in order, 60 s each      (inferring)
//!  ├─ 6. Normalize  strip fences, parse feedback JSON
//!  └─ 7. Save       overwrite the record with feedback    (persisting-result)
//! ```
//!
//! Authentication, storage, key-value persistence, and model inference are
//! collaborators behind the traits in [`platform`]. File-backed versions and
//! an edgequake-llm inference service ship with the crate.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resumind::{Platform, ReviewConfig, Reviewer, SubmissionForm};
//! use resumind::pipeline::input::resolve_resume;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider picked from EDGEQUAKE_LLM_PROVIDER (default: anthropic)
//!     let config = ReviewConfig::default();
//!     let platform = Platform::local("./.resumind", "me", &config);
//!     platform.auth.sign_in().await?;
//!
//!     let reviewer = Reviewer::new(platform, config);
//!     let resume = resolve_resume("resume.pdf", 120).await?;
//!     let outcome = reviewer
//!         .submit(SubmissionForm::new(resume).job_title("Backend Engineer"))
//!         .await?;
//!     println!("{}", resumind::report::render_submission(&outcome.submission));
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `resumind` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! resumind = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod feedback;
pub mod pipeline;
pub mod platform;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod review;
pub mod submission;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ReviewConfig, ReviewConfigBuilder, DEFAULT_MODELS};
pub use error::{InferenceError, NormalizeError, PlatformError, RasterError, ReviewError};
pub use feedback::{Category, Feedback, Score, TipKind};
pub use pipeline::infer::{AttemptTiming, ModelReply, Orchestrator};
pub use pipeline::render::{ConversionResult, ImageArtifact, Rasterizer};
pub use platform::{
    AuthService, InferenceResponse, InferenceService, KvStore, ObjectStore, Platform, UploadFile,
};
pub use progress::{NoopProgressCallback, ProgressCallback, ReviewProgressCallback};
pub use review::{ReviewOutcome, Reviewer, SubmissionForm, WipeReport};
pub use submission::Submission;
pub use workflow::{WorkflowState, WorkflowTracker};
