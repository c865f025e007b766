//! The submission workflow and record queries.
//!
//! A [`Reviewer`] owns the platform collaborators, the rasteriser, and the
//! model orchestrator, and walks one submission through
//! [`WorkflowState`](crate::workflow::WorkflowState) from upload to stored
//! feedback. Stages run strictly one after another; the first failure moves
//! the tracker to `error`, its message becomes the final status line, and no
//! later stage runs.

use crate::config::ReviewConfig;
use crate::error::{PlatformError, ReviewError};
use crate::pipeline::infer::Orchestrator;
use crate::pipeline::normalize::normalize;
use crate::pipeline::render::{ConversionResult, Rasterizer};
use crate::platform::{Platform, StoredFile, UploadFile};
use crate::progress::{NoopProgressCallback, ReviewProgressCallback};
use crate::prompts::prepare_instructions;
use crate::submission::{record_key, result_route, Submission, KEY_PREFIX};
use crate::workflow::{WorkflowState, WorkflowTracker};
use std::slice;
use tracing::{debug, info, warn};

/// What the user filled in.
#[derive(Debug, Clone)]
pub struct SubmissionForm {
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
    pub resume: UploadFile,
}

impl SubmissionForm {
    pub fn new(resume: UploadFile) -> Self {
        Self {
            company_name: String::new(),
            job_title: String::new(),
            job_description: String::new(),
            resume,
        }
    }

    pub fn company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = name.into();
        self
    }

    pub fn job_title(mut self, title: impl Into<String>) -> Self {
        self.job_title = title.into();
        self
    }

    pub fn job_description(mut self, description: impl Into<String>) -> Self {
        self.job_description = description.into();
        self
    }
}

/// A completed submission.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub submission: Submission,
    /// Results view for the submission, `/resume/<id>`.
    pub route: String,
    /// The candidate model that produced the feedback.
    pub model: String,
}

/// Result of [`Reviewer::wipe`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WipeReport {
    pub deleted_files: Vec<StoredFile>,
    /// Submission records present before the key-value flush.
    pub cleared_records: usize,
}

/// Runs submissions against one [`Platform`].
pub struct Reviewer {
    platform: Platform,
    rasterizer: Rasterizer,
    orchestrator: Orchestrator,
    config: ReviewConfig,
}

impl Reviewer {
    /// Reviewer rendering with the system pdfium library.
    pub fn new(platform: Platform, config: ReviewConfig) -> Self {
        let rasterizer = Rasterizer::with_pdfium(config.render_scale);
        Self::with_rasterizer(platform, config, rasterizer)
    }

    pub fn with_rasterizer(
        platform: Platform,
        config: ReviewConfig,
        rasterizer: Rasterizer,
    ) -> Self {
        let orchestrator = Orchestrator::from_config(&config);
        Self {
            platform,
            rasterizer,
            orchestrator,
            config,
        }
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Upload, render, and review one resume.
    ///
    /// On success the stored record carries feedback and the outcome names
    /// the results route. On failure the draft written before inference (if
    /// that stage was reached) stays in the store with empty feedback.
    pub async fn submit(&self, form: SubmissionForm) -> Result<ReviewOutcome, ReviewError> {
        let noop = NoopProgressCallback;
        let sink: &dyn ReviewProgressCallback = match self.config.progress_callback {
            Some(ref cb) => cb.as_ref(),
            None => &noop,
        };
        let tracker = WorkflowTracker::new(sink);

        match self.run(&tracker, form).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let failed_in = tracker.fail(&e.to_string());
                warn!("Submission failed during {}: {}", failed_in, e);
                Err(e)
            }
        }
    }

    /// Blocking wrapper around [`Reviewer::submit`] for non-async callers.
    pub fn submit_sync(&self, form: SubmissionForm) -> Result<ReviewOutcome, ReviewError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| ReviewError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.submit(form))
    }

    async fn run(
        &self,
        tracker: &WorkflowTracker<'_>,
        form: SubmissionForm,
    ) -> Result<ReviewOutcome, ReviewError> {
        self.ensure_signed_in().await?;
        let storage = &self.platform.storage;

        // ── Upload the resume ────────────────────────────────────────────
        tracker.advance(WorkflowState::UploadingFile, "Uploading the file...");
        let resume = storage
            .upload(slice::from_ref(&form.resume))
            .await?
            .ok_or(ReviewError::UploadFailed { what: "file" })?;
        info!("Uploaded {} to {}", form.resume.name, resume.path);

        // ── Render page one ──────────────────────────────────────────────
        tracker.advance(WorkflowState::Converting, "Converting to image...");
        let artifact = match self.rasterizer.convert(&form.resume).await {
            ConversionResult::Converted(artifact) => artifact,
            ConversionResult::Failed(e) => {
                return Err(ReviewError::ConversionFailed(e.to_string()))
            }
        };

        // ── Upload the image ─────────────────────────────────────────────
        tracker.advance(WorkflowState::UploadingImage, "Uploading the image...");
        let image = storage
            .upload(slice::from_ref(&artifact.file))
            .await?
            .ok_or(ReviewError::UploadFailed { what: "image" })?;
        debug!("Uploaded page image to {}", image.path);

        // ── Draft record ─────────────────────────────────────────────────
        tracker.advance(WorkflowState::PersistingDraft, "Preparing data...");
        let mut submission = Submission::draft(
            resume.path,
            image.path,
            form.company_name,
            form.job_title,
            form.job_description,
        );
        self.persist(&submission).await?;
        info!("Saved draft {}", submission.key());

        // ── Inference ────────────────────────────────────────────────────
        tracker.advance(WorkflowState::Inferring, "Analyzing...");
        let prompt = prepare_instructions(
            &submission.job_title,
            &submission.job_description,
            self.config.response_format(),
            self.config.feedback_language.as_deref(),
        );
        let reply = self
            .orchestrator
            .run(
                self.platform.inference.as_ref(),
                &submission.image_path,
                &prompt,
                tracker,
            )
            .await?;
        let feedback = normalize(&reply.response)?;

        // ── Result ───────────────────────────────────────────────────────
        tracker.advance(WorkflowState::PersistingResult, "Saving results...");
        submission.feedback = Some(feedback);
        self.persist(&submission).await?;

        tracker.advance(WorkflowState::Complete, "Analysis complete, redirecting...");
        tracker.on_complete(&submission.id);
        info!(
            "Review {} complete with {} (score {})",
            submission.id,
            reply.model,
            submission
                .feedback
                .as_ref()
                .map(|f| f.overall_score.to_string())
                .unwrap_or_default()
        );

        Ok(ReviewOutcome {
            route: result_route(&submission.id),
            submission,
            model: reply.model,
        })
    }

    /// Read one submission by id. A draft comes back with `feedback: None`.
    pub async fn load(&self, id: &str) -> Result<Submission, ReviewError> {
        self.ensure_signed_in().await?;
        let key = record_key(id);
        let raw = self
            .platform
            .kv
            .get(&key)
            .await?
            .ok_or_else(|| ReviewError::NotFound { id: id.to_string() })?;
        parse_record(&key, &raw)
    }

    /// All stored submissions, in key order. Unreadable records are skipped.
    pub async fn list(&self) -> Result<Vec<Submission>, ReviewError> {
        self.ensure_signed_in().await?;
        let keys = self.platform.kv.list(KEY_PREFIX).await?;

        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(raw) = self.platform.kv.get(&key).await? else {
                continue;
            };
            match parse_record(&key, &raw) {
                Ok(submission) => out.push(submission),
                Err(e) => warn!("Skipping {}: {}", key, e),
            }
        }
        Ok(out)
    }

    /// Delete every stored file and flush the key-value store.
    pub async fn wipe(&self) -> Result<WipeReport, ReviewError> {
        self.ensure_signed_in().await?;
        let storage = &self.platform.storage;

        let files = storage.read_dir("./").await?;
        let mut deleted_files = Vec::with_capacity(files.len());
        for file in files {
            storage.delete(&file.path).await?;
            debug!("Deleted {}", file.path);
            deleted_files.push(file);
        }

        let cleared_records = self.platform.kv.list(KEY_PREFIX).await?.len();
        self.platform.kv.flush().await?;
        info!(
            "Wiped {} file(s) and {} record(s)",
            deleted_files.len(),
            cleared_records
        );

        Ok(WipeReport {
            deleted_files,
            cleared_records,
        })
    }

    async fn ensure_signed_in(&self) -> Result<(), ReviewError> {
        if self.platform.auth.is_authenticated().await? {
            Ok(())
        } else {
            Err(ReviewError::NotAuthenticated)
        }
    }

    async fn persist(&self, submission: &Submission) -> Result<(), ReviewError> {
        let key = submission.key();
        let value = serde_json::to_string(submission).map_err(|e| ReviewError::Persist {
            key: key.clone(),
            source: PlatformError::Serde(e),
        })?;
        self.platform
            .kv
            .set(&key, &value)
            .await
            .map_err(|source| ReviewError::Persist { key, source })
    }
}

fn parse_record(key: &str, raw: &str) -> Result<Submission, ReviewError> {
    serde_json::from_str(raw).map_err(|e| ReviewError::CorruptRecord {
        key: key.to_string(),
        detail: e.to_string(),
    })
}
