//! Error types for the resumind library.
//!
//! Failures are split by the boundary they cross:
//!
//! * [`RasterError`] — the PDF could not be turned into an image. Never
//!   escapes the rasteriser: it is carried inside
//!   [`crate::pipeline::render::ConversionResult`] so the caller decides.
//!
//! * [`InferenceError`] — a model attempt failed or timed out. Per-model
//!   failures drive fallback inside the orchestrator; only
//!   [`InferenceError::AllModelsFailed`] leaves it.
//!
//! * [`NormalizeError`] — the winning model answered, but not with usable JSON.
//!
//! * [`PlatformError`] — an external collaborator (storage, key-value store,
//!   auth, inference endpoint) reported a failure.
//!
//! * [`ReviewError`] — **Fatal** for one submission: the workflow halts and the
//!   message is shown verbatim as the final status line.

use std::path::PathBuf;
use thiserror::Error;

/// Failure inside the rasteriser.
///
/// `Clone` because one library-load outcome is shared by every caller that
/// was waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RasterError {
    /// The PDF rendering library could not be initialised.
    #[error("Failed to load PDF engine: {0}")]
    Load(String),

    /// The document parsed but contains no pages.
    #[error("PDF has no pages")]
    EmptyDocument,

    /// The bytes could not be parsed as a PDF document.
    #[error("PDF is corrupt or unreadable: {0}")]
    CorruptPdf(String),

    /// pdfium failed while drawing the page.
    #[error("Failed to render page {page}: {detail}")]
    Render { page: usize, detail: String },

    /// The raster surface could not be encoded as PNG.
    #[error("Failed to create image blob from canvas: {0}")]
    Encoding(String),

    #[error("Internal rasteriser error: {0}")]
    Internal(String),
}

/// Failure of a single model attempt, or of the whole candidate list.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The attempt did not settle within the per-model timeout.
    #[error("Analysis timed out after {secs} seconds with {model}")]
    Timeout { model: String, secs: u64 },

    /// The inference endpoint rejected the request or returned nothing.
    #[error("{model} failed: {detail}")]
    ModelFailed { model: String, detail: String },

    /// Every candidate was tried and none succeeded.
    #[error("All {attempts} models failed; last error: {last}")]
    AllModelsFailed {
        attempts: usize,
        #[source]
        last: Box<InferenceError>,
    },

    /// The candidate list was empty so nothing was attempted.
    #[error("All models failed to provide feedback")]
    NoCandidates,
}

impl InferenceError {
    /// The model this error is attributed to, if any.
    pub fn model(&self) -> Option<&str> {
        match self {
            InferenceError::Timeout { model, .. } | InferenceError::ModelFailed { model, .. } => {
                Some(model)
            }
            InferenceError::AllModelsFailed { last, .. } => last.model(),
            InferenceError::NoCandidates => None,
        }
    }
}

/// The model's reply could not be turned into a feedback record.
#[derive(Debug, Clone, Error)]
pub enum NormalizeError {
    /// Neither a string body nor a text block was present.
    #[error("Failed to analyze resume - Invalid response format")]
    MissingContent,

    /// Text was present but did not parse as a feedback object.
    ///
    /// `raw` keeps the unmodified model text for offline debugging.
    #[error("Failed to parse analysis response. Please try again. ({detail})")]
    MalformedResponse { detail: String, raw: String },
}

/// Failure reported by an external collaborator.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Key-value store error: {0}")]
    KeyValue(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Inference endpoint error: {0}")]
    Inference(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialisation error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// All fatal errors returned by the submission workflow and record queries.
#[derive(Debug, Error)]
pub enum ReviewError {
    // ── Gate ──────────────────────────────────────────────────────────────
    #[error("Not signed in.\nRun `resumind sign-in` first.")]
    NotAuthenticated,

    // ── Input ─────────────────────────────────────────────────────────────
    #[error("Resume file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    #[error("File is not a PDF: '{name}'\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: Vec<u8> },

    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Workflow stages ───────────────────────────────────────────────────
    /// The storage call returned no stored entry.
    #[error("Failed to upload {what}")]
    UploadFailed { what: &'static str },

    /// The rasteriser produced no image; its diagnostic is kept verbatim.
    #[error("Failed to convert PDF to image - {0}")]
    ConversionFailed(String),

    #[error("Failed to save submission '{key}': {source}")]
    Persist {
        key: String,
        #[source]
        source: PlatformError,
    },

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    // ── Records ───────────────────────────────────────────────────────────
    #[error("No submission with id '{id}'")]
    NotFound { id: String },

    #[error("Stored record '{key}' is unreadable: {detail}")]
    CorruptRecord { key: String, detail: String },

    // ── Config ────────────────────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display_names_model() {
        let e = InferenceError::Timeout {
            model: "claude-sonnet-4".into(),
            secs: 60,
        };
        let msg = e.to_string();
        assert!(msg.contains("60 seconds"), "got: {msg}");
        assert!(msg.contains("claude-sonnet-4"), "got: {msg}");
    }

    #[test]
    fn all_models_failed_exposes_last_error() {
        let e = InferenceError::AllModelsFailed {
            attempts: 3,
            last: Box::new(InferenceError::ModelFailed {
                model: "c".into(),
                detail: "overloaded".into(),
            }),
        };
        assert!(e.to_string().contains("overloaded"));
        assert_eq!(e.model(), Some("c"));
        let source = std::error::Error::source(&e).expect("source should be set");
        assert!(source.to_string().contains("overloaded"));
    }

    #[test]
    fn conversion_failure_keeps_diagnostic() {
        let e = ReviewError::ConversionFailed(RasterError::EmptyDocument.to_string());
        assert_eq!(
            e.to_string(),
            "Failed to convert PDF to image - PDF has no pages"
        );
    }

    #[test]
    fn upload_failure_display() {
        let e = ReviewError::UploadFailed { what: "image" };
        assert_eq!(e.to_string(), "Failed to upload image");
    }

    #[test]
    fn normalize_errors_pass_through_transparently() {
        let e: ReviewError = NormalizeError::MissingContent.into();
        assert_eq!(
            e.to_string(),
            "Failed to analyze resume - Invalid response format"
        );
    }
}
