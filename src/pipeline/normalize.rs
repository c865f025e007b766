//! Turn a model reply into a [`Feedback`] record.
//!
//! Models are asked for bare JSON but routinely wrap it in Markdown fences,
//! with or without a language tag. Fences are stripped and the text is
//! parsed as JSON. Only a JSON syntax error is fatal: the parsed value is read
//! leniently into [`Feedback`], and scores that are missing or outside
//! `0..=100` are logged, not corrected.

use crate::error::NormalizeError;
use crate::feedback::Feedback;
use crate::platform::{InferenceResponse, MessageContent};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[A-Za-z0-9_-]*\n?").unwrap());

/// The reply text: the string body, or the first content block's text.
pub fn extract_text(response: &InferenceResponse) -> Option<&str> {
    match &response.message.content {
        MessageContent::Text(text) => Some(text.as_str()),
        MessageContent::Blocks(blocks) => blocks.first().and_then(|b| b.text.as_deref()),
    }
}

/// Remove every code-fence delimiter and trim the result.
pub fn strip_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").trim().to_string()
}

/// Extract, clean, and parse a feedback record.
pub fn normalize(response: &InferenceResponse) -> Result<Feedback, NormalizeError> {
    let raw = extract_text(response).ok_or(NormalizeError::MissingContent)?;
    let cleaned = strip_fences(raw);
    debug!("Normalising {} chars of model output", cleaned.len());

    let value: serde_json::Value = serde_json::from_str(&cleaned).map_err(|e| {
        warn!("Unparseable model output: {}", e);
        NormalizeError::MalformedResponse {
            detail: format!("invalid JSON: {e}"),
            raw: raw.to_string(),
        }
    })?;

    let feedback = Feedback::from_json(&value);
    for (field, score) in feedback.scores() {
        if !score.in_range() {
            warn!("Model reported {} = {} (expected 0-100)", field, score);
        }
    }
    Ok(feedback)
}
