//! Configuration for the resume review workflow.
//!
//! Every knob lives in [`ReviewConfig`], built through
//! [`ReviewConfigBuilder`]. Setters clamp out-of-range values; `build()`
//! rejects combinations that cannot work at all.

use crate::error::ReviewError;
use crate::progress::ProgressCallback;
use crate::prompts::AI_RESPONSE_FORMAT;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Candidate models, tried in this order until one succeeds.
pub const DEFAULT_MODELS: [&str; 3] = [
    "claude-3-5-sonnet-20241022",
    "claude-sonnet-4",
    "claude-3-opus-20240229",
];

/// Configuration for a review.
///
/// # Example
/// ```rust
/// use resumind::ReviewConfig;
///
/// let config = ReviewConfig::builder()
///     .models(["claude-sonnet-4", "gpt-4.1"])
///     .attempt_timeout_secs(90)
///     .feedback_language("Persian")
///     .build()
///     .unwrap();
/// assert_eq!(config.models.len(), 2);
/// ```
#[derive(Clone)]
pub struct ReviewConfig {
    /// Ordered candidate model identifiers. First success wins.
    pub models: Vec<String>,

    /// Per-model timeout in seconds. Default: 60.
    pub attempt_timeout_secs: u64,

    /// Interval between elapsed-time progress ticks in seconds. Default: 5.
    pub progress_interval_secs: u64,

    /// Pause before trying the next model after a failure, in milliseconds.
    /// Default: 1000. Not applied after the last candidate.
    pub fallback_delay_ms: u64,

    /// Scale factor applied to the first page when rasterising. Default: 4.0.
    pub render_scale: f32,

    /// Language all feedback text must be written in. Default: none.
    pub feedback_language: Option<String>,

    /// Replacement for [`AI_RESPONSE_FORMAT`].
    pub response_format: Option<String>,

    /// edgequake-llm provider name used by [`crate::platform::llm::LlmInference`].
    /// If None, `EDGEQUAKE_LLM_PROVIDER` is consulted, then `"anthropic"`.
    pub provider_name: Option<String>,

    /// Pre-constructed provider used for every candidate model. Takes
    /// precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    pub max_tokens: usize,

    /// Receives status updates as the workflow runs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            attempt_timeout_secs: 60,
            progress_interval_secs: 5,
            fallback_delay_ms: 1000,
            render_scale: 4.0,
            feedback_language: None,
            response_format: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReviewConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewConfig")
            .field("models", &self.models)
            .field("attempt_timeout_secs", &self.attempt_timeout_secs)
            .field("progress_interval_secs", &self.progress_interval_secs)
            .field("fallback_delay_ms", &self.fallback_delay_ms)
            .field("render_scale", &self.render_scale)
            .field("feedback_language", &self.feedback_language)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ReviewProgressCallback>"),
            )
            .finish()
    }
}

impl ReviewConfig {
    pub fn builder() -> ReviewConfigBuilder {
        ReviewConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }

    pub fn response_format(&self) -> &str {
        self.response_format.as_deref().unwrap_or(AI_RESPONSE_FORMAT)
    }

    /// Provider name for the LLM adapter.
    pub fn resolved_provider_name(&self) -> String {
        if let Some(ref name) = self.provider_name {
            return name.clone();
        }
        match std::env::var("EDGEQUAKE_LLM_PROVIDER") {
            Ok(p) if !p.is_empty() => p,
            _ => "anthropic".to_string(),
        }
    }
}

/// Builder for [`ReviewConfig`].
#[derive(Debug)]
pub struct ReviewConfigBuilder {
    config: ReviewConfig,
}

impl ReviewConfigBuilder {
    pub fn models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.models = models
            .into_iter()
            .map(|m| {
                let m: String = m.into();
                m.trim().to_string()
            })
            .filter(|m| !m.is_empty())
            .collect();
        self
    }

    pub fn attempt_timeout_secs(mut self, secs: u64) -> Self {
        self.config.attempt_timeout_secs = secs;
        self
    }

    pub fn progress_interval_secs(mut self, secs: u64) -> Self {
        self.config.progress_interval_secs = secs.max(1);
        self
    }

    pub fn fallback_delay_ms(mut self, ms: u64) -> Self {
        self.config.fallback_delay_ms = ms;
        self
    }

    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale.clamp(0.5, 8.0);
        self
    }

    pub fn feedback_language(mut self, language: impl Into<String>) -> Self {
        self.config.feedback_language = Some(language.into());
        self
    }

    pub fn response_format(mut self, format: impl Into<String>) -> Self {
        self.config.response_format = Some(format.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReviewConfig, ReviewError> {
        let c = &self.config;
        if c.models.is_empty() {
            return Err(ReviewError::InvalidConfig(
                "At least one candidate model is required".into(),
            ));
        }
        if c.attempt_timeout_secs == 0 {
            return Err(ReviewError::InvalidConfig(
                "Per-model timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(ReviewError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}
