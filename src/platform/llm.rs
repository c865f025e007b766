//! [`InferenceService`] backed by edgequake-llm vision providers.
//!
//! The stored artifact is read back from object storage, base64-encoded, and
//! attached to a single user message carrying the review prompt. Only raster
//! images are accepted: providers cannot read a PDF directly, which is why the
//! workflow sends the rendered page.

use super::{InferenceResponse, InferenceService, ObjectStore};
use crate::config::ReviewConfig;
use crate::error::PlatformError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

/// Calls a vision model once per [`InferenceService::feedback`] request.
pub struct LlmInference {
    storage: Arc<dyn ObjectStore>,
    provider_name: String,
    temperature: f32,
    max_tokens: usize,
    /// Used for every model when set; otherwise one provider per model id.
    fixed_provider: Option<Arc<dyn LLMProvider>>,
    providers: Mutex<HashMap<String, Arc<dyn LLMProvider>>>,
}

impl LlmInference {
    pub fn new(storage: Arc<dyn ObjectStore>, config: &ReviewConfig) -> Self {
        let inference = Self {
            storage,
            provider_name: config.resolved_provider_name(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            fixed_provider: None,
            providers: Mutex::new(HashMap::new()),
        };
        match config.provider {
            Some(ref provider) => inference.with_provider(Arc::clone(provider)),
            None => inference,
        }
    }

    /// Route every model through a pre-built provider (custom middleware,
    /// OpenAI-compatible gateways).
    pub fn with_provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.fixed_provider = Some(provider);
        self
    }

    fn provider_for(&self, model: &str) -> Result<Arc<dyn LLMProvider>, PlatformError> {
        if let Some(ref p) = self.fixed_provider {
            return Ok(Arc::clone(p));
        }

        let mut cache = self.providers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(p) = cache.get(model) {
            return Ok(Arc::clone(p));
        }

        let provider = ProviderFactory::create_llm_provider(&self.provider_name, model).map_err(
            |e| {
                PlatformError::Inference(format!(
                    "provider '{}' is not configured for {model}: {e}",
                    self.provider_name
                ))
            },
        )?;
        debug!("Created {} provider for {}", self.provider_name, model);
        cache.insert(model.to_string(), Arc::clone(&provider));
        Ok(provider)
    }

    fn build_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

/// MIME type of a raster image, sniffed from its magic bytes.
pub fn image_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else {
        None
    }
}

#[async_trait]
impl InferenceService for LlmInference {
    async fn feedback(
        &self,
        file_path: &str,
        prompt: &str,
        model: &str,
    ) -> Result<InferenceResponse, PlatformError> {
        let bytes = self.storage.read(file_path).await?;
        let mime = image_mime_type(&bytes).ok_or_else(|| {
            PlatformError::Inference(format!(
                "'{file_path}' is not a PNG or JPEG image; vision models need the rendered page"
            ))
        })?;

        let provider = self.provider_for(model)?;
        let image = ImageData::new(STANDARD.encode(&bytes), mime).with_detail("high");
        let messages = vec![ChatMessage::user_with_images(prompt, vec![image])];
        let options = self.build_options();

        let start = Instant::now();
        let response = provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| PlatformError::Inference(e.to_string()))?;

        info!(
            "{}: {} input tokens, {} output tokens, {:?}",
            model,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        Ok(InferenceResponse::text(response.content))
    }
}
