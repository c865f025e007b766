//! Capability traits for the hosted services a review depends on.
//!
//! Authentication, blob storage, key-value persistence, and model inference
//! are external collaborators. The workflow only talks to them through these
//! traits so the backing platform can be swapped:
//!
//! - [`local`] — directory- and file-backed implementations for the CLI
//! - [`llm`]   — [`InferenceService`] over edgequake-llm vision providers

pub mod llm;
pub mod local;

use crate::config::ReviewConfig;
use crate::error::PlatformError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

// ── Files ────────────────────────────────────────────────────────────────

/// An in-memory file ready to upload.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(name, "application/pdf", bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// An entry in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub is_dir: bool,
}

// ── Inference response ───────────────────────────────────────────────────

/// Raw reply from the inference endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub message: ResponseMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub content: MessageContent,
}

/// Message content is either a bare string or a list of typed blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    pub block_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl InferenceResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            message: ResponseMessage {
                content: MessageContent::Text(content.into()),
            },
        }
    }

    pub fn blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            message: ResponseMessage {
                content: MessageContent::Blocks(blocks),
            },
        }
    }
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            block_type: "text".into(),
            text: Some(text.into()),
        }
    }
}

// ── Capabilities ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
}

/// Session state gating access to the workflow.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn is_authenticated(&self) -> Result<bool, PlatformError>;

    async fn current_user(&self) -> Result<Option<User>, PlatformError>;

    async fn sign_in(&self) -> Result<User, PlatformError>;

    async fn sign_out(&self) -> Result<(), PlatformError>;
}

/// Path-addressed blob storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `files`; returns the entry for the first file, or `None` when
    /// nothing was stored.
    async fn upload(&self, files: &[UploadFile]) -> Result<Option<StoredFile>, PlatformError>;

    async fn read(&self, path: &str) -> Result<Vec<u8>, PlatformError>;

    async fn delete(&self, path: &str) -> Result<(), PlatformError>;

    async fn read_dir(&self, path: &str) -> Result<Vec<StoredFile>, PlatformError>;
}

/// String key-value persistence.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<(), PlatformError>;

    async fn get(&self, key: &str) -> Result<Option<String>, PlatformError>;

    /// Remove every key.
    async fn flush(&self) -> Result<(), PlatformError>;

    /// Keys starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, PlatformError>;
}

/// Single-shot, non-streaming model call against a stored file.
#[async_trait]
pub trait InferenceService: Send + Sync {
    async fn feedback(
        &self,
        file_path: &str,
        prompt: &str,
        model: &str,
    ) -> Result<InferenceResponse, PlatformError>;
}

/// The set of collaborators one reviewer talks to.
#[derive(Clone)]
pub struct Platform {
    pub auth: Arc<dyn AuthService>,
    pub storage: Arc<dyn ObjectStore>,
    pub kv: Arc<dyn KvStore>,
    pub inference: Arc<dyn InferenceService>,
}

impl Platform {
    /// File-backed auth, storage and key-value under `data_dir`, with model
    /// calls going through edgequake-llm.
    pub fn local(
        data_dir: impl AsRef<Path>,
        username: impl Into<String>,
        config: &ReviewConfig,
    ) -> Self {
        let (auth, storage, kv) = local::local_services(data_dir, username);
        let storage: Arc<dyn ObjectStore> = Arc::new(storage);
        let inference = llm::LlmInference::new(Arc::clone(&storage), config);
        Self {
            auth: Arc::new(auth),
            storage,
            kv: Arc::new(kv),
            inference: Arc::new(inference),
        }
    }
}
