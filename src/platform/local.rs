//! Local, file-backed implementations of the platform traits.
//!
//! Everything lives under one data directory:
//!
//! ```text
//! <data-dir>/
//!   files/         uploaded resumes and rendered images
//!   kv.json        key-value store (one JSON object)
//!   session.json   signed-in user
//! ```

use super::{AuthService, KvStore, ObjectStore, StoredFile, UploadFile, User};
use crate::error::PlatformError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// Build all three local services rooted at `data_dir`.
pub fn local_services(
    data_dir: impl AsRef<Path>,
    username: impl Into<String>,
) -> (LocalAuth, LocalObjectStore, LocalKvStore) {
    let root = data_dir.as_ref();
    (
        LocalAuth::new(root.join("session.json"), username),
        LocalObjectStore::new(root.join("files")),
        LocalKvStore::new(root.join("kv.json")),
    )
}

// ── Object storage ───────────────────────────────────────────────────────

/// Directory-backed object storage. Paths are `/`-rooted relative to the
/// storage directory.
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a storage path onto the local directory, refusing anything that
    /// would escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf, PlatformError> {
        let rel = Path::new(path.trim_start_matches('/'));
        let mut out = self.root.clone();
        for component in rel.components() {
            match component {
                Component::Normal(part) => out.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(PlatformError::Storage(format!(
                        "path '{path}' leaves the storage root"
                    )))
                }
            }
        }
        Ok(out)
    }

    /// `<stem>-<8 hex>.<ext>` so re-uploading the same file name never
    /// overwrites an earlier submission.
    fn unique_name(name: &str) -> String {
        let base = Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "upload".to_string());
        let tag = &Uuid::new_v4().simple().to_string()[..8];
        match base.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{tag}.{ext}"),
            _ => format!("{base}-{tag}"),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, files: &[UploadFile]) -> Result<Option<StoredFile>, PlatformError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let mut first = None;
        for file in files {
            let stored_name = Self::unique_name(&file.name);
            let dest = self.root.join(&stored_name);
            tokio::fs::write(&dest, &file.bytes).await?;
            debug!("Stored {} → {}", file.name, dest.display());

            if first.is_none() {
                first = Some(StoredFile {
                    name: stored_name.clone(),
                    path: format!("/{stored_name}"),
                    size: file.bytes.len() as u64,
                    is_dir: false,
                });
            }
        }
        Ok(first)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, PlatformError> {
        let local = self.resolve(path)?;
        tokio::fs::read(&local).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlatformError::Storage(format!("no such file: {path}"))
            } else {
                PlatformError::Io(e)
            }
        })
    }

    async fn delete(&self, path: &str) -> Result<(), PlatformError> {
        let local = self.resolve(path)?;
        if local == self.root {
            return Err(PlatformError::Storage("refusing to delete the storage root".into()));
        }
        let meta = tokio::fs::metadata(&local).await?;
        if meta.is_dir() {
            tokio::fs::remove_dir_all(&local).await?;
        } else {
            tokio::fs::remove_file(&local).await?;
        }
        Ok(())
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<StoredFile>, PlatformError> {
        let dir = self.resolve(path)?;
        if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let prefix = path.trim_start_matches(['.', '/']).trim_end_matches('/');
        let mut entries = Vec::new();
        let mut rd = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = rd.next_entry().await? {
            let meta = entry.metadata().await?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = if prefix.is_empty() {
                format!("/{name}")
            } else {
                format!("/{prefix}/{name}")
            };
            entries.push(StoredFile {
                name,
                path,
                size: meta.len(),
                is_dir: meta.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

// ── Key-value store ──────────────────────────────────────────────────────

/// Key-value store persisted as a single JSON object.
///
/// The mutex serialises read-modify-write cycles within the process.
pub struct LocalKvStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LocalKvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, PlatformError> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(BTreeMap::new());
        }
        let json = tokio::fs::read_to_string(&self.path).await?;
        if json.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&json).map_err(|e| {
            PlatformError::KeyValue(format!("{} is corrupt: {e}", self.path.display()))
        })
    }

    async fn save(&self, map: &BTreeMap<String, String>) -> Result<(), PlatformError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for LocalKvStore {
    async fn set(&self, key: &str, value: &str) -> Result<(), PlatformError> {
        let _guard = self.lock.lock().await;
        let mut map = self.load().await?;
        map.insert(key.to_string(), value.to_string());
        self.save(&map).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, PlatformError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn flush(&self) -> Result<(), PlatformError> {
        let _guard = self.lock.lock().await;
        info!("Flushing key-value store {}", self.path.display());
        self.save(&BTreeMap::new()).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, PlatformError> {
        let _guard = self.lock.lock().await;
        Ok(self
            .load()
            .await?
            .into_keys()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }
}

// ── Auth ─────────────────────────────────────────────────────────────────

/// Single-user session persisted to a file.
pub struct LocalAuth {
    session_path: PathBuf,
    username: String,
}

impl LocalAuth {
    pub fn new(session_path: impl Into<PathBuf>, username: impl Into<String>) -> Self {
        Self {
            session_path: session_path.into(),
            username: username.into(),
        }
    }
}

#[async_trait]
impl AuthService for LocalAuth {
    async fn is_authenticated(&self) -> Result<bool, PlatformError> {
        Ok(self.current_user().await?.is_some())
    }

    async fn current_user(&self) -> Result<Option<User>, PlatformError> {
        if !tokio::fs::try_exists(&self.session_path).await.unwrap_or(false) {
            return Ok(None);
        }
        let json = tokio::fs::read_to_string(&self.session_path).await?;
        serde_json::from_str::<User>(&json)
            .map(Some)
            .map_err(|e| PlatformError::Auth(format!("session file is corrupt: {e}")))
    }

    async fn sign_in(&self) -> Result<User, PlatformError> {
        let username = self.username.trim();
        if username.is_empty() {
            return Err(PlatformError::Auth("a username is required".into()));
        }
        let user = User {
            username: username.to_string(),
        };
        if let Some(parent) = self.session_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.session_path, serde_json::to_string(&user)?).await?;
        info!("Signed in as {}", user.username);
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), PlatformError> {
        match tokio::fs::remove_file(&self.session_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_read_delete_round() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().join("files"));

        let stored = store
            .upload(&[UploadFile::pdf("cv.pdf", b"%PDF-1.7".to_vec())])
            .await
            .unwrap()
            .expect("one file stored");
        assert!(stored.path.starts_with("/cv-"));
        assert!(stored.path.ends_with(".pdf"));
        assert_eq!(stored.size, 8);

        assert_eq!(store.read(&stored.path).await.unwrap(), b"%PDF-1.7");

        let listed = store.read_dir("./").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].path, stored.path);

        store.delete(&stored.path).await.unwrap();
        assert!(store.read_dir("./").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_name_uploads_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let a = store.upload(&[UploadFile::pdf("cv.pdf", vec![1])]).await.unwrap().unwrap();
        let b = store.upload(&[UploadFile::pdf("cv.pdf", vec![2])]).await.unwrap().unwrap();
        assert_ne!(a.path, b.path);
    }

    #[tokio::test]
    async fn empty_upload_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(store.upload(&[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(store.read("/../etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn kv_set_get_list_flush() {
        let dir = tempfile::tempdir().unwrap();
        let kv = LocalKvStore::new(dir.path().join("kv.json"));

        kv.set("resume:b", "2").await.unwrap();
        kv.set("resume:a", "1").await.unwrap();
        kv.set("other", "x").await.unwrap();

        assert_eq!(kv.get("resume:a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(kv.get("missing").await.unwrap(), None);
        assert_eq!(kv.list("resume:").await.unwrap(), vec!["resume:a", "resume:b"]);

        kv.set("resume:a", "updated").await.unwrap();
        assert_eq!(kv.get("resume:a").await.unwrap().as_deref(), Some("updated"));

        kv.flush().await.unwrap();
        assert!(kv.list("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn auth_session_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let auth = LocalAuth::new(dir.path().join("session.json"), "ada");

        assert!(!auth.is_authenticated().await.unwrap());
        let user = auth.sign_in().await.unwrap();
        assert_eq!(user.username, "ada");
        assert!(auth.is_authenticated().await.unwrap());
        assert_eq!(auth.current_user().await.unwrap(), Some(user));

        auth.sign_out().await.unwrap();
        assert!(!auth.is_authenticated().await.unwrap());
        auth.sign_out().await.unwrap();
    }

    #[tokio::test]
    async fn blank_username_cannot_sign_in() {
        let dir = tempfile::tempdir().unwrap();
        let auth = LocalAuth::new(dir.path().join("session.json"), " ");
        assert!(auth.sign_in().await.is_err());
    }
}
