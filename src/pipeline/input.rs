//! Input resolution: a user-supplied path or URL → in-memory PDF upload.
//!
//! Both sources are checked for the `%PDF` magic bytes before anything is
//! uploaded, so a wrong file fails with a clear message instead of a render
//! diagnostic two stages later.

use crate::error::ReviewError;
use crate::platform::UploadFile;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the resume named by `input`, downloading it if it is a URL.
pub async fn resolve_resume(input: &str, timeout_secs: u64) -> Result<UploadFile, ReviewError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

async fn read_local(path: &Path) -> Result<UploadFile, ReviewError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ReviewError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ReviewError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "resume.pdf".to_string());
    check_magic(&name, &bytes)?;

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(UploadFile::pdf(name, bytes))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadFile, ReviewError> {
    info!("Downloading resume from: {}", url);

    let failed = |reason: String| ReviewError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ReviewError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| failed(e.to_string()))?
        .to_vec();

    let name = file_name_from_url(url);
    check_magic(&name, &bytes)?;

    info!("Downloaded {} ({} bytes)", name, bytes.len());
    Ok(UploadFile::pdf(name, bytes))
}

fn check_magic(name: &str, bytes: &[u8]) -> Result<(), ReviewError> {
    if bytes.starts_with(PDF_MAGIC) {
        return Ok(());
    }
    Err(ReviewError::NotAPdf {
        name: name.to_string(),
        magic: bytes.iter().take(4).copied().collect(),
    })
}

/// Last path segment of `url` when it looks like a file name.
fn file_name_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| "resume.pdf".to_string())
}
