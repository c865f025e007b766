//! Submission workflow tests against in-memory collaborators.
//!
//! No pdfium library or network access is needed: the PDF engine, storage,
//! key-value store, auth, and inference endpoint are all fakes.

use async_trait::async_trait;
use image::DynamicImage;
use resumind::pipeline::engine::{EngineLoader, OpenDocument, PdfEngine};
use resumind::platform::{StoredFile, User};
use resumind::{
    AuthService, InferenceError, InferenceResponse, InferenceService, KvStore, NormalizeError,
    ObjectStore, Platform, PlatformError, RasterError, Rasterizer, ReviewConfig,
    ReviewProgressCallback, ReviewError, Reviewer, SubmissionForm, UploadFile, WorkflowState,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

// ── Fakes ────────────────────────────────────────────────────────────────────

struct MemAuth {
    signed_in: bool,
}

#[async_trait]
impl AuthService for MemAuth {
    async fn is_authenticated(&self) -> Result<bool, PlatformError> {
        Ok(self.signed_in)
    }
    async fn current_user(&self) -> Result<Option<User>, PlatformError> {
        Ok(self.signed_in.then(|| User {
            username: "tester".into(),
        }))
    }
    async fn sign_in(&self) -> Result<User, PlatformError> {
        Err(PlatformError::Auth("fixed session".into()))
    }
    async fn sign_out(&self) -> Result<(), PlatformError> {
        Ok(())
    }
}

#[derive(Default)]
struct MemStore {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    /// Uploads of this MIME type store nothing and return `None`.
    reject_mime: Option<&'static str>,
}

#[async_trait]
impl ObjectStore for MemStore {
    async fn upload(&self, files: &[UploadFile]) -> Result<Option<StoredFile>, PlatformError> {
        let Some(file) = files.first() else {
            return Ok(None);
        };
        if self.reject_mime == Some(file.mime_type.as_str()) {
            return Ok(None);
        }
        let path = format!("/{}", file.name);
        self.files
            .lock()
            .unwrap()
            .insert(path.clone(), file.bytes.clone());
        Ok(Some(StoredFile {
            name: file.name.clone(),
            path,
            size: file.len() as u64,
            is_dir: false,
        }))
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, PlatformError> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| PlatformError::Storage(format!("no such file: {path}")))
    }

    async fn delete(&self, path: &str) -> Result<(), PlatformError> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    async fn read_dir(&self, _path: &str) -> Result<Vec<StoredFile>, PlatformError> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .map(|(path, bytes)| StoredFile {
                name: path.trim_start_matches('/').to_string(),
                path: path.clone(),
                size: bytes.len() as u64,
                is_dir: false,
            })
            .collect())
    }
}

#[derive(Default)]
struct MemKv {
    map: Mutex<BTreeMap<String, String>>,
    writes: Mutex<Vec<String>>,
}

impl MemKv {
    fn record(&self, key: &str) -> Option<serde_json::Value> {
        let map = self.map.lock().unwrap();
        map.get(key).map(|raw| serde_json::from_str(raw).unwrap())
    }
}

#[async_trait]
impl KvStore for MemKv {
    async fn set(&self, key: &str, value: &str) -> Result<(), PlatformError> {
        self.writes.lock().unwrap().push(key.to_string());
        self.map
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
    async fn get(&self, key: &str) -> Result<Option<String>, PlatformError> {
        Ok(self.map.lock().unwrap().get(key).cloned())
    }
    async fn flush(&self) -> Result<(), PlatformError> {
        self.map.lock().unwrap().clear();
        Ok(())
    }
    async fn list(&self, prefix: &str) -> Result<Vec<String>, PlatformError> {
        Ok(self
            .map
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// Replies per model; unlisted models fail.
#[derive(Default)]
struct FakeInference {
    replies: HashMap<String, String>,
    calls: Mutex<Vec<(String, String, String)>>,
}

impl FakeInference {
    fn reply(mut self, model: &str, body: impl Into<String>) -> Self {
        self.replies.insert(model.to_string(), body.into());
        self
    }
}

#[async_trait]
impl InferenceService for FakeInference {
    async fn feedback(
        &self,
        file_path: &str,
        prompt: &str,
        model: &str,
    ) -> Result<InferenceResponse, PlatformError> {
        self.calls.lock().unwrap().push((
            file_path.to_string(),
            prompt.to_string(),
            model.to_string(),
        ));
        match self.replies.get(model) {
            Some(body) => Ok(InferenceResponse::text(body.clone())),
            None => Err(PlatformError::Inference(format!("{model} is overloaded"))),
        }
    }
}

struct FakeEngine {
    pages: usize,
}

impl PdfEngine for FakeEngine {
    fn open<'a>(&'a self, _pdf: &'a [u8]) -> Result<Box<dyn OpenDocument + 'a>, RasterError> {
        Ok(Box::new(FakeDocument { pages: self.pages }))
    }
}

struct FakeDocument {
    pages: usize,
}

impl OpenDocument for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn render_page(&self, _index: usize, scale: f32) -> Result<DynamicImage, RasterError> {
        let side = (20.0 * scale) as u32;
        Ok(DynamicImage::new_rgb8(side, side))
    }
}

struct FakeLoader {
    pages: usize,
}

#[async_trait]
impl EngineLoader for FakeLoader {
    async fn load(&self) -> Result<Arc<dyn PdfEngine>, RasterError> {
        Ok(Arc::new(FakeEngine { pages: self.pages }))
    }
}

#[derive(Default)]
struct Recorder {
    states: Mutex<Vec<WorkflowState>>,
    statuses: Mutex<Vec<String>>,
    completed: Mutex<Option<String>>,
}

impl Recorder {
    fn states(&self) -> Vec<WorkflowState> {
        self.states.lock().unwrap().clone()
    }
    fn last_status(&self) -> String {
        self.statuses.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl ReviewProgressCallback for Recorder {
    fn on_status(&self, status: &str) {
        self.statuses.lock().unwrap().push(status.to_string());
    }
    fn on_state(&self, state: WorkflowState) {
        self.states.lock().unwrap().push(state);
    }
    fn on_complete(&self, submission_id: &str) {
        *self.completed.lock().unwrap() = Some(submission_id.to_string());
    }
}

// ── Harness ──────────────────────────────────────────────────────────────────

struct Harness {
    reviewer: Reviewer,
    store: Arc<MemStore>,
    kv: Arc<MemKv>,
    inference: Arc<FakeInference>,
    progress: Arc<Recorder>,
}

struct Setup {
    signed_in: bool,
    pages: usize,
    store: MemStore,
    inference: FakeInference,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            signed_in: true,
            pages: 1,
            store: MemStore::default(),
            inference: FakeInference::default(),
        }
    }
}

fn harness(setup: Setup) -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let store = Arc::new(setup.store);
    let kv = Arc::new(MemKv::default());
    let inference = Arc::new(setup.inference);
    let progress = Arc::new(Recorder::default());

    let config = ReviewConfig::builder()
        .models(["model-a", "model-b", "model-c"])
        .fallback_delay_ms(0)
        .progress_callback(progress.clone())
        .build()
        .unwrap();

    let platform = Platform {
        auth: Arc::new(MemAuth {
            signed_in: setup.signed_in,
        }),
        storage: store.clone(),
        kv: kv.clone(),
        inference: inference.clone(),
    };
    let rasterizer = Rasterizer::new(
        Arc::new(FakeLoader { pages: setup.pages }),
        config.render_scale,
    );

    Harness {
        reviewer: Reviewer::with_rasterizer(platform, config, rasterizer),
        store,
        kv,
        inference,
        progress,
    }
}

fn feedback_json(score: u8) -> String {
    let section = r#"{"score": 72, "tips": [{"type": "good", "tip": "Clear", "explanation": "Easy to scan."}]}"#;
    format!(
        r#"{{"overallScore": {score},
            "ATS": {{"score": 68, "tips": [{{"type": "improve", "tip": "Add keywords"}}]}},
            "toneAndStyle": {section}, "content": {section},
            "structure": {section}, "skills": {section}}}"#
    )
}

fn form() -> SubmissionForm {
    SubmissionForm::new(UploadFile::pdf("resume.pdf", b"%PDF-1.7 one page".to_vec()))
        .job_title("Backend Engineer")
        .job_description("")
}

const FORWARD: [WorkflowState; 7] = [
    WorkflowState::UploadingFile,
    WorkflowState::Converting,
    WorkflowState::UploadingImage,
    WorkflowState::PersistingDraft,
    WorkflowState::Inferring,
    WorkflowState::PersistingResult,
    WorkflowState::Complete,
];

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn backend_engineer_review_completes() {
    let h = harness(Setup {
        inference: FakeInference::default()
            .reply("model-a", format!("```json\n{}\n```", feedback_json(78))),
        ..Setup::default()
    });

    let outcome = h.reviewer.submit(form()).await.unwrap();
    let id = outcome.submission.id.clone();

    assert_eq!(outcome.model, "model-a");
    assert_eq!(outcome.route, format!("/resume/{id}"));
    assert_eq!(h.progress.states(), FORWARD);
    assert_eq!(h.progress.last_status(), "Analysis complete, redirecting...");
    assert_eq!(h.progress.completed.lock().unwrap().as_deref(), Some(id.as_str()));

    let record = h.kv.record(&format!("resume:{id}")).unwrap();
    assert_eq!(record["feedback"]["overallScore"], 78);
    assert_eq!(record["jobTitle"], "Backend Engineer");
    assert_eq!(record["jobDescription"], "");
    assert_eq!(record["resumePath"], "/resume.pdf");
    assert_eq!(record["imagePath"], "/resume.png");

    // Draft, then result, under one key.
    assert_eq!(h.kv.writes.lock().unwrap().len(), 2);

    let calls = h.inference.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (path, prompt, model) = &calls[0];
    assert_eq!(path, "/resume.png");
    assert_eq!(model, "model-a");
    assert!(prompt.contains("The job title is: Backend Engineer"));

    let png = h.store.files.lock().unwrap()["/resume.png"].clone();
    assert!(png.starts_with(b"\x89PNG"));
}

#[tokio::test]
async fn later_model_is_used_when_earlier_ones_fail() {
    let h = harness(Setup {
        inference: FakeInference::default().reply("model-c", feedback_json(61)),
        ..Setup::default()
    });

    let outcome = h.reviewer.submit(form()).await.unwrap();

    assert_eq!(outcome.model, "model-c");
    let models: Vec<_> = h
        .inference
        .calls
        .lock()
        .unwrap()
        .iter()
        .map(|(_, _, m)| m.clone())
        .collect();
    assert_eq!(models, ["model-a", "model-b", "model-c"]);
    assert_eq!(
        outcome.submission.feedback.unwrap().overall_score.value(),
        Some(61.0)
    );
}

#[tokio::test]
async fn draft_is_kept_when_every_model_fails() {
    let h = harness(Setup::default());

    let err = h.reviewer.submit(form()).await.unwrap_err();

    match err {
        ReviewError::Inference(InferenceError::AllModelsFailed { attempts, ref last }) => {
            assert_eq!(attempts, 3);
            assert_eq!(last.model(), Some("model-c"));
        }
        ref other => panic!("expected AllModelsFailed, got {other:?}"),
    }
    assert_eq!(
        h.progress.states().last().copied(),
        Some(WorkflowState::Error)
    );
    assert_eq!(h.progress.last_status(), format!("Error: {err}"));

    let keys = h.kv.list("resume:").await.unwrap();
    assert_eq!(keys.len(), 1);
    let record = h.kv.record(&keys[0]).unwrap();
    assert_eq!(record["feedback"], "");

    let id = keys[0].trim_start_matches("resume:");
    let draft = h.reviewer.load(id).await.unwrap();
    assert!(draft.is_pending());
}

#[tokio::test]
async fn unparseable_reply_fails_after_draft() {
    let h = harness(Setup {
        inference: FakeInference::default().reply("model-a", "Sorry, I cannot help with that."),
        ..Setup::default()
    });

    let err = h.reviewer.submit(form()).await.unwrap_err();

    assert!(matches!(
        err,
        ReviewError::Normalize(NormalizeError::MalformedResponse { .. })
    ));
    // First success wins even if its body is unusable.
    assert_eq!(h.inference.calls.lock().unwrap().len(), 1);
    assert_eq!(h.kv.writes.lock().unwrap().len(), 1);
    assert!(h
        .progress
        .last_status()
        .starts_with("Error: Failed to parse analysis response"));
}

#[tokio::test]
async fn partial_reply_is_stored_as_reported() {
    let h = harness(Setup {
        inference: FakeInference::default().reply("model-a", r#"{"overallScore": 150}"#),
        ..Setup::default()
    });

    let outcome = h.reviewer.submit(form()).await.unwrap();

    assert_eq!(h.progress.states(), FORWARD);
    let record = h
        .kv
        .record(&format!("resume:{}", outcome.submission.id))
        .unwrap();
    assert_eq!(record["feedback"]["overallScore"], 150);
    assert!(record["feedback"]["ATS"].get("score").is_none());
    assert_eq!(record["feedback"]["skills"]["tips"], serde_json::json!([]));
}

#[tokio::test]
async fn image_upload_failure_halts_before_draft() {
    let h = harness(Setup {
        store: MemStore {
            reject_mime: Some("image/png"),
            ..MemStore::default()
        },
        inference: FakeInference::default().reply("model-a", feedback_json(90)),
        ..Setup::default()
    });

    let err = h.reviewer.submit(form()).await.unwrap_err();

    assert!(matches!(err, ReviewError::UploadFailed { what: "image" }));
    assert_eq!(h.progress.last_status(), "Error: Failed to upload image");
    assert_eq!(
        h.progress.states(),
        [
            WorkflowState::UploadingFile,
            WorkflowState::Converting,
            WorkflowState::UploadingImage,
            WorkflowState::Error,
        ]
    );
    assert!(h.kv.writes.lock().unwrap().is_empty());
    assert!(h.inference.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn resume_upload_failure_halts_immediately() {
    let h = harness(Setup {
        store: MemStore {
            reject_mime: Some("application/pdf"),
            ..MemStore::default()
        },
        ..Setup::default()
    });

    let err = h.reviewer.submit(form()).await.unwrap_err();

    assert_eq!(err.to_string(), "Failed to upload file");
    assert_eq!(
        h.progress.states(),
        [WorkflowState::UploadingFile, WorkflowState::Error]
    );
}

#[tokio::test]
async fn empty_pdf_reports_conversion_diagnostic() {
    let h = harness(Setup {
        pages: 0,
        ..Setup::default()
    });

    let err = h.reviewer.submit(form()).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Failed to convert PDF to image - PDF has no pages"
    );
    assert_eq!(
        h.progress.last_status(),
        "Error: Failed to convert PDF to image - PDF has no pages"
    );
    assert_eq!(h.store.files.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn signed_out_user_is_turned_away() {
    let h = harness(Setup {
        signed_in: false,
        ..Setup::default()
    });

    let err = h.reviewer.submit(form()).await.unwrap_err();

    assert!(matches!(err, ReviewError::NotAuthenticated));
    assert_eq!(h.progress.states(), [WorkflowState::Error]);
    assert!(h.store.files.lock().unwrap().is_empty());
    assert!(matches!(
        h.reviewer.list().await,
        Err(ReviewError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn load_list_and_wipe() {
    let h = harness(Setup {
        inference: FakeInference::default().reply("model-a", feedback_json(83)),
        ..Setup::default()
    });
    let outcome = h.reviewer.submit(form()).await.unwrap();

    let loaded = h.reviewer.load(&outcome.submission.id).await.unwrap();
    assert_eq!(loaded, outcome.submission);

    let all = h.reviewer.list().await.unwrap();
    assert_eq!(all.len(), 1);

    assert!(matches!(
        h.reviewer.load("missing").await,
        Err(ReviewError::NotFound { .. })
    ));

    let report = h.reviewer.wipe().await.unwrap();
    assert_eq!(report.deleted_files.len(), 2);
    assert_eq!(report.cleared_records, 1);
    assert!(h.store.files.lock().unwrap().is_empty());
    assert!(h.reviewer.list().await.unwrap().is_empty());
}
