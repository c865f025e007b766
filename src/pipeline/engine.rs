//! The PDF engine and its load-once cell.
//!
//! Binding pdfium means locating and `dlopen`ing a ~30 MB shared library, so
//! it happens lazily and at most once per [`EngineCell`]. Callers arriving
//! while the load is in flight await the same shared future and all observe
//! its outcome. A failed load clears the cell so a later request can retry.
//!
//! pdfium keeps global library state that is torn down when its handle is
//! dropped, so the default rasteriser uses the single process-wide cell from
//! [`shared_pdfium`]. That cell is never dropped.

use crate::error::RasterError;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use image::DynamicImage;
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Parses in-memory PDFs.
///
/// Implementations are blocking; the rasteriser calls them from
/// `spawn_blocking`.
pub trait PdfEngine: Send + Sync {
    /// Parse `pdf`. Pages are read from the returned handle, so one
    /// conversion parses the bytes once.
    fn open<'a>(&'a self, pdf: &'a [u8]) -> Result<Box<dyn OpenDocument + 'a>, RasterError>;
}

/// A parsed PDF.
pub trait OpenDocument {
    fn page_count(&self) -> usize;

    /// Render page `index` (0-based) at `scale` times its natural size.
    fn render_page(&self, index: usize, scale: f32) -> Result<DynamicImage, RasterError>;
}

/// Produces a ready [`PdfEngine`].
#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn PdfEngine>, RasterError>;
}

type LoadFuture = Shared<BoxFuture<'static, Result<Arc<dyn PdfEngine>, RasterError>>>;

/// Process-scoped holder of the loaded engine.
///
/// Cheap to share behind an `Arc`; initialised on first use and never torn
/// down.
pub struct EngineCell {
    loader: Arc<dyn EngineLoader>,
    slot: Mutex<Option<LoadFuture>>,
}

impl EngineCell {
    pub fn new(loader: Arc<dyn EngineLoader>) -> Self {
        Self {
            loader,
            slot: Mutex::new(None),
        }
    }

    /// Return the engine, starting the load if nobody has yet.
    pub async fn get(&self) -> Result<Arc<dyn PdfEngine>, RasterError> {
        let load = {
            let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            match slot.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    debug!("Starting PDF engine load");
                    let loader = Arc::clone(&self.loader);
                    let fresh = async move { loader.load().await }.boxed().shared();
                    *slot = Some(fresh.clone());
                    fresh
                }
            }
        };

        let outcome = load.clone().await;
        if let Err(ref e) = outcome {
            let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            if slot.as_ref().is_some_and(|current| current.ptr_eq(&load)) {
                warn!("PDF engine load failed, next request will retry: {}", e);
                *slot = None;
            }
        }
        outcome
    }

    /// Whether a successful load has completed.
    pub fn is_loaded(&self) -> bool {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        matches!(slot.as_ref().and_then(|f| f.peek()), Some(Ok(_)))
    }
}

// ── pdfium ───────────────────────────────────────────────────────────────

static PDFIUM: Lazy<Arc<EngineCell>> =
    Lazy::new(|| Arc::new(EngineCell::new(Arc::new(PdfiumLoader::new()))));

/// The process-wide pdfium cell.
pub fn shared_pdfium() -> Arc<EngineCell> {
    Arc::clone(&PDFIUM)
}

/// Binds pdfium from `PDFIUM_LIB_PATH`, an explicit path, the working
/// directory, or the system library search path (first match wins).
#[derive(Debug, Default, Clone)]
pub struct PdfiumLoader {
    library_path: Option<PathBuf>,
}

impl PdfiumLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, RasterError> {
        let explicit = self
            .library_path
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        let bindings = match explicit {
            Some(path) => Pdfium::bind_to_library(&path).map_err(|e| {
                RasterError::Load(format!("{}: {:?}", path.display(), e))
            })?,
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(|e| {
                    RasterError::Load(format!(
                        "{:?}\nSet PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.",
                        e
                    ))
                })?,
        };
        Ok(Pdfium::new(bindings))
    }
}

#[async_trait]
impl EngineLoader for PdfiumLoader {
    async fn load(&self) -> Result<Arc<dyn PdfEngine>, RasterError> {
        let loader = self.clone();
        let pdfium = tokio::task::spawn_blocking(move || loader.bind())
            .await
            .map_err(|e| RasterError::Internal(format!("pdfium bind task panicked: {e}")))??;
        info!("PDF engine ready");
        Ok(Arc::new(PdfiumEngine { pdfium }))
    }
}

/// [`PdfEngine`] over a bound pdfium library.
pub struct PdfiumEngine {
    pdfium: Pdfium,
}

impl PdfEngine for PdfiumEngine {
    fn open<'a>(&'a self, pdf: &'a [u8]) -> Result<Box<dyn OpenDocument + 'a>, RasterError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| RasterError::CorruptPdf(format!("{:?}", e)))?;
        Ok(Box::new(PdfiumDocument(document)))
    }
}

struct PdfiumDocument<'a>(PdfDocument<'a>);

impl OpenDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.0.pages().len() as usize
    }

    fn render_page(&self, index: usize, scale: f32) -> Result<DynamicImage, RasterError> {
        let render_error = |e: PdfiumError| RasterError::Render {
            page: index + 1,
            detail: format!("{:?}", e),
        };
        let page = self.0.pages().get(index as u16).map_err(render_error)?;

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(scale)
            .set_text_smoothing(true)
            .set_image_smoothing(true)
            .set_path_smoothing(true);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(render_error)?;

        Ok(bitmap.as_image())
    }
}
