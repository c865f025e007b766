//! First-page rasterisation.
//!
//! Only page one of a resume is reviewed. The page is drawn at
//! `render_scale` (4× by default) so fine print survives the trip through a
//! vision model, then encoded as PNG. pdfium calls are blocking, so they run
//! on `spawn_blocking` threads.
//!
//! Conversion never returns `Err`: a [`ConversionResult`] carries either the
//! image or a diagnostic, and the workflow turns the latter into its own
//! error.

use super::encode::{encode_png, package_png};
use super::engine::{shared_pdfium, EngineCell, EngineLoader, PdfEngine};
use crate::error::RasterError;
use crate::platform::UploadFile;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The rendered first page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageArtifact {
    /// PNG named after the source PDF.
    pub file: UploadFile,
    pub width: u32,
    pub height: u32,
}

/// Outcome of one conversion.
#[derive(Debug, Clone)]
pub enum ConversionResult {
    Converted(ImageArtifact),
    Failed(RasterError),
}

impl ConversionResult {
    pub fn artifact(&self) -> Option<&ImageArtifact> {
        match self {
            ConversionResult::Converted(a) => Some(a),
            ConversionResult::Failed(_) => None,
        }
    }

    /// Human-readable reason the conversion failed.
    pub fn diagnostic(&self) -> Option<String> {
        match self {
            ConversionResult::Converted(_) => None,
            ConversionResult::Failed(e) => Some(e.to_string()),
        }
    }

    pub fn into_result(self) -> Result<ImageArtifact, RasterError> {
        match self {
            ConversionResult::Converted(a) => Ok(a),
            ConversionResult::Failed(e) => Err(e),
        }
    }
}

/// Renders PDF uploads to PNG. Clones share the same engine cell.
#[derive(Clone)]
pub struct Rasterizer {
    engine: Arc<EngineCell>,
    scale: f32,
}

impl Rasterizer {
    /// Rasteriser with its own engine cell over `loader`.
    pub fn new(loader: Arc<dyn EngineLoader>, scale: f32) -> Self {
        Self::with_engine(Arc::new(EngineCell::new(loader)), scale)
    }

    pub fn with_engine(engine: Arc<EngineCell>, scale: f32) -> Self {
        Self { engine, scale }
    }

    /// Rasteriser over the process-wide pdfium cell.
    pub fn with_pdfium(scale: f32) -> Self {
        Self::with_engine(shared_pdfium(), scale)
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn engine(&self) -> &EngineCell {
        &self.engine
    }

    /// Render page one of `pdf` as a PNG.
    pub async fn convert(&self, pdf: &UploadFile) -> ConversionResult {
        match self.try_convert(pdf).await {
            Ok(artifact) => {
                info!(
                    "Rendered '{}' → {} ({}x{})",
                    pdf.name, artifact.file.name, artifact.width, artifact.height
                );
                ConversionResult::Converted(artifact)
            }
            Err(e) => {
                warn!("Conversion of '{}' failed: {}", pdf.name, e);
                ConversionResult::Failed(e)
            }
        }
    }

    async fn try_convert(&self, pdf: &UploadFile) -> Result<ImageArtifact, RasterError> {
        let engine = self.engine.get().await?;
        let bytes = pdf.bytes.clone();
        let name = pdf.name.clone();
        let scale = self.scale;

        tokio::task::spawn_blocking(move || render_first_page(engine.as_ref(), &name, &bytes, scale))
            .await
            .map_err(|e| RasterError::Internal(format!("Render task panicked: {}", e)))?
    }
}

fn render_first_page(
    engine: &dyn PdfEngine,
    name: &str,
    pdf: &[u8],
    scale: f32,
) -> Result<ImageArtifact, RasterError> {
    let document = engine.open(pdf)?;
    let pages = document.page_count();
    debug!("'{}' has {} page(s)", name, pages);
    if pages == 0 {
        return Err(RasterError::EmptyDocument);
    }

    let img = document.render_page(0, scale)?;
    let (width, height) = (img.width(), img.height());
    let file = package_png(name, encode_png(&img))?;

    Ok(ImageArtifact {
        file,
        width,
        height,
    })
}
