//! Image encoding: rendered page → PNG upload file.
//!
//! PNG is lossless, which keeps small type legible for the vision model.
//! The image file is named after the resume with its `.pdf` extension
//! swapped for `.png`.

use crate::error::RasterError;
use crate::platform::UploadFile;
use image::DynamicImage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Cursor;
use tracing::debug;

static PDF_EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").unwrap());

/// Encode a rendered page as PNG bytes.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} page → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// `resume.pdf` → `resume.png`; names without a PDF extension get `.png`
/// appended.
pub fn png_file_name(source_name: &str) -> String {
    let stem = PDF_EXTENSION.replace(source_name, "");
    let stem = if stem.is_empty() { "page" } else { stem.as_ref() };
    format!("{stem}.png")
}

/// Wrap an encoder outcome as the PNG upload for `source_name`.
pub(crate) fn package_png(
    source_name: &str,
    encoded: Result<Vec<u8>, image::ImageError>,
) -> Result<UploadFile, RasterError> {
    let bytes = encoded.map_err(|e| RasterError::Encoding(e.to_string()))?;
    if bytes.is_empty() {
        return Err(RasterError::Encoding("encoder produced no data".into()));
    }
    Ok(UploadFile::new(png_file_name(source_name), "image/png", bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::error::{LimitError, LimitErrorKind};
    use image::{Rgba, RgbaImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let bytes = encode_png(&img).expect("encode should succeed");
        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
    }

    #[test]
    fn pdf_extension_is_swapped() {
        assert_eq!(png_file_name("resume.pdf"), "resume.png");
        assert_eq!(png_file_name("Jane Doe CV.PDF"), "Jane Doe CV.png");
        assert_eq!(png_file_name("my.pdf.backup.pdf"), "my.pdf.backup.png");
        assert_eq!(png_file_name("resume"), "resume.png");
        assert_eq!(png_file_name(".pdf"), "page.png");
    }

    #[test]
    fn encoder_failure_maps_to_blob_error() {
        let failed = Err(image::ImageError::Limits(LimitError::from_kind(
            LimitErrorKind::InsufficientMemory,
        )));
        let err = package_png("cv.pdf", failed).unwrap_err();
        assert!(matches!(err, RasterError::Encoding(_)));
        assert!(err
            .to_string()
            .starts_with("Failed to create image blob from canvas"));
    }

    #[test]
    fn packaged_png_is_named_after_source() {
        let file = package_png("cv.pdf", Ok(vec![1, 2, 3])).unwrap();
        assert_eq!(file.name, "cv.png");
        assert_eq!(file.mime_type, "image/png");
    }
}
