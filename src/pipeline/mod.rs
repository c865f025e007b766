//! Pipeline stages for reviewing one resume.
//!
//! Each submodule implements one transformation step and is testable on its
//! own; the workflow in [`crate::review`] sequences them.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ infer ──▶ normalize
//! (path/URL) (pdfium)   (PNG)    (models)   (JSON → Feedback)
//! ```
//!
//! 1. [`input`]     — load the user-supplied path or URL and check it is a PDF
//! 2. [`engine`]    — load pdfium once and share it between callers
//! 3. [`render`]    — rasterise page one in `spawn_blocking`
//! 4. [`encode`]    — PNG-encode the page and name it after the resume
//! 5. [`infer`]     — ordered multi-model calls with timeout and fallback
//! 6. [`normalize`] — strip fences and parse the reply into a feedback record

pub mod encode;
pub mod engine;
pub mod infer;
pub mod input;
pub mod normalize;
pub mod render;
