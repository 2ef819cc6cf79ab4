//! # html2img
//!
//! Capture webpages, inline HTML and HTML files as PNG or JPEG images.
//!
//! ## Why this crate?
//!
//! Turning "a page" into "a picture of the page" involves more than a
//! rasteriser: inputs arrive as loosely-typed addresses, pasted markup or
//! uploaded files; remote origins may refuse to be embedded; slow pages must
//! not hang the caller; and users expect a history of captures they can
//! download one at a time or in bulk. This crate packages that whole flow as
//! an explicit session state machine over a pluggable rendering backend.
//!
//! ## Pipeline Overview
//!
//! ```text
//! RawInput
//!  │
//!  ├─ 1. Validate  address / markup / file → CaptureSource
//!  ├─ 2. Acquire   render_to_surface → settle → rasterize (15 s deadline for addresses)
//!  │     └─ cross-origin denial → synthesized preview
//!  ├─ 3. Encode    PNG (lossless) or JPEG (quality 10–100), spawn_blocking
//!  └─ 4. Register  CaptureResult appended to the ResultRegistry
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use html2img::{BasicRenderer, CaptureConfig, ConversionSession, RawInput, ResultRegistry};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = ConversionSession::new(Arc::new(BasicRenderer::new()), CaptureConfig::default());
//!     let mut registry = ResultRegistry::new();
//!
//!     session.select_input(RawInput::Address("example.com".into()))?;
//!     let id = session.convert(&mut registry).await?;
//!
//!     let result = registry.get(id).expect("just registered");
//!     println!("{} {}x{} {}", result.file_name(),
//!         result.dimensions.width, result.dimensions.height, result.size_label());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `html2img` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! html2img = { version = "0.1", default-features = false }
//! ```
//!
//! ## Device Presets
//!
//! | Preset | Viewport |
//! |--------|----------|
//! | `desktop` | 1920 × 1080 (default) |
//! | `laptop`  | 1366 × 768 |
//! | `tablet`  | 768 × 1024 |
//! | `mobile`  | 375 × 667 |
//!
//! Custom sizes are clamped to 100–4000 px on each axis.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod capture;
pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod registry;
pub mod session;
pub mod viewport;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use capture::{Acquisition, CaptureOrchestrator};
pub use config::{CaptureConfig, CaptureConfigBuilder, OutputFormat, OutputSpec};
pub use convert::{capture, capture_sync, capture_to_file};
pub use error::{CaptureError, ExportError, InvalidInputError, RenderError};
pub use export::{DirectorySink, DownloadSink};
pub use output::{format_file_size, CaptureMode, CaptureResult, Dimensions, SourceKind};
pub use pipeline::input::{CaptureSource, MarkupFile, RawInput};
pub use pipeline::render::{BasicRenderer, CaptureRegion, RenderHandle, RenderingCapability};
pub use progress::{NoopObserver, SessionObserver};
pub use registry::{ResultRegistry, EXPORT_STAGGER};
pub use session::{ConversionSession, SessionState};
pub use viewport::{DevicePresetId, ViewportPreset, ViewportSpec};
