//! One-shot entry points for callers that don't need a long-lived session.
//!
//! Each call builds a [`ConversionSession`] over the built-in
//! [`BasicRenderer`], runs a single conversion and hands back the result.
//! Applications that keep a result history or swap the rendering backend
//! should use [`ConversionSession`] and [`ResultRegistry`] directly.

use crate::config::CaptureConfig;
use crate::error::{CaptureError, ExportError};
use crate::output::CaptureResult;
use crate::pipeline::input::RawInput;
use crate::pipeline::render::BasicRenderer;
use crate::registry::ResultRegistry;
use crate::session::ConversionSession;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Capture `raw` with the built-in renderer.
///
/// # Example
///
/// ```rust,no_run
/// use html2img::{capture, CaptureConfig, RawInput};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = CaptureConfig::default();
///     let result = capture(RawInput::Markup("<h1>Hello</h1>".into()), config).await?;
///     println!("{} ({})", result.file_name(), result.size_label());
///     Ok(())
/// }
/// ```
pub async fn capture(raw: RawInput, config: CaptureConfig) -> Result<CaptureResult, CaptureError> {
    let mut session = ConversionSession::new(Arc::new(BasicRenderer::new()), config);
    let mut registry = ResultRegistry::new();

    session.select_input(raw)?;
    let id = session.convert(&mut registry).await?;
    registry
        .remove(id)
        .ok_or_else(|| CaptureError::Internal("result missing from registry".into()))
}

/// Capture and write the encoded image to `output_path`.
///
/// Parent directories are created as needed.
pub async fn capture_to_file(
    raw: RawInput,
    output_path: impl AsRef<Path>,
    config: CaptureConfig,
) -> Result<CaptureResult, CaptureError> {
    let result = capture(raw, config).await?;
    let path = output_path.as_ref();

    let write = |e: std::io::Error| {
        CaptureError::Internal(
            ExportError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            }
            .to_string(),
        )
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write)?;
    }
    tokio::fs::write(path, &result.bytes).await.map_err(write)?;

    info!("Wrote {} ({})", path.display(), result.size_label());
    Ok(result)
}

/// Blocking wrapper around [`capture`] for non-async callers.
///
/// Creates its own Tokio runtime; do not call from inside one.
pub fn capture_sync(raw: RawInput, config: CaptureConfig) -> Result<CaptureResult, CaptureError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CaptureError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(capture(raw, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::output::CaptureMode;

    #[test]
    fn sync_markup_capture() {
        let config = CaptureConfig::builder()
            .dimensions(320, 240)
            .settle_delay_ms(500)
            .build()
            .unwrap();
        let result = capture_sync(RawInput::Markup("<h1>Hello</h1>".into()), config).unwrap();
        assert_eq!(result.format, OutputFormat::Png);
        assert_eq!(result.mode, CaptureMode::Direct);
        assert_eq!((result.dimensions.width, result.dimensions.height), (320, 240));
        assert_eq!(result.source_description, "HTML Content");
    }

    #[test]
    fn sync_rejects_bad_url_before_rendering() {
        let err = capture_sync(RawInput::Address("not a url".into()), CaptureConfig::default())
            .unwrap_err();
        match err {
            CaptureError::InvalidInput(e) => assert_eq!(e.code(), "bad-url"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn capture_to_file_writes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/page.jpeg");
        let config = CaptureConfig::builder()
            .format(OutputFormat::Jpeg)
            .dimensions(200, 150)
            .settle_delay_ms(500)
            .build()
            .unwrap();
        let result = capture_to_file(RawInput::Markup("<p>file</p>".into()), &path, config)
            .await
            .unwrap();
        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(on_disk, result.bytes);
        assert_eq!(&on_disk[..2], &[0xFF, 0xD8]);
    }
}
