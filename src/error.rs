//! Error types for the html2img library.
//!
//! Four error types map onto four distinct places a capture can go wrong:
//!
//! * [`InvalidInputError`]: the user-supplied address, markup or file was
//!   rejected before any rendering started. Surfaced verbatim.
//!
//! * [`RenderError`]: returned by a [`crate::pipeline::render::RenderingCapability`].
//!   One variant, [`RenderError::CrossOriginBlocked`], is not a failure at all:
//!   the orchestrator turns it into a synthesized preview.
//!
//! * [`CaptureError`]: **Fatal** for the current conversion attempt. Stored
//!   as the session's `last_error`; never touches the result registry.
//!
//! * [`ExportError`]: writing artifacts out of the registry failed.

use std::path::PathBuf;
use thiserror::Error;

/// Rejection reasons produced by the input resolver.
///
/// Each variant carries a stable kebab-case [`code`](InvalidInputError::code)
/// so front-ends can localise messages without parsing them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInputError {
    /// Convert was triggered before any input was selected.
    #[error("Select a URL, HTML content or an HTML file first")]
    Missing,

    /// The address could not be parsed, has no host, or is not http/https.
    #[error("Invalid URL '{input}': enter an http:// or https:// address")]
    BadUrl { input: String },

    /// Inline markup was empty after trimming.
    #[error("HTML content is empty")]
    EmptyHtml,

    /// A file was supplied whose media type is not HTML.
    #[error("Unsupported file type '{media_type}': select an .html or .htm file")]
    WrongType { media_type: String },

    /// A file exceeded the configured size cap.
    #[error("File is {size} bytes, larger than the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    /// A file could not be read.
    #[error("Could not read '{name}': {reason}")]
    Unreadable { name: String, reason: String },
}

impl InvalidInputError {
    /// Stable machine-readable identifier for this rejection.
    pub fn code(&self) -> &'static str {
        match self {
            InvalidInputError::Missing => "no-input",
            InvalidInputError::BadUrl { .. } => "bad-url",
            InvalidInputError::EmptyHtml => "empty-html",
            InvalidInputError::WrongType { .. } => "wrong-type",
            InvalidInputError::TooLarge { .. } => "too-large",
            InvalidInputError::Unreadable { .. } => "unreadable",
        }
    }
}

/// Errors reported by a rendering capability.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// The target origin refuses embedding or introspection of its content.
    #[error("Content of '{origin}' is not accessible from an embedded surface")]
    CrossOriginBlocked { origin: String },

    /// The surface could not be loaded at all.
    #[error("Failed to load '{target}': {reason}")]
    LoadFailed { target: String, reason: String },

    /// The surface loaded but producing a bitmap failed.
    #[error("Rasterisation failed: {0}")]
    RasterFailed(String),
}

/// All fatal errors for a single conversion attempt.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The selected input was rejected (or no input was selected).
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),

    // ── Acquisition errors ────────────────────────────────────────────────
    /// Address acquisition exceeded the hard deadline.
    #[error("Timed out after {ms}ms waiting for the page to load")]
    Timeout { ms: u64 },

    /// The rendering capability failed for a reason other than cross-origin
    /// denial.
    #[error("Capture failed: {0}")]
    AcquisitionFailed(String),

    // ── Encoding errors ───────────────────────────────────────────────────
    /// The bitmap could not be encoded into the requested format.
    #[error("Image encoding failed: {0}")]
    Encoding(String),

    // ── Session errors ────────────────────────────────────────────────────
    /// A conversion is already in flight on this session.
    #[error("A conversion is already in progress")]
    Busy,

    /// Builder or viewport validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (task panic, join failure).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CaptureError {
    /// Message suitable for showing to an end user.
    ///
    /// Input and timeout errors are shown as-is; everything else collapses to
    /// a generic failure so internal details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            CaptureError::InvalidInput(e) => e.to_string(),
            CaptureError::Timeout { .. } => {
                "The page took too long to load. Check the address and try again.".to_string()
            }
            CaptureError::Busy => "A conversion is already running.".to_string(),
            CaptureError::InvalidConfig(msg) => format!("Invalid settings: {msg}"),
            CaptureError::AcquisitionFailed(_)
            | CaptureError::Encoding(_)
            | CaptureError::Internal(_) => {
                "Failed to convert to an image. Please try again.".to_string()
            }
        }
    }
}

/// Errors raised while dispatching artifacts out of the registry.
#[derive(Debug, Error)]
pub enum ExportError {
    /// No registry entry has this id.
    #[error("No capture result with id {id}")]
    UnknownResult { id: uuid::Uuid },

    /// Could not create or write an artifact file.
    #[error("Failed to write '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A background write task failed to complete.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_codes() {
        assert_eq!(
            InvalidInputError::BadUrl { input: "x".into() }.code(),
            "bad-url"
        );
        assert_eq!(InvalidInputError::EmptyHtml.code(), "empty-html");
        assert_eq!(
            InvalidInputError::WrongType {
                media_type: "image/png".into()
            }
            .code(),
            "wrong-type"
        );
        assert_eq!(
            InvalidInputError::TooLarge { size: 2, limit: 1 }.code(),
            "too-large"
        );
    }

    #[test]
    fn invalid_input_is_surfaced_verbatim() {
        let e = CaptureError::from(InvalidInputError::BadUrl {
            input: "not a url".into(),
        });
        assert_eq!(e.user_message(), e.to_string());
        assert!(e.user_message().contains("not a url"));
    }

    #[test]
    fn timeout_display() {
        let e = CaptureError::Timeout { ms: 15_000 };
        assert!(e.to_string().contains("15000ms"), "got: {e}");
        assert!(e.user_message().contains("too long"));
    }

    #[test]
    fn encoding_error_is_generic_for_users() {
        let e = CaptureError::Encoding("jpeg writer exploded".into());
        assert!(!e.user_message().contains("exploded"));
        assert!(e.to_string().contains("exploded"));
    }

    #[test]
    fn cross_origin_display() {
        let e = RenderError::CrossOriginBlocked {
            origin: "https://example.com".into(),
        };
        assert!(e.to_string().contains("https://example.com"));
    }
}
