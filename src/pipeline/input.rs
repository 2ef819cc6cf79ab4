//! Input resolution: normalise an address, inline markup, or markup file into
//! a canonical [`CaptureSource`].
//!
//! Resolution is pure validation except for one suspension point: a file's
//! content is read here, so the rest of the pipeline only ever sees markup
//! text. A file is checked for type and size *before* its content is read so
//! an oversized upload is rejected without buffering it.

use crate::error::InvalidInputError;
use crate::output::SourceKind;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Display identity of inline markup sources.
pub const MARKUP_DESCRIPTION: &str = "HTML Content";

static RE_SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap());

/// Media types accepted for markup files.
const HTML_MEDIA_TYPES: [&str; 2] = ["text/html", "application/xhtml+xml"];

/// A canonical, validated capture target. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSource {
    /// Absolute http/https address.
    Address(Url),
    /// Non-empty inline markup.
    Markup(String),
    /// Markup read from a file.
    File { name: String, html: String },
}

impl CaptureSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            CaptureSource::Address(_) => SourceKind::Address,
            CaptureSource::Markup(_) => SourceKind::Markup,
            CaptureSource::File { .. } => SourceKind::File,
        }
    }

    /// The source's textual identity: the address, `"HTML Content"`, or the
    /// file name.
    pub fn description(&self) -> String {
        match self {
            CaptureSource::Address(url) => url.to_string(),
            CaptureSource::Markup(_) => MARKUP_DESCRIPTION.to_string(),
            CaptureSource::File { name, .. } => name.clone(),
        }
    }

    pub fn address(&self) -> Option<&Url> {
        match self {
            CaptureSource::Address(url) => Some(url),
            _ => None,
        }
    }

    pub fn markup(&self) -> Option<&str> {
        match self {
            CaptureSource::Address(_) => None,
            CaptureSource::Markup(html) | CaptureSource::File { html, .. } => Some(html),
        }
    }

    /// `true` for `https` addresses.
    pub fn is_secure(&self) -> bool {
        self.address().is_some_and(|u| u.scheme() == "https")
    }
}

/// Where a markup file's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// Read lazily during resolution.
    Path(PathBuf),
    /// Already in memory (e.g. an upload body).
    Bytes(Vec<u8>),
}

/// A user-selected markup file with its declared media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupFile {
    pub name: String,
    pub media_type: String,
    pub content: FileContent,
}

impl MarkupFile {
    /// Describe a file on disk; the media type is inferred from its extension.
    /// Nothing is read until the file is resolved.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            media_type: media_type_for(path).to_string(),
            content: FileContent::Path(path.to_path_buf()),
        }
    }

    pub fn from_bytes(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            content: FileContent::Bytes(bytes),
        }
    }

    pub fn is_html(&self) -> bool {
        is_html_media_type(&self.media_type)
    }
}

/// Raw user input, one of the three entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInput {
    Address(String),
    Markup(String),
    File(MarkupFile),
}

/// Resolve raw input into a [`CaptureSource`], reading file content if needed.
pub async fn resolve(raw: &RawInput, max_file_bytes: u64) -> Result<CaptureSource, InvalidInputError> {
    match raw {
        RawInput::Address(s) => resolve_address(s),
        RawInput::Markup(s) => resolve_markup(s),
        RawInput::File(file) => resolve_file(file, max_file_bytes).await,
    }
}

/// Validate raw input without reading any file content.
///
/// Catches everything [`resolve`] would reject except an empty or unreadable
/// file on disk.
pub fn prevalidate(raw: &RawInput, max_file_bytes: u64) -> Result<(), InvalidInputError> {
    match raw {
        RawInput::Address(s) => resolve_address(s).map(|_| ()),
        RawInput::Markup(s) => resolve_markup(s).map(|_| ()),
        RawInput::File(file) => {
            check_file_type(file)?;
            if let FileContent::Bytes(bytes) = &file.content {
                check_file_size(bytes.len() as u64, max_file_bytes)?;
            }
            Ok(())
        }
    }
}

/// Normalise an address: trim, default to `https://`, require an http(s)
/// scheme and a host.
pub fn resolve_address(raw: &str) -> Result<CaptureSource, InvalidInputError> {
    let bad = || InvalidInputError::BadUrl {
        input: raw.to_string(),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(bad());
    }

    let candidate = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&candidate).map_err(|_| bad())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(bad());
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(bad());
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(bad());
    }

    debug!("Resolved address: {}", url);
    Ok(CaptureSource::Address(url))
}

/// `true` when `s` starts with a URL scheme. `host:port` (the text after the
/// first colon starts with a digit and has no `//`) is not a scheme.
fn has_scheme(s: &str) -> bool {
    let Some(m) = RE_SCHEME.find(s) else {
        return false;
    };
    let rest = &s[m.end()..];
    let is_port = rest.starts_with(|c: char| c.is_ascii_digit()) && !rest.contains("//");
    !is_port
}

/// Accept any markup that is non-empty after trimming.
pub fn resolve_markup(raw: &str) -> Result<CaptureSource, InvalidInputError> {
    if raw.trim().is_empty() {
        return Err(InvalidInputError::EmptyHtml);
    }
    Ok(CaptureSource::Markup(raw.to_string()))
}

async fn resolve_file(file: &MarkupFile, max_file_bytes: u64) -> Result<CaptureSource, InvalidInputError> {
    check_file_type(file)?;

    let bytes = match &file.content {
        FileContent::Bytes(bytes) => {
            check_file_size(bytes.len() as u64, max_file_bytes)?;
            bytes.clone()
        }
        FileContent::Path(path) => {
            let unreadable = |e: std::io::Error| InvalidInputError::Unreadable {
                name: file.name.clone(),
                reason: e.to_string(),
            };
            let meta = tokio::fs::metadata(path).await.map_err(unreadable)?;
            check_file_size(meta.len(), max_file_bytes)?;
            tokio::fs::read(path).await.map_err(unreadable)?
        }
    };

    let html = String::from_utf8_lossy(&bytes).into_owned();
    if html.trim().is_empty() {
        return Err(InvalidInputError::EmptyHtml);
    }

    debug!("Read markup file '{}' ({} bytes)", file.name, bytes.len());
    Ok(CaptureSource::File {
        name: file.name.clone(),
        html,
    })
}

fn check_file_type(file: &MarkupFile) -> Result<(), InvalidInputError> {
    if file.is_html() {
        Ok(())
    } else {
        Err(InvalidInputError::WrongType {
            media_type: file.media_type.clone(),
        })
    }
}

fn check_file_size(size: u64, limit: u64) -> Result<(), InvalidInputError> {
    if size > limit {
        Err(InvalidInputError::TooLarge { size, limit })
    } else {
        Ok(())
    }
}

/// `true` when the essence of `media_type` (parameters stripped) is HTML.
pub fn is_html_media_type(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or("").trim();
    HTML_MEDIA_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(essence))
}

fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html",
        "xhtml" => "application/xhtml+xml",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
