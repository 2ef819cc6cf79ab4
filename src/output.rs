//! Output types: the artifact produced by a completed conversion.

use crate::config::OutputFormat;
use crate::pipeline::encode::EncodedImage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which input kind produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Address,
    Markup,
    File,
}

/// How the bitmap was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Rendered and rasterised from the actual content.
    Direct,
    /// Placeholder drawn by the fallback renderer after cross-origin denial.
    Synthesized,
}

/// Pixel dimensions of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A finished, self-contained capture artifact.
///
/// Holds no reference to the session that produced it, so it stays valid in
/// the registry after the session is reset or dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureResult {
    pub id: Uuid,
    /// Normalised address, `"HTML Content"`, or the file name.
    pub source_description: String,
    pub source_kind: SourceKind,
    /// Encoded image bytes.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub dimensions: Dimensions,
    pub format: OutputFormat,
    pub byte_size: u64,
    pub quality_label: String,
    pub created_at: DateTime<Utc>,
    /// `data:` URI of the encoded image for inline previews.
    #[serde(skip)]
    pub preview_data_uri: String,
    pub mode: CaptureMode,
    /// Footer text of a synthesized preview; `None` for direct captures.
    pub disclosure: Option<String>,
}

impl CaptureResult {
    pub(crate) fn from_encoded(
        encoded: EncodedImage,
        source_description: String,
        source_kind: SourceKind,
        quality_label: String,
        mode: CaptureMode,
        disclosure: Option<String>,
    ) -> Self {
        let preview_data_uri = encoded.to_data_uri();
        Self {
            id: Uuid::new_v4(),
            source_description,
            source_kind,
            byte_size: encoded.bytes.len() as u64,
            dimensions: Dimensions {
                width: encoded.width,
                height: encoded.height,
            },
            format: encoded.format,
            bytes: encoded.bytes,
            quality_label,
            created_at: Utc::now(),
            preview_data_uri,
            mode,
            disclosure,
        }
    }

    /// Download name: `webpage_<timestamp>.<format>`.
    pub fn file_name(&self) -> String {
        format!(
            "webpage_{}.{}",
            self.created_at.format("%Y-%m-%dT%H-%M-%S-%3fZ"),
            self.format.extension()
        )
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Human-readable size, e.g. `"12.5 KB"`.
    pub fn size_label(&self) -> String {
        format_file_size(self.byte_size)
    }

    pub fn is_synthesized(&self) -> bool {
        self.mode == CaptureMode::Synthesized
    }
}

/// Format a byte count with binary units and up to two decimals.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    // `{}` on f64 drops trailing zeros, so 1.50 prints as 1.5 and 2.00 as 2
    format!("{} {}", rounded, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> CaptureResult {
        CaptureResult {
            id: Uuid::nil(),
            source_description: "https://example.com/".into(),
            source_kind: SourceKind::Address,
            bytes: vec![1, 2, 3],
            dimensions: Dimensions {
                width: 10,
                height: 20,
            },
            format: OutputFormat::Jpeg,
            byte_size: 3,
            quality_label: "90%".into(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap(),
            preview_data_uri: String::new(),
            mode: CaptureMode::Direct,
            disclosure: None,
        }
    }

    #[test]
    fn file_name_uses_timestamp_and_extension() {
        assert_eq!(sample().file_name(), "webpage_2024-03-05T14-07-09-000Z.jpeg");
    }

    #[test]
    fn size_labels() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(10 * 1024 * 1024), "10 MB");
        assert_eq!(sample().size_label(), "3 Bytes");
    }

    #[test]
    fn serialises_metadata_without_payload() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["format"], "jpeg");
        assert_eq!(json["mode"], "direct");
        assert!(json.get("bytes").is_none());
        assert!(json.get("preview_data_uri").is_none());
    }
}
