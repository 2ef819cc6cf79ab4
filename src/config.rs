//! Configuration types for webpage and markup capture.
//!
//! All capture behaviour is controlled through [`CaptureConfig`], built via
//! its [`CaptureConfigBuilder`]. [`ViewportSpec`] (where content is laid out)
//! and [`OutputSpec`] (what image comes out) are plain values that a session
//! can also edit in place between conversions.

use crate::error::CaptureError;
use crate::progress::SessionObserver;
use crate::viewport::{DevicePresetId, ViewportSpec};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Hard deadline for address acquisition, measured from load start.
pub const DEFAULT_ADDRESS_TIMEOUT_MS: u64 = 15_000;

/// Largest markup file accepted by the input resolver.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Quality bounds for lossy output.
pub const MIN_QUALITY: u8 = 10;
pub const MAX_QUALITY: u8 = 100;

/// Settle delay bounds in milliseconds.
pub const MIN_SETTLE_DELAY_MS: u64 = 500;
pub const MAX_SETTLE_DELAY_MS: u64 = 5000;

// ── Output ───────────────────────────────────────────────────────────────

/// Target image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless; quality is ignored. (default)
    #[default]
    Png,
    /// Lossy; quality applies.
    Jpeg,
}

impl OutputFormat {
    /// File extension used in artifact names.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn is_lossless(self) -> bool {
        matches!(self, OutputFormat::Png)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Png => "PNG",
            OutputFormat::Jpeg => "JPEG",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            other => Err(CaptureError::InvalidConfig(format!(
                "unsupported output format '{other}' (expected png or jpeg)"
            ))),
        }
    }
}

/// What the encoder produces and how long content gets to settle first.
///
/// Setters clamp into range, so an `OutputSpec` is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OutputSpecRepr")]
pub struct OutputSpec {
    format: OutputFormat,
    quality: u8,
    settle_delay_ms: u64,
}

#[derive(Deserialize)]
struct OutputSpecRepr {
    #[serde(default)]
    format: OutputFormat,
    #[serde(default = "default_quality")]
    quality: u8,
    #[serde(default = "default_settle_delay")]
    settle_delay_ms: u64,
}

impl From<OutputSpecRepr> for OutputSpec {
    fn from(r: OutputSpecRepr) -> Self {
        OutputSpec::new(r.format, r.quality, r.settle_delay_ms)
    }
}

fn default_quality() -> u8 {
    90
}

fn default_settle_delay() -> u64 {
    2000
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            quality: default_quality(),
            settle_delay_ms: default_settle_delay(),
        }
    }
}

impl OutputSpec {
    pub fn new(format: OutputFormat, quality: u8, settle_delay_ms: u64) -> Self {
        Self {
            format,
            quality: quality.clamp(MIN_QUALITY, MAX_QUALITY),
            settle_delay_ms: settle_delay_ms.clamp(MIN_SETTLE_DELAY_MS, MAX_SETTLE_DELAY_MS),
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn settle_delay_ms(&self) -> u64 {
        self.settle_delay_ms
    }

    pub fn set_format(&mut self, format: OutputFormat) {
        self.format = format;
    }

    pub fn set_quality(&mut self, quality: u8) {
        self.quality = quality.clamp(MIN_QUALITY, MAX_QUALITY);
    }

    pub fn set_settle_delay_ms(&mut self, ms: u64) {
        self.settle_delay_ms = ms.clamp(MIN_SETTLE_DELAY_MS, MAX_SETTLE_DELAY_MS);
    }

    /// Label shown next to a result: `Lossless` for PNG, `NN%` for JPEG.
    pub fn quality_label(&self) -> String {
        if self.format.is_lossless() {
            "Lossless".to_string()
        } else {
            format!("{}%", self.quality)
        }
    }
}

// ── Capture config ───────────────────────────────────────────────────────

/// Configuration for a conversion session.
///
/// Built via [`CaptureConfig::builder()`] or using [`CaptureConfig::default()`].
///
/// # Example
/// ```rust
/// use html2img::{CaptureConfig, DevicePresetId, OutputFormat};
///
/// let config = CaptureConfig::builder()
///     .device(DevicePresetId::Mobile)
///     .format(OutputFormat::Jpeg)
///     .quality(80)
///     .build()
///     .unwrap();
/// assert_eq!(config.viewport.width(), 375);
/// ```
#[derive(Clone)]
pub struct CaptureConfig {
    /// Virtual window the content is laid out in. Default: desktop preset.
    pub viewport: ViewportSpec,

    /// Format, quality and settle delay. Default: PNG, 90, 2000 ms.
    pub output: OutputSpec,

    /// Hard deadline for address acquisition in milliseconds. Default: 15 000.
    ///
    /// Counted from the moment the surface starts loading and covering the
    /// settle delay and rasterisation. Markup and file sources have no
    /// deadline.
    pub address_timeout_ms: u64,

    /// Largest accepted markup file in bytes. Default: 10 MB.
    pub max_file_bytes: u64,

    /// Receives state transitions and outcomes.
    pub observer: Option<Arc<dyn SessionObserver>>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportSpec::default(),
            output: OutputSpec::default(),
            address_timeout_ms: DEFAULT_ADDRESS_TIMEOUT_MS,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            observer: None,
        }
    }
}

impl fmt::Debug for CaptureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureConfig")
            .field("viewport", &self.viewport)
            .field("output", &self.output)
            .field("address_timeout_ms", &self.address_timeout_ms)
            .field("max_file_bytes", &self.max_file_bytes)
            .field(
                "observer",
                &self.observer.as_ref().map(|_| "<dyn SessionObserver>"),
            )
            .finish()
    }
}

impl CaptureConfig {
    /// Create a new builder for `CaptureConfig`.
    pub fn builder() -> CaptureConfigBuilder {
        CaptureConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CaptureConfig`].
#[derive(Debug)]
pub struct CaptureConfigBuilder {
    config: CaptureConfig,
}

impl CaptureConfigBuilder {
    pub fn viewport(mut self, viewport: ViewportSpec) -> Self {
        self.config.viewport = viewport;
        self
    }

    pub fn device(mut self, id: DevicePresetId) -> Self {
        self.config.viewport.select_preset(id);
        self
    }

    /// Custom viewport size; clamps to 100–4000 and switches to `Custom`.
    pub fn dimensions(mut self, width: u32, height: u32) -> Self {
        self.config.viewport.set_width(width);
        self.config.viewport.set_height(height);
        self
    }

    pub fn full_extent(mut self, on: bool) -> Self {
        self.config.viewport.set_capture_full_extent(on);
        self
    }

    pub fn output(mut self, output: OutputSpec) -> Self {
        self.config.output = output;
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.output.set_format(format);
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.config.output.set_quality(quality);
        self
    }

    pub fn settle_delay_ms(mut self, ms: u64) -> Self {
        self.config.output.set_settle_delay_ms(ms);
        self
    }

    pub fn address_timeout_ms(mut self, ms: u64) -> Self {
        self.config.address_timeout_ms = ms;
        self
    }

    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_bytes = bytes;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CaptureConfig, CaptureError> {
        let c = &self.config;
        if !c.viewport.is_within_bounds() {
            return Err(CaptureError::InvalidConfig(format!(
                "viewport {}x{} is outside 100–4000",
                c.viewport.width(),
                c.viewport.height()
            )));
        }
        if c.address_timeout_ms == 0 {
            return Err(CaptureError::InvalidConfig(
                "address timeout must be ≥ 1ms".into(),
            ));
        }
        if c.max_file_bytes == 0 {
            return Err(CaptureError::InvalidConfig(
                "max file size must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewport::ViewportPreset;

    #[test]
    fn defaults() {
        let c = CaptureConfig::default();
        assert_eq!(c.address_timeout_ms, 15_000);
        assert_eq!(c.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(c.output.format(), OutputFormat::Png);
        assert_eq!(c.viewport.width(), 1920);
    }

    #[test]
    fn output_spec_clamps() {
        let o = OutputSpec::new(OutputFormat::Jpeg, 0, 60_000);
        assert_eq!(o.quality(), 10);
        assert_eq!(o.settle_delay_ms(), 5000);

        let mut o = OutputSpec::default();
        o.set_quality(250);
        o.set_settle_delay_ms(1);
        assert_eq!(o.quality(), 100);
        assert_eq!(o.settle_delay_ms(), 500);
    }

    #[test]
    fn quality_label_by_format() {
        assert_eq!(OutputSpec::new(OutputFormat::Png, 40, 500).quality_label(), "Lossless");
        assert_eq!(OutputSpec::new(OutputFormat::Jpeg, 40, 500).quality_label(), "40%");
    }

    #[test]
    fn format_parsing() {
        assert_eq!("JPG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("png".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert!("svg".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Jpeg.extension(), "jpeg");
    }

    #[test]
    fn builder_dimensions_force_custom() {
        let c = CaptureConfig::builder()
            .device(DevicePresetId::Tablet)
            .dimensions(50, 5000)
            .full_extent(true)
            .build()
            .unwrap();
        assert_eq!(c.viewport.preset(), ViewportPreset::Custom);
        assert_eq!((c.viewport.width(), c.viewport.height()), (100, 4000));
        assert!(c.viewport.capture_full_extent());
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        let err = CaptureConfig::builder().address_timeout_ms(0).build();
        assert!(matches!(err, Err(CaptureError::InvalidConfig(_))));
    }

    #[test]
    fn output_spec_deserialises_with_clamping() {
        let o: OutputSpec =
            serde_json::from_str(r#"{"format":"jpeg","quality":5,"settle_delay_ms":100}"#).unwrap();
        assert_eq!(o.format(), OutputFormat::Jpeg);
        assert_eq!(o.quality(), 10);
        assert_eq!(o.settle_delay_ms(), 500);
    }
}
