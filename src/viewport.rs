//! Viewport catalog: named device presets and the clamped [`ViewportSpec`].
//!
//! A viewport is the virtual window the content is laid out in. Presets cover
//! the common device classes; anything else is a custom size. Dimensions are
//! always clamped into [`MIN_DIMENSION`]`..=`[`MAX_DIMENSION`] on the way in,
//! so a `ViewportSpec` obtained through this module can never carry an
//! out-of-range width or height.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest accepted viewport edge in pixels.
pub const MIN_DIMENSION: u32 = 100;

/// Largest accepted viewport edge in pixels.
pub const MAX_DIMENSION: u32 = 4000;

/// Closed set of named device presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePresetId {
    /// 1920 × 1080 (default)
    #[default]
    Desktop,
    /// 1366 × 768
    Laptop,
    /// 768 × 1024
    Tablet,
    /// 375 × 667
    Mobile,
}

/// A preset's dimensions and display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevicePreset {
    pub id: DevicePresetId,
    pub width: u32,
    pub height: u32,
    pub label: &'static str,
}

/// The full preset table, in display order.
pub const PRESETS: [DevicePreset; 4] = [
    DevicePreset {
        id: DevicePresetId::Desktop,
        width: 1920,
        height: 1080,
        label: "Desktop (1920×1080)",
    },
    DevicePreset {
        id: DevicePresetId::Laptop,
        width: 1366,
        height: 768,
        label: "Laptop (1366×768)",
    },
    DevicePreset {
        id: DevicePresetId::Tablet,
        width: 768,
        height: 1024,
        label: "Tablet (768×1024)",
    },
    DevicePreset {
        id: DevicePresetId::Mobile,
        width: 375,
        height: 667,
        label: "Mobile (375×667)",
    },
];

impl DevicePresetId {
    /// Look up this preset's dimensions.
    pub fn preset(self) -> &'static DevicePreset {
        match self {
            DevicePresetId::Desktop => &PRESETS[0],
            DevicePresetId::Laptop => &PRESETS[1],
            DevicePresetId::Tablet => &PRESETS[2],
            DevicePresetId::Mobile => &PRESETS[3],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DevicePresetId::Desktop => "desktop",
            DevicePresetId::Laptop => "laptop",
            DevicePresetId::Tablet => "tablet",
            DevicePresetId::Mobile => "mobile",
        }
    }
}

impl FromStr for DevicePresetId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(DevicePresetId::Desktop),
            "laptop" => Ok(DevicePresetId::Laptop),
            "tablet" => Ok(DevicePresetId::Tablet),
            "mobile" => Ok(DevicePresetId::Mobile),
            _ => Err(()),
        }
    }
}

/// Which preset (if any) a viewport came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewportPreset {
    Device(DevicePresetId),
    Custom,
}

impl fmt::Display for ViewportPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewportPreset::Device(id) => f.write_str(id.as_str()),
            ViewportPreset::Custom => f.write_str("custom"),
        }
    }
}

/// The virtual window content is rendered into.
///
/// Fields are private so the `[100, 4000]` bound cannot be bypassed; use
/// [`ViewportSpec::from_preset`], [`ViewportSpec::custom`] or [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewportSpec {
    width: u32,
    height: u32,
    preset: ViewportPreset,
    capture_full_extent: bool,
}

impl Default for ViewportSpec {
    fn default() -> Self {
        Self::from_preset(DevicePresetId::default())
    }
}

impl ViewportSpec {
    /// Viewport matching a device preset exactly.
    pub fn from_preset(id: DevicePresetId) -> Self {
        let p = id.preset();
        Self {
            width: p.width,
            height: p.height,
            preset: ViewportPreset::Device(id),
            capture_full_extent: false,
        }
    }

    /// Custom viewport; both edges are clamped into range.
    pub fn custom(width: u32, height: u32) -> Self {
        Self {
            width: clamp_dimension(width),
            height: clamp_dimension(height),
            preset: ViewportPreset::Custom,
            capture_full_extent: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn preset(&self) -> ViewportPreset {
        self.preset
    }

    pub fn capture_full_extent(&self) -> bool {
        self.capture_full_extent
    }

    /// Switch to a preset, keeping the full-extent toggle.
    pub fn select_preset(&mut self, id: DevicePresetId) {
        let full = self.capture_full_extent;
        *self = Self::from_preset(id);
        self.capture_full_extent = full;
    }

    /// Edit the width directly. Forces the preset to `Custom`.
    pub fn set_width(&mut self, width: u32) {
        self.width = clamp_dimension(width);
        self.preset = ViewportPreset::Custom;
    }

    /// Edit the height directly. Forces the preset to `Custom`.
    pub fn set_height(&mut self, height: u32) {
        self.height = clamp_dimension(height);
        self.preset = ViewportPreset::Custom;
    }

    pub fn set_capture_full_extent(&mut self, on: bool) {
        self.capture_full_extent = on;
    }

    /// Builder-style variant of [`set_capture_full_extent`](Self::set_capture_full_extent).
    pub fn with_full_extent(mut self, on: bool) -> Self {
        self.capture_full_extent = on;
        self
    }

    /// Check the dimension invariant.
    pub fn is_within_bounds(&self) -> bool {
        (MIN_DIMENSION..=MAX_DIMENSION).contains(&self.width)
            && (MIN_DIMENSION..=MAX_DIMENSION).contains(&self.height)
    }
}

/// Deserialisation goes through [`ViewportSpec::custom`]-style clamping so a
/// hand-edited JSON file cannot smuggle an out-of-range size in.
impl<'de> Deserialize<'de> for ViewportSpec {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            width: u32,
            height: u32,
            preset: ViewportPreset,
            #[serde(default)]
            capture_full_extent: bool,
        }

        let raw = Raw::deserialize(deserializer)?;
        let mut spec = match raw.preset {
            ViewportPreset::Device(id) => {
                let p = id.preset();
                if p.width == raw.width && p.height == raw.height {
                    ViewportSpec::from_preset(id)
                } else {
                    ViewportSpec::custom(raw.width, raw.height)
                }
            }
            ViewportPreset::Custom => ViewportSpec::custom(raw.width, raw.height),
        };
        spec.capture_full_extent = raw.capture_full_extent;
        Ok(spec)
    }
}

/// Resolve a preset id string plus custom dimensions into a viewport.
///
/// Known preset ids win; anything else (including `"custom"`) yields a
/// custom viewport from the supplied dimensions, clamped into range.
pub fn resolve(preset_id: &str, custom_width: u32, custom_height: u32) -> ViewportSpec {
    match preset_id.parse::<DevicePresetId>() {
        Ok(id) => ViewportSpec::from_preset(id),
        Err(()) => ViewportSpec::custom(custom_width, custom_height),
    }
}

fn clamp_dimension(v: u32) -> u32 {
    v.clamp(MIN_DIMENSION, MAX_DIMENSION)
}
