use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::ValidationError;

/// UI value of the widescreen preset; it maps to 1920x1080 rather than a square
const WIDESCREEN_VALUE: u32 = 1920;
const WIDESCREEN_HEIGHT: u32 = 1080;

/// Discrete resolution choice offered by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPreset {
    /// No upscale, keep the native resolution
    Off,
    /// 1920x1080
    Widescreen,
    /// `r` x `r`
    Square(u32),
}

impl ResolutionPreset {
    /// Map the numeric value carried by a preset button (`0` means off)
    pub fn from_value(value: u32) -> Self {
        match value {
            0 => Self::Off,
            WIDESCREEN_VALUE => Self::Widescreen,
            r => Self::Square(r),
        }
    }

    /// Numeric value of the preset, as carried by the UI
    pub fn value(self) -> u32 {
        match self {
            Self::Off => 0,
            Self::Widescreen => WIDESCREEN_VALUE,
            Self::Square(r) => r,
        }
    }

    /// Target `(width, height)`, or `None` when the preset disables upscaling
    pub fn dimensions(self) -> Option<(u32, u32)> {
        match self {
            Self::Off | Self::Square(0) => None,
            Self::Widescreen => Some((WIDESCREEN_VALUE, WIDESCREEN_HEIGHT)),
            Self::Square(r) => Some((r, r)),
        }
    }
}

impl FromStr for ResolutionPreset {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        match value.as_str() {
            "off" | "none" => Ok(Self::Off),
            "fhd" | "widescreen" => Ok(Self::Widescreen),
            "hd" => Ok(Self::Square(1024)),
            "2k" => Ok(Self::Square(2048)),
            "4k" => Ok(Self::Square(4096)),
            other => other
                .parse::<u32>()
                .map(Self::from_value)
                .map_err(|_| ValidationError::UnknownPreset(s.to_string())),
        }
    }
}

/// Short label shown next to the resolution control for a target width
pub fn resolution_label(width: Option<u32>) -> String {
    match width.unwrap_or(0) {
        0 => "Off".to_string(),
        1024 => "HD".to_string(),
        1920 => "FHD".to_string(),
        2048 => "2K".to_string(),
        4096 => "4K".to_string(),
        other => other.to_string(),
    }
}

/// Strategy used by the backend while upscaling is active.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UpscaleModel {
    #[default]
    Balanced,
    Named(String),
}

impl UpscaleModel {
    /// Map the value of the upscale model select.
    ///
    /// `default` selects the balanced strategy. `off` is not a model and is
    /// rejected; upscaling is only turned off through a resolution preset.
    pub fn from_selection(value: &str) -> Option<Self> {
        let value = value.trim();
        match value {
            "" | "off" => None,
            "default" | "balanced" => Some(Self::Balanced),
            name => Some(Self::Named(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Balanced => "balanced",
            Self::Named(name) => name,
        }
    }
}

/// Active upscale configuration. Width, height and strategy only exist
/// together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpscaleTarget {
    pub width: u32,
    pub height: u32,
    pub model: UpscaleModel,
}

/// Upscale strategy as seen from outside the parameter model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpscaleStrategy {
    Off,
    Active(UpscaleModel),
}

impl UpscaleStrategy {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Off => "off",
            Self::Active(model) => model.as_str(),
        }
    }

    pub fn is_off(&self) -> bool {
        matches!(self, Self::Off)
    }
}

impl Serialize for UpscaleStrategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
