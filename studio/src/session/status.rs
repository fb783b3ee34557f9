use serde::Serialize;

use super::SessionStatus;

/// Colour of the status dot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tone {
    Ok,
    Busy,
    Error,
}

/// Header status indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum StatusIndicator {
    Ready,
    Generating,
    Upscaling,
    Error,
    Offline,
}

/// Inputs the indicator is derived from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusInputs {
    pub status: SessionStatus,
    pub upscaling: bool,
    /// The last upscale of the displayed image failed
    pub upscale_failed: bool,
    /// The model catalog could not be loaded
    pub offline: bool,
}

impl StatusIndicator {
    pub fn derive(inputs: StatusInputs) -> Self {
        if inputs.status.is_generating() {
            StatusIndicator::Generating
        } else if inputs.upscaling {
            StatusIndicator::Upscaling
        } else if inputs.upscale_failed || inputs.status == SessionStatus::Error {
            StatusIndicator::Error
        } else if inputs.offline {
            StatusIndicator::Offline
        } else {
            StatusIndicator::Ready
        }
    }

    pub fn tone(self) -> Tone {
        match self {
            StatusIndicator::Ready => Tone::Ok,
            StatusIndicator::Generating | StatusIndicator::Upscaling => Tone::Busy,
            StatusIndicator::Error | StatusIndicator::Offline => Tone::Error,
        }
    }
}
