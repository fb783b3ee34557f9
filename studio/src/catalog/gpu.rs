use serde::Serialize;

/// Normalized GPU availability reported by the backend health check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GpuInfo {
    pub available: bool,
    pub device_name: Option<String>,
}

/// State of the GPU indicator shown next to the resolution controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum GpuIndicator {
    Checking,
    Gpu { name: String },
    Cpu,
    Unknown,
}

impl GpuIndicator {
    pub fn label(&self) -> String {
        match self {
            GpuIndicator::Checking => "Checking...".to_string(),
            GpuIndicator::Gpu { name } => format!("GPU: {}", name),
            GpuIndicator::Cpu => "CPU Mode (slower)".to_string(),
            GpuIndicator::Unknown => "Status unknown".to_string(),
        }
    }
}

impl From<&GpuInfo> for GpuIndicator {
    fn from(info: &GpuInfo) -> Self {
        if info.available {
            GpuIndicator::Gpu {
                name: info
                    .device_name
                    .clone()
                    .unwrap_or_else(|| "GPU".to_string()),
            }
        } else {
            GpuIndicator::Cpu
        }
    }
}
