//! Raw response shapes of the backend and their normalization.
//!
//! The backend is loose about field names (`cuda_available` or `gpu`,
//! `gpu_name` or `device`) and about the catalog layout (nested under
//! `categories` or flat, categories as bare lists or `{info, models}`). All of
//! that is resolved here; nothing past this module sees the raw shapes.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::backend::RandomPrompt;
use crate::catalog::{CategoryInfo, GpuInfo, ModelCatalog, ModelCategory, ModelEntry};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawModel {
    Id(String),
    Entry {
        id: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        tags: Option<Vec<String>>,
    },
}

impl From<RawModel> for ModelEntry {
    fn from(raw: RawModel) -> Self {
        match raw {
            RawModel::Id(id) => ModelEntry::new(id, None, Vec::new()),
            RawModel::Entry { id, name, tags } => {
                ModelEntry::new(id, name, tags.unwrap_or_default())
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawCategoryInfo {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCategory {
    Listed(Vec<RawModel>),
    Grouped {
        #[serde(default)]
        info: Option<RawCategoryInfo>,
        #[serde(default)]
        models: Vec<RawModel>,
    },
}

/// Normalize the body of `GET /models`.
pub fn parse_catalog(body: Value) -> Result<ModelCatalog, String> {
    let Value::Object(mut root) = body else {
        return Err("expected a JSON object".to_string());
    };

    let reported_total = root
        .get("total_models")
        .and_then(Value::as_u64)
        .map(|n| n as usize);

    let mapping: Map<String, Value> = match root.shift_remove("categories") {
        Some(Value::Object(categories)) => categories,
        _ => root,
    };

    let mut categories = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let raw = match serde_json::from_value::<RawCategory>(value) {
            Ok(raw) => raw,
            Err(_) => {
                debug!("Skipping non-category catalog field '{}'", key);
                continue;
            }
        };

        let (info, models) = match raw {
            RawCategory::Listed(models) => (CategoryInfo::default(), models),
            RawCategory::Grouped { info, models } => (
                CategoryInfo {
                    name: info.unwrap_or_default().name,
                },
                models,
            ),
        };

        categories.push(ModelCategory {
            key,
            info,
            models: models.into_iter().map(ModelEntry::from).collect(),
        });
    }

    Ok(ModelCatalog::new(categories, reported_total))
}

#[derive(Debug, Default, Deserialize)]
struct RawHealth {
    #[serde(default)]
    cuda_available: Option<Value>,
    #[serde(default)]
    gpu: Option<Value>,
    #[serde(default)]
    gpu_name: Option<Value>,
    #[serde(default)]
    device: Option<Value>,
}

/// Loose truthiness: `false`, `0`, `""` and `null` are false
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Normalize the body of `GET /health`.
pub fn parse_health(body: Value) -> Result<GpuInfo, String> {
    let raw: RawHealth = serde_json::from_value(body).map_err(|e| e.to_string())?;

    let available = [raw.cuda_available.as_ref(), raw.gpu.as_ref()]
        .into_iter()
        .flatten()
        .any(truthy);
    let device_name =
        non_empty_str(raw.gpu_name.as_ref()).or_else(|| non_empty_str(raw.device.as_ref()));

    Ok(GpuInfo {
        available,
        device_name,
    })
}

#[derive(Debug, Default, Deserialize)]
struct RawRandomPrompt {
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    negative_prompt: Option<String>,
}

/// Normalize the body of `GET /prompts/random`; absent fields become empty
pub fn parse_random_prompt(body: Value) -> Result<RandomPrompt, String> {
    let raw: RawRandomPrompt = serde_json::from_value(body).map_err(|e| e.to_string())?;
    Ok(RandomPrompt {
        prompt: raw.prompt.unwrap_or_default(),
        negative_prompt: raw.negative_prompt.unwrap_or_default(),
    })
}

/// Body of `POST /upscale`
#[derive(Debug, Serialize)]
pub struct UpscaleBody<'a> {
    pub image_base64: String,
    pub width: u32,
    pub height: u32,
    pub model: &'a str,
}

/// Response of `POST /upscale`
#[derive(Debug, Deserialize)]
pub struct UpscaleResponse {
    pub image_base64: String,
}

/// Seed reported in the `X-Seed` header
pub fn parse_seed_header(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse::<i64>().ok())
}
