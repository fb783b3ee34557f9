use serde::Serialize;

use super::preset::UpscaleStrategy;
use super::shape::Shape;

/// Immutable snapshot of the parameter model, shaped exactly like the body
/// of `POST /generate`.
///
/// `width` and `height` serialize as `null` when no upscale is requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub model: String,
    pub shape: Shape,
    pub guidance_scale: f64,
    pub seed: i64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub upscale_strategy: UpscaleStrategy,
}
