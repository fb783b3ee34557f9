//! Generation parameters and the rules that derive them from UI choices.

mod preset;
mod request;
mod seed;
mod shape;

pub use preset::{
    resolution_label, ResolutionPreset, UpscaleModel, UpscaleStrategy, UpscaleTarget,
};
pub use request::GenerationRequest;
pub use seed::{parse_seed, RANDOM_SEED};
pub use shape::Shape;

use log::debug;

/// Model used until the catalog has been loaded
pub const DEFAULT_MODEL: &str = "goblin-sd";

pub const GUIDANCE_MIN: f64 = 1.0;
pub const GUIDANCE_MAX: f64 = 20.0;
pub const GUIDANCE_DEFAULT: f64 = 7.0;

/// Current generation configuration of a session.
///
/// Every setter keeps the model consistent: target dimensions and upscale
/// strategy live in a single `Option<UpscaleTarget>`, so "no upscale" can
/// only be represented one way.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterModel {
    prompt: String,
    negative_prompt: String,
    model: String,
    shape: Shape,
    guidance_scale: f64,
    seed: i64,
    upscale: Option<UpscaleTarget>,
}

impl Default for ParameterModel {
    fn default() -> Self {
        Self::with_model(DEFAULT_MODEL)
    }
}

impl ParameterModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with a different built-in model id
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            prompt: String::new(),
            negative_prompt: String::new(),
            model: model.into(),
            shape: Shape::default(),
            guidance_scale: GUIDANCE_DEFAULT,
            seed: RANDOM_SEED,
            upscale: None,
        }
    }

    // ========== Getters ==========

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn negative_prompt(&self) -> &str {
        &self.negative_prompt
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn guidance_scale(&self) -> f64 {
        self.guidance_scale
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }

    pub fn target_width(&self) -> Option<u32> {
        self.upscale.as_ref().map(|t| t.width)
    }

    pub fn target_height(&self) -> Option<u32> {
        self.upscale.as_ref().map(|t| t.height)
    }

    pub fn upscale_strategy(&self) -> UpscaleStrategy {
        match &self.upscale {
            Some(target) => UpscaleStrategy::Active(target.model.clone()),
            None => UpscaleStrategy::Off,
        }
    }

    /// True when the prompt has non-whitespace content
    pub fn has_prompt(&self) -> bool {
        !self.prompt.trim().is_empty()
    }

    /// Guidance scale as displayed, with one decimal
    pub fn guidance_label(&self) -> String {
        format!("{:.1}", self.guidance_scale)
    }

    /// Position of the guidance scale within its range, in percent
    pub fn guidance_fill_percent(&self) -> f64 {
        (self.guidance_scale - GUIDANCE_MIN) / (GUIDANCE_MAX - GUIDANCE_MIN) * 100.0
    }

    pub fn resolution_label(&self) -> String {
        resolution_label(self.target_width())
    }

    // ========== Setters ==========

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn set_negative_prompt(&mut self, negative_prompt: impl Into<String>) {
        self.negative_prompt = negative_prompt.into();
    }

    /// Set the model id. Not checked against the catalog.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
    }

    /// Set the guidance scale, clamped into its range. Non-finite values are
    /// ignored.
    pub fn set_guidance_scale(&mut self, value: f64) {
        if !value.is_finite() {
            debug!("Ignoring non-finite guidance scale");
            return;
        }
        self.guidance_scale = value.clamp(GUIDANCE_MIN, GUIDANCE_MAX);
    }

    /// Set the seed from raw user input (see [`parse_seed`])
    pub fn set_seed(&mut self, input: &str) {
        self.seed = parse_seed(input);
    }

    pub fn randomize_seed(&mut self) {
        self.seed = RANDOM_SEED;
    }

    /// The only way to change target dimensions. Any preset other than off
    /// resets the strategy to balanced.
    pub fn apply_resolution_preset(&mut self, preset: ResolutionPreset) {
        self.upscale = preset.dimensions().map(|(width, height)| UpscaleTarget {
            width,
            height,
            model: UpscaleModel::Balanced,
        });
    }

    /// Choose the upscale model. Has no effect while upscaling is off.
    ///
    /// Returns whether the strategy changed.
    pub fn set_upscale_strategy(&mut self, model: UpscaleModel) -> bool {
        match self.upscale.as_mut() {
            Some(target) => {
                target.model = model;
                true
            }
            None => {
                debug!(
                    "Ignoring upscale strategy '{}' while upscaling is off",
                    model.as_str()
                );
                false
            }
        }
    }

    /// Immutable request snapshot for `POST /generate`
    pub fn to_request(&self) -> GenerationRequest {
        GenerationRequest {
            prompt: self.prompt.clone(),
            negative_prompt: self.negative_prompt.clone(),
            model: self.model.clone(),
            shape: self.shape,
            guidance_scale: self.guidance_scale,
            seed: self.seed,
            width: self.target_width(),
            height: self.target_height(),
            upscale_strategy: self.upscale_strategy(),
        }
    }
}
