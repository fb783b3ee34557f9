//! Line-oriented shell over [`Studio`].

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::error::{Error, ValidationError};
use crate::params::{ResolutionPreset, Shape, UpscaleModel};
use crate::session::{SessionStateChanged, UpscaleInput, UpscaleOutcome};
use crate::studio::{RandomPromptOutcome, Studio};

const HELP: &str = "\
Commands:
  prompt <text>             set the prompt
  negative <text>           set the negative prompt
  model <id>                select a model
  models                    list models
  shape <square|portrait|landscape>
  guidance <1.0-20.0>       set the guidance scale
  seed <n>                  fix the seed (blank or non-numeric = random)
  seed-random               use a random seed
  resolution <off|hd|fhd|2k|4k|n>
  upscale-model <default|name>
  random                    fetch a random prompt
  generate                  generate in the background
  upscale [w h [model]]     upscale the current image
  save                      write the current image to the output directory
  copy                      copy the current image to the clipboard
  status                    show the current state
  help                      show this help
  quit                      end the session";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command '{0}'. Type 'help' for a list.")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("{}", .0.user_message())]
    Invalid(#[from] ValidationError),
}

/// One parsed shell line
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Prompt(String),
    Negative(String),
    Model(String),
    Models,
    Shape(Shape),
    Guidance(f64),
    Seed(String),
    SeedRandom,
    Resolution(ResolutionPreset),
    UpscaleModel(String),
    Random,
    Generate,
    Upscale {
        width: Option<u32>,
        height: Option<u32>,
        model: Option<String>,
    },
    Save,
    Copy,
    Status,
    Help,
    Quit,
}

impl ShellCommand {
    /// Parse a line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "prompt" => ShellCommand::Prompt(rest.to_string()),
            "negative" => ShellCommand::Negative(rest.to_string()),
            "model" if rest.is_empty() => return Err(CommandError::Usage("model <id>")),
            "model" => ShellCommand::Model(rest.to_string()),
            "models" => ShellCommand::Models,
            "shape" => ShellCommand::Shape(
                rest.parse()
                    .map_err(|_| ValidationError::UnknownShape(rest.to_string()))?,
            ),
            "guidance" => ShellCommand::Guidance(
                rest.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| ValidationError::InvalidGuidance(rest.to_string()))?,
            ),
            "seed" => ShellCommand::Seed(rest.to_string()),
            "seed-random" => ShellCommand::SeedRandom,
            "resolution" => ShellCommand::Resolution(rest.parse()?),
            "upscale-model" if rest.is_empty() => {
                return Err(CommandError::Usage("upscale-model <default|name>"))
            }
            "upscale-model" => ShellCommand::UpscaleModel(rest.to_string()),
            "random" => ShellCommand::Random,
            "generate" | "g" => ShellCommand::Generate,
            "upscale" => {
                let mut args = rest.split_whitespace();
                ShellCommand::Upscale {
                    width: args.next().and_then(|w| w.parse().ok()),
                    height: args.next().and_then(|h| h.parse().ok()),
                    model: args.next().map(str::to_string),
                }
            }
            "save" => ShellCommand::Save,
            "copy" => ShellCommand::Copy,
            "status" => ShellCommand::Status,
            "help" | "?" => ShellCommand::Help,
            "quit" | "exit" => ShellCommand::Quit,
            _ => return Err(CommandError::Unknown(name.to_string())),
        };
        Ok(Some(command))
    }
}

/// Human-readable line for a session event
pub fn describe_event(event: &SessionStateChanged) -> String {
    match event {
        SessionStateChanged::Generating => "Generating...".to_string(),
        SessionStateChanged::ImageReady { url, seed_label } => {
            format!("Image ready: {} (seed {})", url, seed_label)
        }
        SessionStateChanged::Upscaling => "Upscaling...".to_string(),
        SessionStateChanged::Upscaled { url, seed_label } => {
            format!("Upscaled: {} (seed {})", url, seed_label)
        }
        SessionStateChanged::Failed { user_message, .. } => format!("! {}", user_message),
        SessionStateChanged::ValidationRejected { user_message } => format!("! {}", user_message),
        SessionStateChanged::PromptRandomized {
            prompt,
            negative_prompt,
        } => format!("Prompt: {}\nNegative: {}", prompt, negative_prompt),
        SessionStateChanged::GpuStatus { indicator } => indicator.label(),
    }
}

pub struct Shell {
    studio: Arc<Studio>,
    generation: Option<JoinHandle<()>>,
}

impl Shell {
    pub fn new(studio: Arc<Studio>) -> Self {
        Self {
            studio,
            generation: None,
        }
    }

    /// Run until `quit` or end of input, then end the session
    pub async fn run(mut self) -> Result<(), Error> {
        let printer = self.spawn_event_printer();

        println!("{}", self.studio.on_load().await.render_text());
        println!("Type 'help' for commands.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            match ShellCommand::parse(&line) {
                Ok(Some(ShellCommand::Quit)) => break,
                Ok(Some(command)) => self.dispatch(command).await,
                Ok(None) => {}
                Err(e) => println!("{}", e),
            }
        }

        if let Some(pending) = self.generation.take() {
            info!("Waiting for the running generation to finish");
            if let Err(e) = pending.await {
                warn!("Generation task ended abnormally: {}", e);
            }
        }
        self.studio.shutdown();
        printer.abort();
        Ok(())
    }

    fn spawn_event_printer(&self) -> JoinHandle<()> {
        let mut events = self.studio.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => println!("{}", describe_event(&event)),
                    Err(RecvError::Lagged(n)) => warn!("Event printer lagged by {} events", n),
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    async fn dispatch(&mut self, command: ShellCommand) {
        let studio = &self.studio;
        match command {
            ShellCommand::Prompt(text) => studio.on_prompt(&text),
            ShellCommand::Negative(text) => studio.on_negative_prompt(&text),
            ShellCommand::Model(id) => {
                if studio.on_select_model(&id).is_ok() {
                    println!("Model: {}", id);
                }
            }
            ShellCommand::Models => println!("{}", studio.on_load().await.render_text()),
            ShellCommand::Shape(shape) => {
                studio.on_shape(shape);
                println!("Canvas: {}", shape.canvas_class());
            }
            ShellCommand::Guidance(value) => {
                studio.on_guidance(value);
                let params = studio.params();
                println!(
                    "Guidance: {} ({:.0}%)",
                    params.guidance_label(),
                    params.guidance_fill_percent()
                );
            }
            ShellCommand::Seed(input) => {
                studio.on_seed(&input);
                println!("Seed: {}", studio.params().seed());
            }
            ShellCommand::SeedRandom => {
                studio.on_seed_random();
                println!("Seed: random");
            }
            ShellCommand::Resolution(preset) => {
                // The GPU indicator is printed through the event stream
                studio.on_resolution_preset(preset).await;
                println!("Resolution: {}", studio.params().resolution_label());
            }
            ShellCommand::UpscaleModel(value) => match studio.on_upscale_model(&value) {
                Ok(true) => println!(
                    "Upscale model: {}",
                    studio.params().upscale_strategy().as_str()
                ),
                Ok(false) => println!("Upscaling is off; choose a resolution first."),
                Err(_) => {}
            },
            ShellCommand::Random => match studio.on_random_prompt().await {
                RandomPromptOutcome::Applied => {}
                RandomPromptOutcome::Busy => println!("A random prompt is already on its way."),
                RandomPromptOutcome::Failed => println!("Could not fetch a random prompt."),
            },
            ShellCommand::Generate => self.spawn_generation(),
            ShellCommand::Upscale {
                width,
                height,
                model,
            } => {
                let mut input = studio.upscale_defaults();
                if width.is_some() || height.is_some() {
                    input.width = width;
                    input.height = height;
                }
                if let Some(model) = model.as_deref().and_then(UpscaleModel::from_selection) {
                    input.model = model;
                }
                self.upscale(input).await;
            }
            ShellCommand::Save => match studio.on_download() {
                Ok(Some(path)) => println!("Saved {}", path.display()),
                Ok(None) => println!("Nothing to save yet."),
                Err(e) => println!("! {}", e.user_message()),
            },
            ShellCommand::Copy => match studio.on_copy() {
                Ok(true) => println!("Copied!"),
                Ok(false) => println!("Nothing to copy yet."),
                Err(e) => println!("! {}", e.user_message()),
            },
            ShellCommand::Status => self.print_status(),
            ShellCommand::Help => println!("{}", HELP),
            ShellCommand::Quit => {}
        }
    }

    fn spawn_generation(&mut self) {
        if let Some(pending) = &self.generation {
            if !pending.is_finished() {
                println!("A generation is already running.");
                return;
            }
        }
        let studio = self.studio.clone();
        self.generation = Some(tokio::spawn(async move {
            // Outcomes reach the user through session events
            if let Err(e) = studio.on_generate().await {
                debug!("Generation ended with error: {}", e);
            }
        }));
    }

    async fn upscale(&self, input: UpscaleInput) {
        match self.studio.on_upscale(input).await {
            Ok(UpscaleOutcome::NoImage) => println!("Generate an image first."),
            Ok(UpscaleOutcome::Superseded) => {
                println!("The image changed while upscaling; result discarded.")
            }
            Ok(UpscaleOutcome::Upscaled { .. }) => {}
            Err(e) => debug!("Upscale ended with error: {}", e),
        }
    }

    fn print_status(&self) {
        let studio = &self.studio;
        let params = studio.params();
        let status = studio.status();

        println!("Status:     {} ({})", status, status.tone());
        println!("Prompt:     {}", params.prompt());
        println!("Negative:   {}", params.negative_prompt());
        println!("Model:      {}", params.model());
        println!("Shape:      {}", params.shape());
        println!("Guidance:   {}", params.guidance_label());
        println!("Seed:       {}", params.seed());
        println!(
            "Resolution: {} (upscale {})",
            params.resolution_label(),
            params.upscale_strategy().as_str()
        );
        if let Some(indicator) = studio.last_gpu_indicator() {
            println!("GPU:        {}", indicator.label());
        }
        println!("Last seed:  {}", studio.seed_label());
    }
}
