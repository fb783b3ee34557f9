pub mod catalog;
pub mod clients;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod log;
pub mod params;
pub mod session;
pub mod shell;
pub mod studio;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use ::log::{error, info};

pub use error::Error;
pub use studio::Studio;

/// Load settings, connect to the backend and run the interactive shell.
pub async fn run() -> Result<(), Error> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();
    log::init();

    info!("Goblin Studio v{}", env!("CARGO_PKG_VERSION"));

    let store = config::JsonFileStore::open(config::JsonFileStore::default_path()?)?;
    let client_config = config::load_client_config(&store).inspect_err(|e| {
        error!("Invalid configuration: {}", e);
    })?;

    let studio = Arc::new(Studio::connect(&client_config)?);
    shell::Shell::new(studio).run().await
}
