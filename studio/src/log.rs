use tracing_subscriber::EnvFilter;

/// Installs the global subscriber for the binary.
///
/// Logs go to stderr so they don't interleave with shell output. `log`
/// records from the library are captured as well.
///
/// Log level is Debug in development builds and Info in production builds;
/// `RUST_LOG` overrides it.
pub fn init() {
    let default_level = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "goblin_studio={default_level},goblin_blob={default_level},reqwest=warn,hyper=warn"
        ))
    });

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        log::debug!("Logger already installed");
    }
}
