//! Registry query entry point.
//!
//! Composition root: parses flags, merges the configuration file, wires
//! `tracing-subscriber` (JSON or human-readable, filtered by `RUST_LOG` or
//! the configured directives), then runs the selected query.

use clap::Parser;
use registry_cli::{run, CliConfig, LogFormat, LoggingConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();
    let config = cli.resolve()?;
    init_tracing(&config.logging)?;
    run(&config, &cli.command).await
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(logging.filter.as_deref().unwrap_or("warn"))?,
    };
    let json = logging.format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .try_init()?;
    Ok(())
}
