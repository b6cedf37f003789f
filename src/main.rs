use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vcsa_maint::cli::{self, Cli};
use vcsa_maint::config;

/// Initialize tracing with output to stderr so stdout carries only results.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(cli::log_directives());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Before tracing and parsing, so RUST_LOG and the connection variables
    // from the file take effect
    let explicit = std::env::var_os(config::ENV_FILE_VAR).map(PathBuf::from);
    let loaded = config::load_env_file(explicit.as_deref());

    init_tracing();

    if let Some(path) = loaded? {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let cli = Cli::parse();
    let status = cli::execute(cli).await?;
    Ok(status.into())
}
