mod cli;
mod commands;
mod display;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging();

    let settings = cli.config.settings();
    tracing::debug!(
        backend = %settings.backend,
        data_dir = %settings.data_dir.display(),
        "settings resolved"
    );
    commands::run(cli.command, settings).await
}

/// Logs go to stderr so command output on stdout stays clean.
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vninsights=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
