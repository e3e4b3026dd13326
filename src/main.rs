mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so answers on stdout stay clean
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();
    let env_file = cli.env_file.as_deref();

    match cli.command {
        cli::Commands::Import { source } => {
            commands::import::run(env_file, source.as_deref()).await?
        }
        cli::Commands::Query {
            text,
            reasoning,
            import_data,
        } => commands::query::run(env_file, &text, &reasoning, import_data).await?,
        cli::Commands::Chat { reasoning } => commands::chat::run(env_file, &reasoning).await?,
    }

    Ok(())
}
