//! channel-gate CLI entry point.

mod cli;

use channel_gate::BotBuilder;
use clap::Parser;
use cli::Cli;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Build configuration
    let config = cli.into_config()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("channel-gate v{}", env!("CARGO_PKG_VERSION"));

    // Build and run the bot
    let mut bot = BotBuilder::new(config).build().await?;

    // Run until shutdown
    bot.run().await?;

    info!("Goodbye!");
    Ok(())
}
