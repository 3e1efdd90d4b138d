use crate::config::Config;
use crate::error::{CriticError, Result};
use crate::processor::Processor;
use tracing::info;

mod config;
mod dnd;
mod error;
mod metacritic;
mod processor;
mod storage;
mod utils;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::new()?;

    let level: tracing::Level = config.args.log_level.parse().map_err(|_| {
        CriticError::Other(format!("Invalid log level: {}", config.args.log_level))
    })?;
    tracing_subscriber::fmt().with_max_level(level).init();

    let processor = Processor::new(config);
    processor.run().await?;

    info!("Completed successfully!");
    Ok(())
}
