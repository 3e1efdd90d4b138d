use crate::config::cli::{Args, ThrottleArgs};
use crate::error::{CriticError, Result};
use crate::metacritic::Throttle;
use clap::Parser;
use reqwest::Client;
use std::time::Duration;
use tracing::info;

pub(crate) mod cli;

/// Metacritic answers default agents with 403 Forbidden.
pub const USER_AGENT: &str = "Mac Firefox";

pub struct Config {
    pub args: Args,
    pub http_client: Client,
}

impl Config {
    pub fn new() -> Result<Self> {
        let args = Args::parse();

        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { args, http_client })
    }

    pub fn ensure_directories(&self) -> Result<()> {
        if !self.args.data_dir.exists() {
            std::fs::create_dir_all(&self.args.data_dir)?;
        }

        info!("Data dir {} exists", self.args.data_dir.display());
        Ok(())
    }
}

impl TryFrom<&ThrottleArgs> for Throttle {
    type Error = CriticError;

    fn try_from(args: &ThrottleArgs) -> Result<Self> {
        if !(args.delay_min >= 0.0 && args.delay_min <= args.delay_max) {
            return Err(CriticError::Other(format!(
                "Invalid delay range: {}..{}",
                args.delay_min, args.delay_max
            )));
        }

        Ok(Self {
            delay_min: args.delay_min,
            delay_max: args.delay_max,
            max_retries: args.max_retries,
            block_cooldown: Duration::from_secs(args.block_cooldown),
        })
    }
}
