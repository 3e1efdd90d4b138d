use crate::metacritic::Platform;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Directory to store scraped output
    #[arg(long, default_value = "data", global = true)]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the first user reviews page URL for a game
    Url {
        #[arg(long, default_value = "pc")]
        platform: Platform,
        /// Game name as it appears in Metacritic URLs, e.g. cyberpunk-2077
        #[arg(long)]
        game: String,
    },
    /// Scrape user reviews of a game
    Reviews {
        #[arg(long, default_value = "pc")]
        platform: Platform,
        #[arg(long)]
        game: String,
        /// Stop after this many review pages
        #[arg(long)]
        max_pages: Option<usize>,
        /// Output file for basic users (defaults to a timestamped file in the data dir).
        /// With --profiles, users go to `<stem>_users.txt` beside it
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also scrape every reviewer's profile page
        #[arg(long)]
        profiles: bool,
        #[command(flatten)]
        throttle: ThrottleArgs,
    },
    /// Scrape profile pages for users listed in a basic users file
    Profiles {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        throttle: ThrottleArgs,
    },
    /// Print the credibility-weighted rating of a users file
    Rate {
        #[arg(long)]
        input: PathBuf,
    },
    /// Import spells from a 5e.tools spells JSON file
    Spells {
        #[arg(long)]
        file: PathBuf,
        /// Print as JSON instead of debug output
        #[arg(long)]
        json: bool,
        /// Write pretty JSON to this file instead of printing
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Import race spell data from a 5e.tools races JSON file
    Races {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Roll a dice formula like 2d6+3
    Roll {
        formula: String,
        /// Print only the total
        #[arg(long)]
        total: bool,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ThrottleArgs {
    /// Lower bound of the random delay between requests, in seconds
    #[arg(long, default_value_t = 0.03)]
    pub delay_min: f64,

    /// Upper bound of the random delay between requests, in seconds
    #[arg(long, default_value_t = 10.0)]
    pub delay_max: f64,

    /// How many times a blocked request is retried
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// Seconds to wait after being blocked
    #[arg(long, default_value_t = 60)]
    pub block_cooldown: u64,
}
