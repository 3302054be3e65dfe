//! Command-line interface definitions for the agro dashboard poller.
//!
//! All arguments can be provided via command-line flags or environment variables.

use crate::fetcher::DEFAULT_FEED_ENDPOINT;
use crate::scheduler::ScheduleConfig;
use crate::translate::{DEFAULT_LANGPAIR, DEFAULT_TRANSLATE_ENDPOINT};
use clap::Parser;
use std::time::Duration;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Poll forever, writing dashboard.json every render
/// agro_pulse -j ./out
///
/// # One staggered cycle, JSON and Markdown, custom sources
/// agro_pulse -j ./out -m ./md -c sources.yaml --once
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for dashboard.json
    #[arg(short, long, env = "AGRO_JSON_DIR")]
    pub json_output_dir: String,

    /// Output directory for dashboard.md
    #[arg(short, long, env = "AGRO_MARKDOWN_DIR")]
    pub markdown_output_dir: Option<String>,

    /// YAML file overriding feed URLs and canned articles per category
    #[arg(short = 'c', long, env = "AGRO_SOURCES")]
    pub sources: Option<String>,

    /// Feed-to-JSON conversion endpoint
    #[arg(long, env = "AGRO_FEED_ENDPOINT", default_value = DEFAULT_FEED_ENDPOINT)]
    pub feed_endpoint: String,

    /// Translation endpoint
    #[arg(long, env = "AGRO_TRANSLATE_ENDPOINT", default_value = DEFAULT_TRANSLATE_ENDPOINT)]
    pub translate_endpoint: String,

    /// Translation language pair, `source|target`
    #[arg(long, default_value = DEFAULT_LANGPAIR)]
    pub langpair: String,

    /// Seconds between two refreshes of the same category
    #[arg(long, default_value_t = 60)]
    pub interval_secs: u64,

    /// Start delay added per category, in milliseconds
    #[arg(long, default_value_t = 1500)]
    pub stagger_ms: u64,

    /// Run a single staggered cycle and exit
    #[arg(long)]
    pub once: bool,
}

impl Cli {
    pub fn schedule(&self) -> ScheduleConfig {
        ScheduleConfig {
            interval: Duration::from_secs(self.interval_secs.max(1)),
            stagger: Duration::from_millis(self.stagger_ms),
        }
    }
}
