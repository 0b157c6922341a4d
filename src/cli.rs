use std::path::PathBuf;

use clap::Parser;

use okurimail::config::DEFAULT_CONFIG_PATH;

/// Okurimail - paced sponsorship outreach over SMTP
#[derive(Parser, Debug)]
#[command(name = "okurimail")]
#[command(about = "Send templated sponsorship emails to every pending contact in a CSV ledger")]
#[command(version)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Contact ledger to read and update (overrides the config file)
    #[arg(short, long)]
    pub ledger: Option<PathBuf>,

    /// Directory holding the per-category templates (overrides the config file)
    #[arg(short, long)]
    pub templates: Option<PathBuf>,

    /// Build every pending message and log it without sending.
    ///
    /// The ledger is left untouched and no pacing delays are applied.
    #[arg(long)]
    pub dry_run: bool,
}
