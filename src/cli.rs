use std::path::PathBuf;

use clap::Parser;

use crate::settings::SETTINGS_FILE;

#[derive(Parser, Debug)]
#[command(name = "slack-history-mail")]
#[command(about = "Mail the Slack history of every conversation a bot can see")]
#[command(version)]
pub struct Cli {
    /// File containing the Slack bot token
    #[arg(value_name = "CREDENTIALS_FILE")]
    pub credentials: PathBuf,

    /// Day to export (YYYY-MM-DD), or `today` / `week`
    #[arg(value_name = "DATE")]
    pub date: String,

    /// Sender address
    #[arg(value_name = "FROM")]
    pub from: String,

    /// Recipient address
    #[arg(value_name = "TO")]
    pub to: String,

    /// Settings file path
    #[arg(short, long, default_value = SETTINGS_FILE)]
    pub config: PathBuf,

    /// Write messages as .eml files into this directory instead of sending them
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Also write the fetched histories as JSON to this path
    #[arg(long)]
    pub dump_json: Option<PathBuf>,

    /// Log every fetched page
    #[arg(short, long)]
    pub verbose: bool,
}
