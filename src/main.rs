mod commands;
mod config;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "deadline-reminder")]
#[command(about = "Keep a plain-text deadline list in sync with a Google calendar")]
struct Cli {
    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show open deadlines, overdue first
    List {
        /// Only show deadlines within this many days
        #[arg(short, long)]
        days: Option<i64>,
    },
    /// Mark deadlines as done by their number in `list`
    Done {
        #[arg(required = true)]
        numbers: Vec<usize>,
    },
    /// Run one sync pass against the calendar
    Sync,
    /// Sync periodically until interrupted
    Watch {
        #[arg(short, long, default_value_t = 15)]
        interval_minutes: u64,
    },
    /// Show sync state and local file status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_config()?,
    };

    match cli.command {
        Commands::List { days } => commands::list::run(&cfg, days),
        Commands::Done { numbers } => commands::done::run(&cfg, &numbers),
        Commands::Sync => commands::sync::run(&cfg).await,
        Commands::Watch { interval_minutes } => commands::watch::run(&cfg, interval_minutes).await,
        Commands::Status => commands::status::run(&cfg),
    }
}
