//! Command line entry point for the campsite availability checker.
//! Checks recreation.gov campgrounds once, or polls them and pushes a
//! Pushsafer notification when a site opens up.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rec_gov::RecGovConfig;

mod commands;
mod config;
mod prompt;

use config::AppPaths;

#[derive(Debug, Parser)]
#[command(name = "campsite")]
#[command(about = "Check recreation.gov campgrounds for open campsites")]
struct Cli {
    /// Directory holding the campground index
    #[arg(long, env = "CAMPSITE_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Campground index file, overriding --data-dir
    #[arg(long, env = "CAMPSITE_INDEX", global = true)]
    index: Option<PathBuf>,

    /// Base URL of the recreation.gov API
    #[arg(
        long,
        env = "RECGOV_BASE_URL",
        default_value = "https://www.recreation.gov/api",
        global = true
    )]
    recgov_url: String,

    /// Request timeout for recreation.gov, in seconds
    #[arg(long, default_value_t = 30, global = true)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check campgrounds once and print what is free
    Check(CheckArgs),
    /// Poll campgrounds and send a push notification when sites open up
    Daemon(DaemonArgs),
    /// Find campground ids by name
    Search(SearchArgs),
    /// Build the campground index and store Pushsafer credentials
    Init(InitArgs),
}

/// Arrival, length of stay and the campgrounds to check
#[derive(Debug, Args)]
struct StayArgs {
    /// Arrival date, mm-dd-yyyy
    date: String,

    /// Length of stay in nights
    length: String,

    /// Campground ids
    #[arg(required = true)]
    ids: Vec<String>,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[command(flatten)]
    stay: StayArgs,

    /// Print the booking page of each campground
    #[arg(long)]
    url: bool,

    /// Show per-night options when no single site is free
    #[arg(long)]
    combos: bool,

    /// Print the reports as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct PushsaferArgs {
    /// Base URL of the Pushsafer API
    #[arg(long, env = "PUSHSAFER_API_URL", default_value = "https://www.pushsafer.com")]
    api_url: String,

    /// Pushsafer username or email
    #[arg(long, env = "PUSHSAFER_USERNAME", hide_env_values = true)]
    username: Option<String>,

    /// Pushsafer private key
    #[arg(long, env = "PUSHSAFER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[derive(Debug, Args)]
struct DaemonArgs {
    #[command(flatten)]
    stay: StayArgs,

    /// Exit after this many notifications
    #[arg(long, default_value_t = 3)]
    notify_limit: u32,

    /// Seconds between checks
    #[arg(long, default_value_t = 300)]
    interval: u64,

    /// Never stop on a notification limit
    #[arg(long)]
    forever: bool,

    /// Notify when the stay can be covered by switching sites
    #[arg(long)]
    combos: bool,

    /// Pushsafer device or group id
    #[arg(long, default_value = "a")]
    device: String,

    /// Pushsafer priority, -2 to 2
    #[arg(long, allow_negative_numbers = true)]
    priority: Option<i8>,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Shell command to run whenever a notification is triggered; the
    /// message is passed in CAMPSITE_MESSAGE
    #[arg(long)]
    command: Option<String>,

    #[command(flatten)]
    pushsafer: PushsaferArgs,
}

#[derive(Debug, Args)]
struct SearchArgs {
    /// Words that must all appear in the name
    #[arg(required = true)]
    terms: Vec<String>,

    /// Search descriptions instead of names
    #[arg(long)]
    descriptions: bool,
}

#[derive(Debug, Args)]
struct InitArgs {
    /// Use an extracted Facilities_API_v1.csv instead of downloading
    #[arg(long)]
    facilities_csv: Option<PathBuf>,

    /// Where to download the RIDB export from
    #[arg(long, default_value = rec_gov::RIDB_EXPORT_URL)]
    export_url: String,

    /// Download timeout for the RIDB export, in seconds
    #[arg(long, default_value_t = 600)]
    download_timeout: u64,

    /// Keep facility descriptions for `search --descriptions`
    #[arg(long)]
    with_descriptions: bool,

    /// Prompt for Pushsafer credentials and save them
    #[arg(long)]
    credentials: bool,

    #[command(flatten)]
    pushsafer: PushsaferArgs,
}

fn init_logging(default_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::new().default_filter_or(default_filter));

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Daemon(args) => init_logging("info", args.log_file.as_deref())?,
        _ => init_logging("warn", None)?,
    }

    let paths = AppPaths::resolve(cli.data_dir, cli.index)?;
    let recgov = RecGovConfig {
        base_url: cli.recgov_url.trim_end_matches('/').to_string(),
        timeout: Duration::from_secs(cli.timeout),
        ..RecGovConfig::default()
    };

    match cli.command {
        Commands::Check(args) => commands::check(&paths, recgov, args).await,
        Commands::Daemon(args) => {
            log::info!("🚀 Starting campsite daemon...");
            commands::daemon(&paths, recgov, args).await
        }
        Commands::Search(args) => commands::search(&paths, args),
        Commands::Init(args) => commands::init(&paths, args).await,
    }
}
