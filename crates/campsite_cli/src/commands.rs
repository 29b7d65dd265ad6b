use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use campground_scan::{
    AvailabilitySource, CampgroundNames, PollOutcome, PollSession, PushsaferNotifier, ScanError,
    ScanExecutor, ScanExecutorConfig, StayRequest, check_line, combo_availability, combo_message,
    fetch_and_match,
};
use chrono::Local;
use notification_services::{
    Credentials, PushsaferClient, PushsaferConfig, read_credentials, write_credentials,
};
use rec_gov::{
    CampgroundIndex, IndexError, RecGovClient, RecGovConfig, campground_url,
    download_facilities_csv,
};
use validator::Validate;

use crate::config::{AppPaths, DaemonSettings};
use crate::prompt::{confirm, prompt_credentials};
use crate::{CheckArgs, DaemonArgs, InitArgs, PushsaferArgs, SearchArgs};

fn today() -> chrono::NaiveDate {
    Local::now().date_naive()
}

/// Stands in for the index when it has not been built yet, so each
/// campground reports the problem on its own line.
struct MissingIndex {
    path: PathBuf,
}

impl CampgroundNames for MissingIndex {
    fn lookup(&self, _campground_id: &str) -> Result<String, ScanError> {
        Err(ScanError::Index(IndexError::Missing {
            path: self.path.clone(),
        }))
    }
}

fn load_names(path: &Path) -> Result<Box<dyn CampgroundNames>> {
    match CampgroundIndex::load(path) {
        Ok(index) => Ok(Box::new(index)),
        Err(IndexError::Missing { path }) => {
            log::warn!("No campground index at {}, run `campsite init`", path.display());
            Ok(Box::new(MissingIndex { path }))
        }
        Err(e) => Err(e.into()),
    }
}

/// Print availability for each campground once.
pub async fn check(paths: &AppPaths, recgov: RecGovConfig, args: CheckArgs) -> Result<()> {
    let stay = StayRequest::parse(&args.stay.date, &args.stay.length, today())?;
    let names = load_names(&paths.index)?;
    let client = RecGovClient::new(recgov)?;

    write_check(&mut io::stdout(), &client, names.as_ref(), &stay, &args).await
}

async fn write_check<W: Write>(
    out: &mut W,
    source: &dyn AvailabilitySource,
    names: &dyn CampgroundNames,
    stay: &StayRequest,
    args: &CheckArgs,
) -> Result<()> {
    let mut reports = Vec::new();
    let mut display_names = BTreeMap::new();
    let mut per_campground = BTreeMap::new();

    for id in &args.stay.ids {
        match fetch_and_match(source, names, id, stay).await {
            Ok(report) => {
                if !args.json {
                    writeln!(out, " • {}", check_line(&report.name, &report.available_sites))?;
                    if args.url {
                        writeln!(out, "   {}", campground_url(id))?;
                    }
                }
                display_names.insert(report.campground_id.clone(), report.name.clone());
                per_campground.insert(report.campground_id.clone(), report.per_date.clone());
                reports.push(report);
            }
            Err(e) if args.json => log::error!("{}: {}", id, e),
            Err(e) => writeln!(out, " • {}", e)?,
        }
    }

    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&reports)?)?;
        return Ok(());
    }

    let any_contiguous = reports.iter().any(|r| !r.available_sites.is_empty());
    if args.combos && !any_contiguous && !reports.is_empty() {
        match combo_availability(&per_campground, stay.stay_dates()) {
            Some(combo) => writeln!(out, "{}", combo_message(&combo, &display_names))?,
            None => writeln!(out, "No combination of sites covers every night.")?,
        }
    }

    Ok(())
}

/// Poll in the foreground until the notification limit or Ctrl-C.
pub async fn daemon(paths: &AppPaths, recgov: RecGovConfig, args: DaemonArgs) -> Result<()> {
    let settings = DaemonSettings {
        interval_secs: args.interval,
        notify_limit: args.notify_limit,
        priority: args.priority,
        device: args.device.clone(),
        forever: args.forever,
    };
    settings.validate().context("Invalid daemon settings")?;

    let stay = StayRequest::parse(&args.stay.date, &args.stay.length, today())?;
    let index = CampgroundIndex::load(&paths.index)?;
    for id in &args.stay.ids {
        index.lookup(id).map_err(ScanError::from)?;
    }

    let pushsafer = PushsaferClient::new(PushsaferConfig {
        api_url: args.pushsafer.api_url.clone(),
        device: settings.device.clone(),
        priority: settings.priority,
        ..PushsaferConfig::default()
    })?;
    let credentials = resolve_credentials(paths, &args.pushsafer, &pushsafer).await?;

    let executor = ScanExecutor::new(
        Arc::new(RecGovClient::new(recgov)?),
        Arc::new(index),
        Arc::new(PushsaferNotifier::new(pushsafer, &credentials)),
        ScanExecutorConfig {
            interval: Duration::from_secs(settings.interval_secs),
            check_combos: args.combos,
            command: args.command.clone(),
            ..ScanExecutorConfig::default()
        },
    );

    let mut session = PollSession::new(args.stay.ids, stay, settings.limit());
    match executor.run(&mut session, shutdown_signal()).await {
        PollOutcome::LimitReached { sent } => {
            log::info!("🏁 Daemon finished after {} notification(s)", sent)
        }
        PollOutcome::Cancelled { sent } => {
            log::info!("👋 Daemon stopped after {} notification(s)", sent)
        }
    }

    Ok(())
}

/// Print `Name [id]` for campgrounds matching every term.
pub fn search(paths: &AppPaths, args: SearchArgs) -> Result<()> {
    let index = CampgroundIndex::load(&paths.index)?;
    let results = index.search(&args.terms, args.descriptions)?;

    if results.is_empty() {
        println!("No campgrounds match {}", args.terms.join(" "));
    }
    for (name, id) in results {
        println!("{} [{}]", name, id);
    }

    Ok(())
}

/// Build the campground index and optionally store Pushsafer credentials.
///
/// The RIDB export is downloaded unless `--facilities-csv` points at an
/// already extracted facilities table.
pub async fn init(paths: &AppPaths, args: InitArgs) -> Result<()> {
    let index = match &args.facilities_csv {
        Some(csv_path) => {
            let file = File::open(csv_path)
                .with_context(|| format!("Failed to open {}", csv_path.display()))?;
            CampgroundIndex::build_from_ridb(file, args.with_descriptions)?
        }
        None => {
            println!("Downloading {} (this can take a few minutes)", args.export_url);
            let timeout = Duration::from_secs(args.download_timeout);
            let csv = download_facilities_csv(&args.export_url, timeout).await?;
            CampgroundIndex::build_from_ridb(csv.as_slice(), args.with_descriptions)?
        }
    };

    index
        .write(&paths.index)
        .with_context(|| format!("Failed to write {}", paths.index.display()))?;
    println!(
        "Indexed {} campgrounds into {}",
        index.len(),
        paths.index.display()
    );

    if args.credentials {
        let client = PushsaferClient::new(PushsaferConfig {
            api_url: args.pushsafer.api_url.clone(),
            ..PushsaferConfig::default()
        })?;
        let credentials = prompt_credentials(&client).await?;
        write_credentials(&paths.credentials, &credentials)?;
        println!("Saved credentials to {}", paths.credentials.display());
    }

    Ok(())
}

/// Environment first, then the credential file, then the terminal.
///
/// Stored credentials are checked with Pushsafer before use; a rejected key
/// falls through to the prompt.
async fn resolve_credentials(
    paths: &AppPaths,
    args: &PushsaferArgs,
    client: &PushsaferClient,
) -> Result<Credentials> {
    if let Some(credentials) = stored_credentials(paths, args, client).await? {
        return Ok(credentials);
    }

    let credentials = prompt_credentials(client).await?;
    if confirm(&format!("Save credentials to {}?", paths.credentials.display()))? {
        write_credentials(&paths.credentials, &credentials)?;
    }
    Ok(credentials)
}

/// Credentials from the environment or the credential file, if Pushsafer
/// accepts them.
async fn stored_credentials(
    paths: &AppPaths,
    args: &PushsaferArgs,
    client: &PushsaferClient,
) -> Result<Option<Credentials>> {
    let env_pair = (&args.username, &args.api_key);
    let (credentials, origin) = if let (Some(username), Some(api_key)) = env_pair {
        let credentials = Credentials {
            username: username.clone(),
            api_key: api_key.clone(),
        };
        (credentials, "the environment".to_string())
    } else if paths.credentials.exists() {
        let credentials = read_credentials(&paths.credentials)
            .with_context(|| format!("Failed to read {}", paths.credentials.display()))?;
        (credentials, paths.credentials.display().to_string())
    } else {
        return Ok(None);
    };

    if client.validate_key(&credentials).await? {
        log::debug!("Using Pushsafer credentials from {}", origin);
        Ok(Some(credentials))
    } else {
        log::warn!("Pushsafer rejected the credentials from {}", origin);
        Ok(None)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
