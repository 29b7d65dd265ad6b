use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use notification_services::{NotificationError, PushMessage, PushsaferStatus};
use rec_gov::{SiteAvailabilityRecord, campground_url};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::matcher::{available_sites, combo_availability, per_date_availability};
use crate::scan_types::*;
use crate::stay::StayRequest;
use crate::summary::{availability_message, combo_message};

/// Source of per-site availability for a campground
#[async_trait::async_trait]
pub trait AvailabilitySource: Send + Sync {
    /// Per-site records for every month in `request_window`, in order.
    async fn fetch_window(
        &self,
        campground_id: &str,
        request_window: &[String],
    ) -> Result<Vec<SiteAvailabilityRecord>, ScanError>;
}

/// Resolves campground ids to display names
pub trait CampgroundNames: Send + Sync {
    /// Display name for `campground_id`, or a not-found error.
    fn lookup(&self, campground_id: &str) -> Result<String, ScanError>;
}

/// Trait for push notification delivery
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message and return the provider's verdict.
    async fn notify(&self, message: &PushMessage) -> Result<PushsaferStatus, NotificationError>;
}

/// Timing and reporting options for [`ScanExecutor`]
#[derive(Debug, Clone)]
pub struct ScanExecutorConfig {
    /// Sleep between polling cycles (default: 5 minutes)
    pub interval: Duration,

    /// Pause between campgrounds within a cycle (default: 1 second)
    pub campground_delay: Duration,

    /// Report per-night combinations when no single site is free (default: false)
    pub check_combos: bool,

    /// Attach the booking page when one campground is reported (default: true)
    pub campground_links: bool,

    /// Shell command run whenever a notification is triggered (default: none)
    pub command: Option<String>,
}

impl Default for ScanExecutorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
            campground_delay: Duration::from_secs(1),
            check_combos: false,
            campground_links: true,
            command: None,
        }
    }
}

/// What a single pass over the session's campgrounds found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// At least one campground has a site free for the whole stay
    FoundAvailable {
        /// One line per campground with free sites
        message: PushMessage,
    },
    /// The stay can be covered by moving between sites
    ComboFound {
        /// Free sites for each night
        message: PushMessage,
    },
    /// Nothing worth reporting
    NoneFound,
}

/// Why the polling loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The notification limit was used up
    LimitReached {
        /// Notification attempts made
        sent: u32,
    },
    /// The shutdown signal fired
    Cancelled {
        /// Notification attempts made
        sent: u32,
    },
}

/// Check one campground whose name is already known.
pub async fn check_named(
    source: &dyn AvailabilitySource,
    campground_id: &str,
    name: String,
    stay: &StayRequest,
) -> Result<AvailabilityReport, ScanError> {
    let records = source
        .fetch_window(campground_id, stay.request_window())
        .await?;
    debug!(
        "{} ({}): {} site records for {} month(s)",
        name,
        campground_id,
        records.len(),
        stay.request_window().len()
    );

    Ok(AvailabilityReport {
        campground_id: campground_id.to_string(),
        name,
        available_sites: available_sites(&records, stay.stay_dates()),
        per_date: per_date_availability(&records, stay.stay_dates()),
        checked_at: Utc::now(),
    })
}

/// Look up a campground's name, fetch its availability and match the stay.
pub async fn fetch_and_match(
    source: &dyn AvailabilitySource,
    names: &dyn CampgroundNames,
    campground_id: &str,
    stay: &StayRequest,
) -> Result<AvailabilityReport, ScanError> {
    let name = names.lookup(campground_id)?;
    check_named(source, campground_id, name, stay).await
}

/// Polling engine for a single stay across a list of campgrounds
pub struct ScanExecutor {
    source: Arc<dyn AvailabilitySource>,
    names: Arc<dyn CampgroundNames>,
    notifier: Arc<dyn Notifier>,
    config: ScanExecutorConfig,
}

impl ScanExecutor {
    /// Wire the executor to its availability source, name lookup and notifier.
    pub fn new(
        source: Arc<dyn AvailabilitySource>,
        names: Arc<dyn CampgroundNames>,
        notifier: Arc<dyn Notifier>,
        config: ScanExecutorConfig,
    ) -> Self {
        Self {
            source,
            names,
            notifier,
            config,
        }
    }

    /// Poll until the notification limit is used up or `shutdown` resolves.
    pub async fn run<F>(&self, session: &mut PollSession, shutdown: F) -> PollOutcome
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            "🏕️ Watching {} campground(s) for {} night(s), {} to {}",
            session.campgrounds.len(),
            session.stay.nights(),
            session.stay.arrival().format("%m/%d/%Y"),
            session.stay.departure().format("%m/%d/%Y")
        );

        loop {
            let sent = session.notifications_sent;
            let outcome = tokio::select! {
                outcome = self.run_cycle(session) => outcome,
                _ = &mut shutdown => {
                    info!("🛑 Shutdown requested during a check, stopping");
                    return PollOutcome::Cancelled { sent };
                }
            };

            match outcome {
                CycleOutcome::FoundAvailable { message } | CycleOutcome::ComboFound { message } => {
                    self.deliver(&message).await;
                    if let Some(command) = &self.config.command {
                        run_command(command, &message.text);
                    }
                    session.notifications_sent += 1;
                }
                CycleOutcome::NoneFound => {}
            }

            if let NotifyLimit::Count(limit) = session.notify_limit {
                info!("📬 Notifications sent: {}/{}", session.notifications_sent, limit);
                if session.limit_reached() {
                    info!("✅ Notification limit reached, exiting");
                    return PollOutcome::LimitReached {
                        sent: session.notifications_sent,
                    };
                }
            }

            debug!("Sleeping {:?} until the next check", self.config.interval);
            tokio::select! {
                _ = sleep(self.config.interval) => {}
                _ = &mut shutdown => {
                    info!("🛑 Shutdown requested, stopping");
                    return PollOutcome::Cancelled {
                        sent: session.notifications_sent,
                    };
                }
            }
        }
    }

    /// Check every campground once and decide what, if anything, to report.
    pub async fn run_cycle(&self, session: &mut PollSession) -> CycleOutcome {
        info!("------------checking------------");

        // keyed by id: two campgrounds may share a display name
        let mut found: Vec<(String, String, Vec<String>)> = Vec::new();
        let mut names: BTreeMap<String, String> = BTreeMap::new();
        let mut per_campground: BTreeMap<String, PerDateAvailability> = BTreeMap::new();

        let stay = &session.stay;
        let count = session.campgrounds.len();

        for (index, campground) in session.campgrounds.iter_mut().enumerate() {
            match self.check(campground, stay).await {
                Ok(report) => {
                    if report.available_sites.is_empty() {
                        info!("{} - no available site(s)", report.name);
                    } else {
                        info!(
                            "🎉 {} - {} site(s) available",
                            report.name,
                            report.available_sites.len()
                        );
                        found.push((
                            report.campground_id.clone(),
                            report.name.clone(),
                            report.available_sites.clone(),
                        ));
                    }
                    names.insert(report.campground_id.clone(), report.name.clone());
                    per_campground.insert(report.campground_id.clone(), report.per_date.clone());
                    campground.availability = Availability::Checked(report);
                }
                Err(e) if e.is_transient() => {
                    warn!("Campground {} unavailable, will retry next cycle: {}", campground.id, e);
                    campground.availability = Availability::Failed(e.to_string());
                }
                Err(e) => {
                    error!("Failed to check campground {}: {}", campground.id, e);
                    campground.availability = Availability::Failed(e.to_string());
                }
            }

            if index + 1 < count && !self.config.campground_delay.is_zero() {
                sleep(self.config.campground_delay).await;
            }
        }

        if let Some((first_id, _, _)) = found.first() {
            let lines: Vec<(String, Vec<String>)> = found
                .iter()
                .map(|(_, name, sites)| (name.clone(), sites.clone()))
                .collect();
            let mut message = PushMessage::text(availability_message(&lines));
            if self.config.campground_links && found.len() == 1 {
                message.url = Some(campground_url(first_id));
            }
            return CycleOutcome::FoundAvailable { message };
        }

        if self.config.check_combos {
            if let Some(combo) = combo_availability(&per_campground, stay.stay_dates()) {
                info!("🔀 Stay can be covered by switching sites");
                return CycleOutcome::ComboFound {
                    message: PushMessage::text(combo_message(&combo, &names)),
                };
            }
        }

        CycleOutcome::NoneFound
    }

    async fn check(
        &self,
        campground: &mut Campground,
        stay: &StayRequest,
    ) -> Result<AvailabilityReport, ScanError> {
        let name = match &campground.name {
            Some(name) => name.clone(),
            None => {
                let name = self.names.lookup(&campground.id)?;
                campground.name = Some(name.clone());
                name
            }
        };

        check_named(self.source.as_ref(), &campground.id, name, stay).await
    }

    async fn deliver(&self, message: &PushMessage) {
        match self.notifier.notify(message).await {
            Ok(status) if status.is_success() => info!("📱 Notification delivered: {}", status),
            Ok(status) => warn!("❌ Notification rejected: {}", status),
            Err(e) => error!("Failed to send notification: {}", e),
        }
    }
}

/// Start `command` through the shell without waiting on it.
///
/// The notification text is passed in `CAMPSITE_MESSAGE`. The exit status is
/// logged from a background task.
fn run_command(command: &str, message: &str) {
    let spawned = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .env("CAMPSITE_MESSAGE", message)
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            error!("Failed to start command `{}`: {}", command, e);
            return;
        }
    };

    info!("▶️ Started command `{}`", command);
    let command = command.to_string();
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) if status.success() => debug!("Command `{}` finished", command),
            Ok(status) => warn!("Command `{}` exited with {}", command, status),
            Err(e) => error!("Failed to wait on command `{}`: {}", command, e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::NaiveDate;
    use rec_gov::RecGovError;

    const NIGHT1: &str = "2022-01-29T00:00:00Z";
    const NIGHT2: &str = "2022-01-30T00:00:00Z";

    fn record(site: &str, nights: &[(&str, &str)]) -> SiteAvailabilityRecord {
        SiteAvailabilityRecord {
            campsite_key: format!("key-{}", site),
            site: site.to_string(),
            availabilities: nights
                .iter()
                .map(|(night, status)| (night.to_string(), status.to_string()))
                .collect(),
        }
    }

    fn two_night_stay() -> StayRequest {
        let today = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        StayRequest::new(NaiveDate::from_ymd_opt(2022, 1, 29).unwrap(), 2, today).unwrap()
    }

    #[derive(Default)]
    struct FakeSource {
        sites: HashMap<String, Vec<SiteAvailabilityRecord>>,
        failing: HashSet<String>,
        calls: AtomicU32,
    }

    impl FakeSource {
        fn with(mut self, id: &str, records: Vec<SiteAvailabilityRecord>) -> Self {
            self.sites.insert(id.to_string(), records);
            self
        }

        fn failing(mut self, id: &str) -> Self {
            self.failing.insert(id.to_string());
            self
        }
    }

    #[async_trait::async_trait]
    impl AvailabilitySource for FakeSource {
        async fn fetch_window(
            &self,
            campground_id: &str,
            _request_window: &[String],
        ) -> Result<Vec<SiteAvailabilityRecord>, ScanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(campground_id) {
                return Err(RecGovError::RateLimited.into());
            }
            self.sites.get(campground_id).cloned().ok_or_else(|| {
                RecGovError::InvalidCampground {
                    id: campground_id.to_string(),
                }
                .into()
            })
        }
    }

    #[derive(Default)]
    struct FakeNames {
        lookups: AtomicU32,
    }

    impl CampgroundNames for FakeNames {
        fn lookup(&self, campground_id: &str) -> Result<String, ScanError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(format!("Campground {}", campground_id))
        }
    }

    #[derive(Default)]
    struct FakeNotifier {
        fail: bool,
        messages: Mutex<Vec<PushMessage>>,
    }

    #[async_trait::async_trait]
    impl Notifier for FakeNotifier {
        async fn notify(&self, message: &PushMessage) -> Result<PushsaferStatus, NotificationError> {
            self.messages.lock().unwrap().push(message.clone());
            if self.fail {
                return Err(NotificationError::UnexpectedStatus(500));
            }
            Ok(serde_json::from_str(r#"{"status":1}"#).unwrap())
        }
    }

    fn fast_config() -> ScanExecutorConfig {
        ScanExecutorConfig {
            interval: Duration::ZERO,
            campground_delay: Duration::ZERO,
            ..ScanExecutorConfig::default()
        }
    }

    fn executor(
        source: Arc<FakeSource>,
        names: Arc<FakeNames>,
        notifier: Arc<FakeNotifier>,
        config: ScanExecutorConfig,
    ) -> ScanExecutor {
        ScanExecutor::new(source, names, notifier, config)
    }

    fn open_site(site: &str) -> SiteAvailabilityRecord {
        record(site, &[(NIGHT1, "Available"), (NIGHT2, "Available")])
    }

    #[tokio::test]
    async fn test_stops_exactly_at_limit() {
        let source = Arc::new(FakeSource::default().with("1", vec![open_site("001")]));
        let notifier = Arc::new(FakeNotifier::default());
        let scan = executor(source.clone(), Arc::default(), notifier.clone(), fast_config());

        let mut session = PollSession::new(["1"], two_night_stay(), NotifyLimit::Count(3));
        let outcome = scan.run(&mut session, std::future::pending()).await;

        assert_eq!(outcome, PollOutcome::LimitReached { sent: 3 });
        assert_eq!(notifier.messages.lock().unwrap().len(), 3);
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_one_notification_per_cycle() {
        let source = Arc::new(
            FakeSource::default()
                .with("1", vec![open_site("001")])
                .with("2", vec![open_site("104"), open_site("105")]),
        );
        let notifier = Arc::new(FakeNotifier::default());
        let scan = executor(source, Arc::default(), notifier.clone(), fast_config());

        let mut session = PollSession::new(["1", "2"], two_night_stay(), NotifyLimit::Count(1));
        let outcome = scan.run(&mut session, std::future::pending()).await;

        assert_eq!(outcome, PollOutcome::LimitReached { sent: 1 });
        let messages = notifier.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].text,
            "Campground 1: site(s) 001 available!\nCampground 2: site(s) 104, 105 available!"
        );
        // two campgrounds, so no single booking link
        assert!(messages[0].url.is_none());
    }

    #[tokio::test]
    async fn test_single_campground_gets_link() {
        let source = Arc::new(FakeSource::default().with("232279", vec![open_site("001")]));
        let scan = executor(source, Arc::default(), Arc::default(), fast_config());

        let mut session = PollSession::new(["232279"], two_night_stay(), NotifyLimit::Count(1));
        match scan.run_cycle(&mut session).await {
            CycleOutcome::FoundAvailable { message } => assert_eq!(
                message.url.as_deref(),
                Some("https://www.recreation.gov/camping/campgrounds/232279/availability")
            ),
            other => panic!("expected availability, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_campground_is_skipped() {
        let source = Arc::new(
            FakeSource::default()
                .failing("1")
                .with("2", vec![open_site("007")]),
        );
        let scan = executor(source, Arc::default(), Arc::default(), fast_config());

        let mut session = PollSession::new(["1", "2", "999"], two_night_stay(), NotifyLimit::Count(1));
        let outcome = scan.run_cycle(&mut session).await;

        match outcome {
            CycleOutcome::FoundAvailable { message } => {
                assert_eq!(message.text, "Campground 2: site(s) 007 available!")
            }
            other => panic!("expected availability, got {:?}", other),
        }

        let campgrounds = session.campgrounds();
        assert!(matches!(campgrounds[0].availability, Availability::Failed(_)));
        assert_eq!(campgrounds[1].available_sites(), Some(&["007".to_string()][..]));
        assert!(matches!(campgrounds[2].availability, Availability::Failed(_)));
    }

    #[tokio::test]
    async fn test_failed_delivery_still_counts() {
        let source = Arc::new(FakeSource::default().with("1", vec![open_site("001")]));
        let notifier = Arc::new(FakeNotifier {
            fail: true,
            ..FakeNotifier::default()
        });
        let scan = executor(source, Arc::default(), notifier.clone(), fast_config());

        let mut session = PollSession::new(["1"], two_night_stay(), NotifyLimit::Count(2));
        let outcome = scan.run(&mut session, std::future::pending()).await;

        assert_eq!(outcome, PollOutcome::LimitReached { sent: 2 });
        assert_eq!(notifier.messages.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_combo_only_when_enabled() {
        let source = Arc::new(
            FakeSource::default()
                .with("1", vec![record("001", &[(NIGHT1, "Available"), (NIGHT2, "Reserved")])])
                .with("2", vec![record("104", &[(NIGHT1, "Reserved"), (NIGHT2, "Available")])]),
        );

        let plain = executor(source.clone(), Arc::default(), Arc::default(), fast_config());
        let mut session = PollSession::new(["1", "2"], two_night_stay(), NotifyLimit::Count(1));
        assert_eq!(plain.run_cycle(&mut session).await, CycleOutcome::NoneFound);

        let combos = executor(
            source,
            Arc::default(),
            Arc::default(),
            ScanExecutorConfig {
                check_combos: true,
                ..fast_config()
            },
        );
        match combos.run_cycle(&mut session).await {
            CycleOutcome::ComboFound { message } => {
                assert!(message.text.contains("Campground 1 site(s) 001"));
                assert!(message.text.contains("Campground 2 site(s) 104"));
            }
            other => panic!("expected a combination, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_contiguous_site_beats_combo() {
        let source = Arc::new(
            FakeSource::default()
                .with("1", vec![open_site("001")])
                .with("2", vec![record("104", &[(NIGHT1, "Available")])]),
        );
        let scan = executor(
            source,
            Arc::default(),
            Arc::default(),
            ScanExecutorConfig {
                check_combos: true,
                ..fast_config()
            },
        );

        let mut session = PollSession::new(["1", "2"], two_night_stay(), NotifyLimit::Count(1));
        assert!(matches!(
            scan.run_cycle(&mut session).await,
            CycleOutcome::FoundAvailable { .. }
        ));
    }

    #[tokio::test]
    async fn test_names_resolved_once() {
        let source = Arc::new(FakeSource::default().with("1", vec![open_site("001")]));
        let names = Arc::new(FakeNames::default());
        let scan = executor(source, names.clone(), Arc::default(), fast_config());

        let mut session = PollSession::new(["1"], two_night_stay(), NotifyLimit::Count(3));
        scan.run(&mut session, std::future::pending()).await;

        assert_eq!(names.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(session.campgrounds()[0].name.as_deref(), Some("Campground 1"));
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_sleep() {
        let source = Arc::new(FakeSource::default().with("1", vec![]));
        let scan = executor(
            source,
            Arc::default(),
            Arc::default(),
            ScanExecutorConfig {
                interval: Duration::from_secs(3600),
                ..fast_config()
            },
        );

        let mut session = PollSession::new(["1"], two_night_stay(), NotifyLimit::Unlimited);
        let shutdown = sleep(Duration::from_millis(50));
        let outcome = tokio::time::timeout(Duration::from_secs(5), scan.run(&mut session, shutdown))
            .await
            .expect("shutdown should stop the loop");

        assert_eq!(outcome, PollOutcome::Cancelled { sent: 0 });
    }

    struct SharedNames;

    impl CampgroundNames for SharedNames {
        fn lookup(&self, _campground_id: &str) -> Result<String, ScanError> {
            Ok("Lakeside".to_string())
        }
    }

    #[tokio::test]
    async fn test_campgrounds_sharing_a_name_both_reported() {
        let source = Arc::new(
            FakeSource::default()
                .with("1", vec![open_site("001")])
                .with("2", vec![open_site("104")]),
        );
        let scan = ScanExecutor::new(
            source,
            Arc::new(SharedNames),
            Arc::new(FakeNotifier::default()),
            fast_config(),
        );

        let mut session = PollSession::new(["1", "2"], two_night_stay(), NotifyLimit::Count(1));
        match scan.run_cycle(&mut session).await {
            CycleOutcome::FoundAvailable { message } => {
                assert_eq!(
                    message.text,
                    "Lakeside: site(s) 001 available!\nLakeside: site(s) 104 available!"
                );
                assert!(message.url.is_none());
            }
            other => panic!("expected availability, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_combo_keeps_same_named_campgrounds_apart() {
        let source = Arc::new(
            FakeSource::default()
                .with("1", vec![record("001", &[(NIGHT1, "Available"), (NIGHT2, "Reserved")])])
                .with("2", vec![record("104", &[(NIGHT1, "Reserved"), (NIGHT2, "Available")])]),
        );
        let scan = ScanExecutor::new(
            source,
            Arc::new(SharedNames),
            Arc::new(FakeNotifier::default()),
            ScanExecutorConfig {
                check_combos: true,
                ..fast_config()
            },
        );

        let mut session = PollSession::new(["1", "2"], two_night_stay(), NotifyLimit::Count(1));
        match scan.run_cycle(&mut session).await {
            CycleOutcome::ComboFound { message } => {
                assert!(message.text.contains("Sat 01/29: Lakeside site(s) 001"));
                assert!(message.text.contains("Sun 01/30: Lakeside site(s) 104"));
            }
            other => panic!("expected a combination, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_runs_when_notifying() {
        let marker = std::env::temp_dir().join(format!("campsite-command-{}", std::process::id()));
        let _ = std::fs::remove_file(&marker);

        let source = Arc::new(FakeSource::default().with("1", vec![open_site("001")]));
        let scan = executor(
            source,
            Arc::default(),
            Arc::default(),
            ScanExecutorConfig {
                command: Some(format!("printf '%s' \"$CAMPSITE_MESSAGE\" > {}", marker.display())),
                ..fast_config()
            },
        );

        let mut session = PollSession::new(["1"], two_night_stay(), NotifyLimit::Count(1));
        scan.run(&mut session, std::future::pending()).await;

        let mut written = String::new();
        for _ in 0..50 {
            if let Ok(content) = std::fs::read_to_string(&marker) {
                if !content.is_empty() {
                    written = content;
                    break;
                }
            }
            sleep(Duration::from_millis(20)).await;
        }
        let _ = std::fs::remove_file(&marker);

        assert_eq!(written, "Campground 1: site(s) 001 available!");
    }

    #[tokio::test]
    async fn test_fetch_and_match_reports_unknown_id() {
        let source = FakeSource::default();
        let names = FakeNames::default();

        let err = fetch_and_match(&source, &names, "999999", &two_night_stay())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
