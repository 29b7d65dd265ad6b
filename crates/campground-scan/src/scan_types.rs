use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rec_gov::{IndexError, RecGovError};
use serde::Serialize;

use crate::stay::StayRequest;

/// Sites free on each night of a stay, keyed by the night's timestamp
pub type PerDateAvailability = BTreeMap<String, Vec<String>>;

/// Result of checking one campground for one stay
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityReport {
    /// Campground id
    pub campground_id: String,
    /// Display name from the campground index
    pub name: String,
    /// Sites free on every night of the stay, sorted
    pub available_sites: Vec<String>,
    /// Sites free on each individual night
    pub per_date: PerDateAvailability,
    /// When the check completed
    pub checked_at: DateTime<Utc>,
}

/// Whether a campground has been checked yet, and what came back
#[derive(Debug, Clone, Default)]
pub enum Availability {
    /// No check has run
    #[default]
    NotChecked,
    /// The last check succeeded
    Checked(AvailabilityReport),
    /// The last check failed with this error
    Failed(String),
}

/// A campground tracked by a poll session
#[derive(Debug, Clone)]
pub struct Campground {
    /// Campground id
    pub id: String,
    /// Display name, resolved once and then reused
    pub name: Option<String>,
    /// Outcome of the most recent check
    pub availability: Availability,
}

impl Campground {
    /// A campground that has not been looked up or checked.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            availability: Availability::NotChecked,
        }
    }

    /// Contiguously available sites from the last successful check.
    pub fn available_sites(&self) -> Option<&[String]> {
        match &self.availability {
            Availability::Checked(report) => Some(&report.available_sites),
            _ => None,
        }
    }
}

/// How many notifications a daemon may send before it exits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLimit {
    /// Stop after this many notification attempts
    Count(u32),
    /// Keep polling until the process is stopped
    Unlimited,
}

/// State carried across cycles of the polling daemon
#[derive(Debug, Clone)]
pub struct PollSession {
    pub(crate) campgrounds: Vec<Campground>,
    pub(crate) stay: StayRequest,
    pub(crate) notify_limit: NotifyLimit,
    pub(crate) notifications_sent: u32,
}

impl PollSession {
    /// Start a session. Repeated ids are checked once.
    pub fn new<I, S>(campground_ids: I, stay: StayRequest, notify_limit: NotifyLimit) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut campgrounds: Vec<Campground> = Vec::new();
        for id in campground_ids {
            let id = id.into();
            if !campgrounds.iter().any(|c| c.id == id) {
                campgrounds.push(Campground::new(id));
            }
        }

        Self {
            campgrounds,
            stay,
            notify_limit,
            notifications_sent: 0,
        }
    }

    /// Campgrounds in the order they are checked
    pub fn campgrounds(&self) -> &[Campground] {
        &self.campgrounds
    }

    /// Notification attempts so far
    pub fn notifications_sent(&self) -> u32 {
        self.notifications_sent
    }

    /// Whether the session has used up its notifications.
    pub fn limit_reached(&self) -> bool {
        match self.notify_limit {
            NotifyLimit::Count(limit) => self.notifications_sent >= limit,
            NotifyLimit::Unlimited => false,
        }
    }
}

/// Custom error type for scan operations
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Campground not found, locally or upstream
    #[error("{0} is not a valid campground id")]
    CampgroundNotFound(String),

    /// The local campground index could not be used
    #[error("Campground index error: {0}")]
    Index(IndexError),

    /// Availability API error
    #[error("API error: {0}")]
    Api(RecGovError),
}

impl ScanError {
    /// Whether retrying later might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ScanError::Api(e) if e.is_transient())
    }

    /// Whether the campground id is unknown, or cannot be looked up
    /// because no index has been built.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ScanError::CampgroundNotFound(_) | ScanError::Index(IndexError::Missing { .. })
        )
    }
}

impl From<RecGovError> for ScanError {
    fn from(error: RecGovError) -> Self {
        match error {
            RecGovError::InvalidCampground { id } => ScanError::CampgroundNotFound(id),
            other => ScanError::Api(other),
        }
    }
}

impl From<IndexError> for ScanError {
    fn from(error: IndexError) -> Self {
        match error {
            IndexError::NotFound { id } => ScanError::CampgroundNotFound(id),
            other => ScanError::Index(other),
        }
    }
}
