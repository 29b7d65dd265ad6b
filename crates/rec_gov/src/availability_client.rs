use std::collections::HashMap;
use std::time::Duration;

use log::{debug, warn};
use rand::seq::IndexedRandom;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use serde::Deserialize;

use crate::error::RecGovError;
use crate::retry::retry_with_backoff;

const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// Settings for [`RecGovClient`]
#[derive(Debug, Clone)]
pub struct RecGovConfig {
    /// Base URL of the recreation.gov internal API
    pub base_url: String,

    /// Per-request timeout (default: 30 seconds)
    pub timeout: Duration,

    /// User agents to pick from at random for each request
    pub user_agents: Vec<String>,

    /// Extra attempts for transient failures (default: 2)
    pub max_retries: u32,

    /// Base of the exponential retry backoff, in seconds (default: 2)
    pub backoff_base_secs: u64,
}

impl Default for RecGovConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.recreation.gov/api".to_string(),
            timeout: Duration::from_secs(30),
            user_agents: vec![
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.1; rv:120.0) Gecko/20100101 Firefox/120.0".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15".to_string(),
            ],
            max_retries: 2,
            backoff_base_secs: 2,
        }
    }
}

/// One campsite's per-night statuses from a single month response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteAvailabilityRecord {
    /// Upstream internal campsite key
    pub campsite_key: String,
    /// Display id of the site, e.g. "023"
    pub site: String,
    /// Night (`YYYY-MM-DDT00:00:00Z`) to status, e.g. "Available" or "Reserved"
    pub availabilities: HashMap<String, String>,
}

/// Response structure from the month availability endpoint
#[derive(Debug, Deserialize)]
pub struct MonthAvailabilityResponse {
    /// Missing when the campground id is unknown
    pub campsites: Option<HashMap<String, CampsiteAvailabilityData>>,
}

/// Campsite availability data from the month endpoint
#[derive(Debug, Deserialize)]
pub struct CampsiteAvailabilityData {
    /// Night to status; absent for sites with no inventory that month
    #[serde(default)]
    pub availabilities: HashMap<String, String>,
    /// Display id of the site
    pub site: Option<String>,
}

/// Client for the recreation.gov month availability endpoint
pub struct RecGovClient {
    client: Client,
    config: RecGovConfig,
}

impl RecGovClient {
    /// Create a new availability client
    pub fn new(config: RecGovConfig) -> Result<Self, RecGovError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RecGovError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Fetch every month in `request_window` for one campground, in order.
    pub async fn fetch_window(
        &self,
        campground_id: &str,
        request_window: &[String],
    ) -> Result<Vec<SiteAvailabilityRecord>, RecGovError> {
        let mut records = Vec::new();
        for start_date in request_window {
            records.extend(self.fetch_month(campground_id, start_date).await?);
        }
        Ok(records)
    }

    /// Fetch one month of availability.
    ///
    /// `start_date` must be the first of the month in the
    /// `YYYY-MM-01T00:00:00.000Z` form the endpoint expects.
    pub async fn fetch_month(
        &self,
        campground_id: &str,
        start_date: &str,
    ) -> Result<Vec<SiteAvailabilityRecord>, RecGovError> {
        retry_with_backoff(self.config.max_retries, self.config.backoff_base_secs, || {
            self.request_month(campground_id, start_date)
        })
        .await
    }

    async fn request_month(
        &self,
        campground_id: &str,
        start_date: &str,
    ) -> Result<Vec<SiteAvailabilityRecord>, RecGovError> {
        let url = format!(
            "{}/camps/availability/campground/{}/month",
            self.config.base_url, campground_id
        );

        debug!("Making request to: {}?start_date={}", url, start_date);

        let response = self
            .client
            .get(&url)
            .query(&[("start_date", start_date)])
            .header(USER_AGENT, self.pick_user_agent())
            .send()
            .await?;

        let status = response.status();
        debug!("API response status: {}", status);

        if !status.is_success() {
            warn!("Availability request for {} failed with status {}", campground_id, status);

            return Err(match status.as_u16() {
                404 => RecGovError::InvalidCampground {
                    id: campground_id.to_string(),
                },
                429 => RecGovError::RateLimited,
                code => RecGovError::UnexpectedStatus { status: code, url },
            });
        }

        let body = response.text().await?;
        parse_month_response(campground_id, &body)
    }

    fn pick_user_agent(&self) -> String {
        self.config
            .user_agents
            .choose(&mut rand::rng())
            .cloned()
            .unwrap_or_else(|| FALLBACK_USER_AGENT.to_string())
    }
}

/// Decode a month response body into per-site records sorted by campsite key.
///
/// A body without a `campsites` object means the id is not a campground.
pub fn parse_month_response(
    campground_id: &str,
    body: &str,
) -> Result<Vec<SiteAvailabilityRecord>, RecGovError> {
    let response: MonthAvailabilityResponse =
        serde_json::from_str(body).map_err(|source| RecGovError::Parse {
            context: format!("campground {}", campground_id),
            source,
        })?;

    let campsites = response
        .campsites
        .ok_or_else(|| RecGovError::InvalidCampground {
            id: campground_id.to_string(),
        })?;

    let mut records: Vec<SiteAvailabilityRecord> = campsites
        .into_iter()
        .map(|(key, data)| SiteAvailabilityRecord {
            site: data.site.unwrap_or_else(|| key.clone()),
            campsite_key: key,
            availabilities: data.availabilities,
        })
        .collect();

    records.sort_by(|a, b| a.campsite_key.cmp(&b.campsite_key));
    Ok(records)
}
