use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while talking to the recreation.gov availability API.
#[derive(Debug, Error)]
pub enum RecGovError {
    /// Network-level failure (connection reset, timeout, DNS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream did not recognise the campground id.
    #[error("{id} is not a valid campground id")]
    InvalidCampground {
        /// The campground id that was requested
        id: String,
    },

    /// The response body could not be decoded.
    #[error("failed to parse availability response for {context}: {source}")]
    Parse {
        /// What was being decoded
        context: String,
        /// Underlying decoder error
        #[source]
        source: serde_json::Error,
    },

    /// Rate limited by the upstream API.
    #[error("rate limited by recreation.gov")]
    RateLimited,

    /// Any other non-success HTTP status.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Client construction failed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RecGovError {
    /// Returns `true` for failures worth retrying after a delay.
    pub fn is_transient(&self) -> bool {
        matches!(self, RecGovError::Http(_) | RecGovError::RateLimited)
    }
}

/// Errors raised by the local campground index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The index file has not been built yet.
    #[error("no campground index at {}; try `campsite init`", path.display())]
    Missing {
        /// Where the index was expected
        path: PathBuf,
    },

    /// No campground with this id exists in the index.
    #[error("{id} is not a valid campground id")]
    NotFound {
        /// The campground id that was looked up
        id: String,
    },

    /// Descriptions were searched but the index was built without them.
    #[error("no descriptions in the campground index; try `campsite init --with-descriptions`")]
    NoDescriptions,

    /// Reading or writing the index failed.
    #[error("index IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A row in the index or the RIDB export could not be parsed.
    #[error("index CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The RIDB export could not be downloaded.
    #[error("RIDB download failed: {0}")]
    Download(#[from] reqwest::Error),

    /// The RIDB export server answered with a non-success status.
    #[error("RIDB download returned HTTP {status} from {url}")]
    DownloadStatus {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// The RIDB export is not a readable zip archive.
    #[error("RIDB archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The archive has no facilities table.
    #[error("RIDB archive has no Facilities_API_v1.csv")]
    MissingFacilities,
}
