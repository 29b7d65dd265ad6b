//! # Campground Scan
//!
//! This crate turns an arrival date and length of stay into availability
//! checks against recreation.gov, and runs the polling loop that pushes a
//! notification when a campsite opens up.

/// Types shared by the matcher and the polling loop
mod scan_types;
pub use scan_types::*;

/// Stay validation and the date strings derived from it
mod stay;
pub use stay::*;

/// Matching site availability against a stay
mod matcher;
pub use matcher::*;

/// Notification and `check` text
mod summary;
pub use summary::*;

/// Polling engine and the seams it depends on
mod executor;
pub use executor::*;

/// Pushsafer delivery for the polling engine
mod notification_service;
pub use notification_service::*;

/// recreation.gov implementations of the availability and name seams
mod rec_gov_client;
