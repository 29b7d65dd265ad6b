//! # Notification Services
//!
//! This crate delivers push notifications through Pushsafer and stores the
//! Pushsafer credentials on disk.

/// Reading and writing the owner-only credential file.
pub mod credentials;
/// Pushsafer API client.
pub mod service;
/// Types used by the notification client.
pub mod types;

pub use credentials::{read_credentials, write_credentials};
pub use service::PushsaferClient;
pub use types::{Credentials, NotificationError, PushMessage, PushsaferConfig, PushsaferStatus};
