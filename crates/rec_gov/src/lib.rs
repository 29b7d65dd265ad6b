//! # RecGov
//!
//! This crate provides a client for the recreation.gov month availability API
//! and a local index of RIDB campground ids, names and descriptions.

/// Client for the recreation.gov month availability endpoint.
mod availability_client;
pub use availability_client::*;

/// Error types for the availability client and the campground index.
mod error;
pub use error::*;

/// Campground id lookup and search over the RIDB facilities export.
mod facility_index;
pub use facility_index::*;

/// Download and unpacking of the RIDB facilities export.
mod ridb_export;
pub use ridb_export::*;

mod retry;
