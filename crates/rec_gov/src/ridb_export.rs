use std::io::{Cursor, Read, Seek};
use std::time::Duration;

use log::{debug, info};
use reqwest::Client;

use crate::error::IndexError;

/// Facilities table inside the RIDB export archive
pub const FACILITIES_CSV: &str = "Facilities_API_v1.csv";

/// Download the RIDB export zip and return the facilities CSV inside it.
///
/// The archive is held in memory; the facilities table is then copied out
/// so the caller can hand it to [`crate::CampgroundIndex::build_from_ridb`].
pub async fn download_facilities_csv(url: &str, timeout: Duration) -> Result<Vec<u8>, IndexError> {
    let client = Client::builder().timeout(timeout).build()?;

    info!("📥 Downloading RIDB export from {}", url);
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(IndexError::DownloadStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let archive = response.bytes().await?;
    debug!("Downloaded {} bytes", archive.len());

    extract_facilities_csv(Cursor::new(archive))
}

/// Copy `Facilities_API_v1.csv` out of a RIDB export archive.
///
/// The file may sit at the archive root or in a subdirectory.
pub fn extract_facilities_csv<R: Read + Seek>(archive: R) -> Result<Vec<u8>, IndexError> {
    let mut archive = zip::ZipArchive::new(archive)?;

    let name = archive
        .file_names()
        .find(|name| name.rsplit('/').next() == Some(FACILITIES_CSV))
        .map(str::to_string)
        .ok_or(IndexError::MissingFacilities)?;

    let mut facilities = archive.by_name(&name)?;
    let mut csv = Vec::with_capacity(facilities.size() as usize);
    facilities.read_to_end(&mut csv)?;

    info!("Extracted {} ({} bytes)", name, csv.len());
    Ok(csv)
}
