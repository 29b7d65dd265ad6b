use rec_gov::{CampgroundIndex, RecGovClient, SiteAvailabilityRecord};

use crate::executor::{AvailabilitySource, CampgroundNames};
use crate::scan_types::ScanError;

#[async_trait::async_trait]
impl AvailabilitySource for RecGovClient {
    async fn fetch_window(
        &self,
        campground_id: &str,
        request_window: &[String],
    ) -> Result<Vec<SiteAvailabilityRecord>, ScanError> {
        Ok(RecGovClient::fetch_window(self, campground_id, request_window).await?)
    }
}

impl CampgroundNames for CampgroundIndex {
    fn lookup(&self, campground_id: &str) -> Result<String, ScanError> {
        Ok(CampgroundIndex::lookup(self, campground_id)?)
    }
}
