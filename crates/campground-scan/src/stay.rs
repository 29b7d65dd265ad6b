//! Arrival date and length of stay, and the date strings derived from them.

use std::sync::OnceLock;

use chrono::{Datelike, Days, Months, NaiveDate};

use crate::scan_types::ScanError;

/// Input formats accepted for the arrival date, tried in order
const ARRIVAL_FORMATS: [&str; 2] = ["%m-%d-%Y", "%Y-%m-%d"];

/// A validated stay: at least one night, arriving today or later.
///
/// The request window and night list are computed on first use.
#[derive(Debug, Clone)]
pub struct StayRequest {
    arrival: NaiveDate,
    nights: u32,
    last_night: NaiveDate,
    request_window: OnceLock<Vec<String>>,
    stay_dates: OnceLock<Vec<String>>,
}

impl StayRequest {
    /// Builds a stay, rejecting past arrivals and empty stays.
    pub fn new(arrival: NaiveDate, nights: u32, today: NaiveDate) -> Result<Self, ScanError> {
        if nights == 0 {
            return Err(ScanError::Validation(
                "length of stay must be at least one night".to_string(),
            ));
        }

        if arrival < today {
            return Err(ScanError::Validation(format!(
                "\"{}\" is not a future date",
                arrival.format("%m-%d-%Y")
            )));
        }

        let last_night = arrival
            .checked_add_days(Days::new(u64::from(nights - 1)))
            .ok_or_else(|| ScanError::Validation(format!("a {} night stay is too long", nights)))?;

        Ok(Self {
            arrival,
            nights,
            last_night,
            request_window: OnceLock::new(),
            stay_dates: OnceLock::new(),
        })
    }

    /// Builds a stay from command-line text: `mm-dd-yyyy` (or `yyyy-mm-dd`)
    /// and a positive number of nights.
    pub fn parse(date_text: &str, length_text: &str, today: NaiveDate) -> Result<Self, ScanError> {
        let arrival = parse_arrival_date(date_text)?;
        let nights = parse_length_of_stay(length_text)?;
        Self::new(arrival, nights, today)
    }

    /// First night of the stay
    pub fn arrival(&self) -> NaiveDate {
        self.arrival
    }

    /// Number of nights
    pub fn nights(&self) -> u32 {
        self.nights
    }

    /// The morning the stay ends
    pub fn departure(&self) -> NaiveDate {
        self.last_night.succ_opt().unwrap_or(self.last_night)
    }

    /// Month-start timestamps covering every night of the stay, in order.
    ///
    /// The last entry is the month of the final night, so a stay ending on
    /// the morning of the 1st does not fetch the following month.
    pub fn request_window(&self) -> &[String] {
        self.request_window.get_or_init(|| {
            let end = first_of_month(self.last_night);
            let mut month = first_of_month(self.arrival);
            let mut window = Vec::new();

            while month <= end {
                window.push(month.format("%Y-%m-01T00:00:00.000Z").to_string());
                match month.checked_add_months(Months::new(1)) {
                    Some(next) => month = next,
                    None => break,
                }
            }

            window
        })
    }

    /// One timestamp per night, keyed the way the availability API keys them.
    pub fn stay_dates(&self) -> &[String] {
        self.stay_dates.get_or_init(|| {
            self.arrival
                .iter_days()
                .take(self.nights as usize)
                .map(|night| night.format("%Y-%m-%dT00:00:00Z").to_string())
                .collect()
        })
    }
}

/// Parses an arrival date given as `mm-dd-yyyy` or `yyyy-mm-dd`.
pub fn parse_arrival_date(text: &str) -> Result<NaiveDate, ScanError> {
    let text = text.trim();
    ARRIVAL_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .ok_or_else(|| {
            ScanError::Validation(format!(
                "\"{}\" is not a valid date of the form mm-dd-yyyy",
                text
            ))
        })
}

/// Parses a length of stay; zero and non-numbers are rejected.
pub fn parse_length_of_stay(text: &str) -> Result<u32, ScanError> {
    match text.trim().parse::<u32>() {
        Ok(nights) if nights > 0 => Ok(nights),
        _ => Err(ScanError::Validation(format!(
            "\"{}\" is not a valid length of stay",
            text.trim()
        ))),
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}
