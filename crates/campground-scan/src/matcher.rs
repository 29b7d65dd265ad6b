//! Deciding which campsites are free for a stay.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use rec_gov::SiteAvailabilityRecord;

use crate::scan_types::PerDateAvailability;

/// The only status that counts as bookable
pub const AVAILABLE: &str = "Available";

/// Night -> campground id -> sites free that night
pub type ComboAvailability = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Sites that are `Available` on every night of the stay.
///
/// A site can appear in several records when the stay crosses a month
/// boundary; its nights are merged by campsite key before checking.
/// Returns sorted, de-duplicated display ids.
pub fn available_sites(records: &[SiteAvailabilityRecord], stay_dates: &[String]) -> Vec<String> {
    let wanted: HashSet<&str> = stay_dates.iter().map(String::as_str).collect();
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut free_nights: HashMap<&str, (&str, HashSet<&str>)> = HashMap::new();
    for record in records {
        let (_, nights) = free_nights
            .entry(record.campsite_key.as_str())
            .or_insert_with(|| (record.site.as_str(), HashSet::new()));

        for &night in &wanted {
            if is_available(record, night) {
                nights.insert(night);
            }
        }
    }

    let sites: BTreeSet<&str> = free_nights
        .into_values()
        .filter(|(_, nights)| nights.len() == wanted.len())
        .map(|(site, _)| site)
        .collect();

    sites.into_iter().map(str::to_string).collect()
}

/// For each night of the stay, the sites free that night.
///
/// Every night is present as a key, with an empty list when nothing is free.
pub fn per_date_availability(
    records: &[SiteAvailabilityRecord],
    stay_dates: &[String],
) -> PerDateAvailability {
    stay_dates
        .iter()
        .map(|night| {
            let sites: BTreeSet<&str> = records
                .iter()
                .filter(|record| is_available(record, night))
                .map(|record| record.site.as_str())
                .collect();
            (night.clone(), sites.into_iter().map(str::to_string).collect())
        })
        .collect()
}

/// Combine per-night availability across campgrounds.
///
/// `per_campground` maps a campground id to its per-night availability.
/// Returns `None` unless every night has at least one free site somewhere.
pub fn combo_availability(
    per_campground: &BTreeMap<String, PerDateAvailability>,
    stay_dates: &[String],
) -> Option<ComboAvailability> {
    if stay_dates.is_empty() {
        return None;
    }

    let mut combo = ComboAvailability::new();
    for night in stay_dates {
        let free: BTreeMap<String, Vec<String>> = per_campground
            .iter()
            .filter_map(|(id, per_date)| {
                per_date
                    .get(night)
                    .filter(|sites| !sites.is_empty())
                    .map(|sites| (id.clone(), sites.clone()))
            })
            .collect();

        if free.is_empty() {
            return None;
        }
        combo.insert(night.clone(), free);
    }

    Some(combo)
}

fn is_available(record: &SiteAvailabilityRecord, night: &str) -> bool {
    record
        .availabilities
        .get(night)
        .is_some_and(|status| status == AVAILABLE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, site: &str, nights: &[(&str, &str)]) -> SiteAvailabilityRecord {
        SiteAvailabilityRecord {
            campsite_key: key.to_string(),
            site: site.to_string(),
            availabilities: nights
                .iter()
                .map(|(night, status)| (night.to_string(), status.to_string()))
                .collect(),
        }
    }

    fn nights(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    const JAN31: &str = "2022-01-31T00:00:00Z";
    const FEB01: &str = "2022-02-01T00:00:00Z";

    #[test]
    fn test_requires_every_night() {
        let records = vec![
            record("1", "001", &[(JAN31, "Available"), (FEB01, "Available")]),
            record("2", "002", &[(JAN31, "Available"), (FEB01, "Reserved")]),
            record("3", "003", &[(JAN31, "Available")]),
        ];

        assert_eq!(available_sites(&records, &nights(&[JAN31, FEB01])), vec!["001"]);
    }

    #[test]
    fn test_merges_months_by_key() {
        let records = vec![
            record("10", "010", &[(JAN31, "Available")]),
            record("20", "002", &[(JAN31, "Available")]),
            record("10", "010", &[(FEB01, "Available")]),
            record("20", "002", &[(FEB01, "Not Available")]),
        ];

        assert_eq!(available_sites(&records, &nights(&[JAN31, FEB01])), vec!["010"]);
    }

    #[test]
    fn test_only_exact_status_counts() {
        let records = vec![
            record("1", "001", &[(JAN31, "available")]),
            record("2", "002", &[(JAN31, "Open")]),
            record("3", "003", &[(JAN31, "Available ")]),
        ];

        assert!(available_sites(&records, &nights(&[JAN31])).is_empty());
    }

    #[test]
    fn test_sorted_and_deduplicated() {
        // two keys sharing a display id
        let records = vec![
            record("3", "B12", &[(JAN31, "Available")]),
            record("1", "A01", &[(JAN31, "Available")]),
            record("2", "B12", &[(JAN31, "Available")]),
        ];

        assert_eq!(available_sites(&records, &nights(&[JAN31])), vec!["A01", "B12"]);
    }

    #[test]
    fn test_per_date() {
        let records = vec![
            record("1", "001", &[(JAN31, "Available"), (FEB01, "Reserved")]),
            record("2", "002", &[(JAN31, "Reserved"), (FEB01, "Reserved")]),
        ];

        let per_date = per_date_availability(&records, &nights(&[JAN31, FEB01]));
        assert_eq!(per_date[JAN31], vec!["001"]);
        assert!(per_date[FEB01].is_empty());
    }

    #[test]
    fn test_combo_needs_every_night() {
        let mut per_campground = BTreeMap::new();
        per_campground.insert(
            "Laguna".to_string(),
            BTreeMap::from([
                (JAN31.to_string(), vec!["001".to_string()]),
                (FEB01.to_string(), vec![]),
            ]),
        );
        per_campground.insert(
            "Burnt Rancheria".to_string(),
            BTreeMap::from([
                (JAN31.to_string(), vec![]),
                (FEB01.to_string(), vec!["104".to_string()]),
            ]),
        );

        let stay = nights(&[JAN31, FEB01]);
        let combo = combo_availability(&per_campground, &stay).unwrap();
        assert_eq!(combo[JAN31]["Laguna"], vec!["001"]);
        assert_eq!(combo[FEB01]["Burnt Rancheria"], vec!["104"]);
        assert!(!combo[JAN31].contains_key("Burnt Rancheria"));

        per_campground.remove("Burnt Rancheria");
        assert!(combo_availability(&per_campground, &stay).is_none());
    }
}
