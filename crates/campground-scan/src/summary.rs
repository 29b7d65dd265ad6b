//! Text rendered for notifications and for `check` output.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::matcher::ComboAvailability;

/// Above this many sites a campground is summarised by count
pub const SITE_LIST_LIMIT: usize = 12;

/// One notification line per campground with availability, in the order
/// given.
///
/// `found` pairs a display name with its sites. Campgrounds with no sites
/// are left out; an empty string means nothing to report.
pub fn availability_message(found: &[(String, Vec<String>)]) -> String {
    found
        .iter()
        .filter(|(_, sites)| !sites.is_empty())
        .map(|(name, sites)| format!("{}: {} available!", name, describe_sites(sites)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Notification text for a stay that needs more than one site.
///
/// `combo` is keyed by campground id; `names` maps ids to display names.
pub fn combo_message(combo: &ComboAvailability, names: &BTreeMap<String, String>) -> String {
    let mut lines = vec!["No single site is free for the whole stay. Free by night:".to_string()];

    for (night, campgrounds) in combo {
        let free = campgrounds
            .iter()
            .map(|(id, sites)| {
                let name = names.get(id).map(String::as_str).unwrap_or(id);
                format!("{} {}", name, describe_sites(sites))
            })
            .collect::<Vec<_>>()
            .join("; ");
        lines.push(format!("{}: {}", night_label(night), free));
    }

    lines.join("\n")
}

/// One line of `check` output.
pub fn check_line(name: &str, sites: &[String]) -> String {
    if sites.is_empty() {
        format!("{}: no sites available", name)
    } else {
        format!("{}: {} available", name, describe_sites(sites))
    }
}

fn describe_sites(sites: &[String]) -> String {
    if sites.len() > SITE_LIST_LIMIT {
        format!("{} sites", sites.len())
    } else {
        format!("site(s) {}", sites.join(", "))
    }
}

/// `2022-01-29T00:00:00Z` becomes `Sat 01/29`.
fn night_label(night: &str) -> String {
    night
        .get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .map(|day| day.format("%a %m/%d").to_string())
        .unwrap_or_else(|| night.to_string())
}
