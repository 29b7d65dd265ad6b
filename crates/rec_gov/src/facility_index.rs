use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use log::{debug, info, warn};

use crate::error::IndexError;

/// Where RIDB publishes the full facilities export.
pub const RIDB_EXPORT_URL: &str = "https://ridb.recreation.gov/downloads/RIDBFullExport_V1_CSV.zip";

const CAMPGROUND_PAGE_URL: &str = "https://www.recreation.gov/camping/campgrounds";

// Regex for stripping markup out of facility descriptions
lazy_static::lazy_static! {
    static ref HTML_TAG: regex::Regex = regex::Regex::new(r"<.*?>").unwrap();
}

/// A campground row in the local index. Text is stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// RIDB facility id, which is also the availability API campground id
    pub id: String,
    /// Lowercase facility name
    pub name: String,
    /// Lowercase facility description with HTML removed, when indexed
    pub description: Option<String>,
}

/// Local campground id/name index built from the RIDB facilities export
#[derive(Debug, Clone, Default)]
pub struct CampgroundIndex {
    entries: Vec<IndexEntry>,
}

impl CampgroundIndex {
    /// Build an index from entries, sorting them by name.
    pub fn from_entries(mut entries: Vec<IndexEntry>) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Self { entries }
    }

    /// Load an index file written by [`CampgroundIndex::write`].
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        if !path.exists() {
            return Err(IndexError::Missing {
                path: path.to_path_buf(),
            });
        }

        debug!("Loading campground index from {}", path.display());
        Self::from_reader(File::open(path)?)
    }

    /// Read index rows (`id,name[,description]`) from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, IndexError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut entries = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let (Some(id), Some(name)) = (record.get(0), record.get(1)) else {
                warn!("Skipping malformed index row: {:?}", record);
                continue;
            };
            // an unquoted comma in a name shifts every later column
            if record.len() > 3 {
                warn!("Skipping index row with {} fields: {:?}", record.len(), record);
                continue;
            }

            entries.push(IndexEntry {
                id: id.to_string(),
                name: name.to_lowercase(),
                description: record.get(2).map(str::to_lowercase),
            });
        }

        Ok(Self::from_entries(entries))
    }

    /// Build the index from the RIDB `Facilities_API_v1.csv` export.
    ///
    /// Only reservable campgrounds with a non-empty name are kept.
    pub fn build_from_ridb<R: Read>(
        facilities_csv: R,
        with_descriptions: bool,
    ) -> Result<Self, IndexError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(facilities_csv);

        let headers = csv_reader.headers()?.clone();
        let column = |name: &str, fallback: usize| {
            headers.iter().position(|h| h == name).unwrap_or(fallback)
        };
        let id_col = column("FacilityID", 0);
        let name_col = column("FacilityName", 5);
        let description_col = column("FacilityDescription", 6);
        let type_col = column("FacilityTypeDescription", 7);
        let reservable_col = column("Reservable", 19);

        let mut entries = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let field = |i: usize| record.get(i).unwrap_or("");

            if field(type_col) != "Campground"
                || field(reservable_col) != "true"
                || field(name_col).is_empty()
            {
                continue;
            }

            entries.push(IndexEntry {
                id: field(id_col).to_string(),
                name: field(name_col).to_lowercase(),
                description: with_descriptions
                    .then(|| strip_html(field(description_col)).to_lowercase()),
            });
        }

        info!("Indexed {} reservable campgrounds", entries.len());
        Ok(Self::from_entries(entries))
    }

    /// Write the index to `path`, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), IndexError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path)?;

        for entry in &self.entries {
            match &entry.description {
                Some(description) => {
                    writer.write_record([&entry.id, &entry.name, description])?
                }
                None => writer.write_record([&entry.id, &entry.name])?,
            }
        }
        writer.flush()?;

        Ok(())
    }

    /// Number of campgrounds in the index
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no campgrounds
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether every row carries a description
    pub fn has_descriptions(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(|e| e.description.is_some())
    }

    /// Resolve a campground id to its display name.
    pub fn lookup(&self, id: &str) -> Result<String, IndexError> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| title_case(&entry.name))
            .ok_or_else(|| IndexError::NotFound { id: id.to_string() })
    }

    /// Find campgrounds whose name (or description) contains every term.
    ///
    /// Matching ignores case. Results are `(name, id)` in alphabetical order.
    pub fn search(
        &self,
        terms: &[String],
        descriptions: bool,
    ) -> Result<Vec<(String, String)>, IndexError> {
        if descriptions && !self.has_descriptions() {
            return Err(IndexError::NoDescriptions);
        }
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let terms: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();

        let results = self
            .entries
            .iter()
            .filter(|entry| {
                let haystack = if descriptions {
                    entry.description.as_deref().unwrap_or("")
                } else {
                    entry.name.as_str()
                };
                terms.iter().all(|term| haystack.contains(term.as_str()))
            })
            .map(|entry| (title_case(&entry.name), entry.id.clone()))
            .collect();

        Ok(results)
    }
}

/// Booking page for a campground
pub fn campground_url(id: &str) -> String {
    format!("{}/{}/availability", CAMPGROUND_PAGE_URL, id)
}

/// Remove anything that looks like an HTML tag.
pub fn strip_html(raw: &str) -> String {
    HTML_TAG.replace_all(raw, "").into_owned()
}

/// Capitalise the first letter of every word; a word starts after any non-letter.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_is_letter = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }

    out
}
