//! CSV-backed reference geography table.
//!
//! The table holds one row per geography (`fips,name,population,area_sq_mi`)
//! and is loaded once at startup. Containment queries rely on FIPS codes
//! nesting by prefix: a county code starts with its state code, a block
//! group code with its tract code, and so on.

use std::collections::BTreeMap;
use std::path::Path;

use ej_api_geography_models::{
    GeographyRecord, Granularity, NameResolution, fips, normalize_code,
};
use serde::Deserialize;

use crate::{GeoError, GeographyLookup};

#[derive(Debug, Deserialize)]
struct CsvRow {
    fips: String,
    name: String,
    population: Option<u64>,
    area_sq_mi: Option<f64>,
}

/// In-memory geography reference table.
#[derive(Debug, Default)]
pub struct ReferenceTables {
    records: BTreeMap<String, GeographyRecord>,
    /// Lowercased display name -> code. `None` marks a name shared by
    /// more than one geography.
    names: BTreeMap<String, Option<String>>,
}

impl ReferenceTables {
    /// Creates an empty table. Every lookup against it misses.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads the table from a CSV file with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the file cannot be read or a row is
    /// malformed.
    pub fn load(path: &Path) -> Result<Self, GeoError> {
        let file = std::fs::File::open(path)?;
        let tables = Self::from_reader(file)?;
        log::info!(
            "Loaded {} reference geographies from {}",
            tables.len(),
            path.display()
        );
        Ok(tables)
    }

    /// Parses the table from any CSV source with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if a row is malformed.
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, GeoError> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let mut records = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            let row = row?;
            records.push(GeographyRecord {
                fips: row.fips,
                name: row.name,
                population: row.population,
                area_sq_mi: row.area_sq_mi,
            });
        }

        Ok(Self::from_records(records))
    }

    /// Builds the table from already-parsed records.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = GeographyRecord>) -> Self {
        let mut tables = Self::empty();

        for mut record in records {
            record.fips = normalize_code(&record.fips);
            if record.fips.is_empty() {
                continue;
            }

            let key = record.name.trim().to_lowercase();
            if !key.is_empty() {
                tables
                    .names
                    .entry(key)
                    .and_modify(|existing| {
                        if existing.as_deref() != Some(record.fips.as_str()) {
                            *existing = None;
                        }
                    })
                    .or_insert_with(|| Some(record.fips.clone()));
            }

            tables.records.insert(record.fips.clone(), record);
        }

        tables
    }

    /// Number of geographies in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl GeographyLookup for ReferenceTables {
    fn name_to_code(&self, area: &str) -> NameResolution {
        let trimmed = area.trim();

        if trimmed.len() == 2
            && trimmed.bytes().all(|b| b.is_ascii_alphabetic())
            && let Some(state) = fips::by_abbr(trimmed)
        {
            return NameResolution::Resolved(state.fips.to_string());
        }

        if let Some(state) = fips::by_name(trimmed) {
            return NameResolution::Resolved(state.fips.to_string());
        }

        match self.names.get(&trimmed.to_lowercase()) {
            Some(Some(code)) => NameResolution::Resolved(code.clone()),
            Some(None) => {
                log::debug!("Place name {trimmed:?} is ambiguous; treating it as a code");
                NameResolution::NotAName(area.to_string())
            }
            None => NameResolution::NotAName(area.to_string()),
        }
    }

    fn record(&self, fips: &str) -> Option<&GeographyRecord> {
        self.records.get(fips)
    }

    fn codes_within(&self, parent: &str, level: Granularity) -> Vec<String> {
        let Some(len) = level.code_len() else {
            return Vec::new();
        };

        let parent_level = Granularity::classify(parent);
        if parent_level == Granularity::Nation {
            return self
                .records
                .keys()
                .filter(|code| code.len() == len)
                .cloned()
                .collect();
        }
        if !parent_level.contains(level) {
            return Vec::new();
        }

        self.records
            .range(parent.to_string()..)
            .take_while(|(code, _)| code.starts_with(parent))
            .filter(|(code, _)| code.len() == len)
            .map(|(code, _)| code.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
fips,name,population,area_sq_mi
06,California,39538223,155779.22
06075,San Francisco County,873965,46.9
06001,Alameda County,1682353,739.02
060750101001,Block Group 1,1200,0.05
060750101002,Block Group 2,,0.04
060010001001,Block Group 1,900,
36,New York,20201249,47126.4
36061,New York County,1694251,22.66
";

    fn sample() -> ReferenceTables {
        ReferenceTables::from_reader(SAMPLE.as_bytes()).unwrap()
    }

    #[test]
    fn loads_rows_with_optional_columns() {
        let tables = sample();
        assert_eq!(tables.len(), 8);

        let bg = tables.record("060750101002").unwrap();
        assert_eq!(bg.population, None);
        assert_eq!(bg.area_sq_mi, Some(0.04));
    }

    #[test]
    fn resolves_state_names_and_abbreviations() {
        let tables = sample();
        assert_eq!(
            tables.name_to_code("CA"),
            NameResolution::Resolved("06".into())
        );
        assert_eq!(
            tables.name_to_code("new york"),
            NameResolution::Resolved("36".into())
        );
    }

    #[test]
    fn resolves_table_names() {
        let tables = sample();
        assert_eq!(
            tables.name_to_code("San Francisco County"),
            NameResolution::Resolved("06075".into())
        );
    }

    #[test]
    fn ambiguous_and_unknown_names_are_not_names() {
        let tables = sample();
        assert_eq!(
            tables.name_to_code("Block Group 1"),
            NameResolution::NotAName("Block Group 1".into())
        );
        assert_eq!(
            tables.name_to_code("06075"),
            NameResolution::NotAName("06075".into())
        );
    }

    #[test]
    fn lists_contained_codes_by_prefix() {
        let tables = sample();
        assert_eq!(
            tables.codes_within("06", Granularity::County),
            vec!["06001".to_string(), "06075".to_string()]
        );
        assert_eq!(
            tables.codes_within("06075", Granularity::Blockgroup),
            vec!["060750101001".to_string(), "060750101002".to_string()]
        );
        assert_eq!(tables.codes_within("US", Granularity::County).len(), 3);
    }

    #[test]
    fn no_containment_upward() {
        let tables = sample();
        assert!(tables.codes_within("06075", Granularity::State).is_empty());
        assert!(tables.codes_within("06075", Granularity::City).is_empty());
    }
}
