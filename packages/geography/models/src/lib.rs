#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Census geography code types.
//!
//! A geography code is a FIPS-style numeric string whose length encodes
//! its granularity: 2 digits for a state, 5 for a county, 11 for a tract,
//! 12 for a block group, 15 for a block, and 7 for a city (census place).
//! These types are shared by the code resolver, the boundary overlay
//! pipeline, and the HTTP layer.

pub mod fips;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The level of geographic aggregation a code or request targets.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Granularity {
    /// The whole country.
    Nation,
    /// A state (2 digits).
    State,
    /// A county (5 digits).
    County,
    /// A census tract (11 digits).
    Tract,
    /// A census block group (12 digits).
    Blockgroup,
    /// A census block (15 digits).
    Block,
    /// A census place (7 digits).
    City,
    /// Anything that does not match a known code shape.
    Unknown,
}

impl Granularity {
    /// Detects the granularity of a geography code from its format.
    ///
    /// The code is normalized first (see [`normalize_code`]).
    #[must_use]
    pub fn classify(code: &str) -> Self {
        let code = normalize_code(code);

        if code.eq_ignore_ascii_case("US") {
            return Self::Nation;
        }
        if code.is_empty() || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Self::Unknown;
        }

        match code.len() {
            2 => Self::State,
            5 => Self::County,
            7 => Self::City,
            11 => Self::Tract,
            12 => Self::Blockgroup,
            15 => Self::Block,
            _ => Self::Unknown,
        }
    }

    /// Number of digits in a code of this granularity, for the levels of
    /// the nested census hierarchy.
    #[must_use]
    pub const fn code_len(self) -> Option<usize> {
        match self {
            Self::State => Some(2),
            Self::County => Some(5),
            Self::Tract => Some(11),
            Self::Blockgroup => Some(12),
            Self::Block => Some(15),
            Self::Nation | Self::City | Self::Unknown => None,
        }
    }

    /// Position in the nested hierarchy, `0` being the nation. Cities sit
    /// outside the hierarchy and return `None`.
    #[must_use]
    pub const fn depth(self) -> Option<u8> {
        match self {
            Self::Nation => Some(0),
            Self::State => Some(1),
            Self::County => Some(2),
            Self::Tract => Some(3),
            Self::Blockgroup => Some(4),
            Self::Block => Some(5),
            Self::City | Self::Unknown => None,
        }
    }

    /// Returns `true` if this level strictly contains `other` in the
    /// nested hierarchy.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        matches!((self.depth(), other.depth()), (Some(a), Some(b)) if a < b)
    }
}

/// Trims a code and restores a single dropped leading zero.
///
/// Numeric codes often lose their leading zero when they pass through a
/// spreadsheet (`6075` for `06075`). Lengths that are one short of a known
/// code length are padded; everything else is returned trimmed.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    let code = code.trim();
    let numeric = !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit());

    if numeric && matches!(code.len(), 1 | 4 | 6 | 10 | 14) {
        format!("0{code}")
    } else {
        code.to_string()
    }
}

/// Outcome of translating a user-supplied area into a geography code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameResolution {
    /// The input was a recognized place name; this is its code.
    Resolved(String),
    /// The input was not a recognized name and is returned untouched so
    /// the caller can treat it as a code.
    NotAName(String),
}

impl NameResolution {
    /// Collapses the resolution into a code, treating unrecognized names
    /// as codes already.
    #[must_use]
    pub fn into_code(self) -> String {
        match self {
            Self::Resolved(code) | Self::NotAName(code) => code,
        }
    }
}

/// One row of the reference geography table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeographyRecord {
    /// Normalized geography code.
    pub fips: String,
    /// Display name (e.g. "San Francisco County").
    pub name: String,
    /// Total population, if known.
    pub population: Option<u64>,
    /// Land area in square miles, if known.
    pub area_sq_mi: Option<f64>,
}

/// Column names of a standardized boundary overlay, in canonical order.
pub mod columns {
    /// Geography code.
    pub const FIPS: &str = "FIPS";
    /// Display name.
    pub const NAME: &str = "NAME";
    /// Granularity label (`"state"`, `"county"`, ...).
    pub const FIPS_TYPE: &str = "FIPS_TYPE";
    /// Two-letter state abbreviation.
    pub const STATE_ABBR: &str = "STATE_ABBR";
    /// Full state name.
    pub const STATE_NAME: &str = "STATE_NAME";
    /// Population.
    pub const POP: &str = "POP";
    /// Area in square miles.
    pub const SQMI: &str = "SQMI";
    /// Population per square mile.
    pub const POP_SQMI: &str = "POP_SQMI";

    /// Every overlay column, in the order they are emitted.
    pub const CANONICAL: &[&str] = &[
        FIPS, NAME, FIPS_TYPE, STATE_ABBR, STATE_NAME, POP, SQMI, POP_SQMI,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_length() {
        assert_eq!(Granularity::classify("06"), Granularity::State);
        assert_eq!(Granularity::classify("06075"), Granularity::County);
        assert_eq!(Granularity::classify("0667000"), Granularity::City);
        assert_eq!(Granularity::classify("06075010100"), Granularity::Tract);
        assert_eq!(Granularity::classify("060750101001"), Granularity::Blockgroup);
        assert_eq!(Granularity::classify("060750101001000"), Granularity::Block);
        assert_eq!(Granularity::classify("us"), Granularity::Nation);
    }

    #[test]
    fn classifies_non_codes_as_unknown() {
        assert_eq!(Granularity::classify(""), Granularity::Unknown);
        assert_eq!(Granularity::classify("California"), Granularity::Unknown);
        assert_eq!(Granularity::classify("123"), Granularity::Unknown);
    }

    #[test]
    fn restores_dropped_leading_zero() {
        assert_eq!(normalize_code("6"), "06");
        assert_eq!(normalize_code(" 6075 "), "06075");
        assert_eq!(normalize_code("60750101001"), "60750101001");
        assert_eq!(Granularity::classify("6075"), Granularity::County);
    }

    #[test]
    fn parses_granularity_names() {
        assert_eq!("county".parse::<Granularity>().ok(), Some(Granularity::County));
        assert_eq!(
            "BlockGroup".parse::<Granularity>().ok(),
            Some(Granularity::Blockgroup)
        );
        assert_eq!(Granularity::Blockgroup.to_string(), "blockgroup");
        assert!("province".parse::<Granularity>().is_err());
    }

    #[test]
    fn hierarchy_containment() {
        assert!(Granularity::State.contains(Granularity::County));
        assert!(Granularity::Nation.contains(Granularity::Blockgroup));
        assert!(!Granularity::Blockgroup.contains(Granularity::Tract));
        assert!(!Granularity::City.contains(Granularity::Blockgroup));
    }

    #[test]
    fn name_resolution_collapses_to_code() {
        assert_eq!(NameResolution::Resolved("06".into()).into_code(), "06");
        assert_eq!(NameResolution::NotAName("06075".into()).into_code(), "06075");
    }
}
