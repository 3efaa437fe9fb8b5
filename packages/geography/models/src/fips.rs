//! US state FIPS code table.
//!
//! Maps two-digit state FIPS codes to postal abbreviations and full names
//! for the 50 states, DC, and Puerto Rico.

/// A single row of the state table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateInfo {
    /// Two-digit FIPS code (e.g. `"06"`).
    pub fips: &'static str,
    /// Two-letter postal abbreviation (e.g. `"CA"`).
    pub abbr: &'static str,
    /// Full state name (e.g. `"California"`).
    pub name: &'static str,
}

const fn state(fips: &'static str, abbr: &'static str, name: &'static str) -> StateInfo {
    StateInfo { fips, abbr, name }
}

/// All known states, ordered by FIPS code.
pub const STATES: &[StateInfo] = &[
    state("01", "AL", "Alabama"),
    state("02", "AK", "Alaska"),
    state("04", "AZ", "Arizona"),
    state("05", "AR", "Arkansas"),
    state("06", "CA", "California"),
    state("08", "CO", "Colorado"),
    state("09", "CT", "Connecticut"),
    state("10", "DE", "Delaware"),
    state("11", "DC", "District of Columbia"),
    state("12", "FL", "Florida"),
    state("13", "GA", "Georgia"),
    state("15", "HI", "Hawaii"),
    state("16", "ID", "Idaho"),
    state("17", "IL", "Illinois"),
    state("18", "IN", "Indiana"),
    state("19", "IA", "Iowa"),
    state("20", "KS", "Kansas"),
    state("21", "KY", "Kentucky"),
    state("22", "LA", "Louisiana"),
    state("23", "ME", "Maine"),
    state("24", "MD", "Maryland"),
    state("25", "MA", "Massachusetts"),
    state("26", "MI", "Michigan"),
    state("27", "MN", "Minnesota"),
    state("28", "MS", "Mississippi"),
    state("29", "MO", "Missouri"),
    state("30", "MT", "Montana"),
    state("31", "NE", "Nebraska"),
    state("32", "NV", "Nevada"),
    state("33", "NH", "New Hampshire"),
    state("34", "NJ", "New Jersey"),
    state("35", "NM", "New Mexico"),
    state("36", "NY", "New York"),
    state("37", "NC", "North Carolina"),
    state("38", "ND", "North Dakota"),
    state("39", "OH", "Ohio"),
    state("40", "OK", "Oklahoma"),
    state("41", "OR", "Oregon"),
    state("42", "PA", "Pennsylvania"),
    state("44", "RI", "Rhode Island"),
    state("45", "SC", "South Carolina"),
    state("46", "SD", "South Dakota"),
    state("47", "TN", "Tennessee"),
    state("48", "TX", "Texas"),
    state("49", "UT", "Utah"),
    state("50", "VT", "Vermont"),
    state("51", "VA", "Virginia"),
    state("53", "WA", "Washington"),
    state("54", "WV", "West Virginia"),
    state("55", "WI", "Wisconsin"),
    state("56", "WY", "Wyoming"),
    state("72", "PR", "Puerto Rico"),
];

/// Looks up a state by its two-digit FIPS code.
#[must_use]
pub fn by_fips(fips: &str) -> Option<&'static StateInfo> {
    STATES.iter().find(|s| s.fips == fips)
}

/// Looks up a state by postal abbreviation (case-insensitive).
#[must_use]
pub fn by_abbr(abbr: &str) -> Option<&'static StateInfo> {
    let abbr = abbr.trim();
    STATES.iter().find(|s| s.abbr.eq_ignore_ascii_case(abbr))
}

/// Looks up a state by full name (case-insensitive).
#[must_use]
pub fn by_name(name: &str) -> Option<&'static StateInfo> {
    let name = name.trim();
    STATES.iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

/// Returns the state that contains `code`, using its first two digits.
///
/// Works for any code at state granularity or finer.
#[must_use]
pub fn containing_state(code: &str) -> Option<&'static StateInfo> {
    code.get(..2).and_then(by_fips)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_and_unique() {
        assert_eq!(STATES.len(), 52);
        for pair in STATES.windows(2) {
            assert!(pair[0].fips < pair[1].fips, "{} >= {}", pair[0].fips, pair[1].fips);
        }
    }

    #[test]
    fn abbr_roundtrip() {
        for info in STATES {
            assert_eq!(by_abbr(info.abbr).map(|s| s.fips), Some(info.fips));
            assert_eq!(by_name(info.name).map(|s| s.fips), Some(info.fips));
        }
    }

    #[test]
    fn unknown_codes() {
        assert!(by_fips("99").is_none());
        assert!(by_abbr("XX").is_none());
        assert!(by_name("Atlantis").is_none());
    }

    #[test]
    fn case_insensitive_lookups() {
        assert_eq!(by_abbr("ca").map(|s| s.fips), Some("06"));
        assert_eq!(by_name(" new york ").map(|s| s.fips), Some("36"));
    }

    #[test]
    fn containing_state_uses_prefix() {
        assert_eq!(containing_state("06075").map(|s| s.abbr), Some("CA"));
        assert_eq!(containing_state("360610001001").map(|s| s.abbr), Some("NY"));
        assert!(containing_state("0").is_none());
    }
}
