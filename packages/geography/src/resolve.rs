//! Geography code resolution.
//!
//! Turns a user-supplied area (a place name or a code) into the list of
//! codes the analysis engine should run over at a requested granularity.

use ej_api_geography_models::{Granularity, NameResolution, normalize_code};

use crate::{GeoError, GeographyLookup};

/// Resolves `area` to one or more codes at `target` granularity.
///
/// Names are translated to codes first; anything that is not a recognized
/// name is taken to be a code already. If the code is already at `target`
/// (or no target is given) it is returned unchanged. Otherwise county and
/// block group targets expand coarser codes into the codes they contain,
/// or truncate finer codes to their containing code. Any other target
/// returns the code unchanged.
///
/// # Errors
///
/// Returns [`GeoError::EmptyExpansion`] if expanding the code yields no
/// contained codes.
pub fn resolve(
    lookup: &dyn GeographyLookup,
    area: &str,
    target: Option<Granularity>,
) -> Result<Vec<String>, GeoError> {
    let code = match lookup.name_to_code(area) {
        NameResolution::Resolved(code) => {
            log::debug!("Resolved place name {area:?} to {code}");
            code
        }
        NameResolution::NotAName(original) => normalize_code(&original),
    };

    let detected = Granularity::classify(&code);

    let Some(target) = target else {
        return Ok(vec![code]);
    };
    if detected == target {
        return Ok(vec![code]);
    }

    match target {
        Granularity::County | Granularity::Blockgroup => convert(lookup, code, detected, target),
        _ => Ok(vec![code]),
    }
}

fn convert(
    lookup: &dyn GeographyLookup,
    code: String,
    detected: Granularity,
    target: Granularity,
) -> Result<Vec<String>, GeoError> {
    if detected.contains(target) {
        let codes = lookup.codes_within(&code, target);
        if codes.is_empty() {
            return Err(GeoError::EmptyExpansion { code, target });
        }
        log::debug!("Expanded {code} into {} {target} codes", codes.len());
        return Ok(codes);
    }

    if target.contains(detected)
        && let Some(len) = target.code_len()
        && let Some(prefix) = code.get(..len)
    {
        return Ok(vec![prefix.to_string()]);
    }

    log::debug!("Cannot convert {detected} code {code} to {target}; leaving it unchanged");
    Ok(vec![code])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::ReferenceTables;
    use ej_api_geography_models::{GeographyRecord, fips};

    fn record(code: &str, name: &str) -> GeographyRecord {
        GeographyRecord {
            fips: code.to_string(),
            name: name.to_string(),
            population: None,
            area_sq_mi: None,
        }
    }

    fn tables() -> ReferenceTables {
        ReferenceTables::from_records([
            record("06", "California"),
            record("06001", "Alameda County"),
            record("06075", "San Francisco County"),
            record("060750101001", "BG 060750101001"),
            record("060750101002", "BG 060750101002"),
            record("060759802001", "BG 060759802001"),
            record("32", "Nevada"),
            record("32003", "Clark County"),
        ])
    }

    #[test]
    fn code_at_target_is_identity() {
        let tables = tables();
        for (code, level) in [
            ("06", Granularity::State),
            ("06075", Granularity::County),
            ("060750101001", Granularity::Blockgroup),
        ] {
            assert_eq!(Granularity::classify(code), level);
            assert_eq!(resolve(&tables, code, Some(level)).unwrap(), vec![code]);
        }
    }

    #[test]
    fn no_target_is_identity() {
        assert_eq!(resolve(&tables(), "06075", None).unwrap(), vec!["06075"]);
    }

    #[test]
    fn state_expands_to_its_counties() {
        let codes = resolve(&tables(), "06", Some(Granularity::County)).unwrap();
        assert_eq!(codes, vec!["06001", "06075"]);
        for code in &codes {
            assert_eq!(Granularity::classify(code), Granularity::County);
            assert_eq!(fips::containing_state(code).map(|s| s.fips), Some("06"));
        }
    }

    #[test]
    fn names_resolve_before_expansion() {
        let codes = resolve(&tables(), "Nevada", Some(Granularity::County)).unwrap();
        assert_eq!(codes, vec!["32003"]);

        let codes = resolve(&tables(), "San Francisco County", Some(Granularity::Blockgroup))
            .unwrap();
        assert_eq!(codes.len(), 3);
        assert!(codes.iter().all(|c| c.starts_with("06075")));
    }

    #[test]
    fn finer_code_contracts_to_county() {
        let codes = resolve(&tables(), "060750101001", Some(Granularity::County)).unwrap();
        assert_eq!(codes, vec!["06075"]);
    }

    #[test]
    fn other_targets_fall_back_to_the_code() {
        let codes = resolve(&tables(), "06075", Some(Granularity::Tract)).unwrap();
        assert_eq!(codes, vec!["06075"]);
    }

    #[test]
    fn empty_expansion_is_an_error() {
        let err = resolve(&tables(), "06001", Some(Granularity::Blockgroup)).unwrap_err();
        assert!(matches!(err, GeoError::EmptyExpansion { .. }));
        assert_eq!(err.to_string(), "No blockgroup codes found within 06001");
    }
}
