//! County boundary fetcher for an `ArcGIS` `FeatureServer` query endpoint.
//!
//! Requests a single county by FIPS equality with `f=geojson` so the
//! response is a standard `GeoJSON` `FeatureCollection`.

use geojson::{Feature, GeoJson};

use crate::GeoError;

/// Public generalized US county boundaries layer.
pub const DEFAULT_COUNTY_SERVICE_URL: &str = "https://services.arcgis.com/P3ePLMYs2RVChkJx/ArcGIS/rest/services/USA_Counties_Generalized_Boundaries/FeatureServer/0/query";

/// Attribute fields requested alongside the geometry.
pub const COUNTY_FIELDS: &[&str] = &["NAME", "FIPS", "STATE_ABBR", "STATE_NAME"];

/// Builds the filtered query URL for one county.
#[must_use]
pub fn county_query_url(base_url: &str, fips: &str) -> String {
    let fields = COUNTY_FIELDS.join("%2C");
    let sep = if base_url.contains('?') { '&' } else { '?' };

    format!(
        "{base_url}{sep}\
         where=FIPS%3D%27{fips}%27\
         &outFields={fields}\
         &returnGeometry=true\
         &f=geojson"
    )
}

/// Fetches the boundary features for one county.
///
/// # Errors
///
/// Returns [`GeoError`] if the request fails, the service reports an
/// error, or the response is not a `FeatureCollection`.
pub async fn fetch_county(
    client: &reqwest::Client,
    base_url: &str,
    fips: &str,
) -> Result<Vec<Feature>, GeoError> {
    let url = county_query_url(base_url, fips);
    log::debug!("Fetching county boundary: {url}");

    let resp = client.get(&url).send().await?;
    if !resp.status().is_success() {
        return Err(GeoError::Conversion {
            message: format!("Feature service request failed with status {}", resp.status()),
        });
    }
    let body = resp.text().await?;

    let json: serde_json::Value =
        serde_json::from_str(&body).map_err(|e| GeoError::Conversion {
            message: format!("Failed to parse feature service response: {e}"),
        })?;

    // ArcGIS reports failures as 200 with an error envelope
    if let Some(error) = json.get("error") {
        return Err(GeoError::Conversion {
            message: format!(
                "Feature service error: {}",
                error["message"].as_str().unwrap_or("unknown error")
            ),
        });
    }

    match GeoJson::from_json_value(json)? {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        _ => Err(GeoError::Conversion {
            message: "Feature service response is not a FeatureCollection".to_string(),
        }),
    }
}

/// Picks the feature whose `FIPS` property equals `fips`.
///
/// Returns `None` when no feature carries that code.
#[must_use]
pub fn select_feature(features: Vec<Feature>, fips: &str) -> Option<Feature> {
    features
        .into_iter()
        .find(|f| crate::boundaries::feature_code(f, &["FIPS"]).as_deref() == Some(fips))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(fips: &str) -> Feature {
        Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: serde_json::json!({ "FIPS": fips }).as_object().cloned(),
            foreign_members: None,
        }
    }

    #[test]
    fn url_filters_on_the_exact_code() {
        let url = county_query_url("https://example.com/FeatureServer/0/query", "06075");
        assert!(url.starts_with("https://example.com/FeatureServer/0/query?"));
        assert!(url.contains("where=FIPS%3D%2706075%27"));
        assert!(url.contains("outFields=NAME%2CFIPS%2CSTATE_ABBR%2CSTATE_NAME"));
        assert!(url.contains("returnGeometry=true"));
        assert!(url.ends_with("&f=geojson"));
    }

    #[test]
    fn url_respects_existing_query_string() {
        let url = county_query_url("https://example.com/query?token=abc", "06075");
        assert!(url.starts_with("https://example.com/query?token=abc&where="));
    }

    #[test]
    fn selects_matching_feature() {
        let picked = select_feature(vec![feature("06001"), feature("06075")], "06075").unwrap();
        assert_eq!(picked.property("FIPS"), Some(&serde_json::json!("06075")));
    }

    #[test]
    fn other_counties_are_never_picked() {
        assert!(select_feature(vec![feature("06001")], "06075").is_none());
        assert!(select_feature(Vec::new(), "06075").is_none());
    }

    #[tokio::test]
    async fn unreachable_service_is_an_error() {
        let client = reqwest::Client::new();
        let result = fetch_county(&client, "http://127.0.0.1:9/query", "06075").await;
        assert!(result.is_err());
    }
}
