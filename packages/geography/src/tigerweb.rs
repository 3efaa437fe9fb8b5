//! State boundary download from the Census Bureau `TIGERweb` REST API.
//!
//! Used at startup when no local state boundary file is present. The
//! States layer is queried as `GeoJSON` in pages of
//! `resultRecordCount` features until the service stops reporting
//! `exceededTransferLimit`.

use std::time::Duration;

use geojson::Feature;

use crate::{GeoError, boundaries::StateBoundaries};

/// `TIGERweb` States layer query endpoint.
pub const DEFAULT_STATE_SERVICE_URL: &str = "https://tigerweb.geo.census.gov/arcgis/rest/services/TIGERweb/tigerWMS_ACS2023/MapServer/80/query";

/// Features requested per page. Kept low to avoid WAF blocks on large
/// geometry responses.
const PAGE_SIZE: u32 = 20;

/// Attempts per page before giving up.
const MAX_RETRIES: u32 = 4;

/// Pause between successive pages.
const PAGE_DELAY: Duration = Duration::from_millis(100);

/// Browser-like User-Agent; `TIGERweb` rejects some default agents.
const USER_AGENT: &str = "Mozilla/5.0 (compatible; EjApi/1.0)";

/// Builds a client configured for `TIGERweb` requests.
///
/// # Errors
///
/// Returns [`GeoError::Http`] if the client cannot be built.
pub fn client() -> Result<reqwest::Client, GeoError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(Into::into)
}

/// Builds the all-states query for `base_url`, without paging parameters.
#[must_use]
pub fn states_query_url(base_url: &str) -> String {
    let sep = if base_url.contains('?') { '&' } else { '?' };
    format!(
        "{base_url}{sep}\
         where=1%3D1\
         &outFields=GEOID%2CSTATE%2CSTUSAB%2CNAME\
         &outSR=4326\
         &returnGeometry=true\
         &f=geojson"
    )
}

/// Downloads every state boundary from the States layer at `base_url`.
///
/// # Errors
///
/// Returns [`GeoError`] if a page still fails after all retries or a
/// feature is not valid `GeoJSON`.
pub async fn fetch_state_boundaries(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<StateBoundaries, GeoError> {
    let features = fetch_paginated(client, &states_query_url(base_url), "states", MAX_RETRIES)
        .await?
        .into_iter()
        .map(serde_json::from_value::<Feature>)
        .collect::<Result<Vec<_>, _>>()?;

    let boundaries = StateBoundaries::from_features(features);
    log::info!("Downloaded {} state boundaries from TIGERweb", boundaries.len());
    Ok(boundaries)
}

/// Fetches every feature behind `base_url`, appending `resultOffset` and
/// `resultRecordCount` per page.
async fn fetch_paginated(
    client: &reqwest::Client,
    base_url: &str,
    label: &str,
    max_retries: u32,
) -> Result<Vec<serde_json::Value>, GeoError> {
    let mut all_features = Vec::new();
    let mut offset = 0u32;

    loop {
        let url = format!("{base_url}&resultRecordCount={PAGE_SIZE}&resultOffset={offset}");
        let mut json = fetch_page_with_retry(client, &url, label, offset, max_retries).await?;

        let features = match json.get_mut("features").map(serde_json::Value::take) {
            Some(serde_json::Value::Array(features)) => features,
            _ => {
                return Err(GeoError::Conversion {
                    message: format!(
                        "No features array in TIGERweb response for {label} (offset={offset})"
                    ),
                });
            }
        };

        if features.is_empty() {
            break;
        }

        #[allow(clippy::cast_possible_truncation)]
        let page_len = features.len() as u32;
        all_features.extend(features);

        // ArcGIS sets exceededTransferLimit=true when more pages exist
        let exceeded = json
            .get("exceededTransferLimit")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        if !exceeded {
            break;
        }

        offset += page_len;
        log::debug!("{label}: {} features so far, fetching next page", all_features.len());
        tokio::time::sleep(PAGE_DELAY).await;
    }

    Ok(all_features)
}

/// Fetches one page, retrying with exponential backoff on transport
/// errors, non-success statuses, unparseable bodies, and `ArcGIS` error
/// envelopes.
async fn fetch_page_with_retry(
    client: &reqwest::Client,
    url: &str,
    label: &str,
    offset: u32,
    max_retries: u32,
) -> Result<serde_json::Value, GeoError> {
    let mut last_error = String::new();

    for attempt in 0..max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << attempt);
            log::warn!(
                "{label} (offset={offset}): retry {attempt}/{max_retries} in {}s",
                delay.as_secs()
            );
            tokio::time::sleep(delay).await;
        }

        let resp = match client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                last_error = format!("HTTP request error: {e}");
                log::warn!("{label} (offset={offset}, attempt {attempt}): {last_error}");
                continue;
            }
        };

        let status = resp.status();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                last_error = format!("Failed to read response body: {e}");
                log::warn!("{label} (offset={offset}, attempt {attempt}): {last_error}");
                continue;
            }
        };

        if !status.is_success() {
            last_error = format!("HTTP {status}");
            log::warn!("{label} (offset={offset}, attempt {attempt}): {last_error}");
            continue;
        }

        let json: serde_json::Value = match serde_json::from_str(&body) {
            Ok(json) => json,
            Err(e) => {
                last_error = format!("JSON parse error: {e}");
                log::warn!("{label} (offset={offset}, attempt {attempt}): {last_error}");
                continue;
            }
        };

        if let Some(error) = json.get("error") {
            last_error = format!(
                "ArcGIS error: {}",
                error["message"].as_str().unwrap_or("unknown")
            );
            log::warn!("{label} (offset={offset}, attempt {attempt}): {last_error}");
            continue;
        }

        return Ok(json);
    }

    Err(GeoError::Conversion {
        message: format!(
            "TIGERweb request failed after {max_retries} attempts for {label} (offset={offset}): {last_error}"
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn state(geoid: &str, name: &str) -> serde_json::Value {
        json!({
            "type": "Feature",
            "properties": { "GEOID": geoid, "STATE": geoid, "NAME": name },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
            }
        })
    }

    #[test]
    fn query_asks_for_every_state_as_geojson() {
        let url = states_query_url("https://example.com/MapServer/80/query");
        assert!(url.starts_with("https://example.com/MapServer/80/query?where=1%3D1"));
        assert!(url.contains("outSR=4326"));
        assert!(url.ends_with("&f=geojson"));
    }

    #[tokio::test]
    async fn follows_pages_until_transfer_limit_clears() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(GET).path("/query").query_param("resultOffset", "0");
                then.status(200).json_body(json!({
                    "type": "FeatureCollection",
                    "features": [state("06", "California"), state("36", "New York")],
                    "exceededTransferLimit": true
                }));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(GET).path("/query").query_param("resultOffset", "2");
                then.status(200).json_body(json!({
                    "type": "FeatureCollection",
                    "features": [state("48", "Texas")]
                }));
            })
            .await;

        let boundaries = fetch_state_boundaries(&client().unwrap(), &server.url("/query"))
            .await
            .unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(boundaries.len(), 3);
        assert!(boundaries.get("48").is_some());
    }

    #[tokio::test]
    async fn error_envelope_exhausts_retries() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/query");
                then.status(200)
                    .json_body(json!({ "error": { "code": 400, "message": "Invalid query" } }));
            })
            .await;

        let url = states_query_url(&server.url("/query"));
        let err = fetch_paginated(&client().unwrap(), &url, "states", 1)
            .await
            .unwrap_err();

        mock.assert_hits_async(1).await;
        assert!(err.to_string().contains("Invalid query"), "{err}");
    }
}
