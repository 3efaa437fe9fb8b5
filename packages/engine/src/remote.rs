//! HTTP client for an analysis engine served over JSON.
//!
//! - Analysis: `POST {base}/analyze` with an [`EngineRequest`] body,
//!   answered by a result set or an `{"error": ...}` marker.
//! - Report: `POST {base}/report` with a [`ReportRequest`] body, answered
//!   by an HTML document.

use ej_api_engine_models::{EngineOutcome, EngineRequest, ReportRequest};

use crate::{AnalysisEngine, EngineError};

/// Analysis engine reached over HTTP.
pub struct RemoteEngine {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteEngine {
    /// Creates a client for the engine at `base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

/// Extracts a human-readable message from a failed engine response.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| match EngineOutcome::from_json(json) {
            Ok(EngineOutcome::Failed { error }) => Some(error),
            _ => None,
        })
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| format!("Analysis engine returned HTTP {status}"))
}

#[async_trait::async_trait]
impl AnalysisEngine for RemoteEngine {
    async fn analyze(&self, request: &EngineRequest) -> Result<EngineOutcome, EngineError> {
        let url = self.endpoint("analyze");
        log::debug!("Calling analysis engine: {url} (method={})", request.method());

        let resp = self.client.post(&url).json(request).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        // error markers may arrive with any status
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&body)
            && json.get("error").is_some_and(|e| !e.is_null())
        {
            return Ok(EngineOutcome::from_json(json)?);
        }

        if !status.is_success() {
            return Err(EngineError::Remote {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        let json: serde_json::Value = serde_json::from_str(&body)?;
        Ok(EngineOutcome::from_json(json)?)
    }

    async fn render_report(&self, request: &ReportRequest) -> Result<String, EngineError> {
        let url = self.endpoint("report");
        log::debug!("Rendering report via {url} (method={})", request.method);

        let resp = self.client.post(&url).json(request).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(EngineError::Remote {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        log::debug!("Report rendered ({} bytes)", body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ej_api_engine_models::{AnalysisResult, InputMethod, SitePoint};
    use httpmock::prelude::*;

    fn points_request() -> EngineRequest {
        EngineRequest::Points {
            sitepoints: vec![SitePoint {
                lat: 37.77,
                lon: -122.42,
            }],
            radius: 3.0,
        }
    }

    #[test]
    fn trims_trailing_slash() {
        let engine = RemoteEngine::new(reqwest::Client::new(), "http://engine:8000/");
        assert_eq!(engine.endpoint("analyze"), "http://engine:8000/analyze");
    }

    #[test]
    fn error_message_prefers_marker_then_body() {
        let status = reqwest::StatusCode::INTERNAL_SERVER_ERROR;
        assert_eq!(error_message(status, r#"{"error":"boom"}"#), "boom");
        assert_eq!(error_message(status, "plain failure\n"), "plain failure");
        assert_eq!(
            error_message(status, ""),
            "Analysis engine returned HTTP 500 Internal Server Error"
        );
    }

    #[tokio::test]
    async fn analyze_posts_request_and_reads_rows() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/analyze")
                    .json_body_partial(r#"{"method":"latlon","radius":3.0}"#);
                then.status(200).json_body(serde_json::json!({
                    "results_bysite": [{ "ejam_uniq_id": 1, "pop": 5000 }]
                }));
            })
            .await;

        let engine = RemoteEngine::new(reqwest::Client::new(), server.base_url());
        let outcome = engine.analyze(&points_request()).await.unwrap();

        mock.assert_async().await;
        let EngineOutcome::Completed(result) = outcome else {
            panic!("expected a completed result");
        };
        assert_eq!(result.results_bysite[0]["pop"], 5000);
    }

    #[tokio::test]
    async fn analyze_surfaces_error_marker_on_failure_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/analyze");
                then.status(400)
                    .json_body(serde_json::json!({ "error": "Invalid FIPS code" }));
            })
            .await;

        let engine = RemoteEngine::new(reqwest::Client::new(), server.base_url());
        let outcome = engine.analyze(&points_request()).await.unwrap();
        assert_eq!(
            outcome,
            EngineOutcome::Failed {
                error: "Invalid FIPS code".into()
            }
        );
    }

    #[tokio::test]
    async fn report_returns_html_verbatim() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/report")
                    .json_body_partial(r#"{"sitenumber":1,"return_html":true}"#);
                then.status(200).body("<html><body>report</body></html>");
            })
            .await;

        let engine = RemoteEngine::new(reqwest::Client::new(), server.base_url());
        let html = engine
            .render_report(&ReportRequest {
                result: AnalysisResult::default(),
                sitenumber: 1,
                return_html: true,
                method: InputMethod::Latlon,
                shp: None,
                report_title: "Test".into(),
            })
            .await
            .unwrap();
        assert_eq!(html, "<html><body>report</body></html>");
    }

    #[tokio::test]
    async fn report_failure_keeps_engine_message() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/report");
                then.status(500).body("renderer crashed");
            })
            .await;

        let engine = RemoteEngine::new(reqwest::Client::new(), server.base_url());
        let err = engine
            .render_report(&ReportRequest {
                result: AnalysisResult::default(),
                sitenumber: 1,
                return_html: true,
                method: InputMethod::Fips,
                shp: None,
                report_title: "Test".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "renderer crashed");
    }
}
