//! Backend transport: the seam between query composition and the hosted
//! search service.
//!
//! [`SearchBackend`] is the trait the rest of the crate programs against;
//! tests substitute recording fakes, production uses [`RestSearchBackend`]
//! which speaks the service's JSON REST dialect over HTTPS.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

use crate::compose::BackendQuery;
use crate::config::ServiceConfig;
use crate::error::{BridgeError, Result};

/// Raw results handed back by the backend, before shaping.
#[derive(Debug, Clone, Default)]
pub struct BackendResults {
    /// Documents in backend ranking order, each an open-schema JSON object.
    pub items: Vec<Map<String, Value>>,
    /// Total match count, present only when the query asked for it.
    pub count: Option<i64>,
    /// Facet buckets keyed by field, present only when facets were requested.
    pub facets: Option<Value>,
}

/// Executes composed queries against a search index.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn run(&self, query: &BackendQuery) -> Result<BackendResults>;
}

/// REST client for the hosted search service.
pub struct RestSearchBackend {
    client: reqwest::Client,
    search_url: String,
    api_key: String,
}

// api_key stays out of Debug output.
impl fmt::Debug for RestSearchBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestSearchBackend")
            .field("search_url", &self.search_url)
            .finish()
    }
}

impl RestSearchBackend {
    pub fn new(service: &ServiceConfig) -> Result<Self> {
        let missing = service.missing_settings();
        if !missing.is_empty() {
            return Err(BridgeError::Config(format!(
                "Missing connection settings: {}",
                missing.join(", ")
            )));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(service.connect_timeout_ms))
            .timeout(Duration::from_millis(service.request_timeout_ms))
            .build()
            .map_err(|e| BridgeError::Backend(format!("Failed to build HTTP client: {e}")))?;

        let search_url = format!(
            "{}/indexes/{}/docs/search?api-version={}",
            service.endpoint.trim_end_matches('/'),
            service.index,
            service.api_version
        );

        Ok(Self {
            client,
            search_url,
            api_key: service.api_key.clone(),
        })
    }
}

#[async_trait]
impl SearchBackend for RestSearchBackend {
    async fn run(&self, query: &BackendQuery) -> Result<BackendResults> {
        let response = self
            .client
            .post(&self.search_url)
            .header("api-key", &self.api_key)
            .json(query)
            .send()
            .await
            .map_err(|e| BridgeError::Backend(format!("Search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = extract_error_message(&body).unwrap_or(body);
            return Err(BridgeError::Backend(format!(
                "Search request failed with status {status}: {detail}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| BridgeError::Backend(format!("Invalid search response: {e}")))?;

        Ok(parse_results(payload))
    }
}

fn parse_results(payload: Value) -> BackendResults {
    let mut results = BackendResults::default();

    let Value::Object(mut body) = payload else {
        return results;
    };

    if let Some(Value::Array(items)) = body.remove("value") {
        results.items = items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
    }

    results.count = body.get("@odata.count").and_then(Value::as_i64);
    results.facets = body.remove("@search.facets");

    results
}

fn extract_error_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_connection_settings_fail_construction() {
        let err = RestSearchBackend::new(&ServiceConfig::default()).unwrap_err();
        assert!(err.to_string().contains("service.endpoint"));
    }

    #[test]
    fn search_url_joins_endpoint_index_and_api_version() {
        let service = ServiceConfig {
            endpoint: "https://example.search.windows.net/".to_string(),
            api_key: "key".to_string(),
            index: "docs".to_string(),
            ..Default::default()
        };
        let backend = RestSearchBackend::new(&service).unwrap();
        assert_eq!(
            backend.search_url,
            "https://example.search.windows.net/indexes/docs/docs/search?api-version=2024-07-01"
        );
    }

    #[test]
    fn parse_results_extracts_items_count_and_facets() {
        let payload = json!({
            "@odata.count": 42,
            "@search.facets": {"Department": [{"value": "R&D", "count": 7}]},
            "value": [
                {"title": "one", "@search.score": 1.5},
                {"title": "two"},
            ],
        });
        let results = parse_results(payload);
        assert_eq!(results.items.len(), 2);
        assert_eq!(results.count, Some(42));
        assert!(results.facets.is_some());
    }

    #[test]
    fn parse_results_tolerates_missing_sections() {
        let results = parse_results(json!({"value": []}));
        assert!(results.items.is_empty());
        assert_eq!(results.count, None);
        assert!(results.facets.is_none());

        let results = parse_results(json!("not an object"));
        assert!(results.items.is_empty());
    }

    #[test]
    fn backend_error_messages_are_extracted_from_json_bodies() {
        let body = r#"{"error": {"code": "InvalidRequest", "message": "Unknown field 'foo'."}}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Unknown field 'foo'.")
        );
        assert_eq!(extract_error_message("plain text"), None);
    }
}
