//! End-to-end pipeline tests: raw tool arguments through composition,
//! backend dispatch, shaping, and the response envelope, with a recording
//! backend in place of the REST transport.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};

use searchbridge::backend::{BackendResults, SearchBackend};
use searchbridge::compose::{BackendQuery, SearchRequest};
use searchbridge::config::RuntimeDefaults;
use searchbridge::error::Result;
use searchbridge::SearchClient;

struct RecordingBackend {
    queries: Mutex<Vec<BackendQuery>>,
    results: BackendResults,
}

impl RecordingBackend {
    fn returning(results: BackendResults) -> Arc<Self> {
        Arc::new(Self {
            queries: Mutex::new(Vec::new()),
            results,
        })
    }

    fn recorded(&self) -> Vec<BackendQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchBackend for RecordingBackend {
    async fn run(&self, query: &BackendQuery) -> Result<BackendResults> {
        self.queries.lock().unwrap().push(query.clone());
        Ok(self.results.clone())
    }
}

fn doc(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("test doc must be an object"),
    }
}

fn defaults() -> RuntimeDefaults {
    RuntimeDefaults {
        semantic_configuration: Some("default-semantic".to_string()),
        search_fields: vec!["title".to_string(), "content".to_string()],
        ..RuntimeDefaults::default()
    }
}

#[tokio::test]
async fn hybrid_request_with_union_inputs_produces_one_backend_call() {
    let backend = RecordingBackend::returning(BackendResults {
        items: vec![doc(json!({
            "title": "Firmware Engineer",
            "content": "Experienced C developer",
            "@search.score": 2.4,
        }))],
        count: Some(12),
        facets: None,
    });
    let client = SearchClient::new(backend.clone(), defaults());

    // Union-typed inputs: vectors as a newline string, select as a
    // comma-delimited string.
    let request = SearchRequest {
        search: Some("firmware developer".to_string()),
        vectors: Some(json!("embedded C\nfirmware developer")),
        select: Some(json!("title, content")),
        query_type: Some("semantic".to_string()),
        query_language: Some("en-US".to_string()),
        count: true,
        include_scores: true,
        ..Default::default()
    };

    let outcome = client.search(request).await.unwrap();

    let queries = backend.recorded();
    assert_eq!(queries.len(), 1);
    let query = &queries[0];

    assert_eq!(query.search.as_deref(), Some("firmware developer"));
    assert_eq!(query.search_fields.as_deref(), Some("title,content"));
    assert_eq!(query.select.as_deref(), Some("title,content"));
    assert_eq!(query.semantic_configuration.as_deref(), Some("default-semantic"));
    assert_eq!(query.query_type.as_deref(), Some("semantic"));
    assert_eq!(query.query_language.as_deref(), Some("en-US"));
    // Semantic rewrites force mode "any".
    assert_eq!(query.search_mode.as_deref(), Some("any"));

    assert_eq!(query.vector_queries.len(), 2);
    assert_eq!(query.vector_queries[0].text, "embedded C");
    assert_eq!(query.vector_queries[0].k, 60);
    assert_eq!(query.vector_queries[0].weight, Some(1.0));
    assert_eq!(query.vector_queries[0].query_rewrites, None);
    // The vector matching the lexical query inherits query-level rewrites.
    assert_eq!(
        query.vector_queries[1].query_rewrites.as_deref(),
        Some("generative|count-5")
    );

    assert_eq!(outcome.search_type, "Search");
    assert_eq!(outcome.count, Some(12));
    assert_eq!(outcome.items.len(), 1);
    assert_eq!(outcome.items[0].get("title"), Some(&json!("Firmware Engineer")));
    assert_eq!(outcome.items[0].get("@search.score"), Some(&json!(2.4)));
}

#[tokio::test]
async fn validation_failure_means_zero_backend_invocations() {
    let backend = RecordingBackend::returning(BackendResults::default());
    let client = SearchClient::new(backend.clone(), RuntimeDefaults::default());

    // No lexical query, no vectors.
    let err = client.search(SearchRequest::default()).await.unwrap_err();
    assert!(err.to_string().contains("vector descriptor"));

    // Semantic without a language.
    let request = SearchRequest {
        search: Some("rust".to_string()),
        query_type: Some("semantic".to_string()),
        semantic_configuration: Some("sem".to_string()),
        search_fields: Some(json!("title")),
        ..Default::default()
    };
    let err = client.search(request).await.unwrap_err();
    assert!(err.to_string().contains("language"));

    assert!(backend.recorded().is_empty());
}

#[tokio::test]
async fn applied_echo_mirrors_the_sent_query() {
    let backend = RecordingBackend::returning(BackendResults::default());
    let client = SearchClient::new(backend.clone(), defaults());

    let request = SearchRequest {
        search: Some("rust".to_string()),
        vectors: Some(json!([["systems", 40, 2.0]])),
        facets: Some(json!("Department,count:10")),
        skip: Some(20),
        count: true,
        ..Default::default()
    };
    let outcome = client.search(request).await.unwrap();

    let queries = backend.recorded();
    let query = &queries[0];
    let applied = &outcome.applied;

    assert_eq!(applied["top"], json!(query.top));
    assert_eq!(
        applied["semantic_configuration"],
        json!(query.semantic_configuration)
    );
    assert_eq!(applied["search_mode"], json!(query.search_mode));
    assert_eq!(applied["search_fields"], json!(query.search_fields));
    assert_eq!(applied["skip"], json!(query.skip));
    assert_eq!(applied["facets"], json!(query.facets));
    assert_eq!(applied["count"], json!(query.count));
    assert_eq!(applied["vector_ks"], json!([40]));
    assert_eq!(applied["vector_weights"], json!([2.0]));
    assert_eq!(
        applied["vector_fields"],
        json!(query.vector_queries[0].fields)
    );
}

#[tokio::test]
async fn applied_resubmitted_as_explicit_arguments_reproduces_the_query() {
    let backend = RecordingBackend::returning(BackendResults::default());
    let client = SearchClient::new(backend.clone(), defaults());

    let request = SearchRequest {
        search: Some("rust engineer".to_string()),
        select: Some(json!("title, content")),
        query_type: Some("semantic".to_string()),
        query_language: Some("en-US".to_string()),
        captions: Some("extractive|highlight-true".to_string()),
        answers: Some("extractive|count-3".to_string()),
        skip: Some(10),
        count: true,
        include_scores: true,
        ..Default::default()
    };
    let outcome = client.search(request).await.unwrap();
    let applied = outcome.applied.clone();

    // Rebuild the call from the echo alone, against empty defaults.
    let s = |key: &str| {
        applied
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let resubmitted = SearchRequest {
        search: Some("rust engineer".to_string()),
        select: applied.get("select").cloned(),
        search_fields: applied.get("search_fields").cloned(),
        search_mode: s("search_mode"),
        query_type: s("query_type"),
        query_language: s("query_language"),
        query_rewrites: s("query_rewrites"),
        semantic_configuration: s("semantic_configuration"),
        captions: s("captions"),
        answers: s("answers"),
        top: applied.get("top").and_then(Value::as_i64),
        skip: applied.get("skip").and_then(Value::as_i64),
        count: applied.get("count").and_then(Value::as_bool).unwrap_or(false),
        include_scores: applied
            .get("include_scores")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        ..Default::default()
    };

    let replay_backend = RecordingBackend::returning(BackendResults::default());
    let replay_client = SearchClient::new(replay_backend.clone(), RuntimeDefaults::default());
    replay_client.search(resubmitted).await.unwrap();

    let original = backend.recorded();
    let replayed = replay_backend.recorded();
    assert_eq!(original[0], replayed[0]);
}

#[tokio::test]
async fn vector_descriptor_tuples_flow_through_to_the_backend() {
    let backend = RecordingBackend::returning(BackendResults::default());
    let client = SearchClient::new(backend.clone(), defaults());

    let request = SearchRequest {
        vectors: Some(json!([
            ["C or C++ software engineer", 60, 2.0, "generative|count-3"],
            ["embedded systems", null, 1.3],
            "backup probe",
        ])),
        vector_fields: Some(json!(["v1", "v2"])),
        ..Default::default()
    };
    client.search(request).await.unwrap();

    let queries = backend.recorded();
    let probes = &queries[0].vector_queries;

    assert_eq!(probes.len(), 3);
    assert_eq!(probes[0].k, 60);
    assert_eq!(probes[0].weight, Some(2.0));
    assert_eq!(probes[0].query_rewrites.as_deref(), Some("generative|count-3"));
    assert_eq!(probes[0].fields, "v1,v2");

    // Unset k falls back to the default; the explicit weight is kept.
    assert_eq!(probes[1].k, 60);
    assert_eq!(probes[1].weight, Some(1.3));

    // A bare string probe has its own (unset) slot, so it gets the default
    // weight rather than reusing the previous descriptor's.
    assert_eq!(probes[2].weight, Some(1.0));
    assert!(probes[2].query_rewrites.is_none());
}

#[tokio::test]
async fn standalone_k_and_weight_lists_broadcast_across_vectors() {
    let backend = RecordingBackend::returning(BackendResults::default());
    let client = SearchClient::new(backend.clone(), defaults());

    // Arguments exactly as a tool call carries them, with the k and weight
    // lists shorter than the vector list.
    let arguments = json!({
        "vectors": ["embedded C", "firmware", "rtos"],
        "vector_ks": [40],
        "vector_weights": [2.0, 0.5],
    });
    let request: SearchRequest = serde_json::from_value(arguments).unwrap();
    client.search(request).await.unwrap();

    let queries = backend.recorded();
    let vector_queries = &queries[0].vector_queries;

    let ks: Vec<u32> = vector_queries.iter().map(|v| v.k).collect();
    assert_eq!(ks, vec![40, 40, 40]);

    let weights: Vec<Option<f64>> = vector_queries.iter().map(|v| v.weight).collect();
    assert_eq!(weights, vec![Some(2.0), Some(0.5), Some(0.5)]);
}

#[tokio::test]
async fn empty_results_render_the_sentinel_markdown() {
    let backend = RecordingBackend::returning(BackendResults::default());
    let client = SearchClient::new(backend, defaults());

    let request = SearchRequest {
        search: Some("no matches".to_string()),
        ..Default::default()
    };
    let outcome = client.search(request).await.unwrap();

    assert_eq!(
        outcome.render_markdown(),
        "No results found for your query using Search."
    );
}
