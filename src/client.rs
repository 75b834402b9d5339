//! High-level search operations: compose, execute, shape, wrap.
//!
//! [`SearchClient`] owns the backend handle and the process-wide defaults.
//! It is built once at startup and shared read-only across concurrent tool
//! calls; per-call state lives on the stack of each invocation.

use std::sync::Arc;

use crate::backend::{RestSearchBackend, SearchBackend};
use crate::compose::{compose, BackendQuery, CaptionPrefs, QueryInput, SearchRequest, VectorQuery};
use crate::config::{Config, RuntimeDefaults};
use crate::envelope::SearchOutcome;
use crate::error::Result;
use crate::shape::shape_results;

/// Fixed nearest-neighbor count for the simplified vector tool.
const VECTOR_TOOL_K: u32 = 50;

pub struct SearchClient {
    backend: Arc<dyn SearchBackend>,
    defaults: RuntimeDefaults,
}

impl SearchClient {
    pub fn new(backend: Arc<dyn SearchBackend>, defaults: RuntimeDefaults) -> Self {
        Self { backend, defaults }
    }

    /// Build a client talking to the configured REST backend.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = RestSearchBackend::new(&config.service)?;
        let defaults = RuntimeDefaults::from_config(&config.defaults);
        Ok(Self::new(Arc::new(backend), defaults))
    }

    pub fn defaults(&self) -> &RuntimeDefaults {
        &self.defaults
    }

    /// Run the full search pipeline: lexical, vector, or hybrid.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchOutcome> {
        let input = request.into_input()?;
        self.run(&input, "Search").await
    }

    /// Simplified keyword search: a bare lexical query with none of the
    /// composition requirements.
    pub async fn keyword_search(&self, query: &str, top: i64) -> Result<SearchOutcome> {
        tracing::debug!(query, top, "performing keyword search");

        let backend_query = BackendQuery {
            search: Some(query.to_string()),
            top,
            ..Default::default()
        };

        let results = self.backend.run(&backend_query).await?;
        let items = shape_results(&results.items, &[], true, CaptionPrefs::default());

        Ok(SearchOutcome {
            search_type: "Keyword Search".to_string(),
            items,
            count: None,
            facets: None,
            applied: Default::default(),
        })
    }

    /// Simplified vector search: one probe over the default vector field
    /// with a fixed nearest-neighbor count.
    pub async fn vector_search(&self, query: &str, top: i64) -> Result<SearchOutcome> {
        tracing::debug!(query, top, "performing vector search");

        let backend_query = BackendQuery {
            vector_queries: vec![VectorQuery::text_query(query, "text_vector", VECTOR_TOOL_K)],
            top,
            ..Default::default()
        };

        let results = self.backend.run(&backend_query).await?;
        let items = shape_results(&results.items, &[], true, CaptionPrefs::default());

        Ok(SearchOutcome {
            search_type: "Vector Search".to_string(),
            items,
            count: None,
            facets: None,
            applied: Default::default(),
        })
    }

    async fn run(&self, input: &QueryInput, search_type: &str) -> Result<SearchOutcome> {
        let composed = compose(input, &self.defaults)?;

        tracing::debug!(
            query = %serde_json::to_string(&composed.query).unwrap_or_default(),
            "search payload"
        );

        let results = self.backend.run(&composed.query).await?;

        let items = shape_results(
            &results.items,
            &composed.select_fields,
            composed.include_scores,
            composed.caption_prefs,
        );

        let count = if composed.count_requested {
            results.count
        } else {
            None
        };

        Ok(SearchOutcome {
            search_type: search_type.to_string(),
            items,
            count,
            facets: results.facets,
            applied: composed.applied,
        })
    }
}
