//! MCP tool surface: definitions, argument decoding, and dispatch.
//!
//! Three tools are exposed. `search` is the full pipeline with every
//! composition knob; `keyword_search` and `vector_search` are simplified
//! single-purpose entry points. Failures inside a tool never become
//! protocol errors: they are reported as `{error, searchType}` payloads so
//! callers can always inspect what went wrong.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::SearchClient;
use crate::compose::SearchRequest;
use crate::envelope::SearchOutcome;
use crate::error::{BridgeError, Result};

/// A tool advertised through `tools/list`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

const DEFAULT_SIMPLE_TOP: i64 = 5;

fn default_simple_top() -> i64 {
    DEFAULT_SIMPLE_TOP
}

#[derive(Debug, Deserialize)]
struct SimpleQueryArgs {
    query: String,
    #[serde(default = "default_simple_top")]
    top: i64,
}

/// Which simplified entry point a `tools/call` targets.
#[derive(Debug, Clone, Copy)]
enum SimpleTool {
    Keyword,
    Vector,
}

impl SimpleTool {
    fn search_type(self) -> &'static str {
        match self {
            SimpleTool::Keyword => "Keyword Search",
            SimpleTool::Vector => "Vector Search",
        }
    }
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "search",
            description: "Run a search (lexical, vector, or hybrid) against the configured \
                          index. Provide `search` for lexical matching, `vectors` for \
                          semantic-similarity probes, or both for hybrid ranking.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "search": {
                        "type": "string",
                        "description": "Lexical search expression. Supports phrase matching, logical operators, required (+), negation, and wildcards. Leave empty for vector-only search."
                    },
                    "vectors": {
                        "type": ["string", "array"],
                        "description": "Vector descriptors. Each entry is a plain string (text only) or a `[text, k, weight, query_rewrites]` tuple with the trailing elements optional. Strings can also be supplied one per line."
                    },
                    "vector_ks": {
                        "type": ["string", "array"],
                        "description": "Per-vector nearest-neighbor counts, index-aligned with `vectors`. A shorter list repeats its last value across the remaining vectors; takes precedence over a k inside a descriptor tuple."
                    },
                    "vector_weights": {
                        "type": ["string", "array"],
                        "description": "Per-vector blending weights, index-aligned with `vectors`. A shorter list repeats its last value across the remaining vectors; takes precedence over a weight inside a descriptor tuple."
                    },
                    "select": {
                        "type": ["string", "array"],
                        "description": "Fields to include in the response. Comma-separated string or list."
                    },
                    "query_type": {
                        "type": "string",
                        "description": "Query interpretation: `simple`, `full`, or `semantic` for semantic re-ranking."
                    },
                    "query_language": {
                        "type": "string",
                        "description": "IETF language tag such as `en-US`. Required for semantic queries unless configured as a default."
                    },
                    "query_rewrites": {
                        "type": "string",
                        "description": "Semantic query rewrites directive, e.g. `generative|count-5`."
                    },
                    "semantic_configuration": {
                        "type": "string",
                        "description": "Semantic configuration name. Required unless configured as a default."
                    },
                    "captions": {
                        "type": "string",
                        "description": "Captions behavior, e.g. `extractive|highlight-true`. Leave empty to disable."
                    },
                    "answers": {
                        "type": "string",
                        "description": "Answers behavior, e.g. `extractive|count-3`. Leave empty to disable."
                    },
                    "filter": {
                        "type": "string",
                        "description": "OData filter expression."
                    },
                    "order_by": {
                        "type": ["string", "array"],
                        "description": "Order-by clause(s), e.g. `@search.score desc`."
                    },
                    "facets": {
                        "type": ["string", "array"],
                        "description": "Facet expressions, e.g. `Department,count:10,sort:count`."
                    },
                    "vector_filter_mode": {
                        "type": "string",
                        "description": "`preFilter`, `postFilter`, or `strictPostFilter`."
                    },
                    "skip": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Results to skip for server-side pagination."
                    },
                    "debug": {
                        "type": "string",
                        "description": "Backend debug option, e.g. `queryRewrites`."
                    },
                    "search_mode": {
                        "type": "string",
                        "description": "`all` requires every term, `any` matches on any term."
                    },
                    "search_fields": {
                        "type": ["string", "array"],
                        "description": "Fields targeted by the lexical query. Required for lexical queries unless configured as a default."
                    },
                    "vector_fields": {
                        "type": ["string", "array"],
                        "description": "Vector fields to probe. Defaults to the configured fields or `text_vector`."
                    },
                    "vector_default_k": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Fallback nearest-neighbor count for vectors without an explicit k."
                    },
                    "vector_default_weight": {
                        "type": "number",
                        "exclusiveMinimum": 0,
                        "description": "Fallback blending weight for vectors without an explicit weight."
                    },
                    "top": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 2000,
                        "description": "Maximum number of results to return. Defaults to 20."
                    },
                    "count": {
                        "type": "boolean",
                        "description": "Request the total match count. Adds latency."
                    },
                    "include_scores": {
                        "type": "boolean",
                        "description": "Include ranking scores in the response entries."
                    }
                }
            }),
        },
        ToolDefinition {
            name: "keyword_search",
            description: "Perform a keyword-based search on the index.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "The search query text."},
                    "top": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum number of results to return. Defaults to 5."
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "vector_search",
            description: "Perform a vector similarity search on the index.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "The search query text."},
                    "top": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum number of results to return. Defaults to 5."
                    }
                },
                "required": ["query"]
            }),
        },
    ]
}

/// Dispatch a `tools/call` invocation.
///
/// Returns `Err` only for an unknown tool name; everything that goes wrong
/// inside a known tool is folded into its result payload.
pub async fn call_tool(
    client: Option<&SearchClient>,
    name: &str,
    arguments: Value,
) -> Result<Value> {
    match name {
        "search" => Ok(run_search(client, arguments).await),
        "keyword_search" => Ok(run_simple(client, arguments, SimpleTool::Keyword).await),
        "vector_search" => Ok(run_simple(client, arguments, SimpleTool::Vector).await),
        other => Err(BridgeError::InvalidInput(format!("Unknown tool: {other}"))),
    }
}

async fn run_search(client: Option<&SearchClient>, arguments: Value) -> Value {
    tracing::info!("tool called: search");

    let Some(client) = client else {
        return error_result(&BridgeError::NotInitialized.to_string(), "Search");
    };

    let request: SearchRequest = match serde_json::from_value(arguments) {
        Ok(request) => request,
        Err(e) => return error_result(&format!("Invalid search arguments: {e}"), "Search"),
    };

    match client.search(request).await {
        Ok(outcome) => success_result(&outcome),
        Err(BridgeError::InvalidInput(message)) => error_result(&message, "Search"),
        Err(e) => {
            let message = format!("Error performing search: {e}");
            tracing::error!("{message}");
            error_result(&message, "Search")
        }
    }
}

async fn run_simple(client: Option<&SearchClient>, arguments: Value, tool: SimpleTool) -> Value {
    let search_type = tool.search_type();

    let Some(client) = client else {
        return error_result(&BridgeError::NotInitialized.to_string(), search_type);
    };

    let args: SimpleQueryArgs = match serde_json::from_value(arguments) {
        Ok(args) => args,
        Err(e) => {
            return error_result(&format!("Invalid arguments: {e}"), search_type);
        }
    };

    tracing::info!(query = %args.query, top = args.top, "tool called: {search_type}");

    let outcome = match tool {
        SimpleTool::Keyword => client.keyword_search(&args.query, args.top).await,
        SimpleTool::Vector => client.vector_search(&args.query, args.top).await,
    };

    match outcome {
        Ok(outcome) => success_result(&outcome),
        Err(e) => {
            let label = search_type.to_lowercase();
            let message = format!("Error performing {label}: {e}");
            tracing::error!("{message}");
            error_result(&message, search_type)
        }
    }
}

fn success_result(outcome: &SearchOutcome) -> Value {
    json!({
        "content": [{"type": "text", "text": outcome.render_markdown()}],
        "structuredContent": outcome.to_value(),
    })
}

fn error_result(message: &str, search_type: &str) -> Value {
    json!({
        "content": [{"type": "text", "text": message}],
        "structuredContent": {"error": message, "searchType": search_type},
        "isError": true,
    })
}
