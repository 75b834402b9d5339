//! Query composition: reconciling per-call parameters, process-wide
//! defaults, and backend-mandated requirements into one backend query.
//!
//! `compose` is a pure function of its inputs. It resolves every "effective"
//! value (call argument, then process default, then hardcoded fallback),
//! enforces the conditional requirements, broadcasts per-vector settings,
//! and records the applied-parameter echo that mirrors exactly what will be
//! sent. Validation failures abort before any backend contact.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::RuntimeDefaults;
use crate::error::{BridgeError, Result};
use crate::normalize::{self, field_list_value, vector_field_selector};
use crate::options::{parse_answers, parse_captions};
use crate::vectors::{parse_vectors, VectorDescriptor};

/// Default result window when the caller does not specify `top`.
pub const DEFAULT_TOP: i64 = 20;
/// Upper bound on `top`, matching the tool schema.
pub const MAX_TOP: i64 = 2000;

/// Raw arguments of the unified `search` tool, before normalization.
///
/// List-valued fields accept a native array, a delimited string, or a JSON
/// array encoded in a string; they are canonicalized by [`SearchRequest::into_input`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchRequest {
    pub search: Option<String>,
    pub vectors: Option<Value>,
    pub vector_ks: Option<Value>,
    pub vector_weights: Option<Value>,
    pub select: Option<Value>,
    pub query_type: Option<String>,
    pub query_language: Option<String>,
    pub query_rewrites: Option<String>,
    pub semantic_configuration: Option<String>,
    pub captions: Option<String>,
    pub answers: Option<String>,
    pub filter: Option<String>,
    pub order_by: Option<Value>,
    pub facets: Option<Value>,
    pub vector_filter_mode: Option<String>,
    pub skip: Option<i64>,
    pub debug: Option<String>,
    pub search_mode: Option<String>,
    pub search_fields: Option<Value>,
    pub vector_fields: Option<Value>,
    pub vector_default_k: Option<u32>,
    pub vector_default_weight: Option<f64>,
    pub top: Option<i64>,
    pub count: bool,
    pub include_scores: bool,
}

impl SearchRequest {
    /// Canonicalize union-shaped fields into a [`QueryInput`].
    ///
    /// Vector descriptors are split into index-aligned text/k/weight/rewrites
    /// lists the way the composer consumes them; standalone `vector_ks` /
    /// `vector_weights` lists are merged over the descriptor columns.
    pub fn into_input(self) -> Result<QueryInput> {
        let descriptors: Vec<VectorDescriptor> = parse_vectors(self.vectors.as_ref());

        let k_overrides = normalize::int_list(self.vector_ks.as_ref())?
            .into_iter()
            .map(|k| {
                u32::try_from(k).map_err(|_| {
                    BridgeError::InvalidInput(format!("Unable to parse integer from '{k}'"))
                })
            })
            .collect::<Result<Vec<u32>>>()?;
        let weight_overrides = normalize::float_list(self.vector_weights.as_ref())?;
        let descriptor_ks: Vec<Option<u32>> = descriptors.iter().map(|d| d.k).collect();
        let descriptor_weights: Vec<Option<f64>> = descriptors.iter().map(|d| d.weight).collect();

        let top = self.top.unwrap_or(DEFAULT_TOP);
        if !(1..=MAX_TOP).contains(&top) {
            return Err(BridgeError::InvalidInput(format!(
                "`top` must be between 1 and {MAX_TOP}."
            )));
        }
        if matches!(self.skip, Some(skip) if skip < 0) {
            return Err(BridgeError::InvalidInput(
                "`skip` must be zero or greater.".to_string(),
            ));
        }

        Ok(QueryInput {
            search_text: self.search,
            vector_texts: descriptors.iter().map(|d| d.text.clone()).collect(),
            vector_ks: merge_override_column(&k_overrides, &descriptor_ks),
            vector_weights: merge_override_column(&weight_overrides, &descriptor_weights),
            vector_rewrites: descriptors.iter().map(|d| d.rewrites.clone()).collect(),
            top,
            skip: self.skip,
            count: self.count,
            select_fields: normalize::string_list(self.select.as_ref())?,
            query_type: self.query_type,
            query_language: self.query_language,
            query_rewrites: self.query_rewrites,
            semantic_configuration: self.semantic_configuration,
            captions: self.captions,
            answers: self.answers,
            filter_expression: self.filter,
            order_by: normalize::string_list(self.order_by.as_ref())?,
            facets: normalize::string_list(self.facets.as_ref())?,
            vector_filter_mode: self.vector_filter_mode,
            search_mode: self.search_mode,
            search_fields: normalize::string_list(self.search_fields.as_ref())?,
            vector_fields: normalize::string_list(self.vector_fields.as_ref())?,
            vector_default_k: self.vector_default_k,
            vector_default_weight: self.vector_default_weight,
            include_scores: self.include_scores,
            debug: self.debug,
        })
    }
}

/// Canonicalized call parameters consumed by [`compose`].
#[derive(Debug, Clone)]
pub struct QueryInput {
    pub search_text: Option<String>,
    pub vector_texts: Vec<String>,
    pub vector_ks: Vec<Option<u32>>,
    pub vector_weights: Vec<Option<f64>>,
    pub vector_rewrites: Vec<Option<String>>,
    pub top: i64,
    pub skip: Option<i64>,
    pub count: bool,
    pub select_fields: Vec<String>,
    pub query_type: Option<String>,
    pub query_language: Option<String>,
    pub query_rewrites: Option<String>,
    pub semantic_configuration: Option<String>,
    pub captions: Option<String>,
    pub answers: Option<String>,
    pub filter_expression: Option<String>,
    pub order_by: Vec<String>,
    pub facets: Vec<String>,
    pub vector_filter_mode: Option<String>,
    pub search_mode: Option<String>,
    pub search_fields: Vec<String>,
    pub vector_fields: Vec<String>,
    pub vector_default_k: Option<u32>,
    pub vector_default_weight: Option<f64>,
    pub include_scores: bool,
    pub debug: Option<String>,
}

impl Default for QueryInput {
    fn default() -> Self {
        Self {
            search_text: None,
            vector_texts: Vec::new(),
            vector_ks: Vec::new(),
            vector_weights: Vec::new(),
            vector_rewrites: Vec::new(),
            top: DEFAULT_TOP,
            skip: None,
            count: false,
            select_fields: Vec::new(),
            query_type: None,
            query_language: None,
            query_rewrites: None,
            semantic_configuration: None,
            captions: None,
            answers: None,
            filter_expression: None,
            order_by: Vec::new(),
            facets: Vec::new(),
            vector_filter_mode: None,
            search_mode: None,
            search_fields: Vec::new(),
            vector_fields: Vec::new(),
            vector_default_k: None,
            vector_default_weight: None,
            include_scores: false,
            debug: None,
        }
    }
}

/// One vector probe in the backend query, fully resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorQuery {
    pub kind: String,
    pub text: String,
    pub fields: String,
    pub k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_rewrites: Option<String>,
}

impl VectorQuery {
    pub fn text_query(text: impl Into<String>, fields: impl Into<String>, k: u32) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.into(),
            fields: fields.into(),
            k,
            weight: None,
            query_rewrites: None,
        }
    }
}

/// The backend query specification. Optional fields are omitted from the
/// serialized body entirely; omission, not null, tells the backend to use
/// its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_fields: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vector_queries: Vec<VectorQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<String>,
    pub top: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<i64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub count: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_configuration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_rewrites: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_caption_highlight_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_answer_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_answer_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(rename = "orderby", skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_filter_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}

/// Caption handling decided at composition time, consumed by the shaper.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CaptionPrefs {
    pub requested: bool,
    pub highlight: bool,
}

/// Outcome of composition: the query to send, the applied echo, and the
/// shaping preferences derived along the way.
#[derive(Debug, Clone)]
pub struct Composed {
    pub query: BackendQuery,
    pub applied: Map<String, Value>,
    pub caption_prefs: CaptionPrefs,
    pub select_fields: Vec<String>,
    pub include_scores: bool,
    pub count_requested: bool,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Merge a standalone override list over a descriptor-derived column.
///
/// The override wins at every index it covers. When no descriptor carries a
/// value of its own, the override list is passed through at its given length
/// so the reuse-last broadcast in [`compose`] still applies.
fn merge_override_column<T: Copy>(overrides: &[T], descriptors: &[Option<T>]) -> Vec<Option<T>> {
    if overrides.is_empty() {
        return descriptors.to_vec();
    }
    if descriptors.iter().all(Option::is_none) {
        return overrides.iter().copied().map(Some).collect();
    }
    let len = overrides.len().max(descriptors.len());
    (0..len)
        .map(|idx| match overrides.get(idx) {
            Some(value) => Some(*value),
            None => descriptors.get(idx).copied().flatten(),
        })
        .collect()
}

/// Resolve the query against process defaults and build the backend call.
pub fn compose(input: &QueryInput, defaults: &RuntimeDefaults) -> Result<Composed> {
    let lexical_query = input
        .search_text
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    let has_lexical = !lexical_query.is_empty();

    let vector_texts: Vec<String> = input
        .vector_texts
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    let has_vectors = !vector_texts.is_empty();

    if !has_lexical && !has_vectors {
        return Err(BridgeError::InvalidInput(
            "Provide either a non-empty `search` query, at least one vector descriptor, or both."
                .to_string(),
        ));
    }

    // The backend requires re-ranking metadata on every query issued against
    // this index, not just semantic ones.
    let semantic_configuration = non_blank(input.semantic_configuration.as_deref())
        .map(str::to_string)
        .or_else(|| defaults.semantic_configuration.clone())
        .ok_or_else(|| {
            BridgeError::InvalidInput(
                "Semantic configuration name is required. Provide it via the \
                 `semantic_configuration` parameter or set `defaults.semantic_configuration` \
                 in the configuration."
                    .to_string(),
            )
        })?;

    let effective_search_fields = if input.search_fields.is_empty() {
        defaults.search_fields.clone()
    } else {
        input.search_fields.clone()
    };
    let search_fields_value = field_list_value(&effective_search_fields);
    if has_lexical && search_fields_value.is_none() {
        return Err(BridgeError::InvalidInput(
            "Search fields are required for lexical queries. Provide them via the \
             `search_fields` parameter or set `defaults.search_fields` in the configuration."
                .to_string(),
        ));
    }

    let effective_vector_fields = if input.vector_fields.is_empty() {
        defaults.vector_fields.clone()
    } else {
        input.vector_fields.clone()
    };

    let effective_select_fields = if input.select_fields.is_empty() {
        defaults.select_fields.clone()
    } else {
        input.select_fields.clone()
    };
    let select_value = field_list_value(&effective_select_fields);

    let query_type = non_blank(input.query_type.as_deref())
        .map(str::to_string)
        .or_else(|| defaults.query_type.clone());
    let is_semantic = query_type.as_deref() == Some("semantic");

    let query_rewrites = non_blank(input.query_rewrites.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| defaults.query_rewrites.clone());

    let debug = non_blank(input.debug.as_deref())
        .map(str::to_string)
        .or_else(|| defaults.debug.clone());

    let mut search_mode = non_blank(input.search_mode.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| defaults.search_mode.clone())
        .to_lowercase();
    if has_lexical && search_mode != "any" && search_mode != "all" {
        return Err(BridgeError::InvalidInput(
            "`search_mode` must be either 'any' or 'all'.".to_string(),
        ));
    }

    // Semantic re-ranking with query rewrites needs the broader match set; a
    // deliberate override, not a user error.
    if is_semantic && !query_rewrites.is_empty() && search_mode != "any" {
        tracing::debug!("forcing search_mode to 'any' for semantic query rewrites");
        search_mode = "any".to_string();
    }

    let default_k = input
        .vector_default_k
        .filter(|k| *k != 0)
        .unwrap_or(defaults.vector_k);
    let default_weight = input
        .vector_default_weight
        .filter(|w| *w != 0.0)
        .unwrap_or(defaults.vector_weight);

    let mut resolved_ks: Vec<u32> = Vec::new();
    let mut resolved_weights: Vec<f64> = Vec::new();
    let mut vector_queries: Vec<VectorQuery> = Vec::new();
    let mut vector_field_value: Option<String> = None;

    if has_vectors {
        for idx in 0..vector_texts.len() {
            let candidate_k = if idx < input.vector_ks.len() {
                input.vector_ks[idx]
            } else {
                input.vector_ks.last().copied().flatten()
            };
            // Zero means "use the default", not "disable this vector".
            resolved_ks.push(match candidate_k {
                Some(k) if k != 0 => k,
                _ => default_k,
            });

            let candidate_weight = if idx < input.vector_weights.len() {
                input.vector_weights[idx]
            } else {
                input.vector_weights.last().copied().flatten()
            };
            resolved_weights.push(match candidate_weight {
                Some(w) if w != 0.0 => w,
                _ => default_weight,
            });
        }

        let fields = vector_field_selector(&effective_vector_fields);
        vector_field_value = Some(fields.clone());

        for (idx, text) in vector_texts.iter().enumerate() {
            let mut per_vector_rewrites = input
                .vector_rewrites
                .get(idx)
                .cloned()
                .flatten()
                .filter(|r| !r.trim().is_empty());

            // A vector probing the same text as the lexical query inherits
            // the query-level rewrites.
            if per_vector_rewrites.is_none()
                && is_semantic
                && !query_rewrites.is_empty()
                && has_lexical
                && text.to_lowercase() == lexical_query.to_lowercase()
            {
                per_vector_rewrites = Some(query_rewrites.clone());
            }

            vector_queries.push(VectorQuery {
                kind: "text".to_string(),
                text: text.clone(),
                fields: fields.clone(),
                k: resolved_ks[idx],
                weight: Some(resolved_weights[idx]),
                query_rewrites: per_vector_rewrites,
            });
        }
    }

    let mut query = BackendQuery {
        top: input.top,
        semantic_configuration: Some(semantic_configuration.clone()),
        ..Default::default()
    };

    if has_lexical {
        query.search = Some(lexical_query.clone());
        query.search_mode = Some(search_mode.clone());
        query.search_fields = search_fields_value.as_ref().map(|f| f.join(","));
    }

    if has_vectors {
        query.vector_queries = vector_queries;
    }

    if input.count {
        query.count = true;
    }

    if matches!(input.skip, Some(skip) if skip != 0) {
        query.skip = input.skip;
    }

    query.select = select_value.as_ref().map(|f| f.join(","));
    query.query_type = query_type.clone();

    let explicit_language = non_blank(input.query_language.as_deref()).map(str::to_string);
    let explicit_rewrites = non_blank(input.query_rewrites.as_deref()).map(str::to_string);

    let effective_language = if is_semantic {
        let language = explicit_language
            .clone()
            .or_else(|| defaults.query_language.clone())
            .ok_or_else(|| {
                BridgeError::InvalidInput(
                    "Query language is required for semantic queries. Provide `query_language` \
                     or set `defaults.query_language` in the configuration."
                        .to_string(),
                )
            })?;
        query.query_language = Some(language.clone());
        query.query_rewrites = Some(query_rewrites.clone());
        Some(language)
    } else {
        // Outside semantic queries, language and rewrites pass through only
        // when explicitly supplied by the caller.
        query.query_language = explicit_language.clone();
        query.query_rewrites = explicit_rewrites.clone();
        explicit_language.clone()
    };

    let mut caption_prefs = CaptionPrefs::default();
    if let Some(captions) = non_blank(input.captions.as_deref()) {
        let (options, highlight) = parse_captions(captions);
        query.query_caption = options.caption_type;
        query.query_caption_highlight_enabled = options.highlight;
        caption_prefs = CaptionPrefs {
            requested: true,
            highlight,
        };
    }

    if let Some(answers) = non_blank(input.answers.as_deref()) {
        let options = parse_answers(answers);
        query.query_answer = options.answer_type;
        query.query_answer_count = options.count;
        query.query_answer_threshold = options.threshold;
    }

    if let Some(filter) = non_blank(input.filter_expression.as_deref()) {
        query.filter = Some(filter.to_string());
    }

    if let Some(order_by) = field_list_value(&input.order_by) {
        query.order_by = Some(order_by.join(","));
    }

    if !input.facets.is_empty() {
        query.facets = input.facets.clone();
    }

    if let Some(mode) = non_blank(input.vector_filter_mode.as_deref()) {
        query.vector_filter_mode = Some(mode.to_string());
    }

    query.debug = debug.clone();

    // Applied echo: mirrors exactly what the backend call carries, for
    // caller-side debugging. Inclusion logic must stay in sync with the
    // query construction above.
    let mut applied = Map::new();
    applied.insert("top".to_string(), json!(input.top));
    applied.insert(
        "semantic_configuration".to_string(),
        json!(semantic_configuration),
    );
    applied.insert("count".to_string(), json!(input.count));
    applied.insert("captions".to_string(), json!(input.captions));
    applied.insert("answers".to_string(), json!(input.answers));
    applied.insert("include_scores".to_string(), json!(input.include_scores));

    if has_lexical {
        applied.insert("search_mode".to_string(), json!(search_mode));
        applied.insert(
            "search_fields".to_string(),
            json!(search_fields_value.as_ref().map(|f| f.join(","))),
        );
        applied.insert("query_type".to_string(), json!(query_type));
        if is_semantic {
            applied.insert("query_language".to_string(), json!(effective_language));
            applied.insert("query_rewrites".to_string(), json!(query_rewrites));
        } else if let Some(language) = &explicit_language {
            applied.insert("query_language".to_string(), json!(language));
        }
        if !is_semantic {
            if let Some(rewrites) = &explicit_rewrites {
                applied.insert("query_rewrites".to_string(), json!(rewrites));
            }
        }
    }

    if let Some(select) = &query.select {
        applied.insert("select".to_string(), json!(select));
    }

    if has_vectors {
        applied.insert("vector_fields".to_string(), json!(vector_field_value));
        applied.insert("vector_default_k".to_string(), json!(default_k));
        applied.insert("vector_default_weight".to_string(), json!(default_weight));
        applied.insert("vector_ks".to_string(), json!(resolved_ks));
        applied.insert("vector_weights".to_string(), json!(resolved_weights));
    }

    if !query.facets.is_empty() {
        applied.insert("facets".to_string(), json!(query.facets));
    }

    if let Some(mode) = &query.vector_filter_mode {
        applied.insert("vector_filter_mode".to_string(), json!(mode));
    }

    if let Some(skip) = query.skip {
        applied.insert("skip".to_string(), json!(skip));
    }

    if let Some(debug) = &query.debug {
        applied.insert("debug".to_string(), json!(debug));
    }

    Ok(Composed {
        query,
        applied,
        caption_prefs,
        select_fields: select_value.unwrap_or_default(),
        include_scores: input.include_scores,
        count_requested: input.count,
    })
}
