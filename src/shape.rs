//! Result shaping: projecting raw backend documents into compact entries.
//!
//! With an explicit field selection the projection is exact; without one a
//! title-priority fallback picks the most presentable fields. Caption and
//! score handling follow the preferences decided at composition time.

use serde_json::{Map, Value};

use crate::compose::CaptionPrefs;

const TITLE_FIELD_ORDER: [&str; 6] = ["title", "Title", "name", "Name", "FullName", "fullName"];

fn is_present(value: &Value) -> bool {
    !matches!(value, Value::Null) && value.as_str() != Some("")
}

/// Shape one page of backend documents into response entries, in order.
pub fn shape_results(
    items: &[Map<String, Value>],
    select_fields: &[String],
    include_scores: bool,
    caption_prefs: CaptionPrefs,
) -> Vec<Map<String, Value>> {
    let mut shaped = Vec::with_capacity(items.len());

    for doc in items {
        let mut entry = Map::new();

        if !select_fields.is_empty() {
            for field in select_fields {
                if let Some(value) = doc.get(field).filter(|v| is_present(v)) {
                    entry.insert(field.clone(), value.clone());
                }
            }
        } else {
            for field in TITLE_FIELD_ORDER {
                if entry.contains_key(field) {
                    continue;
                }
                if let Some(value) = doc.get(field).filter(|v| is_present(v)) {
                    entry.insert(field.to_string(), value.clone());
                }
            }

            if let Some(content) = doc.get("content").filter(|v| is_present(v)) {
                entry.insert("content".to_string(), content.clone());
            }

            let chunk = doc
                .get("chunk")
                .filter(|v| is_present(v))
                .or_else(|| doc.get("Chunk").filter(|v| is_present(v)));
            if let Some(chunk) = chunk {
                entry.insert("chunk".to_string(), chunk.clone());
            }
        }

        if caption_prefs.requested {
            if let Some(caption) = extract_caption(doc, caption_prefs.highlight) {
                entry.insert("@search.caption".to_string(), Value::String(caption));
            }
        }

        if include_scores {
            if let Some(score) = doc.get("@search.score").filter(|v| !v.is_null()) {
                entry.insert("@search.score".to_string(), score.clone());
            }
            if let Some(score) = doc.get("@search.rerankerScore").filter(|v| !v.is_null()) {
                entry.insert("@search.rerankerScore".to_string(), score.clone());
            }
        }

        // Last resort: show the document's own non-metadata fields rather
        // than an empty entry.
        if entry.is_empty() {
            for (key, value) in doc {
                if key.starts_with('@') {
                    continue;
                }
                if is_present(value) {
                    entry.insert(key.clone(), value.clone());
                }
            }
            if include_scores && !entry.contains_key("@search.score") {
                let score = doc.get("@search.score").cloned().unwrap_or(Value::from(0));
                entry.insert("@search.score".to_string(), score);
            }
        }

        shaped.push(entry);
    }

    tracing::debug!("shaped {} search results", shaped.len());
    shaped
}

/// Pick the caption string from the first caption object, preferring
/// highlights only when highlighting was requested.
fn extract_caption(doc: &Map<String, Value>, highlight_requested: bool) -> Option<String> {
    let captions = doc.get("@search.captions")?.as_array()?;
    let first = captions.first()?.as_object()?;

    let text_of = |key: &str| -> String {
        first
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string()
    };

    let highlight_text = text_of("highlights");
    let caption_text = text_of("text");

    let chosen = if highlight_requested && !highlight_text.is_empty() {
        highlight_text
    } else {
        caption_text
    };

    if chosen.is_empty() {
        None
    } else {
        Some(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test doc must be an object"),
        }
    }

    fn no_captions() -> CaptionPrefs {
        CaptionPrefs::default()
    }

    #[test]
    fn explicit_selection_projects_exactly_and_drops_missing() {
        let docs = vec![doc(json!({
            "title": "Engineer",
            "content": "body",
            "extra": "ignored",
        }))];
        let select = vec!["title".to_string(), "missing".to_string()];
        let shaped = shape_results(&docs, &select, false, no_captions());

        assert_eq!(shaped.len(), 1);
        assert_eq!(shaped[0].get("title"), Some(&json!("Engineer")));
        assert!(!shaped[0].contains_key("missing"));
        assert!(!shaped[0].contains_key("content"));
        assert!(!shaped[0].contains_key("extra"));
    }

    #[test]
    fn empty_string_values_are_treated_as_absent() {
        let docs = vec![doc(json!({"title": "", "name": "Fallback", "content": ""}))];
        let shaped = shape_results(&docs, &[], false, no_captions());
        assert!(!shaped[0].contains_key("title"));
        assert_eq!(shaped[0].get("name"), Some(&json!("Fallback")));
        assert!(!shaped[0].contains_key("content"));
    }

    #[test]
    fn default_projection_collects_title_variants_content_and_chunk() {
        let docs = vec![doc(json!({
            "Title": "Doc",
            "FullName": "Jan Kowalski",
            "content": "body",
            "Chunk": "chunk text",
        }))];
        let shaped = shape_results(&docs, &[], false, no_captions());
        assert_eq!(shaped[0].get("Title"), Some(&json!("Doc")));
        assert_eq!(shaped[0].get("FullName"), Some(&json!("Jan Kowalski")));
        assert_eq!(shaped[0].get("content"), Some(&json!("body")));
        assert_eq!(shaped[0].get("chunk"), Some(&json!("chunk text")));
    }

    #[test]
    fn chunk_falls_back_to_capitalized_variant() {
        let docs = vec![doc(json!({"chunk": "lower", "Chunk": "upper"}))];
        let shaped = shape_results(&docs, &[], false, no_captions());
        assert_eq!(shaped[0].get("chunk"), Some(&json!("lower")));
    }

    #[test]
    fn scores_are_included_only_on_request() {
        let docs = vec![doc(json!({
            "title": "Doc",
            "@search.score": 1.5,
            "@search.rerankerScore": 2.5,
        }))];

        let shaped = shape_results(&docs, &[], false, no_captions());
        assert!(!shaped[0].contains_key("@search.score"));

        let shaped = shape_results(&docs, &[], true, no_captions());
        assert_eq!(shaped[0].get("@search.score"), Some(&json!(1.5)));
        assert_eq!(shaped[0].get("@search.rerankerScore"), Some(&json!(2.5)));
    }

    #[test]
    fn caption_prefers_highlights_when_requested() {
        let docs = vec![doc(json!({
            "title": "Doc",
            "@search.captions": [
                {"text": "plain text", "highlights": "<em>rich</em> text"},
                {"text": "second", "highlights": ""},
            ],
        }))];

        let prefs = CaptionPrefs {
            requested: true,
            highlight: true,
        };
        let shaped = shape_results(&docs, &[], false, prefs);
        assert_eq!(
            shaped[0].get("@search.caption"),
            Some(&json!("<em>rich</em> text"))
        );

        let prefs = CaptionPrefs {
            requested: true,
            highlight: false,
        };
        let shaped = shape_results(&docs, &[], false, prefs);
        assert_eq!(shaped[0].get("@search.caption"), Some(&json!("plain text")));
    }

    #[test]
    fn caption_highlight_request_falls_back_to_text() {
        let docs = vec![doc(json!({
            "title": "Doc",
            "@search.captions": [{"text": "only text", "highlights": ""}],
        }))];
        let prefs = CaptionPrefs {
            requested: true,
            highlight: true,
        };
        let shaped = shape_results(&docs, &[], false, prefs);
        assert_eq!(shaped[0].get("@search.caption"), Some(&json!("only text")));
    }

    #[test]
    fn captions_are_ignored_unless_requested() {
        let docs = vec![doc(json!({
            "title": "Doc",
            "@search.captions": [{"text": "text"}],
        }))];
        let shaped = shape_results(&docs, &[], false, no_captions());
        assert!(!shaped[0].contains_key("@search.caption"));
    }

    #[test]
    fn empty_entries_fall_back_to_non_metadata_fields() {
        let docs = vec![doc(json!({
            "@search.score": 0.5,
            "id": "doc-1",
            "category": "misc",
            "blank": "",
        }))];
        let shaped = shape_results(&docs, &["nope".to_string()], false, no_captions());
        assert_eq!(shaped[0].get("id"), Some(&json!("doc-1")));
        assert_eq!(shaped[0].get("category"), Some(&json!("misc")));
        assert!(!shaped[0].contains_key("blank"));
        assert!(!shaped[0].contains_key("@search.score"));
    }

    #[test]
    fn fallback_adds_zero_score_when_scores_requested() {
        let docs = vec![doc(json!({"@search.highlights": "x"}))];
        let shaped = shape_results(&docs, &[], true, no_captions());
        assert_eq!(shaped[0].get("@search.score"), Some(&json!(0)));
    }

    #[test]
    fn order_is_preserved() {
        let docs = vec![
            doc(json!({"title": "first"})),
            doc(json!({"title": "second"})),
        ];
        let shaped = shape_results(&docs, &[], false, no_captions());
        assert_eq!(shaped[0].get("title"), Some(&json!("first")));
        assert_eq!(shaped[1].get("title"), Some(&json!("second")));
    }
}
