//! Response envelope: the structured payload returned to tool callers and
//! its markdown rendering.

use serde_json::{json, Map, Value};

/// A completed search, ready to hand back to the caller.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Human-readable label for the tool that ran ("Search", "Keyword
    /// Search", "Vector Search").
    pub search_type: String,
    /// Shaped result entries, in backend ranking order.
    pub items: Vec<Map<String, Value>>,
    /// Total match count when requested, null otherwise.
    pub count: Option<i64>,
    /// Facet buckets when requested, null otherwise.
    pub facets: Option<Value>,
    /// Echo of the parameters actually sent to the backend.
    pub applied: Map<String, Value>,
}

impl SearchOutcome {
    /// Structured JSON payload. `count` and `facets` are always present so
    /// callers can branch on them without key checks.
    pub fn to_value(&self) -> Value {
        json!({
            "searchType": self.search_type,
            "items": self.items,
            "count": self.count,
            "facets": self.facets,
            "applied": self.applied,
        })
    }

    /// Markdown rendering for callers that prefer prose over JSON.
    pub fn render_markdown(&self) -> String {
        if self.items.is_empty() {
            return format!("No results found for your query using {}.", self.search_type);
        }

        let mut lines: Vec<String> = vec![format!("## {} Results\n", self.search_type)];

        if let Some(count) = self.count {
            lines.push(format!(
                "Total matches reported by the search service: {count}\n"
            ));
        }

        for (i, item) in self.items.iter().enumerate() {
            lines.push(format!("### {}. {}", i + 1, display_title(item)));
            if let Some(score) = display_score(item) {
                lines.push(format!("Score: {score:.2}\n"));
            }
            lines.push(format!("{}\n", display_content(item)));
            lines.push("---\n".to_string());
        }

        if !self.applied.is_empty() {
            lines.push("### Applied search parameters\n".to_string());
            for (key, value) in &self.applied {
                lines.push(format!("- {key}: {}", display_value(value)));
            }
            lines.push(String::new());
        }

        lines.join("\n")
    }
}

fn display_title(item: &Map<String, Value>) -> String {
    for key in ["title", "Title", "name", "Name", "FullName", "fullName"] {
        if let Some(title) = item.get(key).and_then(Value::as_str) {
            if !title.is_empty() {
                return title.to_string();
            }
        }
    }
    "Untitled".to_string()
}

fn display_score(item: &Map<String, Value>) -> Option<f64> {
    item.get("@search.score").and_then(Value::as_f64)
}

fn display_content(item: &Map<String, Value>) -> String {
    for key in ["content", "chunk", "@search.caption"] {
        if let Some(content) = item.get(key).and_then(Value::as_str) {
            if !content.is_empty() {
                return content.to_string();
            }
        }
    }
    String::new()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
