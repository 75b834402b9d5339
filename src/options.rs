//! Translation of compact REST-style option strings into backend flags.
//!
//! Captions and answers arrive as pipe-separated specs such as
//! `extractive|highlight-true` or `extractive|count-3|threshold-0.7`.

/// Structured caption flags for the backend query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptionOptions {
    pub caption_type: Option<String>,
    pub highlight: Option<bool>,
}

/// Structured answer flags for the backend query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerOptions {
    pub answer_type: Option<String>,
    pub count: Option<u32>,
    pub threshold: Option<f64>,
}

/// Parse a captions spec; returns the flags and whether highlighting was
/// requested (the result shaper needs the latter).
pub fn parse_captions(spec: &str) -> (CaptionOptions, bool) {
    let mut options = CaptionOptions::default();

    for part in spec.split('|').map(str::trim).filter(|p| !p.is_empty()) {
        let lowered = part.to_lowercase();
        if let Some(suffix) = lowered.strip_prefix("highlight-") {
            options.highlight = Some(suffix == "true");
        } else {
            options.caption_type = Some(part.to_string());
        }
    }

    let highlight = options.highlight.unwrap_or(false);
    (options, highlight)
}

/// Parse an answers spec. Malformed `count`/`threshold` suffixes are logged
/// and omitted; the call proceeds.
pub fn parse_answers(spec: &str) -> AnswerOptions {
    let mut options = AnswerOptions::default();

    for part in spec.split('|').map(str::trim).filter(|p| !p.is_empty()) {
        let lowered = part.to_lowercase();
        if let Some(suffix) = lowered.strip_prefix("count-") {
            match suffix.parse::<u32>() {
                Ok(count) => options.count = Some(count),
                Err(_) => tracing::warn!("unable to parse answer count from '{part}'"),
            }
        } else if let Some(suffix) = lowered.strip_prefix("threshold-") {
            match suffix.parse::<f64>() {
                Ok(threshold) => options.threshold = Some(threshold),
                Err(_) => tracing::warn!("unable to parse answer threshold from '{part}'"),
            }
        } else {
            options.answer_type = Some(part.to_string());
        }
    }

    options
}
