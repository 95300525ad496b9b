//! Recover the JSON result from analytics process output.
//!
//! The scripts may print log or diagnostic lines before their result, so the
//! result is taken to be everything from the first `{` through a `}` that
//! ends the output. Output holding several objects, or trailing text after
//! the object, is not supported: the former surfaces as
//! [`InsightError::MalformedOutput`], the latter as
//! [`InsightError::NoStructuredOutput`].

use crate::error::{InsightError, Result};
use crate::models::InsightRecord;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::{debug, error};

const PREVIEW_CHARS: usize = 200;

static TRAILING_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[\s\S]*\}$").expect("trailing object pattern is valid"));

/// Extract and parse the trailing JSON object from `output`.
pub fn extract_record(output: &str) -> Result<InsightRecord> {
    let clean = output.trim();

    let Some(matched) = TRAILING_OBJECT.find(clean) else {
        return Err(InsightError::NoStructuredOutput {
            preview: preview(clean),
        });
    };

    if matched.start() > 0 {
        debug!(
            "Skipping {} bytes of leading diagnostic output",
            matched.start()
        );
    }

    let raw = matched.as_str();
    match serde_json::from_str::<Map<String, Value>>(raw) {
        Ok(fields) => Ok(InsightRecord::new(fields)),
        Err(source) => {
            error!("Failed to parse JSON from process output: {}", source);
            error!("Full output:\n{}", output);
            Err(InsightError::MalformedOutput {
                raw: raw.to_string(),
                source,
            })
        }
    }
}

/// Parse `output` as a JSON document of any shape.
///
/// Output that is not a JSON document on its own is handled like
/// [`extract_record`], so leading log lines still work for object results.
pub fn extract_value(output: &str) -> Result<Value> {
    let clean = output.trim();
    if let Ok(value) = serde_json::from_str::<Value>(clean) {
        return Ok(value);
    }
    extract_record(clean).map(InsightRecord::into_value)
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}
