//! Agent answer → candidates.
//!
//! The agent is asked for a bare JSON array but language models wrap it in
//! code fences or add a sentence around it often enough that both are
//! tolerated here.

use cashwatch_core::{Error, Result};
use cashwatch_reconcile::Candidate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)\s*```").unwrap());

/// Candidates parsed from one agent answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedBatch {
    pub candidates: Vec<Candidate>,
    /// Array elements that were not valid candidate objects.
    pub malformed: usize,
}

/// Parse the agent's final answer.
///
/// Fails if no JSON array can be found. Individual malformed elements are
/// skipped and counted.
pub fn parse_agent_output(text: &str) -> Result<ParsedBatch> {
    let items = extract_array(text)?;
    let mut batch = ParsedBatch::default();

    for item in &items {
        match Candidate::from_value(item) {
            Ok(candidate) => batch.candidates.push(candidate),
            Err(e) => {
                debug!("Skipping malformed candidate: {}", e);
                batch.malformed += 1;
            }
        }
    }

    Ok(batch)
}

fn extract_array(text: &str) -> Result<Vec<serde_json::Value>> {
    let body = CODE_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
        .trim();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        return into_array(value);
    }

    // Prose around the array: take the outermost brackets.
    if let (Some(start), Some(end)) = (body.find('['), body.rfind(']')) {
        if start < end {
            let value: serde_json::Value = serde_json::from_str(&body[start..=end])
                .map_err(|e| Error::Parse(format!("agent output is not JSON: {}", e)))?;
            return into_array(value);
        }
    }

    Err(Error::Parse(format!(
        "no JSON array in agent output: {:?}",
        truncate(text, 120)
    )))
}

fn into_array(value: serde_json::Value) -> Result<Vec<serde_json::Value>> {
    match value {
        serde_json::Value::Array(items) => Ok(items),
        // Some agents double-encode: the answer is a JSON string holding the array.
        serde_json::Value::String(inner) => extract_array(&inner),
        other => Err(Error::Parse(format!(
            "expected a JSON array, got {}",
            truncate(&other.to_string(), 120)
        ))),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
