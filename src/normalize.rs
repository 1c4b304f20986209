//! Result normalization: feed tokens to canonical outcome sequences.

use serde_json::Value;

use crate::config::{MAX_RESULTS, RESULT_DELIMITER};
use crate::error::{IngestError, IngestResult};
use crate::types::{Outcome, ResultSet};

/// Normalize a feed `recentResults` array.
///
/// Keeps the first [`MAX_RESULTS`] entries in source order. Each entry is an
/// array whose first element is the token, e.g. `["14x2"]`; everything from
/// the delimiter onward is dropped before parsing.
pub fn normalize(raw: &[Value]) -> IngestResult<ResultSet> {
    raw.iter()
        .take(MAX_RESULTS)
        .enumerate()
        .map(|(index, entry)| parse_entry(index, entry))
        .collect::<IngestResult<Vec<_>>>()
        .map(ResultSet::new)
}

fn parse_entry(index: usize, entry: &Value) -> IngestResult<Outcome> {
    let first = match entry {
        Value::Array(items) => items.first(),
        // Tolerate a flat array of tokens
        other => Some(other),
    };

    match first {
        Some(Value::String(token)) => parse_token(index, token),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| Outcome::try_from(v).ok())
            .ok_or_else(|| malformed(index, &n.to_string())),
        Some(other) => Err(malformed(index, &other.to_string())),
        None => Err(malformed(index, "")),
    }
}

/// Strip the annotation suffix and parse the leading outcome.
pub fn parse_token(index: usize, token: &str) -> IngestResult<Outcome> {
    let head = token.split(RESULT_DELIMITER).next().unwrap_or_default().trim();
    head.parse::<Outcome>().map_err(|_| malformed(index, token))
}

fn malformed(index: usize, token: &str) -> IngestError {
    IngestError::MalformedResult {
        token: token.to_string(),
        index,
    }
}
