//! Turning raw oracle answers into yes/no decisions.

use serde::{Deserialize, Serialize};
use tracing::debug;

const TRACE_OPEN: &str = "<trace>";
const TRACE_CLOSE: &str = "</trace>";
const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// How a chat answer is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseParser {
    /// Reads the first `<trace>...</trace>` span (case-insensitive). An answer
    /// without a closed span counts as unrelated.
    #[default]
    TraceTag,
    /// Substring test after dropping a leading `<think>...</think>` block.
    Substring,
}

impl ResponseParser {
    pub fn is_related(&self, response: &str) -> bool {
        match self {
            ResponseParser::TraceTag => match trace_span(response) {
                Some(span) => span.to_lowercase().contains("yes"),
                None => {
                    debug!(len = response.len(), "No trace span in answer, treating as unrelated");
                    false
                }
            },
            ResponseParser::Substring => says_yes(strip_reasoning(response)),
        }
    }
}

fn says_yes(text: &str) -> bool {
    text.to_lowercase().contains("yes")
}

/// Text between the first `<trace>` and the following `</trace>`.
fn trace_span(response: &str) -> Option<&str> {
    // ASCII lowercasing keeps byte offsets aligned with `response`
    let lowered = response.to_ascii_lowercase();
    let start = lowered.find(TRACE_OPEN)? + TRACE_OPEN.len();
    let len = lowered[start..].find(TRACE_CLOSE)?;
    Some(&response[start..start + len])
}

/// Drops a leading reasoning block emitted by thinking models.
fn strip_reasoning(response: &str) -> &str {
    if response.starts_with(THINK_OPEN)
        && let Some(end) = response.find(THINK_CLOSE)
    {
        return response[end + THINK_CLOSE.len()..].trim();
    }
    response
}
