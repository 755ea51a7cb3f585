//! Strict parsing of model responses
//!
//! Responses are free text that should contain one JSON object. The object is
//! located (fenced block, bare fence, or outermost braces), trailing commas are
//! removed, and the payload is checked field by field. A response without the
//! expected top-level shape is a [`ParseError`]; individual malformed entries are
//! rejected with a reason and the rest are kept.

use crate::comparison::{Metric, Segment};
use crate::evaluation::hypothesis::clamp_unit;
use crate::evaluation::{Direction, Hypothesis};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// A response that could not be turned into the expected structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No JSON object found in the text
    #[error("Parse error: response contains no JSON object")]
    NoJson,

    /// The JSON could not be decoded
    #[error("Parse error: invalid JSON: {0}")]
    InvalidJson(String),

    /// A required top-level field is absent
    #[error("Parse error: response is missing the '{0}' field")]
    MissingField(String),

    /// A top-level field has the wrong shape
    #[error("Parse error: field '{field}' must be {expected}")]
    WrongType {
        /// Field name
        field: String,
        /// Expected shape
        expected: &'static str,
    },
}

/// A hypothesis entry that was dropped during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedHypothesis {
    /// Position in the response array
    pub index: usize,
    /// Entry id, if it had one
    pub id: Option<String>,
    /// Why it was dropped
    pub reason: String,
}

/// Hypotheses accepted from one response plus the entries that were dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedHypotheses {
    /// Well-formed hypotheses with unique ids, in response order
    pub hypotheses: Vec<Hypothesis>,
    /// Malformed or duplicate entries
    pub rejected: Vec<RejectedHypothesis>,
}

#[derive(Deserialize)]
struct RawHypothesis {
    #[serde(alias = "hypothesis_id")]
    id: String,
    #[serde(alias = "claim", alias = "description")]
    claim_text: String,
    #[serde(alias = "metric")]
    target_metric: Metric,
    #[serde(default, alias = "segment")]
    target_segment: Option<Segment>,
    #[serde(alias = "direction")]
    claimed_direction: Direction,
    #[serde(default, alias = "confidence")]
    preliminary_confidence: Option<f64>,
}

/// Locate the JSON object in a model response.
///
/// # Errors
///
/// Returns [`ParseError::NoJson`] if the text holds no `{...}` block.
pub fn extract_json(text: &str) -> Result<String, ParseError> {
    let candidate = fenced_block(text).unwrap_or(text);
    let start = candidate.find('{').ok_or(ParseError::NoJson)?;
    let end = candidate.rfind('}').ok_or(ParseError::NoJson)?;
    if end < start {
        return Err(ParseError::NoJson);
    }
    Ok(strip_trailing_commas(&candidate[start..=end]))
}

fn fenced_block(text: &str) -> Option<&str> {
    let body_start = match text.find("```json") {
        Some(pos) => pos + "```json".len(),
        None => text.find("```")? + 3,
    };
    let rest = &text[body_start..];
    let end = rest.find("```").unwrap_or(rest.len());
    let body = &rest[..end];
    body.contains('{').then_some(body)
}

/// Remove commas that directly precede `}` or `]`, outside string literals.
fn strip_trailing_commas(json: &str) -> String {
    let chars: Vec<char> = json.chars().collect();
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if !matches!(next, Some('}' | ']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Decode the JSON object of a response.
///
/// # Errors
///
/// Returns [`ParseError::NoJson`] or [`ParseError::InvalidJson`].
pub fn parse_object(text: &str) -> Result<Value, ParseError> {
    let json = extract_json(text)?;
    let value: Value =
        serde_json::from_str(&json).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(ParseError::WrongType {
            field: "<root>".to_string(),
            expected: "an object",
        })
    }
}

/// Required array field of a response object.
pub(crate) fn array_field<'a>(value: &'a Value, field: &str) -> Result<&'a Vec<Value>, ParseError> {
    value
        .get(field)
        .ok_or_else(|| ParseError::MissingField(field.to_string()))?
        .as_array()
        .ok_or_else(|| ParseError::WrongType {
            field: field.to_string(),
            expected: "an array",
        })
}

/// Parse a hypothesis-generation response.
///
/// Expected shape: `{"hypotheses": [{"id", "claim_text", "target_metric",
/// "target_segment", "claimed_direction", "preliminary_confidence"}, ...]}`.
/// `target_segment` defaults to overall and `preliminary_confidence` to 0.5.
///
/// # Errors
///
/// Returns a [`ParseError`] if the response has no JSON object or no
/// `hypotheses` array. Malformed entries are reported in
/// [`ParsedHypotheses::rejected`] instead.
pub fn parse_hypotheses(text: &str) -> Result<ParsedHypotheses, ParseError> {
    let value = parse_object(text)?;
    let entries = array_field(&value, "hypotheses")?;

    let mut parsed = ParsedHypotheses::default();
    let mut seen = HashSet::new();

    for (index, entry) in entries.iter().enumerate() {
        let id = entry
            .get("id")
            .or_else(|| entry.get("hypothesis_id"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let reject = |reason: String| RejectedHypothesis {
            index,
            id: id.clone(),
            reason,
        };

        let raw = match RawHypothesis::deserialize(entry) {
            Ok(raw) => raw,
            Err(e) => {
                parsed.rejected.push(reject(format!("malformed entry: {e}")));
                continue;
            }
        };
        if raw.id.trim().is_empty() {
            parsed.rejected.push(reject("empty id".to_string()));
            continue;
        }
        if raw.claim_text.trim().is_empty() {
            parsed.rejected.push(reject("empty claim text".to_string()));
            continue;
        }
        if !seen.insert(raw.id.clone()) {
            parsed
                .rejected
                .push(reject(format!("duplicate id '{}'", raw.id)));
            continue;
        }

        parsed.hypotheses.push(Hypothesis {
            id: raw.id,
            claim_text: raw.claim_text,
            target_metric: raw.target_metric,
            target_segment: raw.target_segment.unwrap_or(Segment::Overall),
            claimed_direction: raw.claimed_direction,
            preliminary_confidence: raw.preliminary_confidence.map_or(0.5, clamp_unit),
        });
    }

    for rejected in &parsed.rejected {
        tracing::warn!(
            index = rejected.index,
            id = rejected.id.as_deref().unwrap_or("-"),
            reason = %rejected.reason,
            "hypothesis rejected"
        );
    }

    Ok(parsed)
}
