//! Parse model output into typed answer candidates

use crate::chunking::page_before;
use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use covenant_domain::{
    AnswerCandidate, AnswerType, AnswerValue, Chunk, Confidence, Provenance, Question,
};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

static SECTION_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bSection\s+(\d+\.\d+(?:\([A-Za-z0-9]+\))*)")
        .expect("section heading pattern is valid")
});

/// Shortest quote prefix used when the full quote cannot be located
const QUOTE_PREFIX_CHARS: usize = 60;

/// Length limits applied while coercing entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    /// Maximum characters kept from string answers
    pub max_string_chars: usize,
    /// Maximum characters kept from source quotes
    pub max_quote_chars: usize,
}

impl From<&ExtractorConfig> for ParseLimits {
    fn from(config: &ExtractorConfig) -> Self {
        Self {
            max_string_chars: config.max_string_chars,
            max_quote_chars: config.max_quote_chars,
        }
    }
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self::from(&ExtractorConfig::default())
    }
}

/// Parse a model response for one chunk
///
/// Returns at most one candidate per question in `questions`, in question
/// order. Entries for ids outside `questions` are skipped. An entry whose
/// value or confidence cannot be coerced becomes "not found" at LOW.
///
/// # Errors
///
/// `ExtractorError::Malformed` when no JSON array can be read from the
/// response at all.
pub fn parse_model_response(
    response: &str,
    chunk: &Chunk,
    questions: &[&Question],
    limits: &ParseLimits,
) -> Result<Vec<AnswerCandidate>, ExtractorError> {
    let entries = extract_entries(response)?;
    let by_id: HashMap<&str, &Question> = questions.iter().map(|q| (q.id.as_str(), *q)).collect();
    let mut best: HashMap<String, AnswerCandidate> = HashMap::new();

    for (idx, entry) in entries.iter().enumerate() {
        let Some(obj) = entry.as_object() else {
            warn!("Entry {} in chunk {} is not an object", idx, chunk.index);
            continue;
        };
        let Some(id) = entry_id(obj) else {
            warn!("Entry {} in chunk {} has no question_id", idx, chunk.index);
            continue;
        };
        let Some(question) = by_id.get(id) else {
            warn!("Skipping unknown question id '{}' in chunk {}", id, chunk.index);
            continue;
        };

        let candidate = match parse_entry(obj, question, chunk, limits) {
            Ok(candidate) => candidate,
            Err(reason) => {
                warn!("Entry for '{}' in chunk {} is malformed: {}", id, chunk.index, reason);
                AnswerCandidate::not_found(id, chunk.index)
            }
        };

        let keep_existing = best
            .get(id)
            .is_some_and(|existing| !candidate.supersedes(existing));
        if keep_existing {
            debug!("Dropping duplicate entry for '{}' in chunk {}", id, chunk.index);
        } else {
            best.insert(id.to_string(), candidate);
        }
    }

    Ok(questions
        .iter()
        .filter_map(|q| best.remove(q.id.as_str()))
        .collect())
}

/// Locate the JSON array in a response
///
/// Models sometimes wrap JSON in markdown code blocks or surround it with
/// prose that itself contains brackets (`[PAGE 47]`), so the fenced block is
/// preferred and each `[` is tried in turn until one opens an array of
/// objects.
fn extract_entries(response: &str) -> Result<Vec<Value>, ExtractorError> {
    let body = fenced_block(response).unwrap_or(response);

    for (start, _) in body.match_indices('[') {
        let mut values = serde_json::Deserializer::from_str(&body[start..]).into_iter::<Value>();
        if let Some(Ok(Value::Array(entries))) = values.next() {
            if entries.iter().all(Value::is_object) {
                return Ok(entries);
            }
        }
    }

    // A bare object wrapping the list is tolerated
    let trimmed = body.trim();
    if !trimmed.starts_with('{') {
        return Err(ExtractorError::Malformed(
            "No JSON array found in response".to_string(),
        ));
    }
    match serde_json::from_str::<Value>(trimmed)? {
        Value::Object(mut obj) => match obj.remove("answers") {
            Some(Value::Array(entries)) => Ok(entries),
            _ => Err(ExtractorError::Malformed("Expected JSON array".to_string())),
        },
        _ => Err(ExtractorError::Malformed("Expected JSON array".to_string())),
    }
}

fn fenced_block(response: &str) -> Option<&str> {
    let open = response.find("```")?;
    let after_open = &response[open + 3..];
    // Skip the info string (```json)
    let body_start = after_open.find('\n').map(|i| i + 1)?;
    let body = &after_open[body_start..];
    let close = body.find("```").unwrap_or(body.len());
    Some(&body[..close])
}

fn entry_id(obj: &Map<String, Value>) -> Option<&str> {
    obj.get("question_id")
        .or_else(|| obj.get("attribute_name"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

fn parse_entry(
    obj: &Map<String, Value>,
    question: &Question,
    chunk: &Chunk,
    limits: &ParseLimits,
) -> Result<AnswerCandidate, String> {
    let confidence = match obj.get("confidence") {
        None | Some(Value::Null) => Confidence::Medium,
        Some(Value::String(label)) => Confidence::from_label(label)
            .ok_or_else(|| format!("unrecognised confidence label '{}'", label))?,
        Some(other) => return Err(format!("confidence is not a label: {}", other)),
    };

    let value = coerce_value(
        obj.get("value").unwrap_or(&Value::Null),
        question.expected_type,
        limits.max_string_chars,
    )?;

    if !value.is_found() {
        return Ok(AnswerCandidate::not_found(&question.id, chunk.index));
    }

    Ok(AnswerCandidate {
        question_id: question.id.clone(),
        value,
        confidence,
        provenance: resolve_provenance(obj, chunk, limits.max_quote_chars),
        chunk_index: chunk.index,
    })
}

/// Coerce a raw JSON value to the question's declared type
///
/// Returns `Ok(NotFound)` for explicit absences and `Err` for values that
/// do not fit the type.
pub fn coerce_value(
    raw: &Value,
    expected: AnswerType,
    max_string_chars: usize,
) -> Result<AnswerValue, String> {
    if is_absent(raw) {
        return Ok(AnswerValue::NotFound);
    }

    match expected {
        AnswerType::Boolean => coerce_boolean(raw).map(AnswerValue::Boolean),
        AnswerType::Integer => coerce_integer(raw).map(AnswerValue::Integer),
        AnswerType::Double => coerce_double(raw).map(AnswerValue::Double),
        AnswerType::String => {
            let text = match raw {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => return Err(format!("expected a string, got {}", other)),
            };
            Ok(AnswerValue::Text(escape_literal(&truncate_chars(
                &text,
                max_string_chars,
            ))))
        }
        AnswerType::Multiselect => {
            let items: Vec<String> = match raw {
                Value::Array(values) => values
                    .iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect(),
                Value::String(s) => s.split([',', ';']).map(str::to_string).collect(),
                other => return Err(format!("expected a list, got {}", other)),
            };
            let items: Vec<String> = items
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .map(|item| escape_literal(&truncate_chars(item, max_string_chars)))
                .collect();
            if items.is_empty() {
                Ok(AnswerValue::NotFound)
            } else {
                Ok(AnswerValue::Multiselect(items))
            }
        }
    }
}

fn is_absent(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => {
            let s = s.trim().to_ascii_lowercase();
            s.is_empty() || s == "not found" || s == "n/a"
        }
        _ => false,
    }
}

fn coerce_boolean(raw: &Value) -> Result<bool, String> {
    match raw {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v == 1.0 => Ok(true),
            Some(v) if v == 0.0 => Ok(false),
            _ => Err(format!("number {} is not a boolean", n)),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "t" => Ok(true),
            "false" | "no" | "n" | "0" | "f" => Ok(false),
            other => Err(format!("'{}' is not a boolean", other)),
        },
        other => Err(format!("expected a boolean, got {}", other)),
    }
}

fn coerce_integer(raw: &Value) -> Result<i64, String> {
    match raw {
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                return Ok(v);
            }
            match n.as_f64() {
                Some(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
                    Ok(v as i64)
                }
                _ => Err(format!("number {} is not an integer", n)),
            }
        }
        Value::String(s) => strip_separators(s.trim())
            .parse::<i64>()
            .map_err(|_| format!("'{}' is not an integer", s)),
        other => Err(format!("expected an integer, got {}", other)),
    }
}

fn coerce_double(raw: &Value) -> Result<f64, String> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            let s = s.strip_prefix('$').unwrap_or(s);
            let s = s.strip_suffix('%').unwrap_or(s);
            strip_separators(s.trim()).parse::<f64>().ok()
        }
        other => return Err(format!("expected a number, got {}", other)),
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(format!("{} is not a finite number", raw)),
    }
}

fn strip_separators(s: &str) -> String {
    s.chars().filter(|c| *c != ',' && *c != '_').collect()
}

/// Truncate to at most `max` characters
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Escape backslashes, quotes and control characters as in a string literal
pub fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:04x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

fn resolve_provenance(obj: &Map<String, Value>, chunk: &Chunk, max_quote_chars: usize) -> Provenance {
    let quote = obj
        .get("source_text")
        .and_then(Value::as_str)
        .map(|s| truncate_chars(s.trim(), max_quote_chars))
        .unwrap_or_default();

    let claimed_page = match obj.get("source_page") {
        Some(Value::Number(n)) => n.as_u64().and_then(|p| u32::try_from(p).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
    .filter(|p| *p > 0 && chunk.contains_page(*p));

    let located = locate_quote(&chunk.text, &quote);

    let source_page = claimed_page.or_else(|| {
        located
            .and_then(|pos| page_before(&chunk.text, pos))
            .or_else(|| chunk.pages.first().copied())
    });

    let source_section = obj
        .get("source_section")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| located.and_then(|pos| section_before(&chunk.text, pos)));

    Provenance {
        source_text: quote,
        source_page,
        source_section,
    }
}

/// Byte position of the quote in the chunk text
fn locate_quote(text: &str, quote: &str) -> Option<usize> {
    if quote.is_empty() {
        return None;
    }
    if let Some(pos) = text.find(quote) {
        return Some(pos);
    }
    let prefix = truncate_chars(quote, QUOTE_PREFIX_CHARS);
    if prefix.len() < quote.len() {
        text.find(prefix.as_str())
    } else {
        None
    }
}

/// Nearest `Section X.YY` heading starting before byte position `pos`
fn section_before(text: &str, pos: usize) -> Option<String> {
    SECTION_HEADING
        .captures_iter(&text[..pos])
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| format!("Section {}", m.as_str()))
}
