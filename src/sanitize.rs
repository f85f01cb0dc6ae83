//! Cleanup and parsing of generative-model text
//!
//! Model responses are free text, not a typed contract: they arrive wrapped
//! in code fences, with single quotes, trailing commas, or as plain prose.
//! All repair lives here behind a non-throwing contract; every caller must
//! handle both outcomes explicitly.

use serde_json::Value;

/// Outcome of sanitizing model text.
///
/// `Raw` carries the original text unchanged so callers can store or
/// display it when the model misbehaves. Parse failure is never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Sanitized {
    Parsed(Value),
    Raw(String),
}

impl Sanitized {
    /// The parsed value, if any
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Sanitized::Parsed(value) => Some(value),
            Sanitized::Raw(_) => None,
        }
    }

    #[must_use]
    pub fn is_raw(&self) -> bool {
        matches!(self, Sanitized::Raw(_))
    }
}

/// Clean up raw model text and parse it as JSON, falling back to the
/// original text when no repair succeeds.
#[must_use]
pub fn sanitize_and_parse(raw: &str) -> Sanitized {
    let cleaned = strip_code_fences(raw);

    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        return Sanitized::Parsed(value);
    }

    let repaired = strip_trailing_commas(&normalize_quotes(cleaned));
    if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
        return Sanitized::Parsed(value);
    }

    Sanitized::Raw(raw.to_string())
}

/// Strip leading/trailing code-fence markers and a language tag
fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest
            .strip_prefix("geojson")
            .or_else(|| rest.strip_prefix("json"))
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Convert single-quoted strings to double-quoted ones, leaving
/// apostrophes inside double-quoted strings alone.
fn normalize_quotes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_double = false;
    let mut in_single = false;
    let mut escaped = false;

    for c in input.chars() {
        if escaped {
            out.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => {
                out.push(c);
                escaped = true;
            }
            '"' if in_single => {
                // embedded double quote inside a single-quoted string
                out.push('\\');
                out.push('"');
            }
            '"' => {
                in_double = !in_double;
                out.push('"');
            }
            '\'' if !in_double => {
                in_single = !in_single;
                out.push('"');
            }
            _ => out.push(c),
        }
    }

    out
}

/// Drop commas that directly precede a closing bracket or brace
fn strip_trailing_commas(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    let chars: Vec<char> = input.chars().collect();

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
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }

    out
}
