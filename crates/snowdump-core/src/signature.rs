//! Callable signature normalization
//!
//! Snowflake renders a callable's `ARGUMENT_SIGNATURE` with parameter names,
//! e.g. `(A NUMBER, B VARCHAR)`. `GET_DDL` and the output file names need the
//! type-only form `(NUMBER, VARCHAR)`.
//!
//! Recognised shapes:
//!
//! ```text
//! signature := "(" [ param { "," param } ] ")"
//! param     := name WS type | type
//! type      := word [ WS word ]* [ "(" args ")" ]
//! ```
//!
//! Parameters are split on top-level commas only, so `NUMBER(38,0)` keeps its
//! inner comma. A single-token parameter is already a type, and the known
//! multi-word type names below are never split, which keeps the transform
//! stable when applied to its own output. Any other shape passes through
//! trimmed: a malformed signature only weakens file-name deduplication.

use regex::Regex;
use std::sync::LazyLock;

/// `name type`, where `type` may itself contain spaces or parentheses
static NAMED_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[^\s(),]+)\s+(?P<type>\S.*)$").expect("static regex")
});

/// Type names containing whitespace that must not be read as `name type`
const MULTI_WORD_TYPES: &[&str] = &[
    "DOUBLE PRECISION",
    "CHARACTER VARYING",
    "CHAR VARYING",
    "NCHAR VARYING",
    "NATIONAL CHARACTER",
    "NATIONAL CHARACTER VARYING",
    "TIME WITH TIME ZONE",
    "TIMESTAMP WITH TIME ZONE",
    "TIMESTAMP WITH LOCAL TIME ZONE",
    "TIMESTAMP WITHOUT TIME ZONE",
];

/// Strip parameter names from a callable signature.
///
/// `""` stays `""` (the object has no parameter list), `"()"` stays `"()"`.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let Some(inner) = trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    else {
        return trimmed.to_string();
    };

    let Some(params) = split_top_level(inner) else {
        return trimmed.to_string();
    };

    if params.len() == 1 && params[0].trim().is_empty() {
        return "()".to_string();
    }

    let types: Vec<String> = params.iter().map(|param| strip_name(param.trim())).collect();
    format!("({})", types.join(", "))
}

/// Split on commas at parenthesis depth zero. `None` when unbalanced.
fn split_top_level(inner: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth: usize = 0;
    let mut start = 0;

    for (idx, ch) in inner.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                parts.push(&inner[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return None;
    }
    parts.push(&inner[start..]);
    Some(parts)
}

fn strip_name(param: &str) -> String {
    if is_bare_type(param) {
        return param.to_string();
    }

    match NAMED_PARAM.captures(param) {
        Some(caps) => caps["type"].trim().to_string(),
        None => param.to_string(),
    }
}

fn is_bare_type(param: &str) -> bool {
    // Precision/scale suffixes do not change whether the words form a type name.
    let words = param.split('(').next().unwrap_or(param).trim();
    if !words.contains(char::is_whitespace) {
        return true;
    }

    let collapsed = words.split_whitespace().collect::<Vec<_>>().join(" ");
    MULTI_WORD_TYPES
        .iter()
        .any(|ty| ty.eq_ignore_ascii_case(&collapsed))
}
