// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

//! Wire-format parameter codecs.
//!
//! List strings (`a,b,c` | `(a,b,c)` | `[a|b|c]`), legacy cursor tuple
//! strings (`(k1:v1,k2:v2)` | `k1:v1|k2:v2`), and the unquoted value-typing
//! sniff shared by both.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};
use crate::vql::compiler::format_number;
use crate::vql::parser::looks_numeric;

/// A wire value with a total order, used for cursor tuples and for the
/// record model the integrity checker compares against.
///
/// Cross-type comparisons use a fixed rank (Bool < Number < String) so the
/// order is total; numbers compare via `f64::total_cmp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    String(String),
}

impl Scalar {
    fn rank(&self) -> u8 {
        match self {
            Scalar::Bool(_) => 0,
            Scalar::Number(_) => 1,
            Scalar::String(_) => 2,
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scalar {}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scalar {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a.cmp(b),
            (Scalar::Number(a), Scalar::Number(b)) => a.total_cmp(b),
            (Scalar::String(a), Scalar::String(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// An ordered field/value pair. A cursor is a `Vec<Tuple>` whose order
/// defines the composite sort key.
pub type Tuple = (String, Scalar);

/// Parse a delimited list string.
///
/// Accepts `a,b,c`, `(a,b,c)`, and `[a|b|c]`: one optional bracket or paren
/// wrapper, pipe- or comma-delimited. Pipe wins when present so items may
/// contain commas or internal spaces. Items are trimmed; empty items are
/// dropped.
pub fn parse_list_from_string(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let inner = strip_wrapper(trimmed);
    let delimiter = if inner.contains('|') { '|' } else { ',' };
    inner
        .split(delimiter)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_wrapper(s: &str) -> &str {
    if (s.starts_with('(') && s.ends_with(')')) || (s.starts_with('[') && s.ends_with(']')) {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Canonical list form used when serializing back onto the wire.
pub fn format_list(items: &[String]) -> String {
    format!("({})", items.join(","))
}

/// Type-sniff an unquoted wire value: numeric pattern -> number, exactly
/// `true`/`false` -> boolean, anything else -> string. Surrounding quotes
/// (single or double) force string typing and are stripped.
///
/// The sniffing is inherently ambiguous for string fields whose values look
/// numeric; quoting is the explicit escape hatch and new callers should use
/// it.
pub fn parse_value_part(raw: &str) -> Scalar {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 {
        let bytes = trimmed.as_bytes();
        let quoted = (bytes[0] == b'"' && bytes[trimmed.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[trimmed.len() - 1] == b'\'');
        if quoted {
            return Scalar::String(trimmed[1..trimmed.len() - 1].to_string());
        }
    }
    if looks_numeric(trimmed) {
        if let Ok(n) = trimmed.parse::<f64>() {
            return Scalar::Number(n);
        }
    }
    match trimmed {
        "true" => Scalar::Bool(true),
        "false" => Scalar::Bool(false),
        _ => Scalar::String(trimmed.to_string()),
    }
}

/// Parse a legacy cursor tuple-list string: `(k1:v1,k2:v2)` or
/// `k1:v1|k2:v2`. Each pair splits on its first colon; the value part goes
/// through [`parse_value_part`].
pub fn parse_tuples(raw: &str) -> Result<Vec<Tuple>> {
    let items = parse_list_from_string(raw);
    if items.is_empty() {
        return Err(QueryError::InvalidCursor(format!(
            "empty tuple list: {:?}",
            raw
        )));
    }
    let mut tuples = Vec::with_capacity(items.len());
    for item in items {
        let (key, value) = item.split_once(':').ok_or_else(|| {
            QueryError::InvalidCursor(format!("tuple item without ':': {:?}", item))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(QueryError::InvalidCursor(format!(
                "tuple item with empty field name: {:?}",
                item
            )));
        }
        tuples.push((key.to_string(), parse_value_part(value)));
    }
    Ok(tuples)
}

/// Canonical parenthesized tuple form, quoting string values that would
/// otherwise sniff as a number or boolean on the way back in.
pub fn format_tuples(tuples: &[Tuple]) -> String {
    let items: Vec<String> = tuples
        .iter()
        .map(|(key, value)| format!("{}:{}", key, format_scalar(value)))
        .collect();
    format!("({})", items.join(","))
}

pub(crate) fn format_scalar(value: &Scalar) -> String {
    match value {
        Scalar::Bool(b) => b.to_string(),
        Scalar::Number(n) => format_number(*n),
        Scalar::String(s) => {
            let needs_quotes = s.is_empty()
                || looks_numeric(s)
                || s == "true"
                || s == "false"
                || s.starts_with('"')
                || s.starts_with('\'')
                || s.contains([',', '|', '(', ')', ':']);
            if needs_quotes {
                format!("\"{}\"", s)
            } else {
                s.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_comma() {
        assert_eq!(parse_list_from_string("a,b,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_list_paren_wrapper() {
        assert_eq!(parse_list_from_string("(a,b,c)"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_list_bracket_pipe() {
        assert_eq!(parse_list_from_string("[a d|b|c]"), vec!["a d", "b", "c"]);
    }

    #[test]
    fn test_parse_list_drops_empty_items() {
        assert_eq!(parse_list_from_string("a,,b,"), vec!["a", "b"]);
        assert!(parse_list_from_string("").is_empty());
        assert!(parse_list_from_string("()").is_empty());
    }

    #[test]
    fn test_value_typing() {
        assert_eq!(parse_value_part("4"), Scalar::Number(4.0));
        assert_eq!(parse_value_part("\"4\""), Scalar::String("4".into()));
        assert_eq!(parse_value_part("'4'"), Scalar::String("4".into()));
        assert_eq!(parse_value_part("true"), Scalar::Bool(true));
        assert_eq!(parse_value_part("false"), Scalar::Bool(false));
        assert_eq!(parse_value_part("abc"), Scalar::String("abc".into()));
        assert_eq!(parse_value_part("-2.5"), Scalar::Number(-2.5));
    }

    #[test]
    fn test_parse_tuples_pipe_form() {
        let tuples = parse_tuples("updated:2010-20-10|id:my-id").unwrap();
        assert_eq!(
            tuples,
            vec![
                ("updated".to_string(), Scalar::String("2010-20-10".into())),
                ("id".to_string(), Scalar::String("my-id".into())),
            ]
        );
    }

    #[test]
    fn test_parse_tuples_paren_form() {
        let tuples = parse_tuples("(updated_at:2012,id:id_1)").unwrap();
        assert_eq!(tuples[0].0, "updated_at");
        assert_eq!(tuples[0].1, Scalar::Number(2012.0));
        assert_eq!(tuples[1].1, Scalar::String("id_1".into()));
    }

    #[test]
    fn test_parse_tuples_quoted_values_stay_strings() {
        let tuples = parse_tuples("(updated_at:\"2012\",id:'my id')").unwrap();
        assert_eq!(tuples[0].1, Scalar::String("2012".into()));
        assert_eq!(tuples[1].1, Scalar::String("my id".into()));
    }

    #[test]
    fn test_parse_tuples_rejects_malformed() {
        assert!(parse_tuples("no-colon-here").is_err());
        assert!(parse_tuples("(:v)").is_err());
        assert!(parse_tuples("").is_err());
    }

    #[test]
    fn test_tuples_roundtrip() {
        let tuples = vec![
            ("updated_at".to_string(), Scalar::String("2012".into())),
            ("n".to_string(), Scalar::Number(7.0)),
            ("live".to_string(), Scalar::Bool(true)),
            ("id".to_string(), Scalar::String("id_1".into())),
        ];
        let encoded = format_tuples(&tuples);
        assert_eq!(parse_tuples(&encoded).unwrap(), tuples);
    }

    #[test]
    fn test_scalar_total_order() {
        assert!(Scalar::Number(1.0) < Scalar::Number(2.0));
        assert!(Scalar::String("a".into()) < Scalar::String("b".into()));
        assert!(Scalar::Bool(false) < Scalar::Bool(true));
        // Fixed cross-type rank keeps the order total.
        assert!(Scalar::Bool(true) < Scalar::Number(0.0));
        assert!(Scalar::Number(1e9) < Scalar::String("".into()));
    }
}
