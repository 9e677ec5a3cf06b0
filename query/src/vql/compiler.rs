// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

//! VQL Compiler - serializes an AST back into canonical VQL text.
//!
//! Inverse of the parser up to whitespace and redundant parentheses:
//! `parse(compile(parse(s)))` is structurally equal to `parse(s)` for every
//! valid `s`.

use super::ast::{Expression, Operator, Value};
use super::parser::looks_numeric;

/// Compile an AST node to VQL text.
pub fn compile(expr: &Expression) -> String {
    match expr {
        Expression::And { left, right } => {
            format!("{} & {}", group(left), group(right))
        }
        Expression::Or { left, right } => {
            format!("{} | {}", group(left), group(right))
        }
        Expression::Not { inner } => format!("-{}", group(inner)),
        Expression::Comparison { field, operator, value } => {
            let rendered = format_value(value);
            match field {
                Some(field) => format!("{}:{}{}", field, sigil(*operator), rendered),
                None => rendered,
            }
        }
    }
}

/// Parenthesize binary children so precedence survives the round trip.
fn group(expr: &Expression) -> String {
    match expr {
        Expression::And { .. } | Expression::Or { .. } => format!("({})", compile(expr)),
        _ => compile(expr),
    }
}

fn sigil(operator: Operator) -> &'static str {
    match operator {
        Operator::Eq | Operator::In => "",
        Operator::Gt => ">",
        Operator::Gte => ">=",
        Operator::Lt => "<",
        Operator::Lte => "<=",
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String { value } => format_string(value),
        Value::Number { value } => format_number(*value),
        Value::Bool { value } => value.to_string(),
        Value::List { values } => {
            let items: Vec<String> = values.iter().map(format_value).collect();
            format!("({})", items.join(","))
        }
    }
}

/// Quote a string value whenever emitting it bare would re-lex as something
/// else (a number, a boolean, multiple tokens).
fn format_string(value: &str) -> String {
    let safe = !value.is_empty()
        && !looks_numeric(value)
        && value != "true"
        && value != "false"
        && value.chars().all(|c| {
            c.is_alphanumeric() || matches!(c, '_' | '.' | '*' | '+' | '-')
        })
        // A dash only survives bare lexing between word characters.
        && !value.starts_with('-')
        && !value.ends_with('-')
        && !value.contains("--");
    if safe {
        value.to_string()
    } else {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{}\"", escaped)
    }
}

/// Integral floats print without a fractional part.
pub(crate) fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// AND-merge two independently sourced VQL fragments. Passthrough when either
/// side is empty; both sides are parenthesized otherwise so neither can
/// capture the other's operands.
pub fn combine_vql_strings(a: &str, b: &str) -> String {
    let a = a.trim();
    let b = b.trim();
    if a.is_empty() {
        return b.to_string();
    }
    if b.is_empty() {
        return a.to_string();
    }
    format!("({}) & ({})", a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vql::parser::parse;

    fn roundtrip(source: &str) {
        let first = parse(source).unwrap();
        let compiled = compile(&first);
        let second = parse(&compiled)
            .unwrap_or_else(|e| panic!("compiled form {:?} failed to parse: {}", compiled, e));
        assert_eq!(first, second, "round trip changed structure for {:?}", source);
    }

    #[test]
    fn test_roundtrip_comparisons() {
        roundtrip("tag:amplifier");
        roundtrip("created_at:>=2012");
        roundtrip("depth:<5");
        roundtrip("active:true");
        roundtrip("code:42");
        roundtrip(r#"code:"42""#);
        roundtrip("id:(a,b,c)");
    }

    #[test]
    fn test_roundtrip_boolean_structure() {
        roundtrip("tag:a & user:jay");
        roundtrip("tag:a | tag:b & user:jay");
        roundtrip("(tag:a | tag:b) & user:jay");
        roundtrip("-tag:a");
        roundtrip("-(tag:a | tag:b)");
        roundtrip("tag:a user:jay -archived");
    }

    #[test]
    fn test_reserved_strings_requoted() {
        roundtrip(r#"title:"a b""#);
        roundtrip(r#"title:"a & b | (c)""#);
        roundtrip(r#"title:"with \"quotes\"""#);
        roundtrip(r#"title:"-starts-with-dash""#);
    }

    #[test]
    fn test_numbers_and_booleans_emit_bare() {
        let expr = parse("n:5 & b:false").unwrap();
        let compiled = compile(&expr);
        assert!(compiled.contains("n:5"));
        assert!(compiled.contains("b:false"));
        assert!(!compiled.contains('"'));
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[test]
    fn test_combine_vql_strings() {
        assert_eq!(combine_vql_strings("", ""), "");
        assert_eq!(combine_vql_strings("tag:a", ""), "tag:a");
        assert_eq!(combine_vql_strings("", "tag:b"), "tag:b");
        assert_eq!(
            combine_vql_strings("tag:a | tag:b", "user:jay"),
            "(tag:a | tag:b) & (user:jay)"
        );
        // The combined form parses and keeps AND at the root.
        let expr = parse(&combine_vql_strings("tag:a | tag:b", "user:jay")).unwrap();
        assert!(matches!(expr, crate::vql::Expression::And { .. }));
    }
}
