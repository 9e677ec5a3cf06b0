// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

//! VQL Abstract Syntax Tree types.
//!
//! The AST serializes as tagged JSON so a parsed filter can be handed to a
//! frontend or logged verbatim.

use serde::{Deserialize, Serialize};

/// Expression node in the VQL AST.
///
/// Every leaf is a `Comparison`; internal nodes always own well-formed
/// children. The tree is immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    And {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Or {
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Not {
        inner: Box<Expression>,
    },
    Comparison {
        /// `None` is the implicit full-text comparison produced by a bare
        /// term ("match anywhere").
        field: Option<String>,
        operator: Operator,
        value: Value,
    },
}

/// Comparison operators supported by VQL.
///
/// `Eq` is implicit for `field:value` and bare terms. The range operators are
/// written as a sigil after the colon (`created_at:>=2012`); they are what
/// cursor-derived filter fragments use. `In` takes a parenthesized list
/// (`id:(a,b,c)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

/// Value types in VQL expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Value {
    String { value: String },
    Number { value: f64 },
    Bool { value: bool },
    List { values: Vec<Value> },
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String { value } => Some(value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number { value } => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool { value } => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List { values } => Some(values),
            _ => None,
        }
    }
}

/// VQL tokenizing/parsing error.
#[derive(Debug, Clone, Serialize)]
pub struct VqlError {
    #[serde(rename = "type")]
    pub kind: VqlErrorKind,
    pub message: String,
    pub position: Option<Position>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VqlErrorKind {
    Syntax,
    UnterminatedString,
    DisallowedCharacter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl VqlError {
    pub fn syntax(message: impl Into<String>, position: Option<Position>) -> Self {
        Self {
            kind: VqlErrorKind::Syntax,
            message: message.into(),
            position,
        }
    }

    pub fn unterminated_string(position: Position) -> Self {
        Self {
            kind: VqlErrorKind::UnterminatedString,
            message: format!(
                "Unterminated string starting at column {}",
                position.column
            ),
            position: Some(position),
        }
    }

    pub fn disallowed_character(ch: char, position: Position) -> Self {
        Self {
            kind: VqlErrorKind::DisallowedCharacter,
            message: format!("Character '{}' is not allowed in vql", ch),
            position: Some(position),
        }
    }
}

impl std::fmt::Display for VqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(pos) = &self.position {
            write!(f, "{} (column {}, offset {})", self.message, pos.column, pos.offset)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for VqlError {}
