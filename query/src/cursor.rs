// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

//! Legacy cursor adapter.
//!
//! Bridges the deprecated `startAt`/`startAfter`/`endAt`/`endBefore`/`equals`
//! tuple cursors into VQL filter fragments and into the `sortBy` alignment
//! rules. The cursor field order defines the composite sort key, so it always
//! wins over a caller-declared `sortBy`.

use std::collections::HashMap;

use crate::error::{QueryError, Result};
use crate::params::{parse_tuples, Scalar, Tuple};
use crate::query::Order;
use crate::vql::ast::{Expression, Operator, Value};
use crate::vql::compiler::{combine_vql_strings, compile};

/// The legacy cursor parameters of one request, before reconciliation.
#[derive(Debug, Clone, Default)]
pub struct CursorSet {
    pub equals: Option<Vec<Tuple>>,
    pub start_at: Option<Vec<Tuple>>,
    pub start_after: Option<Vec<Tuple>>,
    pub end_at: Option<Vec<Tuple>>,
    pub end_before: Option<Vec<Tuple>>,
}

impl CursorSet {
    /// Parse the legacy cursor parameters present in a wire parameter map.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self> {
        fn read(params: &HashMap<String, String>, key: &str) -> Result<Option<Vec<Tuple>>> {
            params
                .get(key)
                .filter(|raw| !raw.trim().is_empty())
                .map(|raw| parse_tuples(raw))
                .transpose()
        }

        Ok(Self {
            equals: read(params, "equals")?,
            start_at: read(params, "startAt")?,
            start_after: read(params, "startAfter")?,
            end_at: read(params, "endAt")?,
            end_before: read(params, "endBefore")?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.equals.is_none()
            && self.start_at.is_none()
            && self.start_after.is_none()
            && self.end_at.is_none()
            && self.end_before.is_none()
    }

    /// Enforce the cursor invariants and expand the `equals` sugar.
    ///
    /// After normalization `equals` is folded away: it becomes an identical
    /// inclusive cursor on both ends. Conflicting cursors are always
    /// rejected; silently picking one over the other would return results
    /// that don't match caller intent.
    pub fn normalize(mut self) -> Result<Self> {
        let cursors = [
            ("equals", &self.equals),
            ("startAt", &self.start_at),
            ("startAfter", &self.start_after),
            ("endAt", &self.end_at),
            ("endBefore", &self.end_before),
        ];
        for (name, tuples) in cursors {
            if matches!(tuples, Some(t) if t.is_empty()) {
                return Err(QueryError::InvalidCursor(format!(
                    "{} has no tuples",
                    name
                )));
            }
        }

        if let Some(tuples) = self.equals.take() {
            if self.start_at.is_some()
                || self.start_after.is_some()
                || self.end_at.is_some()
                || self.end_before.is_some()
            {
                return Err(QueryError::CursorConflict(
                    "equals cannot be combined with other cursors".into(),
                ));
            }
            self.start_at = Some(tuples.clone());
            self.end_at = Some(tuples);
            return Ok(self);
        }

        if self.start_at.is_some() && self.start_after.is_some() {
            return Err(QueryError::CursorConflict(
                "startAt and startAfter are mutually exclusive".into(),
            ));
        }
        if self.end_at.is_some() && self.end_before.is_some() {
            return Err(QueryError::CursorConflict(
                "endAt and endBefore are mutually exclusive".into(),
            ));
        }

        let start_fields = field_names(self.start_at.as_deref().or(self.start_after.as_deref()));
        let end_fields = field_names(self.end_at.as_deref().or(self.end_before.as_deref()));
        if let (Some(start), Some(end)) = (&start_fields, &end_fields) {
            if start != end {
                return Err(QueryError::CursorConflict(format!(
                    "cursor field sequences do not match: {:?} vs {:?}",
                    start, end
                )));
            }
        }

        Ok(self)
    }

    /// The composite sort key declared by the cursors, if any. Overrides a
    /// caller-supplied `sortBy`.
    pub fn sort_fields(&self) -> Option<Vec<String>> {
        field_names(
            self.equals
                .as_deref()
                .or(self.start_at.as_deref())
                .or(self.start_after.as_deref())
                .or(self.end_at.as_deref())
                .or(self.end_before.as_deref()),
        )
    }

    /// Compile the cursors into a VQL fragment under composite cursor
    /// semantics: a lexicographic bound over the ordered tuple list, not
    /// independent per-field bounds. Comparison direction follows `order`
    /// (sign-flipped for descending traversal).
    ///
    /// Call on a normalized set; `equals` has already been expanded.
    pub fn to_vql(&self, order: Order) -> Option<String> {
        let start = self
            .start_at
            .as_deref()
            .map(|t| bound_expr(t, Bound::Start, true, order))
            .or_else(|| {
                self.start_after
                    .as_deref()
                    .map(|t| bound_expr(t, Bound::Start, false, order))
            });
        let end = self
            .end_at
            .as_deref()
            .map(|t| bound_expr(t, Bound::End, true, order))
            .or_else(|| {
                self.end_before
                    .as_deref()
                    .map(|t| bound_expr(t, Bound::End, false, order))
            });

        let start = start.as_ref().map(compile).unwrap_or_default();
        let end = end.as_ref().map(compile).unwrap_or_default();
        let combined = combine_vql_strings(&start, &end);
        if combined.is_empty() {
            None
        } else {
            Some(combined)
        }
    }
}

fn field_names(tuples: Option<&[Tuple]>) -> Option<Vec<String>> {
    tuples.map(|t| t.iter().map(|(field, _)| field.clone()).collect())
}

#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

/// Expand a composite cursor into a boolean tree.
///
/// For `[(f1,v1),(f2,v2)]` the lexicographic lower bound is
/// `f1:>v1 | (f1:v1 & f2:>=v2)`: either strictly past the first key, or tied
/// on it and past the tie-break key. Only the last field of an inclusive
/// cursor admits equality.
fn bound_expr(tuples: &[Tuple], bound: Bound, inclusive: bool, order: Order) -> Expression {
    let strict = match (bound, order) {
        (Bound::Start, Order::Asc) | (Bound::End, Order::Desc) => Operator::Gt,
        (Bound::Start, Order::Desc) | (Bound::End, Order::Asc) => Operator::Lt,
    };
    let or_equal = match strict {
        Operator::Gt => Operator::Gte,
        _ => Operator::Lte,
    };

    let mut alternatives: Vec<Expression> = Vec::with_capacity(tuples.len());
    for i in 0..tuples.len() {
        let last = i == tuples.len() - 1;
        let operator = if last && inclusive { or_equal } else { strict };

        let mut conj: Option<Expression> = None;
        for (field, value) in &tuples[..i] {
            conj = Some(join_and(conj, comparison(field, Operator::Eq, value)));
        }
        let (field, value) = &tuples[i];
        let alt = join_and(conj, comparison(field, operator, value));
        alternatives.push(alt);
    }

    let mut expr = alternatives.remove(0);
    for alt in alternatives {
        expr = Expression::Or {
            left: Box::new(expr),
            right: Box::new(alt),
        };
    }
    expr
}

fn join_and(left: Option<Expression>, right: Expression) -> Expression {
    match left {
        Some(left) => Expression::And {
            left: Box::new(left),
            right: Box::new(right),
        },
        None => right,
    }
}

fn comparison(field: &str, operator: Operator, value: &Scalar) -> Expression {
    let value = match value {
        Scalar::String(s) => Value::String { value: s.clone() },
        Scalar::Number(n) => Value::Number { value: *n },
        Scalar::Bool(b) => Value::Bool { value: *b },
    };
    Expression::Comparison {
        field: Some(field.to_string()),
        operator,
        value,
    }
}
