// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

//! Query-result integrity checker.
//!
//! Not on the production query path: a verification helper that asserts a
//! result page actually satisfies the `ApiQuery` that produced it. Checks
//! page size, composite sort order, and cursor bounds under lexicographic
//! tuple comparison.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use thiserror::Error;

use crate::params::{Scalar, Tuple};
use crate::query::{ApiQuery, Order};

/// A comparable record: field name to totally-ordered value. Missing fields
/// compare below every present value.
pub type Record = BTreeMap<String, Scalar>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    #[error("expected a full page of {expected} items, got {actual}")]
    PageSize { expected: u32, actual: usize },
    #[error("items {0} and {1} are out of sort order")]
    OutOfOrder(usize, usize),
    #[error("item {index} violates the {bound} bound")]
    OutOfBounds { index: usize, bound: &'static str },
}

/// Compare two records under a composite sort key.
pub fn compare_records(a: &Record, b: &Record, sort_by: &[String]) -> Ordering {
    for field in sort_by {
        let ordering = a.get(field).cmp(&b.get(field));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Compare a record against a cursor under lexicographic tuple semantics:
/// walk the tuple fields in order, tie-breaking on the next field.
fn compare_to_cursor(record: &Record, cursor: &[Tuple]) -> Ordering {
    for (field, value) in cursor {
        let ordering = record.get(field).cmp(&Some(value));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Verify a result page against the query that produced it.
///
/// `exhausted` marks a page that reached the end of the result set, where a
/// short page is legitimate.
pub fn verify_query_result(
    items: &[Record],
    query: &ApiQuery,
    exhausted: bool,
) -> Result<(), IntegrityViolation> {
    if !exhausted {
        let expected = query.limit.or(query.limit_to_last).unwrap_or(0);
        if items.len() != expected as usize {
            return Err(IntegrityViolation::PageSize {
                expected,
                actual: items.len(),
            });
        }
    }

    for i in 1..items.len() {
        let ordering = compare_records(&items[i - 1], &items[i], &query.sort_by);
        let bad = match query.order {
            Order::Asc => ordering == Ordering::Greater,
            Order::Desc => ordering == Ordering::Less,
        };
        if bad {
            return Err(IntegrityViolation::OutOfOrder(i - 1, i));
        }
    }

    // start/end are relative to traversal direction: under desc order the
    // "from" cursor is an upper bound on the key tuple.
    let bounds: [(&str, Option<&[Tuple]>, bool, bool); 4] = [
        ("startAt", query.start_at.as_deref(), true, true),
        ("startAfter", query.start_after.as_deref(), true, false),
        ("endAt", query.end_at.as_deref(), false, true),
        ("endBefore", query.end_before.as_deref(), false, false),
    ];

    for (name, cursor, is_start, inclusive) in bounds {
        let Some(cursor) = cursor else { continue };
        for (index, item) in items.iter().enumerate() {
            let mut ordering = compare_to_cursor(item, cursor);
            if query.order == Order::Desc {
                ordering = ordering.reverse();
            }
            let ok = match (is_start, inclusive) {
                (true, true) => ordering != Ordering::Less,
                (true, false) => ordering == Ordering::Greater,
                (false, true) => ordering != Ordering::Greater,
                (false, false) => ordering == Ordering::Less,
            };
            if !ok {
                return Err(IntegrityViolation::OutOfBounds { index, bound: name });
            }
        }
    }

    Ok(())
}
