// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

//! Query normalization: wire parameters in, `ApiQuery` out, and back.
//!
//! `parse_query` is the facade every list endpoint goes through. Free-form
//! parameters (`limit`, `order`, `sortBy`, `expand`) are lenient and fall
//! back to defaults; the filter (`vql`) and the legacy cursors are strict and
//! reject malformed input instead of silently degrading.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cursor::CursorSet;
use crate::error::Result;
use crate::params::{format_list, format_tuples, parse_list_from_string, Tuple};
use crate::vql;
use crate::vql::compiler::combine_vql_strings;
use crate::vql::Expression;

pub const DEFAULT_LIMIT: u32 = 5;
pub const DEFAULT_SORT_BY: [&str; 2] = ["updated_at", "id"];
pub const DEFAULT_EXPAND: &str = "*";

/// Traversal direction over the composite sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

impl Order {
    /// Lenient wire parsing: `asc` exactly, anything else is `desc`.
    pub fn from_param(raw: &str) -> Self {
        if raw == "asc" {
            Order::Asc
        } else {
            Order::Desc
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

/// Caller-facing options for building an [`ApiQuery`]. All fields are
/// optional; defaults are applied exactly once, in [`ApiQuery::new`].
#[derive(Debug, Clone, Default)]
pub struct ApiQueryOptions {
    pub expand: Option<Vec<String>>,
    pub sort_by: Option<Vec<String>>,
    pub order: Option<Order>,
    pub limit: Option<u32>,
    pub limit_to_last: Option<u32>,
    /// Raw VQL filter text.
    pub vql: Option<String>,
    // Deprecated cursor tuples, still accepted for backward compatibility.
    pub equals: Option<Vec<Tuple>>,
    pub start_at: Option<Vec<Tuple>>,
    pub start_after: Option<Vec<Tuple>>,
    pub end_at: Option<Vec<Tuple>>,
    pub end_before: Option<Vec<Tuple>>,
}

/// The normalized, engine-agnostic query descriptor handed to storage
/// drivers. Constructed fresh per request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiQuery {
    pub expand: Vec<String>,
    pub sort_by: Vec<String>,
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_to_last: Option<u32>,
    /// Parsed filter tree for the combined VQL (caller filter AND cursor
    /// bounds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vql: Option<Expression>,
    /// The combined VQL source text, kept alongside the AST so callers that
    /// need the literal form don't re-serialize.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vql_as_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<Vec<Tuple>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_after: Option<Vec<Tuple>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_at: Option<Vec<Tuple>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_before: Option<Vec<Tuple>>,
}

impl ApiQuery {
    /// Build a normalized query from options: apply defaults, reconcile the
    /// legacy cursors, and parse the combined filter.
    pub fn new(options: ApiQueryOptions) -> Result<Self> {
        let order = options.order.unwrap_or_default();

        let expand = match options.expand {
            Some(expand) if !expand.is_empty() => expand,
            _ => vec![DEFAULT_EXPAND.to_string()],
        };

        // Exactly one page-size bound survives normalization; limit wins
        // when both are supplied.
        let (limit, limit_to_last) = match (options.limit, options.limit_to_last) {
            (Some(limit), _) => (Some(limit), None),
            (None, Some(last)) => (None, Some(last)),
            (None, None) => (Some(DEFAULT_LIMIT), None),
        };

        let cursors = CursorSet {
            equals: options.equals,
            start_at: options.start_at,
            start_after: options.start_after,
            end_at: options.end_at,
            end_before: options.end_before,
        }
        .normalize()?;

        // The cursor tuple order defines the comparison key space, so it
        // overrides a caller-declared sort.
        let sort_by = match cursors.sort_fields() {
            Some(fields) => fields,
            None => match options.sort_by {
                Some(sort_by) if !sort_by.is_empty() => sort_by,
                _ => DEFAULT_SORT_BY.iter().map(|s| s.to_string()).collect(),
            },
        };

        let cursor_vql = cursors.to_vql(order).unwrap_or_default();
        let caller_vql = options.vql.unwrap_or_default();
        let combined = combine_vql_strings(&cursor_vql, &caller_vql);

        let (ast, vql_as_string) = if combined.is_empty() {
            (None, None)
        } else {
            (Some(vql::parse(&combined)?), Some(combined))
        };

        Ok(ApiQuery {
            expand,
            sort_by,
            order,
            limit,
            limit_to_last,
            vql: ast,
            vql_as_string,
            start_at: cursors.start_at,
            start_after: cursors.start_after,
            end_at: cursors.end_at,
            end_before: cursors.end_before,
        })
    }

    pub fn has_cursors(&self) -> bool {
        self.start_at.is_some()
            || self.start_after.is_some()
            || self.end_at.is_some()
            || self.end_before.is_some()
    }
}

/// Convert wire-format query parameters into a normalized [`ApiQuery`].
pub fn parse_query(params: &HashMap<String, String>) -> Result<ApiQuery> {
    let list_param = |key: &str| -> Option<Vec<String>> {
        params
            .get(key)
            .map(|raw| parse_list_from_string(raw))
            .filter(|items| !items.is_empty())
    };
    let positive_int = |key: &str| -> Option<u32> {
        params
            .get(key)
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
    };

    let cursors = CursorSet::from_params(params)?;

    let options = ApiQueryOptions {
        expand: list_param("expand"),
        sort_by: list_param("sortBy"),
        order: params.get("order").map(|raw| Order::from_param(raw)),
        limit: positive_int("limit"),
        limit_to_last: positive_int("limitToLast"),
        vql: params
            .get("vql")
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty()),
        equals: cursors.equals,
        start_at: cursors.start_at,
        start_after: cursors.start_after,
        end_at: cursors.end_at,
        end_before: cursors.end_before,
    };

    ApiQuery::new(options)
}

/// Convert a raw URL query string into a normalized [`ApiQuery`].
pub fn parse_query_str(query: &str) -> Result<ApiQuery> {
    let params: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    parse_query(&params)
}

/// Serialize an [`ApiQuery`] back into wire parameters, applying the same
/// defaulting rules as [`parse_query`].
pub fn api_query_to_searchparams(query: &ApiQuery) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = Vec::new();

    let vql_text = query
        .vql_as_string
        .clone()
        .or_else(|| query.vql.as_ref().map(vql::compile));
    if let Some(text) = vql_text {
        params.push(("vql".into(), text));
    }

    let sort_by = if query.sort_by.is_empty() {
        DEFAULT_SORT_BY.iter().map(|s| s.to_string()).collect()
    } else {
        query.sort_by.clone()
    };
    params.push(("sortBy".into(), format_list(&sort_by)));
    params.push(("order".into(), query.order.as_str().into()));

    match (query.limit, query.limit_to_last) {
        (Some(limit), _) => params.push(("limit".into(), limit.to_string())),
        (None, Some(last)) => params.push(("limitToLast".into(), last.to_string())),
        (None, None) => params.push(("limit".into(), DEFAULT_LIMIT.to_string())),
    }

    let expand = if query.expand.is_empty() {
        vec![DEFAULT_EXPAND.to_string()]
    } else {
        query.expand.clone()
    };
    params.push(("expand".into(), format_list(&expand)));

    if query.has_cursors() {
        warn!("serializing deprecated cursor parameters; prefer a vql filter");
    }
    let legacy: [(&str, &Option<Vec<Tuple>>); 4] = [
        ("startAt", &query.start_at),
        ("startAfter", &query.start_after),
        ("endAt", &query.end_at),
        ("endBefore", &query.end_before),
    ];
    for (key, tuples) in legacy {
        if let Some(tuples) = tuples {
            params.push((key.into(), format_tuples(tuples)));
        }
    }

    params
}

/// URL-encode serialized wire parameters.
pub fn searchparams_to_string(params: &[(String, String)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}
