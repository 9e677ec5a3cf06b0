// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

use crate::vql::VqlError;

/// Errors raised while constructing a normalized query.
///
/// Every variant maps to a client-facing "bad request" class failure. A
/// malformed filter or a conflicting cursor is always surfaced; it is never
/// downgraded to an empty result set.
#[derive(Error, Debug, Clone)]
pub enum QueryError {
    #[error("invalid vql: {0}")]
    Syntax(#[from] VqlError),
    #[error("cursor conflict: {0}")]
    CursorConflict(String),
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

pub type Result<T> = std::result::Result<T, QueryError>;
