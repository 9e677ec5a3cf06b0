// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

//! Query subsystem: the translation layer between the VQL filter/sort/
//! pagination language and the normalized, engine-agnostic [`ApiQuery`]
//! descriptor storage backends execute against.
//!
//! Everything here is pure and synchronous: each call builds a fresh AST and
//! descriptor from immutable input, so the subsystem is safe to use from any
//! number of request-handling tasks without locking.

pub mod cursor;
pub mod error;
pub mod params;
pub mod query;
pub mod verify;
pub mod vql;

pub use error::{QueryError, Result};
pub use query::{
    api_query_to_searchparams, parse_query, parse_query_str, searchparams_to_string, ApiQuery,
    ApiQueryOptions, Order,
};
