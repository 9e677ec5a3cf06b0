// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

//! VQL - the filter expression language used by list/query endpoints.
//!
//! # Syntax
//!
//! ```text
//! tag:amplifier
//! tag:amplifier & user:jay
//! (service:dotrunner | service:gen) & created_at:>=2012
//! -tag:test
//! id:(a,b,c)
//! "free text"
//! tag:a user:jay        (adjacent terms are ANDed)
//! ```
//!
//! # Operators
//!
//! | Form | Meaning | Example |
//! |------|---------|---------|
//! | `field:value` | Exact match | `tag:amplifier` |
//! | `field:>v` `field:>=v` | Greater / at least | `created_at:>=2012` |
//! | `field:<v` `field:<=v` | Less / at most | `depth:<5` |
//! | `field:(a,b)` | List membership | `id:(a,b,c)` |
//! | `&`, whitespace | AND | `tag:a & user:jay` |
//! | `\|` | OR | `tag:a \| tag:b` |
//! | `-` | NOT | `-tag:test` |
//! | bare term | Full-text match | `amplifier` |
//!
//! Values are strings unless they lex as a number (`42`, `-3.5`) or a boolean
//! (`true`/`false`); quoting forces string typing (`"42"`).

pub mod ast;
pub mod compiler;
pub mod parser;

pub use ast::{Expression, Operator, Position, Value, VqlError, VqlErrorKind};
pub use compiler::{combine_vql_strings, compile};
pub use parser::{parse, tokenize, Token, TokenKind};
