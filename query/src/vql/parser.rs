// Copyright 2025 StrongDM Inc
// SPDX-License-Identifier: Apache-2.0

//! VQL Parser - Recursive descent parser for VQL filter expressions.
//!
//! Grammar:
//!   query       = expression ;
//!   expression  = or_expr ;
//!   or_expr     = and_expr { "|" and_expr } ;
//!   and_expr    = unary_expr { [ "&" ] unary_expr } ;
//!   unary_expr  = [ "-" ] primary ;
//!   primary     = term | "(" expression ")" ;
//!   term        = ident ":" value_part | literal ;
//!   value_part  = [ ">" | ">=" | "<" | "<=" ] literal
//!               | "(" literal { "," literal } ")" ;
//!
//! Adjacent terms with no operator between them are implicitly ANDed. A bare
//! literal with no `field:` prefix is an implicit full-text comparison.

use std::sync::OnceLock;

use regex::Regex;

use super::ast::{Expression, Operator, Position, Value, VqlError};

/// Token types for the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    Number(f64),
    Bool(bool),
    Colon,
    And,
    Or,
    Not,
    LParen,
    RParen,
    Comma,
    Gt,
    Gte,
    Lt,
    Lte,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

/// Characters a bare word may contain. `-` is handled separately so that it
/// can double as the NOT operator at term position.
fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '.' | '*' | '+')
}

static NUMERIC_RE: OnceLock<Regex> = OnceLock::new();

/// The legacy value-typing pattern: an unquoted word is a number iff it is
/// all digits with an optional sign and fraction.
pub(crate) fn looks_numeric(s: &str) -> bool {
    NUMERIC_RE
        .get_or_init(|| Regex::new(r"^-?\d+(\.\d+)?$").unwrap())
        .is_match(s)
}

static ALLOWED_RE: OnceLock<Regex> = OnceLock::new();

/// Reject any character outside the safe vql class before tokenizing.
fn check_allowed(input: &str) -> Result<(), VqlError> {
    let re = ALLOWED_RE
        .get_or_init(|| Regex::new(r#"^[\w\s+*:.,'"()&|<>=\\-]*$"#).unwrap());
    if re.is_match(input) {
        return Ok(());
    }
    let mut column = 1;
    for (offset, ch) in input.char_indices() {
        let ok = ch.is_alphanumeric()
            || ch.is_whitespace()
            || "_+*:.,'\"()&|<>=\\-".contains(ch);
        if !ok {
            return Err(VqlError::disallowed_character(
                ch,
                Position { line: 1, column, offset },
            ));
        }
        column += 1;
    }
    Ok(())
}

/// Lexer for VQL filter strings.
struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    pos: usize,
    line: usize,
    column: usize,
    // True directly after ':', a range sigil, or a list comma. In value
    // position '-' starts a word (negative number, dash-separated date)
    // instead of the NOT operator.
    value_pos: bool,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            pos: 0,
            line: 1,
            column: 1,
            value_pos: false,
        }
    }

    fn current_position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
            offset: self.pos,
        }
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((pos, ch)) = self.chars.next() {
            self.pos = pos + ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            Some(ch)
        } else {
            None
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_offset(&mut self) -> Option<usize> {
        self.chars.peek().map(|(pos, _)| *pos)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self, quote: char) -> Result<Token, VqlError> {
        let start_pos = self.current_position();
        self.advance(); // consume opening quote
        let mut value = String::new();

        loop {
            match self.peek() {
                None => {
                    return Err(VqlError::unterminated_string(start_pos));
                }
                Some(ch) if ch == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('\\') => value.push('\\'),
                        Some('"') => value.push('"'),
                        Some('\'') => value.push('\''),
                        Some(ch) => value.push(ch),
                        None => {
                            return Err(VqlError::unterminated_string(start_pos));
                        }
                    }
                }
                Some(ch) => {
                    value.push(ch);
                    self.advance();
                }
            }
        }

        Ok(Token {
            kind: TokenKind::Str(value),
            position: start_pos,
        })
    }

    /// Read a bare word and classify it as a number, boolean, or identifier.
    ///
    /// Interior dashes are folded into the word (`2010-20-10`, `my-id`); a
    /// trailing dash is left for the next token.
    fn read_word(&mut self) -> Token {
        let start_pos = self.current_position();
        let start = self.pos;

        // Leading '-' only reaches here in value position.
        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if is_word_char(ch) {
                self.advance();
            } else if ch == '-' {
                let idx = self.peek_offset().unwrap_or(self.input.len());
                let follows = self.input[idx + 1..].chars().next();
                if follows.map(is_word_char).unwrap_or(false) {
                    self.advance();
                } else {
                    break;
                }
            } else {
                break;
            }
        }

        let text = &self.input[start..self.pos];
        let kind = if looks_numeric(text) {
            TokenKind::Number(text.parse::<f64>().unwrap_or(0.0))
        } else if text == "true" {
            TokenKind::Bool(true)
        } else if text == "false" {
            TokenKind::Bool(false)
        } else {
            TokenKind::Ident(text.to_string())
        };

        Token {
            kind,
            position: start_pos,
        }
    }

    fn next_token(&mut self) -> Result<Token, VqlError> {
        self.skip_whitespace();

        let start_pos = self.current_position();

        let token = match self.peek() {
            None => Token {
                kind: TokenKind::Eof,
                position: start_pos,
            },
            Some('"') | Some('\'') => {
                let quote = self.peek().unwrap_or('"');
                self.read_string(quote)?
            }
            Some('&') => {
                self.advance();
                Token { kind: TokenKind::And, position: start_pos }
            }
            Some('|') => {
                self.advance();
                Token { kind: TokenKind::Or, position: start_pos }
            }
            Some('(') => {
                self.advance();
                Token { kind: TokenKind::LParen, position: start_pos }
            }
            Some(')') => {
                self.advance();
                Token { kind: TokenKind::RParen, position: start_pos }
            }
            Some(',') => {
                self.advance();
                Token { kind: TokenKind::Comma, position: start_pos }
            }
            Some(':') => {
                self.advance();
                Token { kind: TokenKind::Colon, position: start_pos }
            }
            Some('>') => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Token { kind: TokenKind::Gte, position: start_pos }
                } else {
                    Token { kind: TokenKind::Gt, position: start_pos }
                }
            }
            Some('<') => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Token { kind: TokenKind::Lte, position: start_pos }
                } else {
                    Token { kind: TokenKind::Lt, position: start_pos }
                }
            }
            Some('-') => {
                if self.value_pos {
                    self.read_word()
                } else {
                    self.advance();
                    Token { kind: TokenKind::Not, position: start_pos }
                }
            }
            Some(ch) if is_word_char(ch) => self.read_word(),
            Some(ch) => {
                return Err(VqlError::syntax(
                    format!("Unexpected character '{}'", ch),
                    Some(start_pos),
                ));
            }
        };

        self.value_pos = match token.kind {
            TokenKind::Colon
            | TokenKind::Gt
            | TokenKind::Gte
            | TokenKind::Lt
            | TokenKind::Lte
            | TokenKind::Comma => true,
            // A '(' directly after ':' opens an in-list, still value position.
            TokenKind::LParen => self.value_pos,
            _ => false,
        };

        Ok(token)
    }

    fn tokenize(&mut self) -> Result<Vec<Token>, VqlError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.kind, TokenKind::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

/// Tokenize a VQL string. Pure; the token stream always ends with `Eof`.
pub fn tokenize(input: &str) -> Result<Vec<Token>, VqlError> {
    check_allowed(input)?;
    Lexer::new(input).tokenize()
}

/// Parser for VQL filter strings.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn current(&self) -> &Token {
        // tokenize always terminates the stream with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if !matches!(self.current().kind, TokenKind::Eof) {
            self.pos += 1;
        }
    }

    fn check(&self, expected: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(expected)
    }

    fn eat(&mut self, expected: &TokenKind) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn at_eof(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn parse_or(&mut self) -> Result<Expression, VqlError> {
        let mut left = self.parse_and()?;

        while self.eat(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expression::Or {
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, VqlError> {
        let mut left = self.parse_unary()?;

        loop {
            // Whitespace between two terms is a low-precedence AND.
            if !self.eat(&TokenKind::And) && !self.starts_term() {
                break;
            }
            let right = self.parse_unary()?;
            left = Expression::And {
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn starts_term(&self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::Ident(_)
                | TokenKind::Str(_)
                | TokenKind::Number(_)
                | TokenKind::Bool(_)
                | TokenKind::Not
                | TokenKind::LParen
        )
    }

    fn parse_unary(&mut self) -> Result<Expression, VqlError> {
        if self.eat(&TokenKind::Not) {
            let inner = self.parse_unary()?;
            return Ok(Expression::Not {
                inner: Box::new(inner),
            });
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression, VqlError> {
        if self.eat(&TokenKind::LParen) {
            let expr = self.parse_or()?;
            if !self.eat(&TokenKind::RParen) {
                return Err(VqlError::syntax(
                    "Expected ')' after expression",
                    Some(self.current().position),
                ));
            }
            return Ok(expr);
        }

        self.parse_term()
    }

    fn parse_term(&mut self) -> Result<Expression, VqlError> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Colon => Err(VqlError::syntax(
                "Empty field name before ':'",
                Some(token.position),
            )),
            TokenKind::Ident(name) => {
                self.advance();
                if self.eat(&TokenKind::Colon) {
                    self.parse_field_comparison(name)
                } else {
                    // Bare word: implicit full-text match.
                    Ok(Expression::Comparison {
                        field: None,
                        operator: Operator::Eq,
                        value: Value::String { value: name },
                    })
                }
            }
            TokenKind::Str(value) => {
                self.advance();
                Ok(Expression::Comparison {
                    field: None,
                    operator: Operator::Eq,
                    value: Value::String { value },
                })
            }
            TokenKind::Number(value) => {
                self.advance();
                Ok(Expression::Comparison {
                    field: None,
                    operator: Operator::Eq,
                    value: Value::Number { value },
                })
            }
            TokenKind::Bool(value) => {
                self.advance();
                Ok(Expression::Comparison {
                    field: None,
                    operator: Operator::Eq,
                    value: Value::Bool { value },
                })
            }
            _ => Err(VqlError::syntax(
                "Expected term",
                Some(token.position),
            )),
        }
    }

    fn parse_field_comparison(&mut self, field: String) -> Result<Expression, VqlError> {
        if self.eat(&TokenKind::LParen) {
            let mut values = vec![self.parse_value()?];
            while self.eat(&TokenKind::Comma) {
                values.push(self.parse_value()?);
            }
            if !self.eat(&TokenKind::RParen) {
                return Err(VqlError::syntax(
                    "Expected ')' after list values",
                    Some(self.current().position),
                ));
            }
            return Ok(Expression::Comparison {
                field: Some(field),
                operator: Operator::In,
                value: Value::List { values },
            });
        }

        let operator = if self.eat(&TokenKind::Gte) {
            Operator::Gte
        } else if self.eat(&TokenKind::Gt) {
            Operator::Gt
        } else if self.eat(&TokenKind::Lte) {
            Operator::Lte
        } else if self.eat(&TokenKind::Lt) {
            Operator::Lt
        } else {
            Operator::Eq
        };

        let value = self.parse_value()?;
        Ok(Expression::Comparison {
            field: Some(field),
            operator,
            value,
        })
    }

    fn parse_value(&mut self) -> Result<Value, VqlError> {
        let token = self.current().clone();
        let value = match token.kind {
            TokenKind::Str(value) => Value::String { value },
            TokenKind::Number(value) => Value::Number { value },
            TokenKind::Bool(value) => Value::Bool { value },
            TokenKind::Ident(value) => Value::String { value },
            _ => {
                return Err(VqlError::syntax(
                    "Expected value",
                    Some(token.position),
                ));
            }
        };
        self.advance();
        Ok(value)
    }
}

/// Parse a VQL filter string into an AST.
pub fn parse(input: &str) -> Result<Expression, VqlError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };

    if parser.at_eof() {
        return Err(VqlError::syntax("Empty query", None));
    }

    let expr = parser.parse_or()?;

    if !parser.at_eof() {
        return Err(VqlError::syntax(
            "Unexpected token after expression",
            Some(parser.current().position),
        ));
    }

    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vql::ast::VqlErrorKind;

    #[test]
    fn test_field_comparison() {
        let expr = parse("tag:amplifier").unwrap();
        match expr {
            Expression::Comparison { field, operator, value } => {
                assert_eq!(field.as_deref(), Some("tag"));
                assert_eq!(operator, Operator::Eq);
                assert_eq!(value.as_str(), Some("amplifier"));
            }
            _ => panic!("Expected comparison"),
        }
    }

    #[test]
    fn test_bare_term_is_fulltext() {
        let expr = parse("amplifier").unwrap();
        match expr {
            Expression::Comparison { field, operator, .. } => {
                assert!(field.is_none());
                assert_eq!(operator, Operator::Eq);
            }
            _ => panic!("Expected comparison"),
        }
    }

    #[test]
    fn test_implicit_and_between_terms() {
        let expr = parse("tag:a user:jay").unwrap();
        assert!(matches!(expr, Expression::And { .. }));

        let explicit = parse("tag:a & user:jay").unwrap();
        assert_eq!(expr, explicit);
    }

    #[test]
    fn test_or_and_precedence() {
        // AND binds tighter: a | b & c == a | (b & c)
        let expr = parse("tag:a | tag:b & user:jay").unwrap();
        match expr {
            Expression::Or { right, .. } => {
                assert!(matches!(*right, Expression::And { .. }));
            }
            _ => panic!("Expected Or at the root"),
        }
    }

    #[test]
    fn test_not_binds_tighter_than_and() {
        let expr = parse("-tag:a & user:jay").unwrap();
        match expr {
            Expression::And { left, .. } => {
                assert!(matches!(*left, Expression::Not { .. }));
            }
            _ => panic!("Expected And at the root"),
        }
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let expr = parse("(tag:a | tag:b) & user:jay").unwrap();
        match expr {
            Expression::And { left, .. } => {
                assert!(matches!(*left, Expression::Or { .. }));
            }
            _ => panic!("Expected And at the root"),
        }
    }

    #[test]
    fn test_range_sigils() {
        let expr = parse("created_at:>=2012").unwrap();
        match expr {
            Expression::Comparison { operator, value, .. } => {
                assert_eq!(operator, Operator::Gte);
                assert_eq!(value.as_number(), Some(2012.0));
            }
            _ => panic!("Expected comparison"),
        }

        let expr = parse("depth:<5").unwrap();
        match expr {
            Expression::Comparison { operator, .. } => assert_eq!(operator, Operator::Lt),
            _ => panic!("Expected comparison"),
        }
    }

    #[test]
    fn test_in_list() {
        let expr = parse("id:(a,b,c)").unwrap();
        match expr {
            Expression::Comparison { operator, value, .. } => {
                assert_eq!(operator, Operator::In);
                assert_eq!(value.as_list().map(|v| v.len()), Some(3));
            }
            _ => panic!("Expected comparison"),
        }
    }

    #[test]
    fn test_quoted_values_keep_type() {
        let expr = parse(r#"code:"42""#).unwrap();
        match expr {
            Expression::Comparison { value, .. } => {
                assert_eq!(value.as_str(), Some("42"));
            }
            _ => panic!("Expected comparison"),
        }

        let expr = parse("code:42").unwrap();
        match expr {
            Expression::Comparison { value, .. } => {
                assert_eq!(value.as_number(), Some(42.0));
            }
            _ => panic!("Expected comparison"),
        }
    }

    #[test]
    fn test_boolean_literal() {
        let expr = parse("active:true").unwrap();
        match expr {
            Expression::Comparison { value, .. } => {
                assert_eq!(value.as_bool(), Some(true));
            }
            _ => panic!("Expected comparison"),
        }
    }

    #[test]
    fn test_dashed_value_is_one_word() {
        let expr = parse("updated:2010-20-10").unwrap();
        match expr {
            Expression::Comparison { value, .. } => {
                assert_eq!(value.as_str(), Some("2010-20-10"));
            }
            _ => panic!("Expected comparison"),
        }
    }

    #[test]
    fn test_negation_of_dashed_bare_term() {
        // Leading '-' negates; the interior dash stays in the word.
        let expr = parse("-my-id").unwrap();
        match expr {
            Expression::Not { inner } => match *inner {
                Expression::Comparison { ref value, .. } => {
                    assert_eq!(value.as_str(), Some("my-id"));
                }
                _ => panic!("Expected comparison under Not"),
            },
            _ => panic!("Expected Not"),
        }
    }

    #[test]
    fn test_escapes_inside_quoted_strings() {
        let expr = parse(r#"title:"with \"quotes\"""#).unwrap();
        match expr {
            Expression::Comparison { value, .. } => {
                assert_eq!(value.as_str(), Some(r#"with "quotes""#));
            }
            _ => panic!("Expected comparison"),
        }

        let expr = parse(r#"path:"a\\b""#).unwrap();
        match expr {
            Expression::Comparison { value, .. } => {
                assert_eq!(value.as_str(), Some(r"a\b"));
            }
            _ => panic!("Expected comparison"),
        }

        // A backslash outside a quoted literal is still rejected.
        assert!(parse(r"tag:a\b").is_err());
    }

    #[test]
    fn test_unterminated_string() {
        let err = parse(r#"tag:"open"#).unwrap_err();
        assert_eq!(err.kind, VqlErrorKind::UnterminatedString);
    }

    #[test]
    fn test_unbalanced_parens() {
        assert!(parse("(tag:a | tag:b").is_err());
        assert!(parse("tag:a)").is_err());
    }

    #[test]
    fn test_trailing_operator() {
        assert!(parse("tag:a &").is_err());
        assert!(parse("tag:a |").is_err());
        assert!(parse("tag:").is_err());
    }

    #[test]
    fn test_empty_field_name() {
        assert!(parse(":value").is_err());
    }

    #[test]
    fn test_disallowed_character() {
        let err = parse("tag:a; drop").unwrap_err();
        assert_eq!(err.kind, VqlErrorKind::DisallowedCharacter);
        assert_eq!(err.position.map(|p| p.offset), Some(5));
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
    }
}
