//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure:
//! the token feed, lookahead and error helpers, and the [`ParseOutput`] a parse
//! produces.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `declarations`: top-level statements and resource value lists
//! - `fields`: field specs inside `type` templates
//! - `expressions`: expressions with C precedence
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.
//!
//! Tokens are pulled from the preprocessor one at a time and never more than
//! two ahead, so macros defined by `enum` statements apply to the very next token.

use crate::config::ParserConfig;
use crate::constants::DEFAULT_SOURCE_NAME;
use crate::errors::{EvalError, RezError, SyntaxError, Warning};
use crate::eval::{Evaluator, ResourceContext, Scope, Value};
use crate::host::Host;
use crate::parser::ast::*;
use crate::parser::lexer::{Punct, Token, TokenKind};
use crate::preprocessor::{MacroTable, Preprocessor};
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::debug;

/// Where tokens come from
pub(crate) enum TokenFeed {
    Preprocessor(Box<Preprocessor>),
    /// An already preprocessed span (`#if` conditions, directive arguments)
    Fixed {
        tokens: std::vec::IntoIter<Token>,
        end: SourceLocation,
    },
}

/// Everything a parse produced
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    /// Completed declarations in source order, even when parsing stopped early
    pub declarations: Vec<Declaration>,
    /// The fatal error that stopped the parse, if any
    pub errors: Vec<RezError>,
    pub warnings: Vec<Warning>,
    /// Text written by `#printf`
    pub printf_output: String,
    /// File table; `SourceLocation::file` indexes it
    pub files: Vec<String>,
}

impl ParseOutput {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(mut self) -> Result<Vec<Declaration>, RezError> {
        if self.errors.is_empty() {
            Ok(self.declarations)
        } else {
            Err(self.errors.remove(0))
        }
    }

    pub fn file_name(&self, location: SourceLocation) -> Option<&str> {
        self.files.get(location.file).map(String::as_str)
    }
}

/// Macro table and current resource header, as seen by value expressions
struct ValueScope<'a> {
    macros: Option<&'a MacroTable>,
    resource: Option<&'a ResourceContext>,
}

impl Scope for ValueScope<'_> {
    fn is_macro_defined(&self, name: &str) -> bool {
        self.macros.is_some_and(|m| m.is_defined(name))
    }

    fn resource(&self) -> Option<&ResourceContext> {
        self.resource
    }
}

/// Recursive descent parser for Rez sources
pub struct Parser {
    pub(crate) feed: TokenFeed,
    pub(crate) lookahead: VecDeque<Token>,
    pub(crate) previous_location: SourceLocation,
    /// First failure of the feed; the feed reports `Eof` from then on
    pub(crate) feed_error: Option<RezError>,
    pub(crate) host: Rc<Host>,
    /// Header of the resource whose body is being parsed
    pub(crate) resource: Option<ResourceContext>,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Self::with_config(source, &ParserConfig::default())
    }

    /// Parse with `config`, resolving includes on the file system.
    pub fn with_config(source: &str, config: &ParserConfig) -> Self {
        let host = Host::with_include_paths(config.include_paths.clone());
        Self::with_host(DEFAULT_SOURCE_NAME, source, config, host)
    }

    /// Parse `source`, reported as `name`, using `host` for includes, `$$Read`
    /// and build metadata.
    pub fn with_host(name: &str, source: &str, config: &ParserConfig, host: Host) -> Self {
        let host = Rc::new(host);
        match Preprocessor::with_host(name, source, config, Rc::clone(&host)) {
            Ok(pp) => Self::from_feed(TokenFeed::Preprocessor(Box::new(pp)), host),
            Err(err) => {
                let mut parser = Self::from_feed(
                    TokenFeed::Fixed {
                        tokens: Vec::new().into_iter(),
                        end: SourceLocation::default(),
                    },
                    host,
                );
                parser.feed_error = Some(err);
                parser
            }
        }
    }

    /// Parser over tokens that have already been preprocessed.
    pub(crate) fn from_tokens(tokens: Vec<Token>) -> Self {
        let end = tokens.last().map(|t| t.location).unwrap_or_default();
        Self::from_feed(
            TokenFeed::Fixed {
                tokens: tokens.into_iter(),
                end,
            },
            Rc::new(Host::default()),
        )
    }

    fn from_feed(feed: TokenFeed, host: Rc<Host>) -> Self {
        Parser {
            feed,
            lookahead: VecDeque::new(),
            previous_location: SourceLocation::default(),
            feed_error: None,
            host,
            resource: None,
        }
    }

    /// Parse every statement. Parsing stops at the first fatal error; the
    /// declarations completed before it are kept.
    pub fn parse_file(mut self) -> ParseOutput {
        let mut output = ParseOutput::default();

        while !self.peek().is_eof() {
            match self.parse_statement() {
                Ok(Some(declaration)) => {
                    debug!(
                        line = declaration.location().line,
                        count = output.declarations.len() + 1,
                        "declaration parsed"
                    );
                    output.declarations.push(declaration);
                }
                Ok(None) => {}
                Err(err) => {
                    output.errors.push(err);
                    break;
                }
            }
        }

        if let Some(err) = self.feed_error.take() {
            output.errors.insert(0, err);
            output.errors.truncate(1);
        }

        if let TokenFeed::Preprocessor(pp) = &mut self.feed {
            let (warnings, printf_output, files) = pp.take_output();
            output.warnings = warnings;
            output.printf_output = printf_output;
            output.files = files;
        }
        output
    }

    /// Parse the whole feed as a single expression.
    pub(crate) fn parse_standalone_expression(&mut self) -> Result<Expr, RezError> {
        let expr = self.parse_expression()?;
        if !self.peek().is_eof() {
            return Err(self.unexpected("end of expression", "expression"));
        }
        match self.feed_error.take() {
            Some(err) => Err(err),
            None => Ok(expr),
        }
    }

    // ===== Token feed =====

    fn pull(&mut self) -> Token {
        if let Some(err) = &self.feed_error {
            return Token::new(TokenKind::Eof, "", err.location());
        }
        match &mut self.feed {
            TokenFeed::Preprocessor(pp) => match pp.next_token() {
                Ok(token) => token,
                Err(err) => {
                    let location = err.location();
                    self.feed_error = Some(err);
                    Token::new(TokenKind::Eof, "", location)
                }
            },
            TokenFeed::Fixed { tokens, end } => tokens
                .next()
                .unwrap_or_else(|| Token::new(TokenKind::Eof, "", *end)),
        }
    }

    fn fill(&mut self, count: usize) {
        while self.lookahead.len() < count {
            let token = self.pull();
            self.lookahead.push_back(token);
        }
    }

    // ===== Helper methods =====

    pub(crate) fn peek(&mut self) -> &Token {
        self.peek_ahead(0)
    }

    /// Token `n` positions past the current one
    pub(crate) fn peek_ahead(&mut self, n: usize) -> &Token {
        self.fill(n + 1);
        &self.lookahead[n]
    }

    pub(crate) fn advance(&mut self) -> Token {
        self.fill(1);
        // fill(1) guarantees a token
        let token = self
            .lookahead
            .pop_front()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, "", self.previous_location));
        self.previous_location = token.location;
        token
    }

    pub(crate) fn current_location(&mut self) -> SourceLocation {
        self.peek().location
    }

    pub(crate) fn previous_location(&self) -> SourceLocation {
        self.previous_location
    }

    pub(crate) fn check_punct(&mut self, punct: Punct) -> bool {
        self.peek().is_punct(punct)
    }

    pub(crate) fn match_punct(&mut self, punct: Punct) -> bool {
        if self.check_punct(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_punct(&mut self, punct: Punct, production: &str) -> Result<Token, RezError> {
        if self.check_punct(punct) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{}'", punct.as_str()), production))
        }
    }

    pub(crate) fn check_keyword(&mut self, keyword: &str) -> bool {
        self.peek().is_keyword(keyword)
    }

    pub(crate) fn match_keyword(&mut self, keyword: &str) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_keyword(&mut self, keyword: &str, production: &str) -> Result<Token, RezError> {
        if self.check_keyword(keyword) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("'{}'", keyword), production))
        }
    }

    /// A non-keyword identifier
    pub(crate) fn expect_ident(&mut self, production: &str) -> Result<(String, SourceLocation), RezError> {
        if self.peek().is_plain_ident() {
            let token = self.advance();
            Ok((token.text, token.location))
        } else {
            Err(self.unexpected("identifier", production))
        }
    }

    /// Error for the current token. A failure of the token feed takes precedence,
    /// since it is what actually went wrong.
    pub(crate) fn unexpected(&mut self, expected: &str, production: &str) -> RezError {
        if let Some(err) = self.feed_error.take() {
            return err;
        }
        let token = self.peek().clone();
        SyntaxError::new(
            format!("expected {}, found {}", expected, token),
            production,
            token.location,
        )
        .into()
    }

    pub(crate) fn syntax_error(&self, message: impl Into<String>, production: &str, location: SourceLocation) -> RezError {
        SyntaxError::new(message, production, location).into()
    }

    // ===== Evaluation and macro state =====

    pub(crate) fn evaluate(&self, expr: &Expr) -> Result<Value, RezError> {
        let macros = match &self.feed {
            TokenFeed::Preprocessor(pp) => Some(pp.macros()),
            TokenFeed::Fixed { .. } => None,
        };
        let scope = ValueScope {
            macros,
            resource: self.resource.as_ref(),
        };
        Ok(Evaluator::new(&scope, &self.host).eval(expr)?)
    }

    /// Evaluate to an integer that fits in 64 bits (IDs, attributes, enum values).
    pub(crate) fn evaluate_int(&self, expr: &Expr) -> Result<i64, RezError> {
        let value = self.evaluate(expr)?;
        if let Some(n) = value.to_i64() {
            return Ok(n);
        }
        let error = match value {
            Value::Int(n) => EvalError::OutOfRange {
                value: n.to_string(),
                what: "integer".to_string(),
                location: expr.location(),
            },
            other => EvalError::TypeMismatch {
                expected: "integer".to_string(),
                found: other.type_name().to_string(),
                location: expr.location(),
            },
        };
        Err(error.into())
    }

    pub(crate) fn evaluate_bytes(&self, expr: &Expr) -> Result<Vec<u8>, RezError> {
        let value = self.evaluate(expr)?;
        let found = value.type_name();
        value.into_bytes().ok_or_else(|| {
            EvalError::TypeMismatch {
                expected: "string".to_string(),
                found: found.to_string(),
                location: expr.location(),
            }
            .into()
        })
    }

    /// Parse an expression and evaluate it to an integer right away.
    pub(crate) fn parse_int_constant(&mut self) -> Result<(i64, SourceLocation), RezError> {
        let expr = self.parse_expression()?;
        Ok((self.evaluate_int(&expr)?, expr.location()))
    }

    /// Parse a string expression and evaluate it right away.
    pub(crate) fn parse_string_constant(&mut self) -> Result<Vec<u8>, RezError> {
        let expr = self.parse_expression()?;
        self.evaluate_bytes(&expr)
    }

    /// Make `name` an object-like macro for the rest of the source.
    pub(crate) fn define_constant(&mut self, name: &str, value: i64, location: SourceLocation) {
        if let TokenFeed::Preprocessor(pp) = &mut self.feed {
            pp.macros_mut().define_int(name, value, location);
        }
    }
}
