//! Rez preprocessor
//!
//! Sits between the lexer and the grammar parser and hands out one token at a
//! time:
//! - [`macros`]: the macro table and expansion
//! - [`conditional`]: the `#if` stack
//! - [`directives`]: directive handling (`#define`, `#include`, `#printf`, ...)
//!
//! Tokens are pulled lazily so that state changes made by the parser (enum
//! constants become macros as they are declared) are visible to the tokens that
//! follow. Inside inactive conditional branches nothing is expanded or
//! evaluated and lexical errors are dropped.

pub mod conditional;
pub mod directives;
pub mod macros;

pub use conditional::ConditionalStack;
pub use macros::{DefineOutcome, MacroDefinition, MacroTable};

use crate::config::ParserConfig;
use crate::constants::DEFAULT_SOURCE_NAME;
use crate::errors::{RezError, Warning};
use crate::host::Host;
use crate::parser::lexer::{Lexer, Token, TokenKind};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::debug;

/// One open source file
struct SourceFrame {
    lexer: Lexer,
    /// Conditional depth when the file was entered
    conditional_depth: usize,
}

pub struct Preprocessor {
    sources: Vec<SourceFrame>,
    pub(crate) macros: MacroTable,
    pub(crate) conditionals: ConditionalStack,
    /// File table: index = `SourceLocation::file`
    files: Vec<String>,
    /// Resolved names of every included file, for `#import`
    included: FxHashSet<String>,
    /// Expanded tokens not yet handed out
    pending: VecDeque<Token>,
    pub(crate) host: Rc<Host>,
    strict_redefinition: bool,
    max_include_depth: usize,
    warnings: Vec<Warning>,
    printf_output: String,
    last_eof: Option<Token>,
}

impl Preprocessor {
    /// Preprocess `source` with the default configuration and host.
    pub fn new(source: &str) -> Self {
        let config = ParserConfig::default();
        let mut pp = Self::bare(DEFAULT_SOURCE_NAME, source, &config, Rc::new(Host::default()));
        pp.macros = MacroTable::with_predefined(config.derez);
        pp
    }

    /// Preprocess `source`, reported as `name`, with `config`'s predefined
    /// macros and limits.
    pub fn with_host(
        name: &str,
        source: &str,
        config: &ParserConfig,
        host: Rc<Host>,
    ) -> Result<Self, RezError> {
        let mut pp = Self::bare(name, source, config, host);
        pp.macros = MacroTable::with_predefined(config.derez);
        for (macro_name, value) in &config.defines {
            debug!(name = %macro_name, %value, "predefining macro");
            pp.macros.define_value(macro_name, value)?;
        }
        Ok(pp)
    }

    fn bare(name: &str, source: &str, config: &ParserConfig, host: Rc<Host>) -> Self {
        Preprocessor {
            sources: vec![SourceFrame {
                lexer: Lexer::with_file(source, 0),
                conditional_depth: 0,
            }],
            macros: MacroTable::new(),
            conditionals: ConditionalStack::new(),
            files: vec![name.to_string()],
            included: FxHashSet::default(),
            pending: VecDeque::new(),
            host,
            strict_redefinition: config.strict_redefinition,
            max_include_depth: config.max_include_depth,
            warnings: Vec::new(),
            printf_output: String::new(),
            last_eof: None,
        }
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    pub fn macros_mut(&mut self) -> &mut MacroTable {
        &mut self.macros
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Text produced by `#printf` so far
    pub fn printf_output(&self) -> &str {
        &self.printf_output
    }

    /// Names of the main source and every included file, indexed by file id
    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub(crate) fn take_output(&mut self) -> (Vec<Warning>, String, Vec<String>) {
        (
            std::mem::take(&mut self.warnings),
            std::mem::take(&mut self.printf_output),
            self.files.clone(),
        )
    }

    /// Next fully preprocessed token. Adjacent string literals arrive as one token.
    pub fn next_token(&mut self) -> Result<Token, RezError> {
        let token = self.next_expanded()?;
        if !token.is_string() {
            return Ok(token);
        }

        let mut merged = token;
        loop {
            let next = self.next_expanded()?;
            if next.is_string() {
                merged = macros::merge_pair(merged, next);
            } else {
                self.pending.push_front(next);
                return Ok(merged);
            }
        }
    }

    /// Every remaining token, ending with `Eof`
    pub fn tokenize(&mut self) -> Result<Vec<Token>, RezError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.is_eof();
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_expanded(&mut self) -> Result<Token, RezError> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(token);
            }

            let token = self.next_active()?;
            if self.macros.expand_once(&token).is_none() {
                return Ok(token);
            }

            let mut expansion = Vec::new();
            self.macros.expand_token(&token, &mut Vec::new(), &mut expansion);
            self.pending.extend(expansion);
        }
    }

    /// Next token of the active region, after directive processing
    fn next_active(&mut self) -> Result<Token, RezError> {
        loop {
            let Some(frame) = self.sources.last_mut() else {
                return Ok(self.eof());
            };

            let token = match frame.lexer.next_token() {
                Ok(token) => token,
                // The lexer has consumed the bad text, so a dead branch just moves on
                Err(_) if !self.conditionals.is_active() => continue,
                Err(err) => return Err(err.into()),
            };

            match token.kind {
                TokenKind::Eof => {
                    let depth = frame.conditional_depth;
                    self.conditionals.finish_to(depth)?;
                    if self.sources.len() > 1 {
                        debug!(file = %self.files[token.location.file], "leaving include");
                        self.sources.pop();
                        continue;
                    }
                    self.last_eof = Some(token.clone());
                    return Ok(token);
                }
                TokenKind::Directive(directive) => {
                    self.handle_directive(directive, token.location)?;
                }
                TokenKind::DirectiveEnd => {}
                _ if !self.conditionals.is_active() => {}
                _ => return Ok(token),
            }
        }
    }

    fn eof(&self) -> Token {
        self.last_eof
            .clone()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, "", Default::default()))
    }

    pub(crate) fn current_lexer(&mut self) -> Option<&mut Lexer> {
        self.sources.last_mut().map(|frame| &mut frame.lexer)
    }

    pub(crate) fn current_file_name(&self) -> &str {
        self.sources
            .last()
            .and_then(|frame| self.files.get(frame.lexer.file()))
            .map_or(DEFAULT_SOURCE_NAME, String::as_str)
    }
}
