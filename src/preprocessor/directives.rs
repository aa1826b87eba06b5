//! Directive handling
//!
//! Rez directives are lenient about what follows their argument:
//! - `#if`, `#elif` and `#printf` stop at `;`, and the rest of the line is
//!   ordinary source
//! - `#undef`, `#ifdef`, `#ifndef` and `#include <path>` ignore the rest of the line
//! - `#else`, `#endif` and `#` ignore their arguments (the lexer drops them)

use super::macros::DefineOutcome;
use super::Preprocessor;
use crate::errors::{DirectiveError, EvalError, IncludeError, RezError, Warning};
use crate::eval::{self, builtins, EmptyScope};
use crate::host::IncludeRequest;
use crate::parser::ast::SourceLocation;
use crate::parser::lexer::{Directive, Lexer, Punct, Token, TokenKind};
use tracing::{debug, warn};

/// Where a run of directive tokens stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Semicolon,
    LineEnd,
}

impl Preprocessor {
    pub(super) fn handle_directive(
        &mut self,
        directive: Directive,
        location: SourceLocation,
    ) -> Result<(), RezError> {
        let active = self.conditionals.is_active();

        match directive {
            Directive::If | Directive::Ifdef | Directive::Ifndef if !active => {
                self.skip_line();
                self.conditionals.push(false, location);
            }
            Directive::If => {
                let taken = self.condition("if", location)?;
                debug!(taken, line = location.line, "#if");
                self.conditionals.push(taken, location);
            }
            Directive::Ifdef | Directive::Ifndef => {
                let name = self.macro_name(directive.name(), location)?;
                self.skip_line();
                let defined = self.macros.is_defined(&name);
                let taken = defined == (directive == Directive::Ifdef);
                debug!(%name, taken, "#{}", directive.name());
                self.conditionals.push(taken, location);
            }
            Directive::Elif => {
                if self.conditionals.elif_needs_evaluation(location)? {
                    let taken = self.condition("elif", location)?;
                    debug!(taken, line = location.line, "#elif");
                    self.conditionals.elif(taken);
                } else {
                    self.skip_line();
                }
            }
            Directive::Else => self.conditionals.else_(location)?,
            Directive::Endif => self.conditionals.endif(location)?,

            // Everything below only matters in the active region
            _ if !active => self.skip_line(),

            Directive::Empty => {}
            Directive::Define => self.define(location)?,
            Directive::Undef => {
                let name = self.macro_name("undef", location)?;
                self.skip_line();
                let existed = self.macros.undef(&name);
                debug!(%name, existed, "#undef");
            }
            Directive::Include | Directive::Import => {
                self.include(directive == Directive::Import, location)?;
            }
            Directive::Printf => self.printf(location)?,
            Directive::Unknown(name) => {
                return Err(DirectiveError::Unknown { name, location }.into());
            }
        }
        Ok(())
    }

    fn skip_line(&mut self) {
        if let Some(lexer) = self.current_lexer() {
            lexer.skip_rest_of_line();
        }
    }

    /// Next raw token of the directive line: no expansion, no directive handling
    fn raw_token(&mut self) -> Result<Token, RezError> {
        match self.current_lexer() {
            Some(lexer) => Ok(lexer.next_token()?),
            None => Ok(Token::new(TokenKind::Eof, "", SourceLocation::default())),
        }
    }

    /// Raw tokens up to the end of the line, or up to `;` when `at_semicolon`.
    fn line_tokens(&mut self, at_semicolon: bool) -> Result<(Vec<Token>, Stop), RezError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.raw_token()?;
            match token.kind {
                TokenKind::DirectiveEnd | TokenKind::Eof => return Ok((tokens, Stop::LineEnd)),
                TokenKind::Punct(Punct::Semicolon) if at_semicolon => {
                    return Ok((tokens, Stop::Semicolon))
                }
                _ => tokens.push(token),
            }
        }
    }

    fn macro_name(&mut self, directive: &str, location: SourceLocation) -> Result<String, RezError> {
        let token = self.raw_token()?;
        if token.is_ident() {
            Ok(token.text)
        } else {
            Err(DirectiveError::Malformed {
                directive: directive.to_string(),
                message: format!("expected a macro name, found {}", token),
                location,
            }
            .into())
        }
    }

    /// Evaluate an `#if` / `#elif` condition.
    fn condition(&mut self, directive: &str, location: SourceLocation) -> Result<bool, RezError> {
        let (tokens, _) = self.line_tokens(true)?;
        if tokens.is_empty() {
            return Err(DirectiveError::Malformed {
                directive: directive.to_string(),
                message: "missing condition".to_string(),
                location,
            }
            .into());
        }

        let expanded = self.macros.expand_directive(&tokens);
        let value = eval::evaluate_tokens(expanded, &self.macros, &self.host)?;
        value.is_truthy().ok_or_else(|| {
            EvalError::TypeMismatch {
                expected: "integer".to_string(),
                found: value.type_name().to_string(),
                location,
            }
            .into()
        })
    }

    fn define(&mut self, location: SourceLocation) -> Result<(), RezError> {
        let name = self.macro_name("define", location)?;
        let (body, _) = self.line_tokens(false)?;

        match self.macros.define(&name, body, location) {
            DefineOutcome::Changed if self.strict_redefinition => {
                return Err(DirectiveError::Redefinition { name, location }.into());
            }
            DefineOutcome::Changed => {
                warn!(%name, line = location.line, "macro redefined with a different body");
                self.warnings.push(Warning {
                    message: format!("macro '{}' redefined with a different body", name),
                    location,
                });
            }
            DefineOutcome::New | DefineOutcome::Unchanged => {
                debug!(%name, "#define");
            }
        }
        Ok(())
    }

    fn include(&mut self, import: bool, location: SourceLocation) -> Result<(), RezError> {
        let directive = if import { "import" } else { "include" };
        let first = self.raw_token()?;

        if matches!(first.kind, TokenKind::DirectiveEnd | TokenKind::Eof) {
            return Err(DirectiveError::Malformed {
                directive: directive.to_string(),
                message: "missing file name".to_string(),
                location,
            }
            .into());
        }

        // `<path>` comes out of the lexer as a string whose spelling keeps the brackets
        let angled_path = match &first.kind {
            TokenKind::Str(bytes) if first.text.starts_with('<') => {
                Some(String::from_utf8_lossy(bytes).into_owned())
            }
            _ => None,
        };

        let (path, angled) = match angled_path {
            Some(path) => {
                self.skip_line();
                (path, true)
            }
            None => {
                let (mut tokens, stop) = self.line_tokens(true)?;
                if stop == Stop::Semicolon {
                    self.skip_line();
                }
                tokens.insert(0, first);
                // The file name is never macro-expanded
                let value = eval::evaluate_tokens(tokens, &EmptyScope, &self.host)?;
                let bytes = value.into_bytes().ok_or_else(|| DirectiveError::Malformed {
                    directive: directive.to_string(),
                    message: "file name must be a string".to_string(),
                    location,
                })?;
                (String::from_utf8_lossy(&bytes).into_owned(), false)
            }
        };

        if self.sources.len() >= self.max_include_depth {
            return Err(DirectiveError::IncludeDepth {
                limit: self.max_include_depth,
                location,
            }
            .into());
        }

        let request = IncludeRequest {
            path: &path,
            angled,
            from: self.current_file_name(),
        };
        let source = self.host.resolver.resolve(&request).map_err(|err| IncludeError {
            path: path.clone(),
            reason: err.to_string(),
            location,
        })?;

        if import && self.included.contains(&source.name) {
            debug!(file = %source.name, "#import of an already included file skipped");
            return Ok(());
        }

        debug!(file = %source.name, depth = self.sources.len(), "#{}", directive);
        let file = self.files.len();
        self.included.insert(source.name.clone());
        self.files.push(source.name);
        self.sources.push(super::SourceFrame {
            lexer: Lexer::with_file(&source.text, file),
            conditional_depth: self.conditionals.depth(),
        });
        Ok(())
    }

    /// `#printf(format, args...)`
    fn printf(&mut self, location: SourceLocation) -> Result<(), RezError> {
        let (tokens, _) = self.line_tokens(true)?;
        let tokens = self.macros.expand_directive(&tokens);

        let malformed = |message: &str| DirectiveError::Malformed {
            directive: "printf".to_string(),
            message: message.to_string(),
            location,
        };

        let inner = match tokens.as_slice() {
            [open, inner @ .., close]
                if open.is_punct(Punct::LParen) && close.is_punct(Punct::RParen) =>
            {
                inner
            }
            _ => return Err(malformed("arguments must be enclosed in parentheses").into()),
        };

        let mut values = Vec::new();
        for argument in split_arguments(inner) {
            if argument.is_empty() {
                return Err(malformed("empty argument").into());
            }
            values.push(eval::evaluate_tokens(argument.to_vec(), &self.macros, &self.host)?);
        }

        let Some((format, args)) = values.split_first() else {
            return Err(malformed("missing format string").into());
        };
        let format = format
            .as_bytes()
            .ok_or_else(|| malformed("format must be a string"))?;

        let rendered = builtins::format_printf(format, args, location)?;
        let text: Vec<u8> = rendered.into_iter().map(swap_line_endings).collect();
        self.printf_output.push_str(&String::from_utf8_lossy(&text));
        Ok(())
    }
}

/// Split on commas outside parentheses and brackets.
fn split_arguments(tokens: &[Token]) -> Vec<&[Token]> {
    if tokens.is_empty() {
        return Vec::new();
    }

    let mut arguments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        match &token.kind {
            TokenKind::Punct(Punct::LParen | Punct::LBracket) => depth += 1,
            TokenKind::Punct(Punct::RParen | Punct::RBracket) => depth = depth.saturating_sub(1),
            TokenKind::Punct(Punct::Comma) if depth == 0 => {
                arguments.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    arguments.push(&tokens[start..]);
    arguments
}

/// Rez strings hold classic Mac line endings; the host expects the Unix ones.
fn swap_line_endings(byte: u8) -> u8 {
    match byte {
        b'\r' => b'\n',
        b'\n' => b'\r',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        let mut tokens = Lexer::new(source).tokenize().unwrap();
        tokens.pop();
        tokens
    }

    #[test]
    fn test_split_arguments_respects_nesting() {
        let tokens = lex("\"%d\", (1, 2), $$BitField(3, 4, 5)");
        let parts = split_arguments(&tokens);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].len(), 5);
        assert_eq!(parts[2].len(), 8);
    }

    #[test]
    fn test_split_arguments_empty() {
        assert!(split_arguments(&[]).is_empty());
        assert_eq!(split_arguments(&lex("1,")).len(), 2);
    }

    #[test]
    fn test_swap_line_endings() {
        assert_eq!(swap_line_endings(b'\r'), b'\n');
        assert_eq!(swap_line_endings(b'\n'), b'\r');
        assert_eq!(swap_line_endings(b'a'), b'a');
    }
}
