//! Diagnostics for every stage of the Rez front-end
//!
//! Each stage has its own error enum; [`RezError`] unifies them so a parse can
//! report the first fatal failure no matter where it came from. Everything
//! carries a [`SourceLocation`] pointing at the offending token.

use crate::parser::ast::{ResType, SourceLocation};
use std::fmt;
use thiserror::Error;

/// Tokenizer failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unterminated string literal at {location}")]
    UnterminatedString { location: SourceLocation },

    #[error("unterminated character literal at {location}")]
    UnterminatedChar { location: SourceLocation },

    #[error("unterminated hex string at {location}")]
    UnterminatedHexString { location: SourceLocation },

    #[error("unterminated block comment at {location}")]
    UnterminatedComment { location: SourceLocation },

    #[error("invalid escape sequence '{sequence}' ({reason}) at {location}")]
    InvalidEscape {
        sequence: String,
        reason: String,
        location: SourceLocation,
    },

    #[error("invalid numeric literal '{text}' at {location}")]
    InvalidNumber {
        text: String,
        location: SourceLocation,
    },

    #[error("invalid hex string ({reason}) at {location}")]
    InvalidHexString {
        reason: String,
        location: SourceLocation,
    },

    #[error("unexpected character '{ch}' at {location}")]
    UnexpectedChar { ch: char, location: SourceLocation },
}

impl LexError {
    pub fn location(&self) -> SourceLocation {
        match self {
            LexError::UnterminatedString { location }
            | LexError::UnterminatedChar { location }
            | LexError::UnterminatedHexString { location }
            | LexError::UnterminatedComment { location }
            | LexError::InvalidEscape { location, .. }
            | LexError::InvalidNumber { location, .. }
            | LexError::InvalidHexString { location, .. }
            | LexError::UnexpectedChar { location, .. } => *location,
        }
    }
}

/// Preprocessor directive failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("#if without matching #endif (opened at {location})")]
    UnterminatedConditional { location: SourceLocation },

    #[error("#endif without matching #if at {location}")]
    UnmatchedEndif { location: SourceLocation },

    #[error("#{directive} without matching #if at {location}")]
    Orphan {
        directive: String,
        location: SourceLocation,
    },

    #[error("#{directive} after #else at {location}")]
    AfterElse {
        directive: String,
        location: SourceLocation,
    },

    #[error("unknown directive '#{name}' at {location}")]
    Unknown {
        name: String,
        location: SourceLocation,
    },

    #[error("malformed #{directive}: {message} at {location}")]
    Malformed {
        directive: String,
        message: String,
        location: SourceLocation,
    },

    #[error("macro '{name}' redefined with a different body at {location}")]
    Redefinition {
        name: String,
        location: SourceLocation,
    },

    #[error("#include nested deeper than {limit} files at {location}")]
    IncludeDepth {
        limit: usize,
        location: SourceLocation,
    },
}

impl DirectiveError {
    pub fn location(&self) -> SourceLocation {
        match self {
            DirectiveError::UnterminatedConditional { location }
            | DirectiveError::UnmatchedEndif { location }
            | DirectiveError::Orphan { location, .. }
            | DirectiveError::AfterElse { location, .. }
            | DirectiveError::Unknown { location, .. }
            | DirectiveError::Malformed { location, .. }
            | DirectiveError::Redefinition { location, .. }
            | DirectiveError::IncludeDepth { location, .. } => *location,
        }
    }
}

/// Expression evaluation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("type mismatch: expected {expected}, found {found} at {location}")]
    TypeMismatch {
        expected: String,
        found: String,
        location: SourceLocation,
    },

    #[error("unknown identifier '{name}' at {location}")]
    UnknownIdentifier {
        name: String,
        location: SourceLocation,
    },

    #[error("unknown function '{name}' at {location}")]
    UnknownFunction {
        name: String,
        location: SourceLocation,
    },

    #[error("{function} expects {expected} argument(s), got {found} at {location}")]
    Arity {
        function: String,
        expected: usize,
        found: usize,
        location: SourceLocation,
    },

    #[error("division by zero in '{operation}' at {location}")]
    DivisionByZero {
        operation: String,
        location: SourceLocation,
    },

    #[error("integer overflow in '{operation}' at {location}")]
    Overflow {
        operation: String,
        location: SourceLocation,
    },

    #[error("{value} does not fit in a 64-bit {what} at {location}")]
    OutOfRange {
        value: String,
        what: String,
        location: SourceLocation,
    },

    #[error("{what} is not available here at {location}")]
    Unavailable {
        what: String,
        location: SourceLocation,
    },

    #[error("cannot read '{path}': {reason} at {location}")]
    Read {
        path: String,
        reason: String,
        location: SourceLocation,
    },

    #[error("bad format string: {message} at {location}")]
    Format {
        message: String,
        location: SourceLocation,
    },
}

impl EvalError {
    pub fn location(&self) -> SourceLocation {
        match self {
            EvalError::TypeMismatch { location, .. }
            | EvalError::UnknownIdentifier { location, .. }
            | EvalError::UnknownFunction { location, .. }
            | EvalError::Arity { location, .. }
            | EvalError::DivisionByZero { location, .. }
            | EvalError::Overflow { location, .. }
            | EvalError::OutOfRange { location, .. }
            | EvalError::Unavailable { location, .. }
            | EvalError::Read { location, .. }
            | EvalError::Format { location, .. } => *location,
        }
    }
}

/// A grammar production could not match the current token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} in {production} at {location}")]
pub struct SyntaxError {
    pub message: String,
    pub production: String,
    pub location: SourceLocation,
}

impl SyntaxError {
    pub fn new(
        message: impl Into<String>,
        production: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        SyntaxError {
            message: message.into(),
            production: production.into(),
            location,
        }
    }
}

/// The include resolver could not supply a file
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot include '{path}': {reason} at {location}")]
pub struct IncludeError {
    pub path: String,
    pub reason: String,
    pub location: SourceLocation,
}

/// A `type ... as ...` alias could not be followed to a template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no template for {type_code}{} (alias at {location})", id_suffix(.id))]
    MissingTemplate {
        type_code: ResType,
        id: Option<i64>,
        location: SourceLocation,
    },

    #[error("alias cycle through {type_code} at {location}")]
    AliasCycle {
        type_code: ResType,
        location: SourceLocation,
    },
}

fn id_suffix(id: &Option<i64>) -> String {
    id.map(|id| format!(" ({})", id)).unwrap_or_default()
}

impl ResolveError {
    pub fn location(&self) -> SourceLocation {
        match self {
            ResolveError::MissingTemplate { location, .. }
            | ResolveError::AliasCycle { location, .. } => *location,
        }
    }
}

/// Any fatal diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RezError {
    #[error("lexical error: {0}")]
    Lex(#[from] LexError),

    #[error("directive error: {0}")]
    Directive(#[from] DirectiveError),

    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("include error: {0}")]
    Include(#[from] IncludeError),

    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),
}

impl RezError {
    pub fn location(&self) -> SourceLocation {
        match self {
            RezError::Lex(e) => e.location(),
            RezError::Directive(e) => e.location(),
            RezError::Eval(e) => e.location(),
            RezError::Syntax(e) => e.location,
            RezError::Include(e) => e.location,
            RezError::Resolve(e) => e.location(),
        }
    }
}

/// Non-fatal diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning: {} at {}", self.message, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_location() {
        let err = RezError::from(EvalError::DivisionByZero {
            operation: "/".to_string(),
            location: SourceLocation::new(3, 9),
        });
        assert_eq!(
            err.to_string(),
            "evaluation error: division by zero in '/' at line 3, column 9"
        );
        assert_eq!(err.location(), SourceLocation::new(3, 9));
    }

    #[test]
    fn test_syntax_error_names_production() {
        let err = SyntaxError::new("expected '{'", "type declaration", SourceLocation::new(1, 15));
        assert_eq!(
            err.to_string(),
            "expected '{' in type declaration at line 1, column 15"
        );
    }
}
