//! Rez source parser
//!
//! This module turns preprocessed Rez tokens into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`escapes`]: String escape decoding
//! - [`parse`]: the [`Parser`] itself (tokens → declarations)
//! - [`ast`]: AST node definitions
//!
//! # Supported statements
//!
//! - `type` templates with scalar, string, bit string, array, switch, fill and align fields
//! - `type ... as ...` aliases
//! - `resource`, `data` and `read` resources
//! - `enum`, `include`, `delete` and `change`
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with one function per precedence level.
//! No external parser generator dependencies.

pub mod ast;
mod declarations;
pub mod escapes;
mod expressions;
mod fields;
pub mod lexer;
pub mod parse;

pub use parse::{ParseOutput, Parser};
