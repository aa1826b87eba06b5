//! # Introduction
//!
//! rezparse is a front-end for the Macintosh Rez resource description
//! language. It reads Rez source, runs the C-like preprocessor over it and
//! produces the ordered list of type templates, resources and the other
//! top-level statements, ready for a compiler back-end or a decompiler.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Lexer → Preprocessor → Parser → Declarations → TemplateIndex
//! ```
//!
//! 1. [`parser::lexer`]: tokenises the source, decoding string escapes and
//!    numeric literal forms.
//! 2. [`preprocessor`]: `#define`, `#if` and friends, `#include`, `#printf`
//!    and macro expansion with adjacent-string merging.
//! 3. [`parser`]: recursive descent over the preprocessed tokens, building
//!    [`parser::ast::Declaration`]s. Constant value expressions are folded on
//!    the way through [`eval`].
//! 4. [`resolve`]: follows `type ... as ...` aliases once parsing is done.
//!
//! Everything outside the process (include files, `$$Read` data, the build
//! clock) comes through the collaborators in [`host`].
//!
//! ## Example
//!
//! ```
//! use rezparse::{parse_source, ParserConfig};
//! use rezparse::parser::ast::Declaration;
//!
//! let output = parse_source(
//!     "#define GREETING \"Hello\"\nresource 'STR ' (128) { GREETING \", world\" };",
//!     &ParserConfig::default(),
//! );
//! let declarations = output.into_result().unwrap();
//! assert!(matches!(declarations[0], Declaration::Resource(_)));
//! ```

pub mod config;
pub mod constants;
pub mod errors;
pub mod eval;
pub mod host;
pub mod parser;
pub mod preprocessor;
pub mod resolve;

pub use config::ParserConfig;
pub use errors::{
    DirectiveError, EvalError, IncludeError, LexError, ResolveError, RezError, SyntaxError,
    Warning,
};
pub use host::Host;
pub use parser::{ParseOutput, Parser};
pub use resolve::TemplateIndex;

/// Parse `source` with `config`, resolving includes on the file system.
pub fn parse_source(source: &str, config: &ParserConfig) -> ParseOutput {
    Parser::with_config(source, config).parse_file()
}
