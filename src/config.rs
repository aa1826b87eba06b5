//! Parser configuration

use crate::constants::DEFAULT_MAX_INCLUDE_DEPTH;
use std::path::PathBuf;

/// Settings for one parse. Built with chained setters:
///
/// ```
/// use rezparse::ParserConfig;
///
/// let config = ParserConfig::new()
///     .include_path("RIncludes")
///     .define("SystemSevenOrLater", "1")
///     .strict_redefinition(true);
/// assert_eq!(config.defines.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Directories searched by `#include`, in order
    pub include_paths: Vec<PathBuf>,
    /// Macros defined before the source is read, as `(name, replacement text)`
    pub defines: Vec<(String, String)>,
    /// Decompiling: `rez` is 0 and `derez` is 1
    pub derez: bool,
    /// Treat redefining a macro with a different body as an error
    pub strict_redefinition: bool,
    pub max_include_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            include_paths: Vec::new(),
            defines: Vec::new(),
            derez: false,
            strict_redefinition: false,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.include_paths.push(path.into());
        self
    }

    pub fn define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.push((name.into(), value.into()));
        self
    }

    /// Add a define written the command-line way, `NAME` or `NAME=VALUE`.
    /// A bare name is defined as `1`.
    pub fn define_arg(self, arg: &str) -> Self {
        match arg.split_once('=') {
            Some((name, value)) => self.define(name.trim(), value),
            None => self.define(arg.trim(), "1"),
        }
    }

    pub fn derez(mut self, derez: bool) -> Self {
        self.derez = derez;
        self
    }

    pub fn strict_redefinition(mut self, strict: bool) -> Self {
        self.strict_redefinition = strict;
        self
    }

    pub fn max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }
}
