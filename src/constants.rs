// Constants for the Rez front-end

/// Maximum `#include` nesting before the preprocessor gives up
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

/// Name reported for sources parsed from a string
pub const DEFAULT_SOURCE_NAME: &str = "<input>";

/// Macros every translation unit starts with. `rez` and `derez` depend on the mode.
pub const PREDEFINED_TRUE: (&str, i64) = ("true", 1);
pub const PREDEFINED_FALSE: (&str, i64) = ("false", 0);
pub const REZ_MACRO: &str = "rez";
pub const DEREZ_MACRO: &str = "derez";

/// Largest left shift (and `$$BitField` width) the evaluator will perform
pub const MAX_SHIFT_BITS: usize = 1 << 16;

/// `#printf` and `$$Format` reject calls with more arguments than this
pub const MAX_FORMAT_ARGS: usize = 20;
