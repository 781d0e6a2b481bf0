//! Built-in resource kinds

pub mod new_file;
pub mod regex_filter;
pub mod regex_replace;
pub mod remove_file;

pub use new_file::{FileDetails, NewFile, NewFileSpec};
pub use regex_filter::{RegexFilter, RegexFilterSpec};
pub use regex_replace::{RegexReplace, RegexReplaceSpec, Replacement, ReplacementDetails};
pub use remove_file::{RemoveFile, RemoveFileSpec};

use gator_core::{Error, Result};
use regex::{Regex, RegexBuilder};

/// Compile a pattern from a resource spec. Multi-line mode, so `^` and `$`
/// anchor at line boundaries.
pub(crate) fn compile_pattern(kind: &str, pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .build()
        .map_err(|e| {
            Error::invalid_specification_from(
                format!("{}: invalid regex '{}'", kind, pattern),
                e,
            )
        })
}
