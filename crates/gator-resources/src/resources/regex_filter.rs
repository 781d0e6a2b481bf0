//! RegexFilter — matches when any configured path contains the pattern

use super::compile_pattern;
use crate::content::recursive_path_contents;
use crate::model::{Behavior, Filter};
use crate::registry::ResourceSpec;
use gator_core::{Capability, Result, VERSION_V1ALPHA};
use regex::Regex;
use serde::Deserialize;
use std::io;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexFilterSpec {
    pub regex: String,
    /// Files or directories, relative to the repository root.
    pub paths: Vec<String>,
}

impl ResourceSpec for RegexFilterSpec {
    const KIND: &'static str = "RegexFilter";
    const VERSION: &'static str = VERSION_V1ALPHA;
    const CAPABILITY: Capability = Capability::Filter;

    fn into_behavior(self) -> Result<Behavior> {
        Ok(Behavior::filter(RegexFilter::new(&self.regex, self.paths)?))
    }
}

#[derive(Debug)]
pub struct RegexFilter {
    expression: Regex,
    paths: Vec<String>,
}

impl RegexFilter {
    pub fn new(pattern: &str, paths: Vec<String>) -> Result<Self> {
        Ok(Self {
            expression: compile_pattern(RegexFilterSpec::KIND, pattern)?,
            paths,
        })
    }
}

impl Filter for RegexFilter {
    fn matches(&self, root: &Path) -> Result<bool> {
        for spec_path in &self.paths {
            let search_path = root.join(spec_path);
            let contents = match recursive_path_contents(&search_path) {
                Ok(contents) => contents,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("Provided spec path {} does not exist", search_path.display());
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            for (_, content) in contents {
                if self.expression.is_match(&content) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_regex_is_rejected_at_build() {
        let err = RegexFilter::new("(unclosed", vec![]).unwrap_err();
        assert!(err.is_specification_error());
    }

    #[test]
    fn anchors_are_line_based() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("setup.cfg"), "[metadata]\nname = thing\n").unwrap();
        let filter = RegexFilter::new("^name = ", vec!["setup.cfg".into()]).unwrap();
        assert!(filter.matches(tmp.path()).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn dangling_link_does_not_fail_the_filter() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::os::unix::fs::symlink(src.join("nowhere"), src.join("a-link")).unwrap();
        std::fs::write(src.join("b.txt"), "python3.8\n").unwrap();

        let filter = RegexFilter::new("python3", vec!["src".into()]).unwrap();
        assert!(filter.matches(tmp.path()).unwrap());
        let filter = RegexFilter::new("python2", vec!["src".into()]).unwrap();
        assert!(!filter.matches(tmp.path()).unwrap());
    }
}
