//! RegexReplaceCodeChange — literal substitution of every regex match

use super::compile_pattern;
use crate::content::recursive_path_contents;
use crate::model::{Behavior, CodeChange};
use crate::registry::ResourceSpec;
use gator_core::{Capability, Result, VERSION_V1ALPHA};
use regex::{NoExpand, Regex};
use serde::Deserialize;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegexReplaceSpec {
    pub replacements: Vec<ReplacementDetails>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ReplacementDetails {
    pub regex: String,
    pub paths: Vec<String>,
    pub replace_term: String,
}

impl ResourceSpec for RegexReplaceSpec {
    const KIND: &'static str = "RegexReplaceCodeChange";
    const VERSION: &'static str = VERSION_V1ALPHA;
    const CAPABILITY: Capability = Capability::CodeChange;

    fn into_behavior(self) -> Result<Behavior> {
        let replacements = self
            .replacements
            .into_iter()
            .map(|details| {
                Ok(Replacement {
                    expression: compile_pattern(Self::KIND, &details.regex)?,
                    paths: details.paths,
                    replace_term: details.replace_term,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Behavior::code_change(RegexReplace { replacements }))
    }
}

#[derive(Debug)]
pub struct Replacement {
    expression: Regex,
    paths: Vec<String>,
    replace_term: String,
}

impl Replacement {
    /// Rewrite every readable file under `path`. Returns how many files changed.
    ///
    /// `Ok(None)` when `path` itself does not exist.
    fn apply_to(&self, path: &Path) -> Result<Option<usize>> {
        let contents = match recursive_path_contents(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut rewritten = 0;
        for (file, content) in contents {
            let replaced = self
                .expression
                .replace_all(&content, NoExpand(&self.replace_term));
            if replaced != content.as_str() {
                std::fs::write(&file, replaced.as_bytes())?;
                debug!("Rewrote {}", file.display());
                rewritten += 1;
            }
        }
        Ok(Some(rewritten))
    }
}

#[derive(Debug)]
pub struct RegexReplace {
    replacements: Vec<Replacement>,
}

impl CodeChange for RegexReplace {
    fn apply_change(&self, root: &Path) -> Result<()> {
        for replacement in &self.replacements {
            for spec_path in &replacement.paths {
                let subpath_root = root.join(spec_path);
                if replacement.apply_to(&subpath_root)?.is_none() {
                    warn!(
                        "Provided spec path does not exist in repo: {}",
                        subpath_root.display()
                    );
                }
            }
        }
        Ok(())
    }
}
