//! NewFileCodeChange — create files that do not exist yet

use crate::model::{Behavior, CodeChange};
use crate::registry::ResourceSpec;
use gator_core::{Capability, Result, VERSION_V1ALPHA};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewFileSpec {
    pub files: Vec<FileDetails>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct FileDetails {
    pub file_path: String,
    pub file_content: String,
}

impl ResourceSpec for NewFileSpec {
    const KIND: &'static str = "NewFileCodeChange";
    const VERSION: &'static str = VERSION_V1ALPHA;
    const CAPABILITY: Capability = Capability::CodeChange;

    fn into_behavior(self) -> Result<Behavior> {
        Ok(Behavior::code_change(NewFile { files: self.files }))
    }
}

#[derive(Debug)]
pub struct NewFile {
    files: Vec<FileDetails>,
}

impl CodeChange for NewFile {
    fn apply_change(&self, root: &Path) -> Result<()> {
        for details in &self.files {
            let full_path = root.join(&details.file_path);
            if let Some(parent) = full_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            if full_path.exists() {
                info!("Skipping {} because file already exists", full_path.display());
                continue;
            }
            std::fs::write(&full_path, &details.file_content)?;
            debug!("Created {}", full_path.display());
        }
        Ok(())
    }
}
