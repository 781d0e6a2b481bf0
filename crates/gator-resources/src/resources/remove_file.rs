//! RemoveFileCodeChange — delete files, then their parent if left empty

use crate::model::{Behavior, CodeChange};
use crate::registry::ResourceSpec;
use gator_core::{Capability, Result, VERSION_V1ALPHA};
use serde::Deserialize;
use std::io;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoveFileSpec {
    pub files: Vec<String>,
}

impl ResourceSpec for RemoveFileSpec {
    const KIND: &'static str = "RemoveFileCodeChange";
    const VERSION: &'static str = VERSION_V1ALPHA;
    const CAPABILITY: Capability = Capability::CodeChange;

    fn into_behavior(self) -> Result<Behavior> {
        Ok(Behavior::code_change(RemoveFile { files: self.files }))
    }
}

#[derive(Debug)]
pub struct RemoveFile {
    files: Vec<String>,
}

impl CodeChange for RemoveFile {
    fn apply_change(&self, root: &Path) -> Result<()> {
        for file in &self.files {
            let file_path = root.join(file);
            match std::fs::remove_file(&file_path) {
                Ok(()) => debug!("Removed {}", file_path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    info!("Skipping {} because file does not exist", file_path.display());
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
            remove_parent_if_empty(root, &file_path)?;
        }
        Ok(())
    }
}

/// One level only; the working-tree root is never removed.
fn remove_parent_if_empty(root: &Path, file_path: &Path) -> Result<()> {
    let Some(parent) = file_path.parent() else {
        return Ok(());
    };
    if parent == root {
        return Ok(());
    }
    if std::fs::read_dir(parent)?.next().is_none() {
        std::fs::remove_dir(parent)?;
        debug!("Removed empty directory {}", parent.display());
    }
    Ok(())
}
