//! Recursive content reader — (path, text) pairs for a file or directory tree
//!
//! Version-control metadata directories are never entered. Entries that cannot
//! be walked or read (dangling links, permission problems) and files that are
//! not valid UTF-8 are logged and skipped; they never end the sequence.

use gator_core::GIT_INTERNALS_DIRECTORY;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// A restartable description of what to read. Every call to [`iter`](Self::iter)
/// walks the tree afresh.
#[derive(Clone, Debug)]
pub struct RecursiveContents {
    root: PathBuf,
    excluded: Vec<String>,
}

impl RecursiveContents {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            excluded: vec![GIT_INTERNALS_DIRECTORY.to_string()],
        }
    }

    /// Also skip any file or directory with this name.
    pub fn excluding(mut self, name: impl Into<String>) -> Self {
        self.excluded.push(name.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a walk. Fails with `NotFound` when the root does not exist.
    pub fn iter(&self) -> io::Result<ContentIter> {
        // Surface a missing root up front instead of as the first item.
        self.root.metadata()?;
        Ok(ContentIter {
            walker: WalkDir::new(&self.root)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter(),
            excluded: self.excluded.clone(),
        })
    }
}

/// Shorthand for `RecursiveContents::new(path).iter()`.
pub fn recursive_path_contents(path: impl AsRef<Path>) -> io::Result<ContentIter> {
    RecursiveContents::new(path).iter()
}

pub struct ContentIter {
    walker: walkdir::IntoIter,
    excluded: Vec<String>,
}

impl ContentIter {
    fn is_excluded(&self, entry: &walkdir::DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        self.excluded.iter().any(|e| *e == name)
    }
}

impl Iterator for ContentIter {
    type Item = (PathBuf, String);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                    warn!("could not walk path {}: {}", path, e);
                    continue;
                }
            };

            if self.is_excluded(&entry) {
                if entry.file_type().is_dir() {
                    self.walker.skip_current_dir();
                }
                continue;
            }

            if !entry.file_type().is_file() {
                continue;
            }

            let bytes = match std::fs::read(entry.path()) {
                Ok(b) => b,
                Err(e) => {
                    warn!("could not read path {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            match String::from_utf8(bytes) {
                Ok(content) => return Some((entry.into_path(), content)),
                Err(e) => {
                    warn!("could not decode text at path {}: {}", entry.path().display(), e);
                    continue;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn collect(path: &Path) -> Vec<(PathBuf, String)> {
        recursive_path_contents(path).unwrap().collect()
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(collect(tmp.path()).is_empty());
    }

    #[test]
    fn missing_path_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let err = recursive_path_contents(tmp.path().join("some-dir-dne"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn single_file_root_yields_that_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("some-filename-1");
        std::fs::write(&file, "some-text-1").unwrap();
        assert_eq!(collect(&file), vec![(file.clone(), "some-text-1".to_string())]);
    }

    #[test]
    fn nested_and_root_files_are_all_read() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("some-dir-1")).unwrap();
        std::fs::create_dir_all(tmp.path().join("some-dir-2")).unwrap();
        std::fs::write(tmp.path().join("some-dir-1/a"), "some-text-1").unwrap();
        std::fs::write(tmp.path().join("some-dir-2/b"), "some-text-2").unwrap();
        std::fs::write(tmp.path().join("c"), "some-text-3").unwrap();

        let got: BTreeSet<_> = collect(tmp.path()).into_iter().collect();
        let expected: BTreeSet<_> = [
            (tmp.path().join("some-dir-1/a"), "some-text-1".to_string()),
            (tmp.path().join("some-dir-2/b"), "some-text-2".to_string()),
            (tmp.path().join("c"), "some-text-3".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn git_directory_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join(".git/objects")).unwrap();
        std::fs::write(tmp.path().join(".git/HEAD"), "ref: refs/heads/main").unwrap();
        std::fs::write(tmp.path().join(".git/objects/x"), "blob").unwrap();
        assert!(collect(tmp.path()).is_empty());
    }

    #[test]
    fn undecodable_file_is_skipped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a-text"), "some-text-1").unwrap();
        // UTF-16 with BOM, not valid UTF-8
        std::fs::write(tmp.path().join("b-binary"), [0xff, 0xfe, b'f', 0, b'o', 0, b'o', 0])
            .unwrap();
        assert_eq!(
            collect(tmp.path()),
            vec![(tmp.path().join("a-text"), "some-text-1".to_string())]
        );
    }

    #[cfg(unix)]
    #[test]
    fn dangling_link_is_skipped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(tmp.path().join("nowhere"), tmp.path().join("a-link")).unwrap();
        std::fs::write(tmp.path().join("b.txt"), "some-text-1").unwrap();
        assert_eq!(
            collect(tmp.path()),
            vec![(tmp.path().join("b.txt"), "some-text-1".to_string())]
        );
    }

    #[test]
    fn extra_exclusions_apply() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("node_modules")).unwrap();
        std::fs::write(tmp.path().join("node_modules/dep.js"), "x").unwrap();
        std::fs::write(tmp.path().join("main.js"), "y").unwrap();

        let contents = RecursiveContents::new(tmp.path()).excluding("node_modules");
        let first: Vec<_> = contents.iter().unwrap().map(|(path, _)| path).collect();
        let second: Vec<_> = contents.iter().unwrap().map(|(path, _)| path).collect();
        assert_eq!(first, vec![tmp.path().join("main.js")]);
        assert_eq!(first, second);
    }
}
