//! Files that only exist to order the build.
//!
//! Stamp files and staged inputs are recorded as stages emit them and removed
//! once the executor reports success.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use indexmap::IndexSet;
use log::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transients(IndexSet<PathBuf>);

impl Transients {
    pub fn record(&mut self, path: impl Into<PathBuf>) {
        self.0.insert(path.into());
    }

    pub fn merge(&mut self, other: Transients) {
        self.0.extend(other.0);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remove whichever transient files still exist under root.
    ///
    /// Returns how many were removed. Failures are logged, never fatal.
    pub fn clean_up(&self, root: &Path) -> usize {
        let mut removed = 0;
        for transient in self.0.iter() {
            let file = root.join(transient);
            match fs::remove_file(&file) {
                Ok(()) => {
                    debug!("Removed {file:?}");
                    removed += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("{file:?} is already gone");
                }
                Err(e) => warn!("Unable to remove {file:?}: {e}"),
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn merge_keeps_first_seen_order() {
        let mut first = Transients::default();
        first.record("b.fixstamp");
        first.record("a.fixstamp");
        let mut second = Transients::default();
        second.record("a.fixstamp");
        second.record("c.statstamp");
        first.merge(second);
        assert_eq!(
            vec!["b.fixstamp", "a.fixstamp", "c.statstamp"],
            first
                .iter()
                .map(|p| p.to_str().unwrap())
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn clean_up_skips_missing_files() {
        let _ = env_logger::builder().is_test(true).try_init();
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("fonts")).unwrap();
        fs::write(root.join("fonts/A.ttf.fixstamp"), "").unwrap();
        fs::write(root.join("fonts/A.ttf"), "font").unwrap();

        let mut transients = Transients::default();
        transients.record("fonts/A.ttf.fixstamp");
        transients.record("fonts/A.ttf.hintstamp");

        assert_eq!(1, transients.clean_up(root));
        assert!(!root.join("fonts/A.ttf.fixstamp").exists());
        assert!(root.join("fonts/A.ttf").exists());
        // a second pass finds nothing left to do
        assert_eq!(0, transients.clean_up(root));
    }

    #[test]
    fn clean_up_survives_undeletable_entries() {
        let _ = env_logger::builder().is_test(true).try_init();
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        // a directory can't be removed as a file
        fs::create_dir_all(root.join("stuck.fixstamp")).unwrap();
        fs::write(root.join("ok.fixstamp"), "").unwrap();

        let mut transients = Transients::default();
        transients.record("stuck.fixstamp");
        transients.record("ok.fixstamp");

        assert_eq!(1, transients.clean_up(root));
        assert!(root.join("stuck.fixstamp").is_dir());
    }
}
