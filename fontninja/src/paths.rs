//! Where do generated files go?
//!
//! Every path that ends up in the graph is relative to the root directory, the
//! executor runs from there. Anything the compiler itself reads or writes goes
//! through [`Paths::on_disk`].

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::debug;

use crate::Error;

#[derive(Debug, Clone)]
pub struct Paths {
    root: PathBuf,
    build_file: PathBuf,
    master_dir: PathBuf,
    instance_dir: PathBuf,
    scratch_dir: PathBuf,
}

impl Paths {
    pub fn new(root: &Path) -> Paths {
        Paths {
            root: root.to_path_buf(),
            build_file: PathBuf::from("build.ninja"),
            master_dir: PathBuf::from("master_ufo"),
            instance_dir: PathBuf::from("instance_ufo"),
            scratch_dir: PathBuf::from("build_tmp"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The graph description, relative to root
    pub fn build_file(&self) -> &Path {
        &self.build_file
    }

    /// Where converted Glyphs sources are staged
    pub fn master_dir(&self) -> &Path {
        &self.master_dir
    }

    /// Where instances of Glyphs sources are written
    pub fn instance_dir(&self) -> &Path {
        &self.instance_dir
    }

    /// Intermediate files of explicit recipes
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn stat_file(&self) -> PathBuf {
        self.scratch_dir.join("stat.yaml")
    }

    pub fn on_disk(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }
}

/// `<file>.<kind>`, e.g. `A.ttf.fixstamp`
pub fn stamp_file(file: &Path, kind: &str) -> PathBuf {
    let mut stamp = file.as_os_str().to_owned();
    stamp.push(".");
    stamp.push(kind);
    PathBuf::from(stamp)
}

pub(crate) fn require_dir(dir: &Path) -> Result<PathBuf, Error> {
    if dir.exists() && !dir.is_dir() {
        return Err(Error::FileIo {
            path: dir.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "taken by something that isn't a directory",
            ),
        });
    }
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|source| Error::FileIo {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    debug!("require_dir {:?}", dir);
    Ok(dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn generated_paths_are_relative() {
        let paths = Paths::new(Path::new("/fonts/src"));
        assert!(paths.build_file().is_relative());
        assert!(paths.master_dir().is_relative());
        assert!(paths.stat_file().is_relative());
        assert_eq!(
            PathBuf::from("/fonts/src/master_ufo"),
            paths.on_disk(paths.master_dir())
        );
    }

    #[test]
    fn stamps_extend_the_filename() {
        assert_eq!(
            PathBuf::from("vf/Family[wght].ttf.statstamp"),
            stamp_file(Path::new("vf/Family[wght].ttf"), "statstamp")
        );
    }

    #[test]
    fn require_dir_rejects_files() {
        let temp_dir = tempdir().unwrap();
        let file = temp_dir.path().join("taken");
        fs::write(&file, "").unwrap();
        assert!(require_dir(&file).is_err());
        assert!(require_dir(&temp_dir.path().join("a/b")).unwrap().is_dir());
    }
}
