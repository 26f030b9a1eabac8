//! Runs a written graph.

use std::{path::PathBuf, process::Command};

use log::info;

use crate::{Error, Paths};

pub trait Executor {
    /// Run the graph at `paths.build_file()`.
    ///
    /// Debug runs are serial and verbose.
    fn execute(&self, paths: &Paths, debug: bool) -> Result<(), Error>;
}

/// Runs the graph with a ninja binary
#[derive(Debug, Clone)]
pub struct Ninja {
    program: PathBuf,
}

impl Ninja {
    pub fn new(program: impl Into<PathBuf>) -> Ninja {
        Ninja {
            program: program.into(),
        }
    }

    pub fn command(&self, paths: &Paths, debug: bool) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-C")
            .arg(paths.root())
            .arg("-f")
            .arg(paths.build_file());
        if debug {
            command.args(["-v", "-j", "1"]);
        }
        command
    }
}

impl Default for Ninja {
    fn default() -> Self {
        Ninja::new("ninja")
    }
}

impl Executor for Ninja {
    fn execute(&self, paths: &Paths, debug: bool) -> Result<(), Error> {
        let mut command = self.command(paths, debug);
        info!("Running {command:?}");
        let status = command.status().map_err(|source| Error::SpawnFailed {
            program: self.program.clone(),
            source,
        })?;
        if !status.success() {
            return Err(Error::ExecutionFailed {
                program: self.program.clone(),
                status: status.code(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{ffi::OsStr, path::Path};

    use pretty_assertions::assert_eq;

    #[test]
    fn serial_and_verbose_when_debugging() {
        let paths = Paths::new(Path::new("fonts/sources"));
        let ninja = Ninja::default();
        let args = |debug| {
            ninja
                .command(&paths, debug)
                .get_args()
                .map(|a| a.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
        };
        assert_eq!(vec!["-C", "fonts/sources", "-f", "build.ninja"], args(false));
        assert_eq!(
            vec!["-C", "fonts/sources", "-f", "build.ninja", "-v", "-j", "1"],
            args(true)
        );
        assert_eq!(
            OsStr::new("ninja"),
            ninja.command(&paths, false).get_program()
        );
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_is_reported() {
        let temp_dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(temp_dir.path());
        Ninja::new("true").execute(&paths, false).unwrap();
        let result = Ninja::new("false").execute(&paths, false);
        assert!(
            matches!(result, Err(Error::ExecutionFailed { status: Some(1), .. })),
            "{result:?}"
        );
    }

    #[test]
    fn missing_program() {
        let temp_dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(temp_dir.path());
        let result = Ninja::new("definitely-not-ninja-4c1d").execute(&paths, false);
        assert!(matches!(result, Err(Error::SpawnFailed { .. })), "{result:?}");
    }
}
