//! Command line arguments

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// Which font family shall we build today?
#[derive(Serialize, Deserialize, Parser, Debug, Clone, PartialEq)]
#[command(version)]
pub struct Args {
    /// A recipe (.yaml) describing the family
    pub recipe: PathBuf,

    /// Directory the graph is written to and run from. Defaults to the recipe's directory.
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Write build.ninja but don't run it.
    #[arg(long)]
    #[clap(default_value = "false")]
    pub emit_only: bool,

    /// The ninja binary to run the graph with
    #[arg(long)]
    #[clap(default_value = "ninja")]
    pub ninja: PathBuf,
}

impl Args {
    /// Manually create args for testing
    #[cfg(test)]
    pub fn for_test(recipe: &std::path::Path) -> Args {
        Args {
            recipe: recipe.to_path_buf(),
            root: None,
            emit_only: true,
            ninja: PathBuf::from("ninja"),
        }
    }

    pub fn root(&self) -> PathBuf {
        if let Some(root) = &self.root {
            return root.clone();
        }
        match self.recipe.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}
