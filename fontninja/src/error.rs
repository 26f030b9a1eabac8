use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io failed for '{path}': '{source}'")]
    FileIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Unrecognized source {0}")]
    UnrecognizedSource(PathBuf),
    #[error("Missing file '{0}'")]
    FileExpected(PathBuf),
    #[error("Unable to load designspace '{path}': {reason}")]
    UnableToLoadSource { path: PathBuf, reason: String },
    #[error("Unable to save designspace '{path}': {reason}")]
    UnableToSaveSource { path: PathBuf, reason: String },
    #[error("Unable to extract '{path}': {source}")]
    GlyphsExtraction {
        path: PathBuf,
        #[source]
        source: glyphs_reader::Error,
    },
    #[error("Invalid recipe '{path}': {source}")]
    InvalidRecipe {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error(transparent)]
    YamlSerError(#[from] serde_yaml::Error),
    /// A required configuration key is absent
    #[error("Missing configuration: {0}")]
    Configuration(String),
    /// A named instance is absent and no explicit target was given
    #[error("Instance '{instance}' not found in {design:?}")]
    MissingInstance { instance: String, design: PathBuf },
    #[error("Instance '{instance}' in {design:?} has no filename")]
    InstanceWithoutFilename { instance: String, design: PathBuf },
    /// A recipe key the graph compiler cannot express
    #[error("'{0}' is not supported when building with a dependency graph")]
    UnsupportedFeature(String),
    #[error("{0} is not implemented")]
    UnimplementedStage(&'static str),
    #[error("Cannot set target {target:?} on {operation}, its target is derived from its inputs")]
    TargetLocked {
        operation: &'static str,
        target: PathBuf,
    },
    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),
    #[error("Rule '{0}' registered twice")]
    DuplicateRule(String),
    #[error("Rule '{0}' was never registered")]
    UnknownRule(String),
    #[error("'{0}' would be produced by more than one edge")]
    DuplicateOutput(PathBuf),
    #[error("'{dependency}' is an implicit input of '{consumer}' but nothing produces it")]
    DanglingDependency {
        dependency: PathBuf,
        consumer: PathBuf,
    },
    #[error("Unable to start '{program}': {source}")]
    SpawnFailed {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("'{program}' failed with exit status {status:?}")]
    ExecutionFailed {
        program: PathBuf,
        status: Option<i32>,
    },
}
