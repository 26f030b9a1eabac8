//! Build steps that validate themselves before joining the graph.
//!
//! An [`Operation`] knows its rule, what it reads and what it makes. The graph
//! builder uses them for every step that has one, and explicit recipes are
//! nothing but lists of them.

mod compile;
mod instantiate;
mod postprocess;

use std::{
    cell::OnceCell,
    path::{Path, PathBuf},
    sync::Arc,
};

use indexmap::IndexMap;
use serde_yaml::Value;

use crate::{ninja::Edge, ninja::Fragment, source::ResolvedSource, Config, Error, Paths};

pub use compile::{Compile, Format};
pub use instantiate::InstantiateUfo;
pub use postprocess::{Autohint, Compress, Fix, PaintCompiler};

/// What a step reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Upstream {
    pub inputs: Vec<PathBuf>,
    /// Must exist first but isn't passed to the tool
    pub implicit: Vec<PathBuf>,
}

impl Upstream {
    pub fn of(input: impl Into<PathBuf>) -> Upstream {
        Upstream {
            inputs: vec![input.into()],
            implicit: Vec::new(),
        }
    }

    pub fn after(mut self, stamps: impl IntoIterator<Item = PathBuf>) -> Upstream {
        self.implicit.extend(stamps);
        self
    }

    /// The file a step works on
    pub(crate) fn primary(&self) -> &Path {
        self.inputs.first().map(PathBuf::as_path).unwrap_or(Path::new(""))
    }
}

pub trait Operation {
    /// The name recipes use for this operation
    fn name(&self) -> &'static str;

    fn rule(&self) -> &'static str;

    fn upstream(&self) -> &Upstream;

    /// Checked before the operation contributes anything.
    fn validate(&self) -> Result<(), Error> {
        Ok(())
    }

    /// What the operation makes.
    ///
    /// Computed on first use and fixed from then on.
    fn targets(&self) -> Result<&[PathBuf], Error>;

    fn variables(&self) -> Result<IndexMap<String, String>, Error> {
        Ok(IndexMap::new())
    }

    /// Choose the target instead of deriving it.
    fn set_target(&mut self, target: PathBuf) -> Result<(), Error>;

    /// A target chosen when the operation was created, if any
    fn explicit_target(&self) -> Option<&Path> {
        None
    }

    /// Modifies its input and only makes a stamp file.
    fn in_place(&self) -> bool {
        false
    }
}

/// Validate an operation and add its edge to the fragment.
///
/// Returns the targets. Stamps of in place operations are recorded as
/// transient.
pub fn contribute(op: &dyn Operation, fragment: &mut Fragment) -> Result<Vec<PathBuf>, Error> {
    op.validate()?;
    let targets = op.targets()?.to_vec();
    let upstream = op.upstream();
    let mut edge = Edge::new(op.rule(), targets.clone(), upstream.inputs.clone())
        .with_implicit(upstream.implicit.clone());
    edge.variables = op.variables()?;
    if op.in_place() {
        for stamp in targets.iter() {
            fragment.transient(stamp.clone());
        }
    }
    fragment.edge(edge);
    Ok(targets)
}

/// A single target that can be set once, or derived on first read.
#[derive(Debug, Default)]
pub(crate) struct Target(OnceCell<[PathBuf; 1]>);

impl Target {
    pub(crate) fn get_or(&self, derive: impl FnOnce() -> PathBuf) -> &[PathBuf] {
        self.0.get_or_init(|| [derive()])
    }

    pub(crate) fn set(&self, operation: &'static str, target: PathBuf) -> Result<(), Error> {
        self.0
            .set([target])
            .map_err(|[target]| Error::TargetLocked { operation, target })
    }
}

/// `<dir>/<stem of input>.<extension>`
pub(crate) fn derived_path(dir: &Path, input: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.join(format!("{stem}.{extension}"))
}

/// What a recipe step is working on
#[derive(Debug, Clone)]
pub enum Input {
    Design(Arc<ResolvedSource>),
    File(PathBuf),
}

impl Input {
    pub fn path(&self) -> &Path {
        match self {
            Input::Design(source) => &source.designspace,
            Input::File(path) => path,
        }
    }
}

fn string_arg(args: &IndexMap<String, Value>, key: &str) -> Option<String> {
    match args.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => serde_yaml::to_string(other)
            .ok()
            .map(|s| s.trim_end().to_string()),
    }
}

/// Step keys each operation understands, besides `operation` itself
fn known_args(name: &str) -> Option<&'static [&'static str]> {
    let known: &'static [&'static str] = match name {
        InstantiateUfo::NAME => &["instance_name", "target", "fontmake_args"],
        "buildVariable" | "buildTTF" | "buildOTF" => &["fontmake_args"],
        Fix::NAME => &["fixargs"],
        Autohint::NAME => &["autohint_args"],
        Compress::NAME => &[],
        PaintCompiler::NAME => &["args"],
        _ => return None,
    };
    Some(known)
}

/// Whether the named operation modifies its input rather than making a file
pub fn is_in_place(name: &str) -> bool {
    matches!(name, Fix::NAME | Autohint::NAME)
}

/// Create the operation a recipe step names.
///
/// Step keys the operation doesn't understand are rejected.
pub fn from_step(
    name: &str,
    args: &IndexMap<String, Value>,
    input: &Input,
    upstream: Upstream,
    config: &Config,
    paths: &Paths,
) -> Result<Box<dyn Operation>, Error> {
    let known = known_args(name).ok_or_else(|| Error::UnknownOperation(name.to_string()))?;
    if let Some(unknown) = args.keys().find(|k| !known.contains(&k.as_str())) {
        return Err(Error::Configuration(format!(
            "{name} doesn't take '{unknown}'"
        )));
    }
    let scratch = paths.scratch_dir();
    let fontmake_args = string_arg(args, "fontmake_args");
    let op: Box<dyn Operation> = match name {
        InstantiateUfo::NAME => {
            let Input::Design(source) = input else {
                return Err(Error::Configuration(format!(
                    "{name} needs a design source, not {:?}",
                    input.path()
                )));
            };
            let op = InstantiateUfo::new(
                source.clone(),
                upstream,
                string_arg(args, "instance_name"),
                string_arg(args, "target").map(PathBuf::from),
                config,
                paths.instance_dir(),
            );
            Box::new(match fontmake_args {
                Some(fontmake_args) => op.with_fontmake_args(fontmake_args),
                None => op,
            })
        }
        "buildVariable" | "buildTTF" | "buildOTF" => {
            let format = match name {
                "buildVariable" => Format::Variable,
                "buildTTF" => Format::Ttf,
                _ => Format::Otf,
            };
            let op = Compile::new(format, upstream, config, scratch);
            Box::new(match fontmake_args {
                Some(fontmake_args) => op.with_fontmake_args(fontmake_args),
                None => op,
            })
        }
        Fix::NAME => {
            let fix = Fix::new(upstream, config);
            Box::new(match string_arg(args, "fixargs") {
                Some(fixargs) => fix.with_args(fixargs),
                None => fix,
            })
        }
        Autohint::NAME => Box::new(
            Autohint::new(upstream).with_args(string_arg(args, "autohint_args").unwrap_or_default()),
        ),
        Compress::NAME => Box::new(Compress::new(upstream)),
        PaintCompiler::NAME => Box::new(PaintCompiler::new(
            upstream,
            string_arg(args, "args").unwrap_or_default(),
            scratch,
        )),
        _ => return Err(Error::UnknownOperation(name.to_string())),
    };
    Ok(op)
}
