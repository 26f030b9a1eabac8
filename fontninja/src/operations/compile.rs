use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::{
    operations::{derived_path, Operation, Target, Upstream},
    rules::{self, fontmake_args, quote_path},
    Config, Error,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Variable,
    Ttf,
    Otf,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Variable | Format::Ttf => "ttf",
            Format::Otf => "otf",
        }
    }

    fn rule(&self) -> &'static str {
        match self {
            Format::Variable => rules::VARIABLE,
            Format::Ttf => rules::BUILD_TTF,
            Format::Otf => rules::BUILD_OTF,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Format::Variable => "buildVariable",
            Format::Ttf => "buildTTF",
            Format::Otf => "buildOTF",
        }
    }
}

/// fontmake, from a designspace or UFO to a binary.
#[derive(Debug)]
pub struct Compile {
    format: Format,
    upstream: Upstream,
    fontmake_args: Vec<String>,
    scratch_dir: PathBuf,
    target: Target,
}

impl Compile {
    pub fn new(format: Format, upstream: Upstream, config: &Config, scratch_dir: &Path) -> Compile {
        let mut fontmake_args = fontmake_args(config);
        if format == Format::Variable && !config.check_compatibility {
            fontmake_args.push("--no-check-compatibility".to_string());
        }
        Compile {
            format,
            upstream,
            fontmake_args,
            scratch_dir: scratch_dir.to_path_buf(),
            target: Target::default(),
        }
    }

    /// Use these flags instead of the configured ones. Output routing is
    /// still added.
    pub fn with_fontmake_args(mut self, args: String) -> Compile {
        self.fontmake_args = vec![args];
        self
    }

    fn resolved_targets(&self) -> &[PathBuf] {
        self.target.get_or(|| {
            derived_path(
                &self.scratch_dir,
                self.upstream.primary(),
                self.format.extension(),
            )
        })
    }
}

impl Operation for Compile {
    fn name(&self) -> &'static str {
        self.format.name()
    }

    fn rule(&self) -> &'static str {
        self.format.rule()
    }

    fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    fn targets(&self) -> Result<&[PathBuf], Error> {
        Ok(self.resolved_targets())
    }

    fn variables(&self) -> Result<IndexMap<String, String>, Error> {
        let mut args = self.fontmake_args.clone();
        args.push(format!("--output-path {}", quote_path(&self.resolved_targets()[0])));
        Ok(IndexMap::from([("fontmake_args".to_string(), args.join(" "))]))
    }

    fn set_target(&mut self, target: PathBuf) -> Result<(), Error> {
        self.target.set(self.name(), target)
    }
}
