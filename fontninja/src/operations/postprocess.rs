//! Steps that run on a compiled binary.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::{
    operations::{derived_path, Operation, Target, Upstream},
    paths::stamp_file,
    rules::{self, fix_args},
    Config, Error,
};

fn locked(operation: &'static str, target: PathBuf) -> Result<(), Error> {
    Err(Error::TargetLocked { operation, target })
}

/// gftools-fix-font, in place.
#[derive(Debug)]
pub struct Fix {
    upstream: Upstream,
    fixargs: String,
    stamp: [PathBuf; 1],
}

impl Fix {
    pub const NAME: &'static str = "fix";

    pub fn new(upstream: Upstream, config: &Config) -> Fix {
        let stamp = [stamp_file(upstream.primary(), "fixstamp")];
        Fix {
            upstream,
            fixargs: fix_args(config).join(" "),
            stamp,
        }
    }

    /// Use these flags instead of the configured ones
    pub fn with_args(mut self, fixargs: String) -> Fix {
        self.fixargs = fixargs;
        self
    }
}

impl Operation for Fix {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn rule(&self) -> &'static str {
        rules::FIX
    }

    fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    fn targets(&self) -> Result<&[PathBuf], Error> {
        Ok(&self.stamp)
    }

    fn variables(&self) -> Result<IndexMap<String, String>, Error> {
        let mut variables = IndexMap::new();
        if !self.fixargs.is_empty() {
            variables.insert("fixargs".to_string(), self.fixargs.clone());
        }
        Ok(variables)
    }

    fn set_target(&mut self, target: PathBuf) -> Result<(), Error> {
        locked(Self::NAME, target)
    }

    fn in_place(&self) -> bool {
        true
    }
}

/// ttfautohint, in place.
#[derive(Debug)]
pub struct Autohint {
    upstream: Upstream,
    args: String,
    stamp: [PathBuf; 1],
}

impl Autohint {
    pub const NAME: &'static str = "autohint";

    pub fn new(upstream: Upstream) -> Autohint {
        let stamp = [stamp_file(upstream.primary(), "hintstamp")];
        Autohint {
            upstream,
            args: String::new(),
            stamp,
        }
    }

    pub fn with_args(mut self, args: String) -> Autohint {
        self.args = args;
        self
    }
}

impl Operation for Autohint {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn rule(&self) -> &'static str {
        rules::AUTOHINT
    }

    fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    fn targets(&self) -> Result<&[PathBuf], Error> {
        Ok(&self.stamp)
    }

    fn variables(&self) -> Result<IndexMap<String, String>, Error> {
        let mut variables = IndexMap::new();
        if !self.args.is_empty() {
            variables.insert("autohint_args".to_string(), self.args.clone());
        }
        Ok(variables)
    }

    fn set_target(&mut self, target: PathBuf) -> Result<(), Error> {
        locked(Self::NAME, target)
    }

    fn in_place(&self) -> bool {
        true
    }
}

/// WOFF2 packaging. Without a target the woff2 lands next to its input.
#[derive(Debug)]
pub struct Compress {
    upstream: Upstream,
    target: Target,
}

impl Compress {
    pub const NAME: &'static str = "compress";

    pub fn new(upstream: Upstream) -> Compress {
        Compress {
            upstream,
            target: Target::default(),
        }
    }
}

impl Operation for Compress {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn rule(&self) -> &'static str {
        rules::WEBFONT
    }

    fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    fn targets(&self) -> Result<&[PathBuf], Error> {
        Ok(self
            .target
            .get_or(|| self.upstream.primary().with_extension("woff2")))
    }

    fn set_target(&mut self, target: PathBuf) -> Result<(), Error> {
        self.target.set(Self::NAME, target)
    }
}

#[derive(Debug)]
pub struct PaintCompiler {
    upstream: Upstream,
    args: String,
    scratch_dir: PathBuf,
    target: Target,
}

impl PaintCompiler {
    pub const NAME: &'static str = "paintcompiler";

    pub fn new(upstream: Upstream, args: String, scratch_dir: &Path) -> PaintCompiler {
        PaintCompiler {
            upstream,
            args,
            scratch_dir: scratch_dir.to_path_buf(),
            target: Target::default(),
        }
    }
}

impl Operation for PaintCompiler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn rule(&self) -> &'static str {
        rules::PAINTCOMPILER
    }

    fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    fn targets(&self) -> Result<&[PathBuf], Error> {
        Ok(self.target.get_or(|| {
            let input = self.upstream.primary();
            let extension = input
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_else(|| "ttf".to_string());
            derived_path(&self.scratch_dir, input, &extension)
        }))
    }

    fn variables(&self) -> Result<IndexMap<String, String>, Error> {
        Ok(IndexMap::from([(
            "paintcompiler_args".to_string(),
            self.args.clone(),
        )]))
    }

    fn set_target(&mut self, target: PathBuf) -> Result<(), Error> {
        self.target.set(Self::NAME, target)
    }
}
