//! Turns configured sources into design descriptions the stages can plan from.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use glyphs_reader::{ExtractionMode, Font};
use indexmap::{IndexMap, IndexSet};
use log::{debug, info};

use crate::{
    design::{instance_path, DesignDescription},
    ninja::{Edge, Fragment},
    paths::{require_dir, Paths},
    rules::{quote_path, GLYPHS2UFO},
    Config, Error,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A designspace, used as is
    NativeDesign,
    /// A .glyphs file, converted to a designspace by the build
    GlyphInterchange,
}

/// A configured source and the design it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSource {
    /// The source as configured
    pub origin: PathBuf,
    /// The designspace later stages read, relative to root
    pub designspace: PathBuf,
    pub kind: SourceKind,
    pub design: DesignDescription,
}

impl ResolvedSource {
    pub fn is_glyphs(&self) -> bool {
        self.kind == SourceKind::GlyphInterchange
    }

    /// The designspace filename without its extension
    pub fn stem(&self) -> String {
        self.designspace
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Where each instance of the design is written, in declaration order.
    pub fn instance_paths(&self) -> Result<Vec<PathBuf>, Error> {
        self.design
            .instances
            .iter()
            .map(|instance| {
                instance
                    .filename
                    .as_deref()
                    .map(|filename| instance_path(&self.designspace, filename))
                    .ok_or_else(|| Error::InstanceWithoutFilename {
                        instance: instance.name.clone().unwrap_or_default(),
                        design: self.designspace.clone(),
                    })
            })
            .collect()
    }

    /// Guess whether this is an italic design from its path alone.
    ///
    /// Style names inside the source are not consulted. Upright designs whose
    /// path happens to contain "italic" are misclassified.
    pub fn looks_italic(&self) -> bool {
        self.designspace
            .to_string_lossy()
            .to_lowercase()
            .contains("italic")
    }
}

/// Resolves each source once, collecting the conversion edges it needs.
pub struct SourceResolver<'a> {
    config: &'a Config,
    paths: &'a Paths,
    resolved: IndexMap<PathBuf, Arc<ResolvedSource>>,
    fragment: Fragment,
}

impl<'a> SourceResolver<'a> {
    pub fn new(config: &'a Config, paths: &'a Paths) -> SourceResolver<'a> {
        SourceResolver {
            config,
            paths,
            resolved: IndexMap::new(),
            fragment: Fragment::default(),
        }
    }

    /// Resolve every configured source, in configuration order.
    ///
    /// A source listed twice is only returned once.
    pub fn resolve_all(&mut self) -> Result<Vec<Arc<ResolvedSource>>, Error> {
        let config = self.config;
        let unique: IndexSet<&PathBuf> = config.sources.iter().collect();
        unique
            .into_iter()
            .map(|source| self.resolve(source))
            .collect()
    }

    pub fn resolve(&mut self, source: &Path) -> Result<Arc<ResolvedSource>, Error> {
        if let Some(resolved) = self.resolved.get(source) {
            return Ok(resolved.clone());
        }
        let resolved = Arc::new(if Font::is_glyphs_file(source) {
            self.convert_glyphs(source)?
        } else if source.extension().and_then(|e| e.to_str()) == Some("designspace") {
            debug!("Using {source:?} as is");
            ResolvedSource {
                origin: source.to_path_buf(),
                designspace: source.to_path_buf(),
                kind: SourceKind::NativeDesign,
                design: DesignDescription::load(&self.paths.on_disk(source))?,
            }
        } else {
            return Err(Error::UnrecognizedSource(source.to_path_buf()));
        });
        self.resolved
            .insert(source.to_path_buf(), resolved.clone());
        Ok(resolved)
    }

    /// Stage a designspace for a Glyphs source and emit its conversion.
    ///
    /// The designspace is derived without converting glyphs, which happens
    /// later when the executor runs the conversion edge.
    fn convert_glyphs(&mut self, source: &Path) -> Result<ResolvedSource, Error> {
        let font = Font::load(&self.paths.on_disk(source), ExtractionMode::Structural).map_err(
            |e| Error::GlyphsExtraction {
                path: source.to_path_buf(),
                source: e,
            },
        )?;
        let design = DesignDescription::from_glyphs(&font, self.paths.instance_dir());

        let master_dir = self.paths.master_dir();
        let designspace = master_dir.join(format!("{}.designspace", font.file_stem()));
        require_dir(&self.paths.on_disk(master_dir))?;
        design.write(&self.paths.on_disk(&designspace))?;
        info!("Staged {designspace:?} for {source:?}");

        let masters: IndexSet<_> = design
            .sources
            .iter()
            .map(|m| master_dir.join(&m.filename))
            .collect();
        let mut args = vec![format!("--master-dir {}", quote_path(master_dir))];
        args.extend(
            self.config
                .glyph_data
                .iter()
                .map(|f| format!("--glyph-data {}", quote_path(f))),
        );

        self.fragment.comment("Convert glyphs source to designspace");
        self.fragment.edge(
            Edge::new(
                GLYPHS2UFO,
                std::iter::once(designspace.clone()).chain(masters).collect(),
                vec![source.to_path_buf()],
            )
            .with_variable("glyphs2ufo_args", args.join(" ")),
        );
        self.fragment.newline();

        Ok(ResolvedSource {
            origin: source.to_path_buf(),
            designspace,
            kind: SourceKind::GlyphInterchange,
            design,
        })
    }

    /// The conversion edges emitted so far
    pub fn into_fragment(self) -> Fragment {
        self.fragment
    }
}
