//! Sequences the stages of a family build into one graph.
//!
//! Ordering between stages exists only as edges. Table generation waits for
//! every variable font and fixing waits for table generation. Static fonts are
//! hinted before they are fixed and fixed before they are packaged.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, info};

use crate::{
    ninja::{Edge, Fragment, Graph},
    operations::{contribute, Autohint, Compile, Compress, Fix, Format, Operation, Upstream},
    paths::{require_dir, stamp_file},
    recipe::compile_steps,
    rules::{self, quote_path, standard_rules},
    source::{ResolvedSource, SourceResolver},
    Config, Error, Paths,
};

pub struct GraphBuilder<'a> {
    config: &'a Config,
    paths: &'a Paths,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(config: &'a Config, paths: &'a Paths) -> GraphBuilder<'a> {
        GraphBuilder { config, paths }
    }

    /// Plan the whole build. Nothing is written except staged sources.
    pub fn build(&self) -> Result<Graph, Error> {
        let explicit = self.config.recipe.is_some();
        let mut graph = Graph::new(standard_rules(explicit || self.config.build_variable)?);
        let mut resolver = SourceResolver::new(self.config, self.paths);

        if let Some(recipe) = &self.config.recipe {
            info!("Compiling {} explicit targets", recipe.len());
            let mut targets = Fragment::default();
            for (target, steps) in recipe.iter() {
                targets.append(compile_steps(
                    target,
                    steps,
                    &mut resolver,
                    self.config,
                    self.paths,
                )?);
            }
            graph.merge(resolver.into_fragment())?;
            graph.merge(targets)?;
        } else {
            let sources = resolver.resolve_all()?;
            graph.merge(resolver.into_fragment())?;

            if self.config.build_variable {
                graph.merge(self.build_variable(&sources)?)?;
                if self.config.vtt_sources.is_some() {
                    self.build_vtt(&self.config.vf_dir())?;
                }
            }
            if self.config.build_static {
                graph.merge(self.build_static(&sources)?)?;
                if self.config.vtt_sources.is_some() {
                    self.build_vtt(&self.config.tt_dir())?;
                }
            }
        }
        graph.validate()?;
        Ok(graph)
    }

    /// `<vf dir>/<designspace stem>[<sorted tags>].ttf`
    pub fn variable_target(&self, source: &ResolvedSource) -> PathBuf {
        self.config.vf_dir().join(format!(
            "{}[{}].ttf",
            source.stem(),
            source.design.sorted_tags().join(",")
        ))
    }

    /// The axis order for STAT generation.
    ///
    /// Unless configured, all axis tags sorted, plus `ital` when any design
    /// looks italic judging by its path.
    pub fn axis_order(&self, sources: &[Arc<ResolvedSource>]) -> Vec<String> {
        if let Some(axis_order) = &self.config.axis_order {
            return axis_order.clone();
        }
        let mut axis_order: Vec<_> = sources
            .iter()
            .flat_map(|s| s.design.axes.iter().map(|a| a.tag.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if sources.iter().any(|s| s.looks_italic()) && !axis_order.iter().any(|t| t == "ital") {
            axis_order.push("ital".to_string());
        }
        axis_order
    }

    pub fn build_variable(&self, sources: &[Arc<ResolvedSource>]) -> Result<Fragment, Error> {
        if self.config.stylespace_file.is_some() || self.config.stat_format4.is_some() {
            return Err(Error::UnsupportedFeature(
                "stylespaceFile and statFormat4 can't be used to build variable fonts".to_string(),
            ));
        }
        let sources: Vec<_> = sources
            .iter()
            .filter(|s| {
                let interpolates = s.design.sources.len() > 1;
                if !interpolates {
                    debug!("{:?} has a single master, no variable font", s.designspace);
                }
                interpolates
            })
            .cloned()
            .collect();
        info!("Planning {} variable fonts", sources.len());
        let mut fragment = Fragment::default();
        fragment.newline();
        fragment.comment("VARIABLE FONTS");
        fragment.newline();

        let mut targets = Vec::new();
        for source in sources.iter() {
            let mut compile = Compile::new(
                Format::Variable,
                Upstream::of(source.designspace.clone()),
                self.config,
                self.paths.scratch_dir(),
            );
            compile.set_target(self.variable_target(source))?;
            targets.extend(contribute(&compile, &mut fragment)?);
        }
        fragment.newline();
        if targets.is_empty() {
            return Ok(fragment);
        }

        let stat_stamp = self.gen_stat(&sources, &targets, &mut fragment)?;

        // Name tables are fixed from STAT so every font waits for it
        fragment.comment("Variable font post-processing");
        for target in targets.iter() {
            let fix = Fix::new(
                Upstream::of(target.clone()).after([stat_stamp.clone()]),
                self.config,
            );
            contribute(&fix, &mut fragment)?;
        }
        Ok(fragment)
    }

    /// One table generation edge over every variable font.
    fn gen_stat(
        &self,
        sources: &[Arc<ResolvedSource>],
        targets: &[PathBuf],
        fragment: &mut Fragment,
    ) -> Result<PathBuf, Error> {
        fragment.comment("Generate STAT tables");
        let mut other_args = String::new();
        if let Some(stat) = &self.config.stat {
            let stat_file = self.paths.stat_file();
            require_dir(&self.paths.on_disk(self.paths.scratch_dir()))?;
            let file = self.paths.on_disk(&stat_file);
            fs::write(&file, serde_yaml::to_string(stat)?)
                .map_err(|source| Error::FileIo { path: file, source })?;
            other_args = format!("--src {}", quote_path(&stat_file));
            fragment.transient(stat_file);
        }

        let stamp = stamp_file(&targets[0], "statstamp");
        fragment.edge(
            Edge::new(rules::GEN_STAT, vec![stamp.clone()], targets.to_vec())
                .with_variable("axis_order", self.axis_order(sources).join(" "))
                .with_variable("other_args", other_args),
        );
        fragment.transient(stamp.clone());
        fragment.newline();
        Ok(stamp)
    }

    pub fn build_static(&self, sources: &[Arc<ResolvedSource>]) -> Result<Fragment, Error> {
        info!("Planning static fonts for {} designs", sources.len());
        let mut fragment = Fragment::default();
        fragment.newline();
        fragment.comment("STATIC FONTS");
        fragment.newline();

        let mut instances = Vec::new();
        for source in sources.iter() {
            let outputs = source.instance_paths()?;
            if outputs.is_empty() {
                debug!("{:?} declares no instances", source.designspace);
                continue;
            }
            fragment.comment(format!(
                "  Interpolate UFOs for {}",
                source
                    .designspace
                    .file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
            ));
            let mut edge = Edge::new(
                rules::INSTANCE_UFOS,
                outputs.clone(),
                vec![source.designspace.clone()],
            );
            let mut args = Vec::new();
            if source.is_glyphs() {
                args.push(format!(
                    "--instance-dir {}",
                    quote_path(self.paths.instance_dir())
                ));
            }
            if self.config.expand_features_to_instances {
                args.push("--expand-features-to-instances".to_string());
            }
            if !args.is_empty() {
                edge = edge.with_variable("fontmake_args", args.join(" "));
            }
            fragment.edge(edge);
            fragment.newline();
            instances.extend(outputs);
        }

        if self.config.build_ttf {
            self.build_format(Format::Ttf, &instances, &mut fragment)?;
        }
        if self.config.build_otf {
            self.build_format(Format::Otf, &instances, &mut fragment)?;
        }
        Ok(fragment)
    }

    fn build_format(
        &self,
        format: Format,
        instances: &[PathBuf],
        fragment: &mut Fragment,
    ) -> Result<(), Error> {
        let extension = format.extension();
        let target_dir = match format {
            Format::Otf => self.config.ot_dir(),
            _ => self.config.tt_dir(),
        };
        fragment.comment(format!("Build {extension} format"));
        fragment.newline();

        let mut targets = Vec::new();
        for ufo in instances.iter() {
            let mut compile = Compile::new(
                format,
                Upstream::of(ufo.clone()),
                self.config,
                self.paths.scratch_dir(),
            );
            let stem = ufo.file_stem().unwrap_or_default().to_string_lossy();
            compile.set_target(target_dir.join(format!("{stem}.{extension}")))?;
            targets.extend(contribute(&compile, fragment)?);
        }
        fragment.newline();

        fragment.comment(format!("Post-processing {extension}s"));
        for target in targets.iter() {
            match format {
                Format::Ttf => self.post_process_ttf(target, fragment)?,
                _ => {
                    contribute(&Fix::new(Upstream::of(target.clone()), self.config), fragment)?;
                }
            }
        }
        fragment.newline();
        Ok(())
    }

    /// Hint, then fix, then package.
    fn post_process_ttf(&self, ttf: &Path, fragment: &mut Fragment) -> Result<(), Error> {
        let mut hint_stamps = Vec::new();
        if self.config.autohint_ttf {
            hint_stamps = contribute(&Autohint::new(Upstream::of(ttf)), fragment)?;
        }
        let fix_stamps = contribute(
            &Fix::new(Upstream::of(ttf).after(hint_stamps), self.config),
            fragment,
        )?;
        if self.config.build_webfont() {
            let mut compress = Compress::new(Upstream::of(ttf).after(fix_stamps));
            compress.set_target(self.webfont_target(ttf))?;
            contribute(&compress, fragment)?;
        }
        Ok(())
    }

    /// The ttf's place under the webfont directory, as woff2
    pub fn webfont_target(&self, ttf: &Path) -> PathBuf {
        let woff_dir = self.config.woff_dir();
        let relative = ttf
            .strip_prefix(self.config.tt_dir())
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(ttf.file_name().unwrap_or_default()));
        woff_dir.join(relative).with_extension("woff2")
    }

    /// Moving VTT hints between fonts has no graph rendition yet
    pub fn build_vtt(&self, font_dir: &Path) -> Result<(), Error> {
        debug!("VTT hints requested for {font_dir:?}");
        Err(Error::UnimplementedStage("transferring VTT hints"))
    }
}
