use std::{
    cell::OnceCell,
    path::{Path, PathBuf},
    sync::Arc,
};

use indexmap::IndexMap;

use crate::{
    design::{instance_path, Instance},
    operations::{Operation, Upstream},
    rules::{self, fontmake_args, quote_path, shell_quote},
    source::ResolvedSource,
    Config, Error,
};

/// One named instance of a design, as a UFO.
///
/// The target follows from the instance's declared filename so it can't be
/// reassigned, only given up front with the `target` argument.
#[derive(Debug)]
pub struct InstantiateUfo {
    source: Arc<ResolvedSource>,
    upstream: Upstream,
    instance_name: Option<String>,
    target: Option<PathBuf>,
    fontmake_args: Vec<String>,
    instance_dir: PathBuf,
    instance: OnceCell<Option<Instance>>,
    targets: OnceCell<Vec<PathBuf>>,
}

impl InstantiateUfo {
    pub const NAME: &'static str = "instantiateUfo";

    pub fn new(
        source: Arc<ResolvedSource>,
        upstream: Upstream,
        instance_name: Option<String>,
        target: Option<PathBuf>,
        config: &Config,
        instance_dir: &Path,
    ) -> InstantiateUfo {
        InstantiateUfo {
            source,
            upstream,
            instance_name,
            target,
            fontmake_args: fontmake_args(config),
            instance_dir: instance_dir.to_path_buf(),
            instance: OnceCell::new(),
            targets: OnceCell::new(),
        }
    }

    /// Use these flags instead of the configured ones
    pub fn with_fontmake_args(mut self, args: String) -> InstantiateUfo {
        self.fontmake_args = vec![args];
        self
    }

    fn relevant_instance(&self) -> Option<&Instance> {
        self.instance
            .get_or_init(|| {
                let name = self.instance_name.as_deref()?;
                self.source.design.instance(name).cloned()
            })
            .as_ref()
    }

    fn missing_instance(&self) -> Error {
        Error::MissingInstance {
            instance: self.instance_name.clone().unwrap_or_default(),
            design: self.source.designspace.clone(),
        }
    }

    fn compute_targets(&self) -> Result<Vec<PathBuf>, Error> {
        if let Some(target) = &self.target {
            return Ok(vec![target.clone()]);
        }
        let instance = self
            .relevant_instance()
            .ok_or_else(|| self.missing_instance())?;
        let filename =
            instance
                .filename
                .as_deref()
                .ok_or_else(|| Error::InstanceWithoutFilename {
                    instance: self.instance_name.clone().unwrap_or_default(),
                    design: self.source.designspace.clone(),
                })?;
        Ok(vec![instance_path(&self.source.designspace, filename)])
    }
}

impl Operation for InstantiateUfo {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn rule(&self) -> &'static str {
        rules::INSTANTIATE_UFO
    }

    fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    fn validate(&self) -> Result<(), Error> {
        if self.instance_name.is_none() {
            return Err(Error::Configuration(format!(
                "{} of {:?} needs an instance_name",
                Self::NAME,
                self.source.origin
            )));
        }
        if self.target.is_none() && self.relevant_instance().is_none() {
            return Err(self.missing_instance());
        }
        Ok(())
    }

    fn targets(&self) -> Result<&[PathBuf], Error> {
        if let Some(targets) = self.targets.get() {
            return Ok(targets);
        }
        let targets = self.compute_targets()?;
        Ok(self.targets.get_or_init(|| targets))
    }

    fn variables(&self) -> Result<IndexMap<String, String>, Error> {
        let mut args = self.fontmake_args.clone();
        if self.source.is_glyphs() {
            args.push(format!("--instance-dir {}", quote_path(&self.instance_dir)));
        }
        let mut variables = IndexMap::new();
        variables.insert("fontmake_args".to_string(), args.join(" "));
        variables.insert(
            "instance_name".to_string(),
            shell_quote(self.instance_name.as_deref().unwrap_or_default()),
        );
        Ok(variables)
    }

    fn set_target(&mut self, target: PathBuf) -> Result<(), Error> {
        Err(Error::TargetLocked {
            operation: Self::NAME,
            target,
        })
    }

    fn explicit_target(&self) -> Option<&Path> {
        self.target.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::{
        design::DesignDescription,
        ninja::Fragment,
        operations::contribute,
        source::SourceKind,
        test::testdata_dir,
    };

    fn family(kind: SourceKind) -> Arc<ResolvedSource> {
        let designspace = PathBuf::from("master/Family.designspace");
        Arc::new(ResolvedSource {
            origin: designspace.clone(),
            design: DesignDescription::load(&testdata_dir().join(&designspace)).unwrap(),
            designspace,
            kind,
        })
    }

    fn instantiate(name: Option<&str>, target: Option<&str>, kind: SourceKind) -> InstantiateUfo {
        let source = family(kind);
        InstantiateUfo::new(
            source.clone(),
            Upstream::of(source.designspace.clone()),
            name.map(str::to_string),
            target.map(PathBuf::from),
            &Config::for_test("sources: [master/Family.designspace]"),
            Path::new("instance_ufo"),
        )
    }

    #[test]
    fn target_from_instance_filename() {
        let op = instantiate(Some("Black"), None, SourceKind::NativeDesign);
        op.validate().unwrap();
        assert_eq!(&[PathBuf::from("master/Black.ufo")], op.targets().unwrap());
    }

    #[test]
    fn missing_instance_name() {
        let op = instantiate(None, None, SourceKind::NativeDesign);
        assert!(matches!(op.validate(), Err(Error::Configuration(..))));
    }

    #[test]
    fn missing_instance() {
        let op = instantiate(Some("Hairline"), None, SourceKind::NativeDesign);
        let Err(Error::MissingInstance { instance, design }) = op.validate() else {
            panic!("Hairline isn't declared");
        };
        assert_eq!("Hairline", instance);
        assert_eq!(PathBuf::from("master/Family.designspace"), design);
    }

    #[test]
    fn explicit_target_excuses_missing_instance() {
        let op = instantiate(
            Some("Hairline"),
            Some("build_tmp/Hairline.ufo"),
            SourceKind::NativeDesign,
        );
        op.validate().unwrap();
        assert_eq!(
            &[PathBuf::from("build_tmp/Hairline.ufo")],
            op.targets().unwrap()
        );
        assert_eq!(Some(Path::new("build_tmp/Hairline.ufo")), op.explicit_target());
    }

    #[test]
    fn rejects_later_target() {
        let mut op = instantiate(Some("Light"), None, SourceKind::NativeDesign);
        let result = op.set_target(PathBuf::from("elsewhere/Light.ufo"));
        assert!(
            matches!(&result, Err(Error::TargetLocked { operation, .. }) if *operation == InstantiateUfo::NAME),
            "{result:?}"
        );
        // the derived target is untouched
        assert_eq!(&[PathBuf::from("master/Light.ufo")], op.targets().unwrap());
    }

    #[test]
    fn glyphs_sources_route_instances() {
        let native = instantiate(Some("Light"), None, SourceKind::NativeDesign);
        let glyphs = instantiate(Some("Light"), None, SourceKind::GlyphInterchange);
        assert!(!native.variables().unwrap()["fontmake_args"].contains("--instance-dir"));
        assert!(glyphs.variables().unwrap()["fontmake_args"]
            .ends_with("--instance-dir instance_ufo"));
    }

    #[test]
    fn instance_name_is_quoted() {
        let source = family(SourceKind::NativeDesign);
        let op = InstantiateUfo::new(
            source.clone(),
            Upstream::of(source.designspace.clone()),
            Some("Semi Bold".to_string()),
            Some(PathBuf::from("SemiBold.ufo")),
            &Config::for_test("sources: [master/Family.designspace]"),
            Path::new("instance_ufo"),
        );
        assert_eq!("'Semi Bold'", op.variables().unwrap()["instance_name"]);
    }

    #[test]
    fn contributes_one_edge() {
        let op = instantiate(Some("Light"), None, SourceKind::NativeDesign);
        let mut fragment = Fragment::default();
        contribute(&op, &mut fragment).unwrap();
        let edge = fragment.edges().next().unwrap();
        assert_eq!(rules::INSTANTIATE_UFO, edge.rule);
        assert_eq!(vec![PathBuf::from("master/Family.designspace")], edge.inputs);
        assert_eq!(vec![PathBuf::from("master/Light.ufo")], edge.outputs);
    }

    #[test]
    fn invalid_operation_contributes_nothing() {
        let op = instantiate(Some("Hairline"), None, SourceKind::NativeDesign);
        let mut fragment = Fragment::default();
        assert!(contribute(&op, &mut fragment).is_err());
        assert_eq!(0, fragment.edges().count());
    }
}
