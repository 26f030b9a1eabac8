//! Explicit recipes: a target and the steps that make it.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::{
    ninja::Fragment,
    operations::{contribute, from_step, is_in_place, Input, Upstream},
    source::SourceResolver,
    Config, Error, Paths,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Step {
    Source {
        source: PathBuf,
    },
    Operation {
        operation: String,
        #[serde(flatten)]
        args: IndexMap<String, Value>,
    },
}

impl Step {
    fn operation_name(&self) -> Option<&str> {
        match self {
            Step::Operation { operation, .. } => Some(operation),
            Step::Source { .. } => None,
        }
    }
}

/// Compile the steps of one target into edges.
///
/// Stamps of in place steps hold back every following step up to and
/// including the next one that produces a file. The last producing step
/// writes the target.
pub fn compile_steps(
    target: &Path,
    steps: &[Step],
    resolver: &mut SourceResolver,
    config: &Config,
    paths: &Paths,
) -> Result<Fragment, Error> {
    let last_producer = steps
        .iter()
        .rposition(|s| s.operation_name().is_some_and(|op| !is_in_place(op)))
        .ok_or_else(|| {
            Error::Configuration(format!("nothing in the recipe for {target:?} produces it"))
        })?;

    let mut fragment = Fragment::default();
    fragment.comment(format!("Recipe for {}", target.display()));
    let mut current: Option<Input> = None;
    let mut pending: Vec<PathBuf> = Vec::new();

    for (idx, step) in steps.iter().enumerate() {
        match step {
            Step::Source { source } => {
                current = Some(Input::Design(resolver.resolve(source)?));
                pending.clear();
            }
            Step::Operation { operation, args } => {
                let Some(input) = &current else {
                    return Err(Error::Configuration(format!(
                        "{operation} in the recipe for {target:?} has no input"
                    )));
                };
                let upstream = Upstream::of(input.path()).after(pending.iter().cloned());
                let mut op = from_step(operation, args, input, upstream, config, paths)?;
                if idx == last_producer && op.explicit_target() != Some(target) {
                    op.set_target(target.to_path_buf())?;
                }
                let produced = contribute(op.as_ref(), &mut fragment)?;
                if op.in_place() {
                    pending.extend(produced);
                } else {
                    debug!("{operation} makes {produced:?}");
                    current = produced.into_iter().next().map(Input::File);
                    pending.clear();
                }
            }
        }
    }
    fragment.newline();
    Ok(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::{tempdir, TempDir};

    use crate::{ninja::Edge, rules, test::testdata_dir};

    fn p(path: &str) -> PathBuf {
        PathBuf::from(path)
    }

    fn test_root() -> TempDir {
        let temp_dir = tempdir().unwrap();
        fs::copy(
            testdata_dir().join("WghtVar.glyphs"),
            temp_dir.path().join("WghtVar.glyphs"),
        )
        .unwrap();
        temp_dir
    }

    fn compile(root: &Path, yml: &str) -> Result<Vec<Edge>, Error> {
        let config = Config::for_test(yml);
        let paths = Paths::new(root);
        let mut resolver = SourceResolver::new(&config, &paths);
        let mut fragment = Fragment::default();
        for (target, steps) in config.recipe.as_ref().unwrap() {
            fragment.append(compile_steps(target, steps, &mut resolver, &config, &paths)?);
        }
        let mut all = resolver.into_fragment();
        all.append(fragment);
        Ok(all.edges().cloned().collect())
    }

    #[test]
    fn instance_to_fixed_ttf() {
        let root = test_root();
        let edges = compile(
            root.path(),
            r#"
sources: [WghtVar.glyphs]
recipe:
  ../fonts/ttf/WghtVar-Bold.ttf:
    - source: WghtVar.glyphs
    - operation: instantiateUfo
      instance_name: Bold
    - operation: buildTTF
    - operation: autohint
    - operation: fix
"#,
        )
        .unwrap();
        assert_eq!(
            vec![
                rules::GLYPHS2UFO,
                rules::INSTANTIATE_UFO,
                rules::BUILD_TTF,
                rules::AUTOHINT,
                rules::FIX
            ],
            edges.iter().map(|e| e.rule.as_str()).collect::<Vec<_>>()
        );
        assert_eq!(vec![p("instance_ufo/WghtVar-Bold.ufo")], edges[1].outputs);
        assert_eq!(vec![p("master_ufo/WghtVar.designspace")], edges[1].inputs);
        assert_eq!(vec![p("../fonts/ttf/WghtVar-Bold.ttf")], edges[2].outputs);
        assert_eq!(vec![p("instance_ufo/WghtVar-Bold.ufo")], edges[2].inputs);
        // fix waits for the hinting
        assert_eq!(vec![p("../fonts/ttf/WghtVar-Bold.ttf.hintstamp")], edges[4].implicit);
        assert_eq!(vec![p("../fonts/ttf/WghtVar-Bold.ttf")], edges[4].inputs);
    }

    #[test]
    fn intermediates_go_to_scratch() {
        let root = test_root();
        let edges = compile(
            root.path(),
            r#"
sources: [WghtVar.glyphs]
recipe:
  ../fonts/variable/WghtVar[wght].ttf:
    - source: WghtVar.glyphs
    - operation: buildVariable
    - operation: fix
    - operation: paintcompiler
      args: --add-glyphs
"#,
        )
        .unwrap();
        let paint = edges.last().unwrap();
        assert_eq!(rules::PAINTCOMPILER, paint.rule);
        assert_eq!(vec![p("build_tmp/WghtVar.ttf")], paint.inputs);
        assert_eq!(vec![p("build_tmp/WghtVar.ttf.fixstamp")], paint.implicit);
        assert_eq!(vec![p("../fonts/variable/WghtVar[wght].ttf")], paint.outputs);
    }

    #[test]
    fn targets_share_a_conversion() {
        let root = test_root();
        let edges = compile(
            root.path(),
            r#"
sources: [WghtVar.glyphs]
recipe:
  ../fonts/ttf/WghtVar-Bold.ttf:
    - source: WghtVar.glyphs
    - operation: instantiateUfo
      instance_name: Bold
    - operation: buildTTF
  ../fonts/ttf/WghtVar-Regular.ttf:
    - source: WghtVar.glyphs
    - operation: instantiateUfo
      instance_name: Regular
    - operation: buildTTF
"#,
        )
        .unwrap();
        assert_eq!(
            1,
            edges.iter().filter(|e| e.rule == rules::GLYPHS2UFO).count()
        );
        assert_eq!(5, edges.len());
    }

    #[test]
    fn instantiate_cannot_take_the_recipe_target() {
        let root = test_root();
        let result = compile(
            root.path(),
            r#"
sources: [WghtVar.glyphs]
recipe:
  elsewhere/Bold.ufo:
    - source: WghtVar.glyphs
    - operation: instantiateUfo
      instance_name: Bold
"#,
        );
        assert!(
            matches!(result, Err(Error::TargetLocked { .. })),
            "{result:?}"
        );
    }

    #[test]
    fn instantiate_may_declare_the_recipe_target() {
        let root = test_root();
        let edges = compile(
            root.path(),
            r#"
sources: [WghtVar.glyphs]
recipe:
  elsewhere/Bold.ufo:
    - source: WghtVar.glyphs
    - operation: instantiateUfo
      instance_name: Bold
      target: elsewhere/Bold.ufo
"#,
        )
        .unwrap();
        assert_eq!(vec![p("elsewhere/Bold.ufo")], edges[1].outputs);
    }

    #[test]
    fn steps_carry_tool_arguments() {
        let root = test_root();
        let edges = compile(
            root.path(),
            r#"
sources: [WghtVar.glyphs]
recipe:
  ../fonts/variable/WghtVar[wght].ttf:
    - source: WghtVar.glyphs
    - operation: buildVariable
      fontmake_args: --no-production-names
    - operation: autohint
      autohint_args: --auto-script
    - operation: fix
      fixargs: --remove-dsig
"#,
        )
        .unwrap();
        assert_eq!(
            "--no-production-names --output-path '../fonts/variable/WghtVar[wght].ttf'",
            edges[1].variables["fontmake_args"]
        );
        assert_eq!("--auto-script", edges[2].variables["autohint_args"]);
        assert_eq!("--remove-dsig", edges[3].variables["fixargs"]);
    }

    #[test]
    fn misspelled_step_key() {
        let root = test_root();
        let result = compile(
            root.path(),
            r#"
sources: [WghtVar.glyphs]
recipe:
  a.ttf:
    - source: WghtVar.glyphs
    - operation: buildTTF
      fontmakeargs: --no-production-names
"#,
        );
        assert!(matches!(result, Err(Error::Configuration(..))), "{result:?}");
    }

    #[test]
    fn unknown_operation() {
        let root = test_root();
        let result = compile(
            root.path(),
            r#"
sources: [WghtVar.glyphs]
recipe:
  a.ttf:
    - source: WghtVar.glyphs
    - operation: buildTTF
    - operation: sparkle
"#,
        );
        assert!(
            matches!(&result, Err(Error::UnknownOperation(op)) if op == "sparkle"),
            "{result:?}"
        );
    }

    #[test]
    fn operation_without_input() {
        let root = test_root();
        let result = compile(
            root.path(),
            "sources: [WghtVar.glyphs]\nrecipe:\n  a.ttf:\n    - operation: buildTTF\n",
        );
        assert!(matches!(result, Err(Error::Configuration(..))), "{result:?}");
    }

    #[test]
    fn nothing_produced() {
        let root = test_root();
        let result = compile(
            root.path(),
            "sources: [WghtVar.glyphs]\nrecipe:\n  a.ttf:\n    - source: WghtVar.glyphs\n    - operation: fix\n",
        );
        assert!(matches!(result, Err(Error::Configuration(..))), "{result:?}");
    }
}
