//! The recipe, read once and never modified.
//!
//! Reading happens in two steps. The raw document is scanned for features the
//! graph compiler can't express before anything else happens, then the
//! recognised keys are deserialized into an immutable [`Config`].

use std::{
    fs,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::{recipe::Step, Error};

/// Recipe keys that require the classic, non-graph builder
pub const UNSUPPORTED: [&str; 4] = ["stylespaceFile", "statFormat4", "ttfaUseScript", "vttSources"];

/// A recipe document before interpretation.
#[derive(Debug, Clone)]
pub struct Recipe {
    path: PathBuf,
    raw: Mapping,
}

impl Recipe {
    pub fn load(path: &Path) -> Result<Recipe, Error> {
        let yml = fs::read_to_string(path).map_err(|source| Error::FileIo {
            path: path.to_path_buf(),
            source,
        })?;
        Recipe::parse(path, &yml)
    }

    pub fn parse(path: &Path, yml: &str) -> Result<Recipe, Error> {
        let value: Value = serde_yaml::from_str(yml).map_err(|source| Error::InvalidRecipe {
            path: path.to_path_buf(),
            source,
        })?;
        let Value::Mapping(raw) = value else {
            return Err(Error::Configuration(format!(
                "{path:?} must contain a mapping"
            )));
        };
        Ok(Recipe {
            path: path.to_path_buf(),
            raw,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every unsupported key set to something meaningful.
    ///
    /// Keys that are present but empty or false don't count.
    pub fn unsupported_features(&self) -> Vec<String> {
        UNSUPPORTED
            .iter()
            .filter(|key| self.raw.get(*key).is_some_and(is_truthy))
            .map(|key| key.to_string())
            .collect()
    }

    pub fn config(&self) -> Result<Config, Error> {
        if !self.raw.contains_key("sources") {
            return Err(Error::Configuration(format!(
                "{:?} has no sources",
                self.path
            )));
        }
        serde_yaml::from_value(Value::Mapping(self.raw.clone())).map_err(|source| {
            Error::InvalidRecipe {
                path: self.path.clone(),
                source,
            }
        })
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(s) => !s.is_empty(),
        Value::Mapping(m) => !m.is_empty(),
        Value::Tagged(tagged) => is_truthy(&tagged.value),
    }
}

fn yes() -> bool {
    true
}

fn default_log_level() -> String {
    "WARN".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("../fonts")
}

/// The recognised options of a recipe.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub sources: Vec<PathBuf>,
    /// Explicit per-target steps, replaces the generated stages
    #[serde(default)]
    pub recipe: Option<IndexMap<PathBuf, Vec<Step>>>,
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "yes")]
    pub build_variable: bool,
    #[serde(default = "yes")]
    pub build_static: bool,
    #[serde(rename = "buildTTF", default = "yes")]
    pub build_ttf: bool,
    #[serde(rename = "buildOTF", default = "yes")]
    pub build_otf: bool,
    #[serde(default)]
    build_webfont: Option<bool>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    vf_dir: Option<PathBuf>,
    #[serde(default)]
    tt_dir: Option<PathBuf>,
    #[serde(default)]
    ot_dir: Option<PathBuf>,
    #[serde(default)]
    woff_dir: Option<PathBuf>,

    #[serde(rename = "autohintTTF", default = "yes")]
    pub autohint_ttf: bool,
    #[serde(default)]
    pub include_source_fixes: bool,
    /// Passed to the fixer to set fvar instance defaults
    #[serde(default)]
    pub fvar_instance_axis_dflts: Option<String>,
    #[serde(default = "yes")]
    pub flatten_components: bool,
    #[serde(default = "yes")]
    pub decompose_transformed_components: bool,
    #[serde(default)]
    pub axis_order: Option<Vec<String>>,
    #[serde(default)]
    pub stat: Option<Value>,
    #[serde(default = "yes")]
    pub check_compatibility: bool,
    #[serde(default)]
    pub reverse_outline_direction: bool,
    #[serde(default)]
    pub remove_outline_overlaps: Option<bool>,
    #[serde(default)]
    pub expand_features_to_instances: bool,
    #[serde(default)]
    pub glyph_data: Vec<PathBuf>,
    #[serde(default = "yes")]
    pub clean_up: bool,

    // Not expressible as a graph, retained so stages can tell they were mentioned
    #[serde(default)]
    pub stylespace_file: Option<String>,
    #[serde(default)]
    pub stat_format4: Option<Value>,
    #[serde(default)]
    pub vtt_sources: Option<IndexMap<String, String>>,
}

impl Config {
    pub fn build_webfont(&self) -> bool {
        self.build_webfont.unwrap_or(self.build_static)
    }

    pub fn vf_dir(&self) -> PathBuf {
        self.vf_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join("variable"))
    }

    pub fn tt_dir(&self) -> PathBuf {
        self.tt_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join("ttf"))
    }

    pub fn ot_dir(&self) -> PathBuf {
        self.ot_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join("otf"))
    }

    pub fn woff_dir(&self) -> PathBuf {
        self.woff_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join("webfonts"))
    }

    /// Run the executor serially and verbosely
    pub fn is_debug(&self) -> bool {
        self.log_level.eq_ignore_ascii_case("DEBUG")
    }

    /// Manually create a config for testing
    #[cfg(test)]
    pub fn for_test(yml: &str) -> Config {
        Recipe::parse(Path::new("config.yaml"), yml)
            .and_then(|r| r.config())
            .unwrap_or_else(|e| panic!("Bad test config: {e}"))
    }
}
