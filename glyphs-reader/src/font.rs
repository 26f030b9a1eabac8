//! Just enough of a Glyphs source to plan a build.
//!
//! Planning needs the axes, masters and instances. Outlines, kerning and layers
//! are what make converting a Glyphs file expensive and planning never looks at
//! them, so [`ExtractionMode::Structural`] steps over those sections without
//! building them.

use std::path::Path;
use std::{fs, path};

use log::{debug, warn};

use crate::error::Error;
use crate::plist::{Plist, Tokenizer};

/// How much of a Glyphs source to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionMode {
    /// Family, axes, masters and instances only. Glyphs and kerning are syntax
    /// checked but never built.
    #[default]
    Structural,
    /// Everything, including the glyph order.
    Full,
}

/// Top level sections that only matter when glyphs are being converted
const HEAVY_SECTIONS: [&str; 5] = [
    "glyphs",
    "kerning",
    "kerningLTR",
    "kerningRTL",
    "vertKerning",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Axis {
    pub name: String,
    pub tag: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontMaster {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instance {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Font {
    pub format_version: i64,
    pub family_name: String,
    pub axes: Vec<Axis>,
    pub masters: Vec<FontMaster>,
    pub instances: Vec<Instance>,
    /// Only populated by [`ExtractionMode::Full`]
    pub glyph_order: Vec<String>,
}

#[derive(Default)]
struct RawFont {
    format_version: i64,
    family_name: Option<String>,
    axes: Option<Plist>,
    custom_parameters: Option<Plist>,
    masters: Option<Plist>,
    instances: Option<Plist>,
    glyphs: Option<Plist>,
}

impl Font {
    pub fn load(glyphs_file: &path::Path, mode: ExtractionMode) -> Result<Font, Error> {
        if glyphs_file.is_dir() {
            return Err(Error::NotAGlyphsFile(glyphs_file.to_path_buf()));
        }
        let raw = fs::read_to_string(glyphs_file)?;
        Font::parse(&raw, mode).map_err(|e| match e {
            Error::WorstPlistEver(e) => Error::ParseError(glyphs_file.to_path_buf(), e.to_string()),
            other => other,
        })
    }

    pub fn parse(glyphs: &str, mode: ExtractionMode) -> Result<Font, Error> {
        let mut raw = RawFont::default();
        let mut tokenizer = Tokenizer::new(glyphs);
        tokenizer.for_each_entry(|key, t| {
            if mode == ExtractionMode::Structural && HEAVY_SECTIONS.contains(&key) {
                return t.skip_value();
            }
            let value = t.parse_value()?;
            match key {
                ".formatVersion" => raw.format_version = value.as_i64().unwrap_or(2),
                "familyName" => raw.family_name = value.as_str().map(str::to_string),
                "axes" => raw.axes = Some(value),
                "customParameters" => raw.custom_parameters = Some(value),
                "fontMaster" => raw.masters = Some(value),
                "instances" => raw.instances = Some(value),
                "glyphs" => raw.glyphs = Some(value),
                _ => (),
            }
            Ok(())
        })?;
        Font::from_raw(raw)
    }

    fn from_raw(raw: RawFont) -> Result<Font, Error> {
        let family_name = raw
            .family_name
            .ok_or_else(|| Error::StructuralError("no familyName".to_string()))?;
        let v3 = raw.format_version >= 3;

        let axes = if v3 {
            raw.axes.as_ref().map(axes_from).transpose()?
        } else {
            custom_parameter(raw.custom_parameters.as_ref(), "Axes")
                .map(axes_from)
                .transpose()?
        }
        .unwrap_or_else(|| {
            debug!("{family_name} declares no axes, assuming a single weight axis");
            vec![Axis {
                name: "Weight".to_string(),
                tag: "wght".to_string(),
            }]
        });

        let masters = match &raw.masters {
            Some(masters) => masters
                .expect_array()?
                .iter()
                .map(|m| master_from(m, v3))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        if masters.is_empty() {
            return Err(Error::StructuralError(format!(
                "{family_name} has no masters"
            )));
        }

        let mut instances = Vec::new();
        for instance in raw.instances.iter().flat_map(|i| i.as_array().unwrap_or(&[])) {
            if let Some(instance) = instance_from(instance)? {
                instances.push(instance);
            }
        }

        let glyph_order = raw
            .glyphs
            .iter()
            .flat_map(|g| g.as_array().unwrap_or(&[]))
            .filter_map(|g| g.get("glyphname").and_then(glyph_name))
            .collect();

        Ok(Font {
            format_version: raw.format_version.max(2),
            family_name,
            axes,
            masters,
            instances,
            glyph_order,
        })
    }

    /// The family name with spaces stripped, as used in generated filenames.
    pub fn file_stem(&self) -> String {
        self.family_name.replace(' ', "")
    }

    pub fn is_glyphs_file(path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some("glyphs")
    }
}

/// Glyph names are sometimes written as numbers, e.g. a glyph called 1
fn glyph_name(value: &Plist) -> Option<String> {
    match value {
        Plist::String(s) => Some(s.clone()),
        Plist::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}

fn custom_parameter<'a>(params: Option<&'a Plist>, name: &str) -> Option<&'a Plist> {
    params?
        .as_array()?
        .iter()
        .find(|p| p.get("name").and_then(Plist::as_str) == Some(name))
        .and_then(|p| p.get("value"))
}

fn axes_from(plist: &Plist) -> Result<Vec<Axis>, Error> {
    plist
        .expect_array()?
        .iter()
        .map(|axis| {
            // Glyphs 2 custom parameter capitalizes keys
            let field = |lower: &str, upper: &str| {
                axis.get(lower)
                    .or_else(|| axis.get(upper))
                    .and_then(Plist::as_str)
                    .map(str::to_string)
            };
            let name = field("name", "Name")
                .ok_or_else(|| Error::StructuralError("axis without a name".to_string()))?;
            let tag = field("tag", "Tag")
                .ok_or_else(|| Error::StructuralError(format!("axis {name} has no tag")))?;
            Ok(Axis { name, tag })
        })
        .collect()
}

fn master_from(plist: &Plist, v3: bool) -> Result<FontMaster, Error> {
    let str_field = |key: &str| plist.get(key).and_then(Plist::as_str);
    let id = str_field("id")
        .ok_or_else(|| Error::StructuralError("master without an id".to_string()))?
        .to_string();
    let name = if v3 {
        str_field("name").unwrap_or("Regular").to_string()
    } else {
        // Glyphs 2 spells the name out in parts, Regular being implied
        let parts: Vec<_> = ["width", "weight", "custom"]
            .into_iter()
            .filter_map(str_field)
            .filter(|part| *part != "Regular")
            .collect();
        if parts.is_empty() {
            "Regular".to_string()
        } else {
            parts.join(" ")
        }
    };
    Ok(FontMaster { id, name })
}

fn instance_from(plist: &Plist) -> Result<Option<Instance>, Error> {
    let name = plist
        .get("name")
        .and_then(Plist::as_str)
        .ok_or_else(|| Error::StructuralError("instance without a name".to_string()))?;
    if plist.get("type").and_then(Plist::as_str) == Some("variable") {
        return Ok(None);
    }
    if plist.get("exports").and_then(Plist::as_i64) == Some(0) {
        warn!("Skipping instance {name}, it doesn't export");
        return Ok(None);
    }
    Ok(Some(Instance {
        name: name.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn testdata_dir() -> PathBuf {
        let dir = Path::new("../resources/testdata");
        assert!(dir.is_dir());
        dir.to_path_buf()
    }

    #[rstest]
    #[case::structural(ExtractionMode::Structural)]
    #[case::full(ExtractionMode::Full)]
    fn glyphs3_structure(#[case] mode: ExtractionMode) {
        let font = Font::load(&testdata_dir().join("WghtVar.glyphs"), mode).unwrap();
        assert_eq!(3, font.format_version);
        assert_eq!("Wght Var", font.family_name);
        assert_eq!("WghtVar", font.file_stem());
        assert_eq!(
            vec![Axis {
                name: "Weight".to_string(),
                tag: "wght".to_string()
            }],
            font.axes
        );
        assert_eq!(
            vec!["Regular", "Bold"],
            font.masters.iter().map(|m| m.name.as_str()).collect::<Vec<_>>()
        );
        assert_eq!(
            vec!["Regular", "Semi Bold", "Bold"],
            font.instances.iter().map(|i| i.name.as_str()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn structural_skips_glyph_order() {
        let file = testdata_dir().join("WghtVar.glyphs");
        let structural = Font::load(&file, ExtractionMode::Structural).unwrap();
        let full = Font::load(&file, ExtractionMode::Full).unwrap();
        assert!(structural.glyph_order.is_empty());
        assert_eq!(vec!["space", "A", "1"], full.glyph_order);
        assert_eq!(structural.masters, full.masters);
    }

    #[test]
    fn glyphs2_axes_and_master_names() {
        let font = Font::load(
            &testdata_dir().join("Glyphs2Italic.glyphs"),
            ExtractionMode::Structural,
        )
        .unwrap();
        assert_eq!(2, font.format_version);
        assert_eq!(
            vec![
                Axis {
                    name: "Weight".to_string(),
                    tag: "wght".to_string()
                },
                Axis {
                    name: "Width".to_string(),
                    tag: "wdth".to_string()
                },
            ],
            font.axes
        );
        assert_eq!(
            vec!["Light Italic", "Condensed Bold Italic"],
            font.masters.iter().map(|m| m.name.as_str()).collect::<Vec<_>>()
        );
        // the non-exporting instance is dropped
        assert_eq!(
            vec!["Light Italic", "Bold Italic"],
            font.instances.iter().map(|i| i.name.as_str()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn glyphs2_defaults_to_weight_axis() {
        let font = Font::parse(
            r#"{
            familyName = Plain;
            fontMaster = ({id = m01;});
            }"#,
            ExtractionMode::Structural,
        )
        .unwrap();
        assert_eq!(vec!["wght"], font.axes.iter().map(|a| a.tag.as_str()).collect::<Vec<_>>());
        assert_eq!("Regular", font.masters[0].name);
    }

    #[test]
    fn missing_family_name() {
        let result = Font::parse("{fontMaster = ({id = m01;});}", ExtractionMode::Structural);
        assert!(matches!(result, Err(Error::StructuralError(..))), "{result:?}");
    }

    #[test]
    fn no_masters() {
        let result = Font::parse("{familyName = Empty;}", ExtractionMode::Structural);
        assert!(matches!(result, Err(Error::StructuralError(..))), "{result:?}");
    }

    #[test]
    fn malformed_file_names_the_path() {
        let file = testdata_dir().join("Malformed.glyphs");
        let result = Font::load(&file, ExtractionMode::Structural);
        let Err(Error::ParseError(path, _)) = result else {
            panic!("Expected a parse error, got {result:?}");
        };
        assert_eq!(file, path);
    }
}
