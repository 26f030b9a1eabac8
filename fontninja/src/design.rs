//! The parts of a designspace that decide what gets built.

use std::path::{Path, PathBuf};

use glyphs_reader::Font;
use norad::designspace::{self, DesignSpaceDocument};

use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Axis {
    pub tag: String,
    pub name: String,
}

/// A master file the design interpolates between
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Master {
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub name: Option<String>,
    pub filename: Option<String>,
}

/// Axes, masters and instances of one design.
///
/// Read only once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignDescription {
    pub axes: Vec<Axis>,
    pub sources: Vec<Master>,
    pub instances: Vec<Instance>,
}

impl DesignDescription {
    pub fn load(designspace_file: &Path) -> Result<DesignDescription, Error> {
        if !designspace_file.is_file() {
            return Err(Error::FileExpected(designspace_file.to_path_buf()));
        }
        let designspace = DesignSpaceDocument::load(designspace_file).map_err(|e| {
            Error::UnableToLoadSource {
                path: designspace_file.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        Ok(DesignDescription {
            axes: designspace
                .axes
                .iter()
                .map(|a| Axis {
                    tag: a.tag.clone(),
                    name: a.name.clone(),
                })
                .collect(),
            sources: designspace
                .sources
                .iter()
                .map(|s| Master {
                    filename: s.filename.clone(),
                })
                .collect(),
            instances: designspace
                .instances
                .iter()
                .map(|i| Instance {
                    name: i.name.clone(),
                    filename: i.filename.clone(),
                })
                .collect(),
        })
    }

    /// Describe a Glyphs source the way conversion will lay it out.
    ///
    /// Masters become `<Family>-<Master>.ufo` next to the designspace, instances
    /// `<instance_dir>/<Family>-<Instance>.ufo`. Spaces are dropped.
    pub fn from_glyphs(font: &Font, instance_dir: &Path) -> DesignDescription {
        let stem = font.file_stem();
        let ufo_name = |style: &str| format!("{stem}-{}.ufo", style.replace(' ', ""));
        DesignDescription {
            axes: font
                .axes
                .iter()
                .map(|a| Axis {
                    tag: a.tag.clone(),
                    name: a.name.clone(),
                })
                .collect(),
            sources: font
                .masters
                .iter()
                .map(|m| Master {
                    filename: ufo_name(&m.name),
                })
                .collect(),
            instances: font
                .instances
                .iter()
                .map(|i| Instance {
                    name: Some(i.name.clone()),
                    filename: Some(
                        instance_dir
                            .join(ufo_name(&i.name))
                            .to_string_lossy()
                            .into_owned(),
                    ),
                })
                .collect(),
        }
    }

    /// Axis tags, sorted
    pub fn sorted_tags(&self) -> Vec<String> {
        let mut tags: Vec<_> = self.axes.iter().map(|a| a.tag.clone()).collect();
        tags.sort();
        tags
    }

    pub fn instance(&self, name: &str) -> Option<&Instance> {
        self.instances
            .iter()
            .find(|i| i.name.as_deref() == Some(name))
    }

    /// A minimal designspace document.
    ///
    /// Only what planning reads back is meaningful, every location is the
    /// origin. Conversion regenerates the complete document when it runs.
    pub fn to_designspace(&self) -> DesignSpaceDocument {
        let origin: Vec<_> = self
            .axes
            .iter()
            .map(|a| designspace::Dimension {
                name: a.name.clone(),
                xvalue: Some(0.0),
                ..Default::default()
            })
            .collect();
        DesignSpaceDocument {
            format: 4.1,
            axes: self
                .axes
                .iter()
                .map(|a| designspace::Axis {
                    name: a.name.clone(),
                    tag: a.tag.clone(),
                    minimum: Some(0.0),
                    maximum: Some(0.0),
                    ..Default::default()
                })
                .collect(),
            sources: self
                .sources
                .iter()
                .map(|m| designspace::Source {
                    filename: m.filename.clone(),
                    location: origin.clone(),
                    ..Default::default()
                })
                .collect(),
            instances: self
                .instances
                .iter()
                .map(|i| designspace::Instance {
                    name: i.name.clone(),
                    filename: i.filename.clone(),
                    location: origin.clone(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn write(&self, designspace_file: &Path) -> Result<(), Error> {
        self.to_designspace()
            .save(designspace_file)
            .map_err(|e| Error::UnableToSaveSource {
                path: designspace_file.to_path_buf(),
                reason: e.to_string(),
            })
    }
}

/// Where an instance lands.
///
/// A filename with a directory in it is taken as is, a bare filename is
/// relative to the directory of the designspace that declares it.
pub fn instance_path(designspace_file: &Path, filename: &str) -> PathBuf {
    if filename.contains('/') || filename.contains(std::path::MAIN_SEPARATOR) {
        PathBuf::from(filename)
    } else {
        designspace_file
            .parent()
            .unwrap_or(Path::new(""))
            .join(filename)
    }
}
