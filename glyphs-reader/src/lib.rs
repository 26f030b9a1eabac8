//! Lightweight library for reading the structure of Glyphs font files.

pub mod error;
mod font;
pub mod plist;

pub use error::Error;
pub use font::{Axis, ExtractionMode, Font, FontMaster, Instance};
pub use plist::Plist;
