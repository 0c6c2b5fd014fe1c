//! Output format registry
//!
//! A format is an identifier (also used as the file extension) bound to an
//! encoder function that serializes one 2D [`Frame`] into an open file.
//! New formats are added with [`FormatRegistry::register`]; dispatch never
//! changes.
//!
//! # Organization
//!
//! - [`tiff`]: 32-bit grayscale TIFF
//! - [`cbf`]: Crystallographic Binary File with byte-offset compression
//! - [`raster`]: PNG, JPEG and BMP through the `image` crate

pub mod cbf;
pub mod raster;
pub mod tiff;

use crate::container::Frame;
use crate::errors::{ConvertError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;

/// Serializes one frame into `out`, which is positioned at the start of an empty file
pub type Encoder = fn(&Frame<'_>, &mut File) -> Result<()>;

/// A resolved output format
#[derive(Clone)]
pub struct OutputFormat {
    name: String,
    encoder: Encoder,
}

impl OutputFormat {
    pub fn new(name: impl Into<String>, encoder: Encoder) -> Self {
        Self {
            name: name.into(),
            encoder,
        }
    }

    /// Identifier, also the file extension of every target
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn encode(&self, frame: &Frame<'_>, out: &mut File) -> Result<()> {
        (self.encoder)(frame, out)
    }
}

impl fmt::Debug for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputFormat").field("name", &self.name).finish()
    }
}

/// Format identifier to encoder table
#[derive(Clone)]
pub struct FormatRegistry {
    encoders: BTreeMap<String, Encoder>,
}

impl FormatRegistry {
    /// A registry with no formats
    pub fn empty() -> Self {
        Self {
            encoders: BTreeMap::new(),
        }
    }

    /// tiff, cbf, png, jpg and bmp
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("tiff", tiff::encode_tiff);
        registry.register("cbf", cbf::encode_cbf);
        registry.register("png", raster::encode_png);
        registry.register("jpg", raster::encode_jpeg);
        registry.register("bmp", raster::encode_bmp);
        registry
    }

    /// Adds or replaces the encoder for `name`
    pub fn register(&mut self, name: impl Into<String>, encoder: Encoder) {
        self.encoders.insert(name.into().to_ascii_lowercase(), encoder);
    }

    /// Looks up a format identifier (case-insensitive)
    pub fn resolve(&self, name: &str) -> Result<OutputFormat> {
        let key = name.trim().to_ascii_lowercase();
        self.encoders
            .get(&key)
            .map(|&encoder| OutputFormat::new(key.clone(), encoder))
            .ok_or_else(|| ConvertError::UnsupportedFormat {
                format: name.to_string(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(String::as_str)
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
