//
// models.rs
// Volume-Convert-rs
//
// Serializable summary of a finished conversion, printed as JSON on request.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::PathBuf;

use serde::Serialize;

use crate::formats::Format;
use crate::pixel::PixelType;
use crate::volume::Geometry;

/// What was read, what was written, and how.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionSummary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub input_format: Format,
    pub output_format: Format,
    pub pixel_type: PixelType,
    pub dimensions: [usize; 3],
    pub geometry: Geometry,
    pub compressed: bool,
    pub bytes_written: u64,
}
