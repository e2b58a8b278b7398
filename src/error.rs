//
// error.rs
// Volume-Convert-rs
//
// Typed failures raised by the format backends and the pixel type selection.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::PathBuf;

use thiserror::Error;

use crate::pixel::PixelType;

#[derive(Debug, Error)]
pub enum VolumeError {
    #[error("Unsigned flag cannot be selected when the datatype is float")]
    UnsignedFloat,
    #[error("Unrecognised image format for {0:?}")]
    UnknownFormat(PathBuf),
    #[error("{format} files can be read but not written")]
    ReadOnlyFormat { format: &'static str },
    #[error("{format} output cannot store {pixel_type} voxels")]
    UnsupportedPixelType {
        format: &'static str,
        pixel_type: PixelType,
    },
    #[error("Unsupported element type: {0}")]
    UnsupportedElementType(String),
    #[error("Malformed MetaImage header: {0}")]
    MalformedHeader(String),
    #[error("Expected a 3D volume, found shape {0:?}")]
    Dimensionality(Vec<usize>),
    #[error("Truncated voxel data: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
}
