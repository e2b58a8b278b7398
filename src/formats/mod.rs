//
// mod.rs
// Volume-Convert-rs
//
// Picks a format backend from the file extension and routes probe/read/write calls to it.
//
// Thales Matheus Mendonça Santos - October 2026

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::error::VolumeError;
use crate::pixel::{ComponentType, Voxel};
use crate::volume::Volume;

pub mod dicom;
pub mod metaimage;
pub mod nifti;
pub mod raster;

/// File formats understood by the converter.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    MetaImage,
    Nifti,
    Dicom,
    Png,
    Tiff,
}

impl Format {
    /// Detect the format from the file name; `.nii.gz` counts as NIfTI.
    pub fn from_path(path: &Path) -> Result<Self, VolumeError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let format = if name.ends_with(".mha") || name.ends_with(".mhd") {
            Format::MetaImage
        } else if name.ends_with(".nii") || name.ends_with(".nii.gz") {
            Format::Nifti
        } else if name.ends_with(".dcm") || name.ends_with(".dicom") {
            Format::Dicom
        } else if name.ends_with(".png") {
            Format::Png
        } else if name.ends_with(".tif") || name.ends_with(".tiff") {
            Format::Tiff
        } else {
            return Err(VolumeError::UnknownFormat(path.to_path_buf()));
        };

        Ok(format)
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::MetaImage => "MetaImage",
            Format::Nifti => "NIfTI",
            Format::Dicom => "DICOM",
            Format::Png => "PNG",
            Format::Tiff => "TIFF",
        }
    }

    /// Reject targets this backend cannot produce before any file is touched.
    pub fn check_writable<T: Voxel>(self) -> Result<(), VolumeError> {
        match self {
            Format::MetaImage | Format::Nifti => Ok(()),
            Format::Dicom => Err(VolumeError::ReadOnlyFormat {
                format: self.name(),
            }),
            Format::Png | Format::Tiff => raster::check_pixel_type(self, T::PIXEL_TYPE),
        }
    }
}

/// Element type stored in the file, read from the header only where the format allows.
pub fn probe(path: &Path) -> Result<ComponentType> {
    match Format::from_path(path)? {
        Format::MetaImage => metaimage::probe(path),
        Format::Nifti => nifti::probe(path),
        Format::Dicom => dicom::probe(path),
        Format::Png | Format::Tiff => raster::probe(path),
    }
}

/// Decode the whole file into a volume of `T`, casting from the stored element type.
pub fn read_volume<T: Voxel>(path: &Path) -> Result<Volume<T>> {
    match Format::from_path(path)? {
        Format::MetaImage => metaimage::read(path),
        Format::Nifti => nifti::read(path),
        Format::Dicom => dicom::read(path),
        Format::Png | Format::Tiff => raster::read(path),
    }
}

/// Encode the volume to `path`; `compress` selects each format's compressed encoding.
pub fn write_volume<T: Voxel>(path: &Path, volume: &Volume<T>, compress: bool) -> Result<()> {
    let format = Format::from_path(path)?;
    match format {
        Format::MetaImage => metaimage::write(path, volume, compress),
        Format::Nifti => nifti::write(path, volume, compress),
        Format::Png | Format::Tiff => raster::write(path, format, volume, compress),
        Format::Dicom => Err(VolumeError::ReadOnlyFormat {
            format: format.name(),
        }
        .into()),
    }
}

/// Bytes on disk for a written output, including a `.mhd` header's data file.
pub fn output_size(path: &Path, compress: bool) -> Result<u64> {
    let mut files = vec![path.to_path_buf()];
    if Format::from_path(path)? == Format::MetaImage {
        files.extend(metaimage::data_path(path, compress));
    }
    let mut total = 0;
    for file in &files {
        total += fs::metadata(file)
            .with_context(|| format!("Failed to stat {:?}", file))?
            .len();
    }
    Ok(total)
}
