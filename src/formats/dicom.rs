//
// dicom.rs
// Volume-Convert-rs
//
// Read-only DICOM backend: decodes single- or multi-frame pixel data into a volume with frames stacked along z.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::Path;

use anyhow::{Context, Result};
use dicom::core::Tag;
use dicom::object::{open_file, DefaultDicomObject};
use dicom::pixeldata::PixelDecoder;
use dicom_pixeldata::{ConvertOptions, VoiLutOption};
use ndarray::Axis;
use tracing::debug;

use crate::error::VolumeError;
use crate::pixel::{ComponentType, Voxel};
use crate::volume::{Geometry, Volume};

const SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
const PIXEL_SPACING: Tag = Tag(0x0028, 0x0030);
const BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
const PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);
const RESCALE_INTERCEPT: Tag = Tag(0x0028, 0x1052);
const RESCALE_SLOPE: Tag = Tag(0x0028, 0x1053);
const SLICE_THICKNESS: Tag = Tag(0x0018, 0x0050);
const SPACING_BETWEEN_SLICES: Tag = Tag(0x0018, 0x0088);
const IMAGE_POSITION_PATIENT: Tag = Tag(0x0020, 0x0032);
const IMAGE_ORIENTATION_PATIENT: Tag = Tag(0x0020, 0x0037);

fn floats(obj: &DefaultDicomObject, tag: Tag) -> Option<Vec<f64>> {
    obj.element(tag)
        .ok()
        .and_then(|e| e.to_multi_float64().ok())
}

fn float(obj: &DefaultDicomObject, tag: Tag) -> Option<f64> {
    floats(obj, tag).and_then(|values| values.first().copied())
}

fn uint(obj: &DefaultDicomObject, tag: Tag) -> Option<u16> {
    obj.element(tag).ok().and_then(|e| e.to_int::<u16>().ok())
}

fn open(path: &Path) -> Result<DefaultDicomObject> {
    open_file(path).with_context(|| format!("Failed to open DICOM file {:?}", path))
}

/// Element type after the modality LUT, which is what `read` hands back.
pub fn stored_component(obj: &DefaultDicomObject) -> Result<ComponentType, VolumeError> {
    let samples = uint(obj, SAMPLES_PER_PIXEL).unwrap_or(1);
    if samples != 1 {
        return Err(VolumeError::UnsupportedElementType(format!(
            "{} samples per pixel",
            samples
        )));
    }

    let bits = uint(obj, BITS_ALLOCATED).unwrap_or(16);
    let signed = uint(obj, PIXEL_REPRESENTATION).unwrap_or(0) == 1;
    let slope = float(obj, RESCALE_SLOPE).unwrap_or(1.0);
    let intercept = float(obj, RESCALE_INTERCEPT).unwrap_or(0.0);

    let raw = match (bits, signed) {
        (8, false) => ComponentType::U8,
        (8, true) => ComponentType::I8,
        (16, false) => ComponentType::U16,
        (16, true) => ComponentType::I16,
        (32, false) => ComponentType::U32,
        (32, true) => ComponentType::I32,
        (bits, _) => {
            return Err(VolumeError::UnsupportedElementType(format!(
                "{} bits allocated",
                bits
            )))
        }
    };

    Ok(raw.after_rescale(slope, intercept))
}

/// Physical placement from the image plane module, falling back to unit spacing.
pub fn geometry(obj: &DefaultDicomObject) -> Geometry {
    let mut geometry = Geometry::default();

    if let Some(spacing) = floats(obj, PIXEL_SPACING).filter(|v| v.len() == 2) {
        // Pixel Spacing is (row spacing, column spacing), i.e. (y, x).
        geometry.spacing[0] = spacing[1];
        geometry.spacing[1] = spacing[0];
    }
    if let Some(step) = float(obj, SPACING_BETWEEN_SLICES).or_else(|| float(obj, SLICE_THICKNESS)) {
        if step > 0.0 {
            geometry.spacing[2] = step;
        }
    }
    if let Some(position) = floats(obj, IMAGE_POSITION_PATIENT).filter(|v| v.len() == 3) {
        geometry.origin.copy_from_slice(&position);
    }
    if let Some(cosines) = floats(obj, IMAGE_ORIENTATION_PATIENT).filter(|v| v.len() == 6) {
        let (row, column) = (&cosines[..3], &cosines[3..]);
        let normal = [
            row[1] * column[2] - row[2] * column[1],
            row[2] * column[0] - row[0] * column[2],
            row[0] * column[1] - row[1] * column[0],
        ];
        geometry.direction[..3].copy_from_slice(row);
        geometry.direction[3..6].copy_from_slice(column);
        geometry.direction[6..].copy_from_slice(&normal);
    }

    geometry
}

pub fn probe(path: &Path) -> Result<ComponentType> {
    let obj = open(path)?;
    Ok(stored_component(&obj)?)
}

pub fn read<T: Voxel>(path: &Path) -> Result<Volume<T>> {
    let obj = open(path)?;
    stored_component(&obj)?;
    let geometry = geometry(&obj);

    let decoded = obj
        .decode_pixel_data()
        .context("Failed to decode pixel data")?;
    debug!(
        frames = decoded.number_of_frames(),
        rows = decoded.rows(),
        columns = decoded.columns(),
        "decoded DICOM pixel data"
    );

    // Modality LUT (rescale) applies, VOI windowing does not.
    let options = ConvertOptions::new().with_voi_lut(VoiLutOption::Identity);
    let frames = decoded
        .to_ndarray_with_options::<f64>(&options)
        .context("Failed to convert decoded pixels to an array")?;

    // (frames, rows, columns, samples) -> [x, y, z]
    let data = frames
        .index_axis_move(Axis(3), 0)
        .reversed_axes()
        .mapv(T::from_f64);

    Ok(Volume::new(data, geometry))
}
