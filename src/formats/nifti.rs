//
// nifti.rs
// Volume-Convert-rs
//
// NIfTI-1 backend built on the nifti crate; gzip is chosen by the .nii.gz extension.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::Path;

use anyhow::{Context, Result};
use ndarray::{Array3, ArrayD, Axis, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, NiftiType, ReaderOptions};
use tracing::{debug, warn};

use crate::error::VolumeError;
use crate::pixel::{ComponentType, TypedView, Voxel};
use crate::volume::{Geometry, Volume};

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("gz"))
}

fn component(datatype: NiftiType) -> Result<ComponentType, VolumeError> {
    match datatype {
        NiftiType::Int8 => Ok(ComponentType::I8),
        NiftiType::Uint8 => Ok(ComponentType::U8),
        NiftiType::Int16 => Ok(ComponentType::I16),
        NiftiType::Uint16 => Ok(ComponentType::U16),
        NiftiType::Int32 => Ok(ComponentType::I32),
        NiftiType::Uint32 => Ok(ComponentType::U32),
        NiftiType::Float32 => Ok(ComponentType::F32),
        NiftiType::Float64 => Ok(ComponentType::F64),
        other => Err(VolumeError::UnsupportedElementType(format!("{:?}", other))),
    }
}

pub fn probe(path: &Path) -> Result<ComponentType> {
    let header = NiftiHeader::from_file(path)
        .with_context(|| format!("Failed to read NIfTI header from {:?}", path))?;
    let datatype = header.data_type().context("Invalid NIfTI datatype")?;
    let stored = component(datatype)?;

    // A zero slope means the voxels are stored unscaled.
    if header.scl_slope == 0.0 {
        return Ok(stored);
    }
    Ok(stored.after_rescale(header.scl_slope as f64, header.scl_inter as f64))
}

/// Rotation matrix (row-major) encoded by the qform quaternion.
fn quaternion_rotation(b: f64, c: f64, d: f64) -> [[f64; 3]; 3] {
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
    [
        [
            a * a + b * b - c * c - d * d,
            2.0 * (b * c - a * d),
            2.0 * (b * d + a * c),
        ],
        [
            2.0 * (b * c + a * d),
            a * a + c * c - b * b - d * d,
            2.0 * (c * d - a * b),
        ],
        [
            2.0 * (b * d - a * c),
            2.0 * (c * d + a * b),
            a * a + d * d - b * b - c * c,
        ],
    ]
}

pub fn geometry_from_header(header: &NiftiHeader) -> Geometry {
    let mut geometry = Geometry::default();
    for axis in 0..3 {
        let step = header.pixdim[axis + 1].abs() as f64;
        if step > 0.0 {
            geometry.spacing[axis] = step;
        }
    }

    if header.qform_code > 0 {
        geometry.origin = [
            header.quatern_x as f64,
            header.quatern_y as f64,
            header.quatern_z as f64,
        ];
        let rotation = quaternion_rotation(
            header.quatern_b as f64,
            header.quatern_c as f64,
            header.quatern_d as f64,
        );
        let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
        for axis in 0..3 {
            let sign = if axis == 2 { qfac } else { 1.0 };
            for row in 0..3 {
                geometry.direction[axis * 3 + row] = rotation[row][axis] * sign;
            }
        }
    } else if header.sform_code > 0 {
        let rows = [header.srow_x, header.srow_y, header.srow_z];
        geometry.origin = [rows[0][3] as f64, rows[1][3] as f64, rows[2][3] as f64];
        for axis in 0..3 {
            let column: Vec<f64> = rows.iter().map(|row| row[axis] as f64).collect();
            let norm = column.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for (row, value) in column.iter().enumerate() {
                    geometry.direction[axis * 3 + row] = value / norm;
                }
            }
        }
    }

    geometry
}

/// Header carried into the writer: intensity scaling reset, placement stored in the sform.
pub fn header_for_geometry(geometry: &Geometry) -> NiftiHeader {
    let mut header = NiftiHeader::default();
    header.scl_slope = 1.0;
    header.scl_inter = 0.0;
    header.pixdim[0] = 1.0;
    for axis in 0..3 {
        header.pixdim[axis + 1] = geometry.spacing[axis] as f32;
    }

    header.qform_code = 0;
    header.quatern_b = 0.0;
    header.quatern_c = 0.0;
    header.quatern_d = 0.0;
    header.quatern_x = geometry.origin[0] as f32;
    header.quatern_y = geometry.origin[1] as f32;
    header.quatern_z = geometry.origin[2] as f32;

    header.sform_code = 1;
    let mut rows = [[0.0_f32; 4]; 3];
    for (row, out) in rows.iter_mut().enumerate() {
        for axis in 0..3 {
            out[axis] = (geometry.axis(axis)[row] * geometry.spacing[axis]) as f32;
        }
        out[3] = geometry.origin[row] as f32;
    }
    header.srow_x = rows[0];
    header.srow_y = rows[1];
    header.srow_z = rows[2];

    header
}

/// Accept 2D images as a single slice and drop a singleton fourth axis.
fn into_volume_shape<T: Clone>(array: ArrayD<T>) -> Result<Array3<T>, VolumeError> {
    let shape = array.shape().to_vec();
    match shape.len() {
        2 => {
            let planar = array.insert_axis(Axis(2));
            planar
                .into_dimensionality::<Ix3>()
                .map_err(|_| VolumeError::Dimensionality(shape))
        }
        3 => array
            .into_dimensionality::<Ix3>()
            .map_err(|_| VolumeError::Dimensionality(shape)),
        4 if shape[3] == 1 => array
            .index_axis_move(Axis(3), 0)
            .into_dimensionality::<Ix3>()
            .map_err(|_| VolumeError::Dimensionality(shape)),
        _ => Err(VolumeError::Dimensionality(shape)),
    }
}

pub fn read<T: Voxel>(path: &Path) -> Result<Volume<T>> {
    let object = ReaderOptions::new()
        .read_file(path)
        .with_context(|| format!("Failed to open NIfTI file {:?}", path))?;
    let geometry = geometry_from_header(object.header());
    debug!(?geometry, "NIfTI geometry");

    // Scaling (scl_slope/scl_inter) is applied while building the array.
    let values = object
        .into_volume()
        .into_ndarray::<f64>()
        .context("Failed to decode NIfTI voxel data")?;
    let data = into_volume_shape(values.mapv(T::from_f64))?;

    Ok(Volume::new(data, geometry))
}

pub fn write<T: Voxel>(path: &Path, volume: &Volume<T>, compress: bool) -> Result<()> {
    if compress && !is_gzip(path) {
        warn!(
            "NIfTI compression follows the file extension; use .nii.gz to compress {:?}",
            path
        );
    }

    let header = header_for_geometry(&volume.geometry);
    let writer = WriterOptions::new(path).reference_header(&header);

    let written = match T::typed(&volume.data) {
        TypedView::Short(data) => writer.write_nifti(data),
        TypedView::UnsignedShort(data) => writer.write_nifti(data),
        TypedView::Int(data) => writer.write_nifti(data),
        TypedView::UnsignedInt(data) => writer.write_nifti(data),
        TypedView::Float(data) => writer.write_nifti(data),
    };
    written.with_context(|| format!("Failed to write NIfTI file {:?}", path))
}
