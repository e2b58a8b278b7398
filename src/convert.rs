//
// convert.rs
// Volume-Convert-rs
//
// Type dispatch plus the generic read -> write routine instantiated once per voxel type.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::formats::{self, Format};
use crate::models::ConversionSummary;
use crate::pixel::{ComponentType, DataType, PixelType, Voxel};

/// Everything a single conversion needs, as parsed from the command line.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    /// `None` keeps the input's native element type.
    pub data_type: Option<DataType>,
    pub unsigned: bool,
    pub compress: bool,
}

impl ConvertOptions {
    /// Resolve the requested voxel type. Only an explicit type is validated here,
    /// so usage errors surface before the input is touched.
    pub fn requested_pixel_type(&self) -> Result<Option<PixelType>> {
        match self.data_type {
            Some(data_type) => Ok(Some(PixelType::select(data_type, self.unsigned)?)),
            None => Ok(None),
        }
    }
}

/// Convert `options.input` to `options.output`, choosing the voxel type first.
pub fn run(options: &ConvertOptions) -> Result<ConversionSummary> {
    let pixel_type = match options.requested_pixel_type()? {
        Some(pixel_type) => pixel_type,
        None => {
            let stored = formats::probe(&options.input)
                .with_context(|| format!("Failed to inspect {:?}", options.input))?;
            if stored == ComponentType::F64 {
                warn!("{:?} stores float64 voxels; narrowing to float", options.input);
            }
            PixelType::native(stored)
        }
    };

    match pixel_type {
        PixelType::Short => convert::<i16>(options),
        PixelType::UnsignedShort => convert::<u16>(options),
        PixelType::Int => convert::<i32>(options),
        PixelType::UnsignedInt => convert::<u32>(options),
        PixelType::Float => convert::<f32>(options),
    }
}

/// Read the whole input as `T`, then encode it to the output.
pub fn convert<T: Voxel>(options: &ConvertOptions) -> Result<ConversionSummary> {
    let input_format = Format::from_path(&options.input)?;
    let output_format = Format::from_path(&options.output)?;
    output_format.check_writable::<T>()?;

    info!(
        input = ?options.input,
        format = input_format.name(),
        pixel_type = %T::PIXEL_TYPE,
        "reading"
    );
    let volume = formats::read_volume::<T>(&options.input)
        .with_context(|| format!("Failed to read {:?}", options.input))?;

    info!(
        output = ?options.output,
        format = output_format.name(),
        compress = options.compress,
        dims = ?volume.dims(),
        "writing"
    );
    formats::write_volume(&options.output, &volume, options.compress)
        .with_context(|| format!("Failed to write {:?}", options.output))?;

    let bytes_written = formats::output_size(&options.output, options.compress)?;

    Ok(ConversionSummary {
        input: options.input.clone(),
        output: options.output.clone(),
        input_format,
        output_format,
        pixel_type: T::PIXEL_TYPE,
        dimensions: volume.dims(),
        geometry: volume.geometry,
        compressed: options.compress,
        bytes_written,
    })
}
