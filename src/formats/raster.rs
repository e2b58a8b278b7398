//
// raster.rs
// Volume-Convert-rs
//
// Grayscale PNG/TIFF images handled as single-slice volumes through the image crate.
//
// Thales Matheus Mendonça Santos - October 2026

use std::fs;
use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, DynamicImage, ImageBuffer, Luma};
use tiff::encoder::{colortype::Gray16, Compression, TiffEncoder};
use tracing::debug;

use crate::error::VolumeError;
use crate::pixel::{ComponentType, PixelType, TypedView, Voxel};
use crate::volume::{Geometry, Volume};

use super::Format;

/// Raster outputs only store 16-bit unsigned grayscale.
pub fn check_pixel_type(format: Format, pixel_type: PixelType) -> Result<(), VolumeError> {
    match pixel_type {
        PixelType::UnsignedShort => Ok(()),
        other => Err(VolumeError::UnsupportedPixelType {
            format: format.name(),
            pixel_type: other,
        }),
    }
}

fn open(path: &Path) -> Result<DynamicImage> {
    image::open(path).with_context(|| format!("Failed to open image {:?}", path))
}

fn component(color: ColorType) -> ComponentType {
    match color {
        ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => {
            ComponentType::U16
        }
        ColorType::Rgb32F | ColorType::Rgba32F => ComponentType::F32,
        _ => ComponentType::U8,
    }
}

pub fn probe(path: &Path) -> Result<ComponentType> {
    Ok(component(open(path)?.color()))
}

pub fn read<T: Voxel>(path: &Path) -> Result<Volume<T>> {
    let image = open(path)?;
    let (width, height) = (image.width() as usize, image.height() as usize);
    debug!(width, height, color = ?image.color(), "decoded raster image");

    // Colour images collapse to luminance; float images keep their precision.
    let samples: Vec<T> = match component(image.color()) {
        ComponentType::F32 => image
            .to_rgb32f()
            .pixels()
            .map(|p| T::from_f64((0.2126 * p[0] + 0.7152 * p[1] + 0.0722 * p[2]) as f64))
            .collect(),
        ComponentType::U16 => image
            .to_luma16()
            .into_raw()
            .into_iter()
            .map(|v| T::from_f64(v as f64))
            .collect(),
        _ => image
            .to_luma8()
            .into_raw()
            .into_iter()
            .map(|v| T::from_f64(v as f64))
            .collect(),
    };

    Ok(Volume::from_x_fastest(
        [width, height, 1],
        samples,
        Geometry::default(),
    )?)
}

pub fn write<T: Voxel>(path: &Path, format: Format, volume: &Volume<T>, compress: bool) -> Result<()> {
    let TypedView::UnsignedShort(data) = T::typed(&volume.data) else {
        return Err(VolumeError::UnsupportedPixelType {
            format: format.name(),
            pixel_type: T::PIXEL_TYPE,
        }
        .into());
    };

    let [width, height, depth] = volume.dims();
    if depth != 1 {
        return Err(VolumeError::Dimensionality(vec![width, height, depth]).into());
    }

    let pixels: Vec<u16> = data.t().iter().copied().collect();
    let buffer: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_raw(width as u32, height as u32, pixels)
            .context("Image dimensions do not match the voxel count")?;

    let mut encoded = Vec::new();
    match format {
        Format::Png => {
            let level = if compress {
                CompressionType::Best
            } else {
                CompressionType::Default
            };
            let encoder = PngEncoder::new_with_quality(&mut encoded, level, FilterType::Adaptive);
            DynamicImage::ImageLuma16(buffer)
                .write_with_encoder(encoder)
                .with_context(|| format!("Failed to encode PNG for {:?}", path))?;
        }
        _ => {
            let compression = if compress {
                Compression::Lzw
            } else {
                Compression::Uncompressed
            };
            TiffEncoder::new(Cursor::new(&mut encoded))
                .context("Failed to start TIFF encoder")?
                .with_compression(compression)
                .write_image::<Gray16>(buffer.width(), buffer.height(), buffer.as_raw())
                .with_context(|| format!("Failed to encode TIFF for {:?}", path))?;
        }
    }

    fs::write(path, encoded).with_context(|| format!("Failed to save image to {:?}", path))?;
    Ok(())
}
