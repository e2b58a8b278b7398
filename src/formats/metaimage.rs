//
// metaimage.rs
// Volume-Convert-rs
//
// MetaImage (.mha/.mhd) reader and writer, with optional zlib-compressed voxel data.
//
// Thales Matheus Mendonça Santos - October 2026

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::debug;

use crate::error::VolumeError;
use crate::pixel::{ComponentType, Voxel};
use crate::volume::{Geometry, Volume};

/// Where the voxel bytes live relative to the header.
#[derive(Debug, Clone, PartialEq)]
pub enum DataFile {
    Local,
    Detached(PathBuf),
}

/// Parsed MetaImage header fields that matter for a single-channel volume.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaHeader {
    pub dims: [usize; 3],
    pub component: ComponentType,
    pub big_endian: bool,
    pub compressed: bool,
    pub compressed_size: Option<usize>,
    pub header_size: i64,
    pub geometry: Geometry,
    pub data_file: DataFile,
}

impl MetaHeader {
    /// Size of the uncompressed voxel data, or `None` when it does not fit in memory addressing.
    pub fn data_size(&self) -> Option<usize> {
        self.dims
            .iter()
            .try_fold(self.component.size(), |acc, &d| acc.checked_mul(d))
    }
}

fn element_type(name: &str) -> Result<ComponentType, VolumeError> {
    match name {
        "MET_CHAR" => Ok(ComponentType::I8),
        "MET_UCHAR" => Ok(ComponentType::U8),
        "MET_SHORT" => Ok(ComponentType::I16),
        "MET_USHORT" => Ok(ComponentType::U16),
        "MET_INT" => Ok(ComponentType::I32),
        "MET_UINT" => Ok(ComponentType::U32),
        "MET_FLOAT" => Ok(ComponentType::F32),
        "MET_DOUBLE" => Ok(ComponentType::F64),
        other => Err(VolumeError::UnsupportedElementType(other.to_string())),
    }
}

fn element_type_name(component: ComponentType) -> &'static str {
    match component {
        ComponentType::I8 => "MET_CHAR",
        ComponentType::U8 => "MET_UCHAR",
        ComponentType::I16 => "MET_SHORT",
        ComponentType::U16 => "MET_USHORT",
        ComponentType::I32 => "MET_INT",
        ComponentType::U32 => "MET_UINT",
        ComponentType::F32 => "MET_FLOAT",
        ComponentType::F64 => "MET_DOUBLE",
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, VolumeError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(VolumeError::MalformedHeader(format!(
            "{} must be True or False, got '{}'",
            key, value
        ))),
    }
}

fn parse_list<T: std::str::FromStr>(key: &str, value: &str) -> Result<Vec<T>, VolumeError> {
    value
        .split_whitespace()
        .map(|item| {
            item.parse::<T>().map_err(|_| {
                VolumeError::MalformedHeader(format!("invalid value '{}' for {}", item, key))
            })
        })
        .collect()
}

/// Pad a per-axis list to three entries so 2D images become single-slice volumes.
fn fill3(key: &str, values: Vec<f64>, ndims: usize, pad: f64) -> Result<[f64; 3], VolumeError> {
    if values.len() != ndims {
        return Err(VolumeError::MalformedHeader(format!(
            "{} expects {} values, got {}",
            key,
            ndims,
            values.len()
        )));
    }
    let mut out = [pad; 3];
    out[..ndims].copy_from_slice(&values);
    Ok(out)
}

/// Parse the header text. Returns the header and the byte offset just past the
/// `ElementDataFile` line, where local voxel data starts.
pub fn parse_header(bytes: &[u8]) -> Result<(MetaHeader, usize), VolumeError> {
    let mut ndims: Option<usize> = None;
    let mut dim_size: Option<Vec<usize>> = None;
    let mut component: Option<ComponentType> = None;
    let mut spacing: Option<Vec<f64>> = None;
    let mut offset: Option<Vec<f64>> = None;
    let mut matrix: Option<Vec<f64>> = None;
    let mut big_endian = false;
    let mut compressed = false;
    let mut compressed_size = None;
    let mut header_size = 0_i64;

    let mut pos = 0;
    while pos < bytes.len() {
        let end = bytes[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| pos + i)
            .unwrap_or(bytes.len());
        let line = String::from_utf8_lossy(&bytes[pos..end]);
        let next = (end + 1).min(bytes.len());
        pos = next;

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(VolumeError::MalformedHeader(format!(
                "expected 'Key = Value', got '{}'",
                line
            )));
        };
        let (key, value) = (key.trim(), value.trim());

        match key {
            "ObjectType" if value != "Image" => {
                return Err(VolumeError::MalformedHeader(format!(
                    "ObjectType '{}' is not an image",
                    value
                )))
            }
            "NDims" => ndims = parse_list::<usize>(key, value)?.first().copied(),
            "DimSize" => dim_size = Some(parse_list(key, value)?),
            "ElementType" => component = Some(element_type(value)?),
            "ElementSpacing" => spacing = Some(parse_list(key, value)?),
            "Offset" | "Origin" | "Position" => offset = Some(parse_list(key, value)?),
            "TransformMatrix" | "Rotation" | "Orientation" => {
                matrix = Some(parse_list(key, value)?)
            }
            "BinaryDataByteOrderMSB" | "ElementByteOrderMSB" => {
                big_endian = parse_bool(key, value)?
            }
            "CompressedData" => compressed = parse_bool(key, value)?,
            "CompressedDataSize" => compressed_size = parse_list::<usize>(key, value)?.first().copied(),
            "HeaderSize" => header_size = parse_list::<i64>(key, value)?.first().copied().unwrap_or(0),
            "ElementNumberOfChannels" if value != "1" => {
                return Err(VolumeError::UnsupportedElementType(format!(
                    "{} channels per voxel",
                    value
                )))
            }
            "ElementDataFile" => {
                let ndims = ndims
                    .ok_or_else(|| VolumeError::MalformedHeader("missing NDims".into()))?;
                if !(2..=3).contains(&ndims) {
                    return Err(VolumeError::MalformedHeader(format!(
                        "NDims {} is not supported, expected 2 or 3",
                        ndims
                    )));
                }
                let dim_size = dim_size
                    .ok_or_else(|| VolumeError::MalformedHeader("missing DimSize".into()))?;
                if dim_size.len() != ndims {
                    return Err(VolumeError::MalformedHeader(format!(
                        "DimSize expects {} values, got {}",
                        ndims,
                        dim_size.len()
                    )));
                }
                let mut dims = [1_usize; 3];
                dims[..ndims].copy_from_slice(&dim_size);
                let component = component
                    .ok_or_else(|| VolumeError::MalformedHeader("missing ElementType".into()))?;

                let mut geometry = Geometry::default();
                if let Some(spacing) = spacing.take() {
                    geometry.spacing = fill3("ElementSpacing", spacing, ndims, 1.0)?;
                }
                if let Some(offset) = offset.take() {
                    geometry.origin = fill3("Offset", offset, ndims, 0.0)?;
                }
                if let Some(matrix) = matrix.take() {
                    geometry.direction = expand_direction(&matrix, ndims)?;
                }

                let data_file = match value {
                    "LOCAL" | "Local" | "local" => DataFile::Local,
                    "LIST" => {
                        return Err(VolumeError::MalformedHeader(
                            "slice lists in ElementDataFile are not supported".into(),
                        ))
                    }
                    name => DataFile::Detached(PathBuf::from(name)),
                };

                let header = MetaHeader {
                    dims,
                    component,
                    big_endian,
                    compressed,
                    compressed_size,
                    header_size,
                    geometry,
                    data_file,
                };
                if header.data_size().is_none() {
                    return Err(VolumeError::MalformedHeader(format!(
                        "DimSize {:?} is too large",
                        header.dims
                    )));
                }
                return Ok((header, next));
            }
            _ => {}
        }
    }

    Err(VolumeError::MalformedHeader(
        "missing ElementDataFile".into(),
    ))
}

fn expand_direction(values: &[f64], ndims: usize) -> Result<[f64; 9], VolumeError> {
    if values.len() != ndims * ndims {
        return Err(VolumeError::MalformedHeader(format!(
            "TransformMatrix expects {} values, got {}",
            ndims * ndims,
            values.len()
        )));
    }
    let mut direction = Geometry::default().direction;
    for axis in 0..ndims {
        for component in 0..ndims {
            direction[axis * 3 + component] = values[axis * ndims + component];
        }
    }
    Ok(direction)
}

fn format_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a header for little-endian data; `data_file` is `LOCAL` or the detached file name.
pub fn render_header(
    dims: [usize; 3],
    component: ComponentType,
    geometry: &Geometry,
    compressed_size: Option<usize>,
    data_file: &str,
) -> String {
    let mut header = String::new();
    header.push_str("ObjectType = Image\n");
    header.push_str("NDims = 3\n");
    header.push_str("BinaryData = True\n");
    header.push_str("BinaryDataByteOrderMSB = False\n");
    match compressed_size {
        Some(size) => {
            header.push_str("CompressedData = True\n");
            header.push_str(&format!("CompressedDataSize = {}\n", size));
        }
        None => header.push_str("CompressedData = False\n"),
    }
    header.push_str(&format!(
        "TransformMatrix = {}\n",
        format_values(&geometry.direction)
    ));
    header.push_str(&format!("Offset = {}\n", format_values(&geometry.origin)));
    header.push_str("CenterOfRotation = 0 0 0\n");
    header.push_str(&format!(
        "ElementSpacing = {}\n",
        format_values(&geometry.spacing)
    ));
    header.push_str(&format!("DimSize = {} {} {}\n", dims[0], dims[1], dims[2]));
    header.push_str(&format!("ElementType = {}\n", element_type_name(component)));
    header.push_str(&format!("ElementDataFile = {}\n", data_file));
    header
}

fn read_header(path: &Path) -> Result<(MetaHeader, Vec<u8>, usize)> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let (header, data_start) =
        parse_header(&bytes).with_context(|| format!("Invalid MetaImage header in {:?}", path))?;
    Ok((header, bytes, data_start))
}

pub fn probe(path: &Path) -> Result<ComponentType> {
    let (header, _, _) = read_header(path)?;
    Ok(header.component)
}

pub fn read<T: Voxel>(path: &Path) -> Result<Volume<T>> {
    let (header, bytes, data_start) = read_header(path)?;
    debug!(?header, "parsed MetaImage header");

    let stored = match &header.data_file {
        DataFile::Local => bytes[data_start..].to_vec(),
        DataFile::Detached(name) => {
            let data_path = path.parent().unwrap_or_else(|| Path::new(".")).join(name);
            fs::read(&data_path)
                .with_context(|| format!("Failed to read voxel data from {:?}", data_path))?
        }
    };
    drop(bytes);

    let expected = header
        .data_size()
        .ok_or_else(|| VolumeError::MalformedHeader(format!("DimSize {:?} is too large", header.dims)))?;
    let raw = if header.compressed {
        let compressed = match header.compressed_size {
            Some(size) if size <= stored.len() => &stored[..size],
            _ => &stored[..],
        };
        // Never inflate past what the header promises.
        let mut raw = Vec::new();
        ZlibDecoder::new(compressed)
            .take(expected as u64)
            .read_to_end(&mut raw)
            .with_context(|| format!("Failed to inflate voxel data in {:?}", path))?;
        raw
    } else {
        let skip = match header.data_file {
            DataFile::Detached(_) if header.header_size > 0 => header.header_size as usize,
            DataFile::Detached(_) if header.header_size == -1 => {
                stored.len().saturating_sub(expected)
            }
            _ => 0,
        };
        stored.get(skip..).map(<[u8]>::to_vec).unwrap_or_default()
    };

    if raw.len() < expected {
        return Err(VolumeError::Truncated {
            expected,
            found: raw.len(),
        }
        .into());
    }

    let samples = raw[..expected]
        .chunks_exact(header.component.size())
        .map(|chunk| T::from_f64(header.component.sample(chunk, header.big_endian)))
        .collect();

    Ok(Volume::from_x_fastest(header.dims, samples, header.geometry)?)
}

/// Data file a `.mhd` header points at; `.mha` keeps its data inline.
pub fn data_path(path: &Path, compress: bool) -> Option<PathBuf> {
    path.extension()
        .filter(|ext| ext.eq_ignore_ascii_case("mhd"))
        .map(|_| path.with_extension(if compress { "zraw" } else { "raw" }))
}

/// Write a `.mha` (header and data in one file) or `.mhd` plus a `.raw`/`.zraw` data file.
pub fn write<T: Voxel>(path: &Path, volume: &Volume<T>, compress: bool) -> Result<()> {
    let raw = volume.to_le_bytes();
    let data = if compress {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw)?;
        encoder.finish().context("Failed to deflate voxel data")?
    } else {
        raw
    };
    let compressed_size = compress.then_some(data.len());

    if let Some(data_path) = data_path(path, compress) {
        let data_name = data_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let header = render_header(
            volume.dims(),
            T::PIXEL_TYPE.component(),
            &volume.geometry,
            compressed_size,
            &data_name,
        );
        fs::write(&data_path, &data)
            .with_context(|| format!("Failed to write voxel data to {:?}", data_path))?;
        fs::write(path, header).with_context(|| format!("Failed to write {:?}", path))?;
    } else {
        let header = render_header(
            volume.dims(),
            T::PIXEL_TYPE.component(),
            &volume.geometry,
            compressed_size,
            "LOCAL",
        );
        let mut file = fs::File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
        file.write_all(header.as_bytes())?;
        file.write_all(&data)
            .with_context(|| format!("Failed to write {:?}", path))?;
    }

    Ok(())
}
