//
// pixel.rs
// Volume-Convert-rs
//
// Closed set of voxel representations, the on-disk element types readers accept, and the per-type conversion hooks.
//
// Thales Matheus Mendonça Santos - October 2026

use std::fmt;
use std::str::FromStr;

use ndarray::Array3;
use serde::Serialize;

use crate::error::VolumeError;

/// Data type as requested on the command line: (0) short, (1) int or (2) float.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DataType {
    Short,
    Int,
    Float,
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "0" | "short" => Ok(DataType::Short),
            "1" | "int" => Ok(DataType::Int),
            "2" | "float" => Ok(DataType::Float),
            other => Err(format!(
                "'{}' is not a datatype; use (0) short, (1) int or (2) float",
                other
            )),
        }
    }
}

/// Voxel representation a volume is decoded into and written from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelType {
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Float,
}

impl PixelType {
    /// Resolve the requested data type and signedness, rejecting unsigned floats.
    pub fn select(data_type: DataType, unsigned: bool) -> Result<Self, VolumeError> {
        match (data_type, unsigned) {
            (DataType::Short, false) => Ok(PixelType::Short),
            (DataType::Short, true) => Ok(PixelType::UnsignedShort),
            (DataType::Int, false) => Ok(PixelType::Int),
            (DataType::Int, true) => Ok(PixelType::UnsignedInt),
            (DataType::Float, false) => Ok(PixelType::Float),
            (DataType::Float, true) => Err(VolumeError::UnsignedFloat),
        }
    }

    /// Widen (or narrow) an on-disk element type into the supported set.
    pub fn native(component: ComponentType) -> Self {
        match component {
            ComponentType::I8 | ComponentType::I16 => PixelType::Short,
            ComponentType::U8 | ComponentType::U16 => PixelType::UnsignedShort,
            ComponentType::I32 => PixelType::Int,
            ComponentType::U32 => PixelType::UnsignedInt,
            ComponentType::F32 | ComponentType::F64 => PixelType::Float,
        }
    }

    pub fn component(self) -> ComponentType {
        match self {
            PixelType::Short => ComponentType::I16,
            PixelType::UnsignedShort => ComponentType::U16,
            PixelType::Int => ComponentType::I32,
            PixelType::UnsignedInt => ComponentType::U32,
            PixelType::Float => ComponentType::F32,
        }
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelType::Short => "short",
            PixelType::UnsignedShort => "unsigned short",
            PixelType::Int => "int",
            PixelType::UnsignedInt => "unsigned int",
            PixelType::Float => "float",
        };
        f.write_str(name)
    }
}

/// Element types as stored on disk.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ComponentType {
    pub fn size(self) -> usize {
        match self {
            ComponentType::I8 | ComponentType::U8 => 1,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::I32 | ComponentType::U32 | ComponentType::F32 => 4,
            ComponentType::F64 => 8,
        }
    }

    /// Element type of the values once `stored * slope + intercept` is applied.
    /// Integral rescales of integer data stay integral (CT-style Hounsfield units).
    pub fn after_rescale(self, slope: f64, intercept: f64) -> ComponentType {
        if slope == 1.0 && intercept == 0.0 {
            return self;
        }
        match self {
            ComponentType::F32 | ComponentType::F64 => self,
            _ if slope.fract() == 0.0 && intercept.fract() == 0.0 => {
                if self.size() <= 2 {
                    ComponentType::I16
                } else {
                    ComponentType::I32
                }
            }
            _ => ComponentType::F32,
        }
    }

    /// Decode one sample from its raw bytes. `chunk` must be exactly `size()` long.
    pub fn sample(self, chunk: &[u8], big_endian: bool) -> f64 {
        macro_rules! read {
            ($ty:ty, $n:expr) => {{
                let mut raw = [0u8; $n];
                raw.copy_from_slice(chunk);
                if big_endian {
                    <$ty>::from_be_bytes(raw) as f64
                } else {
                    <$ty>::from_le_bytes(raw) as f64
                }
            }};
        }

        match self {
            ComponentType::I8 => chunk[0] as i8 as f64,
            ComponentType::U8 => chunk[0] as f64,
            ComponentType::I16 => read!(i16, 2),
            ComponentType::U16 => read!(u16, 2),
            ComponentType::I32 => read!(i32, 4),
            ComponentType::U32 => read!(u32, 4),
            ComponentType::F32 => read!(f32, 4),
            ComponentType::F64 => read!(f64, 8),
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentType::I8 => "int8",
            ComponentType::U8 => "uint8",
            ComponentType::I16 => "int16",
            ComponentType::U16 => "uint16",
            ComponentType::I32 => "int32",
            ComponentType::U32 => "uint32",
            ComponentType::F32 => "float32",
            ComponentType::F64 => "float64",
        };
        f.write_str(name)
    }
}

/// Borrowed volume data tagged with its concrete element type, for backends
/// whose encoders are not generic over our voxel trait.
pub enum TypedView<'a> {
    Short(&'a Array3<i16>),
    UnsignedShort(&'a Array3<u16>),
    Int(&'a Array3<i32>),
    UnsignedInt(&'a Array3<u32>),
    Float(&'a Array3<f32>),
}

/// A voxel type the conversion routine can be instantiated for.
pub trait Voxel: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const PIXEL_TYPE: PixelType;

    /// Saturating cast; NaN maps to zero for integer types.
    fn from_f64(value: f64) -> Self;

    fn to_f64(self) -> f64;

    fn extend_le_bytes(self, out: &mut Vec<u8>);

    fn typed(data: &Array3<Self>) -> TypedView<'_>;
}

macro_rules! impl_voxel {
    ($ty:ty, $pixel:ident) => {
        impl Voxel for $ty {
            const PIXEL_TYPE: PixelType = PixelType::$pixel;

            fn from_f64(value: f64) -> Self {
                value as $ty
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn extend_le_bytes(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn typed(data: &Array3<Self>) -> TypedView<'_> {
                TypedView::$pixel(data)
            }
        }
    };
}

impl_voxel!(i16, Short);
impl_voxel!(u16, UnsignedShort);
impl_voxel!(i32, Int);
impl_voxel!(u32, UnsignedInt);
impl_voxel!(f32, Float);
