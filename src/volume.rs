//
// volume.rs
// Volume-Convert-rs
//
// In-memory 3D volume handed from a reader to a writer, with the physical geometry the formats share.
//
// Thales Matheus Mendonça Santos - October 2026

use ndarray::{Array3, ShapeBuilder};
use serde::Serialize;

use crate::error::VolumeError;
use crate::pixel::Voxel;

/// Physical placement of the voxel grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geometry {
    pub spacing: [f64; 3],
    pub origin: [f64; 3],
    /// Direction cosines, axis-major: the unit vector of axis `j` is
    /// `direction[j * 3..j * 3 + 3]`, x axis first.
    pub direction: [f64; 9],
}

impl Geometry {
    /// Unit vector along voxel axis `axis` (0 = x, 1 = y, 2 = z).
    pub fn axis(&self, axis: usize) -> [f64; 3] {
        let mut out = [0.0; 3];
        out.copy_from_slice(&self.direction[axis * 3..axis * 3 + 3]);
        out
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Geometry {
            spacing: [1.0; 3],
            origin: [0.0; 3],
            direction: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Voxel grid indexed `[x, y, z]`.
#[derive(Debug, Clone)]
pub struct Volume<T> {
    pub data: Array3<T>,
    pub geometry: Geometry,
}

impl<T: Voxel> Volume<T> {
    pub fn new(data: Array3<T>, geometry: Geometry) -> Self {
        Volume { data, geometry }
    }

    /// Build a volume from samples stored x-fastest, as most file formats lay them out.
    pub fn from_x_fastest(
        dims: [usize; 3],
        samples: Vec<T>,
        geometry: Geometry,
    ) -> Result<Self, VolumeError> {
        let found = samples.len();
        let data = Array3::from_shape_vec((dims[0], dims[1], dims[2]).f(), samples)
            .map_err(|_| VolumeError::Truncated {
                expected: dims.iter().product::<usize>() * std::mem::size_of::<T>(),
                found: found * std::mem::size_of::<T>(),
            })?;
        Ok(Volume { data, geometry })
    }

    pub fn dims(&self) -> [usize; 3] {
        let shape = self.data.shape();
        [shape[0], shape[1], shape[2]]
    }

    /// Samples in x-fastest order regardless of the in-memory layout.
    pub fn x_fastest(&self) -> impl Iterator<Item = T> + '_ {
        self.data.t().into_iter().copied()
    }

    /// Little-endian byte image of the samples in x-fastest order.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() * std::mem::size_of::<T>());
        for value in self.x_fastest() {
            value.extend_le_bytes(&mut out);
        }
        out
    }
}
