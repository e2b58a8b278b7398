//
// lib.rs
// Volume-Convert-rs
//
// Exposes the crate's modules and re-exports the CLI entry point for both binary and library consumers.
//
// Thales Matheus Mendonça Santos - October 2026

// Public surface of the library: the CLI, the converter, and the format backends it drives.
pub mod cli;
pub mod convert;
pub mod error;
pub mod formats;
pub mod models;
pub mod pixel;
pub mod volume;

pub use cli::{run as run_cli, Cli};
pub use convert::ConvertOptions;
pub use error::VolumeError;
pub use pixel::{DataType, PixelType, Voxel};
pub use volume::{Geometry, Volume};
