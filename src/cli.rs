//
// cli.rs
// Volume-Convert-rs
//
// Defines the CLI surface with Clap, validates the datatype flags, and hands the resulting options to the converter.
//
// Thales Matheus Mendonça Santos - October 2026

use std::path::PathBuf;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::{info, Level};

use crate::convert::{self, ConvertOptions};
use crate::error::VolumeError;
use crate::pixel::DataType;

/// Command-line interface: read a 3D image, optionally cast its voxels, write it back out.
#[derive(Parser, Debug)]
#[command(name = "volume-convert")]
#[command(about = "Convert 3D images between formats and voxel types", long_about = None)]
pub struct Cli {
    /// Input image
    #[arg(short, long)]
    pub input: PathBuf,
    /// Output image (format chosen by extension)
    #[arg(short, long)]
    pub output: PathBuf,
    /// Datatype: (0) short, (1) int or (2) float; defaults to the input's own type
    #[arg(
        short = 'd',
        long = "datatype-input",
        visible_alias = "datatypeInput",
        value_parser = clap::value_parser!(DataType)
    )]
    pub datatype: Option<DataType>,
    /// Unsigned values
    #[arg(short, long, requires = "datatype")]
    pub unsigned: bool,
    /// Compress output
    #[arg(short, long)]
    pub compress: bool,
    /// Print a JSON summary of the conversion on stdout
    #[arg(long)]
    pub json: bool,
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn options(&self) -> ConvertOptions {
        ConvertOptions {
            input: self.input.clone(),
            output: self.output.clone(),
            data_type: self.datatype,
            unsigned: self.unsigned,
            compress: self.compress,
        }
    }
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

pub fn run() -> Result<()> {
    // Parse the raw CLI arguments once; usage errors exit here with status 2.
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(log_level(cli.verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let options = cli.options();
    if let Err(err) = options.requested_pixel_type() {
        if let Some(VolumeError::UnsignedFloat) = err.downcast_ref::<VolumeError>() {
            Cli::command()
                .error(ErrorKind::ArgumentConflict, VolumeError::UnsignedFloat)
                .exit();
        }
        return Err(err);
    }

    let summary = convert::run(&options)?;
    info!(
        bytes = summary.bytes_written,
        pixel_type = %summary.pixel_type,
        "wrote {:?}",
        summary.output
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}
