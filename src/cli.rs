//! Defines command-line interface options using `clap` for the h5convert application.

use crate::orchestrator::{DEFAULT_DIGITS, DEFAULT_FORMAT, DEFAULT_SEARCH_TERM};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// A CLI tool for exporting HDF5 datasets as images
#[derive(Parser, Debug)]
#[command(
    version,
    name = "h5convert",
    about = "Export HDF5 datasets as TIFF, CBF and other raster images"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Number of worker threads. Defaults to number of CPU cores.
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert matching datasets of each input file into images
    Convert(ConvertArgs),

    /// List the datasets of each input file without writing anything
    List(ListArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ConvertArgs {
    /// HDF5 files to convert (.h5, .hdf5, .mh5, .ph5)
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<PathBuf>,

    /// Output format: tiff, cbf, png, jpg or bmp
    #[arg(short, long, default_value = DEFAULT_FORMAT)]
    pub format: String,

    /// Zero-pad width of frame numbers, 1 disables padding
    #[arg(short, long, default_value_t = DEFAULT_DIGITS, value_parser = parse_digits)]
    pub digits: usize,

    /// Only datasets whose path contains this text are converted
    #[arg(short, long, default_value = DEFAULT_SEARCH_TERM)]
    pub search: String,
}

#[derive(ClapArgs, Debug)]
pub struct ListArgs {
    /// HDF5 files to inspect
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<PathBuf>,

    /// Mark datasets whose path contains this text
    #[arg(short, long, default_value = DEFAULT_SEARCH_TERM)]
    pub search: String,
}

fn parse_digits(s: &str) -> Result<usize, String> {
    let digits: usize = s
        .parse()
        .map_err(|_| format!("Invalid number of digits: '{}'", s))?;
    if (1..=10).contains(&digits) {
        Ok(digits)
    } else {
        Err("Invalid number of digits: expected a value between 1 and 10".to_string())
    }
}
