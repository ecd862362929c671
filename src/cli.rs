//! Command-line interface options for the `cfkit` tool, defined with `clap`.

use crate::config::Settings;
use crate::model::AttrValue;
use crate::netcdf_io::OutputFormat;
use crate::plot::ColorPalette;
use crate::regrid::RegridMethod;
use crate::statistics::CollapseMethod;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Read, inspect, analyse, regrid, flatten, plot and write CF netCDF datasets
#[derive(Parser, Debug)]
#[command(name = "cfkit", version, about = "CF field toolkit for netCDF files")]
pub struct Cli {
    /// Number of threads for parallel kernels. Defaults to number of CPU cores.
    #[arg(short = 't', long, global = true, env = "CFKIT_THREADS")]
    pub threads: Option<usize>,

    /// Enable verbose output
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Suppress warnings
    #[arg(short, long, global = true, default_value_t = false)]
    pub quiet: bool,

    /// Format of written files
    #[arg(long, global = true, default_value = "netcdf4", value_parser = parse_format)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings {
            threads: self.threads,
            verbose: self.verbose,
            quiet: self.quiet,
            format: self.format,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the dataset files in a directory
    Ls { dir: PathBuf },

    /// Report the on-disk format of each file
    Kind {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List the fields of a dataset
    List {
        file: PathBuf,
        /// Sort by a property, e.g. `units`, or `identity`
        #[arg(long)]
        sort_by: Option<String>,
        /// Keep fields whose identity matches; prefix with `~` for a regex
        #[arg(long)]
        select: Option<String>,
        /// Also print the global attributes
        #[arg(long)]
        globals: bool,
    },

    /// Describe fields in detail
    Dump {
        file: PathBuf,
        /// Field identity, netCDF name or `#index`; all fields when omitted
        #[arg(short, long)]
        field: Option<String>,
        /// Print the medium-detail summary instead of the full dump
        #[arg(long)]
        summary: bool,
        /// Print JSON metadata
        #[arg(long, conflicts_with = "summary")]
        json: bool,
        /// List coordinate values and construct identities only
        #[arg(long, conflicts_with_all = ["summary", "json"])]
        coords: bool,
    },

    /// Edit metadata and write the result
    Edit {
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Set a global attribute, `name=value`
        #[arg(long, value_parser = parse_key_value)]
        set_global: Vec<(String, AttrValue)>,
        /// Delete a global attribute
        #[arg(long)]
        del_global: Vec<String>,
        /// Field to edit; property edits need one when the file has several fields
        #[arg(short, long)]
        field: Option<String>,
        /// Set a field property, `name=value`
        #[arg(long, value_parser = parse_key_value)]
        set_property: Vec<(String, AttrValue)>,
        /// Delete a field property
        #[arg(long)]
        del_property: Vec<String>,
        /// Delete a coordinate reference, e.g. `standard_name:atmosphere_hybrid_height_coordinate`
        #[arg(long)]
        del_coordinate_reference: Vec<String>,
        /// Delete an auxiliary coordinate, cell measure or domain ancillary
        #[arg(long)]
        del_construct: Vec<String>,
    },

    /// Collapse a field over axes
    Collapse {
        file: PathBuf,
        #[arg(short, long)]
        field: Option<String>,
        /// Axes to collapse, e.g. `T` or `latitude,longitude`
        #[arg(short, long, value_delimiter = ',', required = true)]
        axes: Vec<String>,
        #[arg(short, long, default_value = "mean", value_parser = parse_collapse_method)]
        method: CollapseMethod,
        /// Weight by cell size
        #[arg(long)]
        weighted: bool,
        /// Delta degrees of freedom for variance and standard deviation
        #[arg(long, default_value_t = 1.0)]
        ddof: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Mask or replace data where a condition holds
    Mask {
        file: PathBuf,
        #[arg(short, long)]
        field: Option<String>,
        /// Condition, e.g. `gt:280` or `wi:-30:30`
        #[arg(short = 'w', long = "where")]
        condition: String,
        /// Evaluate the condition on this coordinate instead of the data
        #[arg(long)]
        coordinate: Option<String>,
        /// Value to assign; masked when omitted
        #[arg(long)]
        value: Option<f64>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Select part of a field by coordinate values or index range
    Subspace {
        file: PathBuf,
        #[arg(short, long)]
        field: Option<String>,
        /// Coordinate condition, e.g. `longitude=wi:-90:90`
        #[arg(short, long)]
        select: Vec<String>,
        /// Index range, `axis=start:end` (end exclusive)
        #[arg(long, value_parser = parse_index_range)]
        index: Vec<IndexRange>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Regrid a field onto another field's grid or a regular global grid
    Regrid {
        file: PathBuf,
        #[arg(short, long)]
        field: Option<String>,
        /// File holding the destination grid
        #[arg(long, conflicts_with = "grid")]
        target: Option<PathBuf>,
        /// Field in the target file whose grid to use
        #[arg(long, requires = "target")]
        target_field: Option<String>,
        /// Regular global grid, `NLATxNLON`
        #[arg(long, value_parser = parse_grid)]
        grid: Option<(usize, usize)>,
        #[arg(short, long, default_value = "bilinear", value_parser = parse_regrid_method)]
        method: RegridMethod,
        /// Treat the grids as plane rectilinear rather than spherical
        #[arg(long)]
        cartesian: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Save a before/after comparison image
        #[arg(long)]
        compare: Option<PathBuf>,
    },

    /// Show the group hierarchy of a file
    Groups { file: PathBuf },

    /// Write a flattened copy of a hierarchical file
    Flatten { input: PathBuf, output: PathBuf },

    /// Plot a field as an image or in the terminal
    Plot {
        file: PathBuf,
        #[arg(short, long)]
        field: Option<String>,
        /// PPM image to write; draws in the terminal when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, default_value = "viridis", value_parser = parse_palette)]
        palette: ColorPalette,
        /// Pixels per grid cell
        #[arg(long, default_value_t = 0)]
        scale: usize,
        /// Terminal width in characters
        #[arg(long, default_value_t = 72)]
        width: usize,
    },
}

/// An index range on one axis
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRange {
    pub axis: String,
    pub start: usize,
    pub end: usize,
}

pub fn parse_key_value(s: &str) -> Result<(String, AttrValue), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), AttrValue::parse_cli(value.trim())))
        }
        _ => Err("Invalid format: Expected '<name>=<value>'.".to_string()),
    }
}

pub fn parse_index_range(s: &str) -> Result<IndexRange, String> {
    let (axis, range) = s
        .split_once('=')
        .ok_or_else(|| "Invalid format: Expected '<axis>=<start>:<end>'".to_string())?;
    let parts: Vec<&str> = range.split(':').collect();
    if parts.len() != 2 {
        return Err("Invalid format: Expected '<axis>=<start>:<end>'".to_string());
    }
    let start = parts[0]
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("Invalid start index for axis '{}'", axis))?;
    let end = parts[1]
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("Invalid end index for axis '{}'", axis))?;
    Ok(IndexRange {
        axis: axis.trim().to_string(),
        start,
        end,
    })
}

pub fn parse_grid(s: &str) -> Result<(usize, usize), String> {
    let (nlat, nlon) = s
        .to_ascii_lowercase()
        .split_once('x')
        .map(|(a, b)| (a.trim().parse::<usize>(), b.trim().parse::<usize>()))
        .ok_or_else(|| "Invalid format: Expected '<nlat>x<nlon>'".to_string())?;
    match (nlat, nlon) {
        (Ok(a), Ok(b)) if a > 0 && b > 0 => Ok((a, b)),
        _ => Err("Grid sizes must be positive integers".to_string()),
    }
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse().map_err(|e: crate::errors::CfKitError| e.to_string())
}

fn parse_collapse_method(s: &str) -> Result<CollapseMethod, String> {
    s.parse().map_err(|e: crate::errors::CfKitError| e.to_string())
}

fn parse_regrid_method(s: &str) -> Result<RegridMethod, String> {
    s.parse().map_err(|e: crate::errors::CfKitError| e.to_string())
}

fn parse_palette(s: &str) -> Result<ColorPalette, String> {
    s.parse().map_err(|e: crate::errors::CfKitError| e.to_string())
}
