//! cfkit: the CF data model on netCDF datasets
//!
//! cfkit reads netCDF classic and netCDF-4 files into a list of CF field
//! constructs and provides the operations of a typical analysis session on
//! them: inspection, metadata editing, collapsing, masking, subspacing,
//! regridding, group flattening, plotting and writing back to netCDF.
//!
//! ## Module Organization
//!
//! - [`model`]: fields, domains, metadata constructs and field lists
//! - [`netcdf_io`]: reading and writing files; [`cf_decode`] and [`cf_encode`]
//!   map between netCDF variables and fields
//! - [`flatten`]: netCDF-4 group trees and their flattening
//! - [`compression`]: gathered and ragged array uncompression
//! - [`discovery`]: directory listings and file format detection
//! - [`metadata`]: field summaries, dumps and JSON
//! - [`query`], [`mask`], [`subspace`]: conditions, masking and selection
//! - [`statistics`]: collapse methods and parallel reductions
//! - [`regrid`]: bilinear, conservative and nearest-neighbour regridding
//! - [`plot`]: heat maps and line plots
//! - [`parallel`], [`config`], [`logging`]: thread pool, settings and logs
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//! ```rust,no_run
//! use cfkit::prelude::*;
//! use std::path::Path;
//!
//! let fields = cfkit::netcdf_io::read(Path::new("file.nc")).unwrap();
//! let ta = fields.select_field("air_temperature").unwrap();
//! let mean = ta
//!     .collapse(&["T"], CollapseMethod::Mean, CollapseOptions::default())
//!     .unwrap();
//! println!("{}", mean);
//! ```

pub mod cf_decode;
pub mod cf_encode;
pub mod cli;
pub mod compression;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod flatten;
pub mod logging;
pub mod mask;
pub mod metadata;
pub mod model;
pub mod netcdf_io;
pub mod parallel;
pub mod plot;
pub mod query;
pub mod regrid;
pub mod statistics;
pub mod subspace;

pub use errors::{CfKitError, Result};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::errors::{CfKitError, Result};
    pub use crate::mask::WhereValue;
    pub use crate::model::{
        AttrValue, AxisKind, CellMethod, CoordinateReference, DimensionCoordinate, Domain, Field,
        FieldList,
    };
    pub use crate::netcdf_io::OutputFormat;
    pub use crate::parallel::ParallelConfig;
    pub use crate::query::Query;
    pub use crate::regrid::{RegridMethod, RegridOperator};
    pub use crate::statistics::{CollapseMethod, CollapseOptions, StatisticalReduction};
    pub use crate::subspace::AxisSelection;
}
