//! Statistical computations and parallel reduction operations
//!
//! This module provides the collapse operation: statistical reductions (mean,
//! sum, extrema, spread, counts, median) over one or more axes of a field,
//! computed in parallel with Rayon.
//!
//! # Organization
//!
//! - [`operations`]: collapse methods and the per-cell reduction kernel
//! - [`parallel`]: parallel evaluation over many output cells
//! - [`collapse`]: `Field::collapse` with weights and CF metadata updates

pub mod collapse;
pub mod operations;
pub mod parallel;

pub use collapse::CollapseOptions;
pub use operations::{CollapseMethod, StatisticalReduction};
pub use parallel::{
    parallel_max_axis, parallel_mean_axis, parallel_min_axis, parallel_reduce_axes,
    parallel_sum_axis,
};
