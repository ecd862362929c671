//! Parallel computation of reductions over several axes at once

use super::operations::CollapseMethod;
use crate::errors::Result;
use ndarray::{ArrayD, IxDyn};
use rayon::prelude::*;
use tracing::debug;

/// Reduce `data` over `axes` using the rayon pool. The reduced axes stay in
/// the result with size 1, so the rank is unchanged.
///
/// The collapsed axes are moved to the end and the array made contiguous, so
/// each output element reduces one contiguous run of the buffer.
pub fn parallel_reduce_axes(
    data: &ArrayD<f64>,
    axes: &[usize],
    method: CollapseMethod,
    weights: Option<&ArrayD<f64>>,
    ddof: f64,
) -> Result<ArrayD<f64>> {
    let ndim = data.ndim();
    let mut collapse: Vec<usize> = axes.to_vec();
    collapse.sort_unstable();
    collapse.dedup();
    let kept: Vec<usize> = (0..ndim).filter(|a| !collapse.contains(a)).collect();
    let order: Vec<usize> = kept.iter().chain(collapse.iter()).copied().collect();

    let run: usize = collapse.iter().map(|&a| data.shape()[a]).product();
    let outputs: usize = kept.iter().map(|&a| data.shape()[a]).product();

    debug!(
        "Reducing {} output elements of {} values each across {} threads",
        outputs,
        run,
        rayon::current_num_threads()
    );

    let permuted: Vec<f64> = data
        .view()
        .permuted_axes(IxDyn(&order))
        .as_standard_layout()
        .iter()
        .copied()
        .collect();
    let permuted_weights: Option<Vec<f64>> = weights.map(|w| {
        w.view()
            .permuted_axes(IxDyn(&order))
            .as_standard_layout()
            .iter()
            .copied()
            .collect()
    });

    let result: Vec<f64> = if run == 0 {
        vec![method.reduce(&[], None, ddof); outputs]
    } else {
        permuted
            .par_chunks(run)
            .enumerate()
            .map(|(i, values)| {
                let w = permuted_weights
                    .as_ref()
                    .map(|pw| &pw[i * run..(i + 1) * run]);
                method.reduce(values, w, ddof)
            })
            .collect()
    };

    let out_shape: Vec<usize> = (0..ndim)
        .map(|a| if collapse.contains(&a) { 1 } else { data.shape()[a] })
        .collect();
    Ok(ArrayD::from_shape_vec(IxDyn(&out_shape), result)?)
}

/// Convenience wrapper: mean over a single axis.
pub fn parallel_mean_axis(data: &ArrayD<f64>, axis: usize) -> Result<ArrayD<f64>> {
    parallel_reduce_axes(data, &[axis], CollapseMethod::Mean, None, 0.0)
}

/// Convenience wrapper: sum over a single axis.
pub fn parallel_sum_axis(data: &ArrayD<f64>, axis: usize) -> Result<ArrayD<f64>> {
    parallel_reduce_axes(data, &[axis], CollapseMethod::Sum, None, 0.0)
}

/// Convenience wrapper: minimum over a single axis.
pub fn parallel_min_axis(data: &ArrayD<f64>, axis: usize) -> Result<ArrayD<f64>> {
    parallel_reduce_axes(data, &[axis], CollapseMethod::Min, None, 0.0)
}

/// Convenience wrapper: maximum over a single axis.
pub fn parallel_max_axis(data: &ArrayD<f64>, axis: usize) -> Result<ArrayD<f64>> {
    parallel_reduce_axes(data, &[axis], CollapseMethod::Max, None, 0.0)
}
