//! Uncompressing CF compression-by-convention: gathering and ragged arrays.

use crate::errors::{CfKitError, Result};
use ndarray::{Array2, ArrayD, Axis, IxDyn};

/// Scatter a gathered array back onto its full grid.
///
/// `list` holds row-major flat indices into the `uncompressed` dimensions that
/// replace the compressed dimension at `axis`. Unlisted points are NaN.
pub fn uncompress_gathered(
    compressed: &ArrayD<f64>,
    axis: usize,
    list: &[usize],
    uncompressed: &[usize],
) -> Result<ArrayD<f64>> {
    if axis >= compressed.ndim() {
        return Err(CfKitError::Compression(format!(
            "compressed axis {} out of range for rank {}",
            axis,
            compressed.ndim()
        )));
    }
    if compressed.shape()[axis] != list.len() {
        return Err(CfKitError::Compression(format!(
            "list variable has {} entries but compressed dimension has {}",
            list.len(),
            compressed.shape()[axis]
        )));
    }
    let grid: usize = uncompressed.iter().product();
    if let Some(bad) = list.iter().find(|&&i| i >= grid) {
        return Err(CfKitError::Compression(format!(
            "list index {} exceeds uncompressed size {}",
            bad, grid
        )));
    }

    let mut out_shape: Vec<usize> = compressed.shape()[..axis].to_vec();
    out_shape.extend_from_slice(uncompressed);
    out_shape.extend_from_slice(&compressed.shape()[axis + 1..]);
    let mut out = ArrayD::from_elem(IxDyn(&out_shape), f64::NAN);

    let full = uncompressed.len();
    for (k, &flat) in list.iter().enumerate() {
        let mut coords = vec![0; full];
        let mut rem = flat;
        for d in (0..full).rev() {
            coords[d] = rem % uncompressed[d];
            rem /= uncompressed[d];
        }
        let source = compressed.index_axis(Axis(axis), k);
        let mut target = out.view_mut();
        // each indexing removes the leading uncompressed dimension
        for &c in &coords {
            target = target.index_axis_move(Axis(axis), c);
        }
        target.assign(&source);
    }
    Ok(out)
}

/// Expand a contiguous ragged array: instance `i` owns the next `counts[i]`
/// elements of `flat`. The result is `(instances, max count)`, padded with NaN.
pub fn uncompress_contiguous_ragged(flat: &[f64], counts: &[usize]) -> Result<Array2<f64>> {
    let total: usize = counts.iter().sum();
    if total != flat.len() {
        return Err(CfKitError::Compression(format!(
            "counts sum to {} but the sample dimension has {} elements",
            total,
            flat.len()
        )));
    }
    let width = counts.iter().copied().max().unwrap_or(0);
    let mut out = Array2::from_elem((counts.len(), width), f64::NAN);
    let mut start = 0;
    for (i, &n) in counts.iter().enumerate() {
        for j in 0..n {
            out[[i, j]] = flat[start + j];
        }
        start += n;
    }
    Ok(out)
}

/// Expand an indexed ragged array: element `k` belongs to instance `index[k]`,
/// elements keep their order within an instance. The result is padded with NaN.
pub fn uncompress_indexed_ragged(flat: &[f64], index: &[usize], instances: usize) -> Result<Array2<f64>> {
    if index.len() != flat.len() {
        return Err(CfKitError::Compression(format!(
            "index variable has {} entries but the sample dimension has {}",
            index.len(),
            flat.len()
        )));
    }
    let mut counts = vec![0usize; instances];
    for &i in index {
        if i >= instances {
            return Err(CfKitError::Compression(format!(
                "instance index {} out of range for {} instances",
                i, instances
            )));
        }
        counts[i] += 1;
    }
    let width = counts.iter().copied().max().unwrap_or(0);
    let mut out = Array2::from_elem((instances, width), f64::NAN);
    let mut filled = vec![0usize; instances];
    for (&i, &v) in index.iter().zip(flat) {
        out[[i, filled[i]]] = v;
        filled[i] += 1;
    }
    Ok(out)
}

/// Counts per instance, from a count variable read as floats.
pub fn counts_from_f64(values: &[f64]) -> Result<Vec<usize>> {
    values
        .iter()
        .map(|&v| {
            if v.is_finite() && v >= 0.0 && v.fract() == 0.0 {
                Ok(v as usize)
            } else {
                Err(CfKitError::Compression(format!("invalid count or index value {}", v)))
            }
        })
        .collect()
}
