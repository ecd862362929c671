//! Reusable regrid operators: weights computed once, applied to many fields.

use super::weights::{compute_weights, GridAxis, SparseWeights};
use super::RegridMethod;
use crate::errors::{CfKitError, Result};
use crate::model::{AxisKind, DimensionCoordinate, Domain};
use ndarray::{ArrayD, IxDyn};
use rayon::prelude::*;
use tracing::{debug, info};

/// Precomputed mapping from a source horizontal grid to a destination grid
#[derive(Debug, Clone)]
pub struct RegridOperator {
    pub method: RegridMethod,
    pub spherical: bool,
    pub src_shape: (usize, usize),
    pub dst_shape: (usize, usize),
    pub dst_y: DimensionCoordinate,
    pub dst_x: DimensionCoordinate,
    weights: SparseWeights,
}

/// The Y and X dimension coordinates of a domain.
pub(crate) fn horizontal_coordinates(domain: &Domain) -> Result<(&DimensionCoordinate, &DimensionCoordinate)> {
    let find = |kind: AxisKind| {
        domain
            .axis_of_kind(kind)
            .and_then(|p| domain.dimension_coordinate(&domain.axes[p].key))
            .ok_or_else(|| CfKitError::Regrid(format!("domain has no {} dimension coordinate", kind)))
    };
    Ok((find(AxisKind::Y)?, find(AxisKind::X)?))
}

fn grid_axis(coord: &DimensionCoordinate) -> GridAxis {
    let bounds = coord.cell_bounds();
    GridAxis {
        centers: coord.values.to_vec(),
        bounds: bounds
            .rows()
            .into_iter()
            .map(|b| (b[0].min(b[1]), b[0].max(b[1])))
            .collect(),
        cyclic: coord.is_cyclic(),
        latitude: coord.is_latitude(),
    }
}

impl RegridOperator {
    /// Build the operator between the horizontal grids of two domains.
    /// `spherical` defaults to true when the source grid is latitude-longitude.
    pub fn new(src: &Domain, dst: &Domain, method: RegridMethod, spherical: Option<bool>) -> Result<Self> {
        let (src_y, src_x) = horizontal_coordinates(src)?;
        let (dst_y, dst_x) = horizontal_coordinates(dst)?;
        let spherical = spherical.unwrap_or(src_y.is_latitude() && src_x.is_longitude());
        if spherical && !(dst_y.is_latitude() && dst_x.is_longitude()) {
            return Err(CfKitError::Regrid(
                "spherical regridding needs a latitude-longitude destination grid".to_string(),
            ));
        }
        if src_y.is_empty() || src_x.is_empty() || dst_y.is_empty() || dst_x.is_empty() {
            return Err(CfKitError::Regrid("grids must not be empty".to_string()));
        }
        if method == RegridMethod::Bilinear && (src_y.len() < 2 || src_x.len() < 2) {
            return Err(CfKitError::Regrid(
                "bilinear regridding needs at least two source points per axis".to_string(),
            ));
        }

        let (sy, sx) = (grid_axis(src_y), grid_axis(src_x));
        let (dy, dx) = (grid_axis(dst_y), grid_axis(dst_x));
        let weights = compute_weights(method, &sy, &sx, &dy, &dx, spherical);
        let links: usize = weights.iter().map(Vec::len).sum();
        info!(
            method = %method,
            spherical,
            src = ?(sy.len(), sx.len()),
            dst = ?(dy.len(), dx.len()),
            links,
            "built regrid operator"
        );

        Ok(Self {
            method,
            spherical,
            src_shape: (sy.len(), sx.len()),
            dst_shape: (dy.len(), dx.len()),
            dst_y: dst_y.clone(),
            dst_x: dst_x.clone(),
            weights,
        })
    }

    /// Destination cells that no source cell reaches.
    pub fn unmapped(&self) -> usize {
        self.weights.iter().filter(|w| w.is_empty()).count()
    }

    /// Regrid one horizontal slice (row-major Y, X).
    fn apply_slice(&self, src: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .map(|row| {
                if row.is_empty() {
                    return f64::NAN;
                }
                let mut total = 0.0;
                let mut norm = 0.0;
                for &(i, w) in row {
                    let v = src[i];
                    if !v.is_nan() {
                        total += w * v;
                        norm += w;
                    } else if self.method != RegridMethod::Conservative {
                        return f64::NAN;
                    }
                }
                if norm > 0.0 {
                    total / norm
                } else {
                    f64::NAN
                }
            })
            .collect()
    }

    /// Apply to an array whose horizontal axes are at `y_pos` and `x_pos`.
    /// Every other axis is carried through unchanged.
    pub fn apply(&self, data: &ArrayD<f64>, y_pos: usize, x_pos: usize) -> Result<ArrayD<f64>> {
        let shape = data.shape();
        if shape[y_pos] != self.src_shape.0 || shape[x_pos] != self.src_shape.1 {
            return Err(CfKitError::Regrid(format!(
                "data horizontal shape ({}, {}) does not match operator source ({}, {})",
                shape[y_pos], shape[x_pos], self.src_shape.0, self.src_shape.1
            )));
        }
        let ndim = data.ndim();
        let order: Vec<usize> = (0..ndim)
            .filter(|&a| a != y_pos && a != x_pos)
            .chain([y_pos, x_pos])
            .collect();
        let src_slice = self.src_shape.0 * self.src_shape.1;
        let buffer: Vec<f64> = data.view().permuted_axes(IxDyn(&order)).iter().copied().collect();

        debug!(
            slices = buffer.len() / src_slice.max(1),
            threads = rayon::current_num_threads(),
            "applying regrid weights"
        );

        let result: Vec<f64> = if src_slice == 0 {
            Vec::new()
        } else {
            buffer
                .par_chunks(src_slice)
                .flat_map_iter(|chunk| self.apply_slice(chunk))
                .collect()
        };

        let mut permuted_shape: Vec<usize> = order[..ndim - 2].iter().map(|&a| shape[a]).collect();
        permuted_shape.push(self.dst_shape.0);
        permuted_shape.push(self.dst_shape.1);
        let permuted = ArrayD::from_shape_vec(IxDyn(&permuted_shape), result)?;

        let mut inverse = vec![0; ndim];
        for (k, &a) in order.iter().enumerate() {
            inverse[a] = k;
        }
        Ok(permuted.permuted_axes(IxDyn(&inverse)).as_standard_layout().to_owned())
    }
}
