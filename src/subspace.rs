//! Subspacing fields by coordinate values or index ranges.

use crate::errors::{CfKitError, Result};
use crate::model::Field;
use crate::query::Query;
use ndarray::{Array1, Axis};
use tracing::debug;

/// A coordinate condition on one axis, e.g. `latitude` within (-30, 30)
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSelection {
    pub axis: String,
    pub query: Query,
}

impl AxisSelection {
    pub fn new(axis: impl Into<String>, query: Query) -> Self {
        Self {
            axis: axis.into(),
            query,
        }
    }

    /// Parse `axis=op:value[:value]`, e.g. `latitude=wi:-30:30`.
    pub fn parse(s: &str) -> Result<Self> {
        let (axis, query) = s.split_once('=').ok_or_else(|| {
            CfKitError::invalid_query(format!("expected '<axis>=<query>', got '{}'", s))
        })?;
        Ok(Self::new(axis.trim(), Query::parse(query)?))
    }
}

impl Field {
    /// Subspace by coordinate conditions, one per axis.
    ///
    /// On cyclic longitude axes interval queries wrap around the circle and
    /// the selected coordinates are shifted into the requested range.
    pub fn subspace(&self, selections: &[AxisSelection]) -> Result<Field> {
        let mut out = self.clone();
        for selection in selections {
            let position = out.axis_index(&selection.axis)?;
            let key = out.domain.axes[position].key.clone();
            let coord = out.domain.dimension_coordinate(&key).ok_or_else(|| {
                CfKitError::invalid_subspace(format!(
                    "axis '{}' has no dimension coordinate to select on",
                    selection.axis
                ))
            })?;

            let cyclic = coord.is_cyclic();
            let mut picked: Vec<(usize, f64)> = coord
                .values
                .iter()
                .enumerate()
                .filter_map(|(i, &v)| {
                    if cyclic {
                        selection
                            .query
                            .evaluate_cyclic(v, 360.0)
                            .or_else(|| selection.query.evaluate(v).then_some(v))
                            .map(|shifted| (i, shifted))
                    } else {
                        selection.query.evaluate(v).then_some((i, v))
                    }
                })
                .collect();

            if picked.is_empty() {
                return Err(CfKitError::invalid_subspace(format!(
                    "no '{}' values satisfy {}",
                    selection.axis, selection.query
                )));
            }

            if cyclic {
                let increasing = coord.is_increasing();
                picked.sort_by(|a, b| {
                    let ord = a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal);
                    if increasing {
                        ord
                    } else {
                        ord.reverse()
                    }
                });
            }

            let indices: Vec<usize> = picked.iter().map(|(i, _)| *i).collect();
            let shifts: Vec<f64> = picked
                .iter()
                .map(|(i, shifted)| shifted - coord.values[*i])
                .collect();
            debug!(axis = %selection.axis, selected = indices.len(), "subspace selection");

            out = out.subspace_indices(&selection.axis, &indices)?;
            if shifts.iter().any(|s| *s != 0.0) {
                if let Some(coord) = out.domain.dimension_coordinate_mut(&key) {
                    coord.values = &coord.values + &Array1::from(shifts.clone());
                    if let Some(bounds) = coord.bounds.as_mut() {
                        for (mut row, shift) in bounds.rows_mut().into_iter().zip(&shifts) {
                            row.mapv_inplace(|b| b + shift);
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    /// Subspace one axis to the given indices, in the given order.
    pub fn subspace_indices(&self, axis: &str, indices: &[usize]) -> Result<Field> {
        let position = self.axis_index(axis)?;
        let size = self.shape()[position];
        if indices.is_empty() {
            return Err(CfKitError::invalid_subspace(format!(
                "empty selection on axis '{}'",
                axis
            )));
        }
        if let Some(bad) = indices.iter().find(|&&i| i >= size) {
            return Err(CfKitError::invalid_subspace(format!(
                "index {} out of range for axis '{}' of size {}",
                bad, axis, size
            )));
        }

        let key = self.domain.axes[position].key.clone();
        let mut out = self.clone();
        out.data = self.data.select(Axis(position), indices);
        out.domain.axes[position].size = indices.len();

        for coord in out.domain.dimension_coordinates.iter_mut().filter(|c| c.axis == key) {
            coord.values = coord.values.select(Axis(0), indices);
            if let Some(bounds) = coord.bounds.as_mut() {
                *bounds = bounds.select(Axis(0), indices);
            }
        }
        for aux in out.domain.auxiliary_coordinates.iter_mut() {
            if let Some(p) = aux.axes.iter().position(|a| *a == key) {
                aux.data = aux.data.select(Axis(p), indices);
            }
        }
        for measure in out.domain.cell_measures.iter_mut() {
            if let Some(p) = measure.axes.iter().position(|a| *a == key) {
                measure.data = measure.data.select(Axis(p), indices);
            }
        }
        for ancillary in out.domain.domain_ancillaries.iter_mut() {
            if let Some(p) = ancillary.axes.iter().position(|a| *a == key) {
                ancillary.data = ancillary.data.select(Axis(p), indices);
            }
        }
        Ok(out)
    }

    /// Subspace one axis to the half-open index range `start..end`.
    pub fn subspace_range(&self, axis: &str, start: usize, end: usize) -> Result<Field> {
        let position = self.axis_index(axis)?;
        let size = self.shape()[position];
        if start >= size || end > size || start >= end {
            return Err(CfKitError::invalid_subspace(format!(
                "Invalid slice range for axis '{}': {}:{} (axis size: {})",
                axis, start, end, size
            )));
        }
        let indices: Vec<usize> = (start..end).collect();
        self.subspace_indices(axis, &indices)
    }
}
