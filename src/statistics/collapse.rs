//! Collapsing fields: statistics over axes with CF metadata bookkeeping

use super::operations::{CollapseMethod, StatisticalReduction};
use crate::errors::{CfKitError, Result};
use crate::model::{AttrValue, AxisKind, CellMethod, CoordinateReference, Field};
use ndarray::{ArrayD, IxDyn};
use tracing::info;

/// Options controlling a collapse
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollapseOptions {
    /// Weight by cell extent (area for latitude/longitude, length otherwise)
    pub weighted: bool,
    /// Delta degrees of freedom for variance and standard deviation
    pub ddof: f64,
}

impl Default for CollapseOptions {
    fn default() -> Self {
        Self {
            weighted: false,
            ddof: 1.0,
        }
    }
}

impl Field {
    /// Collapse the field over the named axes.
    ///
    /// Collapsed axes keep size 1; their coordinate becomes the midpoint of the
    /// full original extent with bounds spanning it. Constructs spanning a
    /// collapsed axis are dropped and a cell method is appended.
    pub fn collapse(
        &self,
        axes: &[&str],
        method: CollapseMethod,
        options: CollapseOptions,
    ) -> Result<Field> {
        if axes.is_empty() {
            return Err(CfKitError::Collapse("no axes given".to_string()));
        }
        let mut positions = Vec::with_capacity(axes.len());
        for axis in axes {
            let pos = self.axis_index(axis)?;
            if !positions.contains(&pos) {
                positions.push(pos);
            }
        }
        positions.sort_unstable();

        let weights = if options.weighted && method.uses_weights() {
            Some(self.collapse_weights(&positions)?)
        } else {
            None
        };

        info!(
            field = %self.identity(),
            method = %method,
            axes = ?axes,
            weighted = weights.is_some(),
            "collapsing"
        );

        let data = self
            .data
            .reduce_along_axes(&positions, method, weights.as_ref(), options.ddof)?;

        let mut out = self.clone();
        out.data = data;
        let keys: Vec<String> = positions
            .iter()
            .map(|&p| self.domain.axes[p].key.clone())
            .collect();

        for &p in &positions {
            out.domain.axes[p].size = 1;
        }
        for coord in out
            .domain
            .dimension_coordinates
            .iter_mut()
            .filter(|c| keys.contains(&c.axis))
        {
            let bounds = coord.cell_bounds();
            let lo = bounds.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = bounds.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let (lo, hi) = if coord.is_increasing() { (lo, hi) } else { (hi, lo) };
            coord.values = ndarray::arr1(&[(lo + hi) / 2.0]);
            coord.bounds = Some(ndarray::arr2(&[[lo, hi]]));
        }
        let spans = |axes: &[String]| axes.iter().any(|a| keys.contains(a));
        out.domain.auxiliary_coordinates.retain(|c| !spans(&c.axes));
        out.domain.cell_measures.retain(|c| !spans(&c.axes));
        out.domain.domain_ancillaries.retain(|c| !spans(&c.axes));
        let remaining: Vec<String> = out
            .domain
            .domain_ancillaries
            .iter()
            .map(|a| a.ncvar.clone())
            .collect();
        for reference in out.domain.coordinate_references.iter_mut() {
            if let CoordinateReference::Formula { terms, .. } = reference {
                terms.retain(|(_, ncvar)| remaining.contains(ncvar));
            }
        }

        out.cell_methods
            .push(CellMethod::new(self.cell_method_names(&positions), method.cell_method_name()));

        match method {
            CollapseMethod::Variance => {
                if let Some(units) = self.units() {
                    let squared = if units.contains(' ') {
                        format!("({})2", units)
                    } else {
                        format!("{}2", units)
                    };
                    out.set_property("units", squared);
                }
            }
            CollapseMethod::SampleSize => {
                out.set_property("units", AttrValue::from("1"));
                out.del_property("standard_name");
                out.set_property("long_name", format!("number of valid values of {}", self.identity()));
            }
            _ => {}
        }
        Ok(out)
    }

    /// Names used in the cell method: `area` when both horizontal axes are
    /// collapsed, otherwise the coordinate's netCDF name or the dimension name.
    fn cell_method_names(&self, positions: &[usize]) -> Vec<String> {
        let y = self.domain.axis_of_kind(AxisKind::Y);
        let x = self.domain.axis_of_kind(AxisKind::X);
        let horizontal = matches!((y, x), (Some(y), Some(x)) if positions.contains(&y) && positions.contains(&x));

        let mut names = Vec::new();
        if horizontal {
            names.push("area".to_string());
        }
        for &p in positions {
            if horizontal && (Some(p) == y || Some(p) == x) {
                continue;
            }
            let axis = &self.domain.axes[p];
            let name = self
                .domain
                .dimension_coordinate(&axis.key)
                .map(|c| c.ncvar.clone())
                .unwrap_or_else(|| axis.ncdim.clone());
            names.push(name);
        }
        names
    }

    /// Cell weights broadcast to the data shape.
    ///
    /// Collapsed latitude-longitude axes use an `area` cell measure when one
    /// spans exactly those axes; otherwise each collapsed axis contributes its
    /// cell extent (`Δsin(φ)` for latitude).
    pub fn collapse_weights(&self, positions: &[usize]) -> Result<ArrayD<f64>> {
        let shape = self.shape().to_vec();
        let y = self.domain.axis_of_kind(AxisKind::Y);
        let x = self.domain.axis_of_kind(AxisKind::X);

        let area_measure = match (y, x) {
            (Some(y), Some(x)) if positions.contains(&y) && positions.contains(&x) => {
                let yk = &self.domain.axes[y].key;
                let xk = &self.domain.axes[x].key;
                self.domain.cell_measures.iter().find(|m| {
                    m.measure == "area" && m.axes.len() == 2 && m.axes.contains(yk) && m.axes.contains(xk)
                })
            }
            _ => None,
        };

        let mut per_axis: Vec<(usize, Vec<f64>)> = Vec::new();
        for &p in positions {
            if area_measure.is_some() && (Some(p) == y || Some(p) == x) {
                continue;
            }
            let key = &self.domain.axes[p].key;
            let Some(coord) = self.domain.dimension_coordinate(key) else {
                continue;
            };
            let bounds = coord.cell_bounds();
            let w: Vec<f64> = bounds
                .rows()
                .into_iter()
                .map(|b| {
                    if coord.is_latitude() {
                        (b[1].to_radians().sin() - b[0].to_radians().sin()).abs()
                    } else {
                        (b[1] - b[0]).abs()
                    }
                })
                .collect();
            if w.iter().all(|v| *v == 0.0) {
                continue;
            }
            per_axis.push((p, w));
        }

        let measure_positions: Option<Vec<usize>> = area_measure.map(|m| {
            m.axes
                .iter()
                .filter_map(|k| self.domain.axis_position(k))
                .collect()
        });

        let weights = ArrayD::from_shape_fn(IxDyn(&shape), |idx| {
            let mut w = 1.0;
            for (p, values) in &per_axis {
                w *= values[idx[*p]];
            }
            if let (Some(measure), Some(mpos)) = (area_measure, measure_positions.as_ref()) {
                let midx: Vec<usize> = mpos.iter().map(|&p| idx[p]).collect();
                w *= measure.data.get(IxDyn(&midx)).copied().unwrap_or(f64::NAN);
            }
            w
        });
        Ok(weights)
    }
}
