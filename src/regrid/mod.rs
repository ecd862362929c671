//! Horizontal regridding between spherical or cartesian rectilinear grids
//!
//! - [`weights`]: bilinear, first-order conservative and nearest-neighbour weights
//! - [`operator`]: [`RegridOperator`], the reusable weight matrix and its parallel application

pub mod operator;
pub mod weights;

pub use operator::RegridOperator;

use crate::errors::{CfKitError, Result};
use crate::model::{AxisKind, CoordinateReference, Domain, Field};
use std::fmt;
use std::str::FromStr;

/// Interpolation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegridMethod {
    Bilinear,
    /// First-order, area-weighted overlap
    Conservative,
    /// Nearest source point to each destination point
    Nearest,
}

impl FromStr for RegridMethod {
    type Err = CfKitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bilinear" | "linear" => Ok(RegridMethod::Bilinear),
            "conservative" | "conservative_1st" => Ok(RegridMethod::Conservative),
            "nearest" | "nearest_stod" => Ok(RegridMethod::Nearest),
            other => Err(CfKitError::Regrid(format!("unknown regrid method '{}'", other))),
        }
    }
}

impl fmt::Display for RegridMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegridMethod::Bilinear => "bilinear",
            RegridMethod::Conservative => "conservative",
            RegridMethod::Nearest => "nearest",
        })
    }
}

impl Field {
    /// Regrid onto the horizontal grid of `dst`.
    /// `spherical` is inferred from the source coordinates when `None`.
    pub fn regrid(&self, dst: &Domain, method: RegridMethod, spherical: Option<bool>) -> Result<Field> {
        let operator = RegridOperator::new(&self.domain, dst, method, spherical)?;
        self.regrid_with(&operator, dst)
    }

    /// Regrid onto another field's grid.
    pub fn regrid_to_field(&self, other: &Field, method: RegridMethod, spherical: Option<bool>) -> Result<Field> {
        self.regrid(&other.domain, method, spherical)
    }

    /// Apply a prebuilt operator. `dst` supplies the destination grid mappings.
    pub fn regrid_with(&self, operator: &RegridOperator, dst: &Domain) -> Result<Field> {
        let field_id = self.identity();
        let y_pos = self
            .domain
            .axis_of_kind(AxisKind::Y)
            .ok_or_else(|| CfKitError::axis_not_found(&field_id, "Y"))?;
        let x_pos = self
            .domain
            .axis_of_kind(AxisKind::X)
            .ok_or_else(|| CfKitError::axis_not_found(&field_id, "X"))?;

        let data = operator.apply(&self.data, y_pos, x_pos)?;

        let mut out = self.clone();
        out.data = data;
        let y_key = out.domain.axes[y_pos].key.clone();
        let x_key = out.domain.axes[x_pos].key.clone();
        out.domain.axes[y_pos].size = operator.dst_shape.0;
        out.domain.axes[y_pos].ncdim = operator.dst_y.ncvar.clone();
        out.domain.axes[x_pos].size = operator.dst_shape.1;
        out.domain.axes[x_pos].ncdim = operator.dst_x.ncvar.clone();

        out.domain
            .dimension_coordinates
            .retain(|c| c.axis != y_key && c.axis != x_key);
        let mut new_y = operator.dst_y.clone();
        new_y.axis = y_key.clone();
        let mut new_x = operator.dst_x.clone();
        new_x.axis = x_key.clone();
        out.domain.dimension_coordinates.push(new_y);
        out.domain.dimension_coordinates.push(new_x);

        let horizontal = |axes: &[String]| axes.iter().any(|a| *a == y_key || *a == x_key);
        out.domain.auxiliary_coordinates.retain(|c| !horizontal(&c.axes));
        out.domain.cell_measures.retain(|c| !horizontal(&c.axes));
        out.domain.domain_ancillaries.retain(|c| !horizontal(&c.axes));
        let remaining: Vec<String> = out.domain.domain_ancillaries.iter().map(|a| a.ncvar.clone()).collect();
        out.domain.coordinate_references.retain(|r| !matches!(r, CoordinateReference::GridMapping { .. }));
        for reference in out.domain.coordinate_references.iter_mut() {
            if let CoordinateReference::Formula { terms, .. } = reference {
                terms.retain(|(_, ncvar)| remaining.contains(ncvar));
            }
        }
        out.domain.coordinate_references.extend(
            dst.coordinate_references
                .iter()
                .filter(|r| matches!(r, CoordinateReference::GridMapping { .. }))
                .cloned(),
        );
        Ok(out)
    }
}
