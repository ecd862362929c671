//! Conditional masking and assignment on field data.

use crate::errors::{CfKitError, Result};
use crate::model::Field;
use crate::query::Query;
use ndarray::Axis;
use tracing::debug;

/// What to put where a condition holds
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WhereValue {
    Masked,
    Value(f64),
}

impl WhereValue {
    fn as_f64(self) -> f64 {
        match self {
            WhereValue::Masked => f64::NAN,
            WhereValue::Value(v) => v,
        }
    }
}

impl Field {
    /// Replace data where `condition` holds on the data values.
    pub fn where_data(&self, condition: &Query, value: WhereValue) -> Field {
        let replacement = value.as_f64();
        let mut out = self.clone();
        out.data.mapv_inplace(|v| if condition.evaluate(v) { replacement } else { v });
        debug!(
            field = %self.identity(),
            condition = %condition,
            masked = out.count_masked(),
            "applied where"
        );
        out
    }

    /// Mask data where `condition` holds on the data values.
    pub fn mask_where(&self, condition: &Query) -> Field {
        self.where_data(condition, WhereValue::Masked)
    }

    /// Replace data where `condition` holds on a 1-D dimension coordinate,
    /// broadcast along the coordinate's axis.
    pub fn where_coordinate(
        &self,
        coordinate: &str,
        condition: &Query,
        value: WhereValue,
    ) -> Result<Field> {
        let position = self.axis_index(coordinate)?;
        let key = &self.domain.axes[position].key;
        let coord = self.domain.dimension_coordinate(key).ok_or_else(|| {
            CfKitError::construct_not_found(self.identity(), coordinate)
        })?;
        let replacement = value.as_f64();
        let mut out = self.clone();
        for (i, mut lane) in out.data.axis_iter_mut(Axis(position)).enumerate() {
            if condition.evaluate(coord.values[i]) {
                lane.fill(replacement);
            }
        }
        Ok(out)
    }

    /// Replace data where another field of the same shape satisfies `condition`.
    pub fn where_field(&self, other: &Field, condition: &Query, value: WhereValue) -> Result<Field> {
        if other.shape() != self.shape() {
            return Err(CfKitError::invalid_query(format!(
                "condition field shape {:?} does not match {:?}",
                other.shape(),
                self.shape()
            )));
        }
        let replacement = value.as_f64();
        let mut out = self.clone();
        out.data
            .iter_mut()
            .zip(other.data.iter())
            .filter(|(_, c)| condition.evaluate(**c))
            .for_each(|(v, _)| *v = replacement);
        Ok(out)
    }

    /// Mask values outside the `valid_min`/`valid_max`/`valid_range` properties.
    pub fn mask_invalid(&self) -> Field {
        let range = self.property("valid_range").map(|v| v.as_f64s());
        let lo = self
            .property("valid_min")
            .and_then(|v| v.as_f64())
            .or_else(|| range.as_ref().and_then(|r| r.first().copied()));
        let hi = self
            .property("valid_max")
            .and_then(|v| v.as_f64())
            .or_else(|| range.as_ref().and_then(|r| r.get(1).copied()));
        let mut out = self.clone();
        out.data.mapv_inplace(|v| {
            let below = lo.map(|l| v < l).unwrap_or(false);
            let above = hi.map(|h| v > h).unwrap_or(false);
            if below || above {
                f64::NAN
            } else {
                v
            }
        });
        out
    }
}
