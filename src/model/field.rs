//! The field construct: data with its full metadata context.

use super::attribute::{str_property, AttrValue, Properties};
use super::cell_method::CellMethod;
use super::constructs::{identity_of, matches_identity, CoordinateReference};
use super::domain::Domain;
use crate::errors::{CfKitError, Result};
use ndarray::{ArrayD, Axis, IxDyn};
use std::fmt;

/// A physical quantity, its domain and its data. Missing data is NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub ncvar: String,
    pub properties: Properties,
    pub domain: Domain,
    pub data: ArrayD<f64>,
    pub cell_methods: Vec<CellMethod>,
}

impl Field {
    /// Create a field, checking that the data spans the domain axes in order.
    pub fn new(ncvar: impl Into<String>, data: ArrayD<f64>, domain: Domain) -> Result<Self> {
        let ncvar = ncvar.into();
        if data.shape() != domain.shape().as_slice() {
            return Err(CfKitError::Array(ndarray::ShapeError::from_kind(
                ndarray::ErrorKind::IncompatibleShape,
            )));
        }
        Ok(Self {
            ncvar,
            properties: Properties::new(),
            domain,
            data,
            cell_methods: Vec::new(),
        })
    }

    pub fn with_property(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    pub fn identity(&self) -> String {
        identity_of(&self.properties, &self.ncvar)
    }

    /// True if the field answers to `identity` (standard_name, long_name or netCDF name).
    pub fn matches(&self, identity: &str) -> bool {
        matches_identity(&self.properties, &self.ncvar, identity)
    }

    pub fn units(&self) -> Option<&str> {
        str_property(&self.properties, "units")
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn rank(&self) -> usize {
        self.data.ndim()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn property(&self, name: &str) -> Option<&AttrValue> {
        self.properties.get(name)
    }

    pub fn set_property(&mut self, name: &str, value: impl Into<AttrValue>) {
        self.properties.insert(name.to_string(), value.into());
    }

    /// Remove a property, returning its old value.
    pub fn del_property(&mut self, name: &str) -> Option<AttrValue> {
        self.properties.remove(name)
    }

    /// Resolve an axis identity to a data dimension position.
    pub fn axis_index(&self, identity: &str) -> Result<usize> {
        self.domain
            .find_axis(identity)
            .ok_or_else(|| CfKitError::axis_not_found(self.identity(), identity))
    }

    /// Human-readable names for each data axis, e.g. `latitude(64)`.
    pub fn axis_labels(&self) -> Vec<String> {
        self.domain
            .axes
            .iter()
            .map(|axis| {
                let name = self
                    .domain
                    .dimension_coordinate(&axis.key)
                    .map(|c| c.identity())
                    .unwrap_or_else(|| format!("key%{}", axis.key));
                format!("{}({})", name, axis.size)
            })
            .collect()
    }

    /// Number of missing (NaN) data elements.
    pub fn count_masked(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }

    /// Remove all size-1 axes with their dimension coordinates.
    pub fn squeeze(&self) -> Field {
        let mut out = self.clone();
        for pos in (0..self.rank()).rev() {
            if self.shape()[pos] != 1 {
                continue;
            }
            let key = out.domain.axes[pos].key.clone();
            out.data = out.data.index_axis_move(Axis(pos), 0);
            out.domain.axes.remove(pos);
            out.domain.dimension_coordinates.retain(|c| c.axis != key);
            out.domain.auxiliary_coordinates.retain(|c| !c.axes.contains(&key));
            out.domain.cell_measures.retain(|c| !c.axes.contains(&key));
            out.domain.domain_ancillaries.retain(|c| !c.axes.contains(&key));
        }
        out
    }

    pub fn coordinate_reference(&self, identity: &str) -> Option<&CoordinateReference> {
        self.domain
            .coordinate_references
            .iter()
            .find(|r| r.matches(identity))
    }

    /// Add a coordinate reference, replacing any with the same identity.
    pub fn set_coordinate_reference(&mut self, reference: CoordinateReference) {
        let id = reference.identity();
        self.domain.coordinate_references.retain(|r| r.identity() != id);
        self.domain.coordinate_references.push(reference);
    }

    /// Remove a coordinate reference. A formula reference takes its domain
    /// ancillaries with it.
    pub fn del_coordinate_reference(&mut self, identity: &str) -> Result<CoordinateReference> {
        let pos = self
            .domain
            .coordinate_references
            .iter()
            .position(|r| r.matches(identity))
            .ok_or_else(|| CfKitError::construct_not_found(self.identity(), identity))?;
        let removed = self.domain.coordinate_references.remove(pos);
        if let CoordinateReference::Formula { terms, .. } = &removed {
            self.domain
                .domain_ancillaries
                .retain(|a| !terms.iter().any(|(_, ncvar)| *ncvar == a.ncvar));
        }
        Ok(removed)
    }

    /// Delete an auxiliary coordinate, cell measure or domain ancillary by identity.
    pub fn del_construct(&mut self, identity: &str) -> Result<String> {
        let field_id = self.identity();
        let domain = &mut self.domain;
        if let Some(pos) = domain
            .auxiliary_coordinates
            .iter()
            .position(|c| matches_identity(&c.properties, &c.ncvar, identity))
        {
            return Ok(domain.auxiliary_coordinates.remove(pos).ncvar);
        }
        if let Some(pos) = domain
            .cell_measures
            .iter()
            .position(|c| c.identity() == identity || c.measure == identity || c.ncvar == identity)
        {
            return Ok(domain.cell_measures.remove(pos).ncvar);
        }
        if let Some(pos) = domain
            .domain_ancillaries
            .iter()
            .position(|c| matches_identity(&c.properties, &c.ncvar, identity))
        {
            let removed = domain.domain_ancillaries.remove(pos).ncvar;
            for reference in domain.coordinate_references.iter_mut() {
                if let CoordinateReference::Formula { terms, .. } = reference {
                    terms.retain(|(_, ncvar)| *ncvar != removed);
                }
            }
            return Ok(removed);
        }
        Err(CfKitError::construct_not_found(field_id, identity))
    }

    /// Data value at a multi-dimensional index.
    pub fn value_at(&self, index: &[usize]) -> Option<f64> {
        self.data.get(IxDyn(index)).copied()
    }

    /// Minimum and maximum of the non-missing data.
    pub fn data_range(&self) -> Option<(f64, f64)> {
        let mut iter = self.data.iter().copied().filter(|v| v.is_finite());
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

impl fmt::Display for Field {
    /// One-line summary, e.g. `air_temperature(time(12), latitude(5)) K`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.identity(), self.axis_labels().join(", "))?;
        if let Some(units) = self.units() {
            write!(f, " {}", units)?;
        }
        Ok(())
    }
}
