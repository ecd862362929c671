//! The domain of a field: its axes and every metadata construct.

use super::attribute::AttrValue;
use super::constructs::{
    AuxiliaryCoordinate, AxisKind, CellMeasure, CoordinateReference, DimensionCoordinate,
    DomainAncillary, DomainAxis,
};
use ndarray::{Array1, Array2};

/// Grid description independent of any data values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Domain {
    pub axes: Vec<DomainAxis>,
    pub dimension_coordinates: Vec<DimensionCoordinate>,
    pub auxiliary_coordinates: Vec<AuxiliaryCoordinate>,
    pub cell_measures: Vec<CellMeasure>,
    pub coordinate_references: Vec<CoordinateReference>,
    pub domain_ancillaries: Vec<DomainAncillary>,
}

impl Domain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sizes of the domain axes in order.
    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(|a| a.size).collect()
    }

    /// A construct key not yet used by any axis.
    pub fn new_axis_key(&self) -> String {
        let mut n = self.axes.len();
        loop {
            let key = format!("domainaxis{}", n);
            if !self.axes.iter().any(|a| a.key == key) {
                return key;
            }
            n += 1;
        }
    }

    /// Append an axis without a coordinate and return its key.
    pub fn add_axis(&mut self, ncdim: impl Into<String>, size: usize) -> String {
        let key = self.new_axis_key();
        self.axes.push(DomainAxis {
            key: key.clone(),
            ncdim: ncdim.into(),
            size,
        });
        key
    }

    /// Append an axis together with its dimension coordinate and return the axis key.
    /// The coordinate's `axis` field is overwritten with the new key.
    pub fn add_dimension_coordinate(&mut self, mut coordinate: DimensionCoordinate) -> String {
        let key = self.add_axis(coordinate.ncvar.clone(), coordinate.values.len());
        coordinate.axis = key.clone();
        self.dimension_coordinates.push(coordinate);
        key
    }

    pub fn axis_position(&self, key: &str) -> Option<usize> {
        self.axes.iter().position(|a| a.key == key)
    }

    pub fn dimension_coordinate(&self, axis_key: &str) -> Option<&DimensionCoordinate> {
        self.dimension_coordinates.iter().find(|c| c.axis == axis_key)
    }

    pub fn dimension_coordinate_mut(&mut self, axis_key: &str) -> Option<&mut DimensionCoordinate> {
        self.dimension_coordinates.iter_mut().find(|c| c.axis == axis_key)
    }

    /// The role of the axis at `position`, taken from its dimension coordinate.
    pub fn axis_kind(&self, position: usize) -> Option<AxisKind> {
        let axis = self.axes.get(position)?;
        self.dimension_coordinate(&axis.key).and_then(DimensionCoordinate::kind)
    }

    /// Resolve an axis identity to its position.
    ///
    /// Accepts a domain axis key, a netCDF dimension name, a dimension or 1-D
    /// auxiliary coordinate identity, or one of `T`, `Z`, `Y`, `X`.
    pub fn find_axis(&self, identity: &str) -> Option<usize> {
        if let Some(pos) = self
            .axes
            .iter()
            .position(|a| a.key == identity || a.ncdim == identity)
        {
            return Some(pos);
        }
        for coord in &self.dimension_coordinates {
            if super::constructs::matches_identity(&coord.properties, &coord.ncvar, identity) {
                return self.axis_position(&coord.axis);
            }
        }
        if let Some(kind) = AxisKind::parse(identity) {
            if let Some(pos) = (0..self.axes.len()).find(|&i| self.axis_kind(i) == Some(kind)) {
                return Some(pos);
            }
        }
        for aux in &self.auxiliary_coordinates {
            if aux.axes.len() == 1
                && super::constructs::matches_identity(&aux.properties, &aux.ncvar, identity)
            {
                return self.axis_position(&aux.axes[0]);
            }
        }
        None
    }

    /// Position of the first axis with the given role.
    pub fn axis_of_kind(&self, kind: AxisKind) -> Option<usize> {
        (0..self.axes.len()).find(|&i| self.axis_kind(i) == Some(kind))
    }

    /// Identities of every construct in the domain, in a stable order.
    pub fn construct_identities(&self) -> Vec<String> {
        let mut ids = Vec::new();
        ids.extend(self.dimension_coordinates.iter().map(|c| c.identity()));
        ids.extend(self.auxiliary_coordinates.iter().map(|c| c.identity()));
        ids.extend(self.cell_measures.iter().map(|c| c.identity()));
        ids.extend(self.coordinate_references.iter().map(|c| c.identity()));
        ids.extend(self.domain_ancillaries.iter().map(|c| c.identity()));
        ids
    }

    /// A two-axis latitude-longitude domain with points at the given values.
    pub fn latitude_longitude(latitudes: Vec<f64>, longitudes: Vec<f64>) -> Self {
        let mut domain = Domain::new();
        domain.add_dimension_coordinate(
            DimensionCoordinate::new("lat", "", Array1::from(latitudes))
                .with_property("standard_name", "latitude")
                .with_property("units", "degrees_north"),
        );
        domain.add_dimension_coordinate(
            DimensionCoordinate::new("lon", "", Array1::from(longitudes))
                .with_property("standard_name", "longitude")
                .with_property("units", "degrees_east"),
        );
        domain
    }

    /// A regular global grid with `nlat` x `nlon` cells, bounds included.
    pub fn global_grid(nlat: usize, nlon: usize) -> Self {
        let dlat = 180.0 / nlat as f64;
        let dlon = 360.0 / nlon as f64;
        let lat_bounds = Array2::from_shape_fn((nlat, 2), |(i, j)| -90.0 + (i + j) as f64 * dlat);
        let lon_bounds = Array2::from_shape_fn((nlon, 2), |(i, j)| (i + j) as f64 * dlon);
        let lats = (0..nlat).map(|i| -90.0 + (i as f64 + 0.5) * dlat).collect();
        let lons = (0..nlon).map(|i| (i as f64 + 0.5) * dlon).collect();
        let mut domain = Domain::latitude_longitude(lats, lons);
        domain.dimension_coordinates[0].bounds = Some(lat_bounds);
        domain.dimension_coordinates[1].bounds = Some(lon_bounds);
        domain
    }

    /// A cartesian grid with projection coordinates in metres.
    pub fn cartesian(y: Vec<f64>, x: Vec<f64>) -> Self {
        let mut domain = Domain::new();
        domain.add_dimension_coordinate(
            DimensionCoordinate::new("y", "", Array1::from(y))
                .with_property("standard_name", "projection_y_coordinate")
                .with_property("units", AttrValue::from("m")),
        );
        domain.add_dimension_coordinate(
            DimensionCoordinate::new("x", "", Array1::from(x))
                .with_property("standard_name", "projection_x_coordinate")
                .with_property("units", AttrValue::from("m")),
        );
        domain
    }
}
