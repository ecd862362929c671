//! Metadata constructs that make up a field's domain.

use super::attribute::{str_property, AttrValue, Properties};
use ndarray::{Array1, Array2, ArrayD};
use std::fmt;

/// The CF identity of a construct: standard_name, then long_name, then netCDF name.
pub fn identity_of(properties: &Properties, ncvar: &str) -> String {
    if let Some(sn) = str_property(properties, "standard_name") {
        sn.to_string()
    } else if let Some(ln) = str_property(properties, "long_name") {
        format!("long_name={}", ln)
    } else {
        format!("ncvar%{}", ncvar)
    }
}

/// True if `identity` names a construct with these properties and netCDF name.
pub fn matches_identity(properties: &Properties, ncvar: &str, identity: &str) -> bool {
    if identity == ncvar || identity == format!("ncvar%{}", ncvar) {
        return true;
    }
    if str_property(properties, "standard_name") == Some(identity) {
        return true;
    }
    if let Some(ln) = str_property(properties, "long_name") {
        if identity == ln || identity == format!("long_name={}", ln) {
            return true;
        }
    }
    false
}

/// Spatiotemporal role of a coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisKind {
    T,
    Z,
    Y,
    X,
}

impl AxisKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "T" => Some(AxisKind::T),
            "Z" => Some(AxisKind::Z),
            "Y" => Some(AxisKind::Y),
            "X" => Some(AxisKind::X),
            _ => None,
        }
    }

    /// Infer the role from CF attributes (`axis`, `standard_name`, `units`, `positive`).
    pub fn infer(properties: &Properties) -> Option<Self> {
        if let Some(kind) = str_property(properties, "axis").and_then(AxisKind::parse) {
            return Some(kind);
        }
        let standard_name = str_property(properties, "standard_name").unwrap_or("");
        let units = str_property(properties, "units").unwrap_or("");
        match standard_name {
            "latitude" | "grid_latitude" | "projection_y_coordinate" => return Some(AxisKind::Y),
            "longitude" | "grid_longitude" | "projection_x_coordinate" => return Some(AxisKind::X),
            "time" => return Some(AxisKind::T),
            _ => {}
        }
        let units_lower = units.to_ascii_lowercase();
        if units_lower.starts_with("degrees_north") || units_lower == "degree_north" {
            return Some(AxisKind::Y);
        }
        if units_lower.starts_with("degrees_east") || units_lower == "degree_east" {
            return Some(AxisKind::X);
        }
        if units_lower.contains(" since ") {
            return Some(AxisKind::T);
        }
        if properties.contains_key("positive")
            || standard_name.starts_with("atmosphere_")
            || standard_name.starts_with("ocean_")
            || matches!(standard_name, "air_pressure" | "altitude" | "height" | "depth")
            || matches!(units_lower.as_str(), "pa" | "hpa" | "mbar" | "millibar")
        {
            return Some(AxisKind::Z);
        }
        None
    }
}

impl fmt::Display for AxisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AxisKind::T => "T",
            AxisKind::Z => "Z",
            AxisKind::Y => "Y",
            AxisKind::X => "X",
        };
        f.write_str(s)
    }
}

/// An independent axis of a domain
#[derive(Debug, Clone, PartialEq)]
pub struct DomainAxis {
    /// Construct key, e.g. `domainaxis0`
    pub key: String,
    /// netCDF dimension name
    pub ncdim: String,
    pub size: usize,
}

/// A 1-D monotonic coordinate along a single domain axis
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionCoordinate {
    pub ncvar: String,
    pub axis: String,
    pub properties: Properties,
    pub values: Array1<f64>,
    pub bounds: Option<Array2<f64>>,
}

impl DimensionCoordinate {
    pub fn new(ncvar: impl Into<String>, axis: impl Into<String>, values: Array1<f64>) -> Self {
        Self {
            ncvar: ncvar.into(),
            axis: axis.into(),
            properties: Properties::new(),
            values,
            bounds: None,
        }
    }

    pub fn with_property(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    pub fn with_bounds(mut self, bounds: Array2<f64>) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn identity(&self) -> String {
        identity_of(&self.properties, &self.ncvar)
    }

    pub fn units(&self) -> Option<&str> {
        str_property(&self.properties, "units")
    }

    pub fn kind(&self) -> Option<AxisKind> {
        AxisKind::infer(&self.properties)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_increasing(&self) -> bool {
        self.values.len() < 2 || self.values[1] >= self.values[0]
    }

    pub fn is_longitude(&self) -> bool {
        matches!(
            str_property(&self.properties, "standard_name"),
            Some("longitude") | Some("grid_longitude")
        ) || self
            .units()
            .map(|u| u.to_ascii_lowercase().starts_with("degree") && u.to_ascii_lowercase().ends_with("east"))
            .unwrap_or(false)
    }

    pub fn is_latitude(&self) -> bool {
        matches!(
            str_property(&self.properties, "standard_name"),
            Some("latitude") | Some("grid_latitude")
        ) || self
            .units()
            .map(|u| u.to_ascii_lowercase().starts_with("degree") && u.to_ascii_lowercase().ends_with("north"))
            .unwrap_or(false)
    }

    /// Cell bounds, taken from the stored bounds or derived from coordinate midpoints.
    pub fn cell_bounds(&self) -> Array2<f64> {
        if let Some(bounds) = &self.bounds {
            return bounds.clone();
        }
        derive_bounds(&self.values, self.is_latitude())
    }

    /// A longitude axis whose cells span the full circle.
    pub fn is_cyclic(&self) -> bool {
        if !self.is_longitude() || self.values.is_empty() {
            return false;
        }
        let bounds = self.cell_bounds();
        let n = bounds.nrows();
        let lo = bounds[[0, 0]].min(bounds[[0, 1]]).min(bounds[[n - 1, 0]]).min(bounds[[n - 1, 1]]);
        let hi = bounds[[0, 0]].max(bounds[[0, 1]]).max(bounds[[n - 1, 0]]).max(bounds[[n - 1, 1]]);
        ((hi - lo) - 360.0).abs() < 1e-6
    }
}

/// Bounds halfway between neighbouring points, extrapolated at the ends.
/// Latitude bounds are clamped to the poles.
pub fn derive_bounds(values: &Array1<f64>, clamp_latitude: bool) -> Array2<f64> {
    let n = values.len();
    let mut bounds = Array2::zeros((n, 2));
    if n == 0 {
        return bounds;
    }
    if n == 1 {
        bounds[[0, 0]] = values[0];
        bounds[[0, 1]] = values[0];
        return bounds;
    }
    for i in 0..n {
        let lower = if i == 0 {
            values[0] - (values[1] - values[0]) / 2.0
        } else {
            (values[i - 1] + values[i]) / 2.0
        };
        let upper = if i == n - 1 {
            values[n - 1] + (values[n - 1] - values[n - 2]) / 2.0
        } else {
            (values[i] + values[i + 1]) / 2.0
        };
        bounds[[i, 0]] = lower;
        bounds[[i, 1]] = upper;
    }
    if clamp_latitude {
        bounds.mapv_inplace(|b| b.clamp(-90.0, 90.0));
    }
    bounds
}

/// An N-D coordinate spanning any subset of the domain axes
#[derive(Debug, Clone, PartialEq)]
pub struct AuxiliaryCoordinate {
    pub ncvar: String,
    pub axes: Vec<String>,
    pub properties: Properties,
    pub data: ArrayD<f64>,
}

impl AuxiliaryCoordinate {
    pub fn identity(&self) -> String {
        identity_of(&self.properties, &self.ncvar)
    }
}

/// Cell sizes (area or volume) spanning domain axes
#[derive(Debug, Clone, PartialEq)]
pub struct CellMeasure {
    pub ncvar: String,
    pub measure: String,
    pub axes: Vec<String>,
    pub properties: Properties,
    pub data: ArrayD<f64>,
}

impl CellMeasure {
    pub fn identity(&self) -> String {
        format!("measure:{}", self.measure)
    }
}

/// Data needed to compute a parametric vertical coordinate
#[derive(Debug, Clone, PartialEq)]
pub struct DomainAncillary {
    pub ncvar: String,
    pub axes: Vec<String>,
    pub properties: Properties,
    pub data: ArrayD<f64>,
}

impl DomainAncillary {
    pub fn identity(&self) -> String {
        identity_of(&self.properties, &self.ncvar)
    }
}

/// A coordinate system: either a grid mapping or a parametric vertical formula
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateReference {
    GridMapping {
        ncvar: String,
        /// Value of `grid_mapping_name`
        name: String,
        parameters: Properties,
    },
    Formula {
        /// Standard name of the parametric coordinate, e.g. `atmosphere_hybrid_height_coordinate`
        standard_name: String,
        /// netCDF name of the dimension coordinate carrying `formula_terms`
        coordinate: String,
        /// (term, domain ancillary netCDF name) pairs
        terms: Vec<(String, String)>,
    },
}

impl CoordinateReference {
    pub fn identity(&self) -> String {
        match self {
            CoordinateReference::GridMapping { name, .. } => format!("grid_mapping_name:{}", name),
            CoordinateReference::Formula { standard_name, .. } => {
                format!("standard_name:{}", standard_name)
            }
        }
    }

    /// Match by full identity, bare name, or netCDF variable name.
    pub fn matches(&self, identity: &str) -> bool {
        if self.identity() == identity {
            return true;
        }
        match self {
            CoordinateReference::GridMapping { ncvar, name, .. } => {
                identity == name || identity == ncvar || identity == format!("ncvar%{}", ncvar)
            }
            CoordinateReference::Formula { standard_name, .. } => identity == standard_name,
        }
    }
}
