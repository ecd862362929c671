//! Interpreting a flat netCDF namespace as CF fields.
//!
//! Every variable that no other variable refers to becomes a field. Coordinate
//! variables, bounds, auxiliary coordinates, cell measures, grid mappings and
//! formula terms are attached to the fields that reference them. Gathered and
//! ragged arrays are uncompressed on the way in.

use crate::compression::{
    counts_from_f64, uncompress_contiguous_ragged, uncompress_gathered, uncompress_indexed_ragged,
};
use crate::errors::Result;
use crate::flatten::{GroupNode, RawVariable};
use crate::model::{
    AuxiliaryCoordinate, CellMeasure, CellMethod, CoordinateReference, DimensionCoordinate,
    Domain, DomainAncillary, Field, FieldList, Properties,
};
use ndarray::{ArrayD, Ix1, Ix2};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Name given to the element dimension of uncompressed ragged arrays
pub const ELEMENT_DIMENSION: &str = "element";

/// Data variable attributes that describe structure rather than the quantity
const STRUCTURAL_ATTRIBUTES: &[&str] = &["coordinates", "cell_measures", "grid_mapping", "cell_methods"];

/// Split a reference attribute into its names.
fn names(attributes: &Properties, key: &str) -> Vec<String> {
    attributes
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Parse `key: value key: value ...` pairs, as in `cell_measures` and `formula_terms`.
pub fn keyed_pairs(value: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut key: Option<String> = None;
    for token in value.split_whitespace() {
        if let Some(k) = token.strip_suffix(':') {
            key = Some(k.to_string());
        } else if let Some(k) = key.take() {
            pairs.push((k, token.to_string()));
        }
    }
    pairs
}

/// Grid mapping variable names from either the short (`crs`) or the
/// extended (`crs: lat lon`) form of `grid_mapping`.
fn grid_mapping_names(value: &str) -> Vec<String> {
    if value.contains(':') {
        value
            .split_whitespace()
            .filter_map(|t| t.strip_suffix(':'))
            .map(str::to_string)
            .collect()
    } else {
        value.split_whitespace().map(str::to_string).collect()
    }
}

fn str_attr<'a>(var: &'a RawVariable, key: &str) -> Option<&'a str> {
    var.attributes.get(key).and_then(|v| v.as_str())
}

/// Compression by convention found in a dataset
#[derive(Debug, Clone)]
enum Compression {
    Gathered {
        dimension: String,
        list: Vec<usize>,
        dimensions: Vec<String>,
        sizes: Vec<usize>,
    },
    Contiguous {
        sample: String,
        instance: String,
        counts: Vec<usize>,
    },
    Indexed {
        sample: String,
        instance: String,
        index: Vec<usize>,
        instances: usize,
    },
}

struct Decoder<'a> {
    group: &'a GroupNode,
    compression: Vec<Compression>,
}

impl<'a> Decoder<'a> {
    fn new(group: &'a GroupNode) -> Result<Self> {
        let mut compression = Vec::new();
        for var in &group.variables {
            let data: Vec<f64> = var.data.iter().copied().collect();
            if let (Some(compress), [dimension]) = (str_attr(var, "compress"), var.dimensions.as_slice()) {
                let dimensions: Vec<String> = compress.split_whitespace().map(str::to_string).collect();
                let sizes = dimensions
                    .iter()
                    .map(|d| group.dimension(d).map(|d| d.len).unwrap_or(0))
                    .collect();
                compression.push(Compression::Gathered {
                    dimension: dimension.clone(),
                    list: counts_from_f64(&data)?,
                    dimensions,
                    sizes,
                });
            } else if let (Some(sample), [instance]) =
                (str_attr(var, "sample_dimension"), var.dimensions.as_slice())
            {
                compression.push(Compression::Contiguous {
                    sample: sample.to_string(),
                    instance: instance.clone(),
                    counts: counts_from_f64(&data)?,
                });
            } else if let (Some(instance), [sample]) =
                (str_attr(var, "instance_dimension"), var.dimensions.as_slice())
            {
                compression.push(Compression::Indexed {
                    sample: sample.clone(),
                    instance: instance.to_string(),
                    index: counts_from_f64(&data)?,
                    instances: group.dimension(instance).map(|d| d.len).unwrap_or(0),
                });
            }
        }
        if !compression.is_empty() {
            debug!(count = compression.len(), "found compressed dimensions");
        }
        Ok(Self { group, compression })
    }

    /// Variables that other variables point at, plus the compression
    /// variables themselves. None of these become fields.
    fn referenced(&self) -> HashSet<String> {
        let mut out = HashSet::new();
        for var in &self.group.variables {
            for key in ["coordinates", "bounds", "climatology", "ancillary_variables"] {
                out.extend(names(&var.attributes, key));
            }
            if let Some(v) = str_attr(var, "cell_measures") {
                out.extend(keyed_pairs(v).into_iter().map(|(_, name)| name));
            }
            if let Some(v) = str_attr(var, "formula_terms") {
                out.extend(keyed_pairs(v).into_iter().map(|(_, name)| name));
            }
            if let Some(v) = str_attr(var, "grid_mapping") {
                out.extend(grid_mapping_names(v));
            }
            let is_coordinate = var.dimensions.len() == 1 && var.dimensions[0] == var.name;
            let is_compression = ["compress", "sample_dimension", "instance_dimension"]
                .iter()
                .any(|k| var.attributes.contains_key(*k));
            if is_coordinate || is_compression || var.attributes.contains_key("grid_mapping_name") {
                out.insert(var.name.clone());
            }
        }
        out
    }

    /// Dimensions and data of a variable with any compression undone.
    fn expand(&self, var: &RawVariable) -> Result<(Vec<String>, ArrayD<f64>)> {
        let mut dims = var.dimensions.clone();
        let mut data = var.data.clone();
        for scheme in &self.compression {
            match scheme {
                Compression::Gathered {
                    dimension,
                    list,
                    dimensions,
                    sizes,
                } => {
                    if let Some(axis) = dims.iter().position(|d| d == dimension) {
                        data = uncompress_gathered(&data, axis, list, sizes)?;
                        dims.splice(axis..=axis, dimensions.iter().cloned());
                    }
                }
                Compression::Contiguous {
                    sample,
                    instance,
                    counts,
                } => {
                    if dims.len() == 1 && dims[0] == *sample {
                        let flat: Vec<f64> = data.iter().copied().collect();
                        data = uncompress_contiguous_ragged(&flat, counts)?.into_dyn();
                        dims = vec![instance.clone(), ELEMENT_DIMENSION.to_string()];
                    } else if dims.contains(sample) {
                        warn!("Ragged variable '{}' has extra dimensions; left compressed", var.name);
                    }
                }
                Compression::Indexed {
                    sample,
                    instance,
                    index,
                    instances,
                } => {
                    if dims.len() == 1 && dims[0] == *sample {
                        let flat: Vec<f64> = data.iter().copied().collect();
                        data = uncompress_indexed_ragged(&flat, index, *instances)?.into_dyn();
                        dims = vec![instance.clone(), ELEMENT_DIMENSION.to_string()];
                    } else if dims.contains(sample) {
                        warn!("Ragged variable '{}' has extra dimensions; left compressed", var.name);
                    }
                }
            }
        }
        Ok((dims, data))
    }

    /// A coordinate variable for `dim`: 1-D, spanning `dim`, with the same name.
    fn coordinate_variable(&self, dim: &str) -> Option<&'a RawVariable> {
        self.group
            .variable(dim)
            .filter(|v| v.dimensions.len() == 1 && v.dimensions[0] == dim)
    }

    fn dimension_coordinate(&self, var: &RawVariable, size: usize) -> Option<DimensionCoordinate> {
        let values = var.data.clone().into_dimensionality::<Ix1>().ok()?;
        if values.len() != size {
            warn!("Coordinate variable '{}' has the wrong length; ignored", var.name);
            return None;
        }
        let mut properties = var.attributes.clone();
        let bounds_name = properties
            .remove("bounds")
            .or_else(|| properties.remove("climatology"))
            .and_then(|v| v.as_str().map(str::to_string));
        properties.remove("formula_terms");

        let mut coord = DimensionCoordinate::new(var.name.clone(), String::new(), values);
        coord.properties = properties;
        if let Some(name) = bounds_name {
            match self.group.variable(&name).map(|b| b.data.clone().into_dimensionality::<Ix2>()) {
                Some(Ok(bounds)) if bounds.nrows() == size && bounds.ncols() == 2 => coord.bounds = Some(bounds),
                _ => warn!("Bounds '{}' of '{}' are missing or not (n, 2); ignored", name, var.name),
            }
        }
        Some(coord)
    }

    /// Axis keys for a construct's dimensions, if all belong to the field.
    fn construct_axes(&self, dims: &[String], axis_keys: &HashMap<String, String>) -> Option<Vec<String>> {
        dims.iter().map(|d| axis_keys.get(d).cloned()).collect()
    }

    fn field(&self, var: &RawVariable) -> Result<Field> {
        let (dims, data) = self.expand(var)?;
        let mut domain = Domain::new();
        let mut axis_keys: HashMap<String, String> = HashMap::new();

        for (pos, dim) in dims.iter().enumerate() {
            let size = data.shape()[pos];
            let coordinate = self
                .coordinate_variable(dim)
                .and_then(|c| self.dimension_coordinate(c, size));
            let key = match coordinate {
                Some(coord) => domain.add_dimension_coordinate(coord),
                None => domain.add_axis(dim.clone(), size),
            };
            axis_keys.insert(dim.clone(), key);
        }

        let mut properties = var.attributes.clone();
        for key in STRUCTURAL_ATTRIBUTES {
            properties.remove(*key);
        }

        for name in names(&var.attributes, "coordinates") {
            if domain.dimension_coordinates.iter().any(|c| c.ncvar == name) {
                continue;
            }
            let Some(aux) = self.group.variable(&name) else {
                warn!("Auxiliary coordinate '{}' of '{}' not found", name, var.name);
                continue;
            };
            let (aux_dims, aux_data) = self.expand(aux)?;
            match self.construct_axes(&aux_dims, &axis_keys) {
                Some(axes) => {
                    let mut aux_props = aux.attributes.clone();
                    aux_props.remove("bounds");
                    domain.auxiliary_coordinates.push(AuxiliaryCoordinate {
                        ncvar: name,
                        axes,
                        properties: aux_props,
                        data: aux_data,
                    });
                }
                None => warn!("Auxiliary coordinate '{}' spans dimensions outside '{}'", name, var.name),
            }
        }

        if let Some(value) = str_attr(var, "cell_measures") {
            for (measure, name) in keyed_pairs(value) {
                let Some(cm) = self.group.variable(&name) else {
                    warn!("Cell measure '{}' of '{}' not found (external?)", name, var.name);
                    continue;
                };
                let (cm_dims, cm_data) = self.expand(cm)?;
                if let Some(axes) = self.construct_axes(&cm_dims, &axis_keys) {
                    domain.cell_measures.push(CellMeasure {
                        ncvar: name,
                        measure,
                        axes,
                        properties: cm.attributes.clone(),
                        data: cm_data,
                    });
                }
            }
        }

        if let Some(value) = str_attr(var, "grid_mapping") {
            for name in grid_mapping_names(value) {
                let Some(gm) = self.group.variable(&name) else {
                    warn!("Grid mapping '{}' of '{}' not found", name, var.name);
                    continue;
                };
                let mut parameters = gm.attributes.clone();
                let mapping_name = parameters
                    .remove("grid_mapping_name")
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_else(|| name.clone());
                domain.coordinate_references.push(CoordinateReference::GridMapping {
                    ncvar: name,
                    name: mapping_name,
                    parameters,
                });
            }
        }

        for dim in &dims {
            let Some(coord_var) = self.coordinate_variable(dim) else {
                continue;
            };
            let Some(terms_attr) = str_attr(coord_var, "formula_terms") else {
                continue;
            };
            let mut terms = Vec::new();
            for (term, name) in keyed_pairs(terms_attr) {
                if domain.domain_ancillaries.iter().any(|a| a.ncvar == name) {
                    terms.push((term, name));
                    continue;
                }
                let Some(anc) = self.group.variable(&name) else {
                    warn!("Formula term '{}: {}' not found", term, name);
                    continue;
                };
                let (anc_dims, anc_data) = self.expand(anc)?;
                match self.construct_axes(&anc_dims, &axis_keys) {
                    Some(axes) => {
                        domain.domain_ancillaries.push(DomainAncillary {
                            ncvar: name.clone(),
                            axes,
                            properties: anc.attributes.clone(),
                            data: anc_data,
                        });
                        terms.push((term, name));
                    }
                    None => warn!("Formula term '{}' spans dimensions outside '{}'", name, var.name),
                }
            }
            let standard_name = str_attr(coord_var, "standard_name").unwrap_or(&coord_var.name).to_string();
            domain.coordinate_references.push(CoordinateReference::Formula {
                standard_name,
                coordinate: coord_var.name.clone(),
                terms,
            });
        }

        let mut field = Field::new(var.name.clone(), data, domain)?;
        field.properties = properties;
        if let Some(cm) = str_attr(var, "cell_methods") {
            field.cell_methods = CellMethod::parse_all(cm);
        }
        Ok(field)
    }
}

/// Build the field list of a flat (group-free) dataset.
pub fn decode(group: &GroupNode) -> Result<FieldList> {
    let decoder = Decoder::new(group)?;
    let referenced = decoder.referenced();
    let mut fields = FieldList::default();
    fields.global_attributes = group.attributes.clone();

    for var in group.variables.iter().filter(|v| !referenced.contains(&v.name)) {
        let field = decoder.field(var)?;
        debug!(field = %field, "decoded field");
        fields.push(field);
    }
    Ok(fields)
}
