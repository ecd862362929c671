//! Laying out CF fields as netCDF dimensions, variables and attributes.
//!
//! Constructs shared by several fields (an identical latitude coordinate, say)
//! are written once. Constructs that differ but share a name get a numeric
//! suffix.

use crate::errors::Result;
use crate::flatten::{GroupNode, RawDimension, RawVariable};
use crate::model::{AttrValue, CellMethod, CoordinateReference, Field, FieldList, Properties};
use ndarray::{ArrayD, IxDyn};
use std::collections::HashMap;
use tracing::debug;

/// Name of the trailing dimension of bounds variables
pub const BOUNDS_DIMENSION: &str = "bnds";

/// Coordinate variables compare without `formula_terms`, which is patched in
/// after the first field using them is written.
fn same_coordinate(existing: &RawVariable, candidate: &RawVariable) -> bool {
    let strip = |attrs: &Properties| {
        let mut attrs = attrs.clone();
        attrs.remove("formula_terms");
        attrs
    };
    existing.dimensions == candidate.dimensions
        && existing.data == candidate.data
        && strip(&existing.attributes) == strip(&candidate.attributes)
}

/// What a formula coordinate reference points at: per term, the ancillary's
/// name, properties, data and dimension names. Coordinates are shared only
/// between fields whose formulas agree.
type FormulaSignature = Vec<(String, String, Properties, ArrayD<f64>, Vec<String>)>;

fn formula_signature(field: &Field, terms: &[(String, String)]) -> FormulaSignature {
    let ncdim = |key: &String| {
        field
            .domain
            .axes
            .iter()
            .find(|a| a.key == *key)
            .map(|a| a.ncdim.clone())
            .unwrap_or_else(|| key.clone())
    };
    terms
        .iter()
        .map(|(term, ncvar)| {
            match field.domain.domain_ancillaries.iter().find(|a| a.ncvar == *ncvar) {
                Some(anc) => (
                    term.clone(),
                    ncvar.clone(),
                    anc.properties.clone(),
                    anc.data.clone(),
                    anc.axes.iter().map(ncdim).collect(),
                ),
                None => (
                    term.clone(),
                    ncvar.clone(),
                    Properties::new(),
                    ArrayD::zeros(IxDyn(&[0])),
                    Vec::new(),
                ),
            }
        })
        .collect()
}

#[derive(Default)]
struct Encoder {
    out: GroupNode,
    formulas: HashMap<String, FormulaSignature>,
}

impl Encoder {
    fn dimension_len(&self, name: &str) -> Option<usize> {
        self.out.dimension(name).map(|d| d.len)
    }

    fn name_taken(&self, name: &str) -> bool {
        self.out.dimension(name).is_some() || self.out.variable(name).is_some()
    }

    fn unique_name(&self, base: &str) -> String {
        if !self.name_taken(base) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| !self.name_taken(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// A dimension of this length, reusing `base` when it already has it.
    fn dimension(&mut self, base: &str, len: usize) -> String {
        if self.dimension_len(base) == Some(len) {
            return base.to_string();
        }
        let name = self.unique_name(base);
        self.out.dimensions.push(RawDimension {
            name: name.clone(),
            len,
            unlimited: false,
        });
        name
    }

    /// Add a variable unless an identical one (same name, dimensions,
    /// attributes and data) exists. Returns the name used.
    fn variable(&mut self, var: RawVariable) -> String {
        if let Some(existing) = self.out.variable(&var.name) {
            if *existing == var {
                return var.name;
            }
        }
        let name = self.unique_name(&var.name);
        self.out.variables.push(RawVariable { name: name.clone(), ..var });
        name
    }

    /// Whether an already written coordinate carries these bounds.
    fn same_bounds(&self, existing: &RawVariable, bounds: Option<&ArrayD<f64>>) -> bool {
        let written = existing
            .attributes
            .get("bounds")
            .and_then(AttrValue::as_str)
            .and_then(|name| self.out.variable(name));
        match (written, bounds) {
            (Some(var), Some(b)) => var.data == *b,
            (None, None) => true,
            _ => false,
        }
    }

    /// A dimension together with its coordinate variable. The two share one
    /// name, so reuse happens only when both match.
    fn coordinate(
        &mut self,
        mut var: RawVariable,
        bounds: Option<ArrayD<f64>>,
        formula: Option<&FormulaSignature>,
    ) -> String {
        let len = var.data.len();
        let base = var.name.clone();
        let mut candidates = std::iter::once(base.clone()).chain((1..).map(|n| format!("{}_{}", base, n)));
        loop {
            let Some(name) = candidates.next() else {
                return base;
            };
            let bounds_var = bounds.as_ref().map(|b| RawVariable {
                name: format!("{}_{}", name, BOUNDS_DIMENSION),
                dimensions: vec![name.clone(), BOUNDS_DIMENSION.to_string()],
                attributes: Properties::new(),
                data: b.clone(),
            });
            var.dimensions = vec![name.clone()];
            match &bounds_var {
                Some(b) => var
                    .attributes
                    .insert("bounds".to_string(), AttrValue::Str(b.name.clone())),
                None => var.attributes.remove("bounds"),
            };
            let candidate = RawVariable {
                name: name.clone(),
                ..var.clone()
            };

            let existing_var = self.out.variable(&name);
            let existing_dim = self.dimension_len(&name);
            match (existing_var, existing_dim) {
                (Some(existing), Some(l))
                    if l == len
                        && same_coordinate(existing, &candidate)
                        && self.same_bounds(existing, bounds.as_ref())
                        && self.formulas.get(&name) == formula =>
                {
                    return name;
                }
                (None, None) => {
                    self.out.dimensions.push(RawDimension {
                        name: name.clone(),
                        len,
                        unlimited: false,
                    });
                    self.out.variables.push(candidate);
                    if let Some(f) = formula {
                        self.formulas.insert(name.clone(), f.clone());
                    }
                    if let Some(b) = bounds_var {
                        self.dimension(BOUNDS_DIMENSION, 2);
                        let written = self.variable(b);
                        if let Some(coord) = self.out.variables.iter_mut().find(|v| v.name == name) {
                            coord
                                .attributes
                                .insert("bounds".to_string(), AttrValue::Str(written));
                        }
                    }
                    return name;
                }
                _ => continue,
            }
        }
    }

    fn field(&mut self, field: &Field) -> Result<()> {
        let mut dim_names: HashMap<String, String> = HashMap::new();
        let mut ordered_dims = Vec::with_capacity(field.domain.axes.len());

        // formula_terms need the written names of their ancillaries first
        let mut ancillary_names: HashMap<String, String> = HashMap::new();
        let mut pending_ancillaries = Vec::new();

        for axis in &field.domain.axes {
            let name = match field.domain.dimension_coordinate(&axis.key) {
                Some(coord) => {
                    let mut attributes = coord.properties.clone();
                    let formula = field.domain.coordinate_references.iter().find_map(|r| match r {
                        CoordinateReference::Formula { coordinate, terms, .. } if *coordinate == coord.ncvar => {
                            Some(terms)
                        }
                        _ => None,
                    });
                    let signature = formula.map(|terms| formula_signature(field, terms));
                    if let Some(terms) = formula {
                        pending_ancillaries.push((coord.ncvar.clone(), terms.clone()));
                    }
                    attributes.remove("formula_terms");
                    let var = RawVariable {
                        name: coord.ncvar.clone(),
                        dimensions: Vec::new(),
                        attributes,
                        data: coord.values.clone().into_dyn(),
                    };
                    self.coordinate(
                        var,
                        coord.bounds.clone().map(|b| b.into_dyn()),
                        signature.as_ref(),
                    )
                }
                None => {
                    let base = if axis.ncdim.is_empty() { &axis.key } else { &axis.ncdim };
                    self.dimension(base, axis.size)
                }
            };
            dim_names.insert(axis.key.clone(), name.clone());
            ordered_dims.push(name);
        }

        let map_axes = |axes: &[String]| -> Vec<String> {
            axes.iter()
                .map(|a| dim_names.get(a).cloned().unwrap_or_else(|| a.clone()))
                .collect()
        };

        for anc in &field.domain.domain_ancillaries {
            let name = self.variable(RawVariable {
                name: anc.ncvar.clone(),
                dimensions: map_axes(&anc.axes),
                attributes: anc.properties.clone(),
                data: anc.data.clone(),
            });
            ancillary_names.insert(anc.ncvar.clone(), name);
        }
        for (coord_ncvar, terms) in pending_ancillaries {
            let value = terms
                .iter()
                .map(|(term, ncvar)| {
                    let written = ancillary_names.get(ncvar).unwrap_or(ncvar);
                    format!("{}: {}", term, written)
                })
                .collect::<Vec<_>>()
                .join(" ");
            let written_coord = field
                .domain
                .dimension_coordinates
                .iter()
                .find(|c| c.ncvar == coord_ncvar)
                .and_then(|c| dim_names.get(&c.axis));
            if let Some(var) = written_coord.and_then(|n| self.out.variables.iter_mut().find(|v| v.name == *n)) {
                var.attributes
                    .insert("formula_terms".to_string(), AttrValue::Str(value));
            }
        }

        let mut attributes = field.properties.clone();

        let aux_names: Vec<String> = field
            .domain
            .auxiliary_coordinates
            .iter()
            .map(|aux| {
                self.variable(RawVariable {
                    name: aux.ncvar.clone(),
                    dimensions: map_axes(&aux.axes),
                    attributes: aux.properties.clone(),
                    data: aux.data.clone(),
                })
            })
            .collect();
        if !aux_names.is_empty() {
            attributes.insert("coordinates".to_string(), AttrValue::Str(aux_names.join(" ")));
        }

        let measures: Vec<String> = field
            .domain
            .cell_measures
            .iter()
            .map(|cm| {
                let name = self.variable(RawVariable {
                    name: cm.ncvar.clone(),
                    dimensions: map_axes(&cm.axes),
                    attributes: cm.properties.clone(),
                    data: cm.data.clone(),
                });
                format!("{}: {}", cm.measure, name)
            })
            .collect();
        if !measures.is_empty() {
            attributes.insert("cell_measures".to_string(), AttrValue::Str(measures.join(" ")));
        }

        let grid_mappings: Vec<String> = field
            .domain
            .coordinate_references
            .iter()
            .filter_map(|r| match r {
                CoordinateReference::GridMapping { ncvar, name, parameters } => {
                    let mut attrs = parameters.clone();
                    attrs.insert("grid_mapping_name".to_string(), AttrValue::Str(name.clone()));
                    Some(self.variable(RawVariable {
                        name: ncvar.clone(),
                        dimensions: Vec::new(),
                        attributes: attrs,
                        data: ArrayD::zeros(IxDyn(&[])),
                    }))
                }
                CoordinateReference::Formula { .. } => None,
            })
            .collect();
        if !grid_mappings.is_empty() {
            attributes.insert("grid_mapping".to_string(), AttrValue::Str(grid_mappings.join(" ")));
        }

        if !field.cell_methods.is_empty() {
            attributes.insert(
                "cell_methods".to_string(),
                AttrValue::Str(CellMethod::format_all(&field.cell_methods)),
            );
        }

        let name = self.unique_name(&field.ncvar);
        self.out.variables.push(RawVariable {
            name,
            dimensions: ordered_dims,
            attributes,
            data: field.data.clone(),
        });
        Ok(())
    }
}

/// Lay out a field list as a flat group ready to be written.
pub fn encode(fields: &FieldList) -> Result<GroupNode> {
    let mut encoder = Encoder::default();
    encoder.out.attributes = fields.global_attributes.clone();
    encoder
        .out
        .attributes
        .entry("Conventions".to_string())
        .or_insert_with(|| AttrValue::Str("CF-1.11".to_string()));
    for field in fields.iter() {
        encoder.field(field)?;
    }
    debug!(
        dimensions = encoder.out.dimensions.len(),
        variables = encoder.out.variables.len(),
        "encoded field list"
    );
    Ok(encoder.out)
}
