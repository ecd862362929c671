//! netCDF-4 group hierarchies and their flattening into a single namespace.
//!
//! A [`GroupNode`] is a format-neutral copy of a file's structure. Flattening
//! renames every dimension and variable to its group path joined with `__`,
//! resolves CF variable references by lexical scoping and rewrites them to the
//! flat names.

use crate::errors::{CfKitError, Result};
use crate::model::{AttrValue, Properties};
use ndarray::ArrayD;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use tracing::{debug, warn};

/// Separator between group path components in flattened names
pub const FLAT_SEPARATOR: &str = "__";

/// Attributes whose values name other variables (keys ending in `:` are kept).
const VARIABLE_REFERENCE_ATTRIBUTES: &[&str] = &[
    "coordinates",
    "ancillary_variables",
    "bounds",
    "climatology",
    "cell_measures",
    "grid_mapping",
    "formula_terms",
    "geometry",
    "node_coordinates",
    "node_count",
    "part_node_count",
    "interior_ring",
];

/// Attributes whose values name dimensions.
const DIMENSION_REFERENCE_ATTRIBUTES: &[&str] =
    &["compress", "sample_dimension", "instance_dimension"];

#[derive(Debug, Clone, PartialEq)]
pub struct RawDimension {
    pub name: String,
    pub len: usize,
    pub unlimited: bool,
}

/// A variable as stored, before CF interpretation. Missing values are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct RawVariable {
    pub name: String,
    pub dimensions: Vec<String>,
    pub attributes: Properties,
    pub data: ArrayD<f64>,
}

/// One group of a (possibly hierarchical) dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupNode {
    pub name: String,
    pub attributes: Properties,
    pub dimensions: Vec<RawDimension>,
    pub variables: Vec<RawVariable>,
    pub groups: Vec<GroupNode>,
}

impl GroupNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn variable(&self, name: &str) -> Option<&RawVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn dimension(&self, name: &str) -> Option<&RawDimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn group(&self, name: &str) -> Option<&GroupNode> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn has_groups(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Follow a path of child group names from this group.
    pub fn descend(&self, path: &[String]) -> Option<&GroupNode> {
        path.iter().try_fold(self, |g, name| g.group(name))
    }

    /// Indented outline of the hierarchy: groups, dimensions and variables.
    pub fn tree_summary(&self) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, 0);
        out
    }

    fn write_tree(&self, out: &mut String, depth: usize) {
        let pad = "    ".repeat(depth);
        let name = if self.name.is_empty() { "/" } else { &self.name };
        let _ = writeln!(out, "{}group: {}", pad, name);
        for (key, value) in &self.attributes {
            let _ = writeln!(out, "{}    :{} = {}", pad, key, value);
        }
        for dim in &self.dimensions {
            let unlimited = if dim.unlimited { " (unlimited)" } else { "" };
            let _ = writeln!(out, "{}    dimension {} = {}{}", pad, dim.name, dim.len, unlimited);
        }
        for var in &self.variables {
            let _ = writeln!(out, "{}    variable {}({})", pad, var.name, var.dimensions.join(", "));
        }
        for group in &self.groups {
            group.write_tree(out, depth + 1);
        }
    }
}

fn flat_name(path: &[String], name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", path.join(FLAT_SEPARATOR), FLAT_SEPARATOR, name)
    }
}

fn absolute(path: &[String], name: &str) -> String {
    if path.is_empty() {
        format!("/{}", name)
    } else {
        format!("/{}/{}", path.join("/"), name)
    }
}

/// Resolve a possibly qualified name to (group path, bare name).
fn split_reference(current: &[String], reference: &str) -> (Vec<String>, String) {
    let parts: Vec<&str> = reference.split('/').collect();
    let (name, dirs) = match parts.split_last() {
        Some((name, dirs)) => (name.to_string(), dirs),
        None => (reference.to_string(), &[][..]),
    };
    let mut path: Vec<String> = if reference.starts_with('/') { Vec::new() } else { current.to_vec() };
    for dir in dirs {
        match *dir {
            "" | "." => {}
            ".." => {
                path.pop();
            }
            other => path.push(other.to_string()),
        }
    }
    (path, name)
}

struct Flattener<'a> {
    root: &'a GroupNode,
    out: GroupNode,
    variable_map: BTreeMap<String, String>,
    dimension_map: BTreeMap<String, String>,
    attribute_map: BTreeMap<String, String>,
    used: HashSet<String>,
}

impl<'a> Flattener<'a> {
    /// Find the group path holding `name`, searching `path` and then its
    /// ancestors. `dims` selects dimensions rather than variables.
    fn scope_lookup(&self, path: &[String], name: &str, dims: bool) -> Option<Vec<String>> {
        for depth in (0..=path.len()).rev() {
            let candidate = &path[..depth];
            let group = self.root.descend(candidate)?;
            let found = if dims {
                group.dimension(name).is_some()
            } else {
                group.variable(name).is_some()
            };
            if found {
                return Some(candidate.to_vec());
            }
        }
        None
    }

    fn resolve(&self, path: &[String], reference: &str, dims: bool) -> Option<String> {
        if reference.contains('/') {
            let (group_path, name) = split_reference(path, reference);
            let group = self.root.descend(&group_path)?;
            let exists = if dims {
                group.dimension(&name).is_some()
            } else {
                group.variable(&name).is_some()
            };
            return exists.then(|| flat_name(&group_path, &name));
        }
        self.scope_lookup(path, reference, dims)
            .map(|group_path| flat_name(&group_path, reference))
    }

    fn rewrite_references(&self, path: &[String], value: &str, dims: bool, var_name: &str) -> String {
        value
            .split_whitespace()
            .map(|token| {
                if token.ends_with(':') {
                    return token.to_string();
                }
                match self.resolve(path, token, dims) {
                    Some(flat) => flat,
                    None => {
                        warn!(
                            "Unresolved reference '{}' in {}; leaving it unchanged",
                            token,
                            absolute(path, var_name)
                        );
                        token.to_string()
                    }
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn claim(&mut self, name: &str) -> Result<()> {
        if !self.used.insert(name.to_string()) {
            return Err(CfKitError::Flatten(format!(
                "flattened name '{}' is not unique",
                name
            )));
        }
        Ok(())
    }

    fn visit(&mut self, group: &'a GroupNode, path: &[String]) -> Result<()> {
        for (key, value) in &group.attributes {
            if path.is_empty() {
                self.out.attributes.insert(key.clone(), value.clone());
            } else {
                let flat = flat_name(path, key);
                self.attribute_map.insert(flat.clone(), absolute(path, key));
                self.out.attributes.insert(flat, value.clone());
            }
        }

        for dim in &group.dimensions {
            let flat = flat_name(path, &dim.name);
            self.claim(&format!("dim:{}", flat))?;
            if !path.is_empty() {
                self.dimension_map.insert(flat.clone(), absolute(path, &dim.name));
            }
            self.out.dimensions.push(RawDimension {
                name: flat,
                len: dim.len,
                unlimited: dim.unlimited,
            });
        }

        for var in &group.variables {
            let flat = flat_name(path, &var.name);
            self.claim(&format!("var:{}", flat))?;
            if !path.is_empty() {
                self.variable_map.insert(flat.clone(), absolute(path, &var.name));
            }
            let dimensions = var
                .dimensions
                .iter()
                .map(|d| {
                    self.resolve(path, d, true).ok_or_else(|| {
                        CfKitError::Flatten(format!(
                            "dimension '{}' of {} is not defined in scope",
                            d,
                            absolute(path, &var.name)
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let mut attributes = var.attributes.clone();
            for (key, value) in attributes.iter_mut() {
                let dims = if VARIABLE_REFERENCE_ATTRIBUTES.contains(&key.as_str()) {
                    false
                } else if DIMENSION_REFERENCE_ATTRIBUTES.contains(&key.as_str()) {
                    true
                } else {
                    continue;
                };
                if let AttrValue::Str(s) = value {
                    *s = self.rewrite_references(path, s, dims, &var.name);
                }
            }

            self.out.variables.push(RawVariable {
                name: flat,
                dimensions,
                attributes,
                data: var.data.clone(),
            });
        }

        for child in &group.groups {
            let mut child_path = path.to_vec();
            child_path.push(child.name.clone());
            self.visit(child, &child_path)?;
        }
        Ok(())
    }
}

fn mapping_attribute(map: &BTreeMap<String, String>) -> AttrValue {
    AttrValue::Strs(map.iter().map(|(flat, full)| format!("{}: {}", flat, full)).collect())
}

/// Flatten a group hierarchy into a single namespace.
///
/// A tree without sub-groups is returned unchanged. Otherwise the name
/// mappings are recorded in the `__flattener_name_mapping_*` attributes.
pub fn flatten(root: &GroupNode) -> Result<GroupNode> {
    if !root.has_groups() {
        return Ok(root.clone());
    }
    let mut flattener = Flattener {
        root,
        out: GroupNode::new(root.name.clone()),
        variable_map: BTreeMap::new(),
        dimension_map: BTreeMap::new(),
        attribute_map: BTreeMap::new(),
        used: HashSet::new(),
    };
    flattener.visit(root, &[])?;

    let mut out = flattener.out;
    if !flattener.variable_map.is_empty() {
        out.attributes.insert(
            "__flattener_name_mapping_variables".to_string(),
            mapping_attribute(&flattener.variable_map),
        );
    }
    if !flattener.dimension_map.is_empty() {
        out.attributes.insert(
            "__flattener_name_mapping_dimensions".to_string(),
            mapping_attribute(&flattener.dimension_map),
        );
    }
    if !flattener.attribute_map.is_empty() {
        out.attributes.insert(
            "__flattener_name_mapping_attributes".to_string(),
            mapping_attribute(&flattener.attribute_map),
        );
    }
    debug!(
        variables = out.variables.len(),
        dimensions = out.dimensions.len(),
        "flattened group hierarchy"
    );
    Ok(out)
}
