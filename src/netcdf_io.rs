//! NetCDF I/O: group trees in and out of files, and the read/write pipeline
//!
//! Reading walks every group into a [`GroupNode`], unpacking data
//! (`scale_factor`, `add_offset`) and turning missing values into NaN.
//! Writing does the reverse, giving NaN a `_FillValue`. Field lists go
//! through [`crate::cf_decode`] and [`crate::cf_encode`] on the way.

use crate::cf_decode::decode;
use crate::cf_encode::encode;
use crate::errors::{CfKitError, Result};
use crate::flatten::{flatten, GroupNode, RawDimension, RawVariable};
use crate::model::{AttrValue, FieldList};
use chrono::Utc;
use ndarray::{ArrayD, IxDyn};
use std::fmt;
use std::str::FromStr;
use std::{fs, path::Path};
use tracing::{debug, info, warn};

/// Default fill value for doubles, as used by the netCDF library
pub const DEFAULT_FILL_VALUE: f64 = 9.969_209_968_386_869e36;

/// On-disk format for written files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Netcdf4,
    Classic,
}

impl FromStr for OutputFormat {
    type Err = CfKitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "netcdf4" | "nc4" | "netcdf-4" => Ok(OutputFormat::Netcdf4),
            "classic" | "netcdf3" | "nc3" => Ok(OutputFormat::Classic),
            other => Err(CfKitError::invalid_query(format!("unknown output format '{}'", other))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Netcdf4 => "netcdf4",
            OutputFormat::Classic => "classic",
        })
    }
}

/// Read a dataset and interpret it as CF fields. Groups are flattened first.
pub fn read(path: &Path) -> Result<FieldList> {
    let tree = read_group_tree(path)?;
    let flat = flatten(&tree)?;
    let fields = decode(&flat)?;
    info!(path = %path.display(), fields = fields.len(), "read dataset");
    Ok(fields)
}

/// Write a field list, replacing any existing file.
pub fn write(fields: &FieldList, path: &Path, format: OutputFormat) -> Result<()> {
    let mut flat = encode(fields)?;
    append_history(&mut flat.attributes);
    write_group_tree(&flat, path, format)?;
    info!(path = %path.display(), fields = fields.len(), %format, "wrote dataset");
    Ok(())
}

/// Read a hierarchical file and write its flattened equivalent.
pub fn flatten_file(input: &Path, output: &Path, format: OutputFormat) -> Result<GroupNode> {
    let tree = read_group_tree(input)?;
    let mut flat = flatten(&tree)?;
    append_history(&mut flat.attributes);
    write_group_tree(&flat, output, format)?;
    Ok(flat)
}

fn append_history(attributes: &mut crate::model::Properties) {
    let entry = format!("{}: written by cfkit", Utc::now().to_rfc3339());
    let history = match attributes.get("history").and_then(AttrValue::as_str) {
        Some(previous) if !previous.is_empty() => format!("{}\n{}", previous, entry),
        _ => entry,
    };
    attributes.insert("history".to_string(), AttrValue::Str(history));
}

/// Read the whole group hierarchy of a file.
pub fn read_group_tree(path: &Path) -> Result<GroupNode> {
    let file = netcdf::open(path)?;
    let mut root = GroupNode::new("");

    for attr in file.attributes() {
        root.attributes
            .insert(attr.name().to_string(), AttrValue::from(attr.value()?));
    }
    for dim in file.dimensions() {
        root.dimensions.push(RawDimension {
            name: dim.name().to_string(),
            len: dim.len(),
            unlimited: dim.is_unlimited(),
        });
    }
    for var in file.variables() {
        if let Some(raw) = read_variable(&var)? {
            root.variables.push(raw);
        }
    }
    if let Ok(groups) = file.groups() {
        for group in groups {
            root.groups.push(read_group(&group)?);
        }
    }
    debug!(path = %path.display(), groups = root.groups.len(), "read group tree");
    Ok(root)
}

fn read_group(group: &netcdf::Group<'_>) -> Result<GroupNode> {
    let mut node = GroupNode::new(group.name().to_string());
    for attr in group.attributes() {
        node.attributes
            .insert(attr.name().to_string(), AttrValue::from(attr.value()?));
    }
    for dim in group.dimensions() {
        node.dimensions.push(RawDimension {
            name: dim.name().to_string(),
            len: dim.len(),
            unlimited: dim.is_unlimited(),
        });
    }
    for var in group.variables() {
        if let Some(raw) = read_variable(&var)? {
            node.variables.push(raw);
        }
    }
    for child in group.groups() {
        node.groups.push(read_group(&child)?);
    }
    Ok(node)
}

/// Read one variable as unpacked `f64` with NaN for missing values.
/// Non-numeric variables are skipped with a warning.
fn read_variable(var: &netcdf::Variable<'_>) -> Result<Option<RawVariable>> {
    let mut attributes = crate::model::Properties::new();
    for attr in var.attributes() {
        match attr.value() {
            Ok(value) => {
                attributes.insert(attr.name().to_string(), AttrValue::from(value));
            }
            Err(e) => warn!("Skipped unreadable attribute '{}' of '{}': {}", attr.name(), var.name(), e),
        }
    }

    let dimensions: Vec<String> = var.dimensions().iter().map(|d| d.name().to_string()).collect();
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

    let values = match var.get_values::<f64, _>(..) {
        Ok(values) => values,
        Err(e) => {
            warn!("Skipped non-numeric variable '{}': {}", var.name(), e);
            return Ok(None);
        }
    };

    let mut missing: Vec<f64> = Vec::new();
    for key in ["_FillValue", "missing_value"] {
        if let Some(value) = attributes.remove(key) {
            missing.extend(value.as_f64s());
        }
    }
    let scale = attributes.remove("scale_factor").and_then(|v| v.as_f64()).unwrap_or(1.0);
    let offset = attributes.remove("add_offset").and_then(|v| v.as_f64()).unwrap_or(0.0);

    let unpacked: Vec<f64> = values
        .into_iter()
        .map(|v| {
            if missing.iter().any(|&m| v == m || (m.abs() > 1e30 && (v - m).abs() <= m.abs() * 1e-6)) {
                f64::NAN
            } else {
                v * scale + offset
            }
        })
        .collect();

    let data = ArrayD::from_shape_vec(IxDyn(&shape), unpacked)?;
    Ok(Some(RawVariable {
        name: var.name().to_string(),
        dimensions,
        attributes,
        data,
    }))
}

/// Destination for dimensions, attributes and variables: a file or a group.
trait Sink {
    fn put_dimension(&mut self, dim: &RawDimension) -> Result<()>;
    fn put_global(&mut self, name: &str, value: netcdf::AttributeValue) -> Result<()>;
    fn put_variable(&mut self, var: &RawVariable, classic: bool) -> Result<()>;
}

macro_rules! impl_sink {
    ($ty:ty) => {
        impl Sink for $ty {
            fn put_dimension(&mut self, dim: &RawDimension) -> Result<()> {
                if dim.unlimited {
                    self.add_unlimited_dimension(&dim.name)?;
                } else {
                    self.add_dimension(&dim.name, dim.len)?;
                }
                Ok(())
            }

            fn put_global(&mut self, name: &str, value: netcdf::AttributeValue) -> Result<()> {
                self.add_attribute(name, value)?;
                Ok(())
            }

            fn put_variable(&mut self, var: &RawVariable, classic: bool) -> Result<()> {
                let dims: Vec<&str> = var.dimensions.iter().map(String::as_str).collect();
                let mut nc_var = self.add_variable::<f64>(&var.name, &dims)?;

                let has_missing = var.data.iter().any(|v| v.is_nan());
                let fill = var
                    .attributes
                    .get("_FillValue")
                    .and_then(AttrValue::as_f64)
                    .unwrap_or(DEFAULT_FILL_VALUE);
                if has_missing || var.attributes.contains_key("_FillValue") {
                    nc_var.put_attribute("_FillValue", fill)?;
                }
                for (name, value) in var.attributes.iter().filter(|(n, _)| *n != "_FillValue") {
                    nc_var.put_attribute(name, attribute_for_format(value, classic))?;
                }

                if var.data.is_empty() {
                    return Ok(());
                }
                let filled = var.data.mapv(|v| if v.is_nan() { fill } else { v });
                nc_var.put(filled.view(), ..)?;
                Ok(())
            }
        }
    };
}

impl_sink!(netcdf::FileMut);
impl_sink!(netcdf::GroupMut<'_>);

/// Classic files cannot hold string arrays; join them instead.
fn attribute_for_format(value: &AttrValue, classic: bool) -> netcdf::AttributeValue {
    match value {
        AttrValue::Strs(v) if classic => netcdf::AttributeValue::Str(v.join("\n")),
        other => other.to_netcdf(),
    }
}

fn write_contents<S: Sink>(sink: &mut S, node: &GroupNode, classic: bool) -> Result<()> {
    for dim in &node.dimensions {
        sink.put_dimension(dim)?;
    }
    for (name, value) in &node.attributes {
        sink.put_global(name, attribute_for_format(value, classic))?;
    }
    for var in &node.variables {
        sink.put_variable(var, classic)?;
    }
    Ok(())
}

fn write_subgroups(parent: &mut netcdf::GroupMut<'_>, node: &GroupNode) -> Result<()> {
    for child in &node.groups {
        let mut group = parent.add_group(&child.name)?;
        write_contents(&mut group, child, false)?;
        write_subgroups(&mut group, child)?;
    }
    Ok(())
}

/// Write a group tree to a new file, replacing any existing one.
/// Sub-groups need the netCDF-4 format.
pub fn write_group_tree(root: &GroupNode, path: &Path, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Classic && root.has_groups() {
        return Err(CfKitError::Flatten(
            "classic files cannot hold groups; flatten first".to_string(),
        ));
    }
    if path.exists() {
        fs::remove_file(path)?;
    }

    let mut file = match format {
        OutputFormat::Netcdf4 => netcdf::create(path)?,
        OutputFormat::Classic => netcdf::create_with(path, netcdf::Options::empty())?,
    };
    write_contents(&mut file, root, format == OutputFormat::Classic)?;
    for child in &root.groups {
        let mut group = file.add_group(&child.name)?;
        write_contents(&mut group, child, false)?;
        write_subgroups(&mut group, child)?;
    }
    debug!(path = %path.display(), %format, "wrote group tree");
    Ok(())
}
