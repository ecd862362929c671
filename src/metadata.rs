//! Field inspection: one-line listings, summaries, full dumps and JSON.

use crate::model::{CoordinateReference, Field, FieldList};
use serde_json::{json, Map, Value as JsonValue};
use std::fmt::Write as _;

fn array_preview<'a>(values: impl Iterator<Item = &'a f64>, len: usize) -> String {
    let shown: Vec<String> = values
        .take(if len > 6 { 3 } else { len })
        .map(|v| if v.is_nan() { "--".to_string() } else { format!("{}", v) })
        .collect();
    if len > 6 {
        format!("[{}, ...]", shown.join(", "))
    } else {
        format!("[{}]", shown.join(", "))
    }
}

/// Prints one line per field, e.g. `[0]: air_temperature(latitude(5), longitude(8)) K`.
pub fn print_field_list(fields: &FieldList) {
    println!("\n===== Fields ({}) =====", fields.len());
    if fields.is_empty() {
        println!("   (No fields found)");
    }
    for (i, field) in fields.iter().enumerate() {
        println!("[{}]: {}", i, field);
    }
}

/// Prints the dataset's global attributes.
pub fn print_global_attributes(fields: &FieldList) {
    println!("\n===== Global Attributes =====");
    if fields.global_attributes.is_empty() {
        println!("   (No global attributes)");
    }
    for (name, value) in &fields.global_attributes {
        println!("- {}: {}", name, value);
    }
}

/// The medium-detail description of a field: data, cell methods and constructs.
pub fn field_summary(field: &Field) -> String {
    let mut out = String::new();
    let title = format!("Field: {} (ncvar%{})", field.identity(), field.ncvar);
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "-".repeat(title.len()));
    let _ = writeln!(
        out,
        "Data            : {}({}) {}",
        field.identity(),
        field.axis_labels().join(", "),
        field.units().unwrap_or("")
    );
    if !field.cell_methods.is_empty() {
        let methods: Vec<String> = field.cell_methods.iter().map(|m| m.to_string()).collect();
        let _ = writeln!(out, "Cell methods    : {}", methods.join(" "));
    }

    let domain = &field.domain;
    for (i, coord) in domain.dimension_coordinates.iter().enumerate() {
        let label = if i == 0 { "Dimension coords: " } else { "                : " };
        let _ = writeln!(
            out,
            "{}{}({}) = {} {}",
            label,
            coord.identity(),
            coord.len(),
            array_preview(coord.values.iter(), coord.len()),
            coord.units().unwrap_or("")
        );
    }
    for (i, aux) in domain.auxiliary_coordinates.iter().enumerate() {
        let label = if i == 0 { "Auxiliary coords: " } else { "                : " };
        let _ = writeln!(
            out,
            "{}{}({}) = {}",
            label,
            aux.identity(),
            aux.data.shape().iter().map(|n| n.to_string()).collect::<Vec<_>>().join(", "),
            array_preview(aux.data.iter(), aux.data.len())
        );
    }
    for (i, cm) in domain.cell_measures.iter().enumerate() {
        let label = if i == 0 { "Cell measures   : " } else { "                : " };
        let _ = writeln!(out, "{}{} (ncvar%{})", label, cm.identity(), cm.ncvar);
    }
    for (i, reference) in domain.coordinate_references.iter().enumerate() {
        let label = if i == 0 { "Coord references: " } else { "                : " };
        let _ = writeln!(out, "{}{}", label, reference.identity());
    }
    for (i, anc) in domain.domain_ancillaries.iter().enumerate() {
        let label = if i == 0 { "Domain ancils   : " } else { "                : " };
        let _ = writeln!(out, "{}{}", label, anc.identity());
    }
    out
}

/// Full description of a field with every property of every construct.
pub fn dump_field(field: &Field) -> String {
    let mut out = String::new();
    let title = format!("Field: {}", field.identity());
    let _ = writeln!(out, "{}\n{}", title, "=".repeat(title.len()));
    let _ = writeln!(out, "netCDF variable: {}", field.ncvar);
    for (name, value) in &field.properties {
        let _ = writeln!(out, "{} = {}", name, value);
    }
    let shape: Vec<String> = field.shape().iter().map(|n| n.to_string()).collect();
    let _ = writeln!(
        out,
        "\nData({}) = {}",
        shape.join(", "),
        array_preview(field.data.iter(), field.size())
    );
    if let Some((lo, hi)) = field.data_range() {
        let _ = writeln!(out, "Data range: {} to {} ({} missing)", lo, hi, field.count_masked());
    }
    for method in &field.cell_methods {
        let _ = writeln!(out, "Cell Method: {}", method);
    }

    for axis in &field.domain.axes {
        let _ = writeln!(out, "\nDomain Axis: {} (ncdim%{}) size {}", axis.key, axis.ncdim, axis.size);
    }

    for coord in &field.domain.dimension_coordinates {
        let _ = writeln!(out, "\nDimension coordinate: {} [{}]", coord.identity(), coord.axis);
        for (name, value) in &coord.properties {
            let _ = writeln!(out, "    {} = {}", name, value);
        }
        let _ = writeln!(out, "    Data({}) = {}", coord.len(), array_preview(coord.values.iter(), coord.len()));
        if let Some(bounds) = &coord.bounds {
            let _ = writeln!(
                out,
                "    Bounds:Data({}, 2) = {}",
                bounds.nrows(),
                array_preview(bounds.iter(), bounds.len())
            );
        }
    }

    for aux in &field.domain.auxiliary_coordinates {
        let _ = writeln!(out, "\nAuxiliary coordinate: {} [{}]", aux.identity(), aux.axes.join(", "));
        for (name, value) in &aux.properties {
            let _ = writeln!(out, "    {} = {}", name, value);
        }
        let _ = writeln!(out, "    Data = {}", array_preview(aux.data.iter(), aux.data.len()));
    }

    for cm in &field.domain.cell_measures {
        let _ = writeln!(out, "\nCell measure: {} [{}]", cm.identity(), cm.axes.join(", "));
        for (name, value) in &cm.properties {
            let _ = writeln!(out, "    {} = {}", name, value);
        }
    }

    for reference in &field.domain.coordinate_references {
        let _ = writeln!(out, "\nCoordinate reference: {}", reference.identity());
        match reference {
            CoordinateReference::GridMapping { ncvar, parameters, .. } => {
                let _ = writeln!(out, "    ncvar%{}", ncvar);
                for (name, value) in parameters {
                    let _ = writeln!(out, "    {} = {}", name, value);
                }
            }
            CoordinateReference::Formula { coordinate, terms, .. } => {
                let _ = writeln!(out, "    Coordinate: {}", coordinate);
                for (term, ncvar) in terms {
                    let _ = writeln!(out, "    Domain ancillary: {} = {}", term, ncvar);
                }
            }
        }
    }

    for anc in &field.domain.domain_ancillaries {
        let _ = writeln!(out, "\nDomain ancillary: {} [{}]", anc.identity(), anc.axes.join(", "));
        for (name, value) in &anc.properties {
            let _ = writeln!(out, "    {} = {}", name, value);
        }
    }
    out
}

fn properties_json(properties: &crate::model::Properties) -> JsonValue {
    let map: Map<String, JsonValue> = properties
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    JsonValue::Object(map)
}

/// Structured metadata for a field, without its data values.
pub fn field_to_json(field: &Field) -> JsonValue {
    let domain = &field.domain;
    json!({
        "identity": field.identity(),
        "ncvar": field.ncvar,
        "shape": field.shape(),
        "units": field.units(),
        "properties": properties_json(&field.properties),
        "cell_methods": field.cell_methods.iter().map(|m| m.to_string()).collect::<Vec<_>>(),
        "domain_axes": domain.axes.iter().map(|a| json!({
            "key": a.key,
            "ncdim": a.ncdim,
            "size": a.size,
        })).collect::<Vec<_>>(),
        "dimension_coordinates": domain.dimension_coordinates.iter().map(|c| json!({
            "identity": c.identity(),
            "ncvar": c.ncvar,
            "axis": c.axis,
            "size": c.len(),
            "has_bounds": c.bounds.is_some(),
            "properties": properties_json(&c.properties),
        })).collect::<Vec<_>>(),
        "auxiliary_coordinates": domain.auxiliary_coordinates.iter().map(|c| json!({
            "identity": c.identity(),
            "ncvar": c.ncvar,
            "axes": c.axes,
        })).collect::<Vec<_>>(),
        "cell_measures": domain.cell_measures.iter().map(|c| json!({
            "measure": c.measure,
            "ncvar": c.ncvar,
            "axes": c.axes,
        })).collect::<Vec<_>>(),
        "coordinate_references": domain.coordinate_references.iter().map(|r| r.identity()).collect::<Vec<_>>(),
        "domain_ancillaries": domain.domain_ancillaries.iter().map(|a| a.identity()).collect::<Vec<_>>(),
    })
}

/// Every coordinate of a field with its first values and units, followed by
/// the identities of all its metadata constructs.
pub fn coordinates_report(field: &Field) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Coordinates of {}", field.identity());
    for coord in &field.domain.dimension_coordinates {
        let _ = writeln!(
            out,
            "    {} ({}): {} {}",
            coord.identity(),
            coord.len(),
            array_preview(coord.values.iter(), coord.len()),
            coord.units().unwrap_or("")
        );
    }
    for aux in &field.domain.auxiliary_coordinates {
        let _ = writeln!(
            out,
            "    {} (auxiliary): {}",
            aux.identity(),
            array_preview(aux.data.iter(), aux.data.len())
        );
    }
    let _ = writeln!(out, "Constructs: {}", field.domain.construct_identities().join(", "));
    out
}
