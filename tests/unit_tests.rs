//! Unit tests for the cfkit modules
//!
//! These cover the in-memory data model and the operations on it; nothing
//! here touches the file system.

mod common;

use cfkit::cf_decode::{decode, keyed_pairs};
use cfkit::cf_encode::encode;
use cfkit::cli::{parse_grid, parse_index_range, parse_key_value, Cli, Command};
use cfkit::compression::{
    counts_from_f64, uncompress_contiguous_ragged, uncompress_gathered, uncompress_indexed_ragged,
};
use cfkit::config::Settings;
use cfkit::errors::CfKitError;
use cfkit::flatten::{flatten, GroupNode, RawDimension, RawVariable};
use cfkit::mask::WhereValue;
use cfkit::metadata::{coordinates_report, dump_field, field_summary, field_to_json};
use cfkit::model::{
    AttrValue, AxisKind, CellMethod, CoordinateReference, Domain, DomainAncillary, Field,
    FieldList, Properties,
};
use cfkit::netcdf_io::OutputFormat;
use cfkit::parallel::{get_parallel_info, ParallelConfig};
use cfkit::plot::{
    ascii_heatmap, ascii_line_plot, field_grid, render_heatmap, render_side_by_side, ColorPalette,
    PlotOptions, MISSING_COLOR,
};
use cfkit::query::Query;
use cfkit::statistics::CollapseMethod;
use cfkit::subspace::AxisSelection;
use clap::Parser;
use common::{temperature_field, temperature_value, NLAT, NLON, NT};
use ndarray::{array, ArrayD, IxDyn};
use serde_json::json;

fn props(pairs: &[(&str, &str)]) -> Properties {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), AttrValue::from(*v)))
        .collect()
}

#[test]
fn test_error_types() {
    let err = CfKitError::field_not_found("air_temperature");
    assert_eq!(format!("{}", err), "No field matches 'air_temperature'");

    let err = CfKitError::axis_not_found("ta", "Z");
    assert_eq!(format!("{}", err), "Axis 'Z' not found in field 'ta'");

    let err = CfKitError::construct_not_found("ta", "measure:volume");
    assert!(format!("{}", err).contains("Construct 'measure:volume' not found"));

    let err = CfKitError::Collapse("no axes given".to_string());
    assert_eq!(format!("{}", err), "Collapse error: no axes given");

    let err = CfKitError::invalid_subspace("empty");
    assert!(matches!(err, CfKitError::InvalidSubspace { .. }));
}

#[test]
fn test_parallel_config() {
    let default_config = ParallelConfig::default();
    assert!(default_config.num_threads.is_none());
    assert!(default_config.current_threads() > 0);

    let config_4 = ParallelConfig::with_threads(4);
    assert_eq!(config_4.num_threads, Some(4));

    let all_cores = ParallelConfig::all_cores();
    assert!(all_cores.num_threads.expect("all_cores sets a thread count") > 0);

    // Without a thread count the default pool is left alone
    default_config
        .setup_global_pool()
        .expect("Default pool setup should succeed");

    let zero = ParallelConfig::new(Some(0));
    assert!(matches!(zero.setup_global_pool(), Err(CfKitError::ThreadPool(_))));

    let info = get_parallel_info();
    assert!(info.current_threads > 0);
    assert!(info.available_cores > 0);
    assert!(info.to_string().starts_with("worker threads: "));
}

#[test]
fn test_settings_log_filter() {
    let quiet = Settings {
        quiet: true,
        verbose: true,
        ..Default::default()
    };
    assert_eq!(quiet.log_filter(Some("trace".to_string())), "error");

    let verbose = Settings {
        verbose: true,
        ..Default::default()
    };
    assert_eq!(verbose.log_filter(None), "debug");

    let plain = Settings::default();
    assert_eq!(plain.log_filter(Some("cfkit=warn".to_string())), "cfkit=warn");
    assert_eq!(plain.log_filter(Some("   ".to_string())), "info");
    assert_eq!(plain.log_filter(None), "info");
    assert_eq!(plain.format, OutputFormat::Netcdf4);
    assert_eq!(
        Settings {
            threads: Some(2),
            ..Default::default()
        }
        .parallel()
        .num_threads,
        Some(2)
    );
}

#[test]
fn test_identities_and_axis_kinds() {
    let field = temperature_field();
    assert_eq!(field.identity(), "air_temperature");
    assert!(field.matches("ta"));
    assert!(field.matches("ncvar%ta"));
    assert_eq!(
        format!("{}", field),
        "air_temperature(time(3), latitude(5), longitude(8)) K"
    );

    let unnamed = Field::new("x", ArrayD::zeros(IxDyn(&[])), Default::default())
        .expect("Failed to build scalar field");
    assert_eq!(unnamed.identity(), "ncvar%x");
    let described = unnamed.clone().with_property("long_name", "surface height");
    assert_eq!(described.identity(), "long_name=surface height");
    assert!(described.matches("surface height"));

    assert_eq!(AxisKind::infer(&props(&[("units", "degrees_north")])), Some(AxisKind::Y));
    assert_eq!(AxisKind::infer(&props(&[("units", "degrees_east")])), Some(AxisKind::X));
    assert_eq!(
        AxisKind::infer(&props(&[("units", "hours since 1970-01-01")])),
        Some(AxisKind::T)
    );
    assert_eq!(AxisKind::infer(&props(&[("positive", "up")])), Some(AxisKind::Z));
    assert_eq!(AxisKind::infer(&props(&[("axis", "x")])), Some(AxisKind::X));
    assert_eq!(AxisKind::infer(&props(&[("units", "K")])), None);
}

#[test]
fn test_field_axes_and_squeeze() {
    let field = temperature_field();
    assert_eq!(field.shape(), &[NT, NLAT, NLON]);
    assert_eq!(field.axis_index("time").expect("time axis"), 0);
    assert_eq!(field.axis_index("latitude").expect("latitude axis"), 1);
    assert_eq!(field.axis_index("Y").expect("Y axis"), 1);
    assert_eq!(field.axis_index("lon").expect("lon dimension"), 2);
    assert!(matches!(
        field.axis_index("Z"),
        Err(CfKitError::AxisNotFound { .. })
    ));

    let slice = field.subspace_range("time", 1, 2).expect("Failed to take one time step");
    assert_eq!(slice.shape(), &[1, NLAT, NLON]);
    let squeezed = slice.squeeze();
    assert_eq!(squeezed.shape(), &[NLAT, NLON]);
    assert_eq!(squeezed.domain.dimension_coordinates.len(), 2);
    assert_eq!(squeezed.value_at(&[2, 3]), Some(temperature_value(1, 2, 3)));

    assert!(field.domain.dimension_coordinates[2].is_cyclic());
    assert!(!field.domain.dimension_coordinates[1].is_cyclic());
    assert_eq!(field.data_range(), Some((280.0, temperature_value(2, 4, 7))));
}

#[test]
fn test_properties() {
    let mut field = temperature_field();
    field.set_property("comment", "made in a test");
    assert_eq!(field.property("comment").and_then(AttrValue::as_str), Some("made in a test"));
    assert_eq!(field.del_property("comment"), Some(AttrValue::from("made in a test")));
    assert_eq!(field.del_property("comment"), None);

    assert_eq!(AttrValue::parse_cli("3"), AttrValue::Int(3));
    assert_eq!(AttrValue::parse_cli("2.5"), AttrValue::Float(2.5));
    assert_eq!(AttrValue::parse_cli("K"), AttrValue::Str("K".to_string()));
    assert_eq!(AttrValue::Ints(vec![1, 2]).as_f64s(), vec![1.0, 2.0]);
    assert_eq!(AttrValue::Float(f64::NAN).to_json(), json!("NaN"));
}

#[test]
fn test_cell_methods() {
    let methods = CellMethod::parse_all("time: mean area: mean");
    assert_eq!(methods.len(), 2);
    assert_eq!(methods[0].names, vec!["time".to_string()]);
    assert_eq!(methods[0].method, "mean");
    assert_eq!(methods[1].names, vec!["area".to_string()]);

    let methods = CellMethod::parse_all("lat: lon: mean (interval: 1 day)");
    assert_eq!(methods.len(), 1);
    assert_eq!(methods[0].names, vec!["lat".to_string(), "lon".to_string()]);
    assert_eq!(methods[0].qualifiers.as_deref(), Some("(interval: 1 day)"));
    assert_eq!(CellMethod::format_all(&methods), "lat: lon: mean (interval: 1 day)");

    let climatology = CellMethod::parse_all("time: maximum within years time: mean over years");
    assert_eq!(climatology.len(), 2);
    assert_eq!(climatology[0].qualifiers.as_deref(), Some("within years"));
    assert_eq!(climatology[1].method, "mean");
}

fn three_fields() -> FieldList {
    let ta = temperature_field();
    let pr = temperature_field()
        .with_property("standard_name", "precipitation_flux")
        .with_property("units", "kg m-2 s-1");
    let mut orog = temperature_field().with_property("units", "m");
    orog.ncvar = "orog".to_string();
    orog.del_property("standard_name");
    orog.set_property("long_name", "orography");
    let mut pr = pr;
    pr.ncvar = "pr".to_string();
    FieldList::new(vec![ta, pr, orog])
}

#[test]
fn test_sort_by_mixed_property_values() {
    let values = [
        AttrValue::Float(10.0),
        AttrValue::Str("2".to_string()),
        AttrValue::Float(f64::NAN),
        AttrValue::Float(3.0),
        AttrValue::Floats(vec![]),
        AttrValue::Str("10".to_string()),
        AttrValue::Int(-1),
    ];
    let build = |order: &[usize]| -> FieldList {
        order
            .iter()
            .map(|&i| {
                let mut field = temperature_field();
                field.ncvar = format!("f{i}");
                field.set_property("level", values[i].clone());
                field
            })
            .chain(std::iter::once({
                let mut field = temperature_field();
                field.ncvar = "unset".to_string();
                field
            }))
            .collect()
    };

    let mut forward = build(&[0, 1, 2, 3, 4, 5, 6]);
    let mut backward = build(&[6, 5, 4, 3, 2, 1, 0]);
    forward.sort_by_property("level");
    backward.sort_by_property("level");

    let names = |fields: &FieldList| -> Vec<String> { fields.iter().map(|f| f.ncvar.clone()).collect() };
    assert_eq!(names(&forward)[..3], ["f6", "f3", "f0"]);
    assert_eq!(names(&forward)[5..], ["f5", "f1", "unset"]);
    assert_eq!(names(&backward)[..3], names(&forward)[..3]);
    assert_eq!(names(&backward)[5..], names(&forward)[5..]);
}

#[test]
fn test_field_list_sort_and_select() {
    let mut fields = three_fields();

    fields.sort_by_property("units");
    let order: Vec<&str> = fields.iter().map(|f| f.ncvar.as_str()).collect();
    assert_eq!(order, vec!["ta", "pr", "orog"]);

    fields.sort_by_identity();
    let order: Vec<String> = fields.iter().map(|f| f.identity()).collect();
    assert_eq!(
        order,
        vec!["air_temperature", "long_name=orography", "precipitation_flux"]
    );

    assert_eq!(fields.select_index("#1").expect("index selection"), 1);
    assert!(matches!(
        fields.select_index("#9"),
        Err(CfKitError::FieldNotFound { .. })
    ));
    assert_eq!(fields.select_field("~temp").expect("regex selection").ncvar, "ta");
    assert_eq!(fields.select_field("orography").expect("long_name").ncvar, "orog");
    assert!(matches!(
        fields.select_field("sea_ice_area"),
        Err(CfKitError::FieldNotFound { .. })
    ));
    assert!(matches!(
        fields.select_index("~^(air|precip)"),
        Err(CfKitError::InvalidQuery { .. })
    ));

    let matched = fields.select_by_regex("^(air|precip)").expect("valid regex");
    assert_eq!(matched.len(), 2);
    assert!(fields.select_by_regex("(").is_err());
    assert_eq!(fields.select_by_identity("precipitation_flux").len(), 1);
    assert_eq!(
        fields.select_by_property("units", &AttrValue::from("m")).len(),
        1
    );

    fields.set_global_attribute("title", "test run");
    assert_eq!(fields.global_attribute("title"), Some(&AttrValue::from("test run")));
    let selected = fields.select_by_ncvar("orog");
    assert_eq!(selected.global_attribute("title"), Some(&AttrValue::from("test run")));
    assert!(fields.del_global_attribute("title").is_some());
    assert!(fields.global_attribute("title").is_none());
}

#[test]
fn test_coordinate_reference_edits() {
    let mut field = common::annotated_temperature_field();
    let lat_key = field.domain.axes[1].key.clone();
    field.domain.domain_ancillaries.push(DomainAncillary {
        ncvar: "orog".to_string(),
        axes: vec![lat_key],
        properties: props(&[("standard_name", "surface_altitude")]),
        data: ArrayD::zeros(IxDyn(&[NLAT])),
    });
    field.set_coordinate_reference(CoordinateReference::Formula {
        standard_name: "atmosphere_hybrid_height_coordinate".to_string(),
        coordinate: "lev".to_string(),
        terms: vec![("orog".to_string(), "orog".to_string())],
    });
    assert_eq!(field.domain.coordinate_references.len(), 2);
    assert!(field.coordinate_reference("latitude_longitude").is_some());

    let removed = field
        .del_coordinate_reference("standard_name:atmosphere_hybrid_height_coordinate")
        .expect("Failed to delete formula reference");
    assert_eq!(removed.identity(), "standard_name:atmosphere_hybrid_height_coordinate");
    assert!(field.domain.domain_ancillaries.is_empty());

    field
        .del_coordinate_reference("crs")
        .expect("Failed to delete grid mapping");
    assert!(field.domain.coordinate_references.is_empty());
    assert!(matches!(
        field.del_coordinate_reference("crs"),
        Err(CfKitError::ConstructNotFound { .. })
    ));

    assert_eq!(field.del_construct("measure:area").expect("cell measure"), "areacella");
    assert!(field.domain.cell_measures.is_empty());
    assert!(field.del_construct("measure:area").is_err());
}

#[test]
fn test_query_parse() {
    assert_eq!(Query::parse("gt:280").expect("gt"), Query::Gt(280.0));
    assert_eq!(Query::parse("wi:-30:30").expect("wi"), Query::Wi(-30.0, 30.0));
    assert_eq!(
        Query::parse("set:1,2,3").expect("set"),
        Query::Set(vec![1.0, 2.0, 3.0])
    );
    assert_eq!(
        Query::parse("ge:0&lt:10").expect("and"),
        Query::Ge(0.0).and(Query::Lt(10.0))
    );
    assert_eq!(
        Query::parse("lt:-5|gt:5").expect("or"),
        Query::Lt(-5.0).or(Query::Gt(5.0))
    );

    for bad in ["", "gt", "gt:abc", "foo:1", "wi:30:-30", "wi:1"] {
        assert!(
            matches!(Query::parse(bad), Err(CfKitError::InvalidQuery { .. })),
            "'{}' should not parse",
            bad
        );
    }
}

#[test]
fn test_query_evaluate() {
    assert!(Query::Gt(280.0).evaluate(281.0));
    assert!(!Query::Gt(280.0).evaluate(280.0));
    assert!(Query::Wi(-30.0, 30.0).evaluate(30.0));
    assert!(Query::Wo(-30.0, 30.0).evaluate(31.0));
    assert!(Query::Eq(0.1 + 0.2).evaluate(0.3));
    assert!(Query::Set(vec![1.0, 2.0]).evaluate(2.0));
    assert!(!Query::Set(vec![1.0, 2.0]).evaluate(3.0));

    // missing values never satisfy a condition
    assert!(!Query::Ne(1.0).evaluate(f64::NAN));
    assert!(!Query::Wo(0.0, 1.0).evaluate(f64::NAN));

    let wi = Query::Wi(-90.0, 90.0);
    assert_eq!(wi.evaluate_cyclic(292.5, 360.0), Some(-67.5));
    assert_eq!(wi.evaluate_cyclic(22.5, 360.0), Some(22.5));
    assert_eq!(wi.evaluate_cyclic(112.5, 360.0), None);
    assert_eq!(Query::Gt(0.0).evaluate_cyclic(10.0, 360.0), None);
}

#[test]
fn test_where_and_masking() {
    let field = temperature_field();
    let condition = Query::Gt(300.0);
    let expected = field.data.iter().filter(|v| **v > 300.0).count();
    assert!(expected > 0);

    let masked = field.mask_where(&condition);
    assert_eq!(masked.count_masked(), expected);
    assert_eq!(masked.shape(), field.shape());
    assert_eq!(masked.value_at(&[0, 0, 0]), Some(280.0));

    let replaced = field.where_data(&condition, WhereValue::Value(0.0));
    assert_eq!(replaced.count_masked(), 0);
    assert_eq!(replaced.data.iter().filter(|v| **v == 0.0).count(), expected);

    let southern = field
        .where_coordinate("latitude", &Query::Lt(0.0), WhereValue::Masked)
        .expect("Failed to mask by latitude");
    assert_eq!(southern.count_masked(), NT * 2 * NLON);
    assert!(southern.value_at(&[0, 1, 0]).expect("in range").is_nan());
    assert!(!southern.value_at(&[0, 2, 0]).expect("in range").is_nan());

    let by_other = field
        .where_field(&field, &Query::Lt(281.0), WhereValue::Masked)
        .expect("Failed to mask by another field");
    assert_eq!(by_other.count_masked(), field.data.iter().filter(|v| **v < 281.0).count());

    let slice = field.subspace_range("time", 0, 1).expect("one time step");
    assert!(field.where_field(&slice, &condition, WhereValue::Masked).is_err());

    let limited = field.clone().with_property("valid_max", 300.0);
    assert_eq!(limited.mask_invalid().count_masked(), expected);
    let ranged = field.with_property("valid_range", vec![285.0, 1000.0]);
    assert_eq!(
        ranged.mask_invalid().count_masked(),
        ranged.data.iter().filter(|v| **v < 285.0).count()
    );
}

#[test]
fn test_subspace_cyclic_longitude() {
    let field = temperature_field();
    let selection = AxisSelection::parse("longitude=wi:-90:90").expect("Failed to parse selection");
    let west = field.subspace(&[selection]).expect("Failed to subspace");

    assert_eq!(west.shape(), &[NT, NLAT, 4]);
    let lon = &west.domain.dimension_coordinates[2];
    assert_eq!(lon.values.to_vec(), vec![-67.5, -22.5, 22.5, 67.5]);
    let bounds = lon.bounds.as_ref().expect("bounds are kept");
    assert_eq!(bounds.row(0).to_vec(), vec![-90.0, -45.0]);
    assert_eq!(bounds.row(3).to_vec(), vec![45.0, 90.0]);

    // -67.5 is the original 292.5, at index 6
    assert_eq!(west.value_at(&[1, 2, 0]), Some(temperature_value(1, 2, 6)));
    assert_eq!(west.value_at(&[1, 2, 2]), Some(temperature_value(1, 2, 0)));
}

#[test]
fn test_subspace_selections_and_ranges() {
    let field = temperature_field();

    let north = field
        .subspace(&[AxisSelection::new("latitude", Query::Ge(0.0))])
        .expect("Failed to select northern latitudes");
    assert_eq!(north.shape(), &[NT, 3, NLON]);
    assert_eq!(north.domain.dimension_coordinates[1].values.to_vec(), vec![0.0, 36.0, 72.0]);

    let both = field
        .subspace(&[
            AxisSelection::new("T", Query::Eq(45.0)),
            AxisSelection::new("X", Query::Set(vec![22.5, 337.5])),
        ])
        .expect("Failed to select on two axes");
    assert_eq!(both.shape(), &[1, NLAT, 2]);

    let empty = field.subspace(&[AxisSelection::new("latitude", Query::Gt(100.0))]);
    assert!(matches!(empty, Err(CfKitError::InvalidSubspace { .. })));
    assert!(AxisSelection::parse("latitude").is_err());

    let range = field.subspace_range("time", 0, 2).expect("valid range");
    assert_eq!(range.shape()[0], 2);
    assert!(field.subspace_range("time", 2, 2).is_err());
    assert!(field.subspace_range("time", 0, 9).is_err());

    let picked = field
        .subspace_indices("longitude", &[3, 1])
        .expect("Failed to pick longitudes");
    assert_eq!(
        picked.domain.dimension_coordinates[2].values.to_vec(),
        vec![157.5, 67.5]
    );
    assert!(field.subspace_indices("longitude", &[]).is_err());
    assert!(field.subspace_indices("longitude", &[8]).is_err());
}

#[test]
fn test_uncompress_gathered() {
    let compressed = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn();
    let out = uncompress_gathered(&compressed, 1, &[0, 4, 5], &[2, 3])
        .expect("Failed to uncompress gathered array");
    assert_eq!(out.shape(), &[2, 2, 3]);
    assert_eq!(out[[0, 0, 0]], 1.0);
    assert_eq!(out[[0, 1, 1]], 2.0);
    assert_eq!(out[[1, 1, 2]], 6.0);
    assert!(out[[0, 0, 1]].is_nan());
    assert_eq!(out.iter().filter(|v| v.is_nan()).count(), 6);

    assert!(uncompress_gathered(&compressed, 1, &[0, 1], &[2, 3]).is_err());
    assert!(uncompress_gathered(&compressed, 1, &[0, 1, 6], &[2, 3]).is_err());
    assert!(uncompress_gathered(&compressed, 2, &[0, 1, 2], &[2, 3]).is_err());
}

#[test]
fn test_uncompress_ragged() {
    let contiguous = uncompress_contiguous_ragged(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[1, 3, 2])
        .expect("Failed to uncompress contiguous ragged array");
    assert_eq!(contiguous.dim(), (3, 3));
    assert_eq!(contiguous.row(1).to_vec(), vec![2.0, 3.0, 4.0]);
    assert_eq!(contiguous[[2, 1]], 6.0);
    assert!(contiguous[[0, 1]].is_nan());
    assert!(uncompress_contiguous_ragged(&[1.0, 2.0], &[1, 3]).is_err());

    let indexed = uncompress_indexed_ragged(&[10.0, 20.0, 30.0, 40.0], &[1, 0, 1, 2], 3)
        .expect("Failed to uncompress indexed ragged array");
    assert_eq!(indexed.dim(), (3, 2));
    assert_eq!(indexed[[0, 0]], 20.0);
    assert_eq!(indexed.row(1).to_vec(), vec![10.0, 30.0]);
    assert_eq!(indexed[[2, 0]], 40.0);
    assert!(indexed[[2, 1]].is_nan());
    assert!(uncompress_indexed_ragged(&[1.0], &[3], 3).is_err());

    assert_eq!(counts_from_f64(&[3.0, 0.0]).expect("valid counts"), vec![3, 0]);
    assert!(counts_from_f64(&[1.5]).is_err());
    assert!(counts_from_f64(&[-1.0]).is_err());
}

fn variable(name: &str, dims: &[&str], attributes: &[(&str, &str)], data: ArrayD<f64>) -> RawVariable {
    RawVariable {
        name: name.to_string(),
        dimensions: dims.iter().map(|d| d.to_string()).collect(),
        attributes: props(attributes),
        data,
    }
}

fn dimension(name: &str, len: usize) -> RawDimension {
    RawDimension {
        name: name.to_string(),
        len,
        unlimited: false,
    }
}

/// `/` holds `lat`, `/forecast` holds `lon`, `height` and `area`, and
/// `/forecast/surface` holds the data variable.
fn grouped_tree() -> GroupNode {
    let mut root = GroupNode::new("");
    root.attributes.insert("Conventions".to_string(), "CF-1.11".into());
    root.dimensions.push(dimension("lat", 2));
    root.variables.push(variable(
        "lat",
        &["lat"],
        &[("standard_name", "latitude"), ("units", "degrees_north")],
        array![-45.0, 45.0].into_dyn(),
    ));

    let mut forecast = GroupNode::new("forecast");
    forecast.attributes.insert("model".to_string(), "sample-model-1".into());
    forecast.dimensions.push(dimension("lon", 3));
    forecast.variables.push(variable(
        "lon",
        &["lon"],
        &[("standard_name", "longitude"), ("units", "degrees_east")],
        array![0.0, 120.0, 240.0].into_dyn(),
    ));
    forecast.variables.push(variable(
        "height",
        &[],
        &[("standard_name", "height"), ("units", "m")],
        ArrayD::from_elem(IxDyn(&[]), 2.0),
    ));
    forecast.variables.push(variable(
        "area",
        &["lat", "lon"],
        &[("standard_name", "cell_area"), ("units", "m2")],
        ArrayD::from_elem(IxDyn(&[2, 3]), 1.0),
    ));

    let mut surface = GroupNode::new("surface");
    surface.variables.push(variable(
        "ta",
        &["lat", "lon"],
        &[
            ("standard_name", "air_temperature"),
            ("units", "K"),
            ("coordinates", "../height"),
            ("cell_measures", "area: /forecast/area"),
        ],
        ArrayD::from_shape_fn(IxDyn(&[2, 3]), |idx| (idx[0] * 3 + idx[1]) as f64),
    ));
    forecast.groups.push(surface);
    root.groups.push(forecast);
    root
}

#[test]
fn test_flatten_names_and_references() {
    let tree = grouped_tree();
    assert!(tree.has_groups());
    let summary = tree.tree_summary();
    assert!(summary.starts_with("group: /"));
    assert!(summary.contains("    group: forecast"));
    assert!(summary.contains("        group: surface"));

    let flat = flatten(&tree).expect("Failed to flatten tree");
    assert!(!flat.has_groups());
    let names: Vec<&str> = flat.variables.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "lat",
            "forecast__lon",
            "forecast__height",
            "forecast__area",
            "forecast__surface__ta"
        ]
    );
    assert!(flat.dimension("forecast__lon").is_some());

    let ta = flat.variable("forecast__surface__ta").expect("flattened data variable");
    assert_eq!(ta.dimensions, vec!["lat".to_string(), "forecast__lon".to_string()]);
    assert_eq!(
        ta.attributes.get("coordinates"),
        Some(&AttrValue::from("forecast__height"))
    );
    assert_eq!(
        ta.attributes.get("cell_measures"),
        Some(&AttrValue::from("area: forecast__area"))
    );

    assert_eq!(
        flat.attributes.get("forecast__model"),
        Some(&AttrValue::from("sample-model-1"))
    );
    assert_eq!(flat.attributes.get("Conventions"), Some(&AttrValue::from("CF-1.11")));
    match flat.attributes.get("__flattener_name_mapping_variables") {
        Some(AttrValue::Strs(mapping)) => {
            assert!(mapping.contains(&"forecast__surface__ta: /forecast/surface/ta".to_string()));
        }
        other => panic!("unexpected variable mapping {:?}", other),
    }
    match flat.attributes.get("__flattener_name_mapping_dimensions") {
        Some(AttrValue::Strs(mapping)) => {
            assert_eq!(mapping, &vec!["forecast__lon: /forecast/lon".to_string()]);
        }
        other => panic!("unexpected dimension mapping {:?}", other),
    }
    assert!(flat.attributes.contains_key("__flattener_name_mapping_attributes"));
}

#[test]
fn test_flatten_edge_cases() {
    let mut plain = GroupNode::new("");
    plain.dimensions.push(dimension("x", 2));
    plain
        .variables
        .push(variable("v", &["x"], &[], array![1.0, 2.0].into_dyn()));
    assert_eq!(flatten(&plain).expect("flat tree"), plain);

    let mut broken = grouped_tree();
    broken.groups[0]
        .variables
        .push(variable("bad", &["nowhere"], &[], array![1.0].into_dyn()));
    assert!(matches!(flatten(&broken), Err(CfKitError::Flatten(_))));
}

#[test]
fn test_decode_flattened_tree() {
    let flat = flatten(&grouped_tree()).expect("Failed to flatten tree");
    let fields = decode(&flat).expect("Failed to decode fields");
    assert_eq!(fields.len(), 1);

    let ta = &fields.fields[0];
    assert_eq!(ta.identity(), "air_temperature");
    assert_eq!(ta.ncvar, "forecast__surface__ta");
    assert_eq!(ta.shape(), &[2, 3]);
    assert_eq!(ta.domain.dimension_coordinates.len(), 2);
    assert_eq!(ta.domain.auxiliary_coordinates.len(), 1);
    assert_eq!(ta.domain.auxiliary_coordinates[0].identity(), "height");
    assert!(ta.domain.auxiliary_coordinates[0].axes.is_empty());
    assert_eq!(ta.domain.cell_measures.len(), 1);
    assert_eq!(ta.domain.cell_measures[0].measure, "area");
    // structural attributes become constructs, not properties
    assert!(ta.property("coordinates").is_none());
    assert!(ta.property("cell_measures").is_none());
}

#[test]
fn test_keyed_pairs() {
    assert_eq!(
        keyed_pairs("a: var_a b: var_b orog: surf"),
        vec![
            ("a".to_string(), "var_a".to_string()),
            ("b".to_string(), "var_b".to_string()),
            ("orog".to_string(), "surf".to_string()),
        ]
    );
    assert!(keyed_pairs("dangling:").is_empty());
}

#[test]
fn test_encode_decode_in_memory() {
    let original = common::annotated_temperature_field();
    let flat = encode(&FieldList::new(vec![original.clone()])).expect("Failed to encode");

    assert_eq!(flat.attributes.get("Conventions"), Some(&AttrValue::from("CF-1.11")));
    let ta = flat.variable("ta").expect("data variable");
    assert_eq!(ta.attributes.get("cell_methods"), Some(&AttrValue::from("time: mean")));
    assert_eq!(
        ta.attributes.get("cell_measures"),
        Some(&AttrValue::from("area: areacella"))
    );
    assert_eq!(ta.attributes.get("grid_mapping"), Some(&AttrValue::from("crs")));
    let lat = flat.variable("lat").expect("latitude coordinate");
    assert_eq!(lat.attributes.get("bounds"), Some(&AttrValue::from("lat_bnds")));
    assert_eq!(
        flat.variable("lat_bnds").expect("latitude bounds").dimensions,
        vec!["lat".to_string(), "bnds".to_string()]
    );

    let decoded = decode(&flat).expect("Failed to decode");
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded.fields[0], original);
}

#[test]
fn test_encode_shares_and_renames() {
    let ta = temperature_field();
    let mut pr = temperature_field().with_property("standard_name", "precipitation_flux");
    pr.ncvar = "pr".to_string();

    let flat = encode(&FieldList::new(vec![ta.clone(), pr.clone()])).expect("Failed to encode");
    assert_eq!(flat.dimensions.len(), 4);
    assert_eq!(flat.variables.len(), 8);

    // a different latitude axis cannot share the name
    pr.domain.dimension_coordinates[1].values[0] = -80.0;
    let flat = encode(&FieldList::new(vec![ta.clone(), pr])).expect("Failed to encode");
    let pr_var = flat.variable("pr").expect("second field");
    assert_eq!(pr_var.dimensions[1], "lat_1");
    assert!(flat.variable("lat_1_bnds").is_some());

    // two fields with one netCDF name
    let flat = encode(&FieldList::new(vec![ta.clone(), ta])).expect("Failed to encode");
    assert!(flat.variable("ta").is_some());
    assert!(flat.variable("ta_1").is_some());
}

#[test]
fn test_encode_keeps_distinct_bounds() {
    let ta = temperature_field();
    let mut pr = temperature_field().with_property("standard_name", "precipitation_flux");
    pr.ncvar = "pr".to_string();
    // same latitude points, narrower cells
    let narrow = pr.domain.dimension_coordinates[1]
        .values
        .mapv(|lat| [lat - 1.0, lat + 1.0]);
    let narrow = ndarray::Array2::from_shape_fn((NLAT, 2), |(i, j)| narrow[i][j]);
    pr.domain.dimension_coordinates[1].bounds = Some(narrow.clone());

    let flat = encode(&FieldList::new(vec![ta.clone(), pr.clone()])).expect("Failed to encode");
    let pr_var = flat.variable("pr").expect("second field");
    assert_eq!(pr_var.dimensions[1], "lat_1");
    let lat_1 = flat.variable("lat_1").expect("second latitude");
    assert_eq!(lat_1.attributes.get("bounds"), Some(&AttrValue::from("lat_1_bnds")));

    let decoded = decode(&flat).expect("Failed to decode");
    let pr_back = decoded.select_field("precipitation_flux").expect("pr field");
    assert_eq!(pr_back.domain.dimension_coordinates[1].bounds, Some(narrow));
    let ta_back = decoded.select_field("air_temperature").expect("ta field");
    assert_eq!(
        ta_back.domain.dimension_coordinates[1].bounds,
        ta.domain.dimension_coordinates[1].bounds
    );
}

#[test]
fn test_metadata_reports() {
    let field = common::annotated_temperature_field();

    let summary = field_summary(&field);
    assert!(summary.starts_with("Field: air_temperature (ncvar%ta)"));
    assert!(summary.contains("Cell methods    : time: mean"));
    assert!(summary.contains("Dimension coords: time(3)"));
    assert!(summary.contains("Cell measures   : measure:area (ncvar%areacella)"));
    assert!(summary.contains("Coord references: grid_mapping_name:latitude_longitude"));

    let dump = dump_field(&field);
    assert!(dump.contains("netCDF variable: ta"));
    assert!(dump.contains("Domain Axis: domainaxis0 (ncdim%time) size 3"));
    assert!(dump.contains("Bounds:Data(5, 2)"));
    assert!(dump.contains("semi_major_axis = 6371000"));

    let value = field_to_json(&field);
    assert_eq!(value["identity"], json!("air_temperature"));
    assert_eq!(value["shape"], json!([NT, NLAT, NLON]));
    assert_eq!(value["units"], json!("K"));
    assert_eq!(value["cell_methods"], json!(["time: mean"]));
    assert_eq!(value["dimension_coordinates"][1]["identity"], json!("latitude"));
    assert_eq!(value["dimension_coordinates"][1]["has_bounds"], json!(true));
    assert_eq!(value["cell_measures"][0]["measure"], json!("area"));
}

fn first_time_step() -> Field {
    temperature_field()
        .subspace_range("time", 0, 1)
        .expect("Failed to take first time step")
}

#[test]
fn test_field_grid_orientation() {
    let grid = field_grid(&first_time_step()).expect("Failed to build grid");
    assert_eq!(grid.dim(), (NLAT, NLON));
    // northernmost row first
    assert_eq!(grid[[0, 0]], temperature_value(0, NLAT - 1, 0));
    assert_eq!(grid[[NLAT - 1, 0]], temperature_value(0, 0, 0));
    assert_eq!(grid[[NLAT - 1, NLON - 1]], temperature_value(0, 0, NLON - 1));

    assert!(matches!(field_grid(&temperature_field()), Err(CfKitError::Plot(_))));
}

#[test]
fn test_render_heatmap() {
    let mut field = first_time_step();
    field.data[[0, 0, 0]] = f64::NAN;
    let options = PlotOptions {
        palette: ColorPalette::BlueRed,
        scale: 2,
        range: None,
    };
    let image = render_heatmap(&field, &options).expect("Failed to render heat map");
    assert_eq!(image.width, NLON * 2);
    assert_eq!(image.height, NLAT * 2 + 8 + 12);
    assert_eq!(image.pixels.len(), image.width * image.height * 3);

    // the southern-most row is drawn at the bottom of the map
    assert_eq!(image.pixel(0, (NLAT - 1) * 2), Some(MISSING_COLOR));
    assert_eq!(image.pixel(1, (NLAT - 1) * 2 + 1), Some(MISSING_COLOR));
    assert_ne!(image.pixel(2, (NLAT - 1) * 2), Some(MISSING_COLOR));
    assert_eq!(image.pixel(image.width, 0), None);

    let ppm = image.to_ppm();
    let header = format!("P6\n{} {}\n255\n", image.width, image.height);
    assert!(ppm.starts_with(header.as_bytes()));
    assert_eq!(ppm.len(), header.len() + image.pixels.len());

    let auto = render_heatmap(&field, &PlotOptions::default()).expect("auto scale");
    assert_eq!(auto.width, NLON * 32);
}

#[test]
fn test_render_side_by_side() {
    let left = first_time_step();
    let right = left.subspace_range("longitude", 0, 4).expect("half the longitudes");
    let options = PlotOptions {
        scale: 3,
        ..Default::default()
    };
    let image = render_side_by_side(&left, &right, &options).expect("Failed to render comparison");
    assert_eq!(image.width, NLON * 3 + 16 + 4 * 3);
    assert_eq!(image.height, NLAT * 3 + 8 + 12);
}

#[test]
fn test_palettes() {
    assert_eq!("bwr".parse::<ColorPalette>().expect("alias"), ColorPalette::BlueRed);
    assert_eq!("Viridis".parse::<ColorPalette>().expect("name"), ColorPalette::Viridis);
    assert_eq!("spectral".parse::<ColorPalette>().expect("alias"), ColorPalette::Rainbow);
    assert!(matches!("jet".parse::<ColorPalette>(), Err(CfKitError::Plot(_))));
    assert_eq!(ColorPalette::Plasma.to_string(), "plasma");

    assert_eq!(ColorPalette::BlueRed.rgb(0.0), [0, 0, 255]);
    assert_eq!(ColorPalette::BlueRed.rgb(0.5), [255, 255, 255]);
    assert_eq!(ColorPalette::BlueRed.rgb(2.0), [255, 0, 0]);
    assert_eq!(ColorPalette::Viridis.rgb(0.0), [68, 1, 84]);
    assert_eq!(ColorPalette::Rainbow.rgb(0.0), [0, 0, 255]);
    assert_ne!(ColorPalette::Plasma.rgb(0.0), ColorPalette::Plasma.rgb(1.0));
}

#[test]
fn test_ascii_plots() {
    let text = ascii_heatmap(&first_time_step(), 72).expect("Failed to draw heat map");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "air_temperature [280.0000 .. 323.5000]");
    assert_eq!(lines.len(), 3);
    assert!(lines[1..].iter().all(|l| l.chars().count() == NLON));
    // top row is the warm north
    assert!(lines[1].contains('@'));

    let line = first_time_step()
        .subspace_range("latitude", 2, 3)
        .expect("one latitude");
    let text = ascii_line_plot(&line, 72, 10).expect("Failed to draw line plot");
    assert!(text.starts_with("air_temperature K"));
    assert_eq!(text.matches('*').count(), NLON);

    assert!(ascii_line_plot(&first_time_step(), 72, 10).is_err());
}

#[test]
fn test_plots_of_empty_fields() {
    // a zero-length unlimited dimension is valid in a file
    let mut domain = Domain::new();
    domain.add_axis("time", 0);
    domain.add_axis("station", 3);
    let empty = Field::new("obs", ArrayD::zeros(IxDyn(&[0, 3])), domain).expect("empty field");

    assert!(matches!(ascii_heatmap(&empty, 72), Err(CfKitError::Plot(_))));
    assert!(matches!(
        render_heatmap(&empty, &PlotOptions::default()),
        Err(CfKitError::Plot(_))
    ));

    let mut domain = Domain::new();
    domain.add_axis("time", 0);
    let empty_line = Field::new("obs", ArrayD::zeros(IxDyn(&[0])), domain).expect("empty field");
    assert!(matches!(ascii_line_plot(&empty_line, 72, 10), Err(CfKitError::Plot(_))));
}

#[test]
fn test_cli_value_parsers() {
    assert_eq!(
        parse_key_value("title=My run").expect("key=value"),
        ("title".to_string(), AttrValue::from("My run"))
    );
    assert_eq!(
        parse_key_value("realization=3").expect("integer value"),
        ("realization".to_string(), AttrValue::Int(3))
    );
    assert!(parse_key_value("=x").is_err());
    assert!(parse_key_value("no_equals").is_err());

    let range = parse_index_range("time=0:2").expect("index range");
    assert_eq!((range.axis.as_str(), range.start, range.end), ("time", 0, 2));
    assert!(parse_index_range("time=0").is_err());
    assert!(parse_index_range("time=a:2").is_err());

    assert_eq!(parse_grid("90x180").expect("grid"), (90, 180));
    assert_eq!(parse_grid("2X4").expect("upper-case separator"), (2, 4));
    assert!(parse_grid("0x3").is_err());
    assert!(parse_grid("abc").is_err());

    assert_eq!("nc3".parse::<OutputFormat>().expect("alias"), OutputFormat::Classic);
    assert!("zarr".parse::<OutputFormat>().is_err());
}

#[test]
fn test_cli_parsing() {
    let cli = Cli::try_parse_from([
        "cfkit", "-q", "collapse", "data.nc", "-a", "T,latitude", "-m", "max", "--weighted",
    ])
    .expect("Failed to parse collapse command");
    assert!(cli.quiet);
    match cli.command {
        Command::Collapse {
            axes,
            method,
            weighted,
            ddof,
            ..
        } => {
            assert_eq!(axes, vec!["T".to_string(), "latitude".to_string()]);
            assert_eq!(method, CollapseMethod::Max);
            assert!(weighted);
            assert_eq!(ddof, 1.0);
        }
        other => panic!("unexpected command {:?}", other),
    }

    let cli = Cli::try_parse_from([
        "cfkit", "regrid", "in.nc", "--grid", "3x6", "-m", "conservative", "--format", "classic",
    ])
    .expect("Failed to parse regrid command");
    assert_eq!(cli.settings().format, OutputFormat::Classic);
    assert!(matches!(cli.command, Command::Regrid { grid: Some((3, 6)), .. }));

    assert!(Cli::try_parse_from(["cfkit", "collapse", "data.nc", "-a", "T", "-m", "mode"]).is_err());
    assert!(Cli::try_parse_from(["cfkit", "plot", "data.nc", "--palette", "jet"]).is_err());

    let cli = Cli::try_parse_from(["cfkit", "dump", "data.nc", "--coords"])
        .expect("Failed to parse dump command");
    assert!(matches!(cli.command, Command::Dump { coords: true, .. }));
    assert!(Cli::try_parse_from(["cfkit", "dump", "data.nc", "--coords", "--json"]).is_err());
}

#[test]
fn test_coordinates_report() {
    let field = common::annotated_temperature_field();
    let report = coordinates_report(&field);
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines[0], "Coordinates of air_temperature");
    assert_eq!(lines[1], "    time (3): [15, 45, 75] days since 2000-01-01");
    assert_eq!(lines[2], "    latitude (5): [-72, -36, 0, 36, 72] degrees_north");
    assert!(lines[3].starts_with("    longitude (8): [22.5, 67.5, 112.5, ...]"));
    assert_eq!(
        lines[4],
        "Constructs: time, latitude, longitude, measure:area, grid_mapping_name:latitude_longitude"
    );
    assert_eq!(
        field.domain.construct_identities().len(),
        3 + field.domain.cell_measures.len() + field.domain.coordinate_references.len()
    );
}
