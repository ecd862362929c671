//! Shared field builders for the integration tests
#![allow(dead_code)]

use cfkit::model::{
    AttrValue, CellMeasure, CellMethod, CoordinateReference, DimensionCoordinate, Domain, Field,
    Properties,
};
use ndarray::{arr2, Array1, ArrayD, IxDyn};

pub const NT: usize = 3;
pub const NLAT: usize = 5;
pub const NLON: usize = 8;

/// time(3) x latitude(5) x longitude(8), all with bounds. Longitudes cover
/// the full circle so the longitude axis is cyclic.
pub fn time_lat_lon_domain() -> Domain {
    let mut domain = Domain::new();
    domain.add_dimension_coordinate(
        DimensionCoordinate::new("time", "", Array1::from(vec![15.0, 45.0, 75.0]))
            .with_property("standard_name", "time")
            .with_property("units", "days since 2000-01-01")
            .with_bounds(arr2(&[[0.0, 30.0], [30.0, 60.0], [60.0, 90.0]])),
    );
    for coord in Domain::global_grid(NLAT, NLON).dimension_coordinates {
        domain.add_dimension_coordinate(coord);
    }
    domain
}

/// 280 + t + 10 * y + 0.5 * x
pub fn temperature_value(t: usize, y: usize, x: usize) -> f64 {
    280.0 + t as f64 + 10.0 * y as f64 + 0.5 * x as f64
}

pub fn temperature_field() -> Field {
    let data = ArrayD::from_shape_fn(IxDyn(&[NT, NLAT, NLON]), |idx| {
        temperature_value(idx[0], idx[1], idx[2])
    });
    Field::new("ta", data, time_lat_lon_domain())
        .expect("Failed to build temperature field")
        .with_property("standard_name", "air_temperature")
        .with_property("units", "K")
}

/// The temperature field with a cell method, an area cell measure and a
/// latitude-longitude grid mapping.
pub fn annotated_temperature_field() -> Field {
    let mut field = temperature_field();
    field.cell_methods = CellMethod::parse_all("time: mean");

    let lat_key = field.domain.axes[1].key.clone();
    let lon_key = field.domain.axes[2].key.clone();
    let mut area_properties = Properties::new();
    area_properties.insert("standard_name".to_string(), "cell_area".into());
    area_properties.insert("units".to_string(), "m2".into());
    field.domain.cell_measures.push(CellMeasure {
        ncvar: "areacella".to_string(),
        measure: "area".to_string(),
        axes: vec![lat_key, lon_key],
        properties: area_properties,
        data: ArrayD::from_shape_fn(IxDyn(&[NLAT, NLON]), |idx| 1.0e12 + idx[0] as f64),
    });

    let mut parameters = Properties::new();
    parameters.insert("semi_major_axis".to_string(), AttrValue::Float(6_371_000.0));
    field.domain.coordinate_references.push(CoordinateReference::GridMapping {
        ncvar: "crs".to_string(),
        name: "latitude_longitude".to_string(),
        parameters,
    });
    field
}

/// A field with the same grid as [`temperature_field`] and a single
/// time step of a constant value.
pub fn constant_lat_lon_field(value: f64) -> Field {
    let domain = Domain::global_grid(NLAT, NLON);
    let data = ArrayD::from_elem(IxDyn(&[NLAT, NLON]), value);
    Field::new("c", data, domain)
        .expect("Failed to build constant field")
        .with_property("long_name", "constant")
        .with_property("units", "1")
}

/// A 2-D latitude-longitude field with values varying in both directions.
pub fn wavy_lat_lon_field(nlat: usize, nlon: usize) -> Field {
    let domain = Domain::global_grid(nlat, nlon);
    let lats = domain.dimension_coordinates[0].values.clone();
    let lons = domain.dimension_coordinates[1].values.clone();
    let data = ArrayD::from_shape_fn(IxDyn(&[nlat, nlon]), |idx| {
        let lat = lats[idx[0]].to_radians();
        let lon = lons[idx[1]].to_radians();
        280.0 + 20.0 * lat.cos() + 5.0 * lon.sin()
    });
    Field::new("wavy", data, domain)
        .expect("Failed to build wavy field")
        .with_property("standard_name", "air_temperature")
        .with_property("units", "K")
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {} within {} of {}",
        actual,
        tolerance,
        expected
    );
}
