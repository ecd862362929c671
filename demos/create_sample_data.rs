//! Creates sample CF netCDF files for trying out cfkit.
//!
//! Writes three files into the directory given as the first argument
//! (default `sample_data`):
//! - `sample.nc`: packed air temperature with bounds, cell methods, a cell
//!   measure and a grid mapping, plus a precipitation field
//! - `groups.nc`: the same kind of data arranged in netCDF-4 groups
//! - `ragged.nc`: station time series stored as a contiguous ragged array

use ndarray::{Array1, Array2, Array3};
use netcdf::create;
use std::path::{Path, PathBuf};

const NT: usize = 12;
const NLAT: usize = 5;
const NLON: usize = 8;

fn latitudes() -> Vec<f64> {
    (0..NLAT).map(|i| -72.0 + i as f64 * 36.0).collect()
}

fn longitudes() -> Vec<f64> {
    (0..NLON).map(|i| 22.5 + i as f64 * 45.0).collect()
}

fn temperature(t: usize, lat: f64, lon: f64) -> f64 {
    288.0 - 30.0 * (lat.to_radians().sin()).powi(2) + 5.0 * (lon.to_radians()).cos() + (t as f64 * 0.5).sin()
}

fn create_sample(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let mut file = create(path)?;
    file.add_attribute("Conventions", "CF-1.11")?;
    file.add_attribute("title", "Sample monthly surface climate")?;
    file.add_attribute("institution", "cfkit sample data")?;

    file.add_dimension("time", NT)?;
    file.add_dimension("lat", NLAT)?;
    file.add_dimension("lon", NLON)?;
    file.add_dimension("bnds", 2)?;

    {
        let mut time = file.add_variable::<f64>("time", &["time"])?;
        time.put_attribute("standard_name", "time")?;
        time.put_attribute("units", "days since 2023-01-01")?;
        time.put_attribute("calendar", "360_day")?;
        time.put_attribute("bounds", "time_bnds")?;
        let values = Array1::from_shape_fn(NT, |i| 15.0 + i as f64 * 30.0);
        time.put(values.view(), ..)?;
    }
    {
        let mut bounds = file.add_variable::<f64>("time_bnds", &["time", "bnds"])?;
        let values = Array2::from_shape_fn((NT, 2), |(i, j)| (i + j) as f64 * 30.0);
        bounds.put(values.view(), ..)?;
    }
    {
        let mut lat = file.add_variable::<f32>("lat", &["lat"])?;
        lat.put_attribute("standard_name", "latitude")?;
        lat.put_attribute("units", "degrees_north")?;
        lat.put_attribute("bounds", "lat_bnds")?;
        let values: Array1<f32> = latitudes().into_iter().map(|v| v as f32).collect();
        lat.put(values.view(), ..)?;
    }
    {
        let mut bounds = file.add_variable::<f64>("lat_bnds", &["lat", "bnds"])?;
        let values = Array2::from_shape_fn((NLAT, 2), |(i, j)| -90.0 + (i + j) as f64 * 36.0);
        bounds.put(values.view(), ..)?;
    }
    {
        let mut lon = file.add_variable::<f32>("lon", &["lon"])?;
        lon.put_attribute("standard_name", "longitude")?;
        lon.put_attribute("units", "degrees_east")?;
        lon.put_attribute("bounds", "lon_bnds")?;
        let values: Array1<f32> = longitudes().into_iter().map(|v| v as f32).collect();
        lon.put(values.view(), ..)?;
    }
    {
        let mut bounds = file.add_variable::<f64>("lon_bnds", &["lon", "bnds"])?;
        let values = Array2::from_shape_fn((NLON, 2), |(i, j)| (i + j) as f64 * 45.0);
        bounds.put(values.view(), ..)?;
    }
    {
        let mut area = file.add_variable::<f64>("cell_area", &["lat", "lon"])?;
        area.put_attribute("standard_name", "cell_area")?;
        area.put_attribute("units", "m2")?;
        let r2 = 6_371_000.0f64.powi(2);
        let values = Array2::from_shape_fn((NLAT, NLON), |(i, _)| {
            let lo = (-90.0 + i as f64 * 36.0).to_radians().sin();
            let hi = (-90.0 + (i + 1) as f64 * 36.0).to_radians().sin();
            r2 * 45.0f64.to_radians() * (hi - lo)
        });
        area.put(values.view(), ..)?;
    }
    {
        let mut crs = file.add_variable::<i32>("crs", &[])?;
        crs.put_attribute("grid_mapping_name", "latitude_longitude")?;
        crs.put_attribute("semi_major_axis", 6_371_000.0f64)?;
        crs.put_attribute("inverse_flattening", 0.0f64)?;
    }
    {
        // packed as short with a fill value in the south-west corner
        let mut ta = file.add_variable::<i16>("ta", &["time", "lat", "lon"])?;
        ta.put_attribute("standard_name", "air_temperature")?;
        ta.put_attribute("units", "K")?;
        ta.put_attribute("scale_factor", 0.01f32)?;
        ta.put_attribute("add_offset", 280.0f32)?;
        ta.put_attribute("_FillValue", -32767i16)?;
        ta.put_attribute("cell_methods", "time: mean area: mean")?;
        ta.put_attribute("cell_measures", "area: cell_area")?;
        ta.put_attribute("grid_mapping", "crs")?;
        let (lats, lons) = (latitudes(), longitudes());
        let values = Array3::from_shape_fn((NT, NLAT, NLON), |(t, y, x)| {
            if y == 0 && x == 0 {
                -32767
            } else {
                ((temperature(t, lats[y], lons[x]) - 280.0) / 0.01).round() as i16
            }
        });
        ta.put(values.view(), ..)?;
    }
    {
        let mut pr = file.add_variable::<f32>("pr", &["time", "lat", "lon"])?;
        pr.put_attribute("standard_name", "precipitation_flux")?;
        pr.put_attribute("units", "kg m-2 s-1")?;
        pr.put_attribute("cell_methods", "time: mean")?;
        let lats = latitudes();
        let values = Array3::from_shape_fn((NT, NLAT, NLON), |(t, y, _)| {
            (3e-5 * (lats[y].to_radians().cos()) * (1.0 + 0.2 * (t as f64).sin())) as f32
        });
        pr.put(values.view(), ..)?;
    }
    Ok(())
}

fn create_groups(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let mut file = create(path)?;
    file.add_attribute("Conventions", "CF-1.11")?;
    file.add_attribute("title", "Grouped sample")?;
    file.add_dimension("lat", NLAT)?;
    {
        let mut lat = file.add_variable::<f64>("lat", &["lat"])?;
        lat.put_attribute("standard_name", "latitude")?;
        lat.put_attribute("units", "degrees_north")?;
        lat.put(Array1::from(latitudes()).view(), ..)?;
    }

    let mut forecast = file.add_group("forecast")?;
    forecast.add_attribute("model", "sample-model-1")?;
    forecast.add_dimension("lon", NLON)?;
    {
        let mut lon = forecast.add_variable::<f64>("lon", &["lon"])?;
        lon.put_attribute("standard_name", "longitude")?;
        lon.put_attribute("units", "degrees_east")?;
        lon.put(Array1::from(longitudes()).view(), ..)?;
    }
    {
        let mut height = forecast.add_variable::<f64>("height", &[])?;
        height.put_attribute("standard_name", "height")?;
        height.put_attribute("units", "m")?;
        height.put(ndarray::arr0(2.0).view(), ..)?;
    }
    let mut surface = forecast.add_group("surface")?;
    {
        let mut ta = surface.add_variable::<f64>("ta", &["lat", "lon"])?;
        ta.put_attribute("standard_name", "air_temperature")?;
        ta.put_attribute("units", "K")?;
        ta.put_attribute("coordinates", "../height")?;
        let (lats, lons) = (latitudes(), longitudes());
        let values = Array2::from_shape_fn((NLAT, NLON), |(y, x)| temperature(0, lats[y], lons[x]));
        ta.put(values.view(), ..)?;
    }
    Ok(())
}

fn create_ragged(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let counts = [3i32, 5, 2];
    let total: usize = counts.iter().map(|&c| c as usize).sum();

    let mut file = create(path)?;
    file.add_attribute("Conventions", "CF-1.11")?;
    file.add_attribute("featureType", "timeSeries")?;
    file.add_dimension("station", counts.len())?;
    file.add_dimension("obs", total)?;
    {
        let mut row_size = file.add_variable::<i32>("row_size", &["station"])?;
        row_size.put_attribute("long_name", "number of observations per station")?;
        row_size.put_attribute("sample_dimension", "obs")?;
        row_size.put(Array1::from(counts.to_vec()).view(), ..)?;
    }
    {
        let mut lat = file.add_variable::<f64>("station_lat", &["station"])?;
        lat.put_attribute("standard_name", "latitude")?;
        lat.put_attribute("units", "degrees_north")?;
        lat.put(Array1::from(vec![51.5, 48.9, 40.4]).view(), ..)?;
    }
    {
        let mut time = file.add_variable::<f64>("time", &["obs"])?;
        time.put_attribute("standard_name", "time")?;
        time.put_attribute("units", "days since 2023-01-01")?;
        let values = Array1::from_shape_fn(total, |i| i as f64);
        time.put(values.view(), ..)?;
    }
    {
        let mut tas = file.add_variable::<f64>("tas", &["obs"])?;
        tas.put_attribute("standard_name", "air_temperature")?;
        tas.put_attribute("units", "K")?;
        tas.put_attribute("coordinates", "time station_lat")?;
        let values = Array1::from_shape_fn(total, |i| 280.0 + i as f64);
        tas.put(values.view(), ..)?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("sample_data"));
    std::fs::create_dir_all(&dir)?;

    for (name, build) in [
        ("sample.nc", create_sample as fn(&Path) -> Result<(), Box<dyn std::error::Error>>),
        ("groups.nc", create_groups),
        ("ragged.nc", create_ragged),
    ] {
        let path = dir.join(name);
        println!("🔨 Creating {}", path.display());
        build(&path)?;
    }

    println!("\n📋 Fields in sample.nc:");
    let fields = cfkit::netcdf_io::read(&dir.join("sample.nc"))?;
    for (i, field) in fields.iter().enumerate() {
        println!("[{}]: {}", i, field);
    }
    println!("\n💡 Tip: cfkit dump {} --field air_temperature", dir.join("sample.nc").display());
    Ok(())
}
