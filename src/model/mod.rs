//! In-memory CF data model
//!
//! A [`FieldList`] holds [`Field`]s; each field couples an N-D data array with a
//! [`Domain`] made of domain axes and metadata constructs (dimension and
//! auxiliary coordinates, cell measures, coordinate references and domain
//! ancillaries). Nothing here touches netCDF files; see [`crate::netcdf_io`].

pub mod attribute;
pub mod cell_method;
pub mod constructs;
pub mod domain;
pub mod field;
pub mod field_list;

pub use attribute::{AttrValue, Properties};
pub use cell_method::CellMethod;
pub use constructs::{
    AuxiliaryCoordinate, AxisKind, CellMeasure, CoordinateReference, DimensionCoordinate,
    DomainAncillary, DomainAxis,
};
pub use domain::Domain;
pub use field::Field;
pub use field_list::FieldList;
