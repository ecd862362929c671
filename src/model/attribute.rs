//! Attribute values and property maps shared by fields, constructs and groups.

use netcdf::AttributeValue;
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;

/// Named attribute values, kept sorted by name.
pub type Properties = BTreeMap<String, AttrValue>;

/// A netCDF attribute value, widened to the types the CF model needs
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Strs(Vec<String>),
    Int(i64),
    Ints(Vec<i64>),
    Float(f64),
    Floats(Vec<f64>),
}

impl AttrValue {
    /// The value as a string slice, if it is a single string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The first numeric value, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(i) => Some(*i as f64),
            AttrValue::Float(f) => Some(*f),
            AttrValue::Ints(v) => v.first().map(|&i| i as f64),
            AttrValue::Floats(v) => v.first().copied(),
            AttrValue::Str(s) => s.trim().parse().ok(),
            AttrValue::Strs(_) => None,
        }
    }

    /// All numeric values, empty for strings.
    pub fn as_f64s(&self) -> Vec<f64> {
        match self {
            AttrValue::Int(i) => vec![*i as f64],
            AttrValue::Float(f) => vec![*f],
            AttrValue::Ints(v) => v.iter().map(|&i| i as f64).collect(),
            AttrValue::Floats(v) => v.clone(),
            _ => Vec::new(),
        }
    }

    /// Parse a command-line value: integers, then floats, then plain strings.
    pub fn parse_cli(s: &str) -> Self {
        if let Ok(i) = s.parse::<i64>() {
            AttrValue::Int(i)
        } else if let Ok(f) = s.parse::<f64>() {
            AttrValue::Float(f)
        } else {
            AttrValue::Str(s.to_string())
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            AttrValue::Str(s) => json!(s),
            AttrValue::Strs(v) => json!(v),
            AttrValue::Int(i) => json!(i),
            AttrValue::Ints(v) => json!(v),
            AttrValue::Float(f) if f.is_finite() => json!(f),
            AttrValue::Float(f) => json!(f.to_string()),
            AttrValue::Floats(v) => JsonValue::Array(
                v.iter()
                    .map(|f| if f.is_finite() { json!(f) } else { json!(f.to_string()) })
                    .collect(),
            ),
        }
    }

    /// Convert to the narrowest netCDF attribute type that holds the value.
    pub fn to_netcdf(&self) -> AttributeValue {
        match self {
            AttrValue::Str(s) => AttributeValue::Str(s.clone()),
            AttrValue::Strs(v) => AttributeValue::Strs(v.clone()),
            AttrValue::Int(i) => match i32::try_from(*i) {
                Ok(v) => AttributeValue::Int(v),
                Err(_) => AttributeValue::Double(*i as f64),
            },
            AttrValue::Ints(v) => {
                if v.iter().all(|&i| i32::try_from(i).is_ok()) {
                    AttributeValue::Ints(v.iter().map(|&i| i as i32).collect())
                } else {
                    AttributeValue::Doubles(v.iter().map(|&i| i as f64).collect())
                }
            }
            AttrValue::Float(f) => AttributeValue::Double(*f),
            AttrValue::Floats(v) => AttributeValue::Doubles(v.clone()),
        }
    }
}

impl From<AttributeValue> for AttrValue {
    fn from(value: AttributeValue) -> Self {
        fn ints<T: Into<i64> + Copy>(v: &[T]) -> AttrValue {
            AttrValue::Ints(v.iter().map(|&x| x.into()).collect())
        }
        match value {
            AttributeValue::Uchar(v) => AttrValue::Int(v.into()),
            AttributeValue::Schar(v) => AttrValue::Int(v.into()),
            AttributeValue::Ushort(v) => AttrValue::Int(v.into()),
            AttributeValue::Short(v) => AttrValue::Int(v.into()),
            AttributeValue::Uint(v) => AttrValue::Int(v.into()),
            AttributeValue::Int(v) => AttrValue::Int(v.into()),
            AttributeValue::Ulonglong(v) => AttrValue::Int(v as i64),
            AttributeValue::Longlong(v) => AttrValue::Int(v),
            AttributeValue::Float(v) => AttrValue::Float(v.into()),
            AttributeValue::Double(v) => AttrValue::Float(v),
            AttributeValue::Str(v) => AttrValue::Str(v),
            AttributeValue::Strs(v) => AttrValue::Strs(v),
            AttributeValue::Uchars(v) => ints(&v),
            AttributeValue::Schars(v) => ints(&v),
            AttributeValue::Ushorts(v) => ints(&v),
            AttributeValue::Shorts(v) => ints(&v),
            AttributeValue::Uints(v) => ints(&v),
            AttributeValue::Ints(v) => ints(&v),
            AttributeValue::Ulonglongs(v) => AttrValue::Ints(v.iter().map(|&x| x as i64).collect()),
            AttributeValue::Longlongs(v) => AttrValue::Ints(v),
            AttributeValue::Floats(v) => AttrValue::Floats(v.iter().map(|&x| x.into()).collect()),
            AttributeValue::Doubles(v) => AttrValue::Floats(v),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(value: Vec<f64>) -> Self {
        AttrValue::Floats(value)
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Str(s) => write!(f, "'{}'", s),
            AttrValue::Strs(v) => write!(f, "{:?}", v),
            AttrValue::Int(i) => write!(f, "{}", i),
            AttrValue::Ints(v) => write!(f, "{:?}", v),
            AttrValue::Float(x) => write!(f, "{}", x),
            AttrValue::Floats(v) => write!(f, "{:?}", v),
        }
    }
}

/// Look up a string property.
pub fn str_property<'a>(properties: &'a Properties, name: &str) -> Option<&'a str> {
    properties.get(name).and_then(AttrValue::as_str)
}
