//! Ordered collections of fields read from one dataset.

use super::attribute::{AttrValue, Properties};
use super::field::Field;
use crate::errors::{CfKitError, Result};
use regex::Regex;
use std::cmp::Ordering;

/// Fields from one file, together with the file's global attributes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldList {
    pub fields: Vec<Field>,
    pub global_attributes: Properties,
}

impl FieldList {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            global_attributes: Properties::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Stable sort by a property value. Fields without the property sort last;
    /// numbers compare numerically, everything else by its display form.
    pub fn sort_by_property(&mut self, key: &str) {
        self.fields.sort_by(|a, b| compare_property(a.property(key), b.property(key)));
    }

    /// Stable sort by identity.
    pub fn sort_by_identity(&mut self) {
        self.fields.sort_by_key(|f| f.identity());
    }

    /// Fields answering to `identity` (standard_name, long_name or netCDF name).
    pub fn select_by_identity(&self, identity: &str) -> FieldList {
        self.select(|f| f.matches(identity))
    }

    /// Fields whose identity matches a regular expression.
    pub fn select_by_regex(&self, pattern: &str) -> Result<FieldList> {
        let re = Regex::new(pattern)
            .map_err(|e| CfKitError::invalid_query(format!("bad pattern '{}': {}", pattern, e)))?;
        Ok(self.select(|f| re.is_match(&f.identity()) || re.is_match(&f.ncvar)))
    }

    pub fn select_by_ncvar(&self, ncvar: &str) -> FieldList {
        self.select(|f| f.ncvar == ncvar)
    }

    /// Fields whose property equals the given value.
    pub fn select_by_property(&self, key: &str, value: &AttrValue) -> FieldList {
        self.select(|f| f.property(key) == Some(value))
    }

    /// Fields satisfying a predicate. Global attributes are carried over.
    pub fn select<P>(&self, predicate: P) -> FieldList
    where
        P: Fn(&Field) -> bool,
    {
        FieldList {
            fields: self.fields.iter().filter(|f| predicate(f)).cloned().collect(),
            global_attributes: self.global_attributes.clone(),
        }
    }

    /// Position of the single field matching `identity`. A `~` prefix selects
    /// by regex, a `#n` identity selects by position.
    pub fn select_index(&self, identity: &str) -> Result<usize> {
        if let Some(index) = identity.strip_prefix('#') {
            let index: usize = index
                .parse()
                .map_err(|_| CfKitError::invalid_query(format!("bad field index '{}'", identity)))?;
            return if index < self.fields.len() {
                Ok(index)
            } else {
                Err(CfKitError::field_not_found(identity))
            };
        }
        let matched: Vec<usize> = if let Some(pattern) = identity.strip_prefix('~') {
            let re = Regex::new(pattern)
                .map_err(|e| CfKitError::invalid_query(format!("bad pattern '{}': {}", pattern, e)))?;
            (0..self.fields.len())
                .filter(|&i| re.is_match(&self.fields[i].identity()) || re.is_match(&self.fields[i].ncvar))
                .collect()
        } else {
            (0..self.fields.len())
                .filter(|&i| self.fields[i].matches(identity))
                .collect()
        };
        match matched.as_slice() {
            [] => Err(CfKitError::field_not_found(identity)),
            [index] => Ok(*index),
            many => Err(CfKitError::invalid_query(format!(
                "'{}' matches {} fields; be more specific",
                identity,
                many.len()
            ))),
        }
    }

    /// The single field matching `identity`.
    pub fn select_field(&self, identity: &str) -> Result<&Field> {
        let index = self.select_index(identity)?;
        Ok(&self.fields[index])
    }

    pub fn select_field_mut(&mut self, identity: &str) -> Result<&mut Field> {
        let index = self.select_index(identity)?;
        Ok(&mut self.fields[index])
    }

    pub fn global_attribute(&self, name: &str) -> Option<&AttrValue> {
        self.global_attributes.get(name)
    }

    pub fn set_global_attribute(&mut self, name: &str, value: impl Into<AttrValue>) {
        self.global_attributes.insert(name.to_string(), value.into());
    }

    pub fn del_global_attribute(&mut self, name: &str) -> Option<AttrValue> {
        self.global_attributes.remove(name)
    }
}

impl IntoIterator for FieldList {
    type Item = Field;
    type IntoIter = std::vec::IntoIter<Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl FromIterator<Field> for FieldList {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        FieldList::new(iter.into_iter().collect())
    }
}

fn compare_property(a: Option<&AttrValue>, b: Option<&AttrValue>) -> Ordering {
    // numbers first (NaN last among them), then text, then absent values
    fn rank(v: Option<&AttrValue>) -> u8 {
        match v {
            Some(AttrValue::Str(_) | AttrValue::Strs(_)) => 2,
            Some(v) => match v.as_f64() {
                Some(x) if !x.is_nan() => 0,
                _ => 1,
            },
            None => 3,
        }
    }
    match (rank(a), rank(b)) {
        (0, 0) => {
            let number = |v: Option<&AttrValue>| v.and_then(AttrValue::as_f64).unwrap_or(f64::INFINITY);
            number(a).total_cmp(&number(b))
        }
        (2, 2) => a.map(ToString::to_string).cmp(&b.map(ToString::to_string)),
        (ra, rb) => ra.cmp(&rb),
    }
}
