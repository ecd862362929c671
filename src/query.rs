//! Conditions on numeric values, used for masking and subspacing.

use crate::errors::{CfKitError, Result};
use std::fmt;

/// A condition evaluated against single values
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Eq(f64),
    Ne(f64),
    Lt(f64),
    Le(f64),
    Gt(f64),
    Ge(f64),
    /// Within the closed interval
    Wi(f64, f64),
    /// Outside the closed interval
    Wo(f64, f64),
    /// Equal to any member
    Set(Vec<f64>),
    And(Box<Query>, Box<Query>),
    Or(Box<Query>, Box<Query>),
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * b.abs().max(1.0)
}

impl Query {
    pub fn and(self, other: Query) -> Query {
        Query::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Query) -> Query {
        Query::Or(Box::new(self), Box::new(other))
    }

    /// Evaluate against a value. Missing values (NaN) never match.
    pub fn evaluate(&self, v: f64) -> bool {
        if v.is_nan() {
            return false;
        }
        match self {
            Query::Eq(x) => approx_eq(v, *x),
            Query::Ne(x) => !approx_eq(v, *x),
            Query::Lt(x) => v < *x,
            Query::Le(x) => v <= *x,
            Query::Gt(x) => v > *x,
            Query::Ge(x) => v >= *x,
            Query::Wi(lo, hi) => v >= *lo && v <= *hi,
            Query::Wo(lo, hi) => v < *lo || v > *hi,
            Query::Set(values) => values.iter().any(|x| approx_eq(v, *x)),
            Query::And(a, b) => a.evaluate(v) && b.evaluate(v),
            Query::Or(a, b) => a.evaluate(v) || b.evaluate(v),
        }
    }

    /// Evaluate against a cyclic coordinate value: true if any shift of `v` by
    /// a whole number of periods matches. Returns the matching shifted value.
    pub fn evaluate_cyclic(&self, v: f64, period: f64) -> Option<f64> {
        if v.is_nan() {
            return None;
        }
        let (lo, hi) = self.interval()?;
        let shift = ((lo - v) / period).ceil() * period;
        let shifted = v + shift;
        if shifted <= hi && self.evaluate(shifted) {
            Some(shifted)
        } else {
            None
        }
    }

    /// The bounded interval a query selects, when it has one.
    fn interval(&self) -> Option<(f64, f64)> {
        match self {
            Query::Eq(x) => Some((*x, *x)),
            Query::Wi(lo, hi) => Some((*lo, *hi)),
            Query::Set(values) if !values.is_empty() => {
                let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
                let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                Some((lo, hi))
            }
            Query::And(a, b) => {
                let (alo, ahi) = a.half_interval();
                let (blo, bhi) = b.half_interval();
                let (lo, hi) = (alo.max(blo), ahi.min(bhi));
                (lo.is_finite() && hi.is_finite()).then_some((lo, hi))
            }
            _ => None,
        }
    }

    fn half_interval(&self) -> (f64, f64) {
        match self {
            Query::Gt(x) | Query::Ge(x) => (*x, f64::INFINITY),
            Query::Lt(x) | Query::Le(x) => (f64::NEG_INFINITY, *x),
            other => other.interval().unwrap_or((f64::NEG_INFINITY, f64::INFINITY)),
        }
    }

    /// Parse `op:value[:value]`, with `&` and `|` combinators (`&` binds tighter).
    ///
    /// Examples: `gt:280`, `wi:-30:30`, `set:1,2,3`, `ge:0&lt:10`.
    pub fn parse(s: &str) -> Result<Query> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CfKitError::invalid_query("empty query"));
        }
        if let Some((left, right)) = s.split_once('|') {
            return Ok(Query::parse(left)?.or(Query::parse(right)?));
        }
        if let Some((left, right)) = s.split_once('&') {
            return Ok(Query::parse(left)?.and(Query::parse(right)?));
        }
        let (op, rest) = s
            .split_once(':')
            .ok_or_else(|| CfKitError::invalid_query(format!("expected 'op:value', got '{}'", s)))?;
        let number = |t: &str| -> Result<f64> {
            t.trim()
                .parse::<f64>()
                .map_err(|_| CfKitError::invalid_query(format!("'{}' is not a number", t)))
        };
        let pair = |t: &str| -> Result<(f64, f64)> {
            let (a, b) = t
                .split_once(':')
                .ok_or_else(|| CfKitError::invalid_query(format!("expected 'lo:hi', got '{}'", t)))?;
            let (lo, hi) = (number(a)?, number(b)?);
            if lo > hi {
                return Err(CfKitError::invalid_query(format!("interval {}:{} is reversed", lo, hi)));
            }
            Ok((lo, hi))
        };
        match op.trim().to_ascii_lowercase().as_str() {
            "eq" => Ok(Query::Eq(number(rest)?)),
            "ne" => Ok(Query::Ne(number(rest)?)),
            "lt" => Ok(Query::Lt(number(rest)?)),
            "le" => Ok(Query::Le(number(rest)?)),
            "gt" => Ok(Query::Gt(number(rest)?)),
            "ge" => Ok(Query::Ge(number(rest)?)),
            "wi" => pair(rest).map(|(lo, hi)| Query::Wi(lo, hi)),
            "wo" => pair(rest).map(|(lo, hi)| Query::Wo(lo, hi)),
            "set" => rest
                .split(',')
                .map(number)
                .collect::<Result<Vec<_>>>()
                .map(Query::Set),
            other => Err(CfKitError::invalid_query(format!("unknown operator '{}'", other))),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Eq(x) => write!(f, "eq {}", x),
            Query::Ne(x) => write!(f, "ne {}", x),
            Query::Lt(x) => write!(f, "lt {}", x),
            Query::Le(x) => write!(f, "le {}", x),
            Query::Gt(x) => write!(f, "gt {}", x),
            Query::Ge(x) => write!(f, "ge {}", x),
            Query::Wi(lo, hi) => write!(f, "wi ({}, {})", lo, hi),
            Query::Wo(lo, hi) => write!(f, "wo ({}, {})", lo, hi),
            Query::Set(v) => write!(f, "set {:?}", v),
            Query::And(a, b) => write!(f, "[{} & {}]", a, b),
            Query::Or(a, b) => write!(f, "[{} | {}]", a, b),
        }
    }
}
