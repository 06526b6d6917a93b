//! Numeric literal parsing.
//!
//! Literals are whitespace- and/or comma-separated tokens. Parsing is pure
//! and unit-agnostic; callers scale the result through a
//! [`UnitContext`](crate::units::UnitContext).

use crate::error::BuildError;

/// Expected number of components in a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly one value.
    Scalar,
    /// Exactly `n` values.
    Vector(usize),
}

impl Arity {
    fn count(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vector(n) => n,
        }
    }
}

/// Split a literal into its tokens.
pub fn tokens(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
}

/// Parse every token of a literal as a finite float.
///
/// # Errors
///
/// Returns [`BuildError::Format`] if a token is not a finite number.
pub fn parse_float_list(s: &str) -> Result<Vec<f64>, BuildError> {
    tokens(s)
        .map(|t| match t.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(BuildError::format(format!("invalid number '{t}' in \"{s}\""))),
        })
        .collect()
}

/// Parse a literal with an exact number of components.
///
/// # Errors
///
/// Returns [`BuildError::Format`] on a bad token or a component count that
/// does not match `arity`.
pub fn parse_literal(s: &str, arity: Arity) -> Result<Vec<f64>, BuildError> {
    let values = parse_float_list(s)?;
    let expected = arity.count();
    if values.len() != expected {
        return Err(BuildError::format(format!(
            "expected {expected} value{}, got {}: \"{s}\"",
            if expected == 1 { "" } else { "s" },
            values.len()
        )));
    }
    Ok(values)
}

/// Parse a single value.
///
/// # Errors
///
/// See [`parse_literal`].
pub fn parse_scalar(s: &str) -> Result<f64, BuildError> {
    parse_literal(s, Arity::Scalar).map(|v| v[0])
}

/// Parse a fixed-size vector.
///
/// # Errors
///
/// See [`parse_literal`].
pub fn parse_vector<const N: usize>(s: &str) -> Result<[f64; N], BuildError> {
    let values = parse_literal(s, Arity::Vector(N))?;
    let mut out = [0.0; N];
    out.copy_from_slice(&values);
    Ok(out)
}

/// Parse an optional single value.
///
/// A missing or blank literal is `Ok(None)`.
///
/// # Errors
///
/// See [`parse_literal`].
pub fn parse_optional_scalar(s: Option<&str>) -> Result<Option<f64>, BuildError> {
    match s.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => parse_scalar(s).map(Some),
        None => Ok(None),
    }
}

/// Parse an optional list of values.
///
/// A missing or blank literal is `Ok(None)`.
///
/// # Errors
///
/// See [`parse_float_list`].
pub fn parse_optional_list(s: Option<&str>) -> Result<Option<Vec<f64>>, BuildError> {
    match s.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => parse_float_list(s).map(Some),
        None => Ok(None),
    }
}
