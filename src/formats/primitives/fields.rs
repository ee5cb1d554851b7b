//! Field parsing utilities for map records.
//!
//! Every helper receives the raw field text and a field name, and reports
//! failures as [`GemError::MalformedRecord`] carrying that text. The caller
//! (the record parser) replaces the record text with the whole line.

use crate::error::{GemError, Result};
use std::str::FromStr;

/// Parses a required field with type conversion.
///
/// # Examples
///
/// ```
/// use gemtools::formats::primitives::fields::parse_required;
///
/// let position: u64 = parse_required("12345", "position")?;
/// assert_eq!(position, 12345);
/// assert!(parse_required::<u64>("12a", "position").is_err());
/// # Ok::<(), gemtools::GemError>(())
/// ```
pub fn parse_required<T: FromStr>(field: &str, field_name: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    field.parse().map_err(|e: T::Err| {
        GemError::malformed(field, format!("invalid {} '{}': {}", field_name, field, e))
    })
}

/// Parses an unsigned decimal number made only of ASCII digits.
///
/// `str::parse` accepts a leading `+`; map files never do.
pub fn parse_count(field: &str, field_name: &str) -> Result<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GemError::malformed(
            field,
            format!("{} '{}' is not a non-negative integer", field_name, field),
        ));
    }
    parse_required(field, field_name)
}

/// Splits a tab-delimited line, checking that the field count is one of `allowed`.
///
/// # Examples
///
/// ```
/// use gemtools::formats::primitives::fields::split_fields;
///
/// let fields = split_fields("a\tb\tc\td", &[4, 5])?;
/// assert_eq!(fields, vec!["a", "b", "c", "d"]);
/// assert!(split_fields("a\tb", &[4, 5]).is_err());
/// # Ok::<(), gemtools::GemError>(())
/// ```
pub fn split_fields<'a>(line: &'a str, allowed: &[usize]) -> Result<Vec<&'a str>> {
    let fields: Vec<&str> = line.split('\t').collect();
    if !allowed.contains(&fields.len()) {
        let expected = allowed
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        return Err(GemError::malformed(
            line,
            format!("expected {} fields, found {}", expected, fields.len()),
        ));
    }
    Ok(fields)
}
