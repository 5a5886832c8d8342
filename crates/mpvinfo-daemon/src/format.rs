//! Property value formatting
//!
//! Turns a raw property value into the text shown for it, following the
//! property's [`PropertySpec`]:
//!
//! 1. Integer properties are parsed and rendered as a whole number
//! 2. The value is looked up in the replace map
//! 3. Values longer than `max_length` characters are shortened
//! 4. The result is substituted into the property template
//!
//! A replacement that maps to the empty string hides the property, skipping
//! steps 3 and 4.

use mpvinfo_config::{PropertySpec, ValueKind, VALUE_PLACEHOLDER};
use thiserror::Error;

/// Errors that can occur when formatting a property value
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// An integer property received a value that is not a number
    #[error("Property '{property}' expects a number, got '{value}'")]
    NotNumeric { property: String, value: String },
}

/// Outcome of formatting a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formatted {
    /// Text to display for the property
    Value(String),
    /// The property has nothing to display
    Absent,
}

impl Formatted {
    /// Text contributed to the status line; empty when absent
    pub fn into_display(self) -> String {
        match self {
            Formatted::Value(text) => text,
            Formatted::Absent => String::new(),
        }
    }
}

/// Format a raw value for display
pub fn format_value(spec: &PropertySpec, raw: &str) -> Result<Formatted, FormatError> {
    let value = match spec.kind {
        ValueKind::String => raw.to_string(),
        ValueKind::Integer if raw.is_empty() => return Ok(Formatted::Absent),
        ValueKind::Integer => coerce_integer(raw).ok_or_else(|| FormatError::NotNumeric {
            property: spec.name.clone(),
            value: raw.to_string(),
        })?,
    };

    let value = match spec.replace.get(&value) {
        Some(replacement) if replacement.is_empty() => return Ok(Formatted::Absent),
        Some(replacement) => replacement.clone(),
        None => value,
    };

    if value.is_empty() {
        return Ok(Formatted::Absent);
    }

    let value = shorten(&value, spec.max_length, &spec.shorten_marker);
    Ok(Formatted::Value(
        spec.template.replacen(VALUE_PLACEHOLDER, &value, 1),
    ))
}

/// Shorten `value` to `max_length` characters followed by `marker`
///
/// Values at or under the limit are returned unchanged.
pub fn shorten(value: &str, max_length: Option<usize>, marker: &str) -> String {
    match max_length {
        Some(max) if value.chars().count() > max => {
            let mut shortened: String = value.chars().take(max).collect();
            shortened.push_str(marker);
            shortened
        }
        _ => value.to_string(),
    }
}

/// Parse a number and render it as an integer, dropping any fraction
fn coerce_integer(raw: &str) -> Option<String> {
    let text = raw.trim();

    if let Ok(int) = text.parse::<i64>() {
        return Some(int.to_string());
    }

    let float: f64 = text.parse().ok()?;
    if !float.is_finite() {
        return None;
    }
    Some((float.trunc() as i64).to_string())
}
