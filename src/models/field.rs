use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ConversionError, Result};

/// Semantic type of a schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Real,
    Integer,
    Date,
}

/// A raw cell converted to its column type.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Real(f64),
    Integer(i64),
    Date(NaiveDate),
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

impl FieldType {
    /// Convert a raw cell to this type.
    ///
    /// Text is passed through untouched, blank non-text cells become
    /// [`FieldValue::Null`] and anything else that does not parse is an error.
    pub fn coerce(self, raw: &str) -> Result<FieldValue> {
        let trimmed = raw.trim();

        match self {
            FieldType::Text => Ok(FieldValue::Text(raw.to_string())),
            _ if trimmed.is_empty() => Ok(FieldValue::Null),
            FieldType::Real => trimmed
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(FieldValue::Real)
                .ok_or_else(|| {
                    ConversionError::InvalidFormat(format!("Invalid real value: '{}'", raw))
                }),
            FieldType::Integer => parse_integer(trimmed).map(FieldValue::Integer).ok_or_else(|| {
                ConversionError::InvalidFormat(format!("Invalid integer value: '{}'", raw))
            }),
            FieldType::Date => DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .map(FieldValue::Date)
                .ok_or_else(|| {
                    ConversionError::InvalidFormat(format!("Invalid date value: '{}'", raw))
                }),
        }
    }
}

fn parse_integer(s: &str) -> Option<i64> {
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    // "12.0" style exports of whole numbers
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64)
        .map(|v| v as i64)
}

/// One column of the positional input layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FieldSpec {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub max_width: Option<u32>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType, max_width: Option<u32>) -> Self {
        Self {
            name: name.into(),
            field_type,
            max_width,
        }
    }

    pub fn text(name: impl Into<String>, max_width: u32) -> Self {
        Self::new(name, FieldType::Text, Some(max_width))
    }
}
