use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{MalformedReason, SchemaResult};
use crate::types::{FieldDescriptor, StorageType};

/// Largest magnitude a single-precision float column can hold.
const FLOAT32_MAX: f64 = 3.4e38;
/// Decimal places beyond which single precision loses digits.
const FLOAT32_MAX_SCALE: u32 = 7;

/// Field type understood by the search service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchType {
    #[serde(rename = "string")]
    String,
    #[serde(rename = "int32")]
    Int32,
    #[serde(rename = "int64")]
    Int64,
    #[serde(rename = "float32")]
    Float32,
    #[serde(rename = "float64")]
    Float64,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "geopoint")]
    Geopoint,
    #[serde(rename = "object")]
    Object,
    #[serde(rename = "object[]")]
    ObjectArray,
}

impl SearchType {
    pub const fn as_str(self) -> &'static str {
        match self {
            SearchType::String => "string",
            SearchType::Int32 => "int32",
            SearchType::Int64 => "int64",
            SearchType::Float32 => "float32",
            SearchType::Float64 => "float64",
            SearchType::Bool => "bool",
            SearchType::Geopoint => "geopoint",
            SearchType::Object => "object",
            SearchType::ObjectArray => "object[]",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a scalar field to its search type. Primary keys are always strings.
pub fn map_type(field: &FieldDescriptor) -> SchemaResult<SearchType> {
    if field.primary_key {
        return Ok(SearchType::String);
    }
    let mapped = match field.storage {
        StorageType::Int8
        | StorageType::Int16
        | StorageType::Int32
        | StorageType::UInt8
        | StorageType::UInt16
        | StorageType::UInt32 => SearchType::Int32,
        StorageType::Int64 | StorageType::UInt64 => SearchType::Int64,
        StorageType::Boolean => SearchType::Bool,
        StorageType::Char
        | StorageType::Text
        | StorageType::Slug
        | StorageType::Email
        | StorageType::Url
        | StorageType::IpAddress
        | StorageType::Uuid
        | StorageType::FilePath
        | StorageType::Json => SearchType::String,
        StorageType::Date | StorageType::DateTime => SearchType::Int64,
        StorageType::Float => SearchType::Float32,
        StorageType::Decimal { precision, scale } => decimal_type(precision, scale),
        StorageType::Time
        | StorageType::Duration
        | StorageType::Binary
        | StorageType::File
        | StorageType::Image => {
            return Err(MalformedReason::UnsupportedType {
                field: field.key().to_string(),
                storage: field.storage.to_string(),
            }
            .into());
        }
    };
    Ok(mapped)
}

/// Picks the narrowest float able to hold every value of `decimal(precision, scale)`.
pub fn decimal_type(precision: u32, scale: u32) -> SearchType {
    if scale > FLOAT32_MAX_SCALE {
        return SearchType::Float64;
    }
    // `scale` is at most 7 here; an out-of-range digit count saturates to infinity.
    let integer_digits = i32::try_from(precision.saturating_sub(scale)).unwrap_or(i32::MAX);
    let max_value = 10f64.powi(integer_digits) - 10f64.powi(-(scale as i32));
    if max_value < FLOAT32_MAX {
        SearchType::Float32
    } else {
        SearchType::Float64
    }
}

pub fn is_sortable(field: &FieldDescriptor) -> bool {
    field.storage.is_sortable()
}
