//! MySQL type mappings.
//!
//! Two directions are covered here:
//! 1. Native column type strings reported by `SHOW FULL COLUMNS`
//!    (e.g. `int(11) unsigned`, `enum('a','b')`) are parsed and mapped to a
//!    canonical `ColumnType`, with size/precision/scale or enum values.
//! 2. Result-set values are decoded from sqlx rows into `DbValue`, using a
//!    `TypeCategory` computed from the wire type name.

use crate::models::{ColumnType, DbValue};
use regex::Regex;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Decode, Type, TypeInfo};
use std::sync::LazyLock;

// =============================================================================
// Native Type Mapping
// =============================================================================

static DB_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)(?:\(([^)]+)\))?").expect("valid db type regex"));

static ENUM_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'[^']*'").expect("valid enum value regex"));

static CURRENT_TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^current_timestamp(?:\((\d*)\))?$").expect("valid current_timestamp regex")
});

/// Map a lower-case MySQL base type to its canonical type.
pub fn canonical_type(base: &str) -> Option<ColumnType> {
    let column_type = match base {
        "tinyint" => ColumnType::TinyInt,
        "bit" => ColumnType::Integer,
        "smallint" => ColumnType::SmallInt,
        "mediumint" | "int" | "integer" => ColumnType::Integer,
        "bigint" => ColumnType::BigInt,
        "float" | "real" => ColumnType::Float,
        "double" => ColumnType::Double,
        "decimal" | "numeric" => ColumnType::Decimal,
        "tinytext" | "mediumtext" | "longtext" | "text" => ColumnType::Text,
        "longblob" | "blob" | "varbinary" => ColumnType::Binary,
        "varchar" | "string" | "enum" => ColumnType::String,
        "char" => ColumnType::Char,
        "datetime" => ColumnType::DateTime,
        "year" | "date" => ColumnType::Date,
        "time" => ColumnType::Time,
        "timestamp" => ColumnType::Timestamp,
        "json" => ColumnType::Json,
        _ => return None,
    };
    Some(column_type)
}

/// A native column type string broken into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDbType {
    /// Lower-cased base type, e.g. `int`
    pub base: String,
    pub column_type: ColumnType,
    pub size: Option<u32>,
    pub scale: Option<u32>,
    pub enum_values: Option<Vec<String>>,
}

/// Parse a native type string such as `decimal(10,2) unsigned`.
///
/// Unknown base types map to `ColumnType::String`.
pub fn parse_db_type(db_type: &str) -> ParsedDbType {
    let mut parsed = ParsedDbType {
        base: String::new(),
        column_type: ColumnType::String,
        size: None,
        scale: None,
        enum_values: None,
    };

    let Some(caps) = DB_TYPE_RE.captures(db_type) else {
        return parsed;
    };

    let base = caps.get(1).map_or("", |m| m.as_str()).to_lowercase();
    if let Some(column_type) = canonical_type(&base) {
        parsed.column_type = column_type;
    }

    if let Some(spec) = caps.get(2).map(|m| m.as_str()).filter(|s| !s.is_empty()) {
        if base == "enum" {
            parsed.enum_values = Some(
                ENUM_VALUE_RE
                    .find_iter(spec)
                    .map(|m| m.as_str().trim_matches('\'').to_string())
                    .collect(),
            );
        } else {
            let mut parts = spec.split(',');
            parsed.size = parts.next().and_then(|s| s.trim().parse().ok());
            parsed.scale = parts.next().and_then(|s| s.trim().parse().ok());

            match (base.as_str(), parsed.size) {
                ("tinyint", Some(1)) => parsed.column_type = ColumnType::Boolean,
                ("bit", Some(size)) if size > 32 => parsed.column_type = ColumnType::BigInt,
                ("bit", Some(32)) => parsed.column_type = ColumnType::Integer,
                _ => {}
            }
        }
    }

    parsed.base = base;
    parsed
}

/// Match a `CURRENT_TIMESTAMP[(n)]` default, returning the normalized expression.
pub fn current_timestamp_expression(default: &str) -> Option<String> {
    let caps = CURRENT_TIMESTAMP_RE.captures(default.trim())?;
    Some(match caps.get(1).map(|m| m.as_str()).filter(|s| !s.is_empty()) {
        Some(precision) => format!("CURRENT_TIMESTAMP({})", precision),
        None => "CURRENT_TIMESTAMP".to_string(),
    })
}

/// Parse a `bit` column default such as `b'101'` into its integer value.
pub fn parse_bit_default(default: &str) -> Option<u64> {
    let digits = default.trim_matches(|c| c == 'b' || c == '\'');
    u64::from_str_radix(digits, 2).ok()
}

/// Convert a server-reported default literal to a value of the column's type.
///
/// An empty string on a non-string column means "no default".
pub fn typecast_default(column_type: ColumnType, unsigned: bool, raw: &str) -> Option<DbValue> {
    let string_like = matches!(
        column_type,
        ColumnType::Text | ColumnType::String | ColumnType::Binary | ColumnType::Char
    );
    if raw.is_empty() && !string_like {
        return None;
    }

    let value = match column_type {
        ColumnType::TinyInt | ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt => {
            if unsigned {
                raw.parse::<u64>().map(DbValue::UInt).ok()
            } else {
                raw.parse::<i64>().map(DbValue::Int).ok()
            }
        }
        ColumnType::Boolean => Some(DbValue::Bool(raw != "0")),
        ColumnType::Float | ColumnType::Double => raw.parse::<f64>().map(DbValue::Float).ok(),
        ColumnType::Decimal => Some(DbValue::Decimal(raw.to_string())),
        _ => None,
    };
    Some(value.unwrap_or_else(|| DbValue::String(raw.to_string())))
}

// =============================================================================
// Result Value Classification
// =============================================================================

/// Logical category for wire-level column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    UnsignedInteger,
    Float,
    Decimal,
    Boolean,
    Bit,
    Text,
    Binary,
    Json,
    DateTime,
    Timestamp,
    Date,
    Time,
    Null,
}

/// Classify a sqlx MySQL type name (e.g. `BIGINT UNSIGNED`, `VARBINARY`).
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let upper = type_name.to_uppercase();

    // Decimal - check first as NUMERIC may overlap with other checks
    if upper.contains("DECIMAL") || upper.contains("NUMERIC") {
        return TypeCategory::Decimal;
    }

    match upper.as_str() {
        "BOOLEAN" | "BOOL" => return TypeCategory::Boolean,
        "BIT" => return TypeCategory::Bit,
        "JSON" => return TypeCategory::Json,
        "DATETIME" => return TypeCategory::DateTime,
        "TIMESTAMP" => return TypeCategory::Timestamp,
        "DATE" => return TypeCategory::Date,
        "TIME" => return TypeCategory::Time,
        "NULL" => return TypeCategory::Null,
        _ => {}
    }

    if upper.contains("INT") || upper == "YEAR" {
        return if upper.contains("UNSIGNED") {
            TypeCategory::UnsignedInteger
        } else {
            TypeCategory::Integer
        };
    }

    if upper.contains("FLOAT") || upper.contains("DOUBLE") || upper == "REAL" {
        return TypeCategory::Float;
    }

    if upper.contains("BLOB") || upper.contains("BINARY") || upper == "GEOMETRY" {
        return TypeCategory::Binary;
    }

    // varchar, text, char, enum, set, ...
    TypeCategory::Text
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Row Decoding
// =============================================================================

pub mod mysql {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use sqlx::{Column, Row};

    /// Decode every column of a row.
    pub fn decode_row(row: &MySqlRow) -> Vec<DbValue> {
        row.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| decode_column(row, idx, categorize_type(col.type_info().name())))
            .collect()
    }

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> DbValue {
        match category {
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::UnsignedInteger => decode_unsigned(row, idx),
            TypeCategory::Boolean => decode_boolean(row, idx),
            TypeCategory::Bit => decode_bit(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => decode_binary(row, idx),
            TypeCategory::Json => decode_json(row, idx),
            TypeCategory::DateTime | TypeCategory::Timestamp => decode_datetime(row, idx),
            TypeCategory::Date => decode_date(row, idx),
            TypeCategory::Time => decode_time(row, idx),
            TypeCategory::Null => DbValue::Null,
            TypeCategory::Text => decode_text(row, idx),
        }
    }

    fn decode_decimal(row: &MySqlRow, idx: usize) -> DbValue {
        match row.try_get::<Option<RawDecimal>, _>(idx) {
            Ok(Some(v)) => DbValue::Decimal(v.0),
            Ok(None) => DbValue::Null,
            Err(e) => {
                tracing::error!("Failed to decode DECIMAL: {:?}", e);
                DbValue::Null
            }
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> DbValue {
        // Check NULL first
        if let Ok(None) = row.try_get::<Option<i64>, _>(idx) {
            return DbValue::Null;
        }
        if let Ok(Some(v)) = row.try_get::<Option<i8>, _>(idx) {
            return DbValue::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
            return DbValue::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
            return DbValue::Int(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
            return DbValue::Int(v);
        }
        decode_unsigned(row, idx)
    }

    fn decode_unsigned(row: &MySqlRow, idx: usize) -> DbValue {
        if let Ok(Some(v)) = row.try_get::<Option<u8>, _>(idx) {
            return DbValue::UInt(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u16>, _>(idx) {
            return DbValue::UInt(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u32>, _>(idx) {
            return DbValue::UInt(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(idx) {
            return DbValue::UInt(v);
        }
        DbValue::Null
    }

    fn decode_boolean(row: &MySqlRow, idx: usize) -> DbValue {
        row.try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(DbValue::Bool)
            .unwrap_or(DbValue::Null)
    }

    fn decode_bit(row: &MySqlRow, idx: usize) -> DbValue {
        if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(idx) {
            return DbValue::UInt(v);
        }
        // Big-endian bytes on the wire
        row.try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(|bytes| {
                DbValue::UInt(
                    bytes
                        .iter()
                        .fold(0u64, |acc, b| acc.wrapping_shl(8) | u64::from(*b)),
                )
            })
            .unwrap_or(DbValue::Null)
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> DbValue {
        if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
            return DbValue::Float(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
            return DbValue::Float(v.into());
        }
        DbValue::Null
    }

    /// BLOB values are materialized completely; there is no streaming handle.
    fn decode_binary(row: &MySqlRow, idx: usize) -> DbValue {
        row.try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(DbValue::Bytes)
            .unwrap_or(DbValue::Null)
    }

    fn decode_json(row: &MySqlRow, idx: usize) -> DbValue {
        row.try_get::<Option<serde_json::Value>, _>(idx)
            .ok()
            .flatten()
            .map(DbValue::Json)
            .unwrap_or(DbValue::Null)
    }

    fn decode_datetime(row: &MySqlRow, idx: usize) -> DbValue {
        if let Ok(Some(v)) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
            return DbValue::DateTime(v.to_string());
        }
        if let Ok(Some(v)) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
            return DbValue::DateTime(v.naive_utc().to_string());
        }
        decode_text(row, idx)
    }

    fn decode_date(row: &MySqlRow, idx: usize) -> DbValue {
        if let Ok(Some(v)) = row.try_get::<Option<NaiveDate>, _>(idx) {
            return DbValue::DateTime(v.to_string());
        }
        decode_text(row, idx)
    }

    fn decode_time(row: &MySqlRow, idx: usize) -> DbValue {
        if let Ok(Some(v)) = row.try_get::<Option<NaiveTime>, _>(idx) {
            return DbValue::DateTime(v.to_string());
        }
        decode_text(row, idx)
    }

    fn decode_text(row: &MySqlRow, idx: usize) -> DbValue {
        if let Ok(Some(v)) = row.try_get::<Option<String>, _>(idx) {
            return DbValue::String(v);
        }
        // Some server-generated result sets (SHOW ...) use binary collations
        match row.try_get::<Option<Vec<u8>>, _>(idx) {
            Ok(Some(bytes)) => match String::from_utf8(bytes) {
                Ok(s) => DbValue::String(s),
                Err(e) => DbValue::Bytes(e.into_bytes()),
            },
            _ => DbValue::Null,
        }
    }
}
