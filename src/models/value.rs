//! Value-related data models.
//!
//! `DbValue` is what the driver returns and accepts, `Value` pairs it with the
//! type tag resolved at bind time, and `BindParam` is the set of argument
//! forms accepted by the command's binding methods.

use crate::db::quoter::quote_string;
use crate::error::{DbalError, DbalResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

/// A single column value, as decoded from or bound to the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DbValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Exact numeric, kept as its textual representation
    Decimal(String),
    String(String),
    /// Binary data (base64 encoded in JSON)
    #[serde(with = "base64_bytes")]
    Bytes(Vec<u8>),
    Json(JsonValue),
    /// Temporal value rendered by the driver (e.g., "2024-01-15 10:30:00")
    DateTime(String),
}

impl DbValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this value for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Json(_) => "json",
            Self::DateTime(_) => "datetime",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Decimal(s) | Self::DateTime(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::UInt(u) => i64::try_from(*u).ok(),
            Self::Bool(b) => Some(i64::from(*b)),
            Self::String(s) | Self::Decimal(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            Self::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Textual form of the value, without quoting. `None` for NULL.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::UInt(u) => Some(u.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Decimal(s) | Self::String(s) | Self::DateTime(s) => Some(s.clone()),
            Self::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            Self::Json(j) => Some(j.to_string()),
        }
    }

    /// Convert to a plain JSON value for display. Bytes become base64.
    pub fn to_json(&self) -> JsonValue {
        use base64::{Engine as _, engine::general_purpose::STANDARD};

        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(i) => JsonValue::from(*i),
            Self::UInt(u) => JsonValue::from(*u),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::Decimal(s) | Self::String(s) | Self::DateTime(s) => JsonValue::String(s.clone()),
            Self::Bytes(b) => JsonValue::String(STANDARD.encode(b)),
            Self::Json(j) => j.clone(),
        }
    }
}

macro_rules! impl_from_for_db_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for DbValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for_db_value! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => UInt,
    u16 => UInt,
    u32 => UInt,
    u64 => UInt,
    f32 => Float,
    f64 => Float,
    String => String,
    &str => String,
    Vec<u8> => Bytes,
    &[u8] => Bytes,
    JsonValue => Json,
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Custom serialization for binary data as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Semantic type tag attached to a bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Null,
    Boolean,
    Integer,
    Float,
    String,
    Binary,
    Json,
}

impl ParamType {
    /// Infer the tag from the value's own variant.
    pub fn infer(value: &DbValue) -> Self {
        match value {
            DbValue::Null => Self::Null,
            DbValue::Bool(_) => Self::Boolean,
            DbValue::Int(_) | DbValue::UInt(_) => Self::Integer,
            DbValue::Float(_) => Self::Float,
            DbValue::Decimal(_) | DbValue::String(_) | DbValue::DateTime(_) => Self::String,
            DbValue::Bytes(_) => Self::Binary,
            DbValue::Json(_) => Self::Json,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Binary => "binary",
            Self::Json => "json",
        }
    }
}

impl FromStr for ParamType {
    type Err = DbalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "null" => Ok(Self::Null),
            "bool" | "boolean" => Ok(Self::Boolean),
            "int" | "integer" => Ok(Self::Integer),
            "float" | "double" => Ok(Self::Float),
            "string" | "str" => Ok(Self::String),
            "binary" | "lob" => Ok(Self::Binary),
            "json" => Ok(Self::Json),
            other => Err(DbalError::invalid_argument(format!(
                "Unknown parameter type hint '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable (raw value, type tag) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    raw: DbValue,
    param_type: ParamType,
}

impl Value {
    pub fn new(raw: impl Into<DbValue>, param_type: ParamType) -> Self {
        Self {
            raw: raw.into(),
            param_type,
        }
    }

    /// Build a value whose tag is inferred from the raw value.
    pub fn inferred(raw: impl Into<DbValue>) -> Self {
        let raw = raw.into();
        let param_type = ParamType::infer(&raw);
        Self { raw, param_type }
    }

    /// Build a value tagged by a hint string such as `"integer"` or `"string"`.
    pub fn with_hint(raw: impl Into<DbValue>, hint: &str) -> DbalResult<Self> {
        Ok(Self::new(raw, hint.parse()?))
    }

    pub fn raw(&self) -> &DbValue {
        &self.raw
    }

    pub fn param_type(&self) -> ParamType {
        self.param_type
    }

    /// The raw value coerced to its tag, as handed to the driver.
    ///
    /// NULL stays NULL whatever the tag; values that cannot be coerced are
    /// passed through unchanged and left to the server.
    pub fn bind_value(&self) -> DbValue {
        let raw = &self.raw;
        if raw.is_null() {
            return DbValue::Null;
        }
        match self.param_type {
            ParamType::Null => DbValue::Null,
            ParamType::Boolean => match raw {
                DbValue::Bool(_) => raw.clone(),
                DbValue::String(s) => match s.trim().to_lowercase().as_str() {
                    "1" | "true" | "on" | "yes" => DbValue::Bool(true),
                    "0" | "false" | "off" | "no" | "" => DbValue::Bool(false),
                    _ => raw.clone(),
                },
                DbValue::Float(f) => DbValue::Bool(*f != 0.0),
                other => other.as_i64().map_or_else(|| raw.clone(), |i| DbValue::Bool(i != 0)),
            },
            ParamType::Integer => match raw {
                DbValue::Int(_) | DbValue::UInt(_) => raw.clone(),
                DbValue::String(s) | DbValue::Decimal(s) => {
                    let trimmed = s.trim();
                    trimmed
                        .parse::<i64>()
                        .map(DbValue::Int)
                        .or_else(|_| trimmed.parse::<u64>().map(DbValue::UInt))
                        .unwrap_or_else(|_| raw.clone())
                }
                DbValue::Bool(b) => DbValue::Int(i64::from(*b)),
                DbValue::Float(f) if f.fract() == 0.0 => DbValue::Int(*f as i64),
                _ => raw.clone(),
            },
            ParamType::Float => match raw {
                DbValue::Float(_) => raw.clone(),
                DbValue::Int(i) => DbValue::Float(*i as f64),
                DbValue::UInt(u) => DbValue::Float(*u as f64),
                DbValue::String(s) | DbValue::Decimal(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(DbValue::Float)
                    .unwrap_or_else(|_| raw.clone()),
                _ => raw.clone(),
            },
            ParamType::String => match raw {
                DbValue::String(_) | DbValue::Bytes(_) => raw.clone(),
                other => other
                    .to_text()
                    .map_or(DbValue::Null, DbValue::String),
            },
            ParamType::Binary => match raw {
                DbValue::Bytes(_) => raw.clone(),
                other => other
                    .to_text()
                    .map_or(DbValue::Null, |s| DbValue::Bytes(s.into_bytes())),
            },
            ParamType::Json => match raw {
                DbValue::Json(_) => raw.clone(),
                DbValue::String(s) => serde_json::from_str(s)
                    .map(DbValue::Json)
                    .unwrap_or_else(|_| DbValue::Json(JsonValue::String(s.clone()))),
                other => DbValue::Json(other.to_json()),
            },
        }
    }

    /// Render as a SQL literal for diagnostics.
    ///
    /// Not safe for execution: the output is only as good as the escaping.
    pub fn as_sql_literal(&self) -> String {
        match self.bind_value() {
            DbValue::Null => "NULL".to_string(),
            DbValue::Bool(b) => (if b { "1" } else { "0" }).to_string(),
            DbValue::Int(i) => i.to_string(),
            DbValue::UInt(u) => u.to_string(),
            DbValue::Float(f) => f.to_string(),
            DbValue::Decimal(s) => s,
            DbValue::Bytes(b) => {
                let hex: String = b.iter().map(|byte| format!("{:02X}", byte)).collect();
                format!("X'{}'", hex)
            }
            DbValue::String(s) | DbValue::DateTime(s) => quote_string(&s),
            DbValue::Json(j) => quote_string(&j.to_string()),
        }
    }
}

impl From<DbValue> for Value {
    fn from(raw: DbValue) -> Self {
        Self::inferred(raw)
    }
}

/// Argument accepted by `Command::bind_value` and `Command::bind_values`.
#[derive(Debug, Clone, PartialEq)]
pub enum BindParam {
    /// Plain value; the tag is inferred
    Plain(DbValue),
    /// Value with a type hint string
    Hinted(DbValue, String),
    /// Prebuilt value
    Typed(Value),
}

impl BindParam {
    /// Resolve into a `Value`, parsing the hint when present.
    pub fn into_value(self) -> DbalResult<Value> {
        match self {
            Self::Plain(raw) => Ok(Value::inferred(raw)),
            Self::Hinted(raw, hint) => Value::with_hint(raw, &hint),
            Self::Typed(value) => Ok(value),
        }
    }
}

impl From<Value> for BindParam {
    fn from(value: Value) -> Self {
        Self::Typed(value)
    }
}

macro_rules! impl_from_for_bind_param {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for BindParam {
                fn from(v: $ty) -> Self {
                    Self::Plain(v.into())
                }
            }

            impl From<($ty, &str)> for BindParam {
                fn from((v, hint): ($ty, &str)) -> Self {
                    Self::Hinted(v.into(), hint.to_string())
                }
            }
        )*
    };
}

impl_from_for_bind_param! {
    DbValue, bool, i32, i64, u32, u64, f64, String, &str, Vec<u8>, JsonValue,
    Option<i64>, Option<String>, Option<&str>,
}

/// A fetched row: ordered column names with their values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<DbValue>,
}

impl Row {
    /// Create a row. Extra names or values beyond the shorter list are dropped.
    pub fn new(columns: Vec<String>, mut values: Vec<DbValue>) -> Self {
        let mut columns = columns;
        let len = columns.len().min(values.len());
        columns.truncate(len);
        values.truncate(len);
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[DbValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<DbValue> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Look up a value by column name (first match).
    pub fn get(&self, column: &str) -> Option<&DbValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn get_index(&self, index: usize) -> Option<&DbValue> {
        self.values.get(index)
    }

    /// String value of a column; NULL and absent columns are `None`.
    pub fn get_string(&self, column: &str) -> Option<String> {
        self.get(column).and_then(DbValue::to_text)
    }

    /// Same row with every column name lower-cased.
    pub fn lowercase_columns(self) -> Self {
        Self {
            columns: self.columns.iter().map(|c| c.to_lowercase()).collect(),
            values: self.values,
        }
    }

    /// Convert to a JSON object for display.
    pub fn to_json(&self) -> serde_json::Map<String, JsonValue> {
        self.columns
            .iter()
            .zip(&self.values)
            .map(|(c, v)| (c.clone(), v.to_json()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_param_type() {
        assert_eq!(ParamType::infer(&DbValue::Int(1)), ParamType::Integer);
        assert_eq!(ParamType::infer(&DbValue::from("a")), ParamType::String);
        assert_eq!(ParamType::infer(&DbValue::Null), ParamType::Null);
        assert_eq!(ParamType::infer(&DbValue::Bool(true)), ParamType::Boolean);
        assert_eq!(ParamType::infer(&DbValue::Float(1.5)), ParamType::Float);
        assert_eq!(ParamType::infer(&DbValue::Bytes(vec![1])), ParamType::Binary);
    }

    #[test]
    fn test_parse_hint() {
        assert_eq!("int".parse::<ParamType>().unwrap(), ParamType::Integer);
        assert_eq!("STRING".parse::<ParamType>().unwrap(), ParamType::String);
        assert_eq!("lob".parse::<ParamType>().unwrap(), ParamType::Binary);
        let err = "money".parse::<ParamType>().unwrap_err();
        assert!(matches!(err, DbalError::InvalidArgument { .. }));
    }

    #[test]
    fn test_bind_value_coercion() {
        let v = Value::new("5", ParamType::Integer);
        assert_eq!(v.bind_value(), DbValue::Int(5));

        let v = Value::new(5, ParamType::String);
        assert_eq!(v.bind_value(), DbValue::String("5".into()));

        let v = Value::new("true", ParamType::Boolean);
        assert_eq!(v.bind_value(), DbValue::Bool(true));

        let v = Value::new("abc", ParamType::Integer);
        assert_eq!(v.bind_value(), DbValue::String("abc".into()));

        let v = Value::new(DbValue::Null, ParamType::Integer);
        assert_eq!(v.bind_value(), DbValue::Null);
    }

    #[test]
    fn test_sql_literal() {
        assert_eq!(Value::inferred(DbValue::Null).as_sql_literal(), "NULL");
        assert_eq!(Value::inferred(1).as_sql_literal(), "1");
        assert_eq!(Value::inferred(true).as_sql_literal(), "1");
        assert_eq!(Value::inferred("test").as_sql_literal(), "'test'");
        assert_eq!(Value::inferred("It's").as_sql_literal(), "'It\\'s'");
        assert_eq!(
            Value::inferred(vec![0xDEu8, 0xAD]).as_sql_literal(),
            "X'DEAD'"
        );
        assert_eq!(Value::new("7", ParamType::Integer).as_sql_literal(), "7");
    }

    #[test]
    fn test_bind_param_forms() {
        let plain = BindParam::from("test").into_value().unwrap();
        let hinted = BindParam::from(("test", "string")).into_value().unwrap();
        assert_eq!(plain, hinted);

        let typed = BindParam::from(Value::new(3, ParamType::Float))
            .into_value()
            .unwrap();
        assert_eq!(typed.bind_value(), DbValue::Float(3.0));

        assert!(BindParam::from((1, "weird")).into_value().is_err());
    }

    #[test]
    fn test_row_lookup() {
        let row = Row::new(
            vec!["Field".into(), "Type".into()],
            vec![DbValue::from("id"), DbValue::from("int(11)")],
        );
        assert_eq!(row.get_string("Type").as_deref(), Some("int(11)"));
        assert!(row.get("type").is_none());

        let row = row.lowercase_columns();
        assert_eq!(row.get_string("type").as_deref(), Some("int(11)"));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_db_value_serde_keeps_variant() {
        let bytes = DbValue::Bytes(vec![1, 2, 3]);
        let json = serde_json::to_string(&bytes).unwrap();
        let back: DbValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bytes);
    }

    #[test]
    fn test_db_value_to_json() {
        assert_eq!(DbValue::Bytes(b"hi".to_vec()).to_json(), JsonValue::from("aGk="));
        assert_eq!(DbValue::Int(4).to_json(), JsonValue::from(4));
        assert_eq!(DbValue::Null.to_json(), JsonValue::Null);
    }
}
