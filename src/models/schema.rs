//! Schema-related data models.
//!
//! This module defines the per-table metadata produced by schema
//! introspection. Values are assembled with consuming `with_*` builders and
//! are shared behind `Arc` once stored in the metadata cache, so they are
//! never mutated after construction.

use crate::models::DbValue;
use serde::{Deserialize, Serialize};

/// Canonical, dialect-independent column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Double,
    Decimal,
    Boolean,
    Char,
    #[default]
    String,
    Text,
    Binary,
    Date,
    Time,
    DateTime,
    Timestamp,
    Json,
}

impl ColumnType {
    /// Whether values of this type are integral numbers.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::TinyInt | Self::SmallInt | Self::Integer | Self::BigInt
        )
    }

    /// Whether values of this type are floating point numbers.
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TinyInt => "tinyint",
            Self::SmallInt => "smallint",
            Self::Integer => "integer",
            Self::BigInt => "bigint",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Char => "char",
            Self::String => "string",
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
            Self::Timestamp => "timestamp",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default value of a column as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnDefault {
    /// A literal, typecast to the column's canonical type
    Literal(DbValue),
    /// A server-evaluated expression such as `CURRENT_TIMESTAMP(3)`
    Expression(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
    /// Full native type (e.g., `varchar(30)`, `bigint(20) unsigned`)
    pub db_type: String,
    pub allow_null: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<ColumnDefault>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    pub is_primary_key: bool,
    pub auto_increment: bool,
    pub unsigned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ColumnSchema {
    /// Create a new column schema.
    pub fn new(name: impl Into<String>, db_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::default(),
            db_type: db_type.into(),
            allow_null: false,
            default_value: None,
            enum_values: None,
            size: None,
            precision: None,
            scale: None,
            is_primary_key: false,
            auto_increment: false,
            unsigned: false,
            comment: None,
        }
    }

    pub fn with_type(mut self, column_type: ColumnType) -> Self {
        self.column_type = column_type;
        self
    }

    pub fn with_allow_null(mut self, allow_null: bool) -> Self {
        self.allow_null = allow_null;
        self
    }

    pub fn with_default(mut self, default_value: ColumnDefault) -> Self {
        self.default_value = Some(default_value);
        self
    }

    pub fn with_enum_values(mut self, values: Vec<String>) -> Self {
        self.enum_values = Some(values);
        self
    }

    /// Set size and precision together; MySQL reports both as the first
    /// number of the type specifier.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self.precision = Some(size);
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_primary_key(mut self, is_pk: bool) -> Self {
        self.is_primary_key = is_pk;
        self
    }

    pub fn with_auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    pub fn with_unsigned(mut self, unsigned: bool) -> Self {
        self.unsigned = unsigned;
        self
    }

    /// Set the column comment. Empty comments are dropped.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        let comment = comment.into();
        self.comment = (!comment.is_empty()).then_some(comment);
        self
    }
}

/// Columns of one table. Constraints are separate metadata kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    /// `schema.name` when a schema was given, otherwise `name`
    pub full_name: String,
    /// In server-reported order
    pub columns: Vec<ColumnSchema>,
    pub primary_key: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_name: Option<String>,
}

impl TableSchema {
    /// Create a new table schema.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            full_name: name.clone(),
            name,
            schema_name: None,
            columns: Vec::new(),
            primary_key: Vec::new(),
            sequence_name: None,
        }
    }

    /// Set the schema name, updating the full name accordingly.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        let schema = schema.into();
        self.full_name = format!("{}.{}", schema, self.name);
        self.schema_name = Some(schema);
        self
    }

    /// Add a column. Primary-key columns are appended to the primary key.
    pub fn with_column(mut self, column: ColumnSchema) -> Self {
        if column.is_primary_key {
            self.primary_key.push(column.name.clone());
            if column.auto_increment {
                self.sequence_name = Some(String::new());
            }
        }
        self.columns.push(column);
        self
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Primary key or unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub column_names: Vec<String>,
}

impl Constraint {
    pub fn new(column_names: Vec<String>) -> Self {
        Self {
            name: None,
            column_names,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyConstraint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub column_names: Vec<String>,
    /// None when the referenced table lives in the connection's default schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_schema_name: Option<String>,
    pub foreign_table_name: String,
    pub foreign_column_names: Vec<String>,
    pub on_delete: ForeignKeyAction,
    pub on_update: ForeignKeyAction,
}

impl ForeignKeyConstraint {
    /// Create a new foreign key.
    pub fn new(
        column_names: Vec<String>,
        foreign_table_name: impl Into<String>,
        foreign_column_names: Vec<String>,
    ) -> Self {
        Self {
            name: None,
            column_names,
            foreign_schema_name: None,
            foreign_table_name: foreign_table_name.into(),
            foreign_column_names,
            on_delete: ForeignKeyAction::NoAction,
            on_update: ForeignKeyAction::NoAction,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_foreign_schema(mut self, schema: impl Into<String>) -> Self {
        self.foreign_schema_name = Some(schema.into());
        self
    }

    pub fn with_on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }

    pub fn with_on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        self
    }
}

/// Foreign key referential action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyAction {
    /// No action (error if referenced)
    #[default]
    NoAction,
    /// Restrict (same as NoAction in most databases)
    Restrict,
    /// Cascade the operation
    Cascade,
    /// Set to NULL
    SetNull,
    /// Set to default value
    SetDefault,
}

impl ForeignKeyAction {
    /// Parse from the `UPDATE_RULE`/`DELETE_RULE` catalog string.
    pub fn parse(s: &str) -> Self {
        let upper = s.to_uppercase();
        match upper.as_str() {
            "CASCADE" => Self::Cascade,
            "SET NULL" => Self::SetNull,
            "SET DEFAULT" => Self::SetDefault,
            "RESTRICT" => Self::Restrict,
            _ => Self::NoAction,
        }
    }
}

impl std::fmt::Display for ForeignKeyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAction => write!(f, "NO ACTION"),
            Self::Restrict => write!(f, "RESTRICT"),
            Self::Cascade => write!(f, "CASCADE"),
            Self::SetNull => write!(f, "SET NULL"),
            Self::SetDefault => write!(f, "SET DEFAULT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConstraint {
    /// None for the primary key index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Ordered by position in the index
    pub column_names: Vec<String>,
    pub is_unique: bool,
    pub is_primary: bool,
}

impl IndexConstraint {
    pub fn new(column_names: Vec<String>) -> Self {
        Self {
            name: None,
            column_names,
            is_unique: false,
            is_primary: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_unique(mut self, is_unique: bool) -> Self {
        self.is_unique = is_unique;
        self
    }

    /// Mark as the primary key index, which is always unique.
    pub fn with_primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        if is_primary {
            self.is_unique = true;
        }
        self
    }
}
