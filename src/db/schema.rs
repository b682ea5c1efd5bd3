//! Schema introspection for MySQL.
//!
//! Metadata is loaded per table and per kind, kept in memory for the
//! lifetime of the connection and optionally persisted through a
//! [`SchemaCache`]. Primary key, foreign keys and unique constraints come
//! from one catalog query and are stored together.

use crate::db::cache::SchemaCache;
use crate::db::connection::Connection;
use crate::db::types;
use crate::error::{DbalError, DbalResult};
use crate::models::{
    ColumnCase, ColumnDefault, ColumnSchema, ColumnType, Constraint, DbValue, ForeignKeyAction,
    ForeignKeyConstraint, IndexConstraint, Row, TableSchema,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// Format version of persisted metadata. Entries with another version are
/// ignored.
pub const SCHEMA_CACHE_VERSION: u32 = 1;

const CACHE_ID: &str = concat!(module_path!(), "::Schema");

mod queries {
    pub mod mysql {
        pub const TABLE_INDEXES: &str = r#"
            SELECT
                `s`.`INDEX_NAME` AS `name`,
                `s`.`COLUMN_NAME` AS `column_name`,
                `s`.`NON_UNIQUE` ^ 1 AS `index_is_unique`,
                `s`.`INDEX_NAME` = 'PRIMARY' AS `index_is_primary`
            FROM `information_schema`.`STATISTICS` AS `s`
            WHERE `s`.`TABLE_SCHEMA` = COALESCE(:schemaName, DATABASE())
                AND `s`.`INDEX_SCHEMA` = `s`.`TABLE_SCHEMA`
                AND `s`.`TABLE_NAME` = :tableName
            ORDER BY `s`.`SEQ_IN_INDEX` ASC
            "#;

        pub const TABLE_CONSTRAINTS: &str = r#"
            SELECT
                `kcu`.`CONSTRAINT_NAME` AS `name`,
                `kcu`.`COLUMN_NAME` AS `column_name`,
                `tc`.`CONSTRAINT_TYPE` AS `type`,
                CASE
                    WHEN :schemaName IS NULL AND `kcu`.`REFERENCED_TABLE_SCHEMA` = DATABASE() THEN NULL
                    ELSE `kcu`.`REFERENCED_TABLE_SCHEMA`
                END AS `foreign_table_schema`,
                `kcu`.`REFERENCED_TABLE_NAME` AS `foreign_table_name`,
                `kcu`.`REFERENCED_COLUMN_NAME` AS `foreign_column_name`,
                `rc`.`UPDATE_RULE` AS `on_update`,
                `rc`.`DELETE_RULE` AS `on_delete`,
                `kcu`.`ORDINAL_POSITION` AS `position`
            FROM
                `information_schema`.`KEY_COLUMN_USAGE` AS `kcu`,
                `information_schema`.`REFERENTIAL_CONSTRAINTS` AS `rc`,
                `information_schema`.`TABLE_CONSTRAINTS` AS `tc`
            WHERE
                `kcu`.`TABLE_SCHEMA` = COALESCE(:schemaName, DATABASE())
                AND `kcu`.`CONSTRAINT_SCHEMA` = `kcu`.`TABLE_SCHEMA`
                AND `kcu`.`TABLE_NAME` = :tableName
                AND `rc`.`CONSTRAINT_SCHEMA` = `kcu`.`TABLE_SCHEMA`
                AND `rc`.`TABLE_NAME` = :tableName
                AND `rc`.`CONSTRAINT_NAME` = `kcu`.`CONSTRAINT_NAME`
                AND `tc`.`TABLE_SCHEMA` = `kcu`.`TABLE_SCHEMA`
                AND `tc`.`TABLE_NAME` = :tableName
                AND `tc`.`CONSTRAINT_NAME` = `kcu`.`CONSTRAINT_NAME`
                AND `tc`.`CONSTRAINT_TYPE` = 'FOREIGN KEY'
            UNION
            SELECT
                `kcu`.`CONSTRAINT_NAME` AS `name`,
                `kcu`.`COLUMN_NAME` AS `column_name`,
                `tc`.`CONSTRAINT_TYPE` AS `type`,
                NULL AS `foreign_table_schema`,
                NULL AS `foreign_table_name`,
                NULL AS `foreign_column_name`,
                NULL AS `on_update`,
                NULL AS `on_delete`,
                `kcu`.`ORDINAL_POSITION` AS `position`
            FROM
                `information_schema`.`KEY_COLUMN_USAGE` AS `kcu`,
                `information_schema`.`TABLE_CONSTRAINTS` AS `tc`
            WHERE
                `kcu`.`TABLE_SCHEMA` = COALESCE(:schemaName, DATABASE())
                AND `kcu`.`TABLE_NAME` = :tableName
                AND `tc`.`TABLE_SCHEMA` = `kcu`.`TABLE_SCHEMA`
                AND `tc`.`TABLE_NAME` = :tableName
                AND `tc`.`CONSTRAINT_NAME` = `kcu`.`CONSTRAINT_NAME`
                AND `tc`.`CONSTRAINT_TYPE` IN ('PRIMARY KEY', 'UNIQUE')
            ORDER BY `position` ASC
            "#;
    }
}

/// Kinds of per-table metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataKind {
    /// Columns, primary key and sequence name
    Schema,
    PrimaryKey,
    ForeignKeys,
    Uniques,
    Indexes,
    Checks,
    DefaultValues,
}

/// One loaded piece of table metadata.
///
/// Values are shared by reference once stored; a cache hit hands out the
/// same `Arc` every time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TableMetadata {
    /// `None` when the table does not exist
    Schema(Option<Arc<TableSchema>>),
    PrimaryKey(Option<Arc<Constraint>>),
    ForeignKeys(Arc<Vec<ForeignKeyConstraint>>),
    Uniques(Arc<Vec<Constraint>>),
    Indexes(Arc<Vec<IndexConstraint>>),
    Checks(Arc<Vec<Constraint>>),
    DefaultValues(Arc<Vec<Constraint>>),
}

impl TableMetadata {
    pub fn kind(&self) -> MetadataKind {
        match self {
            Self::Schema(_) => MetadataKind::Schema,
            Self::PrimaryKey(_) => MetadataKind::PrimaryKey,
            Self::ForeignKeys(_) => MetadataKind::ForeignKeys,
            Self::Uniques(_) => MetadataKind::Uniques,
            Self::Indexes(_) => MetadataKind::Indexes,
            Self::Checks(_) => MetadataKind::Checks,
            Self::DefaultValues(_) => MetadataKind::DefaultValues,
        }
    }
}

/// Persisted form of one table's metadata.
#[derive(Debug, Serialize, Deserialize)]
struct CachedMetadata {
    #[serde(default)]
    cache_version: Option<u32>,
    #[serde(default)]
    entries: Vec<TableMetadata>,
}

/// In-memory metadata owned by one connection.
#[derive(Debug, Default)]
pub(crate) struct SchemaState {
    table_metadata: HashMap<String, BTreeMap<MetadataKind, TableMetadata>>,
    /// Keyed by schema filter; "" for the default schema
    table_names: HashMap<String, Vec<String>>,
    schema_names: Option<Vec<String>>,
}

/// Schema introspection bound to a connection.
pub struct Schema<'c> {
    conn: &'c mut Connection,
}

impl<'c> Schema<'c> {
    pub(crate) fn new(conn: &'c mut Connection) -> Self {
        conn.schema.get_or_insert_with(SchemaState::default);
        Self { conn }
    }

    fn state(&mut self) -> &mut SchemaState {
        self.conn.schema.get_or_insert_with(SchemaState::default)
    }

    fn cache(&self) -> Option<Arc<dyn SchemaCache>> {
        self.conn.schema_cache()
    }

    /// Strip `{{ }}` and apply the table prefix.
    pub fn raw_table_name(&mut self, name: &str) -> String {
        self.conn.quoter().raw_table_name(name)
    }

    /// Split an unquoted `schema.table` name.
    pub fn resolve_table_name(&self, name: &str) -> TableSchema {
        let name = name.replace('`', "");
        match name.split_once('.') {
            Some((schema, table)) => TableSchema::new(table).with_schema(schema),
            None => TableSchema::new(name),
        }
    }

    fn quote_full_name(&mut self, table: &TableSchema) -> String {
        let quoter = self.conn.quoter();
        match &table.schema_name {
            Some(schema) => format!(
                "{}.{}",
                quoter.quote_table_name(schema),
                quoter.quote_table_name(&table.name)
            ),
            None => quoter.quote_table_name(&table.name),
        }
    }

    fn cache_key(&self, raw_name: &str) -> String {
        serde_json::json!([CACHE_ID, self.conn.dsn(), self.conn.username(), raw_name]).to_string()
    }

    fn cache_tag(&self) -> String {
        serde_json::json!([CACHE_ID, self.conn.dsn(), self.conn.username()]).to_string()
    }

    // =========================================================================
    // Typed getters
    // =========================================================================

    /// Columns of a table; `None` if the table does not exist.
    pub async fn get_table_schema(
        &mut self,
        name: &str,
        refresh: bool,
    ) -> DbalResult<Option<Arc<TableSchema>>> {
        match self
            .get_table_metadata(name, MetadataKind::Schema, refresh)
            .await?
        {
            TableMetadata::Schema(schema) => Ok(schema),
            _ => Ok(None),
        }
    }

    pub async fn get_table_primary_key(
        &mut self,
        name: &str,
        refresh: bool,
    ) -> DbalResult<Option<Arc<Constraint>>> {
        match self
            .get_table_metadata(name, MetadataKind::PrimaryKey, refresh)
            .await?
        {
            TableMetadata::PrimaryKey(pk) => Ok(pk),
            _ => Ok(None),
        }
    }

    pub async fn get_table_foreign_keys(
        &mut self,
        name: &str,
        refresh: bool,
    ) -> DbalResult<Arc<Vec<ForeignKeyConstraint>>> {
        match self
            .get_table_metadata(name, MetadataKind::ForeignKeys, refresh)
            .await?
        {
            TableMetadata::ForeignKeys(fks) => Ok(fks),
            _ => Ok(Arc::default()),
        }
    }

    pub async fn get_table_uniques(
        &mut self,
        name: &str,
        refresh: bool,
    ) -> DbalResult<Arc<Vec<Constraint>>> {
        match self
            .get_table_metadata(name, MetadataKind::Uniques, refresh)
            .await?
        {
            TableMetadata::Uniques(uniques) => Ok(uniques),
            _ => Ok(Arc::default()),
        }
    }

    pub async fn get_table_indexes(
        &mut self,
        name: &str,
        refresh: bool,
    ) -> DbalResult<Arc<Vec<IndexConstraint>>> {
        match self
            .get_table_metadata(name, MetadataKind::Indexes, refresh)
            .await?
        {
            TableMetadata::Indexes(indexes) => Ok(indexes),
            _ => Ok(Arc::default()),
        }
    }

    pub async fn get_table_checks(
        &mut self,
        name: &str,
        refresh: bool,
    ) -> DbalResult<Arc<Vec<Constraint>>> {
        match self
            .get_table_metadata(name, MetadataKind::Checks, refresh)
            .await?
        {
            TableMetadata::Checks(checks) => Ok(checks),
            _ => Ok(Arc::default()),
        }
    }

    pub async fn get_table_default_values(
        &mut self,
        name: &str,
        refresh: bool,
    ) -> DbalResult<Arc<Vec<Constraint>>> {
        match self
            .get_table_metadata(name, MetadataKind::DefaultValues, refresh)
            .await?
        {
            TableMetadata::DefaultValues(defaults) => Ok(defaults),
            _ => Ok(Arc::default()),
        }
    }

    /// Unique constraints of an already loaded table.
    pub async fn find_unique_indexes(
        &mut self,
        table: &TableSchema,
    ) -> DbalResult<Arc<Vec<Constraint>>> {
        let name = table.full_name.clone();
        self.get_table_uniques(&name, false).await
    }

    // =========================================================================
    // Table and schema lists
    // =========================================================================

    /// Names of the tables in `schema`, or in the current database.
    pub async fn get_table_names(
        &mut self,
        schema: Option<&str>,
        refresh: bool,
    ) -> DbalResult<Vec<String>> {
        let key = schema.unwrap_or_default().to_string();
        if !refresh {
            if let Some(names) = self.state().table_names.get(&key) {
                return Ok(names.clone());
            }
        }

        let names = self.find_table_names(schema).await?;
        self.state().table_names.insert(key, names.clone());
        Ok(names)
    }

    async fn find_table_names(&mut self, schema: Option<&str>) -> DbalResult<Vec<String>> {
        let sql = match schema.filter(|s| !s.is_empty()) {
            Some(schema) => format!("SHOW TABLES FROM {}", self.conn.quoter().quote_table_name(schema)),
            None => "SHOW TABLES".to_string(),
        };
        let names = self.conn.command().set_raw_sql(sql).query_column().await?;
        Ok(names.iter().filter_map(DbValue::to_text).collect())
    }

    /// Schemas of every table in `schema`. Tables that vanish between the
    /// listing and the lookup are skipped.
    pub async fn get_table_schemas(
        &mut self,
        schema: Option<&str>,
        refresh: bool,
    ) -> DbalResult<Vec<Arc<TableSchema>>> {
        let names = self.get_table_names(schema, refresh).await?;
        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let qualified = match schema.filter(|s| !s.is_empty()) {
                Some(schema) => format!("{}.{}", schema, name),
                None => name,
            };
            if let Some(table) = self.get_table_schema(&qualified, refresh).await? {
                tables.push(table);
            }
        }
        Ok(tables)
    }

    pub async fn get_schema_names(&mut self, refresh: bool) -> DbalResult<Vec<String>> {
        if !refresh {
            if let Some(names) = &self.state().schema_names {
                return Ok(names.clone());
            }
        }

        let names: Vec<String> = self
            .conn
            .command()
            .set_raw_sql("SHOW DATABASES")
            .query_column()
            .await?
            .iter()
            .filter_map(DbValue::to_text)
            .collect();
        self.state().schema_names = Some(names.clone());
        Ok(names)
    }

    // =========================================================================
    // Invalidation
    // =========================================================================

    /// Drop every loaded table and invalidate the persisted cache.
    pub fn refresh(&mut self) {
        if let Some(cache) = self.cache().filter(|c| c.is_enabled()) {
            cache.invalidate(&self.cache_tag());
        }
        let state = self.state();
        state.table_metadata.clear();
        state.table_names.clear();
        state.schema_names = None;
        debug!("Schema metadata refreshed");
    }

    /// Drop the metadata of one table.
    pub fn refresh_table_schema(&mut self, name: &str) {
        let raw = self.raw_table_name(name);
        let state = self.state();
        state.table_metadata.remove(&raw);
        state.table_names.clear();
        if let Some(cache) = self.cache() {
            cache.remove(&self.cache_key(&raw));
        }
        debug!(table = %raw, "Table schema refreshed");
    }

    // =========================================================================
    // Metadata protocol
    // =========================================================================

    /// Metadata of one kind for a table, loading it on first access or when
    /// `refresh` is set.
    pub async fn get_table_metadata(
        &mut self,
        name: &str,
        kind: MetadataKind,
        refresh: bool,
    ) -> DbalResult<TableMetadata> {
        let raw = self.raw_table_name(name);

        if !self.state().table_metadata.contains_key(&raw) {
            let cached = self.load_table_metadata_from_cache(&raw);
            self.state().table_metadata.insert(raw.clone(), cached);
        }

        if !refresh {
            if let Some(metadata) = self
                .state()
                .table_metadata
                .get(&raw)
                .and_then(|m| m.get(&kind))
            {
                return Ok(metadata.clone());
            }
        }

        let metadata = self.load_table_metadata(&raw, kind).await?;
        self.set_table_metadata(&raw, metadata.clone());
        self.save_table_metadata_to_cache(&raw);
        Ok(metadata)
    }

    fn set_table_metadata(&mut self, raw_name: &str, metadata: TableMetadata) {
        self.state()
            .table_metadata
            .entry(raw_name.to_string())
            .or_default()
            .insert(metadata.kind(), metadata);
    }

    fn load_table_metadata_from_cache(
        &self,
        raw_name: &str,
    ) -> BTreeMap<MetadataKind, TableMetadata> {
        let Some(cache) = self.cache() else {
            return BTreeMap::new();
        };
        if !cache.is_enabled() || cache.is_excluded(raw_name) {
            return BTreeMap::new();
        }

        let Some(payload) = cache.get(&self.cache_key(raw_name)) else {
            debug!(table = %raw_name, "Schema cache miss");
            return BTreeMap::new();
        };

        match serde_json::from_value::<CachedMetadata>(payload) {
            Ok(cached) if cached.cache_version == Some(SCHEMA_CACHE_VERSION) => {
                debug!(table = %raw_name, count = cached.entries.len(), "Schema cache hit");
                cached.entries.into_iter().map(|m| (m.kind(), m)).collect()
            }
            Ok(cached) => {
                debug!(
                    table = %raw_name,
                    version = ?cached.cache_version,
                    "Ignoring schema cache entry with another format version"
                );
                BTreeMap::new()
            }
            Err(e) => {
                debug!(table = %raw_name, error = %e, "Ignoring unreadable schema cache entry");
                BTreeMap::new()
            }
        }
    }

    fn save_table_metadata_to_cache(&mut self, raw_name: &str) {
        let Some(cache) = self.cache() else {
            return;
        };
        if !cache.is_enabled() || cache.is_excluded(raw_name) {
            return;
        }

        let entries = self
            .state()
            .table_metadata
            .get(raw_name)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        let payload = CachedMetadata {
            cache_version: Some(SCHEMA_CACHE_VERSION),
            entries,
        };

        match serde_json::to_value(&payload) {
            Ok(value) => cache.set(
                &self.cache_key(raw_name),
                value,
                cache.duration(),
                Some(&self.cache_tag()),
            ),
            Err(e) => warn!(table = %raw_name, error = %e, "Failed to serialize table metadata"),
        }
    }

    async fn load_table_metadata(
        &mut self,
        raw_name: &str,
        kind: MetadataKind,
    ) -> DbalResult<TableMetadata> {
        match kind {
            MetadataKind::Schema => Ok(TableMetadata::Schema(
                self.load_table_schema(raw_name).await?,
            )),
            MetadataKind::PrimaryKey | MetadataKind::ForeignKeys | MetadataKind::Uniques => {
                self.load_table_constraints(raw_name, kind).await
            }
            MetadataKind::Indexes => Ok(TableMetadata::Indexes(Arc::new(
                self.load_table_indexes(raw_name).await?,
            ))),
            MetadataKind::Checks => Err(DbalError::not_supported(
                "MySQL does not support check constraints.",
            )),
            MetadataKind::DefaultValues => Err(DbalError::not_supported(
                "MySQL does not support default value constraints.",
            )),
        }
    }

    // =========================================================================
    // Loaders
    // =========================================================================

    async fn load_table_schema(&mut self, raw_name: &str) -> DbalResult<Option<Arc<TableSchema>>> {
        let mut table = self.resolve_table_name(raw_name);
        let sql = format!("SHOW FULL COLUMNS FROM {}", self.quote_full_name(&table));

        let rows = match self.conn.command().set_raw_sql(sql).query_all().await {
            Ok(rows) => rows,
            Err(e) if e.is_table_missing() => {
                debug!(table = %raw_name, "Table does not exist");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        for info in self.normalize_row_key_case(rows) {
            table = table.with_column(load_column_schema(&info));
        }

        Ok(Some(Arc::new(table)))
    }

    /// Run the combined constraint query and store primary key, foreign keys
    /// and uniques for the table, returning the requested kind.
    async fn load_table_constraints(
        &mut self,
        raw_name: &str,
        kind: MetadataKind,
    ) -> DbalResult<TableMetadata> {
        let table = self.resolve_table_name(raw_name);
        let rows = self
            .conn
            .command()
            .set_raw_sql(queries::mysql::TABLE_CONSTRAINTS)
            .bind_value(":schemaName", table.schema_name.clone())?
            .bind_value(":tableName", table.name.clone())?
            .query_all()
            .await?;
        let rows = self.normalize_row_key_case(rows);

        let mut primary_key = None;
        let mut foreign_keys = Vec::new();
        let mut uniques = Vec::new();

        let groups = group_rows(rows, |row| {
            (
                row.get_string("type").unwrap_or_default(),
                row.get_string("name").unwrap_or_default(),
            )
        });
        for ((constraint_type, name), group) in groups {
            let columns = column_values(&group, "column_name");
            match constraint_type.as_str() {
                "PRIMARY KEY" => primary_key = Some(Arc::new(Constraint::new(columns))),
                "FOREIGN KEY" => {
                    let first = &group[0];
                    let mut fk = ForeignKeyConstraint::new(
                        columns,
                        first.get_string("foreign_table_name").unwrap_or_default(),
                        column_values(&group, "foreign_column_name"),
                    )
                    .with_name(name)
                    .with_on_delete(ForeignKeyAction::parse(
                        &first.get_string("on_delete").unwrap_or_default(),
                    ))
                    .with_on_update(ForeignKeyAction::parse(
                        &first.get_string("on_update").unwrap_or_default(),
                    ));
                    if let Some(schema) = first.get_string("foreign_table_schema") {
                        fk = fk.with_foreign_schema(schema);
                    }
                    foreign_keys.push(fk);
                }
                "UNIQUE" => uniques.push(Constraint::new(columns).with_name(name)),
                other => debug!(constraint_type = %other, "Skipping unknown constraint type"),
            }
        }

        debug!(
            table = %raw_name,
            foreign_keys = foreign_keys.len(),
            uniques = uniques.len(),
            "Loaded table constraints"
        );

        let loaded = [
            TableMetadata::PrimaryKey(primary_key),
            TableMetadata::ForeignKeys(Arc::new(foreign_keys)),
            TableMetadata::Uniques(Arc::new(uniques)),
        ];
        let mut requested = None;
        for metadata in loaded {
            if metadata.kind() == kind {
                requested = Some(metadata.clone());
            }
            self.set_table_metadata(raw_name, metadata);
        }

        requested.ok_or_else(|| {
            DbalError::invalid_argument(format!("{:?} is not a constraint metadata kind", kind))
        })
    }

    async fn load_table_indexes(&mut self, raw_name: &str) -> DbalResult<Vec<IndexConstraint>> {
        let table = self.resolve_table_name(raw_name);
        let rows = self
            .conn
            .command()
            .set_raw_sql(queries::mysql::TABLE_INDEXES)
            .bind_value(":schemaName", table.schema_name.clone())?
            .bind_value(":tableName", table.name.clone())?
            .query_all()
            .await?;
        let rows = self.normalize_row_key_case(rows);

        let indexes = group_rows(rows, |row| row.get_string("name").unwrap_or_default())
            .into_iter()
            .map(|(name, group)| {
                let first = &group[0];
                let mut index = IndexConstraint::new(column_values(&group, "column_name"))
                    .with_unique(is_truthy(first.get("index_is_unique")))
                    .with_primary(is_truthy(first.get("index_is_primary")));
                if name != "PRIMARY" {
                    index = index.with_name(name);
                }
                index
            })
            .collect();
        Ok(indexes)
    }

    /// Lower-case row keys unless the driver already reports them lower-cased.
    fn normalize_row_key_case(&self, rows: Vec<Row>) -> Vec<Row> {
        if self.conn.column_case() == ColumnCase::Lower {
            return rows;
        }
        rows.into_iter().map(Row::lowercase_columns).collect()
    }
}

impl std::fmt::Debug for Schema<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("state", &self.conn.schema)
            .finish_non_exhaustive()
    }
}

/// Build a column from one `SHOW FULL COLUMNS` row with lower-cased keys.
pub fn load_column_schema(info: &Row) -> ColumnSchema {
    let db_type = info.get_string("type").unwrap_or_default();
    let parsed = types::parse_db_type(&db_type);
    let unsigned = db_type.to_lowercase().contains("unsigned");

    let mut column = ColumnSchema::new(info.get_string("field").unwrap_or_default(), &db_type)
        .with_type(parsed.column_type)
        .with_allow_null(info.get_string("null").as_deref() == Some("YES"))
        .with_primary_key(
            info.get_string("key")
                .is_some_and(|key| key.contains("PRI")),
        )
        .with_auto_increment(
            info.get_string("extra")
                .is_some_and(|extra| extra.to_lowercase().contains("auto_increment")),
        )
        .with_unsigned(unsigned)
        .with_comment(info.get_string("comment").unwrap_or_default());

    if let Some(values) = parsed.enum_values {
        column = column.with_enum_values(values);
    }
    if let Some(size) = parsed.size {
        column = column.with_size(size);
    }
    if let Some(scale) = parsed.scale {
        column = column.with_scale(scale);
    }

    if column.is_primary_key {
        return column;
    }
    let Some(default) = info.get_string("default") else {
        return column;
    };

    let is_temporal = matches!(
        column.column_type,
        ColumnType::Timestamp | ColumnType::DateTime
    );
    if let Some(expression) = types::current_timestamp_expression(&default).filter(|_| is_temporal)
    {
        column.with_default(ColumnDefault::Expression(expression))
    } else if parsed.base == "bit" {
        match types::parse_bit_default(&default) {
            Some(bits) => column.with_default(ColumnDefault::Literal(DbValue::UInt(bits))),
            None => column,
        }
    } else {
        match types::typecast_default(column.column_type, unsigned, &default) {
            Some(value) => column.with_default(ColumnDefault::Literal(value)),
            None => column,
        }
    }
}

/// Group rows by key, keeping first-appearance order of keys and rows.
fn group_rows<K, F>(rows: Vec<Row>, key: F) -> Vec<(K, Vec<Row>)>
where
    K: PartialEq,
    F: Fn(&Row) -> K,
{
    let mut groups: Vec<(K, Vec<Row>)> = Vec::new();
    for row in rows {
        let k = key(&row);
        match groups.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, group)) => group.push(row),
            None => groups.push((k, vec![row])),
        }
    }
    groups
}

fn column_values(rows: &[Row], column: &str) -> Vec<String> {
    rows.iter().filter_map(|row| row.get_string(column)).collect()
}

fn is_truthy(value: Option<&DbValue>) -> bool {
    match value {
        Some(DbValue::Bool(b)) => *b,
        Some(v) => v.as_i64().is_some_and(|i| i != 0) || v.as_str() == Some("1"),
        None => false,
    }
}
