use std::fs;

use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params, params_from_iter};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{WarehouseConfig, is_reserved_schema, is_valid_identifier};
use crate::error::WarehouseError;
use crate::normalize::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetStatus {
    Existing,
    Created,
}

/// What the pipeline and the view layer need from a relational store.
pub trait Warehouse {
    fn dataset_id(&self) -> &str;

    /// Makes the dataset available, creating it when absent.
    fn ensure_dataset(&mut self) -> Result<DatasetStatus, WarehouseError>;

    /// Replaces the table's full contents with `rows`. Returns rows written.
    fn write_truncate(&mut self, table: &str, rows: &[Row]) -> Result<usize, WarehouseError>;

    fn execute(&mut self, sql: &str) -> Result<(), WarehouseError>;
}

pub struct SqliteWarehouse {
    conn: Connection,
    config: WarehouseConfig,
    attached: bool,
}

impl SqliteWarehouse {
    pub fn open(config: &WarehouseConfig) -> Result<Self, WarehouseError> {
        if !is_valid_identifier(&config.dataset_id) || is_reserved_schema(&config.dataset_id) {
            return Err(WarehouseError::InvalidIdentifier(config.dataset_id.clone()));
        }
        fs::create_dir_all(&config.dir).map_err(|source| WarehouseError::Io {
            path: config.dir.clone(),
            source,
        })?;
        let conn = Connection::open(config.project_path())?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Ok(Self {
            conn,
            config: config.clone(),
            attached: false,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    pub fn table_names(&self) -> Result<Vec<String>, WarehouseError> {
        self.require_attached()?;
        let sql = format!(
            "SELECT name FROM {}.sqlite_master WHERE type = 'table' AND name NOT LIKE '\\_%' ESCAPE '\\' ORDER BY name",
            quote_ident(&self.config.dataset_id)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn row_count(&self, table: &str) -> Result<i64, WarehouseError> {
        let qualified = self.qualified(table)?;
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {qualified}"), [], |row| {
                row.get::<_, i64>(0)
            })?;
        Ok(count)
    }

    pub fn qualified(&self, table: &str) -> Result<String, WarehouseError> {
        self.require_attached()?;
        if !is_valid_identifier(table) {
            return Err(WarehouseError::InvalidIdentifier(table.to_string()));
        }
        Ok(format!(
            "{}.{}",
            quote_ident(&self.config.dataset_id),
            quote_ident(table)
        ))
    }

    fn require_attached(&self) -> Result<(), WarehouseError> {
        if self.attached {
            Ok(())
        } else {
            Err(WarehouseError::DatasetNotAttached(
                self.config.dataset_id.clone(),
            ))
        }
    }

    fn is_schema_attached(&self) -> Result<bool, WarehouseError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM pragma_database_list WHERE name = ?1",
            params![self.config.dataset_id],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(count > 0)
    }
}

impl Warehouse for SqliteWarehouse {
    fn dataset_id(&self) -> &str {
        &self.config.dataset_id
    }

    fn ensure_dataset(&mut self) -> Result<DatasetStatus, WarehouseError> {
        let path = self.config.dataset_path();
        let existed = path.exists();
        if !self.is_schema_attached()? {
            self.conn.execute(
                &format!(
                    "ATTACH DATABASE ?1 AS {}",
                    quote_ident(&self.config.dataset_id)
                ),
                params![path.to_string_lossy().into_owned()],
            )?;
        }
        self.attached = true;

        let schema = quote_ident(&self.config.dataset_id);
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {schema}._dataset_info (
                dataset_id TEXT NOT NULL,
                location TEXT NOT NULL,
                created_at TEXT NOT NULL
            );"
        ))?;
        if existed {
            debug!(dataset = %self.config.dataset_id, "dataset exists");
            return Ok(DatasetStatus::Existing);
        }

        self.conn.execute(
            &format!(
                "INSERT INTO {schema}._dataset_info (dataset_id, location, created_at) VALUES (?1, ?2, ?3)"
            ),
            params![
                self.config.dataset_id,
                self.config.location,
                Utc::now().to_rfc3339()
            ],
        )?;
        info!(
            dataset = %self.config.dataset_id,
            location = %self.config.location,
            path = %path.display(),
            "dataset created"
        );
        Ok(DatasetStatus::Created)
    }

    fn write_truncate(&mut self, table: &str, rows: &[Row]) -> Result<usize, WarehouseError> {
        let qualified = self.qualified(table)?;
        let columns = infer_columns(rows);
        if columns.is_empty() {
            return Err(WarehouseError::EmptySchema(table.to_string()));
        }

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {qualified};\n{}",
            create_table_sql(&qualified, &columns)
        ))?;
        {
            let mut stmt = tx.prepare(&insert_sql(&qualified, &columns))?;
            for row in rows {
                let values = columns
                    .iter()
                    .map(|col| to_sql_value(row.get(&col.name)))
                    .collect::<Vec<_>>();
                stmt.execute(params_from_iter(values.iter()))?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    fn execute(&mut self, sql: &str) -> Result<(), WarehouseError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    /// Only nulls seen; the column is declared without a type.
    Untyped,
}

impl ColumnType {
    fn declared(self) -> &'static str {
        match self {
            ColumnType::Integer => " INTEGER",
            ColumnType::Real => " REAL",
            ColumnType::Text => " TEXT",
            ColumnType::Untyped => "",
        }
    }

    fn of(value: &Value) -> Self {
        match value {
            Value::Null => ColumnType::Untyped,
            Value::Bool(_) => ColumnType::Integer,
            Value::Number(n) if n.is_i64() => ColumnType::Integer,
            Value::Number(_) => ColumnType::Real,
            Value::String(_) | Value::Array(_) | Value::Object(_) => ColumnType::Text,
        }
    }

    fn merge(self, other: Self) -> Self {
        use ColumnType::*;
        match (self, other) {
            (Untyped, t) | (t, Untyped) => t,
            (a, b) if a == b => a,
            (Integer, Real) | (Real, Integer) => Real,
            _ => Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

/// Union of the row-set's keys in first-seen order, typed by the values seen.
pub fn infer_columns(rows: &[Row]) -> Vec<Column> {
    let mut columns: Vec<Column> = Vec::new();
    for row in rows {
        for (name, value) in row {
            let kind = ColumnType::of(value);
            match columns.iter_mut().find(|c| &c.name == name) {
                Some(col) => col.kind = col.kind.merge(kind),
                None => columns.push(Column {
                    name: name.clone(),
                    kind,
                }),
            }
        }
    }
    columns
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(qualified: &str, columns: &[Column]) -> String {
    let defs = columns
        .iter()
        .map(|c| format!("{}{}", quote_ident(&c.name), c.kind.declared()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {qualified} ({defs});")
}

fn insert_sql(qualified: &str, columns: &[Column]) -> String {
    let names = columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let slots = (1..=columns.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {qualified} ({names}) VALUES ({slots})")
}

fn to_sql_value(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(nested) => SqlValue::Text(nested.to_string()),
    }
}
