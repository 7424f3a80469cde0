//! Ephemeral Relational Store: one throwaway SQLite database per request.
//!
//! The store is backed by a temp file so the final query runs against
//! exactly what SQLite persisted, and teardown (connection closed, file
//! removed) happens on every exit path through `Drop`. A teardown
//! failure is logged and ignored, never propagated.

use crate::decode::DecodedTable;
use log::warn;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;
use serde_json::{Number, Value};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub struct EphemeralStore {
    // Declared before `backing` so the connection closes before the file
    // handle goes away.
    conn: Connection,
    path: PathBuf,
    backing: Option<NamedTempFile>,
}

impl EphemeralStore {
    /// Creates a request-scoped store on a fresh temp file.
    pub fn create() -> Result<Self, crate::error::PipelineError> {
        let backing = tempfile::Builder::new()
            .prefix("askcsv-")
            .suffix(".db")
            .tempfile()
            .map_err(crate::error::PipelineError::StoreIo)?;
        let path = backing.path().to_path_buf();
        let conn = Connection::open(&path).map_err(crate::error::PipelineError::Store)?;

        Ok(Self {
            conn,
            path,
            backing: Some(backing),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Materializes a decoded table, replacing any prior table of the
    /// same name. Column affinity comes from scanning the values, and
    /// each value is bound best-effort: empty string as NULL, integer
    /// and float parses as numbers, everything else as text.
    pub fn load_table(&mut self, name: &str, table: &DecodedTable) -> Result<(), rusqlite::Error> {
        let quoted = quote_identifier(name);
        let tx = self.conn.transaction()?;

        tx.execute(&format!("DROP TABLE IF EXISTS {}", quoted), [])?;

        let column_defs: Vec<String> = table
            .columns
            .iter()
            .zip(infer_affinities(table))
            .map(|(column, affinity)| format!("{} {}", quote_identifier(column), affinity))
            .collect();
        tx.execute(
            &format!("CREATE TABLE {} ({})", quoted, column_defs.join(", ")),
            [],
        )?;

        let placeholders: Vec<String> = (1..=table.columns.len())
            .map(|i| format!("?{}", i))
            .collect();
        let insert = format!("INSERT INTO {} VALUES ({})", quoted, placeholders.join(", "));
        {
            let mut stmt = tx.prepare(&insert)?;
            for row in &table.rows {
                let values = row.iter().map(|value| coerce_value(value));
                stmt.execute(rusqlite::params_from_iter(values))?;
            }
        }

        tx.commit()
    }

    /// Column names as SQLite itself reports them, in stored order.
    pub fn introspect_columns(&self, name: &str) -> Result<Vec<String>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_identifier(name)))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    /// Runs the final query and returns its column names and rows as
    /// JSON-ready values.
    pub fn execute(&self, sql: &str) -> Result<(Vec<String>, Vec<Vec<Value>>), rusqlite::Error> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let column_count = stmt.column_count();

        let mut out = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for index in 0..column_count {
                values.push(json_value(row.get_ref(index)?));
            }
            out.push(values);
        }

        Ok((columns, out))
    }
}

impl Drop for EphemeralStore {
    fn drop(&mut self) {
        if let Some(backing) = self.backing.take() {
            if let Err(err) = backing.close() {
                warn!("failed to remove ephemeral store file: {}", err);
            }
        }
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Scans each column's values: all-integer columns get INTEGER affinity,
/// all-numeric get REAL, anything else TEXT. Empty cells are ignored,
/// they load as NULL regardless.
fn infer_affinities(table: &DecodedTable) -> Vec<&'static str> {
    (0..table.columns.len())
        .map(|index| {
            let mut non_empty = 0usize;
            let mut all_integer = true;
            let mut all_real = true;
            for row in &table.rows {
                let value = row[index].trim();
                if value.is_empty() {
                    continue;
                }
                non_empty += 1;
                if value.parse::<i64>().is_err() {
                    all_integer = false;
                }
                if value.parse::<f64>().is_err() {
                    all_real = false;
                }
            }
            if non_empty == 0 {
                "TEXT"
            } else if all_integer {
                "INTEGER"
            } else if all_real {
                "REAL"
            } else {
                "TEXT"
            }
        })
        .collect()
}

fn coerce_value(raw: &str) -> SqlValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return SqlValue::Null;
    }
    if let Ok(integer) = trimmed.parse::<i64>() {
        return SqlValue::Integer(integer);
    }
    if let Ok(real) = trimmed.parse::<f64>() {
        if real.is_finite() {
            return SqlValue::Real(real);
        }
    }
    SqlValue::Text(raw.to_string())
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(blob) => Value::String(String::from_utf8_lossy(blob).into_owned()),
    }
}
