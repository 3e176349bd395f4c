// SQLite row store

use std::path::Path;

use log::{debug, info};
use rusqlite::Connection;

use geosync_core::{Frame, Record, Value};
use geosync_recon::ReconPlan;

use crate::error::StoreError;
use crate::RecordStore;

/// One table per configured unit. Keys may repeat (occurrence rows), so the
/// table carries no uniqueness constraint; positional identity is rowid
/// order, which matches insertion order.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    table: String,
}

impl SqliteStore {
    pub fn open(path: &Path, table: &str) -> Result<Self, StoreError> {
        if !is_valid_ident(table) {
            return Err(StoreError::Backend(format!(
                "invalid table name '{table}'"
            )));
        }
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Backend(format!("{}: {e}", path.display())))?;
        Ok(SqliteStore {
            conn,
            table: table.to_string(),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory(table: &str) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(SqliteStore {
            conn,
            table: table.to_string(),
        })
    }

    fn table_exists(&self) -> Result<bool, StoreError> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [&self.table],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(count > 0)
    }
}

impl RecordStore for SqliteStore {
    fn load_all(&self, _key: &str) -> Result<Frame, StoreError> {
        if !self.table_exists()? {
            return Ok(Frame::new());
        }

        let sql = format!("SELECT * FROM {} ORDER BY rowid", quote_ident(&self.table));
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut frame = Frame::with_columns(columns.iter().cloned());
        let mut rows = stmt
            .query([])
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        while let Some(row) = rows.next().map_err(|e| StoreError::Backend(e.to_string()))? {
            let mut record = Record::new();
            for (idx, col) in columns.iter().enumerate() {
                let value = match row
                    .get_ref(idx)
                    .map_err(|e| StoreError::Backend(e.to_string()))?
                {
                    rusqlite::types::ValueRef::Null => Value::Absent,
                    rusqlite::types::ValueRef::Integer(n) => Value::Int(n),
                    rusqlite::types::ValueRef::Real(n) => Value::from(n),
                    rusqlite::types::ValueRef::Text(t) => {
                        Value::Text(String::from_utf8_lossy(t).into_owned())
                    }
                    rusqlite::types::ValueRef::Blob(_) => Value::Absent,
                };
                record.set(col.clone(), value);
            }
            frame.push(record);
        }
        debug!("loaded {} entries from table {}", frame.len(), self.table);
        Ok(frame)
    }

    fn commit(&mut self, plan: &ReconPlan) -> Result<(), StoreError> {
        info!(
            "inserting {} new entries, updating {} existing entries in {}",
            plan.inserts.len(),
            plan.updated_row_count(),
            self.table
        );

        let existed = self.table_exists()?;
        let tx = self
            .conn
            .transaction()
            .map_err(|e| StoreError::Commit(e.to_string()))?;

        let mut columns: Vec<String> = plan.merged.columns().to_vec();
        for col in plan.inserts.columns() {
            if !columns.iter().any(|c| c == col) {
                columns.push(col.clone());
            }
        }

        if !existed {
            let defs: Vec<String> = columns
                .iter()
                .map(|c| format!("{} {}", quote_ident(c), infer_sql_type(plan, c)))
                .collect();
            tx.execute(
                &format!(
                    "CREATE TABLE {} ({})",
                    quote_ident(&self.table),
                    defs.join(", ")
                ),
                [],
            )
            .map_err(|e| StoreError::Commit(e.to_string()))?;
        } else {
            add_missing_columns(&tx, &self.table, &columns, plan)?;
        }

        // Updates address persisted rows positionally through rowid order.
        if plan.updated_row_count() > 0 {
            let rowids = collect_rowids(&tx, &self.table)?;
            if rowids.len() != plan.update_mask.len() {
                return Err(StoreError::Commit(format!(
                    "table {} holds {} rows but the plan was built against {}",
                    self.table,
                    rowids.len(),
                    plan.update_mask.len()
                )));
            }

            let assignments: Vec<String> = columns
                .iter()
                .map(|c| format!("{} = ?", quote_ident(c)))
                .collect();
            let sql = format!(
                "UPDATE {} SET {} WHERE rowid = ?",
                quote_ident(&self.table),
                assignments.join(", ")
            );
            let mut stmt = tx
                .prepare(&sql)
                .map_err(|e| StoreError::Commit(e.to_string()))?;

            for (i, rowid) in rowids.iter().enumerate() {
                if !plan.update_mask[i] {
                    continue;
                }
                let row = plan.merged.row(i);
                let mut params: Vec<rusqlite::types::Value> =
                    columns.iter().map(|c| to_sql_value(row.get(c))).collect();
                params.push(rusqlite::types::Value::Integer(*rowid));
                stmt.execute(rusqlite::params_from_iter(params))
                    .map_err(|e| StoreError::Commit(e.to_string()))?;
            }
        }

        if !plan.inserts.is_empty() {
            let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
            let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(&self.table),
                names.join(", "),
                placeholders.join(", ")
            );
            let mut stmt = tx
                .prepare(&sql)
                .map_err(|e| StoreError::Commit(e.to_string()))?;
            for row in plan.inserts.rows() {
                let params: Vec<rusqlite::types::Value> =
                    columns.iter().map(|c| to_sql_value(row.get(c))).collect();
                stmt.execute(rusqlite::params_from_iter(params))
                    .map_err(|e| StoreError::Commit(e.to_string()))?;
            }
        }

        tx.commit().map_err(|e| StoreError::Commit(e.to_string()))
    }
}

fn collect_rowids(conn: &Connection, table: &str) -> Result<Vec<i64>, StoreError> {
    let sql = format!("SELECT rowid FROM {} ORDER BY rowid", quote_ident(table));
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StoreError::Commit(e.to_string()))?;
    let rowids = stmt
        .query_map([], |row| row.get::<_, i64>(0))
        .map_err(|e| StoreError::Commit(e.to_string()))?
        .collect::<Result<Vec<i64>, _>>()
        .map_err(|e| StoreError::Commit(e.to_string()))?;
    Ok(rowids)
}

fn add_missing_columns(
    conn: &Connection,
    table: &str,
    columns: &[String],
    plan: &ReconPlan,
) -> Result<(), StoreError> {
    let sql = format!("PRAGMA table_info({})", quote_ident(table));
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StoreError::Commit(e.to_string()))?;
    let existing = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| StoreError::Commit(e.to_string()))?
        .collect::<Result<Vec<String>, _>>()
        .map_err(|e| StoreError::Commit(e.to_string()))?;

    for col in columns {
        if !existing.iter().any(|c| c == col) {
            debug!("adding column {col} to table {table}");
            conn.execute(
                &format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    quote_ident(table),
                    quote_ident(col),
                    infer_sql_type(plan, col)
                ),
                [],
            )
            .map_err(|e| StoreError::Commit(e.to_string()))?;
        }
    }
    Ok(())
}

/// Map the first non-absent value in a plan column onto a SQLite type
/// affinity, TEXT when the column never carries a value.
fn infer_sql_type(plan: &ReconPlan, column: &str) -> &'static str {
    let first = plan
        .merged
        .column_values(column)
        .chain(plan.inserts.column_values(column))
        .find(|v| !v.is_absent());
    match first {
        Some(Value::Int(_)) => "INTEGER",
        Some(Value::Num(_)) => "REAL",
        _ => "TEXT",
    }
}

fn to_sql_value(v: &Value) -> rusqlite::types::Value {
    match v {
        Value::Absent => rusqlite::types::Value::Null,
        Value::Int(n) => rusqlite::types::Value::Integer(*n),
        Value::Num(n) => rusqlite::types::Value::Real(n.0),
        Value::Text(s) => rusqlite::types::Value::Text(s.clone()),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn is_valid_ident(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
