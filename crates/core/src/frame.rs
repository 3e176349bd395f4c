use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::record::Record;
use crate::value::Value;

/// An ordered sequence of records under a common column schema.
///
/// Column order is preserved for output. Equality ignores it: two frames are
/// equal when they carry the same column set and the same rows in the same
/// order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Frame {
    pub fn new() -> Self {
        Frame::default()
    }

    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut frame = Frame::new();
        for col in columns {
            frame.add_column(col.into());
        }
        frame
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Append a column at the end of the schema if not already present.
    pub fn add_column(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.has_column(&name) {
            self.columns.push(name);
        }
    }

    /// Push a record, extending the schema with any fields it introduces.
    pub fn push(&mut self, record: Record) {
        let mut new_cols: Vec<String> = record
            .field_names()
            .filter(|f| !self.has_column(f))
            .map(|f| f.to_string())
            .collect();
        new_cols.sort();
        for col in new_cols {
            self.columns.push(col);
        }
        self.rows.push(record);
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Record] {
        &mut self.rows
    }

    pub fn row(&self, idx: usize) -> &Record {
        &self.rows[idx]
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    /// Per-row values of one column, `Absent` where unset.
    pub fn column_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> {
        self.rows.iter().map(move |r| r.get(name))
    }

    /// The set of distinct non-absent values in one column.
    pub fn distinct_values(&self, name: &str) -> HashSet<Value> {
        self.rows
            .iter()
            .map(|r| r.get(name))
            .filter(|v| !v.is_absent())
            .cloned()
            .collect()
    }

    /// Split rows by predicate into (matching, rest), both keeping this
    /// frame's column order.
    pub fn partition<F>(&self, pred: F) -> (Frame, Frame)
    where
        F: Fn(&Record) -> bool,
    {
        let mut yes = Frame::with_columns(self.columns.iter().cloned());
        let mut no = Frame::with_columns(self.columns.iter().cloned());
        for row in &self.rows {
            if pred(row) {
                yes.rows.push(row.clone());
            } else {
                no.rows.push(row.clone());
            }
        }
        (yes, no)
    }

    /// A new frame containing only rows matching the predicate.
    pub fn filter<F>(&self, pred: F) -> Frame
    where
        F: Fn(&Record) -> bool,
    {
        self.partition(pred).0
    }

    /// Append all rows of `other`, merging its schema into this one.
    pub fn extend(&mut self, other: Frame) {
        for col in other.columns {
            self.add_column(col);
        }
        self.rows.extend(other.rows);
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        if self.rows.len() != other.rows.len() {
            return false;
        }
        let a: HashSet<&str> = self.columns.iter().map(|c| c.as_str()).collect();
        let b: HashSet<&str> = other.columns.iter().map(|c| c.as_str()).collect();
        a == b && self.rows == other.rows
    }
}

impl FromIterator<Record> for Frame {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        let mut frame = Frame::new();
        for record in iter {
            frame.push(record);
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, name: &str) -> Record {
        Record::new().with("id", id).with("name", name)
    }

    #[test]
    fn push_extends_schema() {
        let mut f = Frame::new();
        f.push(row(1, "a"));
        assert!(f.has_column("id"));
        assert!(f.has_column("name"));
        f.push(Record::new().with("id", 2i64).with("extra", "x"));
        assert!(f.has_column("extra"));
        assert_eq!(f.len(), 2);
    }

    #[test]
    fn equality_ignores_column_order() {
        let mut a = Frame::with_columns(["id", "name"]);
        let mut b = Frame::with_columns(["name", "id"]);
        a.push(row(1, "a"));
        b.push(row(1, "a"));
        assert_eq!(a, b);
    }

    #[test]
    fn partition_splits_rows() {
        let f: Frame = vec![row(1, "a"), row(2, "b"), row(3, "c")]
            .into_iter()
            .collect();
        let (even, odd) = f.partition(|r| matches!(r.get("id"), Value::Int(n) if n % 2 == 0));
        assert_eq!(even.len(), 1);
        assert_eq!(odd.len(), 2);
        assert_eq!(even.columns(), f.columns());
    }

    #[test]
    fn distinct_values_skips_absent() {
        let mut f = Frame::new();
        f.push(row(1, "a"));
        f.push(row(1, "b"));
        f.push(Record::new().with("name", "c"));
        let ids = f.distinct_values("id");
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(&Value::Int(1)));
    }
}
