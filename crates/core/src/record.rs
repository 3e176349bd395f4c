use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A point in the project's planar reference system. Plain x/y payload;
/// CRS context lives with the geometry layer that constructs these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointXY {
    pub x: f64,
    pub y: f64,
}

impl PointXY {
    pub fn new(x: f64, y: f64) -> Self {
        PointXY { x, y }
    }

    /// The same point with coordinate axes exchanged.
    pub fn swapped(&self) -> Self {
        PointXY {
            x: self.y,
            y: self.x,
        }
    }
}

/// One extracted entry: named scalar fields plus optional point geometry.
///
/// Fields not present read as [`Value::Absent`]; setting a field to `Absent`
/// is equivalent to the field never having been set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: HashMap<String, Value>,
    pub geometry: Option<PointXY>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    pub fn get(&self, name: &str) -> &Value {
        static ABSENT: Value = Value::Absent;
        self.fields.get(name).unwrap_or(&ABSENT)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        if value.is_absent() {
            self.fields.remove(&name.into());
        } else {
            self.fields.insert(name.into(), value);
        }
    }

    pub fn remove(&mut self, name: &str) -> Value {
        self.fields.remove(name).unwrap_or(Value::Absent)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn has_geometry(&self) -> bool {
        self.geometry.is_some()
    }

    /// Builder-style field insertion, used heavily in tests.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn with_geometry(mut self, x: f64, y: f64) -> Self {
        self.geometry = Some(PointXY::new(x, y));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_read_absent() {
        let r = Record::new().with("id", 1i64);
        assert_eq!(r.get("id"), &Value::Int(1));
        assert_eq!(r.get("missing"), &Value::Absent);
        assert!(!r.has_field("missing"));
    }

    #[test]
    fn setting_absent_clears_field() {
        let mut r = Record::new().with("name", "a");
        r.set("name", Value::Absent);
        assert!(!r.has_field("name"));
        assert_eq!(r.get("name"), &Value::Absent);
    }

    #[test]
    fn swapped_point_exchanges_axes() {
        let p = PointXY::new(10.0, 50.0);
        let s = p.swapped();
        assert_eq!(s.x, 50.0);
        assert_eq!(s.y, 10.0);
    }
}
