// Whole-file GeoJSON store

use std::path::PathBuf;

use log::{debug, info};
use serde_json::{json, Map};

use geosync_core::{Frame, PointXY, Record, Value};
use geosync_recon::ReconPlan;

use crate::error::StoreError;
use crate::RecordStore;

/// File-backed store holding one unit as a GeoJSON `FeatureCollection`.
///
/// Commit materializes the post-plan table, writes it to a temporary file
/// next to the target and renames over it, so a crash mid-write leaves the
/// previous committed state intact.
pub struct GeoJsonStore {
    path: PathBuf,
}

impl GeoJsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        GeoJsonStore { path: path.into() }
    }
}

impl RecordStore for GeoJsonStore {
    fn load_all(&self, _key: &str) -> Result<Frame, StoreError> {
        if !self.path.exists() {
            return Ok(Frame::new());
        }

        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| StoreError::Backend(format!("{}: {e}", self.path.display())))?;
        let doc: serde_json::Value =
            serde_json::from_str(&raw).map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut frame = Frame::new();
        let features = doc
            .get("features")
            .and_then(|f| f.as_array())
            .ok_or_else(|| {
                StoreError::Backend(format!(
                    "{} is not a FeatureCollection",
                    self.path.display()
                ))
            })?;

        for feature in features {
            let mut record = Record::new();
            if let Some(props) = feature.get("properties").and_then(|p| p.as_object()) {
                for (name, value) in props {
                    // register the column even when every value is null
                    frame.add_column(name.clone());
                    record.set(name.clone(), json_to_value(value));
                }
            }
            if let Some(coords) = feature
                .get("geometry")
                .and_then(|g| g.get("coordinates"))
                .and_then(|c| c.as_array())
            {
                if let (Some(x), Some(y)) = (
                    coords.first().and_then(|v| v.as_f64()),
                    coords.get(1).and_then(|v| v.as_f64()),
                ) {
                    record.geometry = Some(PointXY::new(x, y));
                }
            }
            frame.push(record);
        }

        debug!(
            "loaded {} entries from {}",
            frame.len(),
            self.path.display()
        );
        Ok(frame)
    }

    fn commit(&mut self, plan: &ReconPlan) -> Result<(), StoreError> {
        info!(
            "inserting {} new entries, updating {} existing entries in {}",
            plan.inserts.len(),
            plan.updated_row_count(),
            self.path.display()
        );

        let persisted = self.load_all("")?;
        if persisted.len() != plan.update_mask.len() {
            return Err(StoreError::Commit(format!(
                "{} holds {} entries but the plan was built against {}",
                self.path.display(),
                persisted.len(),
                plan.update_mask.len()
            )));
        }
        let next = plan.apply_to(&persisted);

        let features: Vec<serde_json::Value> = next
            .rows()
            .iter()
            .map(|record| feature_from_record(record, next.columns()))
            .collect();
        let doc = json!({
            "type": "FeatureCollection",
            "features": features,
        });

        let tmp = self.path.with_extension("tmp");
        let rendered = serde_json::to_string_pretty(&doc)
            .map_err(|e| StoreError::Commit(e.to_string()))?;
        std::fs::write(&tmp, rendered)
            .map_err(|e| StoreError::Commit(format!("{}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| StoreError::Commit(format!("{}: {e}", self.path.display())))
    }
}

fn feature_from_record(record: &Record, columns: &[String]) -> serde_json::Value {
    let mut props = Map::new();
    for col in columns {
        props.insert(col.clone(), value_to_json(record.get(col)));
    }
    let geometry = match record.geometry {
        Some(p) => json!({ "type": "Point", "coordinates": [p.x, p.y] }),
        None => serde_json::Value::Null,
    };
    json!({
        "type": "Feature",
        "properties": props,
        "geometry": geometry,
    })
}

fn json_to_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Absent,
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::from(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Bool(b) => Value::Text(b.to_string()),
        _ => Value::Absent,
    }
}

fn value_to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Absent => serde_json::Value::Null,
        Value::Int(n) => json!(n),
        Value::Num(n) => json!(n.0),
        Value::Text(s) => json!(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geosync_recon::reconcile;

    fn row(id: i64, name: &str, x: f64, y: f64) -> Record {
        Record::new()
            .with("id", id)
            .with("name", name)
            .with("x", x)
            .with("y", y)
            .with_geometry(x, y)
    }

    fn sync(store: &mut GeoJsonStore, incoming: &Frame) -> Frame {
        let persisted = store.load_all("id").unwrap();
        let plan = reconcile(&persisted, incoming, "id").unwrap();
        store.commit(&plan).unwrap();
        store.load_all("id").unwrap()
    }

    #[test]
    fn round_trips_records_and_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = GeoJsonStore::new(dir.path().join("events.geojson"));

        let incoming: Frame = vec![row(1, "A", 1050.0, 730.0)].into_iter().collect();
        let state = sync(&mut store, &incoming);

        assert_eq!(state.len(), 1);
        assert_eq!(state.row(0).get("name"), &Value::from("A"));
        let g = state.row(0).geometry.unwrap();
        assert_eq!(g.x, 1050.0);
        assert_eq!(g.y, 730.0);
    }

    #[test]
    fn update_rewrites_file_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = GeoJsonStore::new(dir.path().join("events.geojson"));

        sync(
            &mut store,
            &vec![row(1, "A", 1.0, 0.5), row(2, "B", 2.0, 0.5)]
                .into_iter()
                .collect(),
        );
        let state = sync(
            &mut store,
            &vec![row(2, "B2", 2.0, 0.5), row(3, "C", 3.0, 0.5)]
                .into_iter()
                .collect(),
        );

        assert_eq!(state.len(), 3);
        assert_eq!(state.row(1).get("name"), &Value::from("B2"));
        assert_eq!(state.row(2).get("name"), &Value::from("C"));
        assert!(!dir.path().join("events.tmp").exists());
    }

    #[test]
    fn null_properties_keep_their_column() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = GeoJsonStore::new(dir.path().join("events.geojson"));

        let incoming: Frame = vec![
            Record::new().with("id", 1i64).with("note", "n"),
            Record::new().with("id", 2i64),
        ]
        .into_iter()
        .collect();
        let state = sync(&mut store, &incoming);

        assert!(state.has_column("note"));
        assert_eq!(state.row(1).get("note"), &Value::Absent);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = GeoJsonStore::new(dir.path().join("nothing.geojson"));
        let frame = store.load_all("id").unwrap();
        assert!(frame.is_empty());
    }
}
