use std::collections::HashSet;

use log::{debug, info};

use geosync_core::{Frame, Value};

use crate::error::ReconError;
use crate::merge;
use crate::model::ReconPlan;

/// Classify an incoming batch against the persisted frame and produce the
/// commit plan: insert set, update set, persisted-aligned merged rows and
/// the update mask.
///
/// Every incoming row ends in exactly one of `inserts`/`updates`. The engine
/// performs no retries and never touches the store; classify → merge →
/// reclassify-unmatched → emit.
pub fn reconcile(persisted: &Frame, incoming: &Frame, key: &str) -> Result<ReconPlan, ReconError> {
    if !incoming.has_column(key) {
        return Err(ReconError::MissingKeyColumn {
            side: "incoming",
            column: key.to_string(),
        });
    }

    // A store with no committed state yet presents an empty schema; the
    // whole batch inserts.
    if persisted.columns().is_empty() {
        return Ok(ReconPlan {
            inserts: incoming.clone(),
            updates: Frame::with_columns(incoming.columns().iter().cloned()),
            merged: Frame::new(),
            update_mask: Vec::new(),
        });
    }

    if !persisted.has_column(key) {
        return Err(ReconError::MissingKeyColumn {
            side: "persisted",
            column: key.to_string(),
        });
    }

    // Membership: a candidate updates iff its key value is already
    // persisted. Rows with an absent key can never match and insert.
    let persisted_keys: HashSet<&Value> = persisted
        .column_values(key)
        .filter(|v| !v.is_absent())
        .collect();

    let (updates, inserts) =
        incoming.partition(|r| !r.get(key).is_absent() && persisted_keys.contains(r.get(key)));
    debug!(
        "classified {} updates, {} inserts of {} incoming",
        updates.len(),
        inserts.len(),
        incoming.len()
    );

    let update_keys: HashSet<&Value> = updates.column_values(key).collect();
    let update_mask: Vec<bool> = persisted
        .column_values(key)
        .map(|v| !v.is_absent() && update_keys.contains(v))
        .collect();

    let outcome = merge::merge(persisted, &updates, key);

    // Candidate occurrences without a persisted slot move to the insert
    // path; nothing is silently dropped.
    let (updates, inserts) = if outcome.promoted.is_empty() {
        (updates, inserts)
    } else {
        info!(
            "promoting {} unmatched occurrences to inserts",
            outcome.promoted.len()
        );
        let promoted: HashSet<usize> = outcome.promoted.iter().copied().collect();
        let mut kept = Frame::with_columns(updates.columns().iter().cloned());
        let mut inserts = inserts;
        for (i, row) in updates.rows().iter().enumerate() {
            if promoted.contains(&i) {
                inserts.push(row.clone());
            } else {
                kept.push(row.clone());
            }
        }
        (kept, inserts)
    };

    Ok(ReconPlan {
        inserts,
        updates,
        merged: outcome.merged,
        update_mask,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geosync_core::Record;

    fn row(id: i64, name: &str) -> Record {
        Record::new().with("id", id).with("name", name)
    }

    fn frame(rows: Vec<Record>) -> Frame {
        rows.into_iter().collect()
    }

    #[test]
    fn worked_example() {
        // persisted [{1,A},{2,B}] + incoming [{2,B2},{3,C}]
        let persisted = frame(vec![row(1, "A"), row(2, "B")]);
        let incoming = frame(vec![row(2, "B2"), row(3, "C")]);

        let plan = reconcile(&persisted, &incoming, "id").unwrap();
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates.row(0).get("name"), &Value::from("B2"));
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts.row(0).get("name"), &Value::from("C"));
        assert_eq!(plan.update_mask, vec![false, true]);
        assert_eq!(plan.merged.row(1).get("name"), &Value::from("B2"));
    }

    #[test]
    fn missing_key_in_incoming_is_schema_error() {
        let persisted = frame(vec![row(1, "A")]);
        let incoming = frame(vec![Record::new().with("name", "B")]);
        let err = reconcile(&persisted, &incoming, "id").unwrap_err();
        assert!(err.to_string().contains("incoming"));
    }

    #[test]
    fn missing_key_in_persisted_is_schema_error() {
        let persisted = frame(vec![Record::new().with("name", "A")]);
        let incoming = frame(vec![row(1, "B")]);
        let err = reconcile(&persisted, &incoming, "id").unwrap_err();
        assert!(err.to_string().contains("persisted"));
    }

    #[test]
    fn empty_store_inserts_everything() {
        let persisted = Frame::new();
        let incoming = frame(vec![row(1, "A"), row(2, "B")]);
        let plan = reconcile(&persisted, &incoming, "id").unwrap();
        assert_eq!(plan.inserts.len(), 2);
        assert!(plan.updates.is_empty());
        assert!(plan.update_mask.is_empty());
    }

    #[test]
    fn absent_key_rows_always_insert() {
        let persisted = frame(vec![row(1, "A")]);
        let incoming = frame(vec![Record::new().with("name", "B"), row(1, "A2")]);
        // incoming carries the key column via the second row
        let plan = reconcile(&persisted, &incoming, "id").unwrap();
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.updates.len(), 1);
    }

    #[test]
    fn unmatched_occurrence_promotion() {
        let persisted = frame(vec![row(5, "a")]);
        let incoming = frame(vec![row(5, "a2"), row(5, "a3")]);
        let plan = reconcile(&persisted, &incoming, "id").unwrap();
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts.row(0).get("name"), &Value::from("a3"));
        assert_eq!(plan.update_mask, vec![true]);
        assert_eq!(plan.merged.row(0).get("name"), &Value::from("a2"));
    }

    #[test]
    fn mask_aligns_with_persisted_length() {
        let persisted = frame(vec![row(1, "a"), row(1, "b"), row(2, "c")]);
        let incoming = frame(vec![row(1, "a2")]);
        let plan = reconcile(&persisted, &incoming, "id").unwrap();
        assert_eq!(plan.update_mask.len(), persisted.len());
        assert_eq!(plan.update_mask, vec![true, true, false]);
        // only occurrence 0 changed content
        assert_eq!(plan.merged.row(0).get("name"), &Value::from("a2"));
        assert_eq!(plan.merged.row(1).get("name"), &Value::from("b"));
    }
}
