use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use geosync_core::{Frame, Record, Value};

use crate::model::{ColumnPartition, MergeOutcome};

/// Split candidate columns into shared and fresh relative to the persisted
/// schema. The key column lands in neither bucket; it is implicitly shared
/// and only ever used for joining.
pub fn split_columns(persisted: &Frame, candidates: &Frame, key: &str) -> ColumnPartition {
    let mut shared = Vec::new();
    let mut fresh = Vec::new();
    for col in candidates.columns() {
        if col == key {
            continue;
        }
        if persisted.has_column(col) {
            shared.push(col.clone());
        } else {
            fresh.push(col.clone());
        }
    }
    ColumnPartition { shared, fresh }
}

/// Merge update candidates into a full replacement of the persisted frame.
///
/// With unique keys on both sides the merge joins on key alone. As soon as
/// any key repeats, rows pair up on (key, occurrence index) instead, and a
/// candidate occurrence without a persisted slot is reported in `promoted`
/// rather than silently dropped. Fresh columns always join on key alone:
/// they carry entity-level attributes, and occurrence indices are not stable
/// across independent extraction runs.
pub fn merge(persisted: &Frame, candidates: &Frame, key: &str) -> MergeOutcome {
    let partition = split_columns(persisted, candidates, key);
    debug!(
        "merging {} candidates: {} shared, {} fresh columns",
        candidates.len(),
        partition.shared.len(),
        partition.fresh.len()
    );

    let key_only =
        !has_duplicate_keys(persisted, key) && !has_duplicate_keys(candidates, key);

    if key_only {
        merge_by_key(persisted, candidates, key, &partition)
    } else {
        merge_by_key_occurrence(persisted, candidates, key, &partition)
    }
}

/// Key-only mode: every key value is unique on both sides.
fn merge_by_key(
    persisted: &Frame,
    candidates: &Frame,
    key: &str,
    partition: &ColumnPartition,
) -> MergeOutcome {
    let by_key: HashMap<&Value, usize> = candidates
        .rows()
        .iter()
        .enumerate()
        .map(|(i, r)| (r.get(key), i))
        .collect();

    let mut merged = union_schema(persisted, partition);
    let mut matched: HashSet<usize> = HashSet::new();

    for row in persisted.rows() {
        let mut out = row.clone();
        if let Some(&ci) = by_key.get(row.get(key)) {
            let cand = &candidates.rows()[ci];
            overwrite_shared(&mut out, cand, &partition.shared);
            join_fresh(&mut out, cand, &partition.fresh);
            matched.insert(ci);
        }
        merged.push(out);
    }

    let promoted = unmatched_indices(candidates.len(), &matched);
    MergeOutcome { merged, promoted }
}

/// Key+occurrence mode: at least one key repeats somewhere. Shared columns
/// pair on exact (key, occurrence); fresh columns join on key via the first
/// candidate occurrence.
fn merge_by_key_occurrence(
    persisted: &Frame,
    candidates: &Frame,
    key: &str,
    partition: &ColumnPartition,
) -> MergeOutcome {
    let cand_occ = occurrence_indices(candidates, key);
    let pers_occ = occurrence_indices(persisted, key);

    let by_key_occ: HashMap<(&Value, usize), usize> = candidates
        .rows()
        .iter()
        .enumerate()
        .map(|(i, r)| ((r.get(key), cand_occ[i]), i))
        .collect();

    let mut first_by_key: HashMap<&Value, usize> = HashMap::new();
    for (i, row) in candidates.rows().iter().enumerate() {
        first_by_key.entry(row.get(key)).or_insert(i);
    }

    if !partition.fresh.is_empty() && first_by_key.len() < candidates.len() {
        warn!(
            "multiple entries with the same key among {} candidates; \
             fresh columns take the first occurrence per key",
            candidates.len()
        );
    }

    let mut merged = union_schema(persisted, partition);
    let mut matched: HashSet<usize> = HashSet::new();

    for (i, row) in persisted.rows().iter().enumerate() {
        let mut out = row.clone();
        if let Some(&ci) = by_key_occ.get(&(row.get(key), pers_occ[i])) {
            overwrite_shared(&mut out, &candidates.rows()[ci], &partition.shared);
            matched.insert(ci);
        }
        if let Some(&ci) = first_by_key.get(row.get(key)) {
            join_fresh(&mut out, &candidates.rows()[ci], &partition.fresh);
        }
        merged.push(out);
    }

    let promoted = unmatched_indices(candidates.len(), &matched);
    MergeOutcome { merged, promoted }
}

/// 0-based rank of each row among rows sharing its key value, in table
/// order. Recomputed per call; never persisted.
fn occurrence_indices(frame: &Frame, key: &str) -> Vec<usize> {
    let mut counts: HashMap<Value, usize> = HashMap::new();
    frame
        .rows()
        .iter()
        .map(|r| {
            let slot = counts.entry(r.get(key).clone()).or_insert(0);
            let idx = *slot;
            *slot += 1;
            idx
        })
        .collect()
}

fn has_duplicate_keys(frame: &Frame, key: &str) -> bool {
    let mut seen: HashSet<&Value> = HashSet::with_capacity(frame.len());
    frame.rows().iter().any(|r| !seen.insert(r.get(key)))
}

fn union_schema(persisted: &Frame, partition: &ColumnPartition) -> Frame {
    let mut frame = Frame::with_columns(persisted.columns().iter().cloned());
    for col in &partition.fresh {
        frame.add_column(col.clone());
    }
    frame
}

/// Candidate shared values overwrite persisted ones; an absent candidate
/// value leaves the persisted value in place.
fn overwrite_shared(out: &mut Record, cand: &Record, shared: &[String]) {
    for col in shared {
        let v = cand.get(col);
        if !v.is_absent() {
            out.set(col.clone(), v.clone());
        }
    }
}

fn join_fresh(out: &mut Record, cand: &Record, fresh: &[String]) {
    for col in fresh {
        out.set(col.clone(), cand.get(col).clone());
    }
}

fn unmatched_indices(len: usize, matched: &HashSet<usize>) -> Vec<usize> {
    (0..len).filter(|i| !matched.contains(i)).collect()
}
