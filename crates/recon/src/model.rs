use geosync_core::Frame;

// ---------------------------------------------------------------------------
// Column partition
// ---------------------------------------------------------------------------

/// Candidate columns split relative to the persisted schema.
///
/// `shared` columns exist on both sides (the key column is excluded — it is
/// implicitly shared and only ever used for joining). `fresh` columns exist
/// only in the candidate batch and extend the persisted schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPartition {
    pub shared: Vec<String>,
    pub fresh: Vec<String>,
}

// ---------------------------------------------------------------------------
// Merge outcome
// ---------------------------------------------------------------------------

/// Result of merging update candidates into the persisted frame.
#[derive(Debug)]
pub struct MergeOutcome {
    /// Full replacement rows, positionally aligned with the persisted frame
    /// (`merged.len() == persisted.len()`), carrying the union schema.
    pub merged: Frame,
    /// Indices into the candidate frame of occurrences that had no matching
    /// persisted (key, occurrence) slot. These rows must insert instead.
    pub promoted: Vec<usize>,
}

// ---------------------------------------------------------------------------
// Reconciliation plan
// ---------------------------------------------------------------------------

/// The commit plan for one batch. Every incoming row lands in exactly one of
/// `inserts`/`updates`; the store writes `merged[i]` wherever
/// `update_mask[i]` is true and appends `inserts`, all in one transaction.
#[derive(Debug)]
pub struct ReconPlan {
    /// Incoming rows with no persisted counterpart, plus promoted
    /// unmatched occurrences.
    pub inserts: Frame,
    /// Incoming rows that targeted an existing persisted row.
    pub updates: Frame,
    /// Persisted-aligned replacement rows (union schema).
    pub merged: Frame,
    /// One entry per persisted row, true where that row is an update target.
    pub update_mask: Vec<bool>,
}

impl ReconPlan {
    /// Number of persisted rows actually targeted by this plan.
    pub fn updated_row_count(&self) -> usize {
        self.update_mask.iter().filter(|m| **m).count()
    }

    pub fn is_noop(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty()
    }

    /// The persisted frame after this plan commits: masked rows replaced by
    /// their merged counterparts, inserts appended at the end. Whole-table
    /// backends commit exactly this; row-store backends must be equivalent.
    pub fn apply_to(&self, persisted: &Frame) -> Frame {
        let mut out = Frame::with_columns(self.merged.columns().iter().cloned());
        for col in self.inserts.columns() {
            out.add_column(col.clone());
        }
        for (i, row) in persisted.rows().iter().enumerate() {
            if self.update_mask.get(i).copied().unwrap_or(false) {
                out.push(self.merged.row(i).clone());
            } else {
                out.push(row.clone());
            }
        }
        for row in self.inserts.rows() {
            out.push(row.clone());
        }
        out
    }
}
