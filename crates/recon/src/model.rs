use policyfeed_core::{CanonicalRecord, ChangeRecord, RawRow};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Fetched rows grouped by source, in merge order.
///
/// Order matters: on an id collision the later source wins.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub rows_by_source: Vec<(String, Vec<RawRow>)>,
}

impl ReconInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source_id: impl Into<String>, rows: Vec<RawRow>) {
        self.rows_by_source.push((source_id.into(), rows));
    }

    pub fn row_count(&self) -> usize {
        self.rows_by_source.iter().map(|(_, rows)| rows.len()).sum()
    }
}

/// A mapped row tagged with the source that produced it.
#[derive(Debug, Clone)]
pub struct MappedRecord {
    pub source_id: String,
    pub record: CanonicalRecord,
}

// ---------------------------------------------------------------------------
// Collisions
// ---------------------------------------------------------------------------

/// One overwrite during deduplication. The later row is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdCollision {
    pub policy_id: String,
    pub kept_source: String,
    pub dropped_source: String,
    pub kept_title: String,
    pub dropped_title: String,
}

impl IdCollision {
    /// Same id from two different sources. Usually two unrelated policies.
    pub fn is_cross_source(&self) -> bool {
        self.kept_source != self.dropped_source
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub total: usize,
    pub active: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub closed: usize,
    pub collisions: usize,
}

#[derive(Debug, Clone)]
pub struct ReconOutput {
    /// Current records in first-seen order, then closed records in previous order.
    pub canonical: Vec<CanonicalRecord>,
    /// One entry per canonical record, same order.
    pub changes: Vec<ChangeRecord>,
    pub collisions: Vec<IdCollision>,
    pub summary: ChangeSummary,
}
