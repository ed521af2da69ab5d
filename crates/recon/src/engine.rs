use policyfeed_core::{CanonicalRecord, SourceConfig};
use tracing::{debug, info};

use crate::classify::classify_against_previous;
use crate::dedupe::dedupe;
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::mapping::map_row;
use crate::model::{MappedRecord, ReconInput, ReconOutput};

/// Reconcile fetched rows against the previous canonical snapshot.
///
/// Sources are mapped in `input` order, deduplicated last-wins, then diffed
/// against `previous`. Every record gets a change classification and one
/// [`ChangeRecord`](policyfeed_core::ChangeRecord). With no rows at all the
/// result is the previous snapshot, closed.
pub fn reconcile(
    input: &ReconInput,
    sources: &SourceConfig,
    previous: &[CanonicalRecord],
    checked_at: &str,
) -> Result<ReconOutput, ReconError> {
    let mut mapped = Vec::with_capacity(input.row_count());
    for (source_id, rows) in &input.rows_by_source {
        let source = sources
            .get(source_id)
            .ok_or_else(|| ReconError::UnknownSource(source_id.clone()))?;

        let before = mapped.len();
        mapped.extend(rows.iter().filter_map(|row| {
            map_row(source, row, checked_at).map(|record| MappedRecord {
                source_id: source_id.clone(),
                record,
            })
        }));
        let kept = mapped.len() - before;
        debug!(
            source_id = %source_id,
            rows = rows.len(),
            mapped = kept,
            dropped = rows.len() - kept,
            "mapped source rows"
        );
    }

    let (current, collisions) = dedupe(mapped);
    let (canonical, changes) = classify_against_previous(current, previous, checked_at);
    let summary = compute_summary(&canonical, &collisions);

    info!(
        total = summary.total,
        created = summary.created,
        updated = summary.updated,
        unchanged = summary.unchanged,
        closed = summary.closed,
        collisions = summary.collisions,
        "reconciled canonical set"
    );

    Ok(ReconOutput {
        canonical,
        changes,
        collisions,
        summary,
    })
}
