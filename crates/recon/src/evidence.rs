use policyfeed_core::{CanonicalRecord, ChangeType};

use crate::model::{ChangeSummary, IdCollision};

/// Count change types over a classified canonical set.
pub fn compute_summary(canonical: &[CanonicalRecord], collisions: &[IdCollision]) -> ChangeSummary {
    let mut summary = ChangeSummary {
        total: canonical.len(),
        collisions: collisions.len(),
        ..Default::default()
    };

    for r in canonical {
        if r.is_active() {
            summary.active += 1;
        }
        match r.change_type {
            Some(ChangeType::Created) => summary.created += 1,
            Some(ChangeType::Updated) => summary.updated += 1,
            Some(ChangeType::Unchanged) => summary.unchanged += 1,
            Some(ChangeType::Closed) => summary.closed += 1,
            None => {}
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use policyfeed_core::RecordStatus;

    fn record(change: ChangeType) -> CanonicalRecord {
        let mut r = CanonicalRecord::default();
        if change == ChangeType::Closed {
            r.status = RecordStatus::Closed;
        }
        r.set_change(change);
        r
    }

    #[test]
    fn summary_counts() {
        let canonical = vec![
            record(ChangeType::Created),
            record(ChangeType::Created),
            record(ChangeType::Unchanged),
            record(ChangeType::Updated),
            record(ChangeType::Closed),
        ];
        let summary = compute_summary(&canonical, &[]);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.active, 4);
        assert_eq!(summary.created, 2);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.closed, 1);
        assert_eq!(summary.collisions, 0);
    }
}
