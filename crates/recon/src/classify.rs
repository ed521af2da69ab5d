use std::collections::{HashMap, HashSet};

use policyfeed_core::{CanonicalRecord, ChangeRecord, ChangeType, RecordStatus};

/// Fingerprint over the semantic fields. Bookkeeping fields (timestamps,
/// source attribution, status) never make a record "updated".
pub fn fingerprint(record: &CanonicalRecord) -> String {
    [
        record.title.as_str(),
        record.region.as_str(),
        record.target_group.as_str(),
        record.category.as_str(),
        record.eligibility_text.as_str(),
        record.benefit_text.as_str(),
        record.application_period_text.as_str(),
        record.official_url.as_str(),
    ]
    .join("|")
}

/// Classify `current` against `previous` and append closed records.
///
/// Current records come back in their given order with `change_type` set;
/// previous ids missing from `current` follow as closed copies, in previous
/// order, with `last_checked_at` refreshed. Previous entries with an empty id
/// are ignored.
pub fn classify_against_previous(
    current: Vec<CanonicalRecord>,
    previous: &[CanonicalRecord],
    checked_at: &str,
) -> (Vec<CanonicalRecord>, Vec<ChangeRecord>) {
    let previous_by_id: HashMap<&str, &CanonicalRecord> = previous
        .iter()
        .filter(|p| !p.policy_id.is_empty())
        .map(|p| (p.policy_id.as_str(), p))
        .collect();

    let mut canonical = Vec::with_capacity(current.len() + previous.len());
    let mut changes = Vec::with_capacity(current.len() + previous.len());
    let mut current_ids: HashSet<String> = HashSet::with_capacity(current.len());

    for mut record in current {
        let change = match previous_by_id.get(record.policy_id.as_str()) {
            None => ChangeType::Created,
            Some(old) if fingerprint(old) == fingerprint(&record) => ChangeType::Unchanged,
            Some(_) => ChangeType::Updated,
        };
        record.set_change(change);
        changes.push(ChangeRecord {
            policy_id: record.policy_id.clone(),
            change_type: change,
            title: record.title.clone(),
        });
        current_ids.insert(record.policy_id.clone());
        canonical.push(record);
    }

    let mut closed_ids: HashSet<&str> = HashSet::new();
    for old in previous {
        let pid = old.policy_id.as_str();
        if pid.is_empty() || current_ids.contains(pid) || !closed_ids.insert(pid) {
            continue;
        }
        // A repeated id in the snapshot resolves to its last entry.
        let latest = previous_by_id.get(pid).copied().unwrap_or(old);
        let mut closed = latest.clone();
        closed.status = RecordStatus::Closed;
        closed.last_checked_at = checked_at.to_string();
        closed.set_change(ChangeType::Closed);
        changes.push(ChangeRecord {
            policy_id: pid.to_string(),
            change_type: ChangeType::Closed,
            title: if closed.title.is_empty() {
                pid.to_string()
            } else {
                closed.title.clone()
            },
        });
        canonical.push(closed);
    }

    (canonical, changes)
}
