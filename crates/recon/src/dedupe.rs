use std::collections::HashMap;

use policyfeed_core::CanonicalRecord;
use tracing::warn;

use crate::model::{IdCollision, MappedRecord};

/// Collapse mapped records to one per `policy_id`.
///
/// Last-wins: a record keeps the position where its id first appeared and the
/// value of the last row with that id. Every overwrite is returned as an
/// [`IdCollision`].
pub fn dedupe(mapped: Vec<MappedRecord>) -> (Vec<CanonicalRecord>, Vec<IdCollision>) {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut slots: Vec<MappedRecord> = Vec::with_capacity(mapped.len());
    let mut collisions = Vec::new();

    for entry in mapped {
        match index.get(&entry.record.policy_id).copied() {
            Some(at) => {
                let dropped = std::mem::replace(&mut slots[at], entry);
                let kept = &slots[at];
                let collision = IdCollision {
                    policy_id: kept.record.policy_id.clone(),
                    kept_source: kept.source_id.clone(),
                    dropped_source: dropped.source_id,
                    kept_title: kept.record.title.clone(),
                    dropped_title: dropped.record.title,
                };
                if collision.is_cross_source() {
                    warn!(
                        policy_id = %collision.policy_id,
                        kept_source = %collision.kept_source,
                        dropped_source = %collision.dropped_source,
                        "policy_id collision across sources; later source wins"
                    );
                }
                collisions.push(collision);
            }
            None => {
                index.insert(entry.record.policy_id.clone(), slots.len());
                slots.push(entry);
            }
        }
    }

    (slots.into_iter().map(|m| m.record).collect(), collisions)
}
