//! Row → canonical record mapping.

use policyfeed_core::{CanonicalField, CanonicalRecord, RawRow, RecordStatus, SourceDefinition};
use serde_json::Value;

use crate::identity::synthesize_policy_id;

// ---------------------------------------------------------------------------
// Field defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_REGION: &str = "전국";
pub const DEFAULT_TARGET_GROUP: &str = "일반";
pub const DEFAULT_CATEGORY: &str = "기타";
/// Used for eligibility, benefit and application period text.
pub const DEFAULT_NOTICE_TEXT: &str = "공고문 참고";

// ---------------------------------------------------------------------------
// Value lookup
// ---------------------------------------------------------------------------

/// Text form of a row value. Scalars only get trimmed by the caller.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// First candidate key whose value is non-null with non-empty trimmed text.
pub fn pick_value(row: &RawRow, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|key| {
        let text = value_text(row.get(*key)?)?;
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn pick_or(row: &RawRow, source: &SourceDefinition, field: CanonicalField, fallback: &str) -> String {
    pick_value(row, &source.mapping.candidates(field)).unwrap_or_else(|| fallback.to_string())
}

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Map one raw row into a fresh active record.
///
/// Returns `None` when no title resolves. A missing id is synthesized from
/// source, title and the raw region. `checked_at` stamps `last_checked_at`
/// and stands in for a missing `source_updated_at`.
pub fn map_row(source: &SourceDefinition, row: &RawRow, checked_at: &str) -> Option<CanonicalRecord> {
    let mapping = &source.mapping;
    let source_id = source.source_id.as_str();

    let title = pick_value(row, &mapping.candidates(CanonicalField::Title))?;
    let raw_region = pick_value(row, &mapping.candidates(CanonicalField::Region));
    let policy_id = pick_value(row, &mapping.candidates(CanonicalField::Id)).unwrap_or_else(|| {
        synthesize_policy_id(source_id, &title, raw_region.as_deref().unwrap_or(""))
    });

    Some(CanonicalRecord {
        policy_id,
        region: raw_region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
        target_group: pick_or(row, source, CanonicalField::TargetGroup, DEFAULT_TARGET_GROUP),
        category: pick_or(row, source, CanonicalField::Category, DEFAULT_CATEGORY),
        eligibility_text: pick_or(row, source, CanonicalField::Eligibility, DEFAULT_NOTICE_TEXT),
        benefit_text: pick_or(row, source, CanonicalField::Benefit, DEFAULT_NOTICE_TEXT),
        application_period_text: pick_or(
            row,
            source,
            CanonicalField::ApplicationPeriod,
            DEFAULT_NOTICE_TEXT,
        ),
        official_url: pick_or(
            row,
            source,
            CanonicalField::OfficialUrl,
            source.fallback_official_url.trim(),
        ),
        source_org: pick_or(row, source, CanonicalField::SourceOrg, source_id),
        source_api: source_id.to_string(),
        source_updated_at: pick_or(row, source, CanonicalField::UpdatedAt, checked_at),
        last_checked_at: checked_at.to_string(),
        status: RecordStatus::Active,
        title,
        change_type: None,
        change_summary: String::new(),
    })
}
