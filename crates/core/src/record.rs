use serde::{Deserialize, Serialize};

/// An untyped row exactly as a connector returned it. No identity guarantee.
pub type RawRow = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Active,
    Closed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    Updated,
    Unchanged,
    Closed,
}

impl ChangeType {
    /// Human-readable summary stored alongside the record for the updates feed.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Created => "신규 등록",
            Self::Updated => "핵심 정보 변경",
            Self::Unchanged => "변경 없음",
            Self::Closed => "현재 수집 기준 미노출",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
            Self::Unchanged => write!(f, "unchanged"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Fields that must be non-empty on every canonical record.
pub const REQUIRED_FIELDS: [&str; 13] = [
    "policy_id",
    "title",
    "region",
    "target_group",
    "category",
    "eligibility_text",
    "benefit_text",
    "application_period_text",
    "official_url",
    "source_org",
    "source_updated_at",
    "last_checked_at",
    "status",
];

/// The reconciled entity, one per `policy_id`.
///
/// Every field defaults on deserialization so snapshots written by older
/// runs still load; the canonical schema gates what is written back out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalRecord {
    pub policy_id: String,
    pub title: String,
    pub region: String,
    pub target_group: String,
    pub category: String,
    pub eligibility_text: String,
    pub benefit_text: String,
    pub application_period_text: String,
    pub official_url: String,
    pub source_org: String,
    pub source_api: String,
    pub source_updated_at: String,
    pub last_checked_at: String,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_type: Option<ChangeType>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub change_summary: String,
}

impl CanonicalRecord {
    /// Values of [`REQUIRED_FIELDS`], in the same order.
    pub fn required_values(&self) -> [&str; 13] {
        [
            self.policy_id.as_str(),
            self.title.as_str(),
            self.region.as_str(),
            self.target_group.as_str(),
            self.category.as_str(),
            self.eligibility_text.as_str(),
            self.benefit_text.as_str(),
            self.application_period_text.as_str(),
            self.official_url.as_str(),
            self.source_org.as_str(),
            self.source_updated_at.as_str(),
            self.last_checked_at.as_str(),
            self.status.as_str(),
        ]
    }

    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }

    pub fn set_change(&mut self, change: ChangeType) {
        self.change_type = Some(change);
        self.change_summary = change.summary().to_string();
    }
}

/// Audit entry for one canonical record in one run. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub policy_id: String,
    pub change_type: ChangeType,
    pub title: String,
}
