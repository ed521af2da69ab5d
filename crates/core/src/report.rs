use serde::{Deserialize, Serialize};

/// Tri-state gate outcome. Only `HardFail` blocks publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Pass,
    SoftFail,
    HardFail,
}

impl Decision {
    /// Any hard finding wins; soft findings only count without hard ones.
    pub fn from_findings(hard_fail: &[String], soft_fail: &[String]) -> Self {
        if !hard_fail.is_empty() {
            Self::HardFail
        } else if !soft_fail.is_empty() {
            Self::SoftFail
        } else {
            Self::Pass
        }
    }

    pub fn is_hard_fail(&self) -> bool {
        matches!(self, Self::HardFail)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::SoftFail => write!(f, "soft_fail"),
            Self::HardFail => write!(f, "hard_fail"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub null_ratio: f64,
    pub duplicate_ratio: f64,
    pub broken_link_ratio: f64,
    pub missing_sections_count: usize,
    pub total_policies: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub decision: Decision,
    pub hard_fail: Vec<String>,
    pub soft_fail: Vec<String>,
    pub metrics: QualityMetrics,
}

/// Content-policy (monetization) gate outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyReport {
    pub decision: Decision,
    pub hard_fail: Vec<String>,
    pub soft_fail: Vec<String>,
}

/// Per-source fetch outcome. `error` is set iff `ok` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchReport {
    pub source_id: String,
    pub ok: bool,
    pub rows: usize,
    pub error: Option<String>,
}

impl FetchReport {
    pub fn success(source_id: &str, rows: usize) -> Self {
        Self {
            source_id: source_id.to_string(),
            ok: true,
            rows,
            error: None,
        }
    }

    pub fn failure(source_id: &str, error: impl Into<String>) -> Self {
        Self {
            source_id: source_id.to_string(),
            ok: false,
            rows: 0,
            error: Some(error.into()),
        }
    }
}
