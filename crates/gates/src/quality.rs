//! Data-quality gate.

use std::collections::HashSet;

use policyfeed_core::{CanonicalRecord, Decision, QualityMetrics, QualityReport, REQUIRED_FIELDS};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::page::{detail_pages, RenderedPage};

/// Text every detail page must contain: source attribution, last-checked
/// timestamp, disclaimer, canonical link.
pub const REQUIRED_SECTION_MARKERS: [&str; 4] = [
    "공식 출처",
    "최종 확인 시각",
    "공식기관이 아니며",
    "rel=\"canonical\"",
];

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Upper bounds; a metric strictly above its bound fails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub max_null_ratio: f64,
    pub max_duplicate_ratio: f64,
    pub max_broken_link_ratio: f64,
    pub max_volume_drop_ratio: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            max_null_ratio: 0.05,
            max_duplicate_ratio: 0.03,
            max_broken_link_ratio: 0.01,
            max_volume_drop_ratio: 0.20,
        }
    }
}

impl QualityThresholds {
    pub fn validate(&self) -> Result<(), String> {
        let bounds = [
            ("max_null_ratio", self.max_null_ratio),
            ("max_duplicate_ratio", self.max_duplicate_ratio),
            ("max_broken_link_ratio", self.max_broken_link_ratio),
            ("max_volume_drop_ratio", self.max_volume_drop_ratio),
        ];
        for (name, value) in bounds {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} must be within 0.0..=1.0, got {value}"));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Text of each [`REQUIRED_FIELDS`] entry for one canonical entry, in order.
/// Absent and null fields are empty.
pub type RequiredText = [String; 13];

const POLICY_ID: usize = 0;
const OFFICIAL_URL: usize = 8;

pub fn record_text(record: &CanonicalRecord) -> RequiredText {
    record.required_values().map(str::to_string)
}

/// A canonical entry as read from disk. Strings are taken as-is and other
/// scalars are stringified; a non-object entry has every field absent.
pub fn value_text(entry: &Value) -> RequiredText {
    REQUIRED_FIELDS.map(|field| match entry.get(field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    })
}

/// Compute quality metrics over the canonical set and rendered pages.
///
/// Ratios are rounded to six decimals. An empty set divides by one so every
/// ratio is zero.
pub fn compute_metrics(canonical: &[CanonicalRecord], pages: &[RenderedPage]) -> QualityMetrics {
    let rows: Vec<RequiredText> = canonical.iter().map(record_text).collect();
    compute_text_metrics(&rows, pages)
}

pub fn compute_text_metrics(rows: &[RequiredText], pages: &[RenderedPage]) -> QualityMetrics {
    let total = rows.len().max(1);

    let null_count: usize = rows
        .iter()
        .map(|row| row.iter().filter(|v| v.trim().is_empty()).count())
        .sum();
    let null_ratio = null_count as f64 / (total * REQUIRED_FIELDS.len()) as f64;

    let ids: Vec<&str> = rows
        .iter()
        .map(|row| row[POLICY_ID].trim())
        .filter(|id| !id.is_empty())
        .collect();
    let duplicate_ratio = if ids.is_empty() {
        0.0
    } else {
        let unique: HashSet<&str> = ids.iter().copied().collect();
        (ids.len() - unique.len()) as f64 / ids.len() as f64
    };

    let links: Vec<&str> = rows
        .iter()
        .map(|row| row[OFFICIAL_URL].as_str())
        .filter(|u| !u.is_empty())
        .collect();
    let bad_links = links.iter().filter(|u| !is_http_url(u)).count();
    let broken_link_ratio = bad_links as f64 / links.len().max(1) as f64;

    QualityMetrics {
        null_ratio: round6(null_ratio),
        duplicate_ratio: round6(duplicate_ratio),
        broken_link_ratio: round6(broken_link_ratio),
        missing_sections_count: count_missing_sections(pages),
        total_policies: rows.len(),
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Detail pages lacking at least one required marker.
pub fn count_missing_sections(pages: &[RenderedPage]) -> usize {
    detail_pages(pages)
        .filter(|p| REQUIRED_SECTION_MARKERS.iter().any(|m| !p.html.contains(m)))
        .count()
}

/// Records whose official link is blank.
pub fn count_missing_official_url(canonical: &[CanonicalRecord]) -> usize {
    canonical
        .iter()
        .filter(|r| r.official_url.trim().is_empty())
        .count()
}

fn count_missing_text_url(rows: &[RequiredText]) -> usize {
    rows.iter().filter(|row| row[OFFICIAL_URL].trim().is_empty()).count()
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Decide from literal inputs. Hard findings are listed in a fixed order;
/// the volume-drop check is recorded as soft.
pub fn evaluate(
    metrics: &QualityMetrics,
    previous_count: usize,
    current_count: usize,
    official_url_missing: usize,
    thresholds: &QualityThresholds,
) -> QualityReport {
    let mut hard_fail = Vec::new();
    let mut soft_fail = Vec::new();

    if official_url_missing > 0 {
        hard_fail.push("official_url missing exists".to_string());
    }
    if metrics.null_ratio > thresholds.max_null_ratio {
        hard_fail.push(format!(
            "required field null ratio > {}",
            percent(thresholds.max_null_ratio)
        ));
    }
    if metrics.duplicate_ratio > thresholds.max_duplicate_ratio {
        hard_fail.push(format!(
            "duplicate ratio > {}",
            percent(thresholds.max_duplicate_ratio)
        ));
    }
    if metrics.broken_link_ratio > thresholds.max_broken_link_ratio {
        hard_fail.push(format!(
            "broken link ratio > {}",
            percent(thresholds.max_broken_link_ratio)
        ));
    }
    if metrics.missing_sections_count > 0 {
        hard_fail.push("required frontend sections missing".to_string());
    }

    if previous_count > 0 {
        let drop = previous_count.saturating_sub(current_count) as f64 / previous_count as f64;
        if drop > thresholds.max_volume_drop_ratio {
            soft_fail.push(format!(
                "record volume drop > {}",
                percent(thresholds.max_volume_drop_ratio)
            ));
        }
    }

    QualityReport {
        decision: Decision::from_findings(&hard_fail, &soft_fail),
        hard_fail,
        soft_fail,
        metrics: metrics.clone(),
    }
}

/// `0.05` → `5%`, `0.125` → `12.5%`.
fn percent(ratio: f64) -> String {
    let value = round6(ratio * 100.0);
    if value.fract() == 0.0 {
        format!("{}%", value as i64)
    } else {
        format!("{value}%")
    }
}

/// Metrics and decision in one step, as the pipeline and the standalone gate
/// command both use it.
pub fn run_quality_gate(
    canonical: &[CanonicalRecord],
    pages: &[RenderedPage],
    previous_count: usize,
    thresholds: &QualityThresholds,
) -> QualityReport {
    let metrics = compute_metrics(canonical, pages);
    evaluate(
        &metrics,
        previous_count,
        canonical.len(),
        count_missing_official_url(canonical),
        thresholds,
    )
}

/// [`run_quality_gate`] over entries read straight from a canonical file,
/// before any typing, so missing keys count as nulls.
pub fn run_quality_gate_on_values(
    entries: &[Value],
    pages: &[RenderedPage],
    previous_count: usize,
    thresholds: &QualityThresholds,
) -> QualityReport {
    let rows: Vec<RequiredText> = entries.iter().map(value_text).collect();
    let metrics = compute_text_metrics(&rows, pages);
    evaluate(
        &metrics,
        previous_count,
        rows.len(),
        count_missing_text_url(&rows),
        thresholds,
    )
}

/// Frontend-only view: hard fail iff detail pages are missing sections.
pub fn frontend_report(metrics: &QualityMetrics) -> QualityReport {
    let hard_fail = if metrics.missing_sections_count > 0 {
        vec!["required frontend sections missing".to_string()]
    } else {
        Vec::new()
    };
    QualityReport {
        decision: Decision::from_findings(&hard_fail, &[]),
        hard_fail,
        soft_fail: Vec::new(),
        metrics: metrics.clone(),
    }
}
