use policyfeed_core::{CanonicalRecord, Decision, RecordStatus};
use policyfeed_gates::quality::{run_quality_gate, REQUIRED_SECTION_MARKERS};
use policyfeed_gates::{deploy_ready, monetization, PolicyRules, QualityThresholds, RenderedPage};

fn record(id: &str) -> CanonicalRecord {
    CanonicalRecord {
        policy_id: id.into(),
        title: format!("정책 {id}"),
        region: "전국".into(),
        target_group: "일반".into(),
        category: "기타".into(),
        eligibility_text: "공고문 참고".into(),
        benefit_text: "공고문 참고".into(),
        application_period_text: "공고문 참고".into(),
        official_url: format!("https://www.bizinfo.go.kr/{id}"),
        source_org: "bizinfo".into(),
        source_api: "bizinfo".into(),
        source_updated_at: "2026-03-01T09:00:00+09:00".into(),
        last_checked_at: "2026-03-01T09:00:00+09:00".into(),
        status: RecordStatus::Active,
        change_type: None,
        change_summary: String::new(),
    }
}

fn detail(slug: &str, extra: &str) -> RenderedPage {
    RenderedPage::new(
        format!("grants/{slug}/index.html"),
        format!("<html>{}{extra}</html>", REQUIRED_SECTION_MARKERS.join("<p/>")),
    )
}

#[test]
fn policy_failure_blocks_publish_despite_clean_quality() {
    let canonical: Vec<CanonicalRecord> = (0..5).map(|i| record(&format!("p{i}"))).collect();
    let pages = vec![detail("p0", ""), detail("p1", "광고를 클릭하세요")];

    let quality = run_quality_gate(&canonical, &pages, 5, &QualityThresholds::default());
    assert_eq!(quality.decision, Decision::Pass);

    let policy = monetization::evaluate(&pages, &PolicyRules::default());
    assert_eq!(policy.decision, Decision::HardFail);

    assert!(!deploy_ready(&quality, &policy));
}

#[test]
fn soft_quality_failure_still_publishes() {
    let canonical: Vec<CanonicalRecord> = (0..5).map(|i| record(&format!("p{i}"))).collect();
    let pages = vec![detail("p0", "")];

    let quality = run_quality_gate(&canonical, &pages, 10, &QualityThresholds::default());
    assert_eq!(quality.decision, Decision::SoftFail);

    let policy = monetization::evaluate(&pages, &PolicyRules::default());
    assert_eq!(policy.decision, Decision::Pass);

    assert!(deploy_ready(&quality, &policy));
}

#[test]
fn missing_official_url_hard_fails_with_clean_metrics() {
    let mut canonical: Vec<CanonicalRecord> = (0..100).map(|i| record(&format!("p{i}"))).collect();
    canonical[42].official_url.clear();

    let quality = run_quality_gate(&canonical, &[], 100, &QualityThresholds::default());
    // one blank field out of 1300 stays under the null threshold
    assert!(quality.metrics.null_ratio < 0.05);
    assert_eq!(quality.metrics.broken_link_ratio, 0.0);
    assert_eq!(quality.decision, Decision::HardFail);
    assert_eq!(quality.hard_fail, vec!["official_url missing exists"]);
}
