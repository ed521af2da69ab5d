use std::collections::HashSet;

use policyfeed_core::{CanonicalRecord, ChangeType, RawRow, RecordStatus, SourceConfig};
use policyfeed_recon::{reconcile, synthesize_policy_id, ReconInput, ReconOutput};
use serde_json::{json, Value};

const SOURCES: &str = r#"{
  "sources": [
    {
      "source_id": "bizinfo",
      "kind": "file_json",
      "endpoint": "data/bizinfo.json",
      "mapping": {
        "id_field": "pblancId",
        "title_field": ["pblancNm", "title"],
        "official_url_field": "pblancUrl"
      },
      "fallback_official_url": "https://www.bizinfo.go.kr",
      "enabled": true,
      "primary": true
    },
    {
      "source_id": "kstartup",
      "kind": "file_json",
      "endpoint": "data/kstartup.json",
      "mapping": { "id_field": "none", "title_field": "biz_pbanc_nm", "region_field": "supt_regin" },
      "fallback_official_url": "https://www.k-startup.go.kr",
      "enabled": true
    }
  ]
}"#;

fn sources() -> SourceConfig {
    SourceConfig::from_json(SOURCES).unwrap()
}

fn rows(value: Value) -> Vec<RawRow> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect()
}

fn input(parts: Vec<(&str, Value)>) -> ReconInput {
    let mut input = ReconInput::new();
    for (source_id, value) in parts {
        input.push(source_id, rows(value));
    }
    input
}

fn run(input: &ReconInput, previous: &[CanonicalRecord], at: &str) -> ReconOutput {
    reconcile(input, &sources(), previous, at).unwrap()
}

fn without_timestamps(records: &[CanonicalRecord]) -> Vec<CanonicalRecord> {
    records
        .iter()
        .cloned()
        .map(|mut r| {
            r.last_checked_at.clear();
            r.source_updated_at.clear();
            r.change_type = None;
            r.change_summary.clear();
            r
        })
        .collect()
}

fn bizinfo_rows() -> Value {
    json!([
        { "pblancId": "A", "pblancNm": "청년 창업 지원", "pblancUrl": "https://www.bizinfo.go.kr/a" },
        { "pblancId": "B", "pblancNm": "소상공인 정책자금", "pblancUrl": "https://www.bizinfo.go.kr/b" }
    ])
}

// -------------------------------------------------------------------------
// Properties
// -------------------------------------------------------------------------

#[test]
fn second_pass_is_unchanged() {
    let input = input(vec![("bizinfo", bizinfo_rows())]);
    let first = run(&input, &[], "2026-03-01T09:00:00+09:00");
    assert!(first
        .canonical
        .iter()
        .all(|r| r.change_type == Some(ChangeType::Created)));

    let second = run(&input, &first.canonical, "2026-03-02T09:00:00+09:00");
    assert!(second
        .canonical
        .iter()
        .all(|r| r.change_type == Some(ChangeType::Unchanged)));
    assert_eq!(
        without_timestamps(&first.canonical),
        without_timestamps(&second.canonical)
    );
    assert_eq!(second.summary.unchanged, 2);
}

#[test]
fn policy_ids_are_unique() {
    let input = input(vec![
        ("bizinfo", bizinfo_rows()),
        ("bizinfo", json!([{ "pblancId": "A", "pblancNm": "청년 창업 지원 (수정)" }])),
        ("kstartup", json!([{ "biz_pbanc_nm": "예비창업패키지" }, { "biz_pbanc_nm": "예비창업패키지" }])),
    ]);
    let previous = vec![CanonicalRecord {
        policy_id: "A".into(),
        title: "old".into(),
        ..Default::default()
    }];
    let out = run(&input, &previous, "t");

    let ids: HashSet<&str> = out.canonical.iter().map(|r| r.policy_id.as_str()).collect();
    assert_eq!(ids.len(), out.canonical.len());
    assert_eq!(out.changes.len(), out.canonical.len());
    assert_eq!(out.collisions.len(), 2);
}

#[test]
fn missing_previous_ids_are_closed() {
    let previous = run(&input(vec![("bizinfo", bizinfo_rows())]), &[], "t0").canonical;
    let out = run(&ReconInput::new(), &previous, "t1");

    assert_eq!(out.canonical.len(), 2);
    for rec in &out.canonical {
        assert_eq!(rec.status, RecordStatus::Closed);
        assert_eq!(rec.change_type, Some(ChangeType::Closed));
        assert_eq!(rec.last_checked_at, "t1");
        assert!(rec.official_url.starts_with("https://www.bizinfo.go.kr/"));
    }
    assert_eq!(out.summary.closed, 2);
    assert_eq!(out.summary.active, 0);
}

#[test]
fn synthesized_ids_are_stable() {
    let input = input(vec![(
        "kstartup",
        json!([{ "biz_pbanc_nm": "예비창업패키지", "supt_regin": "서울" }]),
    )]);
    let a = run(&input, &[], "t0");
    let b = run(&input, &[], "t1");
    assert_eq!(a.canonical[0].policy_id, b.canonical[0].policy_id);
    assert_eq!(
        a.canonical[0].policy_id,
        synthesize_policy_id("kstartup", "예비창업패키지", "서울")
    );
}

// -------------------------------------------------------------------------
// Scenarios
// -------------------------------------------------------------------------

#[test]
fn updated_and_closed_scenario() {
    let previous = run(&input(vec![("bizinfo", bizinfo_rows())]), &[], "t0").canonical;

    let current = input(vec![(
        "bizinfo",
        json!([{ "pblancId": "A", "pblancNm": "청년 창업 지원 2026", "pblancUrl": "https://www.bizinfo.go.kr/a" }]),
    )]);
    let out = run(&current, &previous, "t1");

    assert_eq!(out.canonical.len(), 2);
    let a = &out.canonical[0];
    assert_eq!(a.policy_id, "A");
    assert_eq!(a.status, RecordStatus::Active);
    assert_eq!(a.change_type, Some(ChangeType::Updated));
    assert_eq!(a.title, "청년 창업 지원 2026");

    let b = &out.canonical[1];
    assert_eq!(b.policy_id, "B");
    assert_eq!(b.status, RecordStatus::Closed);
    assert_eq!(b.change_type, Some(ChangeType::Closed));

    assert_eq!(out.changes.len(), 2);
    assert_eq!(out.changes[0].change_type, ChangeType::Updated);
    assert_eq!(out.changes[1].change_type, ChangeType::Closed);
    assert_eq!(out.changes[1].title, "소상공인 정책자금");
}

#[test]
fn cross_source_collision_keeps_later_source() {
    let out = run(
        &input(vec![
            ("bizinfo", json!([{ "pblancId": "X1", "pblancNm": "From bizinfo" }])),
            ("kstartup", json!([{ "none": "X1", "biz_pbanc_nm": "From kstartup" }])),
        ]),
        &[],
        "t",
    );
    assert_eq!(out.canonical.len(), 1);
    assert_eq!(out.canonical[0].title, "From kstartup");
    assert_eq!(out.canonical[0].source_api, "kstartup");

    let collision = &out.collisions[0];
    assert_eq!(collision.policy_id, "X1");
    assert_eq!(collision.kept_source, "kstartup");
    assert_eq!(collision.dropped_source, "bizinfo");
    assert_eq!(collision.dropped_title, "From bizinfo");
}

#[test]
fn untitled_rows_are_dropped() {
    let out = run(
        &input(vec![("bizinfo", json!([{ "pblancId": "Z" }, { "pblancId": "Y", "title": "T" }]))]),
        &[],
        "t",
    );
    assert_eq!(out.canonical.len(), 1);
    assert_eq!(out.canonical[0].policy_id, "Y");
    assert_eq!(out.canonical[0].official_url, "https://www.bizinfo.go.kr");
}

#[test]
fn unknown_source_is_an_error() {
    let err = reconcile(&input(vec![("ghost", json!([]))]), &sources(), &[], "t").unwrap_err();
    assert_eq!(err.to_string(), "rows supplied for unknown source 'ghost'");
}
