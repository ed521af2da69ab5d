use std::collections::HashMap;
use std::sync::Arc;

use policyfeed_connect::{SourceConnector, SourceFetch};
use policyfeed_core::{
    CanonicalRecord, ChangeRecord, ChangeType, FetchReport, RawRow, RecordStatus, SourceDefinition,
};
use policyfeed_gates::{PolicyRules, QualityThresholds};
use policyfeed_pipeline::{
    ArtifactStore, DetailPageRenderer, MemoryArtifactStore, MemoryDatasetStore, Pipeline,
    PipelineContext, PipelineError, RenderOutput, Renderer, RunMode, RunOutcome, SourcesInput,
};
use serde_json::{json, Value};
use tempfile::TempDir;

const SOURCES: &str = r#"{
  "sources": [
    {
      "source_id": "primary_api",
      "kind": "http_json",
      "endpoint": "https://api.example.kr/policies",
      "enabled": true,
      "primary": true
    },
    {
      "source_id": "fixture",
      "kind": "file_json",
      "endpoint": "data/fixtures/policies.json",
      "enabled": true
    },
    {
      "source_id": "disabled",
      "kind": "file_json",
      "endpoint": "data/fixtures/unused.json"
    }
  ]
}"#;

/// Serves canned rows per source id; `Err` becomes a failed report.
#[derive(Default)]
struct FakeConnector {
    responses: HashMap<String, Result<Vec<RawRow>, String>>,
}

impl FakeConnector {
    fn ok(mut self, source_id: &str, rows: Vec<RawRow>) -> Self {
        self.responses.insert(source_id.to_string(), Ok(rows));
        self
    }

    fn failing(mut self, source_id: &str, error: &str) -> Self {
        self.responses.insert(source_id.to_string(), Err(error.to_string()));
        self
    }
}

impl SourceConnector for FakeConnector {
    fn fetch(&self, source: &SourceDefinition) -> SourceFetch {
        match self.responses.get(&source.source_id) {
            Some(Ok(rows)) => SourceFetch {
                rows: rows.clone(),
                report: FetchReport::success(&source.source_id, rows.len()),
            },
            Some(Err(e)) => SourceFetch {
                rows: Vec::new(),
                report: FetchReport::failure(&source.source_id, e.clone()),
            },
            None => SourceFetch {
                rows: Vec::new(),
                report: FetchReport::failure(&source.source_id, "no fixture"),
            },
        }
    }
}

struct PanickingRenderer;

impl Renderer for PanickingRenderer {
    fn render(&self, _: &[CanonicalRecord], _: &[ChangeRecord]) -> Result<RenderOutput, PipelineError> {
        panic!("template missing");
    }
}

fn row(id: &str, title: &str) -> RawRow {
    match json!({
        "id": id,
        "title": title,
        "region": "서울",
        "official_url": format!("https://www.gov.kr/policy/{id}"),
        "source_org": "고용노동부",
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn previous_record(id: &str, title: &str) -> CanonicalRecord {
    CanonicalRecord {
        policy_id: id.into(),
        title: title.into(),
        region: "서울".into(),
        target_group: "일반".into(),
        category: "기타".into(),
        eligibility_text: "공고문 참고".into(),
        benefit_text: "공고문 참고".into(),
        application_period_text: "공고문 참고".into(),
        official_url: format!("https://www.gov.kr/policy/{id}"),
        source_org: "고용노동부".into(),
        source_api: "primary_api".into(),
        source_updated_at: "2026-02-28T09:00:00+09:00".into(),
        last_checked_at: "2026-02-28T09:00:00+09:00".into(),
        status: RecordStatus::Active,
        change_type: Some(ChangeType::Created),
        change_summary: ChangeType::Created.summary().into(),
    }
}

fn context(sources: &str) -> PipelineContext {
    PipelineContext {
        sources: SourcesInput::Inline(sources.to_string()),
        site_base_url: "https://example.kr".into(),
        health_check_paths: vec!["/".into()],
        skip_health_checks: true,
        thresholds: QualityThresholds::default(),
        policy: PolicyRules::default(),
        parallel_fetch: false,
        build_sha: "abc123".into(),
    }
}

struct Harness {
    _site: TempDir,
    pipeline: Pipeline,
    artifacts: Arc<MemoryArtifactStore>,
    dataset: Arc<MemoryDatasetStore>,
}

fn harness(ctx: PipelineContext, connector: FakeConnector, dataset: MemoryDatasetStore) -> Harness {
    let site = tempfile::tempdir().unwrap();
    let renderer = DetailPageRenderer::new(site.path(), &ctx.site_base_url, &ctx.policy.disclaimer_phrase);
    harness_with(ctx, connector, dataset, Box::new(renderer), site)
}

fn harness_with(
    ctx: PipelineContext,
    connector: FakeConnector,
    dataset: MemoryDatasetStore,
    renderer: Box<dyn Renderer>,
    site: TempDir,
) -> Harness {
    let artifacts = Arc::new(MemoryArtifactStore::new());
    let dataset = Arc::new(dataset);
    let pipeline = Pipeline::new(ctx, Arc::new(connector), renderer, artifacts.clone(), dataset.clone()).unwrap();
    Harness {
        _site: site,
        pipeline,
        artifacts,
        dataset,
    }
}

fn latest(h: &Harness, rel: &str) -> Value {
    h.artifacts.read_latest(rel).unwrap().unwrap_or(Value::Null)
}

#[test]
fn successful_run_persists_every_report() {
    let connector = FakeConnector::default()
        .ok("primary_api", vec![row("P1", "청년 월세 지원"), row("P2", "창업 지원금")])
        .ok("fixture", vec![row("F1", "고용 장려금")]);
    let h = harness(context(SOURCES), connector, MemoryDatasetStore::new());

    let outcome = h.pipeline.run("run-1", RunMode::Daily);

    assert!(matches!(outcome, RunOutcome::Success { generated_pages: 5, .. }), "{outcome:?}");
    assert_eq!(h.artifacts.latest_run_id().as_deref(), Some("run-1"));

    let paths = h.artifacts.run_paths("run-1");
    for expected in [
        "run_meta.json",
        "raw/primary_api.json",
        "raw/fixture.json",
        "fetch/report.json",
        "canonical/policies.json",
        "quality/report.json",
        "frontend/report.json",
        "monetization/report.json",
        "changes/changes.json",
        "changes/collisions.json",
        "publish/report.json",
        "publish/manifest.json",
    ] {
        assert!(paths.iter().any(|p| p == expected), "missing {expected}: {paths:?}");
    }
    assert!(!paths.iter().any(|p| p == "raw/disabled.json"));

    let meta = latest(&h, "run_meta.json");
    assert_eq!(meta["status"], "success");
    assert_eq!(meta["stage"], "completed");
    assert_eq!(meta["details"]["quality"], "pass");

    let manifest = latest(&h, "publish/manifest.json");
    assert_eq!(manifest["run_id"], "run-1");
    assert_eq!(manifest["build_sha"], "abc123");
    assert_eq!(manifest["excluded_pages"], 0);

    let publish = latest(&h, "publish/report.json");
    assert_eq!(publish["deploy_ready"], true);
    assert_eq!(publish["health_check_errors"], json!([]));

    assert_eq!(h.dataset.latest().unwrap().len(), 3);
    assert_eq!(h.dataset.raw_keys().len(), 2);
}

#[test]
fn all_primary_failed_aborts_before_touching_canonical_state() {
    let connector = FakeConnector::default()
        .failing("primary_api", "HTTP 503")
        .ok("fixture", vec![row("F1", "고용 장려금")]);
    let h = harness(context(SOURCES), connector, MemoryDatasetStore::new());

    let outcome = h.pipeline.run("run-2", RunMode::Daily);

    assert!(matches!(outcome, RunOutcome::Errored { .. }), "{outcome:?}");
    assert!(h.dataset.latest().is_none());

    // Still promoted for inspection.
    assert_eq!(h.artifacts.latest_run_id().as_deref(), Some("run-2"));
    let meta = latest(&h, "run_meta.json");
    assert_eq!(meta["status"], "failed");
    assert_eq!(meta["stage"], "exception");
    assert_eq!(meta["details"]["error"], "all primary sources failed (hard fail)");
    let fetch = latest(&h, "fetch/report.json");
    assert_eq!(fetch[0]["ok"], false);
    assert_eq!(fetch[0]["error"], "HTTP 503");
}

#[test]
fn bootstrap_mode_tolerates_primary_failure() {
    let connector = FakeConnector::default()
        .failing("primary_api", "HTTP 503")
        .ok("fixture", vec![row("F1", "고용 장려금")]);
    let h = harness(context(SOURCES), connector, MemoryDatasetStore::new());

    let outcome = h.pipeline.run("boot", RunMode::Bootstrap);

    assert!(matches!(outcome, RunOutcome::Success { .. }), "{outcome:?}");
    assert_eq!(h.dataset.latest().unwrap().len(), 1);
}

#[test]
fn policy_hard_fail_is_a_gate_failure_not_an_error() {
    let mut ctx = context(SOURCES);
    ctx.policy.banned_phrases.push("공식 출처".into());
    let connector = FakeConnector::default().ok("primary_api", vec![row("P1", "청년 월세 지원")]);
    let h = harness(ctx, connector, MemoryDatasetStore::new());

    let outcome = h.pipeline.run("gate", RunMode::Daily);

    assert!(matches!(outcome, RunOutcome::GateFailed { .. }), "{outcome:?}");
    let meta = latest(&h, "run_meta.json");
    assert_eq!(meta["status"], "failed");
    assert_eq!(meta["stage"], "gates");
    assert_eq!(meta["details"]["quality"], "pass");
    assert_eq!(meta["details"]["monetization"], "hard_fail");
    assert_eq!(latest(&h, "publish/report.json")["deploy_ready"], false);
    // Rotation happens before the gates.
    assert!(h.dataset.latest().is_some());
}

#[test]
fn empty_canonical_set_is_fatal() {
    let connector = FakeConnector::default().ok("primary_api", Vec::new()).ok("fixture", Vec::new());
    let h = harness(context(SOURCES), connector, MemoryDatasetStore::new());

    let outcome = h.pipeline.run("empty", RunMode::Daily);

    match outcome {
        RunOutcome::Errored { message, .. } => assert_eq!(message, "canonical dataset is empty"),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn missing_source_is_closed_and_previous_is_rotated() {
    let previous = vec![previous_record("A", "청년 월세 지원"), previous_record("B", "창업 지원금")];
    let connector = FakeConnector::default().ok("primary_api", vec![row("A", "청년 월세 특별 지원")]);
    let h = harness(context(SOURCES), connector, MemoryDatasetStore::with_latest(previous.clone()));

    let outcome = h.pipeline.run("diff", RunMode::Daily);
    assert!(matches!(outcome, RunOutcome::Success { .. }), "{outcome:?}");

    assert_eq!(h.dataset.previous().unwrap(), previous);
    let canonical = h.dataset.latest().unwrap();
    assert_eq!(canonical.len(), 2);
    assert_eq!(canonical[0].change_type, Some(ChangeType::Updated));
    assert_eq!(canonical[1].policy_id, "B");
    assert_eq!(canonical[1].status, RecordStatus::Closed);

    let changes = latest(&h, "changes/changes.json");
    assert_eq!(changes.as_array().unwrap().len(), 2);
    assert_eq!(latest(&h, "publish/manifest.json")["excluded_pages"], 1);
}

#[test]
fn cross_source_collision_is_reported() {
    let connector = FakeConnector::default()
        .ok("primary_api", vec![row("SAME", "청년 월세 지원")])
        .ok("fixture", vec![row("SAME", "농업인 바우처")]);
    let h = harness(context(SOURCES), connector, MemoryDatasetStore::new());

    assert!(matches!(h.pipeline.run("clash", RunMode::Daily), RunOutcome::Success { .. }));

    let collisions = latest(&h, "changes/collisions.json");
    assert_eq!(collisions.as_array().unwrap().len(), 1);
    assert_eq!(collisions[0]["kept_source"], "fixture");
    assert_eq!(collisions[0]["dropped_source"], "primary_api");
    assert_eq!(h.dataset.latest().unwrap()[0].title, "농업인 바우처");
}

#[test]
fn invalid_source_config_fails_the_run() {
    let bad = r#"{"sources":[{"source_id":"x","kind":"ftp","endpoint":"ftp://x"}]}"#;
    let h = harness(context(bad), FakeConnector::default(), MemoryDatasetStore::new());

    match h.pipeline.run("bad", RunMode::Daily) {
        RunOutcome::Errored { message, .. } => assert!(message.starts_with("source schema invalid"), "{message}"),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(h.dataset.raw_keys().is_empty());
}

#[test]
fn renderer_panic_is_recorded() {
    let connector = FakeConnector::default().ok("primary_api", vec![row("P1", "청년 월세 지원")]);
    let site = tempfile::tempdir().unwrap();
    let h = harness_with(
        context(SOURCES),
        connector,
        MemoryDatasetStore::new(),
        Box::new(PanickingRenderer),
        site,
    );

    let outcome = h.pipeline.run("panic", RunMode::Daily);

    assert!(matches!(outcome, RunOutcome::Errored { .. }), "{outcome:?}");
    let meta = latest(&h, "run_meta.json");
    assert_eq!(meta["stage"], "exception");
    assert_eq!(meta["details"]["error"], "panic: template missing");
    assert!(meta["details"]["traceback"].as_str().unwrap().contains("normalize"));
}

#[test]
fn parallel_fetch_matches_sequential() {
    let rows = || {
        FakeConnector::default()
            .ok("primary_api", vec![row("SAME", "청년 월세 지원"), row("P2", "창업 지원금")])
            .ok("fixture", vec![row("SAME", "농업인 바우처")])
    };
    let sequential = harness(context(SOURCES), rows(), MemoryDatasetStore::new());
    let mut ctx = context(SOURCES);
    ctx.parallel_fetch = true;
    let parallel = harness(ctx, rows(), MemoryDatasetStore::new());

    sequential.pipeline.run("seq", RunMode::Daily);
    parallel.pipeline.run("par", RunMode::Daily);

    let ids = |h: &Harness| -> Vec<(String, String)> {
        h.dataset
            .latest()
            .unwrap()
            .into_iter()
            .map(|r| (r.policy_id, r.title))
            .collect()
    };
    assert_eq!(ids(&sequential), ids(&parallel));
}
