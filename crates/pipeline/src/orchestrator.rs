//! One run, start to finish.
//!
//! `Pipeline::run` never returns an error: every failure becomes a terminal
//! [`RunMeta`] and a [`RunOutcome`], and the run directory is promoted to
//! `latest` whatever happened.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, SecondsFormat};
use policyfeed_connect::SourceConnector;
use policyfeed_core::{Decision, FetchReport, RunMeta, RunStage, SourceConfig, SourceDefinition};
use policyfeed_gates::{build_manifest, deploy_ready, monetization, quality};
use policyfeed_recon::{reconcile, ReconInput};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::context::PipelineContext;
use crate::error::PipelineError;
use crate::fetch::fetch_all;
use crate::health::run_health_checks;
use crate::render::Renderer;
use crate::schema::SchemaSet;
use crate::store::{ArtifactBundle, ArtifactStore, DatasetStore};

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const RUN_META: &str = "run_meta.json";

pub fn now_iso() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

// ── Mode / outcome ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Daily,
    /// Fixture-only runs: all primary sources failing is tolerated.
    Bootstrap,
}

impl RunMode {
    pub fn tolerates_primary_failure(&self) -> bool {
        matches!(self, Self::Bootstrap)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Bootstrap => write!(f, "bootstrap"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "bootstrap" => Ok(Self::Bootstrap),
            other => Err(format!("unknown run mode '{other}' (expected daily or bootstrap)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success {
        run_id: String,
        quality: Decision,
        monetization: Decision,
        generated_pages: usize,
    },
    /// A gate returned hard_fail. Expected, fixed by a rerun.
    GateFailed {
        run_id: String,
        quality: Decision,
        monetization: Decision,
        generated_pages: usize,
    },
    /// Setup error, fatal pipeline error or panic.
    Errored { run_id: String, message: String },
}

impl RunOutcome {
    pub fn run_id(&self) -> &str {
        match self {
            Self::Success { run_id, .. } | Self::GateFailed { run_id, .. } | Self::Errored { run_id, .. } => run_id,
        }
    }
}

/// `publish/report.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishReport {
    pub run_id: String,
    pub deploy_ready: bool,
    pub quality_decision: Decision,
    pub monetization_decision: Decision,
    pub generated_pages: usize,
    pub timestamp: String,
    pub site_base_url: String,
    pub health_check_errors: Vec<String>,
}

/// What `execute` hands back when it reaches the gates.
struct GateSummary {
    quality: Decision,
    monetization: Decision,
    generated_pages: usize,
    deploy_ready: bool,
}

impl GateSummary {
    fn details(&self) -> Value {
        json!({
            "quality": self.quality,
            "monetization": self.monetization,
            "generated_pages": self.generated_pages,
        })
    }
}

// ── Pipeline ────────────────────────────────────────────────────────

pub struct Pipeline {
    ctx: PipelineContext,
    connector: Arc<dyn SourceConnector>,
    renderer: Box<dyn Renderer>,
    artifacts: Arc<dyn ArtifactStore>,
    dataset: Arc<dyn DatasetStore>,
    schemas: SchemaSet,
}

impl Pipeline {
    pub fn new(
        ctx: PipelineContext,
        connector: Arc<dyn SourceConnector>,
        renderer: Box<dyn Renderer>,
        artifacts: Arc<dyn ArtifactStore>,
        dataset: Arc<dyn DatasetStore>,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            ctx,
            connector,
            renderer,
            artifacts,
            dataset,
            schemas: SchemaSet::new()?,
        })
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    pub fn run(&self, run_id: &str, mode: RunMode) -> RunOutcome {
        let started_at = now_iso();
        let mut meta = RunMeta::start(
            run_id,
            &started_at,
            json!({ "mode": mode, "started_at": started_at }),
        );
        info!(run_id, %mode, "run started");

        let result = match self.write_meta(&meta) {
            Ok(()) => panic::catch_unwind(AssertUnwindSafe(|| self.execute(run_id, mode, &mut meta))),
            Err(e) => Ok(Err(e)),
        };

        let at = now_iso();
        let mut outcome = match result {
            Ok(Ok(summary)) if summary.deploy_ready => {
                self.finish(&mut meta, |m| m.succeed(&at, summary.details()));
                info!(run_id, quality = %summary.quality, monetization = %summary.monetization, "pipeline completed successfully");
                RunOutcome::Success {
                    run_id: run_id.to_string(),
                    quality: summary.quality,
                    monetization: summary.monetization,
                    generated_pages: summary.generated_pages,
                }
            }
            Ok(Ok(summary)) => {
                self.finish(&mut meta, |m| m.fail(RunStage::Gates, &at, summary.details()));
                warn!(run_id, quality = %summary.quality, monetization = %summary.monetization, "pipeline finished with hard_fail gate");
                RunOutcome::GateFailed {
                    run_id: run_id.to_string(),
                    quality: summary.quality,
                    monetization: summary.monetization,
                    generated_pages: summary.generated_pages,
                }
            }
            Ok(Err(e)) => self.errored(&mut meta, &at, e.to_string(), e.trace()),
            Err(payload) => {
                let message = format!("panic: {}", panic_message(payload.as_ref()));
                let trace = format!("{message}\nat stage: {}", meta.stage);
                self.errored(&mut meta, &at, message, trace)
            }
        };

        // The run directory is promoted on every path, for post-mortems.
        let sync = self.write_meta(&meta).and_then(|()| self.artifacts.promote_latest(run_id));
        if let Err(e) = sync {
            error!(run_id, error = %e, "failed to sync run artifacts");
            if !matches!(outcome, RunOutcome::Errored { .. }) {
                outcome = RunOutcome::Errored {
                    run_id: run_id.to_string(),
                    message: format!("artifact sync failed: {e}"),
                };
            }
        }
        outcome
    }

    fn errored(&self, meta: &mut RunMeta, at: &str, message: String, trace: String) -> RunOutcome {
        error!(run_id = %meta.run_id, stage = %meta.stage, error = %message, "pipeline failed");
        self.finish(meta, |m| {
            m.fail(
                RunStage::Exception,
                at,
                json!({ "error": message, "traceback": trace }),
            )
        });
        RunOutcome::Errored {
            run_id: meta.run_id.clone(),
            message,
        }
    }

    /// Apply the terminal transition. Only a bug can make it fail.
    fn finish(
        &self,
        meta: &mut RunMeta,
        transition: impl FnOnce(&mut RunMeta) -> Result<(), policyfeed_core::CoreError>,
    ) {
        if let Err(e) = transition(meta) {
            error!(run_id = %meta.run_id, error = %e, "run state already terminal");
        }
    }

    fn write_meta(&self, meta: &RunMeta) -> Result<(), PipelineError> {
        let value = serde_json::to_value(meta).map_err(|e| PipelineError::json(RUN_META, e))?;
        self.artifacts.put_artifact(&meta.run_id, RUN_META, &value)
    }

    fn execute(&self, run_id: &str, mode: RunMode, meta: &mut RunMeta) -> Result<GateSummary, PipelineError> {
        let config = self.load_sources()?;

        // ── fetch ──
        let enabled: Vec<SourceDefinition> = config.enabled().cloned().collect();
        info!(run_id, sources = enabled.len(), parallel = self.ctx.parallel_fetch, "fetching sources");
        let fetched = fetch_all(self.connector.as_ref(), &enabled, self.ctx.parallel_fetch);

        let today = Local::now().format("%Y-%m-%d").to_string();
        let mut input = ReconInput::new();
        let mut fetch_report: Vec<FetchReport> = Vec::with_capacity(enabled.len());
        let mut raw = ArtifactBundle::new();
        for (source, fetch) in enabled.iter().zip(fetched) {
            self.dataset.save_raw(&today, &source.source_id, &fetch.rows)?;
            raw.insert(&format!("raw/{}.json", source.source_id), &fetch.rows)?;
            fetch_report.push(fetch.report);
            input.push(source.source_id.clone(), fetch.rows);
        }
        raw.insert("fetch/report.json", &fetch_report)?;
        self.artifacts.put_run(run_id, &raw)?;

        let failed = fetch_report.iter().filter(|r| !r.ok).count();
        meta.advance(
            RunStage::Fetch,
            &now_iso(),
            json!({ "sources_ok": fetch_report.len() - failed, "sources_failed": failed }),
        )?;
        self.write_meta(meta)?;

        let primaries: Vec<&FetchReport> = fetch_report
            .iter()
            .filter(|r| config.get(&r.source_id).is_some_and(|s| s.primary))
            .collect();
        if !primaries.is_empty() && primaries.iter().all(|r| !r.ok) {
            if !mode.tolerates_primary_failure() {
                return Err(PipelineError::AllPrimaryFailed);
            }
            warn!(run_id, primaries = primaries.len(), "all primary sources failed, continuing in bootstrap mode");
        }

        // ── normalize ──
        let previous = self.dataset.load_latest()?;
        let output = reconcile(&input, &config, &previous, &now_iso())?;
        if output.canonical.is_empty() {
            return Err(PipelineError::EmptyCanonical);
        }
        let canonical_value =
            serde_json::to_value(&output.canonical).map_err(|e| PipelineError::json("canonical set", e))?;
        PipelineError::check_schema("policy", self.schemas.validate_canonical(&canonical_value))?;
        self.dataset.save_with_rotation(&output.canonical)?;

        meta.advance(
            RunStage::Normalize,
            &now_iso(),
            json!({ "canonical": output.summary.total, "collisions": output.summary.collisions }),
        )?;
        self.write_meta(meta)?;

        // ── render + gates ──
        let rendered = self.renderer.render(&output.canonical, &output.changes)?;
        let metrics = quality::compute_metrics(&output.canonical, &rendered.pages);
        let frontend = quality::frontend_report(&metrics);
        let quality_report = quality::evaluate(
            &metrics,
            previous.len(),
            output.canonical.len(),
            quality::count_missing_official_url(&output.canonical),
            &self.ctx.thresholds,
        );
        let quality_value =
            serde_json::to_value(&quality_report).map_err(|e| PipelineError::json("quality report", e))?;
        PipelineError::check_schema("quality", self.schemas.validate_quality(&quality_value))?;

        let monetization_report = monetization::evaluate(&rendered.pages, &self.ctx.policy);

        let manifest = build_manifest(run_id, rendered.counts, &self.ctx.build_sha, &now_iso());
        let manifest_value =
            serde_json::to_value(&manifest).map_err(|e| PipelineError::json("manifest", e))?;
        PipelineError::check_schema("manifest", self.schemas.validate_manifest(&manifest_value))?;

        let ready = deploy_ready(&quality_report, &monetization_report);
        let health_check_errors = if self.ctx.health_checks_enabled() {
            run_health_checks(&self.ctx.site_base_url, &self.ctx.health_check_paths, HEALTH_CHECK_TIMEOUT)
        } else {
            Vec::new()
        };
        let publish = PublishReport {
            run_id: run_id.to_string(),
            deploy_ready: ready,
            quality_decision: quality_report.decision,
            monetization_decision: monetization_report.decision,
            generated_pages: manifest.generated_pages,
            timestamp: now_iso(),
            site_base_url: self.ctx.site_base_url.clone(),
            health_check_errors,
        };
        info!(
            run_id,
            quality = %quality_report.decision,
            monetization = %monetization_report.decision,
            generated_pages = manifest.generated_pages,
            deploy_ready = ready,
            "gates evaluated"
        );

        let mut bundle = ArtifactBundle::new();
        bundle.insert("canonical/policies.json", &canonical_value)?;
        bundle.insert("quality/report.json", &quality_value)?;
        bundle.insert("frontend/report.json", &frontend)?;
        bundle.insert("monetization/report.json", &monetization_report)?;
        bundle.insert("changes/changes.json", &output.changes)?;
        bundle.insert("changes/collisions.json", &output.collisions)?;
        bundle.insert("publish/manifest.json", &manifest_value)?;
        bundle.insert("publish/report.json", &publish)?;
        self.artifacts.put_run(run_id, &bundle)?;

        Ok(GateSummary {
            quality: quality_report.decision,
            monetization: monetization_report.decision,
            generated_pages: manifest.generated_pages,
            deploy_ready: ready,
        })
    }

    /// Read, schema-check and parse the source configuration.
    fn load_sources(&self) -> Result<SourceConfig, PipelineError> {
        let text = self.ctx.sources.read()?;
        let doc: Value =
            serde_json::from_str(&text).map_err(|e| PipelineError::json("source configuration", e))?;
        PipelineError::check_schema("source", self.schemas.validate_sources(&doc))?;
        let config: SourceConfig =
            serde_json::from_value(doc).map_err(|e| PipelineError::json("source configuration", e))?;
        config.validate()?;
        Ok(config)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing() {
        assert_eq!("daily".parse::<RunMode>().unwrap(), RunMode::Daily);
        assert_eq!(" Bootstrap ".parse::<RunMode>().unwrap(), RunMode::Bootstrap);
        assert!("weekly".parse::<RunMode>().is_err());
        assert_eq!(RunMode::Bootstrap.to_string(), "bootstrap");
    }

    #[test]
    fn outcomes_carry_run_id() {
        let gate = RunOutcome::GateFailed {
            run_id: "r".into(),
            quality: Decision::Pass,
            monetization: Decision::HardFail,
            generated_pages: 1,
        };
        let err = RunOutcome::Errored {
            run_id: "r".into(),
            message: "x".into(),
        };
        assert_eq!(gate.run_id(), "r");
        assert_eq!(err.run_id(), "r");
    }

    #[test]
    fn panic_payloads() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
