//! `policyfeed run`: one full pipeline run.

use std::path::Path;
use std::sync::Arc;

use policyfeed_config::Settings;
use policyfeed_connect::{Connector, ConnectorSettings, EnvSecrets, RetryPolicy};
use policyfeed_pipeline::{
    DetailPageRenderer, FsArtifactStore, FsDatasetStore, Pipeline, PipelineContext, RunMode,
    RunOutcome,
};
use tracing::info;

use crate::exit_codes::run_exit_code;
use crate::CliError;

pub fn cmd_run(
    config: Option<&Path>,
    run_id: &str,
    mode: RunMode,
    site_base_url: Option<String>,
    skip_health_checks: bool,
) -> Result<(), CliError> {
    if run_id.trim().is_empty() || run_id.contains(['/', '\\']) || run_id.starts_with('.') {
        return Err(CliError::setup(format!("invalid run id '{run_id}'"))
            .with_hint("use a plain name such as 2026-03-01-daily"));
    }

    let (settings, origin) = Settings::load(config).map_err(CliError::config)?;
    match &origin {
        Some(path) => info!(config = %path.display(), "settings loaded"),
        None => info!("no settings file, using defaults"),
    }

    let mut ctx = PipelineContext::from_settings(&settings);
    if let Some(url) = site_base_url.filter(|u| !u.trim().is_empty()) {
        ctx = ctx.with_site_base_url(url);
    }
    ctx.skip_health_checks = skip_health_checks;

    let paths = &settings.paths;
    let connector = Connector::new(
        ConnectorSettings {
            root: paths.root.clone(),
            timeout: settings.fetch.timeout(),
            retry: RetryPolicy {
                attempts: settings.fetch.retry_attempts,
                backoff: settings.fetch.backoff(),
            },
        },
        Arc::new(EnvSecrets),
    )
    .map_err(|e| CliError::setup(e.to_string()))?;
    let renderer = DetailPageRenderer::new(
        paths.site_dir(),
        &ctx.site_base_url,
        &ctx.policy.disclaimer_phrase,
    );
    let artifacts = Arc::new(FsArtifactStore::new(paths.artifacts_dir()));
    let dataset = Arc::new(FsDatasetStore::new(paths.canonical_dir(), paths.raw_dir()));

    let pipeline = Pipeline::new(ctx, Arc::new(connector), Box::new(renderer), artifacts, dataset)
        .map_err(|e| CliError::setup(e.to_string()))?;

    let outcome = pipeline.run(run_id, mode);
    let code = run_exit_code(&outcome);
    match outcome {
        RunOutcome::Success { quality, monetization, generated_pages, .. } => {
            println!("pipeline completed successfully");
            println!("quality: {quality}, monetization: {monetization}, pages: {generated_pages}");
            Ok(())
        }
        RunOutcome::GateFailed { quality, monetization, .. } => Err(CliError::new(
            code,
            format!("pipeline finished with hard_fail gate (quality: {quality}, monetization: {monetization})"),
        )
        .with_hint(format!("see {}/latest for the reports", paths.artifacts_dir().display()))),
        RunOutcome::Errored { message, .. } => Err(CliError::new(code, format!("pipeline failed: {message}"))
            .with_hint(format!(
                "run_meta.json in {}/latest has the trace",
                paths.artifacts_dir().display()
            ))),
    }
}
