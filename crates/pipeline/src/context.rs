use std::path::PathBuf;

use policyfeed_config::Settings;
use policyfeed_gates::{PolicyRules, QualityThresholds};

use crate::error::PipelineError;

/// Where the source configuration document comes from.
#[derive(Debug, Clone)]
pub enum SourcesInput {
    File(PathBuf),
    Inline(String),
}

impl SourcesInput {
    pub fn read(&self) -> Result<String, PipelineError> {
        match self {
            Self::File(path) => {
                std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))
            }
            Self::Inline(text) => Ok(text.clone()),
        }
    }
}

/// Everything a run needs besides its collaborators. No global root: every
/// path here is already resolved.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub sources: SourcesInput,
    pub site_base_url: String,
    pub health_check_paths: Vec<String>,
    /// Skip publish health checks even for an http(s) base URL.
    pub skip_health_checks: bool,
    pub thresholds: QualityThresholds,
    pub policy: PolicyRules,
    pub parallel_fetch: bool,
    /// Recorded in the manifest; `local` outside CI.
    pub build_sha: String,
}

impl PipelineContext {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            sources: SourcesInput::File(settings.paths.sources_file()),
            site_base_url: settings.site.base_url.clone(),
            health_check_paths: settings.site.health_check_paths.clone(),
            skip_health_checks: false,
            thresholds: settings.quality,
            policy: settings.policy.clone(),
            parallel_fetch: settings.fetch.parallel,
            build_sha: build_sha_from_env(),
        }
    }

    pub fn with_site_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.site_base_url = base_url.into();
        self
    }

    /// Health checks run only against an http(s) base URL.
    pub fn health_checks_enabled(&self) -> bool {
        !self.skip_health_checks && self.site_base_url.starts_with("http")
    }
}

/// `$GITHUB_SHA`, else `local`.
pub fn build_sha_from_env() -> String {
    std::env::var("GITHUB_SHA")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "local".to_string())
}
