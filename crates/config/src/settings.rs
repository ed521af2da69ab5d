// Pipeline settings
// Loaded from policyfeed.toml; every key is optional.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use policyfeed_gates::{PolicyRules, QualityThresholds};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable naming a settings file.
pub const CONFIG_ENV: &str = "POLICYFEED_CONFIG";
/// Looked up in the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "policyfeed.toml";

/// Filesystem layout. Relative paths resolve against `root`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub root: PathBuf,
    /// Source configuration document.
    pub sources: PathBuf,
    /// Holds the `latest/` and `previous/` canonical slots.
    pub canonical_dir: PathBuf,
    /// Dated raw snapshots per source.
    pub raw_dir: PathBuf,
    /// `runs/<run_id>/` bundles and the `latest/` mirror.
    pub artifacts_dir: PathBuf,
    /// Rendered site output.
    pub site_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            sources: PathBuf::from("data/sources/policy_sources.json"),
            canonical_dir: PathBuf::from("data/canonical"),
            raw_dir: PathBuf::from("data/raw"),
            artifacts_dir: PathBuf::from("artifacts"),
            site_dir: PathBuf::from("apps/site/dist"),
        }
    }
}

impl PathSettings {
    /// `path` if absolute, else `root/path`.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn sources_file(&self) -> PathBuf {
        self.resolve(&self.sources)
    }

    pub fn canonical_dir(&self) -> PathBuf {
        self.resolve(&self.canonical_dir)
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.resolve(&self.raw_dir)
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.resolve(&self.artifacts_dir)
    }

    pub fn site_dir(&self) -> PathBuf {
        self.resolve(&self.site_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Attempts per page, including the first.
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    /// Fetch sources on scoped threads. Output order is unchanged.
    pub parallel: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            retry_attempts: 3,
            retry_backoff_ms: 400,
            parallel: false,
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    /// Base for canonical links and post-build health checks.
    pub base_url: String,
    pub health_check_paths: Vec<String>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            base_url: "https://cbbxs.com".to_string(),
            health_check_paths: vec!["/".into(), "/updates/".into(), "/sitemap.xml".into()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub fetch: FetchSettings,
    pub quality: QualityThresholds,
    pub policy: PolicyRules,
    pub site: SiteSettings,
}

impl Settings {
    /// Parse and validate TOML. `origin` names the input in errors.
    pub fn from_toml(input: &str, origin: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(input).map_err(|e| ConfigError::Parse {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents, &path.display().to_string())
    }

    /// Which settings file to use: `explicit`, then `$POLICYFEED_CONFIG`,
    /// then `./policyfeed.toml` if it exists.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        local.exists().then_some(local)
    }

    /// Load from the located file, or defaults when there is none.
    ///
    /// A named file that cannot be read is an error; silence only applies to
    /// the implicit `./policyfeed.toml`.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match Self::locate(explicit) {
            Some(path) => Ok((Self::from_file(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.retry_attempts == 0 {
            return Err(ConfigError::Invalid("fetch.retry_attempts must be at least 1".into()));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Invalid("fetch.timeout_secs must be at least 1".into()));
        }
        self.quality
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("quality.{e}")))?;
        if self.policy.disclaimer_phrase.trim().is_empty() {
            return Err(ConfigError::Invalid("policy.disclaimer_phrase must not be empty".into()));
        }
        for path in &self.site.health_check_paths {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid(format!(
                    "site.health_check_paths entry '{path}' must start with '/'"
                )));
            }
        }
        Ok(())
    }
}
