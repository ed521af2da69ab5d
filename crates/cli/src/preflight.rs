//! `policyfeed preflight`: required environment variables per job profile.

use clap::ValueEnum;

use crate::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    /// Data refresh: source API keys
    Refresh,
    /// Static site deploy: hosting credentials
    Deploy,
    All,
}

const REFRESH_VARS: &[&str] = &["DATA_GO_KR_API_KEY"];
const DEPLOY_VARS: &[&str] = &["CLOUDFLARE_API_TOKEN", "CLOUDFLARE_ACCOUNT_ID", "PAGES_PROJECT_NAME"];
const ADSENSE_VAR: &str = "ADSENSE_CLIENT_ID";

impl Profile {
    pub fn required(&self) -> Vec<&'static str> {
        match self {
            Self::Refresh => REFRESH_VARS.to_vec(),
            Self::Deploy => DEPLOY_VARS.to_vec(),
            Self::All => REFRESH_VARS.iter().chain(DEPLOY_VARS).copied().collect(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::Deploy => "deploy",
            Self::All => "all",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct PreflightResult {
    pub missing: Vec<&'static str>,
    pub warnings: Vec<String>,
}

/// Pure check over an env lookup. Empty values count as missing.
pub fn check(
    profile: Profile,
    allow_missing_adsense: bool,
    lookup: impl Fn(&str) -> Option<String>,
) -> PreflightResult {
    let is_set = |name: &str| lookup(name).is_some_and(|v| !v.is_empty());
    let missing = profile.required().into_iter().filter(|name| !is_set(name)).collect();
    let mut warnings = Vec::new();
    if !allow_missing_adsense && !is_set(ADSENSE_VAR) {
        warnings.push(format!("{ADSENSE_VAR} is not set (optional)"));
    }
    PreflightResult { missing, warnings }
}

pub fn cmd_preflight(profile: Profile, allow_missing_adsense: bool) -> Result<(), CliError> {
    let result = check(profile, allow_missing_adsense, |name| std::env::var(name).ok());
    for warning in &result.warnings {
        println!("[WARN] {warning}");
    }
    if !result.missing.is_empty() {
        println!("[ERROR] Missing required environment variables:");
        for name in &result.missing {
            println!("- {name}");
        }
        return Err(CliError::setup(""));
    }
    println!("preflight ok (profile={})", profile.name());
    Ok(())
}
