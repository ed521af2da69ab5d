// policyfeed CLI - daily policy ingestion pipeline

mod exit_codes;
mod gate;
mod preflight;
mod report;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use policyfeed_pipeline::RunMode;
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS};
use preflight::Profile;

#[derive(Parser)]
#[command(name = "policyfeed")]
#[command(about = "Policy data ingestion: fetch, reconcile, gate, publish")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Settings file (default: $POLICYFEED_CONFIG, then ./policyfeed.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write logs to stderr as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline once
    #[command(after_help = "\
Examples:
  policyfeed run --run-id 2026-03-01-daily
  policyfeed run --run-id fixture --mode bootstrap --site-base-url http://localhost:8080
  RUST_LOG=policyfeed=debug policyfeed run --run-id manual --log-json")]
    Run {
        /// Unique run id; names the artifacts/runs/<id> directory
        #[arg(long)]
        run_id: String,

        /// daily, or bootstrap to tolerate all primary sources failing
        #[arg(long, default_value = "daily")]
        mode: RunMode,

        /// Public base URL used for canonical links and the sitemap
        #[arg(long, env = "SITE_BASE_URL")]
        site_base_url: Option<String>,

        /// Do not GET the published pages after the build
        #[arg(long)]
        skip_health_checks: bool,
    },

    /// Evaluate the quality gate over an existing canonical file and site
    #[command(after_help = "\
Examples:
  policyfeed quality-gate --canonical data/canonical/latest/policies.json --site-dir apps/site/dist
  policyfeed quality-gate --canonical latest.json --site-dir dist --previous previous.json")]
    QualityGate {
        /// Canonical policies.json (a JSON array)
        #[arg(long)]
        canonical: PathBuf,

        /// Generated static site directory
        #[arg(long)]
        site_dir: PathBuf,

        /// Previous canonical policies.json, for the volume-drop check
        #[arg(long)]
        previous: Option<PathBuf>,
    },

    /// Check that required environment variables are set
    Preflight {
        #[arg(long, value_enum, default_value = "all")]
        profile: Profile,

        /// ADSENSE_CLIENT_ID is optional; do not warn about it
        #[arg(long)]
        allow_missing_adsense: bool,
    },

    /// Print a markdown snapshot of the latest run
    Report {
        /// Latest-run directory (default: <artifacts_dir>/latest)
        #[arg(long)]
        latest_dir: Option<PathBuf>,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nschemas: source_connector.v1 policy.v1 quality.v1 manifest.v1",
    )
}

const DEFAULT_LOG_FILTER: &str = "policyfeed=info";

/// `RUST_LOG` when set and parseable, otherwise info for our own crates.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| EnvFilter::try_new(v).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn init_logging(json: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let builder = tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help / --version land here too
            let code = if e.use_stderr() { EXIT_ERROR } else { EXIT_SUCCESS };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };
    init_logging(cli.log_json);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run {
            run_id,
            mode,
            site_base_url,
            skip_health_checks,
        } => run::cmd_run(config, &run_id, mode, site_base_url, skip_health_checks),
        Commands::QualityGate {
            canonical,
            site_dir,
            previous,
        } => gate::cmd_quality_gate(config, &canonical, &site_dir, previous.as_deref()),
        Commands::Preflight {
            profile,
            allow_missing_adsense,
        } => preflight::cmd_preflight(profile, allow_missing_adsense),
        Commands::Report { latest_dir } => report::cmd_report(config, latest_dir),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Exit 1: setup or IO problem.
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Settings could not be loaded.
    pub fn config(err: policyfeed_config::ConfigError) -> Self {
        Self::setup(err.to_string())
            .with_hint("check --config, $POLICYFEED_CONFIG or ./policyfeed.toml")
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
