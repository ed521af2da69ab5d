//! `policyfeed quality-gate`: the quality gate over files already on disk.

use std::path::Path;

use policyfeed_config::Settings;
use policyfeed_gates::quality::run_quality_gate_on_values;
use policyfeed_pipeline::store::read_json_file;
use serde_json::Value;
use policyfeed_pipeline::{SchemaSet, SiteScanner};

use crate::exit_codes::{decision_exit_code, EXIT_SUCCESS};
use crate::CliError;

pub fn cmd_quality_gate(
    config: Option<&Path>,
    canonical_path: &Path,
    site_dir: &Path,
    previous_path: Option<&Path>,
) -> Result<(), CliError> {
    if !canonical_path.exists() {
        return Err(CliError::setup(format!(
            "canonical file not found: {}",
            canonical_path.display()
        )));
    }
    if !site_dir.exists() {
        return Err(CliError::setup(format!("site dir not found: {}", site_dir.display())));
    }
    let (settings, _) = Settings::load(config).map_err(CliError::config)?;

    // Untyped: missing keys count as nulls, scalars are stringified.
    let canonical = match read_json_file(canonical_path).map_err(|e| CliError::setup(e.to_string()))? {
        Some(Value::Array(entries)) => entries,
        _ => return Err(CliError::setup("canonical must be list")),
    };

    // A missing or non-list previous file counts as no previous run.
    let previous_count = match previous_path {
        Some(path) => read_json_file(path)
            .ok()
            .flatten()
            .and_then(|v| v.as_array().map(Vec::len))
            .unwrap_or(0),
        None => 0,
    };

    let pages = SiteScanner::new(site_dir)
        .scan()
        .map_err(|e| CliError::setup(e.to_string()))?;
    let report = run_quality_gate_on_values(&canonical, &pages, previous_count, &settings.quality);

    let schemas = SchemaSet::new().map_err(|e| CliError::setup(e.to_string()))?;
    let value = serde_json::to_value(&report).map_err(|e| CliError::setup(e.to_string()))?;
    let errors = schemas.validate_quality(&value);
    if !errors.is_empty() {
        let mut message = String::from("quality schema invalid");
        for err in errors.iter().take(5) {
            message.push_str("\n- ");
            message.push_str(err);
        }
        return Err(CliError::setup(message));
    }

    println!("quality decision: {}", report.decision);
    println!("metrics: {}", value["metrics"]);
    if !report.hard_fail.is_empty() {
        println!("hard_fail:");
        for item in &report.hard_fail {
            println!("- {item}");
        }
    } else if !report.soft_fail.is_empty() {
        println!("soft_fail:");
        for item in &report.soft_fail {
            println!("- {item}");
        }
    }

    match decision_exit_code(report.decision) {
        EXIT_SUCCESS => Ok(()),
        code => Err(CliError::new(code, "")),
    }
}
