//! `policyfeed report`: markdown snapshot of the latest run.

use std::path::{Path, PathBuf};

use policyfeed_config::Settings;
use policyfeed_pipeline::store::read_json_file;
use serde_json::{Map, Value};

use crate::CliError;

/// An object document, or an empty map for anything missing or malformed.
fn safe_read(path: &Path) -> Map<String, Value> {
    match read_json_file(path) {
        Ok(Some(Value::Object(map))) => map,
        _ => Map::new(),
    }
}

fn field(doc: &Map<String, Value>, key: &str) -> String {
    match doc.get(key) {
        None | Some(Value::Null) => "n/a".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

pub fn render_snapshot(latest: &Path) -> String {
    let quality = safe_read(&latest.join("quality/report.json"));
    let monetization = safe_read(&latest.join("monetization/report.json"));
    let publish = safe_read(&latest.join("publish/report.json"));
    let run_meta = safe_read(&latest.join("run_meta.json"));

    let mut lines = vec![
        "# Weekly Ops Snapshot".to_string(),
        format!("- run_id: {}", field(&run_meta, "run_id")),
        format!("- status: {}", field(&run_meta, "status")),
        format!("- generated_pages: {}", field(&publish, "generated_pages")),
        format!("- quality_decision: {}", field(&quality, "decision")),
        format!("- monetization_decision: {}", field(&monetization, "decision")),
    ];
    let metrics = match quality.get("metrics") {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    for key in ["null_ratio", "duplicate_ratio", "broken_link_ratio"] {
        lines.push(format!("- {key}: {}", field(&metrics, key)));
    }
    lines.join("\n")
}

pub fn cmd_report(config: Option<&Path>, latest_dir: Option<PathBuf>) -> Result<(), CliError> {
    let latest = match latest_dir {
        Some(dir) => dir,
        None => {
            let (settings, _) = Settings::load(config).map_err(CliError::config)?;
            settings.paths.artifacts_dir().join("latest")
        }
    };
    println!("{}", render_snapshot(&latest));
    Ok(())
}
