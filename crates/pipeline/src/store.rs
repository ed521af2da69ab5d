//! Artifact and dataset storage.
//!
//! Both stores are traits so the orchestrator can be exercised against
//! in-memory doubles; the filesystem versions write through a temp file (or a
//! staging directory) and rename, so readers never see a partial write.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use policyfeed_core::{CanonicalRecord, RawRow};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::PipelineError;

pub const CANONICAL_FILE: &str = "policies.json";

// ── Bundle ──────────────────────────────────────────────────────────

/// A set of JSON documents keyed by slash-separated relative path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactBundle {
    entries: BTreeMap<String, Value>,
}

impl ArtifactBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Serialize>(&mut self, rel_path: &str, value: &T) -> Result<(), PipelineError> {
        let value = serde_json::to_value(value).map_err(|e| PipelineError::json(rel_path, e))?;
        self.entries.insert(rel_path.to_string(), value);
        Ok(())
    }

    pub fn get(&self, rel_path: &str) -> Option<&Value> {
        self.entries.get(rel_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Traits ──────────────────────────────────────────────────────────

/// Run-scoped artifacts plus a "latest run" view.
pub trait ArtifactStore: Send + Sync {
    /// Write one document into the run's bundle, replacing any previous value.
    fn put_artifact(&self, run_id: &str, rel_path: &str, value: &Value) -> Result<(), PipelineError>;

    /// Write every document of `bundle` into the run's bundle.
    fn put_run(&self, run_id: &str, bundle: &ArtifactBundle) -> Result<(), PipelineError> {
        for (rel_path, value) in bundle.iter() {
            self.put_artifact(run_id, rel_path, value)?;
        }
        Ok(())
    }

    /// Replace the latest view with the run's bundle, wholesale.
    fn promote_latest(&self, run_id: &str) -> Result<(), PipelineError>;

    fn read_latest(&self, rel_path: &str) -> Result<Option<Value>, PipelineError>;

    fn read_run(&self, run_id: &str, rel_path: &str) -> Result<Option<Value>, PipelineError>;
}

/// The canonical dataset with its latest/previous rotation, plus raw snapshots.
pub trait DatasetStore: Send + Sync {
    /// The latest canonical set; empty when none was ever written.
    fn load_latest(&self) -> Result<Vec<CanonicalRecord>, PipelineError>;

    /// Copy latest to previous, then write `records` as latest.
    fn save_with_rotation(&self, records: &[CanonicalRecord]) -> Result<(), PipelineError>;

    fn save_raw(&self, date: &str, source_id: &str, rows: &[RawRow]) -> Result<(), PipelineError>;
}

// ── Filesystem helpers ──────────────────────────────────────────────

/// Pretty JSON, written to `<path>.tmp` and renamed into place.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let mut text = serde_json::to_string_pretty(value)
        .map_err(|e| PipelineError::json(path.display().to_string(), e))?;
    text.push('\n');

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, text).map_err(|e| PipelineError::io(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| PipelineError::io(path, e))
}

pub fn read_json_file(path: &Path) -> Result<Option<Value>, PipelineError> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| PipelineError::json(path.display().to_string(), e))
}

fn copy_dir_all(from: &Path, to: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(to).map_err(|e| PipelineError::io(to, e))?;
    for entry in fs::read_dir(from).map_err(|e| PipelineError::io(from, e))? {
        let entry = entry.map_err(|e| PipelineError::io(from, e))?;
        let target = to.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| PipelineError::io(entry.path(), e))?;
        if file_type.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| PipelineError::io(&target, e))?;
        }
    }
    Ok(())
}

fn remove_dir_if_exists(path: &Path) -> Result<(), PipelineError> {
    if path.exists() {
        fs::remove_dir_all(path).map_err(|e| PipelineError::io(path, e))?;
    }
    Ok(())
}

/// Reject paths that would escape the store root.
fn checked_rel_path(rel_path: &str) -> Result<PathBuf, PipelineError> {
    let rel = Path::new(rel_path);
    let escapes = rel.is_absolute()
        || rel
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_)));
    if rel_path.is_empty() || escapes {
        return Err(PipelineError::io(
            rel,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "artifact path must be relative"),
        ));
    }
    Ok(rel.to_path_buf())
}

// ── Filesystem artifact store ───────────────────────────────────────

/// `<root>/runs/<run_id>/...` and `<root>/latest/...`.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root.join("runs").join(run_id)
    }

    pub fn latest_dir(&self) -> PathBuf {
        self.root.join("latest")
    }
}

impl ArtifactStore for FsArtifactStore {
    fn put_artifact(&self, run_id: &str, rel_path: &str, value: &Value) -> Result<(), PipelineError> {
        let path = self.run_dir(run_id).join(checked_rel_path(rel_path)?);
        write_json_atomic(&path, value)
    }

    /// Copy the run into a staging directory, then swap it in for `latest/`.
    fn promote_latest(&self, run_id: &str) -> Result<(), PipelineError> {
        let run_dir = self.run_dir(run_id);
        let latest = self.latest_dir();
        let staging = self.root.join(format!(".latest.staging-{run_id}"));
        let retired = self.root.join(format!(".latest.retired-{run_id}"));

        remove_dir_if_exists(&staging)?;
        remove_dir_if_exists(&retired)?;
        copy_dir_all(&run_dir, &staging)?;
        if latest.exists() {
            fs::rename(&latest, &retired).map_err(|e| PipelineError::io(&latest, e))?;
        }
        fs::rename(&staging, &latest).map_err(|e| PipelineError::io(&latest, e))?;
        remove_dir_if_exists(&retired)?;
        debug!(run_id, latest = %latest.display(), "promoted run to latest");
        Ok(())
    }

    fn read_latest(&self, rel_path: &str) -> Result<Option<Value>, PipelineError> {
        read_json_file(&self.latest_dir().join(checked_rel_path(rel_path)?))
    }

    fn read_run(&self, run_id: &str, rel_path: &str) -> Result<Option<Value>, PipelineError> {
        read_json_file(&self.run_dir(run_id).join(checked_rel_path(rel_path)?))
    }
}

// ── Filesystem dataset store ────────────────────────────────────────

/// `<canonical_dir>/{latest,previous}/policies.json` and
/// `<raw_dir>/<date>/<source_id>.json`.
pub struct FsDatasetStore {
    canonical_dir: PathBuf,
    raw_dir: PathBuf,
}

impl FsDatasetStore {
    pub fn new(canonical_dir: impl Into<PathBuf>, raw_dir: impl Into<PathBuf>) -> Self {
        Self {
            canonical_dir: canonical_dir.into(),
            raw_dir: raw_dir.into(),
        }
    }

    pub fn latest_path(&self) -> PathBuf {
        self.canonical_dir.join("latest").join(CANONICAL_FILE)
    }

    pub fn previous_path(&self) -> PathBuf {
        self.canonical_dir.join("previous").join(CANONICAL_FILE)
    }
}

/// Records from a canonical file value. Anything but an array reads as empty.
pub fn records_from_value(value: Value, what: &str) -> Result<Vec<CanonicalRecord>, PipelineError> {
    if !value.is_array() {
        warn!(file = what, "canonical file is not a JSON array; treating as empty");
        return Ok(Vec::new());
    }
    serde_json::from_value(value).map_err(|e| PipelineError::json(what, e))
}

impl DatasetStore for FsDatasetStore {
    fn load_latest(&self) -> Result<Vec<CanonicalRecord>, PipelineError> {
        let path = self.latest_path();
        match read_json_file(&path)? {
            Some(value) => records_from_value(value, &path.display().to_string()),
            None => Ok(Vec::new()),
        }
    }

    fn save_with_rotation(&self, records: &[CanonicalRecord]) -> Result<(), PipelineError> {
        let latest = self.latest_path();
        let previous = self.previous_path();
        if latest.exists() {
            if let Some(parent) = previous.parent() {
                fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
            }
            fs::copy(&latest, &previous).map_err(|e| PipelineError::io(&previous, e))?;
        }
        write_json_atomic(&latest, records)
    }

    fn save_raw(&self, date: &str, source_id: &str, rows: &[RawRow]) -> Result<(), PipelineError> {
        let path = self
            .raw_dir
            .join(checked_rel_path(date)?)
            .join(checked_rel_path(&format!("{source_id}.json"))?);
        write_json_atomic(&path, rows)
    }
}

// ── In-memory doubles ───────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryArtifactStore {
    runs: Mutex<BTreeMap<String, BTreeMap<String, Value>>>,
    latest: Mutex<Option<(String, BTreeMap<String, Value>)>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run id currently promoted to latest.
    pub fn latest_run_id(&self) -> Option<String> {
        lock(&self.latest).as_ref().map(|(id, _)| id.clone())
    }

    pub fn run_paths(&self, run_id: &str) -> Vec<String> {
        lock(&self.runs)
            .get(run_id)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Lock, recovering the data from a poisoned mutex.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ArtifactStore for MemoryArtifactStore {
    fn put_artifact(&self, run_id: &str, rel_path: &str, value: &Value) -> Result<(), PipelineError> {
        checked_rel_path(rel_path)?;
        lock(&self.runs)
            .entry(run_id.to_string())
            .or_default()
            .insert(rel_path.to_string(), value.clone());
        Ok(())
    }

    fn promote_latest(&self, run_id: &str) -> Result<(), PipelineError> {
        let docs = lock(&self.runs).get(run_id).cloned().unwrap_or_default();
        *lock(&self.latest) = Some((run_id.to_string(), docs));
        Ok(())
    }

    fn read_latest(&self, rel_path: &str) -> Result<Option<Value>, PipelineError> {
        Ok(lock(&self.latest)
            .as_ref()
            .and_then(|(_, docs)| docs.get(rel_path).cloned()))
    }

    fn read_run(&self, run_id: &str, rel_path: &str) -> Result<Option<Value>, PipelineError> {
        Ok(lock(&self.runs)
            .get(run_id)
            .and_then(|docs| docs.get(rel_path).cloned()))
    }
}

#[derive(Default)]
pub struct MemoryDatasetStore {
    latest: Mutex<Option<Vec<CanonicalRecord>>>,
    previous: Mutex<Option<Vec<CanonicalRecord>>>,
    raw: Mutex<BTreeMap<String, Vec<RawRow>>>,
}

impl MemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose latest slot already holds `records`.
    pub fn with_latest(records: Vec<CanonicalRecord>) -> Self {
        let store = Self::default();
        *lock(&store.latest) = Some(records);
        store
    }

    pub fn latest(&self) -> Option<Vec<CanonicalRecord>> {
        lock(&self.latest).clone()
    }

    pub fn previous(&self) -> Option<Vec<CanonicalRecord>> {
        lock(&self.previous).clone()
    }

    /// Raw snapshot keys, `<date>/<source_id>`.
    pub fn raw_keys(&self) -> Vec<String> {
        lock(&self.raw).keys().cloned().collect()
    }
}

impl DatasetStore for MemoryDatasetStore {
    fn load_latest(&self) -> Result<Vec<CanonicalRecord>, PipelineError> {
        Ok(lock(&self.latest).clone().unwrap_or_default())
    }

    fn save_with_rotation(&self, records: &[CanonicalRecord]) -> Result<(), PipelineError> {
        let mut latest = lock(&self.latest);
        if let Some(current) = latest.take() {
            *lock(&self.previous) = Some(current);
        }
        *latest = Some(records.to_vec());
        Ok(())
    }

    fn save_raw(&self, date: &str, source_id: &str, rows: &[RawRow]) -> Result<(), PipelineError> {
        lock(&self.raw).insert(format!("{date}/{source_id}"), rows.to_vec());
        Ok(())
    }
}
