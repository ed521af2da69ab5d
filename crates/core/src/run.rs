use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Last completed phase of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Start,
    Fetch,
    Normalize,
    Gates,
    Completed,
    Exception,
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Fetch => write!(f, "fetch"),
            Self::Normalize => write!(f, "normalize"),
            Self::Gates => write!(f, "gates"),
            Self::Completed => write!(f, "completed"),
            Self::Exception => write!(f, "exception"),
        }
    }
}

/// The run's state-machine record.
///
/// `running -> success | failed`. Once terminal, every further transition
/// is rejected with [`CoreError::RunTerminal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: String,
    pub status: RunStatus,
    pub stage: RunStage,
    pub updated_at: String,
    pub details: serde_json::Value,
}

impl RunMeta {
    pub fn start(run_id: &str, at: &str, details: serde_json::Value) -> Self {
        Self {
            run_id: run_id.to_string(),
            status: RunStatus::Running,
            stage: RunStage::Start,
            updated_at: at.to_string(),
            details,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != RunStatus::Running
    }

    /// Record a completed intermediate stage. Details are merged, not replaced.
    pub fn advance(
        &mut self,
        stage: RunStage,
        at: &str,
        details: serde_json::Value,
    ) -> Result<(), CoreError> {
        self.transition(RunStatus::Running, stage, at, details, true)
    }

    pub fn succeed(&mut self, at: &str, details: serde_json::Value) -> Result<(), CoreError> {
        self.transition(RunStatus::Success, RunStage::Completed, at, details, false)
    }

    pub fn fail(
        &mut self,
        stage: RunStage,
        at: &str,
        details: serde_json::Value,
    ) -> Result<(), CoreError> {
        self.transition(RunStatus::Failed, stage, at, details, false)
    }

    fn transition(
        &mut self,
        status: RunStatus,
        stage: RunStage,
        at: &str,
        details: serde_json::Value,
        merge: bool,
    ) -> Result<(), CoreError> {
        if self.is_terminal() {
            return Err(CoreError::RunTerminal {
                run_id: self.run_id.clone(),
                status: self.status,
                stage: self.stage,
                attempted: stage,
            });
        }
        self.status = status;
        self.stage = stage;
        self.updated_at = at.to_string();
        match (&mut self.details, details) {
            (serde_json::Value::Object(existing), serde_json::Value::Object(incoming)) if merge => {
                existing.extend(incoming);
            }
            (slot, details) => *slot = details,
        }
        Ok(())
    }
}

/// The published build contract. Write-once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub run_id: String,
    pub generated_pages: usize,
    pub excluded_pages: usize,
    pub sitemap_entries: usize,
    pub build_sha: String,
    pub generated_at: String,
}
