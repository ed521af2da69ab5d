use thiserror::Error;

use crate::run::{RunStage, RunStatus};

#[derive(Debug, Error)]
pub enum CoreError {
    /// Source configuration is not valid JSON or does not match the shape.
    #[error("source config parse error: {0}")]
    SourceConfigParse(String),

    /// Source configuration parsed but contradicts itself.
    #[error("source config validation error: {0}")]
    SourceConfigValidation(String),

    /// A run state transition was attempted after the run became terminal.
    #[error("run '{run_id}' is already {status} (stage {stage}); cannot move to {attempted}")]
    RunTerminal {
        run_id: String,
        status: RunStatus,
        stage: RunStage,
        attempted: RunStage,
    },
}
