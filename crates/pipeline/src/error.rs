use std::path::PathBuf;

use policyfeed_core::CoreError;
use policyfeed_recon::ReconError;
use thiserror::Error;

/// How many schema messages a [`PipelineError::SchemaInvalid`] carries.
pub const SCHEMA_ERROR_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {what}: {message}")]
    Json { what: String, message: String },

    /// An embedded schema failed to compile.
    #[error("schema '{name}' does not compile: {message}")]
    SchemaCompile { name: &'static str, message: String },

    /// A document violated its schema. Holds the first few messages.
    #[error("{document} schema invalid: [{}]", .errors.join("; "))]
    SchemaInvalid {
        document: &'static str,
        errors: Vec<String>,
    },

    #[error("all primary sources failed (hard fail)")]
    AllPrimaryFailed,

    #[error("canonical dataset is empty")]
    EmptyCanonical,

    #[error("render failed: {0}")]
    Render(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Recon(#[from] ReconError),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(what: impl Into<String>, err: serde_json::Error) -> Self {
        Self::Json {
            what: what.into(),
            message: err.to_string(),
        }
    }

    /// `Ok` for an empty list, else the first few messages as an error.
    pub fn check_schema(document: &'static str, mut errors: Vec<String>) -> Result<(), Self> {
        if errors.is_empty() {
            return Ok(());
        }
        errors.truncate(SCHEMA_ERROR_LIMIT);
        Err(Self::SchemaInvalid { document, errors })
    }

    /// The message followed by each `caused by:` in the source chain.
    pub fn trace(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str("\ncaused by: ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}
