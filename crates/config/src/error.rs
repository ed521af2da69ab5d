use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error in {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}
