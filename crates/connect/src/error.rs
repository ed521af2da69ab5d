use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The secret named by a `query_key` auth descriptor is unset or blank.
    #[error("missing secret env: {0}")]
    MissingSecret(String),

    /// Endpoint or decorated URL could not be parsed.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Upstream rejected the request outright (4xx other than 429).
    #[error("{source_id} request rejected (HTTP {status})")]
    Rejected { source_id: String, status: u16 },

    /// Upstream kept failing (429/5xx) until retries ran out.
    #[error("{source_id} upstream error (HTTP {status}) after {attempts} attempts")]
    Upstream {
        source_id: String,
        status: u16,
        attempts: u32,
    },

    /// Connect/timeout/body read failure after retries ran out.
    #[error("{source_id} network error after {attempts} attempts: {message}")]
    Network {
        source_id: String,
        attempts: u32,
        message: String,
    },

    /// Payload was not valid JSON.
    #[error("{source_id} returned invalid JSON: {message}")]
    Parse { source_id: String, message: String },

    /// Local file could not be read.
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },

    /// HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}
