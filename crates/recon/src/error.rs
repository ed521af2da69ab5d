use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// Rows were supplied for a source id the configuration does not define.
    #[error("rows supplied for unknown source '{0}'")]
    UnknownSource(String),
}
