// Configuration loading

pub mod error;
pub mod settings;

pub use error::ConfigError;
pub use settings::{FetchSettings, PathSettings, Settings, SiteSettings, CONFIG_ENV, DEFAULT_CONFIG_FILE};
