pub mod settings;
pub mod store;

pub use settings::LinkSettings;
pub use store::{ConfigStore, LinkConfig, DEFAULT_CONFIG_PATH};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] ini::ParseError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
