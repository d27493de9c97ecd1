pub mod locator;
pub mod manager;
pub mod models;

pub use locator::{DeviceLocator, PortEnumerator, SystemPorts};
pub use manager::DeviceManager;
pub use models::*;

pub const MSG_ALREADY_CONNECTED: &str = "Das Gerät ist bereits angeschlossen";
pub const MSG_STALE_CONFIG: &str = "Es wurde kein Smock Gerät gefunden.\n\
Vergewissern Sie sich, dass das Gerät angeschlossen ist\n\
und der COM Port in der Config richtig ist.";
pub const MSG_NO_DEVICE: &str = "Es wurde kein Smock Gerät gefunden.\n\
Vergewissern Sie sich, dass das Gerät angeschlossen ist.\n";

/// User-facing alert channel. Fire and forget.
pub trait Notifier: Send + Sync {
    fn notify(&self, text: &str);
}

/// Notifier that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, text: &str) {
        log::warn!("{}", text);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("No device found")]
    NoDeviceFound,

    #[error("Configured port {0} not found")]
    StaleConfig(String),

    #[error("Serial communication error: {0}")]
    SerialError(#[from] crate::serial::SerialError),

    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
