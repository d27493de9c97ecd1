use std::path::PathBuf;
use std::time::Duration;

use crate::serial::protocol::DEFAULT_SENTINEL;
use crate::serial::{FrameCodec, PUMP_INTERVAL, READ_TIMEOUT};

use super::DEFAULT_CONFIG_PATH;

/// Runtime knobs for the link. Defaults match the device firmware.
#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub config_path: PathBuf,
    pub read_timeout: Duration,
    pub pump_interval: Duration,
    pub sentinel: u8,
    /// Upper bound on an inbound payload. `None` accepts frames of any length.
    pub max_payload: Option<usize>,
}

impl LinkSettings {
    pub fn codec(&self) -> FrameCodec {
        FrameCodec::new()
            .with_sentinel(self.sentinel)
            .with_max_payload(self.max_payload)
    }
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            read_timeout: READ_TIMEOUT,
            pump_interval: PUMP_INTERVAL,
            sentinel: DEFAULT_SENTINEL,
            max_payload: None,
        }
    }
}
