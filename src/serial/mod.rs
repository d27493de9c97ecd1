pub mod guard;
pub mod interface;
pub mod protocol;
pub mod sink;

pub use guard::{LinkGuard, ReleaseReason};
pub use interface::{SerialLink, SerialPortIO, TokioSerialPort};
pub use protocol::{Decoded, DecoderState, FrameCodec, Message, Phase};
pub use sink::MessageSink;

use std::time::Duration;

pub const BAUD_RATE: u32 = 115200;
pub const READ_TIMEOUT: Duration = Duration::from_millis(100);
pub const PUMP_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Link write failed: {0}")]
    LinkWrite(std::io::Error),

    #[error("Link not connected")]
    NotConnected,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialport error: {0}")]
    SerialportError(#[from] serialport::Error),
}

pub type Result<T> = std::result::Result<T, SerialError>;
