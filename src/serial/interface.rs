use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{DataBits, Parity, SerialPortBuilderExt, SerialStream, StopBits};

use super::{Result, SerialError, BAUD_RATE, READ_TIMEOUT};

/// Byte-level access to an open serial endpoint.
#[async_trait]
pub trait SerialPortIO: Send {
    /// Read a single byte, or `None` if nothing arrived within `timeout`.
    async fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>>;

    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()>;
}

/// Physical port backed by tokio-serial.
pub struct TokioSerialPort {
    stream: SerialStream,
}

impl TokioSerialPort {
    /// Open `port_name` at 115200 8N1. Must be called from within a tokio runtime.
    pub fn open(port_name: &str) -> Result<Self> {
        // serialport opens TTYs in exclusive mode, so a second process cannot claim the device.
        let stream = tokio_serial::new(port_name, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(READ_TIMEOUT)
            .open_native_async()
            .map_err(|e| SerialError::DeviceUnavailable(format!("{}: {}", port_name, e)))?;

        Ok(Self { stream })
    }
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match tokio::time::timeout(timeout, self.stream.read(&mut buf)).await {
            Err(_) => Ok(None),
            Ok(Ok(0)) => Ok(None),
            Ok(Ok(_)) => Ok(Some(buf[0])),
            Ok(Err(ref e)) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Ok(Err(e)) => Err(SerialError::IoError(e)),
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await
    }
}

/// The open link to the device. Access is serialised by [`super::LinkGuard`].
pub struct SerialLink {
    port: Option<Box<dyn SerialPortIO>>,
    port_name: Option<String>,
    read_timeout: Duration,
}

impl SerialLink {
    pub fn new() -> Self {
        Self {
            port: None,
            port_name: None,
            read_timeout: READ_TIMEOUT,
        }
    }

    pub fn with_read_timeout(read_timeout: Duration) -> Self {
        Self {
            read_timeout,
            ..Self::new()
        }
    }

    /// Take ownership of an already opened port.
    pub fn attach(&mut self, port_name: &str, port: Box<dyn SerialPortIO>) {
        self.port = Some(port);
        self.port_name = Some(port_name.to_string());
        log::info!("Serial link open on {}", port_name);
    }

    pub fn close(&mut self) {
        if let Some(name) = self.port_name.take() {
            log::info!("Closing serial link on {}", name);
        }
        self.port = None;
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub async fn read_byte(&mut self) -> Result<Option<u8>> {
        let timeout = self.read_timeout;
        let port = self.port.as_mut().ok_or(SerialError::NotConnected)?;
        port.read_byte(timeout).await
    }

    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(SerialError::NotConnected)?;
        port.write_all(data).await.map_err(SerialError::LinkWrite)
    }
}

impl Default for SerialLink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_port_is_unavailable() {
        let err = TokioSerialPort::open("/dev/smock-link-no-such-port").err().unwrap();
        assert!(matches!(err, SerialError::DeviceUnavailable(ref msg) if msg.contains("no-such-port")));
    }

    #[tokio::test]
    async fn test_unattached_link_is_not_connected() {
        let mut link = SerialLink::new();
        assert!(!link.is_open());
        assert!(matches!(link.read_byte().await, Err(SerialError::NotConnected)));
        assert!(matches!(link.write(b"x").await, Err(SerialError::NotConnected)));
    }
}
