#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use smock_link::device::{Notifier, PortEnumerator};
use smock_link::serial::{self, SerialError, SerialPortIO};

/// Byte traffic as seen on the physical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    Read(u8),
    Write(Vec<u8>),
}

#[derive(Debug, Clone, Default)]
pub struct Wire(Arc<Mutex<Vec<WireEvent>>>);

impl Wire {
    pub fn events(&self) -> Vec<WireEvent> {
        self.0.lock().unwrap().clone()
    }

    fn record(&self, event: WireEvent) {
        self.0.lock().unwrap().push(event);
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Step {
    Byte(u8),
    /// Nothing arrives within the read timeout.
    Idle,
}

pub fn frame(command: u8, payload: &[u8], sentinel: u8) -> Vec<Step> {
    let mut steps = vec![Step::Byte(command)];
    steps.extend(payload.iter().map(|b| Step::Byte(*b)));
    steps.push(Step::Byte(sentinel));
    steps
}

/// Port that replays a fixed inbound script and records every byte.
pub struct ScriptedPort {
    script: VecDeque<Step>,
    wire: Wire,
    fail_writes: bool,
    fail_reads: bool,
}

impl ScriptedPort {
    pub fn new(script: Vec<Step>, wire: Wire) -> Self {
        Self {
            script: script.into(),
            wire,
            fail_writes: false,
            fail_reads: false,
        }
    }

    pub fn silent() -> Self {
        Self::new(Vec::new(), Wire::default())
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::silent()
        }
    }

    /// Replays `script`, then every further read fails with an I/O error.
    pub fn failing_reads_after(script: Vec<Step>) -> Self {
        Self {
            fail_reads: true,
            ..Self::new(script, Wire::default())
        }
    }
}

#[async_trait::async_trait]
impl SerialPortIO for ScriptedPort {
    async fn read_byte(&mut self, timeout: Duration) -> serial::Result<Option<u8>> {
        match self.script.pop_front() {
            Some(Step::Byte(b)) => {
                self.wire.record(WireEvent::Read(b));
                Ok(Some(b))
            }
            None if self.fail_reads => Err(SerialError::IoError(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device unplugged",
            ))),
            Some(Step::Idle) | None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }

    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        if self.fail_writes {
            return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        self.wire.record(WireEvent::Write(data.to_vec()));
        Ok(())
    }
}

/// Fake set of OS ports that hands out scripted ports.
#[derive(Clone, Default)]
pub struct MockPorts {
    names: Vec<String>,
    opened: Arc<Mutex<Vec<String>>>,
    broken: bool,
}

impl MockPorts {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            opened: Arc::default(),
            broken: false,
        }
    }

    /// Ports that deliver one `0x05` frame and then fail every read.
    pub fn broken(names: &[&str]) -> Self {
        Self {
            broken: true,
            ..Self::new(names)
        }
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl PortEnumerator for MockPorts {
    fn available_ports(&self) -> serial::Result<Vec<String>> {
        Ok(self.names.clone())
    }

    fn open(&self, port_name: &str) -> serial::Result<Box<dyn SerialPortIO>> {
        self.opened.lock().unwrap().push(port_name.to_string());
        if self.broken {
            let script = frame(0x05, b"ok", smock_link::serial::protocol::DEFAULT_SENTINEL);
            return Ok(Box::new(ScriptedPort::failing_reads_after(script)));
        }
        Ok(Box::new(ScriptedPort::silent()))
    }
}

#[derive(Default)]
pub struct RecordingNotifier(Mutex<Vec<String>>);

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, text: &str) {
        self.0.lock().unwrap().push(text.to_string());
    }
}

pub fn temp_config_path() -> std::path::PathBuf {
    std::env::temp_dir()
        .join(format!("smock-link-{}", uuid::Uuid::new_v4()))
        .join("smock.cfg")
}
