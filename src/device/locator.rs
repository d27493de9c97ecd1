use std::sync::Arc;

use crate::config::{ConfigStore, LinkConfig};
use crate::serial::{self, LinkGuard, SerialPortIO, TokioSerialPort};

use super::{
    DeviceError, LocateOutcome, Notifier, Result, MSG_ALREADY_CONNECTED, MSG_NO_DEVICE,
    MSG_STALE_CONFIG,
};

/// Source of candidate endpoints.
pub trait PortEnumerator: Send + Sync {
    /// Names of the endpoints currently present, in enumeration order.
    fn available_ports(&self) -> serial::Result<Vec<String>>;

    fn open(&self, port_name: &str) -> serial::Result<Box<dyn SerialPortIO>>;
}

/// Ports reported by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPorts;

impl PortEnumerator for SystemPorts {
    fn available_ports(&self) -> serial::Result<Vec<String>> {
        let ports = serialport::available_ports()?;
        Ok(ports.into_iter().map(|port| port.port_name).collect())
    }

    fn open(&self, port_name: &str) -> serial::Result<Box<dyn SerialPortIO>> {
        Ok(Box::new(TokioSerialPort::open(port_name)?))
    }
}

/// Finds the device and opens the link, remembering the first port it picks.
pub struct DeviceLocator {
    enumerator: Box<dyn PortEnumerator>,
    notifier: Arc<dyn Notifier>,
    store: ConfigStore,
}

impl DeviceLocator {
    pub fn new(
        enumerator: Box<dyn PortEnumerator>,
        notifier: Arc<dyn Notifier>,
        store: ConfigStore,
    ) -> Self {
        Self {
            enumerator,
            notifier,
            store,
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub async fn locate(&self, link: &LinkGuard) -> Result<LocateOutcome> {
        if link.is_open() {
            self.notifier.notify(MSG_ALREADY_CONNECTED);
            return Ok(LocateOutcome::AlreadyConnected);
        }

        let config = match self.store.load() {
            Ok(config) => config,
            Err(e) => {
                log::error!("Unreadable config {}: {}", self.store.path().display(), e);
                self.notifier.notify(MSG_STALE_CONFIG);
                return Err(e.into());
            }
        };

        match config {
            Some(config) => self.open_configured(link, &config).await,
            None => self.open_first_available(link).await,
        }
    }

    async fn open_configured(&self, link: &LinkGuard, config: &LinkConfig) -> Result<LocateOutcome> {
        let wanted = &config.endpoint_identifier;
        let ports = self.enumerator.available_ports()?;
        log::debug!("Looking for configured port {} among {} ports", wanted, ports.len());

        if ports.iter().any(|name| name == wanted) {
            match self.enumerator.open(wanted) {
                Ok(port) => {
                    link.attach(wanted, port).await;
                }
                Err(e) => log::error!("Failed to open configured port {}: {}", wanted, e),
            }
        }

        if !link.is_open() {
            log::warn!("Configured port {} is not available", wanted);
            self.notifier.notify(MSG_STALE_CONFIG);
            return Err(DeviceError::StaleConfig(wanted.clone()));
        }

        Ok(LocateOutcome::Connected {
            port_name: wanted.clone(),
            persisted: false,
        })
    }

    async fn open_first_available(&self, link: &LinkGuard) -> Result<LocateOutcome> {
        let ports = self.enumerator.available_ports()?;
        let Some(first) = ports.first() else {
            log::warn!("No serial ports available");
            self.notifier.notify(MSG_NO_DEVICE);
            return Err(DeviceError::NoDeviceFound);
        };

        let port_name = first.clone();
        let port = self.enumerator.open(&port_name)?;
        link.attach(&port_name, port).await;

        // The link stays open even if the port cannot be remembered.
        let persisted = match self.store.save(&LinkConfig {
            endpoint_identifier: port_name.clone(),
        }) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to save {} to {}: {}", port_name, self.store.path().display(), e);
                false
            }
        };

        Ok(LocateOutcome::Connected {
            port_name,
            persisted,
        })
    }
}
