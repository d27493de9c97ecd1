use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::{ConfigStore, LinkSettings};
use crate::serial::{self, LinkGuard, Message, MessageSink};

use super::{DeviceLocator, LocateOutcome, Notifier, PortEnumerator, Result, SystemPorts};

/// Owns the link to the Smock device and wires the locator, reader and writers together.
pub struct DeviceManager {
    link: Arc<LinkGuard>,
    locator: DeviceLocator,
}

impl DeviceManager {
    pub fn new(settings: LinkSettings, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_enumerator(settings, Box::new(SystemPorts), notifier)
    }

    pub fn with_enumerator(
        settings: LinkSettings,
        enumerator: Box<dyn PortEnumerator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let link = Arc::new(LinkGuard::new(&settings));
        let store = ConfigStore::new(settings.config_path.clone());
        Self {
            link,
            locator: DeviceLocator::new(enumerator, notifier, store),
        }
    }

    pub fn link(&self) -> Arc<LinkGuard> {
        Arc::clone(&self.link)
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_open()
    }

    /// Find and open the device. Safe to call again once connected.
    pub async fn locate(&self) -> Result<LocateOutcome> {
        let outcome = self.locator.locate(&self.link).await?;
        if let LocateOutcome::Connected { port_name, persisted } = &outcome {
            log::info!("Connected to Smock device on {} (saved: {})", port_name, persisted);
        }
        Ok(outcome)
    }

    /// Start the reader pump. It idles until the link is open.
    pub fn spawn_reader<S>(&self, sink: S) -> JoinHandle<serial::Result<()>>
    where
        S: MessageSink + 'static,
    {
        self.link.spawn_reader(sink)
    }

    /// Send a message, waiting for the link if it is not open yet.
    pub async fn write_message(&self, message: &Message) -> serial::Result<()> {
        self.link.write_message(message).await
    }

    pub async fn disconnect(&self) {
        self.link.close().await;
    }
}
