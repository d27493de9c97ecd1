pub mod config;
pub mod device;
pub mod serial;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use config::LinkSettings;
pub use device::{DeviceManager, LogNotifier, Notifier};
pub use serial::Message;

/// Handle on the reader pump. Resolves once the pump stops, with the read
/// error that ended it or `Ok` if the inbound queue was dropped.
pub type ReaderHandle = JoinHandle<serial::Result<()>>;

/// Connect to the device and start reading.
///
/// Returns the manager for writing, the receiving end of the inbound queue and
/// the reader handle. A failed lookup is reported through `notifier` and logged;
/// the reader still runs and picks the link up if a later `locate()` opens it.
pub async fn start(
    settings: LinkSettings,
    notifier: Arc<dyn Notifier>,
) -> (Arc<DeviceManager>, mpsc::UnboundedReceiver<Message>, ReaderHandle) {
    let manager = Arc::new(DeviceManager::new(settings, notifier));
    let (rx, reader) = start_with(&manager).await;
    (manager, rx, reader)
}

/// Same as [`start`] for an already built manager.
pub async fn start_with(
    manager: &Arc<DeviceManager>,
) -> (mpsc::UnboundedReceiver<Message>, ReaderHandle) {
    if let Err(e) = manager.locate().await {
        log::error!("Device lookup failed: {}", e);
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let reader = manager.spawn_reader(tx);

    log::info!("Smock link started");
    (rx, reader)
}
