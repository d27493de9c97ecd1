//! Writer/reader coordination over a single serial link.
//!
//! One mutex guards the [`SerialLink`]. Writers hold it for a whole encoded
//! message. The reader pump holds it across polling cycles while an inbound
//! frame is being assembled, and drops it only on a completed frame, a
//! discarded (oversized) frame, a read that timed out, or a failed read.
//! [`ReleaseReason`] names each of these.
//!
//! The idle release applies even in the middle of a frame. A writer queued on
//! the lock at that moment gets it before the reader's next cycle, so its bytes
//! can land between two bytes of the same inbound frame on the wire.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{
    Decoded, DecoderState, FrameCodec, Message, MessageSink, Result, SerialError, SerialLink,
    SerialPortIO,
};
use crate::config::LinkSettings;

/// Why the reader handed the link back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    FrameComplete,
    Recovered,
    Idle,
    Disconnected,
}

/// The reader's ownership of the link while a frame is in flight.
struct ReaderHold {
    link: OwnedMutexGuard<SerialLink>,
}

impl ReaderHold {
    async fn acquire(link: &Arc<Mutex<SerialLink>>, flag: &AtomicBool) -> Self {
        let link = link.clone().lock_owned().await;
        flag.store(true, Ordering::Release);
        Self { link }
    }

    fn release(self, reason: ReleaseReason, flag: &AtomicBool) {
        flag.store(false, Ordering::Release);
        log::trace!("Reader released link: {:?}", reason);
        drop(self.link);
    }
}

pub struct LinkGuard {
    link: Arc<Mutex<SerialLink>>,
    open_tx: watch::Sender<bool>,
    reader_holding: AtomicBool,
    codec: FrameCodec,
    pump_interval: Duration,
}

impl LinkGuard {
    pub fn new(settings: &LinkSettings) -> Self {
        let (open_tx, _open_rx) = watch::channel(false);
        Self {
            link: Arc::new(Mutex::new(SerialLink::with_read_timeout(settings.read_timeout))),
            open_tx,
            reader_holding: AtomicBool::new(false),
            codec: settings.codec(),
            pump_interval: settings.pump_interval,
        }
    }

    pub fn codec(&self) -> &FrameCodec {
        &self.codec
    }

    pub fn is_open(&self) -> bool {
        *self.open_tx.borrow()
    }

    /// True while the reader pump owns the link mid-frame.
    pub fn is_reader_holding(&self) -> bool {
        self.reader_holding.load(Ordering::Acquire)
    }

    pub async fn port_name(&self) -> Option<String> {
        self.link.lock().await.port_name().map(str::to_string)
    }

    /// Hand an opened port to the link and wake everyone waiting for it.
    pub async fn attach(&self, port_name: &str, port: Box<dyn SerialPortIO>) {
        let mut link = self.link.lock().await;
        link.attach(port_name, port);
        self.open_tx.send_replace(true);
    }

    pub async fn close(&self) {
        let mut link = self.link.lock().await;
        link.close();
        self.open_tx.send_replace(false);
    }

    /// Resolve once the link is open. Waits forever if it never opens.
    pub async fn wait_until_open(&self) {
        let mut open_rx = self.open_tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = open_rx.wait_for(|open| *open).await;
    }

    /// Encode and write a message while holding the link exclusively.
    pub async fn write_message(&self, message: &Message) -> Result<()> {
        self.wait_until_open().await;

        let mut link = self.link.lock().await;
        let bytes = self.codec.encode(message);
        log::debug!(
            "Writing command 0x{:02X} ({} payload bytes): {}",
            message.command,
            message.payload.len(),
            hex::encode(&message.payload)
        );
        link.write(&bytes).await
    }

    /// Run the reader loop until the sink closes or the link fails.
    pub async fn pump<S: MessageSink>(&self, sink: &S) -> Result<()> {
        self.wait_until_open().await;
        log::info!("Reader pump started");

        let mut state = DecoderState::new();
        let mut hold: Option<ReaderHold> = None;
        let mut ticker = tokio::time::interval(self.pump_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let mut held = match hold.take() {
                Some(held) => held,
                None => ReaderHold::acquire(&self.link, &self.reader_holding).await,
            };
            let read = held.link.read_byte().await;
            hold = Some(held);

            match read {
                Ok(Some(byte)) => match self.codec.decode_byte(&mut state, byte) {
                    Decoded::Incomplete => {}
                    Decoded::Complete(message) => {
                        self.release(&mut hold, ReleaseReason::FrameComplete);
                        log::debug!(
                            "Received command 0x{:02X}: {}",
                            message.command,
                            hex::encode(&message.payload)
                        );
                        if sink.push(message).is_err() {
                            log::info!("Message sink closed, stopping reader pump");
                            return Ok(());
                        }
                    }
                    Decoded::ErrorRecovered => self.release(&mut hold, ReleaseReason::Recovered),
                },
                Ok(None) => self.release(&mut hold, ReleaseReason::Idle),
                Err(SerialError::NotConnected) => {
                    self.release(&mut hold, ReleaseReason::Disconnected);
                    state = DecoderState::new();
                    log::warn!("Serial link closed, reader waiting for it to reopen");
                    self.wait_until_open().await;
                }
                Err(e) => {
                    self.release(&mut hold, ReleaseReason::Disconnected);
                    log::error!("Reader pump stopped: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// Spawn [`Self::pump`] on the tokio runtime.
    pub fn spawn_reader<S>(self: &Arc<Self>, sink: S) -> JoinHandle<Result<()>>
    where
        S: MessageSink + 'static,
    {
        let guard = Arc::clone(self);
        tokio::spawn(async move { guard.pump(&sink).await })
    }

    fn release(&self, hold: &mut Option<ReaderHold>, reason: ReleaseReason) {
        if let Some(held) = hold.take() {
            held.release(reason, &self.reader_holding);
        }
    }
}
