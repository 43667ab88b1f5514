//! The remote overlay RPC surface and its return channel.
//!
//! [`OverlayService`] is the versioned call surface the client drives on the
//! bound overlay process. [`OverlayCallback`] is the channel handed to the
//! remote during the attach handshake; events it receives are marshaled onto
//! the owning client's serialized queue and dispatched on the next
//! [`pump`](crate::client::OverlayClient::pump).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::debug;
use verge_types::{ActivityState, AttachBundle, WindowLayout};

use crate::error::Result;

/// The RPC surface exposed by the bound overlay service.
///
/// Calls whose shape depends on the protocol version are all present here;
/// the client picks which to use from its resolved capability table. Every
/// call may fail with the remote end dead mid-call, in which case the caller
/// swallows the error and waits for the disconnect notification.
pub trait OverlayService: Send {
    fn window_attached(
        &mut self,
        layout: WindowLayout,
        callback: Arc<OverlayCallback>,
        client_options: u32,
    ) -> Result<()>;

    fn window_attached2(&mut self, bundle: AttachBundle, callback: Arc<OverlayCallback>)
    -> Result<()>;

    fn window_detached(&mut self, is_config_change: bool) -> Result<()>;

    fn on_resume(&mut self) -> Result<()>;

    fn on_pause(&mut self) -> Result<()>;

    fn set_activity_state(&mut self, state: ActivityState) -> Result<()>;

    fn start_scroll(&mut self) -> Result<()>;

    fn on_scroll(&mut self, progress: f32) -> Result<()>;

    fn end_scroll(&mut self) -> Result<()>;

    fn close_overlay(&mut self, options: u32) -> Result<()>;

    fn start_search(&mut self, query: &[u8], extras: &Map<String, Value>) -> Result<bool>;
}

/// Shared handle to the remote overlay proxy.
pub type SharedOverlay = Arc<Mutex<dyn OverlayService>>;

/// Lock the overlay proxy, recovering from a poisoned lock.
///
/// A panic inside a fake overlay in tests must not wedge the client; the
/// remote state is treated as authoritative either way.
pub(crate) fn lock_overlay(proxy: &SharedOverlay) -> MutexGuard<'_, dyn OverlayService + 'static> {
    proxy.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Events reported by the remote overlay through its callback channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayEvent {
    /// Overlay scroll progress changed, 0.0 (closed) to 1.0 (fully open).
    ScrollChanged(f32),
    /// Raw overlay status integer; bit 0 means the overlay is usable.
    StatusChanged(i32),
}

/// Return channel handed to the remote overlay.
///
/// The remote keeps its handle for as long as it likes; the owning client
/// clears the sink on teardown, after which every incoming event is dropped.
/// This is the explicit, deterministic form of a weak back-reference: the
/// "destroyed" transition is a visible state change rather than a
/// garbage-collection artifact.
pub struct OverlayCallback {
    sink: Mutex<Option<mpsc::UnboundedSender<OverlayEvent>>>,
}

impl OverlayCallback {
    #[must_use]
    pub fn new(sink: mpsc::UnboundedSender<OverlayEvent>) -> Arc<Self> {
        Arc::new(Self {
            sink: Mutex::new(Some(sink)),
        })
    }

    /// Called by the remote when the overlay scroll position changes.
    pub fn overlay_scroll_changed(&self, progress: f32) {
        self.send(OverlayEvent::ScrollChanged(progress));
    }

    /// Called by the remote when the overlay status bits change.
    pub fn overlay_status_changed(&self, status: i32) {
        self.send(OverlayEvent::StatusChanged(status));
    }

    /// Drop the back-reference to the owning client. Idempotent.
    pub(crate) fn detach(&self) {
        if let Ok(mut sink) = self.sink.lock() {
            if sink.take().is_some() {
                debug!("overlay callback detached");
            }
        }
    }

    fn send(&self, event: OverlayEvent) {
        let Ok(sink) = self.sink.lock() else {
            return;
        };
        if let Some(tx) = sink.as_ref() {
            // The receiver only goes away with the client itself.
            let _ = tx.send(event);
        }
    }
}
