//! Per-window overlay client.
//!
//! One [`OverlayClient`] exists per hosting window (home display, secondary
//! displays). All clients share one [`OverlayConnection`]; each owns its own
//! callback channel, keepalive binding, and lifecycle state. The host's
//! serialized event loop drives the client: lifecycle calls, touch-adjacent
//! scroll forwarding, and [`pump`](OverlayClient::pump) all happen on the
//! same logical queue.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use verge_types::{ActivityState, AttachBundle, DeviceConfig, WindowLayout};

use crate::connection::{ClientId, ConnectionEvent, OverlayConnection, ServiceBinder};
use crate::proxy::{OverlayCallback, OverlayEvent, SharedOverlay, lock_overlay};

/// Host-side sink for overlay scroll and availability changes.
pub trait ScrollCallback {
    fn on_overlay_scroll_changed(&mut self, progress: f32);

    /// Fired once per reported status change. Deduplication is on the raw
    /// status integer, so two statuses with the same usable bit still fire
    /// twice; exact repeats of one status are swallowed.
    fn on_service_state_changed(&mut self, overlay_usable: bool);
}

/// Client for the overlay surface behind one launcher window.
pub struct OverlayClient {
    connection: Arc<OverlayConnection>,
    client_id: ClientId,
    conn_tx: mpsc::UnboundedSender<ConnectionEvent>,
    conn_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
    callback: Arc<OverlayCallback>,
    overlay_rx: mpsc::UnboundedReceiver<OverlayEvent>,
    scroll_callback: Box<dyn ScrollCallback>,
    /// Per-client binding that keeps the overlay process important while this
    /// window is started. Dropped on stop, re-established on start.
    keepalive: Box<dyn ServiceBinder>,
    client_options: u32,
    device_config: DeviceConfig,
    /// This client's reference to the shared remote proxy. Released on detach
    /// and disconnect without touching the shared connection.
    proxy: Option<SharedOverlay>,
    layout: Option<WindowLayout>,
    layout_extras: Map<String, Value>,
    activity_state: ActivityState,
    service_state: i32,
    destroyed: bool,
}

impl OverlayClient {
    /// Create a client and initiate connection. Never blocks; if the hosting
    /// window is already attached the caller follows up with
    /// [`on_window_attached`](Self::on_window_attached).
    #[must_use]
    pub fn new(
        connection: Arc<OverlayConnection>,
        scroll_callback: Box<dyn ScrollCallback>,
        keepalive: Box<dyn ServiceBinder>,
        client_options: u32,
        device_config: DeviceConfig,
    ) -> Self {
        let (conn_tx, conn_rx) = mpsc::unbounded_channel();
        let (overlay_tx, overlay_rx) = mpsc::unbounded_channel();
        let client_id = connection.register_client(conn_tx.clone());
        let proxy = connection.proxy();

        let mut client = Self {
            connection,
            client_id,
            conn_tx,
            conn_rx,
            callback: OverlayCallback::new(overlay_tx),
            overlay_rx,
            scroll_callback,
            keepalive,
            client_options,
            device_config,
            proxy,
            layout: None,
            layout_extras: Map::new(),
            activity_state: ActivityState::new(),
            service_state: 0,
            destroyed: false,
        };
        client.reconnect();
        client
    }

    /// Drain and dispatch pending connection and overlay events.
    ///
    /// Must be called from the host's serialized queue; this is the
    /// cross-thread marshaling point for callbacks the binding mechanism
    /// delivered elsewhere.
    pub fn pump(&mut self) {
        while let Ok(event) = self.conn_rx.try_recv() {
            if self.destroyed {
                return;
            }
            match event {
                ConnectionEvent::ServiceConnected => {
                    self.proxy = self.connection.proxy();
                    debug!("overlay client {}: service connected", self.client_id);
                    if self.layout.is_some() {
                        self.exchange_config();
                    }
                }
                ConnectionEvent::ServiceDisconnected => {
                    self.proxy = None;
                    self.set_service_state(0);
                }
            }
        }
        while let Ok(event) = self.overlay_rx.try_recv() {
            if self.destroyed {
                return;
            }
            match event {
                OverlayEvent::ScrollChanged(progress) => {
                    if self.service_state & 1 != 0 {
                        self.scroll_callback.on_overlay_scroll_changed(progress);
                    }
                }
                OverlayEvent::StatusChanged(status) => self.set_service_state(status),
            }
        }
    }

    /// The hosting window attached; store the layout and perform the attach
    /// handshake if the remote is already there.
    pub fn on_window_attached(&mut self, layout: WindowLayout) {
        if self.destroyed {
            return;
        }
        if self.layout == Some(layout) {
            return;
        }
        self.layout = Some(layout);
        if self.proxy.is_none() {
            self.proxy = self.connection.proxy();
        }
        self.exchange_config();
    }

    /// The hosting window detached. Sends the detach notice (carrying whether
    /// this is a configuration change so the remote can preserve state) and
    /// releases this client's proxy reference. Idempotent.
    pub fn on_window_detached(&mut self, is_config_change: bool) {
        if self.destroyed || self.layout.is_none() {
            return;
        }
        self.layout = None;
        if let Some(proxy) = self.proxy.take() {
            let result = lock_overlay(&proxy).window_detached(is_config_change);
            if let Err(e) = result {
                debug!("window_detached failed: {e}");
            }
        }
    }

    pub fn on_resume(&mut self) {
        if self.destroyed {
            return;
        }
        self.activity_state.set_resumed(true);
        self.send_activity_state();
    }

    pub fn on_pause(&mut self) {
        if self.destroyed {
            return;
        }
        self.activity_state.set_resumed(false);
        self.send_activity_state();
    }

    /// Covers the service having died while the window was stopped: clears the
    /// stopped gate and re-attempts connection before forwarding state.
    pub fn on_start(&mut self) {
        if self.destroyed {
            return;
        }
        self.connection.set_stopped(false);
        self.reconnect();
        self.activity_state.set_started(true);
        self.send_activity_state();
    }

    /// Drops only this client's keepalive binding; the shared connection is
    /// left for the other windows.
    pub fn on_stop(&mut self) {
        if self.destroyed {
            return;
        }
        self.connection.set_stopped(true);
        self.keepalive.unbind();
        self.activity_state.set_started(false);
        self.send_activity_state();
    }

    pub fn start_scroll(&mut self) {
        self.forward("start_scroll", |overlay| overlay.start_scroll());
    }

    pub fn set_scroll(&mut self, progress: f32) {
        self.forward("on_scroll", |overlay| overlay.on_scroll(progress));
    }

    pub fn end_scroll(&mut self) {
        self.forward("end_scroll", |overlay| overlay.end_scroll());
    }

    pub fn hide_overlay(&mut self, feed_running: bool) {
        self.forward("close_overlay", |overlay| {
            overlay.close_overlay(u32::from(feed_running))
        });
    }

    /// Start a search session on the overlay. Requires protocol version 6;
    /// on older providers this fails locally without attempting the call.
    pub fn start_search(&mut self, query: &[u8], extras: &Map<String, Value>) -> bool {
        if self.destroyed || !self.connection.capabilities().search {
            return false;
        }
        let Some(proxy) = &self.proxy else {
            return false;
        };
        match lock_overlay(proxy).start_search(query, extras) {
            Ok(started) => started,
            Err(e) => {
                debug!("start_search failed: {e}");
                false
            }
        }
    }

    /// Store the latest extra layout bundle. Only re-triggers the handshake
    /// on providers that support incremental redraw; older versions pick the
    /// extras up at the next natural reattachment.
    pub fn redraw(&mut self, layout_extras: Map<String, Value>) {
        if self.destroyed {
            return;
        }
        self.layout_extras = layout_extras;
        if self.layout.is_some() && self.connection.capabilities().incremental_redraw {
            self.exchange_config();
        }
    }

    /// The overlay provider package was replaced: drop everything, re-resolve
    /// the protocol version, and reconnect if this window is in the
    /// foreground.
    pub fn on_provider_changed(&mut self) {
        if self.destroyed {
            return;
        }
        self.keepalive.unbind();
        self.connection.disconnect();
        self.connection.refresh_version();
        self.proxy = None;
        if self.activity_state.is_resumed() {
            self.reconnect();
        }
    }

    /// Permanently tear the client down. Every later public call is a no-op,
    /// and callbacks already in flight from the remote are dropped.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.callback.detach();
        self.keepalive.unbind();
        self.connection.unregister_client(self.client_id);
        self.proxy = None;
        debug!("overlay client {} destroyed", self.client_id);
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.proxy.is_some()
    }

    #[must_use]
    pub fn activity_state(&self) -> ActivityState {
        self.activity_state
    }

    fn reconnect(&mut self) {
        if self.destroyed {
            return;
        }
        if !self.connection.connect() || !self.keepalive.bind() {
            // Report the failure on the next pump rather than inline, so a
            // connected state that never materializes is still torn down on
            // the host queue.
            warn!("overlay binding failed, resetting service state");
            let _ = self.conn_tx.send(ConnectionEvent::ServiceDisconnected);
        }
    }

    /// The attach handshake: supply window geometry and the callback channel,
    /// then bring the remote up to date on lifecycle state. Call shapes are
    /// picked from the capability table.
    fn exchange_config(&mut self) {
        let Some(proxy) = &self.proxy else {
            return;
        };
        let Some(layout) = self.layout else {
            return;
        };
        let caps = self.connection.capabilities();
        let mut overlay = lock_overlay(proxy);

        let attach = if caps.bundle_attach {
            let bundle = AttachBundle {
                layout,
                configuration: self.device_config,
                client_options: self.client_options,
                extras: self.layout_extras.clone(),
            };
            overlay.window_attached2(bundle, Arc::clone(&self.callback))
        } else {
            overlay.window_attached(layout, Arc::clone(&self.callback), self.client_options)
        };

        let state = if caps.unified_activity_state {
            overlay.set_activity_state(self.activity_state)
        } else if self.activity_state.is_resumed() {
            overlay.on_resume()
        } else {
            overlay.on_pause()
        };

        if let Err(e) = attach.and(state) {
            debug!("attach handshake failed: {e}");
        }
    }

    /// Forward the current activity state if connected and attached.
    fn send_activity_state(&mut self) {
        let Some(proxy) = &self.proxy else {
            return;
        };
        if self.layout.is_none() {
            return;
        }
        let caps = self.connection.capabilities();
        let mut overlay = lock_overlay(proxy);
        let result = if caps.unified_activity_state {
            overlay.set_activity_state(self.activity_state)
        } else if self.activity_state.is_resumed() {
            overlay.on_resume()
        } else {
            overlay.on_pause()
        };
        if let Err(e) = result {
            debug!("activity state forward failed: {e}");
        }
    }

    fn forward(
        &mut self,
        what: &str,
        call: impl FnOnce(&mut dyn crate::proxy::OverlayService) -> crate::error::Result<()>,
    ) {
        if self.destroyed {
            return;
        }
        let Some(proxy) = &self.proxy else {
            return;
        };
        if let Err(e) = call(&mut *lock_overlay(proxy)) {
            debug!("{what} failed: {e}");
        }
    }

    fn set_service_state(&mut self, service_state: i32) {
        if self.service_state != service_state {
            self.service_state = service_state;
            self.scroll_callback
                .on_service_state_changed(service_state & 1 != 0);
        }
    }
}

impl Drop for OverlayClient {
    fn drop(&mut self) {
        self.destroy();
    }
}
