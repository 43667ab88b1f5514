//! Shared overlay connection: one binding, many clients.
//!
//! The connection is constructed once by the application's composition root
//! and injected into every [`OverlayClient`](crate::client::OverlayClient)
//! (one per hosting window). Only the connection mutates the remote proxy
//! handle; clients read it and are notified of every transition through their
//! registered event senders.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::capability::{Capabilities, ProtocolVersion, VersionSource};
use crate::proxy::SharedOverlay;

/// The platform's asynchronous service-binding primitive, kept opaque.
///
/// `bind` only initiates a binding: if it returns `true` the platform adapter
/// will eventually call [`OverlayConnection::service_connected`] with the
/// remote proxy, or never call anything at all. `false` means binding could
/// not even be initiated (provider missing, permission denied).
pub trait ServiceBinder: Send {
    fn bind(&mut self) -> bool;
    fn unbind(&mut self);
}

/// Identifies one registered client on the shared connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection transitions broadcast to every registered client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    ServiceConnected,
    ServiceDisconnected,
}

struct ConnectionInner {
    binder: Box<dyn ServiceBinder>,
    version_source: Box<dyn VersionSource>,
    version: ProtocolVersion,
    capabilities: Capabilities,
    proxy: Option<SharedOverlay>,
    bound: bool,
    stopped: bool,
    listeners: HashMap<ClientId, mpsc::UnboundedSender<ConnectionEvent>>,
    next_client_id: u64,
}

/// Process-wide shared connection to the overlay provider.
///
/// Replaces a lazily-initialized global with an explicitly constructed
/// instance: the composition root owns it, clients register and unregister,
/// and the binding is dropped when the last client goes away.
pub struct OverlayConnection {
    inner: Mutex<ConnectionInner>,
}

impl OverlayConnection {
    #[must_use]
    pub fn new(binder: Box<dyn ServiceBinder>, version_source: Box<dyn VersionSource>) -> Self {
        let version = ProtocolVersion::resolve(version_source.as_ref());
        Self {
            inner: Mutex::new(ConnectionInner {
                binder,
                version_source,
                version,
                capabilities: Capabilities::from_version(version),
                proxy: None,
                bound: false,
                stopped: false,
                listeners: HashMap::new(),
                next_client_id: 0,
            }),
        }
    }

    /// Register a client's event sender. The returned id must be passed to
    /// [`unregister_client`](Self::unregister_client) on teardown.
    pub fn register_client(&self, events: mpsc::UnboundedSender<ConnectionEvent>) -> ClientId {
        let mut inner = self.lock();
        let id = ClientId(inner.next_client_id);
        inner.next_client_id += 1;
        inner.listeners.insert(id, events);
        debug!("overlay client {id} registered");
        id
    }

    /// Unregister a client. Dropping the last registration releases the
    /// binding and the remote proxy.
    pub fn unregister_client(&self, id: ClientId) {
        let mut inner = self.lock();
        if inner.listeners.remove(&id).is_none() {
            warn!("unregister for unknown overlay client {id}");
            return;
        }
        debug!("overlay client {id} unregistered");
        if inner.listeners.is_empty() {
            Self::drop_binding(&mut inner);
        }
    }

    /// Attempt to (re)establish the binding. Returns `false` if the binding
    /// could not be initiated or the connection is stopped.
    pub fn connect(&self) -> bool {
        let mut inner = self.lock();
        if inner.stopped {
            return false;
        }
        if inner.bound {
            return true;
        }
        inner.bound = inner.binder.bind();
        if inner.bound {
            info!("overlay binding initiated (protocol version {})", inner.version);
        }
        inner.bound
    }

    /// Release the binding and the remote proxy, notifying clients once if a
    /// proxy was present.
    pub fn disconnect(&self) {
        let mut inner = self.lock();
        Self::drop_binding(&mut inner);
    }

    /// Gate reconnect attempts while every hosting window is stopped.
    pub fn set_stopped(&self, stopped: bool) {
        self.lock().stopped = stopped;
    }

    /// Platform adapter entry point: the asynchronous bind completed and the
    /// remote replied with its proxy.
    pub fn service_connected(&self, proxy: SharedOverlay) {
        let mut inner = self.lock();
        info!("overlay service connected");
        inner.proxy = Some(proxy);
        Self::broadcast(&mut inner, ConnectionEvent::ServiceConnected);
    }

    /// Platform adapter entry point: the remote process died. The binding
    /// itself stays alive so the platform can restore it. Idempotent; no
    /// duplicate notification is sent for an already-disconnected service.
    pub fn service_disconnected(&self) {
        let mut inner = self.lock();
        if inner.proxy.take().is_some() {
            info!("overlay service disconnected");
            Self::broadcast(&mut inner, ConnectionEvent::ServiceDisconnected);
        }
    }

    /// Re-resolve the protocol version and capability table. Called when the
    /// overlay provider package was replaced.
    pub fn refresh_version(&self) {
        let mut inner = self.lock();
        let version = ProtocolVersion::resolve(inner.version_source.as_ref());
        if version != inner.version {
            info!("overlay protocol version changed {} -> {version}", inner.version);
        }
        inner.version = version;
        inner.capabilities = Capabilities::from_version(version);
    }

    #[must_use]
    pub fn proxy(&self) -> Option<SharedOverlay> {
        self.lock().proxy.clone()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.lock().proxy.is_some()
    }

    #[must_use]
    pub fn version(&self) -> ProtocolVersion {
        self.lock().version
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.lock().capabilities
    }

    fn drop_binding(inner: &mut ConnectionInner) {
        if inner.bound {
            inner.binder.unbind();
            inner.bound = false;
        }
        if inner.proxy.take().is_some() {
            Self::broadcast(inner, ConnectionEvent::ServiceDisconnected);
        }
    }

    fn broadcast(inner: &mut ConnectionInner, event: ConnectionEvent) {
        inner.listeners.retain(|id, tx| {
            let alive = tx.send(event).is_ok();
            if !alive {
                debug!("dropping dead listener for overlay client {id}");
            }
            alive
        });
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::FixedVersion;
    use crate::error::Result;
    use crate::proxy::{OverlayCallback, OverlayService};
    use serde_json::{Map, Value};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use verge_types::{ActivityState, AttachBundle, WindowLayout};

    struct NullOverlay;

    impl OverlayService for NullOverlay {
        fn window_attached(
            &mut self,
            _layout: WindowLayout,
            _callback: Arc<OverlayCallback>,
            _client_options: u32,
        ) -> Result<()> {
            Ok(())
        }
        fn window_attached2(
            &mut self,
            _bundle: AttachBundle,
            _callback: Arc<OverlayCallback>,
        ) -> Result<()> {
            Ok(())
        }
        fn window_detached(&mut self, _is_config_change: bool) -> Result<()> {
            Ok(())
        }
        fn on_resume(&mut self) -> Result<()> {
            Ok(())
        }
        fn on_pause(&mut self) -> Result<()> {
            Ok(())
        }
        fn set_activity_state(&mut self, _state: ActivityState) -> Result<()> {
            Ok(())
        }
        fn start_scroll(&mut self) -> Result<()> {
            Ok(())
        }
        fn on_scroll(&mut self, _progress: f32) -> Result<()> {
            Ok(())
        }
        fn end_scroll(&mut self) -> Result<()> {
            Ok(())
        }
        fn close_overlay(&mut self, _options: u32) -> Result<()> {
            Ok(())
        }
        fn start_search(&mut self, _query: &[u8], _extras: &Map<String, Value>) -> Result<bool> {
            Ok(false)
        }
    }

    #[derive(Clone, Default)]
    struct CountingBinder {
        binds: Arc<AtomicUsize>,
        unbinds: Arc<AtomicUsize>,
        refuse: bool,
    }

    impl ServiceBinder for CountingBinder {
        fn bind(&mut self) -> bool {
            self.binds.fetch_add(1, Ordering::SeqCst);
            !self.refuse
        }
        fn unbind(&mut self) {
            self.unbinds.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn connection_with(binder: CountingBinder, version: i32) -> OverlayConnection {
        OverlayConnection::new(Box::new(binder), Box::new(FixedVersion(version)))
    }

    #[test]
    fn test_connect_binds_once() {
        let binder = CountingBinder::default();
        let binds = binder.binds.clone();
        let connection = connection_with(binder, 7);

        assert!(connection.connect());
        assert!(connection.connect());
        assert_eq!(binds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_connect_refused_returns_false() {
        let binder = CountingBinder {
            refuse: true,
            ..CountingBinder::default()
        };
        let connection = connection_with(binder, 7);
        assert!(!connection.connect());
    }

    #[test]
    fn test_connect_while_stopped_returns_false() {
        let binder = CountingBinder::default();
        let binds = binder.binds.clone();
        let connection = connection_with(binder, 7);

        connection.set_stopped(true);
        assert!(!connection.connect());
        assert_eq!(binds.load(Ordering::SeqCst), 0);

        connection.set_stopped(false);
        assert!(connection.connect());
    }

    #[test]
    fn test_service_connected_broadcasts_to_all_clients() {
        let connection = connection_with(CountingBinder::default(), 7);
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        connection.register_client(tx1);
        connection.register_client(tx2);

        connection.service_connected(Arc::new(std::sync::Mutex::new(NullOverlay)));

        assert_eq!(rx1.try_recv(), Ok(ConnectionEvent::ServiceConnected));
        assert_eq!(rx2.try_recv(), Ok(ConnectionEvent::ServiceConnected));
        assert!(connection.is_connected());
    }

    #[test]
    fn test_service_disconnected_notifies_once() {
        let connection = connection_with(CountingBinder::default(), 7);
        let (tx, mut rx) = mpsc::unbounded_channel();
        connection.register_client(tx);

        connection.service_connected(Arc::new(std::sync::Mutex::new(NullOverlay)));
        connection.service_disconnected();
        connection.service_disconnected();

        assert_eq!(rx.try_recv(), Ok(ConnectionEvent::ServiceConnected));
        assert_eq!(rx.try_recv(), Ok(ConnectionEvent::ServiceDisconnected));
        assert!(rx.try_recv().is_err(), "no duplicate disconnect broadcast");
    }

    #[test]
    fn test_last_unregister_drops_binding() {
        let binder = CountingBinder::default();
        let unbinds = binder.unbinds.clone();
        let connection = connection_with(binder, 7);
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        let id1 = connection.register_client(tx1);
        let id2 = connection.register_client(tx2);
        assert!(connection.connect());

        connection.unregister_client(id1);
        assert_eq!(unbinds.load(Ordering::SeqCst), 0, "binding survives while clients remain");

        connection.unregister_client(id2);
        assert_eq!(unbinds.load(Ordering::SeqCst), 1);
        assert!(!connection.is_connected());
    }

    #[test]
    fn test_refresh_version_updates_capabilities() {
        struct SharedSource(Arc<std::sync::atomic::AtomicI32>);
        impl VersionSource for SharedSource {
            fn service_api_version(&self) -> Option<i32> {
                Some(self.0.load(Ordering::SeqCst))
            }
        }

        let shared = Arc::new(std::sync::atomic::AtomicI32::new(1));
        let connection = OverlayConnection::new(
            Box::new(CountingBinder::default()),
            Box::new(SharedSource(shared.clone())),
        );
        assert_eq!(connection.version().get(), 1);
        assert!(!connection.capabilities().search);

        shared.store(7, Ordering::SeqCst);
        connection.refresh_version();
        assert_eq!(connection.version().get(), 7);
        assert!(connection.capabilities().search);
        assert!(connection.capabilities().incremental_redraw);
    }
}
