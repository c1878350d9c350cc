//! Transport session manager
//!
//! Owns at most one live session. A session moves through
//! `Idle -> Connecting -> Connected -> Disconnecting -> Idle`; connect
//! requests are rejected unless the manager is idle.
//!
//! Teardown can start from two places: a caller (`disconnect`) or the read
//! loop (EOF, I/O failure). Whichever takes the active session out of the
//! shared state performs the release and the single `Disconnected`
//! notification. Every session carries a generation number so a stale
//! connect attempt or read loop can never tear down a newer session.
//!
//! Listener callbacks are funnelled through one dispatcher task and are
//! delivered in emission order.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use ridlink_core::{RidError, RidResult};
use ridlink_track::TrackSink;
use ridlink_transport::{BoxedStream, Endpoint, PairingState, Permission, TransportAdapter};

use crate::config::ManagerConfig;
use crate::listener::{
    ConnectionEvent, ConnectionListener, DataListener, DiscoveryEvent, DiscoveryListener,
    EventListener, Listeners, ManagerEvent,
};
use crate::reader::{close_stream, read_loop, LoopExit};

/// Session lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnecting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Disconnecting => "disconnecting",
        };
        f.write_str(s)
    }
}

enum Dispatch {
    Event(ManagerEvent),
    Flush(oneshot::Sender<()>),
}

struct ActiveSession {
    endpoint: Endpoint,
    shutdown: watch::Sender<bool>,
    reader: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct Shared {
    state: SessionState,
    generation: u64,
    session: Option<ActiveSession>,
    connect_task: Option<JoinHandle<()>>,
    retry_task: Option<JoinHandle<()>>,
    last_endpoint: Option<Endpoint>,
}

#[derive(Default)]
struct Discovery {
    scanning: bool,
    found: Vec<Endpoint>,
}

struct Inner {
    adapter: Arc<dyn TransportAdapter>,
    config: ManagerConfig,
    shared: Mutex<Shared>,
    discovery: Mutex<Discovery>,
    listeners: Arc<Listeners>,
    dispatch: mpsc::UnboundedSender<Dispatch>,
}

/// Session manager for one detection device
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    /// Create a manager with default configuration.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(adapter: Arc<dyn TransportAdapter>) -> Self {
        Self::with_config(adapter, ManagerConfig::default())
    }

    pub fn with_config(adapter: Arc<dyn TransportAdapter>, config: ManagerConfig) -> Self {
        let listeners = Arc::new(Listeners::new());
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatch_loop(listeners.clone(), rx));

        SessionManager {
            inner: Arc::new(Inner {
                adapter,
                config,
                shared: Mutex::new(Shared::default()),
                discovery: Mutex::new(Discovery::default()),
                listeners,
                dispatch: tx,
            }),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    // Listener registration

    pub fn add_connection_listener(&self, listener: Arc<dyn ConnectionListener>) {
        self.inner.listeners.connection.add(listener);
    }

    pub fn remove_connection_listener(&self, listener: &Arc<dyn ConnectionListener>) -> bool {
        self.inner.listeners.connection.remove(listener)
    }

    pub fn add_discovery_listener(&self, listener: Arc<dyn DiscoveryListener>) {
        self.inner.listeners.discovery.add(listener);
    }

    pub fn remove_discovery_listener(&self, listener: &Arc<dyn DiscoveryListener>) -> bool {
        self.inner.listeners.discovery.remove(listener)
    }

    pub fn add_data_listener(&self, listener: Arc<dyn DataListener>) {
        self.inner.listeners.data.add(listener);
    }

    pub fn remove_data_listener(&self, listener: &Arc<dyn DataListener>) -> bool {
        self.inner.listeners.data.remove(listener)
    }

    /// Register a consumer of finished track events
    pub fn add_track_sink(&self, sink: Arc<dyn TrackSink>) {
        self.inner.listeners.tracks.add(sink);
    }

    pub fn remove_track_sink(&self, sink: &Arc<dyn TrackSink>) -> bool {
        self.inner.listeners.tracks.remove(sink)
    }

    /// Observe every event as a tagged value
    pub fn add_event_listener(&self, listener: Arc<dyn EventListener>) {
        self.inner.listeners.events.add(listener);
    }

    pub fn remove_event_listener(&self, listener: &Arc<dyn EventListener>) -> bool {
        self.inner.listeners.events.remove(listener)
    }

    pub(crate) fn notify(&self, event: ManagerEvent) {
        // Send fails only once the dispatcher is gone, i.e. during teardown
        let _ = self.inner.dispatch.send(Dispatch::Event(event));
    }

    fn notify_connection(&self, event: ConnectionEvent) {
        self.notify(ManagerEvent::Connection(event));
    }

    fn notify_discovery(&self, event: DiscoveryEvent) {
        self.notify(ManagerEvent::Discovery(event));
    }

    /// Wait until every event emitted so far has been delivered
    pub async fn flush_events(&self) {
        let (tx, rx) = oneshot::channel();
        if self.inner.dispatch.send(Dispatch::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    // Transport queries

    pub fn is_transport_available(&self) -> bool {
        self.inner.adapter.is_available()
    }

    /// Bonded endpoints whose name carries the device prefix
    pub fn paired_devices(&self) -> Vec<Endpoint> {
        let adapter = &self.inner.adapter;
        if !adapter.is_available() {
            warn!("Transport not available");
            return Vec::new();
        }
        if !adapter.has_permission(Permission::Connect) {
            warn!("Connect permission not granted");
            return Vec::new();
        }

        let prefix = &self.inner.config.device_name_prefix;
        adapter
            .bonded_endpoints()
            .into_iter()
            .filter(|ep| ep.name_starts_with(prefix))
            .inspect(|ep| debug!("Found {} device: {} ({})", prefix, ep.display_name(), ep.address))
            .collect()
    }

    // Connection

    pub fn state(&self) -> SessionState {
        self.inner.shared.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.inner.shared.lock().state == SessionState::Connected
    }

    pub fn connected_device_name(&self) -> Option<String> {
        let shared = self.inner.shared.lock();
        match shared.state {
            SessionState::Connected => shared
                .session
                .as_ref()
                .map(|s| s.endpoint.display_name().to_string()),
            _ => None,
        }
    }

    /// Start connecting to `endpoint`. Completion is reported through
    /// connection listeners.
    pub fn connect(&self, endpoint: Endpoint) -> RidResult<()> {
        let generation = self.begin_connect(&endpoint, true)?;

        let manager = self.clone();
        let task = tokio::spawn(async move {
            let _ = manager.complete_connect(generation, endpoint).await;
        });

        let mut shared = self.inner.shared.lock();
        if shared.generation == generation {
            shared.connect_task = Some(task);
        }
        Ok(())
    }

    /// Connect to the first paired device
    pub fn connect_to_first_device(&self) -> RidResult<()> {
        match self.paired_devices().into_iter().next() {
            Some(endpoint) => self.connect(endpoint),
            None => {
                let err = RidError::NoPairedDevices(self.inner.config.device_name_prefix.clone());
                self.notify_connection(ConnectionEvent::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Connect again to the most recently used endpoint
    pub fn reconnect(&self) -> RidResult<()> {
        let endpoint = self.inner.shared.lock().last_endpoint.clone();
        match endpoint {
            Some(endpoint) => self.connect(endpoint),
            None => Err(RidError::NotConnected),
        }
    }

    fn begin_connect(&self, endpoint: &Endpoint, cancel_retry: bool) -> RidResult<u64> {
        let mut shared = self.inner.shared.lock();
        if shared.state != SessionState::Idle {
            warn!("Already connected, disconnect first (state: {})", shared.state);
            return Err(RidError::AlreadyConnected);
        }
        if !self.inner.adapter.has_permission(Permission::Connect) {
            drop(shared);
            let err = RidError::PermissionDenied(Permission::Connect.name());
            self.notify_connection(ConnectionEvent::Error(err.to_string()));
            return Err(err);
        }

        let name = endpoint.display_name().to_string();
        if cancel_retry {
            if let Some(retry) = shared.retry_task.take() {
                retry.abort();
            }
        }

        shared.generation += 1;
        shared.state = SessionState::Connecting;
        shared.last_endpoint = Some(endpoint.clone());

        info!("Connecting to {}", name);
        self.notify_connection(ConnectionEvent::Connecting(name));
        Ok(shared.generation)
    }

    async fn complete_connect(&self, generation: u64, endpoint: Endpoint) -> RidResult<()> {
        let open = self.inner.adapter.open(&endpoint);
        let result = match timeout(self.inner.config.connect_timeout, open).await {
            Ok(result) => result,
            Err(_) => Err(RidError::ConnectTimeout),
        };

        match result {
            Ok(stream) => self.attach_stream(generation, endpoint, stream).await,
            Err(e) => self.fail_connect(generation, &endpoint, e),
        }
    }

    async fn attach_stream(
        &self,
        generation: u64,
        endpoint: Endpoint,
        stream: BoxedStream,
    ) -> RidResult<()> {
        {
            let mut shared = self.inner.shared.lock();
            if shared.generation == generation && shared.state == SessionState::Connecting {
                let name = endpoint.display_name().to_string();
                let (tx, rx) = watch::channel(false);

                shared.state = SessionState::Connected;
                shared.connect_task = None;
                info!("Connected to {}", name);
                // Queued before the reader can emit any data
                self.notify_connection(ConnectionEvent::Connected(name));

                let reader = tokio::spawn(read_loop(self.clone(), generation, stream, rx));
                shared.session = Some(ActiveSession {
                    endpoint,
                    shutdown: tx,
                    reader: Some(reader),
                });
                return Ok(());
            }
        }

        debug!("Connect attempt superseded, closing stream");
        close_stream(stream).await;
        Err(RidError::NotConnected)
    }

    fn fail_connect(&self, generation: u64, endpoint: &Endpoint, err: RidError) -> RidResult<()> {
        {
            let mut shared = self.inner.shared.lock();
            if shared.generation != generation || shared.state != SessionState::Connecting {
                return Err(err);
            }
            shared.state = SessionState::Idle;
            shared.connect_task = None;
        }

        error!("Failed to connect to {}: {}", endpoint.display_name(), err);
        let message = match &err {
            RidError::ConnectionFailed(_) => err.to_string(),
            other => format!("Connection failed: {}", other),
        };
        self.notify_connection(ConnectionEvent::Error(message));
        Err(err)
    }

    /// Called by the read loop when it stops on its own
    pub(crate) fn read_loop_exited(&self, generation: u64, exit: LoopExit) {
        if matches!(exit, LoopExit::Cancelled) {
            return;
        }

        let endpoint = {
            let mut shared = self.inner.shared.lock();
            if shared.generation != generation || shared.session.is_none() {
                debug!("Read loop ending, already disconnected");
                return;
            }
            // Our own handle; dropping it detaches the finishing task
            shared.session = None;
            shared.state = SessionState::Idle;
            shared.last_endpoint.clone()
        };

        if let LoopExit::Failed(e) = &exit {
            self.notify_connection(ConnectionEvent::Error(format!("Connection lost: {}", e)));
        }
        info!("Disconnected");
        self.notify_connection(ConnectionEvent::Disconnected);

        if let Some(endpoint) = endpoint {
            self.schedule_reconnect(endpoint);
        }
    }

    fn schedule_reconnect(&self, endpoint: Endpoint) {
        let policy = self.inner.config.reconnect;
        if policy.delay_for(1).is_none() {
            return;
        }

        let manager = self.clone();
        let task = tokio::spawn(async move {
            let mut attempt = 1;
            while let Some(delay) = policy.delay_for(attempt) {
                sleep(delay).await;
                if manager.state() != SessionState::Idle {
                    return;
                }
                info!("Reconnect attempt {} to {}", attempt, endpoint.display_name());
                let generation = match manager.begin_connect(&endpoint, false) {
                    Ok(generation) => generation,
                    Err(_) => return,
                };
                if manager.complete_connect(generation, endpoint.clone()).await.is_ok() {
                    return;
                }
                attempt += 1;
            }
            warn!("Giving up reconnecting to {}", endpoint.display_name());
        });

        let mut shared = self.inner.shared.lock();
        if let Some(previous) = shared.retry_task.replace(task) {
            previous.abort();
        }
    }

    /// Tear down the active session or in-flight connect attempt.
    ///
    /// Idempotent: `Disconnected` is notified exactly once per session.
    pub async fn disconnect(&self) {
        let (session, connect_task) = {
            let mut shared = self.inner.shared.lock();
            if let Some(retry) = shared.retry_task.take() {
                retry.abort();
            }
            match shared.state {
                SessionState::Connecting | SessionState::Connected => {}
                SessionState::Idle | SessionState::Disconnecting => {
                    debug!("Disconnect called but already disconnected");
                    return;
                }
            }
            shared.generation += 1;
            shared.state = SessionState::Disconnecting;
            (shared.session.take(), shared.connect_task.take())
        };

        if let Some(task) = connect_task {
            task.abort();
        }

        if let Some(mut session) = session {
            let _ = session.shutdown.send(true);
            if let Some(mut reader) = session.reader.take() {
                match timeout(self.inner.config.join_timeout, &mut reader).await {
                    Ok(_) => debug!("Read loop joined"),
                    Err(_) => {
                        warn!(
                            "Read loop did not stop within {:?}, aborting",
                            self.inner.config.join_timeout
                        );
                        reader.abort();
                    }
                }
            }
            info!("Disconnected from {}", session.endpoint.display_name());
        }

        {
            let mut shared = self.inner.shared.lock();
            shared.state = SessionState::Idle;
        }
        self.notify_connection(ConnectionEvent::Disconnected);
    }

    // Discovery

    pub fn is_discovering(&self) -> bool {
        self.inner.discovery.lock().scanning
    }

    pub fn start_discovery(&self) -> RidResult<()> {
        let adapter = &self.inner.adapter;
        if !adapter.is_available() {
            self.notify_discovery(DiscoveryEvent::Error("Transport not available".into()));
            return Err(RidError::TransportUnavailable);
        }
        if !adapter.has_permission(Permission::Scan) {
            let err = RidError::PermissionDenied(Permission::Scan.name());
            self.notify_discovery(DiscoveryEvent::Error(err.to_string()));
            return Err(err);
        }

        {
            let mut discovery = self.inner.discovery.lock();
            if discovery.scanning {
                warn!("Discovery already in progress");
                return Ok(());
            }
            discovery.found.clear();
            discovery.scanning = true;
        }

        // Unlocked: the adapter may report results from inside this call
        if let Err(e) = adapter.start_discovery() {
            self.inner.discovery.lock().scanning = false;
            error!("Failed to start discovery: {}", e);
            self.notify_discovery(DiscoveryEvent::Error(e.to_string()));
            return Err(e);
        }
        debug!("Started discovery");
        self.notify_discovery(DiscoveryEvent::Started);
        Ok(())
    }

    /// Stop the current discovery cycle, reporting it finished
    pub fn stop_discovery(&self) {
        let found = {
            let mut discovery = self.inner.discovery.lock();
            if !discovery.scanning {
                return;
            }
            discovery.scanning = false;
            discovery.found.len()
        };

        if self.inner.adapter.has_permission(Permission::Scan) {
            if let Err(e) = self.inner.adapter.cancel_discovery() {
                warn!("Failed to cancel discovery: {}", e);
            }
        }
        debug!("Stopped discovery. Found {} devices", found);
        self.notify_discovery(DiscoveryEvent::Finished);
    }

    pub fn discovered_devices(&self) -> Vec<Endpoint> {
        self.inner.discovery.lock().found.clone()
    }

    /// Platform callback: an endpoint was seen during discovery
    pub fn handle_endpoint_found(&self, endpoint: Endpoint) {
        {
            let mut discovery = self.inner.discovery.lock();
            if discovery
                .found
                .iter()
                .any(|e| e.address == endpoint.address)
            {
                return;
            }
            discovery.found.push(endpoint.clone());
        }
        debug!("Found device: {} ({})", endpoint.display_name(), endpoint.address);
        self.notify_discovery(DiscoveryEvent::DeviceFound(endpoint));
    }

    /// Platform callback: the discovery cycle ended
    pub fn handle_discovery_finished(&self) {
        let found = {
            let mut discovery = self.inner.discovery.lock();
            if !discovery.scanning {
                // Already reported by stop_discovery
                return;
            }
            discovery.scanning = false;
            discovery.found.len()
        };
        debug!("Discovery finished. Found {} devices", found);
        self.notify_discovery(DiscoveryEvent::Finished);
    }

    // Pairing

    /// Request bonding. Returns `Ok(true)` if already paired or requested.
    pub fn pair_device(&self, endpoint: &Endpoint) -> RidResult<bool> {
        if endpoint.is_paired() {
            debug!("Device already paired: {}", endpoint.display_name());
            return Ok(true);
        }
        if !self.inner.adapter.has_permission(Permission::Connect) {
            let err = RidError::PermissionDenied(Permission::Connect.name());
            self.notify_discovery(DiscoveryEvent::Error(err.to_string()));
            return Err(err);
        }

        match self.inner.adapter.create_bond(endpoint) {
            Ok(()) => {
                debug!("Pairing requested for: {}", endpoint.display_name());
                self.notify_discovery(DiscoveryEvent::PairingRequested(endpoint.clone()));
                Ok(true)
            }
            Err(e) => {
                error!("Failed to initiate pairing: {}", e);
                Err(e)
            }
        }
    }

    /// Platform callback: the bond state of an endpoint changed
    pub fn handle_bond_state_changed(&self, endpoint: Endpoint, state: PairingState) {
        match state {
            PairingState::Paired => {
                debug!("Device paired: {}", endpoint.display_name());
                let endpoint = endpoint.with_pairing(PairingState::Paired);
                self.notify_discovery(DiscoveryEvent::PairingSucceeded(endpoint));
            }
            PairingState::None => {
                debug!("Device unpaired: {}", endpoint.display_name());
                let endpoint = endpoint.with_pairing(PairingState::None);
                self.notify_discovery(DiscoveryEvent::PairingFailed(endpoint));
            }
            PairingState::Pairing => {
                debug!("Device pairing in progress: {}", endpoint.display_name());
            }
        }
    }

    /// Stop discovery, disconnect and drop every listener
    pub async fn shutdown(&self) {
        self.stop_discovery();
        self.disconnect().await;
        self.flush_events().await;
        self.inner.listeners.clear();
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state())
            .field("discovering", &self.is_discovering())
            .finish()
    }
}

async fn dispatch_loop(listeners: Arc<Listeners>, mut rx: mpsc::UnboundedReceiver<Dispatch>) {
    while let Some(item) = rx.recv().await {
        match item {
            Dispatch::Event(event) => listeners.dispatch(event),
            Dispatch::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Listener dispatch stopped");
}
