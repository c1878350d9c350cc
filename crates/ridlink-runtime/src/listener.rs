//! Listener interfaces and dispatch
//!
//! Observers register per concern (connection, discovery, data, tracks) or
//! for the whole tagged event stream. Registries are copied before
//! iteration, so listeners may be added or removed from inside a callback.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::error;

use ridlink_core::{BatteryStatus, Detection, DeviceInfo};
use ridlink_track::{TrackEvent, TrackSink};
use ridlink_transport::Endpoint;

/// Connection lifecycle callbacks
pub trait ConnectionListener: Send + Sync {
    fn on_connecting(&self, _device: &str) {}
    fn on_connected(&self, _device: &str) {}
    fn on_disconnected(&self) {}
    fn on_error(&self, _message: &str) {}
}

/// Discovery and pairing callbacks
pub trait DiscoveryListener: Send + Sync {
    fn on_discovery_started(&self) {}
    fn on_device_found(&self, _endpoint: &Endpoint) {}
    fn on_discovery_finished(&self) {}
    fn on_pairing_requested(&self, _endpoint: &Endpoint) {}
    fn on_pairing_succeeded(&self, _endpoint: &Endpoint) {}
    fn on_pairing_failed(&self, _endpoint: &Endpoint) {}
    fn on_discovery_error(&self, _message: &str) {}
}

/// Decoded message callbacks. Detections arrive only with a valid location.
pub trait DataListener: Send + Sync {
    fn on_device_info(&self, _info: &DeviceInfo) {}
    fn on_battery_status(&self, _status: &BatteryStatus) {}
    fn on_detection(&self, _detection: &Detection) {}
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConnectionEvent {
    Connecting(String),
    Connected(String),
    Disconnected,
    Error(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum DiscoveryEvent {
    Started,
    DeviceFound(Endpoint),
    Finished,
    PairingRequested(Endpoint),
    PairingSucceeded(Endpoint),
    PairingFailed(Endpoint),
    Error(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum DataEvent {
    DeviceInfo(DeviceInfo),
    BatteryStatus(BatteryStatus),
    Detection(Box<Detection>),
}

/// Everything the manager reports, in emission order
#[derive(Clone, Debug, PartialEq)]
pub enum ManagerEvent {
    Connection(ConnectionEvent),
    Discovery(DiscoveryEvent),
    Data(DataEvent),
    Track(Box<TrackEvent>),
}

/// Observer of the whole tagged event stream
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &ManagerEvent);
}

impl<F> EventListener for F
where
    F: Fn(&ManagerEvent) + Send + Sync,
{
    fn on_event(&self, event: &ManagerEvent) {
        self(event)
    }
}

/// Copy-on-iterate listener list
pub struct Registry<L: ?Sized> {
    listeners: RwLock<Vec<Arc<L>>>,
}

impl<L: ?Sized> Registry<L> {
    pub fn new() -> Self {
        Registry {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Add a listener; the same `Arc` is never registered twice
    pub fn add(&self, listener: Arc<L>) {
        let mut listeners = self.listeners.write();
        if !listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            listeners.push(listener);
        }
    }

    pub fn remove(&self, listener: &Arc<L>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    pub fn snapshot(&self) -> Vec<Arc<L>> {
        self.listeners.read().clone()
    }

    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<L: ?Sized> Default for Registry<L> {
    fn default() -> Self {
        Self::new()
    }
}

/// All registries of one manager
#[derive(Default)]
pub struct Listeners {
    pub connection: Registry<dyn ConnectionListener>,
    pub discovery: Registry<dyn DiscoveryListener>,
    pub data: Registry<dyn DataListener>,
    pub tracks: Registry<dyn TrackSink>,
    pub events: Registry<dyn EventListener>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.connection.clear();
        self.discovery.clear();
        self.data.clear();
        self.tracks.clear();
        self.events.clear();
    }

    /// Deliver one event to every interested listener.
    ///
    /// A panicking listener is logged and skipped; the remaining listeners
    /// and later events are still delivered.
    pub fn dispatch(&self, event: ManagerEvent) {
        for listener in self.events.snapshot() {
            guarded("event", || listener.on_event(&event));
        }

        match event {
            ManagerEvent::Connection(event) => self.dispatch_connection(&event),
            ManagerEvent::Discovery(event) => self.dispatch_discovery(&event),
            ManagerEvent::Data(event) => self.dispatch_data(&event),
            ManagerEvent::Track(event) => {
                for sink in self.tracks.snapshot() {
                    guarded("track", || sink.publish((*event).clone()));
                }
            }
        }
    }

    fn dispatch_connection(&self, event: &ConnectionEvent) {
        for l in self.connection.snapshot() {
            guarded("connection", || match event {
                ConnectionEvent::Connecting(name) => l.on_connecting(name),
                ConnectionEvent::Connected(name) => l.on_connected(name),
                ConnectionEvent::Disconnected => l.on_disconnected(),
                ConnectionEvent::Error(message) => l.on_error(message),
            });
        }
    }

    fn dispatch_discovery(&self, event: &DiscoveryEvent) {
        for l in self.discovery.snapshot() {
            guarded("discovery", || match event {
                DiscoveryEvent::Started => l.on_discovery_started(),
                DiscoveryEvent::DeviceFound(ep) => l.on_device_found(ep),
                DiscoveryEvent::Finished => l.on_discovery_finished(),
                DiscoveryEvent::PairingRequested(ep) => l.on_pairing_requested(ep),
                DiscoveryEvent::PairingSucceeded(ep) => l.on_pairing_succeeded(ep),
                DiscoveryEvent::PairingFailed(ep) => l.on_pairing_failed(ep),
                DiscoveryEvent::Error(message) => l.on_discovery_error(message),
            });
        }
    }

    fn dispatch_data(&self, event: &DataEvent) {
        for l in self.data.snapshot() {
            guarded("data", || match event {
                DataEvent::DeviceInfo(info) => l.on_device_info(info),
                DataEvent::BatteryStatus(status) => l.on_battery_status(status),
                DataEvent::Detection(d) => l.on_detection(d),
            });
        }
    }
}

/// Run one listener callback, containing any panic it raises
fn guarded<F: FnOnce()>(concern: &str, call: F) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(call)) {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!("{} listener panicked, skipping it: {}", concern, reason);
    }
}
