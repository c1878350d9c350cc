//! In-memory transport for tests and simulation
//!
//! Each expected connection is a `tokio::io::duplex` pair: the adapter hands
//! the client half to the manager and the caller keeps the device half to
//! write telemetry into.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{duplex, DuplexStream};

use ridlink_core::{RidError, RidResult};

use crate::adapter::{BoxedStream, ByteStream, OpenFuture, TransportAdapter};
use crate::endpoint::{Endpoint, Permission};

/// Default duplex buffer per connection
pub const MEMORY_STREAM_CAPACITY: usize = 64 * 1024;

/// Mock transport for testing
#[derive(Clone)]
pub struct MemoryTransport {
    inner: Arc<Mutex<MemoryInner>>,
    opens: Arc<AtomicUsize>,
}

struct MemoryInner {
    available: bool,
    denied: HashSet<Permission>,
    bonded: Vec<Endpoint>,
    discovering: bool,
    fail_discovery: bool,
    fail_bond: bool,
    bond_requests: Vec<String>,
    hang_on_open: bool,
    pending: HashMap<String, VecDeque<BoxedStream>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        MemoryTransport {
            inner: Arc::new(Mutex::new(MemoryInner {
                available: true,
                denied: HashSet::new(),
                bonded: Vec::new(),
                discovering: false,
                fail_discovery: false,
                fail_bond: false,
                bond_requests: Vec::new(),
                hang_on_open: false,
                pending: HashMap::new(),
            })),
            opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a connection for `address` and return the device side
    pub fn expect_connection(&self, address: &str) -> DuplexStream {
        let (client, device) = duplex(MEMORY_STREAM_CAPACITY);
        self.expect_stream(address, client);
        device
    }

    /// Queue an arbitrary client-side stream for `address`
    pub fn expect_stream<S>(&self, address: &str, stream: S)
    where
        S: ByteStream + 'static,
    {
        self.inner
            .lock()
            .pending
            .entry(address.to_string())
            .or_default()
            .push_back(Box::new(stream));
    }

    pub fn set_available(&self, available: bool) {
        self.inner.lock().available = available;
    }

    pub fn deny(&self, permission: Permission) {
        self.inner.lock().denied.insert(permission);
    }

    pub fn grant(&self, permission: Permission) {
        self.inner.lock().denied.remove(&permission);
    }

    pub fn add_bonded(&self, endpoint: Endpoint) {
        self.inner.lock().bonded.push(endpoint);
    }

    pub fn fail_discovery(&self, fail: bool) {
        self.inner.lock().fail_discovery = fail;
    }

    pub fn fail_bond(&self, fail: bool) {
        self.inner.lock().fail_bond = fail;
    }

    /// Make every open stay pending forever
    pub fn hang_on_open(&self, hang: bool) {
        self.inner.lock().hang_on_open = hang;
    }

    /// Addresses passed to `create_bond`, in order
    pub fn bond_requests(&self) -> Vec<String> {
        self.inner.lock().bond_requests.clone()
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportAdapter for MemoryTransport {
    fn is_available(&self) -> bool {
        self.inner.lock().available
    }

    fn has_permission(&self, permission: Permission) -> bool {
        !self.inner.lock().denied.contains(&permission)
    }

    fn bonded_endpoints(&self) -> Vec<Endpoint> {
        self.inner.lock().bonded.clone()
    }

    fn is_discovering(&self) -> bool {
        self.inner.lock().discovering
    }

    fn start_discovery(&self) -> RidResult<()> {
        let mut inner = self.inner.lock();
        if inner.fail_discovery {
            return Err(RidError::DiscoveryFailed("adapter refused discovery".into()));
        }
        inner.discovering = true;
        Ok(())
    }

    fn cancel_discovery(&self) -> RidResult<()> {
        self.inner.lock().discovering = false;
        Ok(())
    }

    fn create_bond(&self, endpoint: &Endpoint) -> RidResult<()> {
        let mut inner = self.inner.lock();
        if inner.fail_bond {
            return Err(RidError::PairingFailed(endpoint.address.clone()));
        }
        inner.bond_requests.push(endpoint.address.clone());
        Ok(())
    }

    fn open(&self, endpoint: &Endpoint) -> OpenFuture {
        self.opens.fetch_add(1, Ordering::SeqCst);

        let mut inner = self.inner.lock();
        if inner.hang_on_open {
            return Box::pin(std::future::pending::<RidResult<BoxedStream>>());
        }

        let stream = inner
            .pending
            .get_mut(&endpoint.address)
            .and_then(|queue| queue.pop_front());
        let address = endpoint.address.clone();
        Box::pin(async move {
            match stream {
                Some(s) => Ok(s),
                None => Err(RidError::ConnectionFailed(format!(
                    "no device listening at {}",
                    address
                ))),
            }
        })
    }
}
