//! TCP transport implementation
//!
//! For receivers bridged onto the network (serial-to-TCP gateways, the
//! simulator). Endpoint addresses are `host:port`. There is no radio
//! discovery; the known endpoint list is configured up front and every
//! configured endpoint counts as bonded.

use parking_lot::RwLock;
use tokio::net::TcpStream;
use tracing::debug;

use ridlink_core::{RidError, RidResult};

use crate::adapter::{BoxedStream, OpenFuture, TransportAdapter};
use crate::endpoint::{Endpoint, PairingState};

/// TCP transport for ridlink
pub struct TcpTransport {
    endpoints: RwLock<Vec<Endpoint>>,
    nodelay: bool,
}

impl TcpTransport {
    pub fn new() -> Self {
        TcpTransport {
            endpoints: RwLock::new(Vec::new()),
            nodelay: true,
        }
    }

    pub fn with_endpoints(endpoints: Vec<Endpoint>) -> Self {
        let transport = Self::new();
        for ep in endpoints {
            transport.add_endpoint(ep);
        }
        transport
    }

    /// Register a known endpoint; it is treated as bonded
    pub fn add_endpoint(&self, endpoint: Endpoint) {
        let endpoint = endpoint.with_pairing(PairingState::Paired);
        let mut endpoints = self.endpoints.write();
        match endpoints.iter_mut().find(|e| e.address == endpoint.address) {
            Some(existing) => *existing = endpoint,
            None => endpoints.push(endpoint),
        }
    }

    /// Connect directly to `address`
    pub async fn connect(address: &str, nodelay: bool) -> RidResult<TcpStream> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| RidError::ConnectionFailed(e.to_string()))?;
        if nodelay {
            stream
                .set_nodelay(true)
                .map_err(|e| RidError::ConnectionFailed(e.to_string()))?;
        }
        debug!("TCP stream open to {}", address);
        Ok(stream)
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportAdapter for TcpTransport {
    fn is_available(&self) -> bool {
        true
    }

    fn bonded_endpoints(&self) -> Vec<Endpoint> {
        self.endpoints.read().clone()
    }

    fn start_discovery(&self) -> RidResult<()> {
        Err(RidError::DiscoveryFailed(
            "TCP transport has no discovery".into(),
        ))
    }

    fn cancel_discovery(&self) -> RidResult<()> {
        Ok(())
    }

    fn create_bond(&self, endpoint: &Endpoint) -> RidResult<()> {
        self.add_endpoint(endpoint.clone());
        Ok(())
    }

    fn open(&self, endpoint: &Endpoint) -> OpenFuture {
        let address = endpoint.address.clone();
        let nodelay = self.nodelay;
        Box::pin(async move {
            let stream = Self::connect(&address, nodelay).await?;
            Ok(Box::new(stream) as BoxedStream)
        })
    }
}
