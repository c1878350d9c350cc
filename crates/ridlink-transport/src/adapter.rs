//! Platform transport seam
//!
//! The session manager never talks to a radio stack directly. It asks an
//! adapter for availability, permissions, bonded endpoints and byte streams;
//! discovery and bonding results come back through the manager's
//! `handle_*` entry points, which the platform glue calls.

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};

use ridlink_core::RidResult;

use crate::endpoint::{Endpoint, Permission};

/// Bidirectional byte stream to a device
pub trait ByteStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> ByteStream for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

pub type BoxedStream = Box<dyn ByteStream>;

/// Pending stream open, driven on the manager's connect task
pub type OpenFuture = Pin<Box<dyn Future<Output = RidResult<BoxedStream>> + Send>>;

/// Abstract transport the manager opens streams on
pub trait TransportAdapter: Send + Sync {
    /// Whether the underlying transport exists and is switched on
    fn is_available(&self) -> bool;

    fn has_permission(&self, _permission: Permission) -> bool {
        true
    }

    /// Endpoints the platform already trusts
    fn bonded_endpoints(&self) -> Vec<Endpoint>;

    fn is_discovering(&self) -> bool {
        false
    }

    /// Begin a discovery cycle. Results may be reported through the
    /// manager's `handle_*` entry points from inside this call or later.
    fn start_discovery(&self) -> RidResult<()>;

    fn cancel_discovery(&self) -> RidResult<()>;

    /// Ask the platform to bond; the outcome arrives as a bond state change
    fn create_bond(&self, endpoint: &Endpoint) -> RidResult<()>;

    /// Open a stream to `endpoint`. The future must not borrow `self`.
    fn open(&self, endpoint: &Endpoint) -> OpenFuture;
}
