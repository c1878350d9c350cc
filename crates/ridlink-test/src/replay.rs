//! Replay helpers
//!
//! Drive recorded or generated byte streams through the pipeline offline,
//! or through a live session manager backed by an in-memory transport.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::DuplexStream;

use ridlink_core::{Detection, RidError, RidResult, Timestamp};
use ridlink_runtime::{
    ConnectionEvent, DataEvent, ManagerConfig, ManagerEvent, Pipeline, PipelineStats,
    SessionManager,
};
use ridlink_track::TrackEvent;
use ridlink_transport::{Endpoint, MemoryTransport, PairingState};

/// Result of an offline replay
#[derive(Debug)]
pub struct Replay {
    pub events: Vec<ManagerEvent>,
    pub stats: PipelineStats,
    /// Framing error that ended the replay early
    pub error: Option<RidError>,
}

impl Replay {
    pub fn detections(&self) -> Vec<&Detection> {
        detections(&self.events)
    }

    pub fn tracks(&self) -> Vec<&TrackEvent> {
        tracks(&self.events)
    }
}

/// Feed chunks through a fresh pipeline, stopping at the first framing error
pub fn replay(chunks: &[Vec<u8>], max_message_len: usize, now: Timestamp) -> Replay {
    let mut pipeline = Pipeline::new(max_message_len);
    let mut events = Vec::new();
    let mut error = None;

    for chunk in chunks {
        if let Err(e) = pipeline.process_chunk_at(chunk, now, |event| events.push(event)) {
            error = Some(e);
            break;
        }
    }

    Replay {
        events,
        stats: pipeline.stats().clone(),
        error,
    }
}

pub fn detections(events: &[ManagerEvent]) -> Vec<&Detection> {
    events
        .iter()
        .filter_map(|e| match e {
            ManagerEvent::Data(DataEvent::Detection(d)) => Some(d.as_ref()),
            _ => None,
        })
        .collect()
}

pub fn tracks(events: &[ManagerEvent]) -> Vec<&TrackEvent> {
    events
        .iter()
        .filter_map(|e| match e {
            ManagerEvent::Track(t) => Some(t.as_ref()),
            _ => None,
        })
        .collect()
}

/// A session manager wired to an in-memory device
pub struct LiveSession {
    pub manager: SessionManager,
    pub transport: MemoryTransport,
    pub endpoint: Endpoint,
    events: Arc<Mutex<Vec<ManagerEvent>>>,
}

impl LiveSession {
    /// Build a manager with a recording event listener. Requires a Tokio
    /// runtime.
    pub fn new(config: ManagerConfig) -> Self {
        let transport = MemoryTransport::new();
        let manager = SessionManager::with_config(Arc::new(transport.clone()), config);
        let events = Arc::new(Mutex::new(Vec::new()));

        let sink = events.clone();
        manager.add_event_listener(Arc::new(move |e: &ManagerEvent| sink.lock().push(e.clone())));

        LiveSession {
            manager,
            transport,
            endpoint: Endpoint::named("gyb_detect-sim", "02:00:00:00:00:01")
                .with_pairing(PairingState::Paired),
            events,
        }
    }

    /// Connect and wait until the session is up; returns the device side
    pub async fn connect(&self, within: Duration) -> RidResult<DuplexStream> {
        let device = self.transport.expect_connection(&self.endpoint.address);
        self.manager.connect(self.endpoint.clone())?;

        let connected = self
            .wait_for(within, |events| {
                events
                    .iter()
                    .any(|e| matches!(e, ManagerEvent::Connection(ConnectionEvent::Connected(_))))
            })
            .await;
        if connected {
            Ok(device)
        } else {
            Err(RidError::ConnectTimeout)
        }
    }

    /// Every event delivered so far
    pub async fn events(&self) -> Vec<ManagerEvent> {
        self.manager.flush_events().await;
        self.events.lock().clone()
    }

    /// Poll delivered events until `done` holds or `within` elapses
    pub async fn wait_for<P>(&self, within: Duration, done: P) -> bool
    where
        P: Fn(&[ManagerEvent]) -> bool,
    {
        let step = Duration::from_millis(5);
        let mut waited = Duration::ZERO;
        loop {
            if done(&self.events().await) {
                return true;
            }
            if waited >= within {
                return false;
            }
            tokio::time::sleep(step).await;
            waited += step;
        }
    }
}
