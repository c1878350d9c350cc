//! Track event model
//!
//! A track event is a self-contained value: identity, classification, a
//! timestamp triple, a point, and named detail blocks. The display layer
//! owns it after hand-off.

use std::time::Duration;

use ridlink_core::{Timestamp, TrackId};

/// Unknown-affiliation airborne track, rotary wing
pub const TYPE_DRONE_UNKNOWN: &str = "a-u-A-M-F-Q-r";
/// Hostile airborne track, rotary wing. Reserved; never selected from data.
pub const TYPE_DRONE_HOSTILE: &str = "a-h-A-M-F-Q-r";

/// How the position was obtained: sensor
pub const HOW_SENSOR: &str = "h-s";

/// Staleness window for detection tracks
pub const DETECTION_STALE_AFTER: Duration = Duration::from_secs(30);

/// Circular/linear error value meaning "unknown"
pub const UNKNOWN_ERROR: f64 = 9_999_999.0;

/// Vertical datum of a point's altitude
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AltitudeReference {
    /// Height above the WGS-84 ellipsoid
    #[default]
    Hae,
    /// Height above ground level
    Agl,
}

impl AltitudeReference {
    pub fn as_str(self) -> &'static str {
        match self {
            AltitudeReference::Hae => "HAE",
            AltitudeReference::Agl => "AGL",
        }
    }
}

/// Spatial point of a track
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    /// Altitude in meters against `altitude_ref`
    pub hae: f64,
    /// Circular error, meters
    pub ce: f64,
    /// Linear (vertical) error, meters
    pub le: f64,
    pub altitude_ref: AltitudeReference,
}

impl TrackPoint {
    pub fn new(lat: f64, lon: f64, hae: f64) -> Self {
        TrackPoint {
            lat,
            lon,
            hae,
            ce: UNKNOWN_ERROR,
            le: UNKNOWN_ERROR,
            altitude_ref: AltitudeReference::Hae,
        }
    }
}

/// Named structured detail with ordered attributes and optional inner text
#[derive(Clone, Debug, PartialEq, Default)]
pub struct DetailBlock {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
}

impl DetailBlock {
    pub fn new(name: impl Into<String>) -> Self {
        DetailBlock {
            name: name.into(),
            attributes: Vec::new(),
            text: None,
        }
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    /// Set an attribute only when `value` is non-empty
    pub fn set_non_empty(&mut self, key: &str, value: &str) {
        if !value.is_empty() {
            self.set(key, value);
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Normalized output record for the display/federation layer
#[derive(Clone, Debug, PartialEq)]
pub struct TrackEvent {
    pub uid: TrackId,
    pub event_type: String,
    pub how: String,
    /// Generation time
    pub time: Timestamp,
    pub start: Timestamp,
    pub stale: Timestamp,
    pub point: TrackPoint,
    pub details: Vec<DetailBlock>,
}

impl TrackEvent {
    pub fn detail(&self, name: &str) -> Option<&DetailBlock> {
        self.details.iter().find(|d| d.name == name)
    }

    pub fn callsign(&self) -> Option<&str> {
        self.detail("contact").and_then(|c| c.get("callsign"))
    }

    pub fn remarks(&self) -> Option<&str> {
        self.detail("remarks").and_then(|r| r.text.as_deref())
    }

    /// Whether consumers should treat this event as outdated at `now`
    pub fn is_stale_at(&self, now: Timestamp) -> bool {
        now >= self.stale
    }
}

/// External collaborator that receives finished track events
pub trait TrackSink: Send + Sync {
    fn publish(&self, event: TrackEvent);
}

impl<F> TrackSink for F
where
    F: Fn(TrackEvent) + Send + Sync,
{
    fn publish(&self, event: TrackEvent) {
        self(event)
    }
}
