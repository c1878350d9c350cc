//! Per-session ingestion pipeline
//!
//! Synchronous and transport-free so it can be driven by the read loop, a
//! file replay or a test. Each chunk runs through:
//! 1. Framing into complete JSON objects
//! 2. Classification and decoding
//! 3. Location gate for detections
//! 4. Track event conversion
//!
//! Outputs are emitted in stream order: a detection's data event is always
//! followed directly by its track event.

use tracing::{debug, warn};

use ridlink_core::{Message, RidError, RidResult, Timestamp};
use ridlink_track::{admit, convert_at};
use ridlink_wire::{decode_at, preview, JsonFramer};

use crate::listener::{DataEvent, ManagerEvent};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub chunks: u64,
    pub bytes: u64,
    pub messages: u64,
    pub invalid_json: u64,
    pub unknown_messages: u64,
    pub device_info: u64,
    pub battery_status: u64,
    pub detections: u64,
    pub rejected_locations: u64,
    pub tracks: u64,
    pub conversion_failures: u64,
}

/// Framer plus decode/convert stages for one stream
pub struct Pipeline {
    framer: JsonFramer,
    stats: PipelineStats,
}

impl Pipeline {
    pub fn new(max_message_len: usize) -> Self {
        Pipeline {
            framer: JsonFramer::with_limit(max_message_len),
            stats: PipelineStats::default(),
        }
    }

    /// Process one chunk using the system clock
    pub fn process_chunk<F>(&mut self, chunk: &[u8], emit: F) -> RidResult<()>
    where
        F: FnMut(ManagerEvent),
    {
        self.process_chunk_at(chunk, Timestamp::now(), emit)
    }

    /// Process one chunk, stamping detections and tracks with `now`.
    ///
    /// Messages completed before an oversize error are still emitted; the
    /// error is returned afterwards and the stream should be dropped.
    pub fn process_chunk_at<F>(&mut self, chunk: &[u8], now: Timestamp, mut emit: F) -> RidResult<()>
    where
        F: FnMut(ManagerEvent),
    {
        self.stats.chunks += 1;
        self.stats.bytes += chunk.len() as u64;

        let mut texts = Vec::new();
        let framed = self.framer.push(chunk, |text| texts.push(text));

        for text in &texts {
            self.process_message(text, now, &mut emit);
        }
        framed
    }

    /// Decode one complete message text and emit its events
    pub fn process_message<F>(&mut self, text: &str, now: Timestamp, emit: &mut F)
    where
        F: FnMut(ManagerEvent),
    {
        self.stats.messages += 1;
        debug!("Received complete JSON: {}", preview(text));

        let message = match decode_at(text, now) {
            Ok(message) => message,
            Err(RidError::UnknownMessage) => {
                self.stats.unknown_messages += 1;
                warn!("Unknown JSON message type: {}", preview(text));
                return;
            }
            Err(e) => {
                self.stats.invalid_json += 1;
                warn!("Failed to parse JSON: {} ({})", preview(text), e);
                return;
            }
        };

        match message {
            Message::DeviceInfo(info) => {
                self.stats.device_info += 1;
                emit(ManagerEvent::Data(DataEvent::DeviceInfo(info)));
            }
            Message::BatteryStatus(status) => {
                self.stats.battery_status += 1;
                emit(ManagerEvent::Data(DataEvent::BatteryStatus(status)));
            }
            Message::Detection(detection) => {
                self.stats.detections += 1;
                let Some(detection) = admit(*detection) else {
                    self.stats.rejected_locations += 1;
                    return;
                };
                let track = convert_at(&detection, now);
                emit(ManagerEvent::Data(DataEvent::Detection(Box::new(detection))));
                match track {
                    Some(event) => {
                        self.stats.tracks += 1;
                        emit(ManagerEvent::Track(Box::new(event)));
                    }
                    None => self.stats.conversion_failures += 1,
                }
            }
        }
    }

    /// Drop any partially assembled object
    pub fn reset(&mut self) {
        self.framer.reset();
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn framer(&self) -> &JsonFramer {
        &self.framer
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(ridlink_wire::DEFAULT_MAX_MESSAGE_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NOW: Timestamp = Timestamp(1_700_000_000_000);
    const SCENARIO: &str = r#"{"uasId":"AA:BB:CC:DD:EE:FF","uasLat":"47.6062","uasLon":"-122.3321","uasHae":"120.5"}"#;

    fn run(pipeline: &mut Pipeline, chunks: &[&[u8]]) -> (Vec<ManagerEvent>, RidResult<()>) {
        let mut events = Vec::new();
        let mut result = Ok(());
        for chunk in chunks {
            result = pipeline.process_chunk_at(chunk, NOW, |e| events.push(e));
            if result.is_err() {
                break;
            }
        }
        (events, result)
    }

    #[test]
    fn test_scenario_split_in_three() {
        let bytes = SCENARIO.as_bytes();
        let mut pipeline = Pipeline::default();
        let (events, result) = run(&mut pipeline, &[&bytes[..20], &bytes[20..55], &bytes[55..]]);
        assert!(result.is_ok());
        assert_eq!(events.len(), 2);

        let ManagerEvent::Data(DataEvent::Detection(d)) = &events[0] else {
            panic!("expected detection, got {:?}", events[0]);
        };
        assert_eq!(d.uas_id, "AA:BB:CC:DD:EE:FF");
        assert_eq!(d.timestamp, NOW);

        let ManagerEvent::Track(track) = &events[1] else {
            panic!("expected track, got {:?}", events[1]);
        };
        assert!(track.uid.as_str().ends_with("EEFF"));
        assert_eq!(pipeline.stats().tracks, 1);
    }

    #[test]
    fn test_concatenated_in_one_read() {
        let chunk = br#"{"manufacturer":"GYB","model":"D1","version":"1.2"}{"batteryLevel":0.8,"batteryTemp":31.5}"#;
        let mut pipeline = Pipeline::default();
        let (events, _) = run(&mut pipeline, &[chunk.as_slice()]);

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], ManagerEvent::Data(DataEvent::DeviceInfo(i)) if i.model == "D1"));
        assert!(matches!(&events[1], ManagerEvent::Data(DataEvent::BatteryStatus(b)) if b.percentage() == 80));
    }

    #[test]
    fn test_null_island_produces_nothing() {
        let mut pipeline = Pipeline::default();
        let (events, _) = run(
            &mut pipeline,
            &[br#"{"uasId":"AA:BB","uasLat":0,"uasLon":0}"#.as_slice()],
        );
        assert!(events.is_empty());
        assert_eq!(pipeline.stats().rejected_locations, 1);
        assert_eq!(pipeline.stats().tracks, 0);
    }

    #[test]
    fn test_malformed_then_valid() {
        let mut pipeline = Pipeline::default();
        let (events, result) = run(
            &mut pipeline,
            &[
                br#"{"uasId": }"#.as_slice(),
                br#"{"batteryLevel":0.5}"#.as_slice(),
            ],
        );
        assert!(result.is_ok());
        assert_eq!(pipeline.stats().invalid_json, 1);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ManagerEvent::Data(DataEvent::BatteryStatus(_))));
    }

    #[test]
    fn test_unknown_message_dropped() {
        let mut pipeline = Pipeline::default();
        let (events, _) = run(
            &mut pipeline,
            &[br#"{"hello":"world"}[1,2]{"batteryLevel":1}"#.as_slice()],
        );
        assert_eq!(events.len(), 1);
        assert_eq!(pipeline.stats().unknown_messages, 1);
    }

    #[test]
    fn test_oversize_delivers_earlier_messages() {
        let mut pipeline = Pipeline::new(64);
        let mut chunk = br#"{"batteryLevel":0.25}"#.to_vec();
        chunk.extend_from_slice(b"{\"uasId\":\"");
        chunk.extend(std::iter::repeat(b'A').take(100));

        let (events, result) = run(&mut pipeline, &[chunk.as_slice()]);
        assert_eq!(events.len(), 1);
        assert!(matches!(result, Err(RidError::MessageTooLarge { limit: 64, .. })));
    }

    proptest! {
        #[test]
        fn prop_split_point_does_not_matter(split in 0usize..=SCENARIO.len()) {
            let bytes = SCENARIO.as_bytes();
            let mut whole = Pipeline::default();
            let mut parts = Pipeline::default();
            let (a, _) = run(&mut whole, &[bytes]);
            let (b, _) = run(&mut parts, &[&bytes[..split], &bytes[split..]]);
            prop_assert_eq!(a, b);
        }
    }
}
