//! Stream chaos for the framer
//!
//! Simulates what a serial-over-radio link does to a message stream:
//! - Arbitrary read boundaries, including single-byte reads
//! - Line noise between messages
//!
//! Noise never contains braces, so it cannot open or close an object.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Bytes the link may inject between messages
const NOISE_BYTES: &[u8] = b" \t\r\n\0#~xyz0123456789,;:\"";

/// Stream chaos configuration
#[derive(Clone, Debug)]
pub struct ChaosConfig {
    /// Smallest chunk handed to a reader
    pub min_chunk: usize,
    /// Largest chunk handed to a reader
    pub max_chunk: usize,
    /// Probability of noise after a message (0.0 - 1.0)
    pub noise_prob: f64,
    /// Longest noise run
    pub max_noise_len: usize,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        ChaosConfig {
            min_chunk: 1,
            max_chunk: 64,
            noise_prob: 0.1,
            max_noise_len: 4,
        }
    }
}

impl ChaosConfig {
    /// Whole messages, large reads, no noise
    pub fn clean() -> Self {
        ChaosConfig {
            min_chunk: 1024,
            max_chunk: 1024,
            noise_prob: 0.0,
            max_noise_len: 0,
        }
    }

    /// Tiny reads and frequent noise
    pub fn hostile() -> Self {
        ChaosConfig {
            min_chunk: 1,
            max_chunk: 7,
            noise_prob: 0.5,
            max_noise_len: 16,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChaosStats {
    pub messages: u64,
    pub noise_bytes: u64,
    pub chunks: u64,
    pub smallest_chunk: usize,
    pub largest_chunk: usize,
}

/// Seeded byte stream mangler
pub struct ChaosStream {
    config: ChaosConfig,
    rng: StdRng,
    stats: ChaosStats,
}

impl ChaosStream {
    pub fn new(config: ChaosConfig, seed: u64) -> Self {
        ChaosStream {
            config,
            rng: StdRng::seed_from_u64(seed),
            stats: ChaosStats::default(),
        }
    }

    /// Concatenate messages with random noise between them
    pub fn interleave(&mut self, messages: &[String]) -> Vec<u8> {
        let mut out = Vec::new();
        for message in messages {
            self.stats.messages += 1;
            out.extend_from_slice(message.as_bytes());

            if self.config.max_noise_len > 0 && self.rng.gen::<f64>() < self.config.noise_prob {
                let len = self.rng.gen_range(1..=self.config.max_noise_len);
                for _ in 0..len {
                    out.push(NOISE_BYTES[self.rng.gen_range(0..NOISE_BYTES.len())]);
                }
                self.stats.noise_bytes += len as u64;
            }
        }
        out
    }

    /// Cut a byte stream at random boundaries
    pub fn split(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        let min = self.config.min_chunk.max(1);
        let max = self.config.max_chunk.max(min);

        let mut chunks = Vec::new();
        let mut rest = bytes;
        while !rest.is_empty() {
            let len = self.rng.gen_range(min..=max).min(rest.len());
            let (chunk, tail) = rest.split_at(len);
            self.record_chunk(len);
            chunks.push(chunk.to_vec());
            rest = tail;
        }
        chunks
    }

    /// Interleave then split
    pub fn fragment(&mut self, messages: &[String]) -> Vec<Vec<u8>> {
        let bytes = self.interleave(messages);
        self.split(&bytes)
    }

    fn record_chunk(&mut self, len: usize) {
        if self.stats.chunks == 0 || len < self.stats.smallest_chunk {
            self.stats.smallest_chunk = len;
        }
        self.stats.largest_chunk = self.stats.largest_chunk.max(len);
        self.stats.chunks += 1;
    }

    pub fn stats(&self) -> &ChaosStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = ChaosStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages() -> Vec<String> {
        (0..20)
            .map(|i| format!(r#"{{"batteryLevel":{}}}"#, i as f32 / 20.0))
            .collect()
    }

    #[test]
    fn test_split_preserves_bytes() {
        let mut chaos = ChaosStream::new(ChaosConfig::default(), 7);
        let bytes = chaos.interleave(&messages());
        let chunks = chaos.split(&bytes);

        assert_eq!(chunks.concat(), bytes);
        assert!(chaos.stats().largest_chunk <= 64);
        assert_eq!(chaos.stats().chunks, chunks.len() as u64);
    }

    #[test]
    fn test_clean_adds_no_noise() {
        let mut chaos = ChaosStream::new(ChaosConfig::clean(), 1);
        let msgs = messages();
        assert_eq!(chaos.interleave(&msgs), msgs.concat().into_bytes());
        assert_eq!(chaos.stats().noise_bytes, 0);
    }

    #[test]
    fn test_hostile_noise_has_no_braces() {
        let mut chaos = ChaosStream::new(ChaosConfig::hostile(), 99);
        let msgs = messages();
        let bytes = chaos.interleave(&msgs);

        assert!(chaos.stats().noise_bytes > 0);
        let braces = bytes.iter().filter(|&&b| b == b'{').count();
        assert_eq!(braces, msgs.len());
    }

    #[test]
    fn test_same_seed_same_chunks() {
        let a = ChaosStream::new(ChaosConfig::hostile(), 5).fragment(&messages());
        let b = ChaosStream::new(ChaosConfig::hostile(), 5).fragment(&messages());
        assert_eq!(a, b);
    }
}
