//! Identity types for ridlink
//!
//! Track identifiers are strings because they travel to the display layer
//! verbatim. Device addresses are MAC-style strings (`AA:BB:CC:DD:EE:FF`).

use std::fmt;

/// Prefix applied to every track id and callsign
pub const TRACK_PREFIX: &str = "DRONE-";

/// Stable identifier of a track in the display layer
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct TrackId(pub String);

impl TrackId {
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        TrackId(id.into())
    }

    /// Build a track id from a detection's unique identifier
    pub fn from_unique(unique: &str) -> Self {
        TrackId(format!("{}{}", TRACK_PREFIX, unique))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Track({})", self.0)
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strip `:` and `-` separators from a hardware address
pub fn strip_address_separators(address: &str) -> String {
    address.chars().filter(|c| *c != ':' && *c != '-').collect()
}

/// Last `n` characters of a separator-stripped address, if it is long enough
pub fn address_suffix(address: &str, n: usize) -> Option<String> {
    let stripped = strip_address_separators(address);
    let len = stripped.chars().count();
    if len < n {
        return None;
    }
    Some(stripped.chars().skip(len - n).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_separators() {
        assert_eq!(strip_address_separators("AA:BB:CC:DD:EE:FF"), "AABBCCDDEEFF");
        assert_eq!(strip_address_separators("aa-bb-cc"), "aabbcc");
        assert_eq!(strip_address_separators(""), "");
    }

    #[test]
    fn test_address_suffix() {
        assert_eq!(address_suffix("AA:BB:CC:DD:EE:FF", 4).as_deref(), Some("EEFF"));
        assert_eq!(address_suffix("A:B:C", 4), None);
        assert_eq!(address_suffix("A:B:C:D", 4).as_deref(), Some("ABCD"));
    }

    #[test]
    fn test_track_id_prefix() {
        let id = TrackId::from_unique("1581F5FHD23456");
        assert_eq!(id.as_str(), "DRONE-1581F5FHD23456");
        assert_eq!(format!("{:?}", id), "Track(DRONE-1581F5FHD23456)");
    }
}
