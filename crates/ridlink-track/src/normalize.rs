//! Detection location gate
//!
//! Detections without a usable position are dropped here rather than
//! turned into tracks at null island. Dropping is policy, not an error.

use tracing::debug;

use ridlink_core::Detection;

/// Pass a detection through only if its location is usable
pub fn admit(detection: Detection) -> Option<Detection> {
    if detection.is_valid_location() {
        Some(detection)
    } else {
        debug!(
            lat = detection.uas_lat,
            lon = detection.uas_lon,
            "Ignoring detection with invalid location"
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_valid() {
        let d = Detection {
            uas_lat: 47.6062,
            uas_lon: -122.3321,
            ..Default::default()
        };
        assert_eq!(admit(d.clone()), Some(d));
    }

    #[test]
    fn test_drop_invalid() {
        let zero = Detection::default();
        assert_eq!(admit(zero), None);

        let nan = Detection {
            uas_lat: f64::NAN,
            uas_lon: 10.0,
            ..Default::default()
        };
        assert!(admit(nan).is_none());
    }
}
