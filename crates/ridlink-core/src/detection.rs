//! Remote ID detection record
//!
//! A detection is one telemetry sample heard by the receiver: who the
//! aircraft is, how it was heard, where it is and where its operator is.
//! Every field has a zero default so partially populated broadcasts still
//! produce a record.

use crate::{address_suffix, strip_address_separators, ReceiveMethod, Timestamp};

/// Full telemetry sample for one sensed aircraft
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Detection {
    // Identity
    /// Hardware address of the broadcasting aircraft
    pub uas_id: String,
    /// Operator ID as broadcast
    pub remote_id: String,
    pub serial_number: String,
    /// Civil aviation authority registration
    pub caa_reg_id: String,
    /// Self-ID free text
    pub description: String,
    pub op_id: String,
    pub utm_id: String,
    pub session_id: i32,

    // Reception metadata
    /// Signal strength, dBm
    pub rssi: i32,
    pub recv_method: i32,
    /// Capture time
    pub timestamp: Timestamp,

    // Classification and status
    pub uas_type: i32,
    pub op_status: i32,

    // Aircraft kinematics
    pub uas_lat: f64,
    pub uas_lon: f64,
    /// Degrees, 0-360
    pub uas_heading: f32,
    /// m/s
    pub uas_h_speed: f32,
    pub uas_h_speed_error: f32,
    /// m/s
    pub uas_v_speed: f32,
    pub uas_v_speed_error: f32,
    /// Altitude MSL, meters
    pub uas_hae: f32,
    /// Height above ground, meters
    pub uas_hag: f32,
    /// Height above takeoff, meters
    pub uas_hat: f32,
    pub uas_horizontal_error: f32,
    pub uas_vertical_error: f32,
    pub uas_baro_pressure: f32,
    pub uas_baro_pressure_acc: f32,

    // Operator location
    pub op_lat: f64,
    pub op_lon: f64,
    pub op_hae: f32,
    pub op_location_type: i32,
}

impl Detection {
    /// Empty detection stamped with the current time
    pub fn new() -> Self {
        Detection {
            timestamp: Timestamp::now(),
            ..Default::default()
        }
    }

    /// True if the aircraft position can be placed on a map.
    ///
    /// Rejects the (0, 0) null island pair, NaN, and out-of-range values.
    pub fn is_valid_location(&self) -> bool {
        let (lat, lon) = (self.uas_lat, self.uas_lon);
        if lat == 0.0 && lon == 0.0 {
            return false;
        }
        if lat.is_nan() || lon.is_nan() {
            return false;
        }
        (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
    }

    /// Operator position is reported only when both coordinates are non-zero
    pub fn has_operator_location(&self) -> bool {
        self.op_lat != 0.0 && self.op_lon != 0.0
    }

    pub fn recv_method_label(&self) -> String {
        ReceiveMethod::describe(self.recv_method)
    }

    /// Best available identifier for the aircraft.
    ///
    /// Precedence: serial number, hardware address, operator id, then a
    /// synthetic `UNKNOWN-<millis>` derived from `now`. The hardware address
    /// is returned with separators removed.
    pub fn unique_id_at(&self, now: Timestamp) -> String {
        if !self.serial_number.is_empty() {
            return self.serial_number.clone();
        }
        if !self.uas_id.is_empty() {
            return strip_address_separators(&self.uas_id);
        }
        if !self.remote_id.is_empty() {
            return self.remote_id.clone();
        }
        format!("UNKNOWN-{}", now.as_millis())
    }

    pub fn unique_id(&self) -> String {
        self.unique_id_at(Timestamp::now())
    }

    /// Last four hex digits of the hardware address, if present
    pub fn address_tail(&self) -> Option<String> {
        if self.uas_id.is_empty() {
            return None;
        }
        address_suffix(&self.uas_id, 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(lat: f64, lon: f64) -> Detection {
        Detection {
            uas_lat: lat,
            uas_lon: lon,
            ..Default::default()
        }
    }

    #[test]
    fn test_latitude_boundaries() {
        assert!(at(90.0, 10.0).is_valid_location());
        assert!(at(-90.0, 10.0).is_valid_location());
        assert!(!at(90.0001, 10.0).is_valid_location());
        assert!(!at(-90.0001, 10.0).is_valid_location());
        assert!(!at(f64::NAN, 10.0).is_valid_location());
    }

    #[test]
    fn test_longitude_boundaries() {
        assert!(at(10.0, 180.0).is_valid_location());
        assert!(at(10.0, -180.0).is_valid_location());
        assert!(!at(10.0, 180.0001).is_valid_location());
        assert!(!at(10.0, -180.0001).is_valid_location());
        assert!(!at(10.0, f64::NAN).is_valid_location());
    }

    #[test]
    fn test_null_island_rejected() {
        assert!(!at(0.0, 0.0).is_valid_location());
        // Equator and prime meridian on their own are real places
        assert!(at(0.0, 32.5).is_valid_location());
        assert!(at(51.48, 0.0).is_valid_location());
    }

    #[test]
    fn test_unique_id_precedence() {
        let now = Timestamp::from_millis(1_700_000_000_123);
        let mut d = Detection {
            serial_number: "SN123".into(),
            uas_id: "AA:BB:CC:DD:EE:FF".into(),
            remote_id: "OP-1".into(),
            ..Default::default()
        };
        assert_eq!(d.unique_id_at(now), "SN123");

        d.serial_number.clear();
        assert_eq!(d.unique_id_at(now), "AABBCCDDEEFF");

        d.uas_id.clear();
        assert_eq!(d.unique_id_at(now), "OP-1");

        d.remote_id.clear();
        assert_eq!(d.unique_id_at(now), "UNKNOWN-1700000000123");
    }

    #[test]
    fn test_operator_location_requires_both() {
        let mut d = at(47.0, -122.0);
        assert!(!d.has_operator_location());
        d.op_lat = 47.1;
        assert!(!d.has_operator_location());
        d.op_lon = -122.1;
        assert!(d.has_operator_location());
    }

    #[test]
    fn test_address_tail() {
        let d = Detection {
            uas_id: "AA:BB:CC:DD:EE:FF".into(),
            ..Default::default()
        };
        assert_eq!(d.address_tail().as_deref(), Some("EEFF"));
        assert_eq!(Detection::default().address_tail(), None);
    }

    proptest! {
        #[test]
        fn prop_in_range_nonzero_is_valid(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0) {
            prop_assume!(!(lat == 0.0 && lon == 0.0));
            prop_assert!(at(lat, lon).is_valid_location());
        }

        #[test]
        fn prop_out_of_range_latitude_is_invalid(lat in 90.0001f64..1.0e6, lon in -180.0f64..=180.0) {
            prop_assert!(!at(lat, lon).is_valid_location());
            prop_assert!(!at(-lat, lon).is_valid_location());
        }
    }
}
