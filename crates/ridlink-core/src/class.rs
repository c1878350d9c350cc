//! Remote ID code tables
//!
//! The device reports several fields as small integer codes:
//! - Receive method: how the broadcast was heard (WiFi beacon, NaN, Bluetooth)
//! - UA type: airframe category from the Remote ID message set
//! - Operational status: ground / airborne / emergency
//! - Operator location type: where the operator position came from
//!
//! Detections keep the raw codes so unknown values survive decoding; these
//! enums only interpret them.

use std::fmt;

/// How the detection device received the broadcast
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReceiveMethod {
    WifiBeacon = 1,
    WifiNan = 2,
    Bluetooth = 16,
}

impl ReceiveMethod {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(ReceiveMethod::WifiBeacon),
            2 => Some(ReceiveMethod::WifiNan),
            16 => Some(ReceiveMethod::Bluetooth),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReceiveMethod::WifiBeacon => "WiFi Beacon",
            ReceiveMethod::WifiNan => "WiFi NaN",
            ReceiveMethod::Bluetooth => "Bluetooth",
        }
    }

    /// Human-readable label for any raw code
    pub fn describe(code: i32) -> String {
        match Self::from_code(code) {
            Some(method) => method.label().to_string(),
            None => format!("Unknown ({})", code),
        }
    }
}

/// Unmanned aircraft type (Remote ID basic ID message)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum UasType {
    #[default]
    Undeclared = 0,
    Aeroplane = 1,
    Multirotor = 2,
    Gyroplane = 3,
    HybridLift = 4,
    Ornithopter = 5,
    Glider = 6,
    Kite = 7,
    FreeBalloon = 8,
    CaptiveBalloon = 9,
    Airship = 10,
    Parachute = 11,
    Rocket = 12,
    TetheredPowered = 13,
    GroundObstacle = 14,
    Other = 15,
}

impl UasType {
    pub fn from_code(code: i32) -> Option<Self> {
        let ty = match code {
            0 => UasType::Undeclared,
            1 => UasType::Aeroplane,
            2 => UasType::Multirotor,
            3 => UasType::Gyroplane,
            4 => UasType::HybridLift,
            5 => UasType::Ornithopter,
            6 => UasType::Glider,
            7 => UasType::Kite,
            8 => UasType::FreeBalloon,
            9 => UasType::CaptiveBalloon,
            10 => UasType::Airship,
            11 => UasType::Parachute,
            12 => UasType::Rocket,
            13 => UasType::TetheredPowered,
            14 => UasType::GroundObstacle,
            15 => UasType::Other,
            _ => return None,
        };
        Some(ty)
    }

    pub fn label(self) -> &'static str {
        match self {
            UasType::Undeclared => "None/Undeclared",
            UasType::Aeroplane => "Aeroplane",
            UasType::Multirotor => "Helicopter/Multirotor",
            UasType::Gyroplane => "Gyroplane",
            UasType::HybridLift => "Hybrid Lift",
            UasType::Ornithopter => "Ornithopter",
            UasType::Glider => "Glider",
            UasType::Kite => "Kite",
            UasType::FreeBalloon => "Free Balloon",
            UasType::CaptiveBalloon => "Captive Balloon",
            UasType::Airship => "Airship",
            UasType::Parachute => "Free Fall/Parachute",
            UasType::Rocket => "Rocket",
            UasType::TetheredPowered => "Tethered Powered",
            UasType::GroundObstacle => "Ground Obstacle",
            UasType::Other => "Other",
        }
    }

    pub fn describe(code: i32) -> String {
        match Self::from_code(code) {
            Some(ty) => ty.label().to_string(),
            None => format!("Unknown ({})", code),
        }
    }
}

/// Operational status of the aircraft
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum OperationalStatus {
    #[default]
    Undeclared = 0,
    Ground = 1,
    Airborne = 2,
    Emergency = 3,
    RemoteIdFailure = 4,
}

impl OperationalStatus {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(OperationalStatus::Undeclared),
            1 => Some(OperationalStatus::Ground),
            2 => Some(OperationalStatus::Airborne),
            3 => Some(OperationalStatus::Emergency),
            4 => Some(OperationalStatus::RemoteIdFailure),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OperationalStatus::Undeclared => "Undeclared",
            OperationalStatus::Ground => "Ground",
            OperationalStatus::Airborne => "Airborne",
            OperationalStatus::Emergency => "Emergency",
            OperationalStatus::RemoteIdFailure => "Remote ID Failure",
        }
    }

    pub fn describe(code: i32) -> String {
        match Self::from_code(code) {
            Some(status) => status.label().to_string(),
            None => format!("Unknown ({})", code),
        }
    }
}

/// Source of the operator position
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum OperatorLocationType {
    #[default]
    Takeoff = 0,
    Live = 1,
    Fixed = 2,
}

impl OperatorLocationType {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(OperatorLocationType::Takeoff),
            1 => Some(OperatorLocationType::Live),
            2 => Some(OperatorLocationType::Fixed),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OperatorLocationType::Takeoff => "takeoff",
            OperatorLocationType::Live => "live",
            OperatorLocationType::Fixed => "fixed",
        }
    }

    /// Label for a raw code; anything out of range is "unknown"
    pub fn describe(code: i32) -> &'static str {
        Self::from_code(code).map(Self::label).unwrap_or("unknown")
    }
}

impl fmt::Display for ReceiveMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for UasType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for OperationalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_method_codes() {
        assert_eq!(ReceiveMethod::describe(1), "WiFi Beacon");
        assert_eq!(ReceiveMethod::describe(2), "WiFi NaN");
        assert_eq!(ReceiveMethod::describe(16), "Bluetooth");
        assert_eq!(ReceiveMethod::describe(7), "Unknown (7)");
    }

    #[test]
    fn test_uas_type_table_is_complete() {
        for code in 0..=15 {
            let ty = UasType::from_code(code).unwrap();
            assert_eq!(ty as i32, code);
        }
        assert_eq!(UasType::from_code(16), None);
        assert_eq!(UasType::describe(2), "Helicopter/Multirotor");
        assert_eq!(UasType::describe(-1), "Unknown (-1)");
    }

    #[test]
    fn test_operational_status() {
        assert_eq!(OperationalStatus::describe(3), "Emergency");
        assert_eq!(OperationalStatus::describe(9), "Unknown (9)");
    }

    #[test]
    fn test_operator_location_type() {
        assert_eq!(OperatorLocationType::describe(0), "takeoff");
        assert_eq!(OperatorLocationType::describe(1), "live");
        assert_eq!(OperatorLocationType::describe(2), "fixed");
        assert_eq!(OperatorLocationType::describe(3), "unknown");
    }
}
