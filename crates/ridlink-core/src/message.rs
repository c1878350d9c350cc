//! Decoded application messages
//!
//! The detection device sends three message shapes over the stream. Each
//! complete JSON object decodes into exactly one [`Message`].

use std::fmt;

use crate::Detection;

/// Receiver capability bitmask reported in the device info message
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(pub u32);

impl Capabilities {
    pub const WIFI_BEACON_2G4: u32 = 0x01;
    pub const WIFI_NAN_2G4: u32 = 0x02;
    pub const WIFI_BEACON_5G: u32 = 0x04;
    pub const WIFI_NAN_5G: u32 = 0x08;
    pub const BLUETOOTH_4: u32 = 0x10;
    pub const BLUETOOTH_5: u32 = 0x20;

    const NAMES: [(u32, &'static str); 6] = [
        (Self::WIFI_BEACON_2G4, "WiFi Beacon 2.4GHz"),
        (Self::WIFI_NAN_2G4, "WiFi NaN 2.4GHz"),
        (Self::WIFI_BEACON_5G, "WiFi Beacon 5GHz"),
        (Self::WIFI_NAN_5G, "WiFi NaN 5GHz"),
        (Self::BLUETOOTH_4, "Bluetooth 4"),
        (Self::BLUETOOTH_5, "Bluetooth 5"),
    ];

    #[inline]
    pub fn new(bits: u32) -> Self {
        Capabilities(bits)
    }

    #[inline]
    pub fn contains(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    /// Names of the advertised receive paths, in bit order
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capabilities({:#04x})", self.0)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(", "))
    }
}

/// Identity of the detection device itself
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceInfo {
    pub manufacturer: String,
    pub make: String,
    pub model: String,
    pub version: String,
    pub serial_number: String,
    pub capabilities: Capabilities,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{} (SN: {})", self.model, self.version, self.serial_number)
    }
}

/// Battery report from the detection device
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatteryStatus {
    /// Charge fraction, 0.0 - 1.0
    pub level: f32,
    pub version: String,
    /// Celsius
    pub temperature: f32,
}

impl BatteryStatus {
    pub fn percentage(&self) -> i32 {
        (self.level * 100.0).round() as i32
    }
}

/// One decoded message from the stream
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    DeviceInfo(DeviceInfo),
    BatteryStatus(BatteryStatus),
    Detection(Box<Detection>),
}

impl Message {
    pub fn kind(&self) -> &'static str {
        match self {
            Message::DeviceInfo(_) => "device-info",
            Message::BatteryStatus(_) => "battery-status",
            Message::Detection(_) => "detection",
        }
    }
}
