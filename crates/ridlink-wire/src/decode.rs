//! Message classification and decoding
//!
//! One complete JSON object maps to one [`Message`]. The first discriminator
//! key found decides the shape:
//!
//! | Key | Message |
//! |---|---|
//! | `manufacturer` | DeviceInfo |
//! | `batteryLevel` | BatteryStatus |
//! | `remoteId` or `uasId` | Detection |
//!
//! Field-level problems never fail a message; only unparseable JSON or an
//! unrecognised shape does.

use serde_json::Value;
use tracing::{debug, warn};

use ridlink_core::{
    BatteryStatus, Capabilities, Detection, DeviceInfo, Message, RidError, RidResult, Timestamp,
};

use crate::fields::{f32_field, f64_field, int_field, string_field, Object};

/// Discriminator for device info messages
pub const KEY_MANUFACTURER: &str = "manufacturer";
/// Discriminator for battery messages
pub const KEY_BATTERY_LEVEL: &str = "batteryLevel";
/// Discriminators for detection messages
pub const KEY_REMOTE_ID: &str = "remoteId";
pub const KEY_UAS_ID: &str = "uasId";

/// Decode a message, stamping detections with the current time
pub fn decode(text: &str) -> RidResult<Message> {
    decode_at(text, Timestamp::now())
}

/// Decode a message, stamping detections with `received_at`
pub fn decode_at(text: &str, received_at: Timestamp) -> RidResult<Message> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| RidError::InvalidJson(e.to_string()))?;
    let Value::Object(obj) = value else {
        return Err(RidError::UnknownMessage);
    };

    if obj.contains_key(KEY_MANUFACTURER) {
        return Ok(Message::DeviceInfo(decode_device_info(&obj)));
    }
    if obj.contains_key(KEY_BATTERY_LEVEL) {
        return Ok(Message::BatteryStatus(decode_battery_status(&obj)));
    }
    if obj.contains_key(KEY_REMOTE_ID) || obj.contains_key(KEY_UAS_ID) {
        let mut detection = decode_detection(&obj);
        detection.timestamp = received_at;
        return Ok(Message::Detection(Box::new(detection)));
    }
    Err(RidError::UnknownMessage)
}

/// Decode and log-and-drop anything that is not a recognised message
pub fn classify(text: &str) -> Option<Message> {
    match decode(text) {
        Ok(message) => {
            debug!(kind = message.kind(), "decoded message");
            Some(message)
        }
        Err(RidError::UnknownMessage) => {
            warn!("Unknown JSON message type: {}", preview(text));
            None
        }
        Err(e) => {
            warn!("Failed to parse JSON: {} ({})", preview(text), e);
            None
        }
    }
}

pub fn decode_device_info(obj: &Object) -> DeviceInfo {
    DeviceInfo {
        manufacturer: string_field(obj, "manufacturer"),
        make: string_field(obj, "make"),
        model: string_field(obj, "model"),
        version: string_field(obj, "version"),
        serial_number: string_field(obj, "serialNumber"),
        capabilities: Capabilities::new(int_field(obj, "capabilities").max(0) as u32),
    }
}

pub fn decode_battery_status(obj: &Object) -> BatteryStatus {
    BatteryStatus {
        level: f32_field(obj, "batteryLevel"),
        version: string_field(obj, "batteryVersion"),
        temperature: f32_field(obj, "batteryTemp"),
    }
}

/// Populate every detection field; the capture timestamp is left at zero
pub fn decode_detection(obj: &Object) -> Detection {
    Detection {
        uas_id: string_field(obj, "uasId"),
        remote_id: string_field(obj, "remoteId"),
        serial_number: string_field(obj, "serialNumber"),
        caa_reg_id: string_field(obj, "caaRegId"),
        description: string_field(obj, "description"),
        op_id: string_field(obj, "opId"),
        utm_id: string_field(obj, "utmId"),
        session_id: int_field(obj, "sessionId"),

        rssi: int_field(obj, "rssi"),
        recv_method: int_field(obj, "recvMethod"),
        timestamp: Timestamp::ZERO,

        uas_type: int_field(obj, "uasType"),
        op_status: int_field(obj, "opStatus"),

        uas_lat: f64_field(obj, "uasLat"),
        uas_lon: f64_field(obj, "uasLon"),
        uas_heading: f32_field(obj, "uasHeading"),
        uas_h_speed: f32_field(obj, "uasHSpeed"),
        uas_h_speed_error: f32_field(obj, "uasHSpeedError"),
        uas_v_speed: f32_field(obj, "uasVSpeed"),
        uas_v_speed_error: f32_field(obj, "uasVSpeedError"),
        uas_hae: f32_field(obj, "uasHae"),
        uas_hag: f32_field(obj, "uasHag"),
        uas_hat: f32_field(obj, "uasHat"),
        uas_horizontal_error: f32_field(obj, "uasHorizontalError"),
        uas_vertical_error: f32_field(obj, "uasVerticalError"),
        uas_baro_pressure: f32_field(obj, "uasBaroPressure"),
        uas_baro_pressure_acc: f32_field(obj, "uasBaroPressureAcc"),

        op_lat: f64_field(obj, "opLat"),
        op_lon: f64_field(obj, "opLon"),
        op_hae: f32_field(obj, "opHae"),
        op_location_type: int_field(obj, "opLocationType"),
    }
}

/// First 100 characters of a message for log lines
pub fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(100).collect();
    if text.chars().nth(100).is_some() {
        out.push_str("...");
    }
    out
}
