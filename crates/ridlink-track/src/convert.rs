//! Detection to track event conversion
//!
//! Conversion is total over valid detections: every identifier and callsign
//! rule ends in a time-derived fallback. Attributes in the vendor block are
//! sparse, so empty or zero values are omitted rather than sent blank.

use tracing::error;

use ridlink_core::{
    Detection, OperatorLocationType, RidError, RidResult, Timestamp, TrackId, TRACK_PREFIX,
};

use crate::event::{
    DetailBlock, TrackEvent, TrackPoint, DETECTION_STALE_AFTER, HOW_SENSOR, TYPE_DRONE_UNKNOWN,
};

/// Name of the device that produced the detections
pub const DETECTOR_NAME: &str = "gyb_detect";

/// Convert a detection using the system clock
pub fn convert(detection: &Detection) -> Option<TrackEvent> {
    convert_at(detection, Timestamp::now())
}

/// Convert a detection generated at `now`.
///
/// Returns `None` for an invalid location or any conversion failure; a
/// partially populated event is never produced.
pub fn convert_at(detection: &Detection, now: Timestamp) -> Option<TrackEvent> {
    match build_event(detection, now) {
        Ok(event) => Some(event),
        Err(RidError::InvalidLocation) => None,
        Err(e) => {
            error!("Failed to convert detection to track event: {}", e);
            None
        }
    }
}

fn build_event(d: &Detection, now: Timestamp) -> RidResult<TrackEvent> {
    if !d.is_valid_location() {
        return Err(RidError::InvalidLocation);
    }

    let mut point = TrackPoint::new(d.uas_lat, d.uas_lon, d.uas_hae as f64);
    if !point.hae.is_finite() {
        return Err(RidError::Conversion(format!(
            "non-finite altitude {}",
            d.uas_hae
        )));
    }
    if d.uas_horizontal_error > 0.0 {
        point.ce = d.uas_horizontal_error as f64;
    }
    if d.uas_vertical_error > 0.0 {
        point.le = d.uas_vertical_error as f64;
    }

    let details = vec![
        DetailBlock::new("contact").with("callsign", callsign_at(d, now)),
        DetailBlock::new("track")
            .with("course", float_text(d.uas_heading))
            .with("speed", float_text(d.uas_h_speed)),
        remote_id_block(d),
        DetailBlock::new("precisionlocation")
            .with("altsrc", "GPS")
            .with("geopointsrc", "GPS"),
        DetailBlock::new("remarks").with_text(remarks(d)),
    ];

    Ok(TrackEvent {
        uid: track_id_at(d, now),
        event_type: TYPE_DRONE_UNKNOWN.to_string(),
        how: HOW_SENSOR.to_string(),
        time: now,
        start: now,
        stale: now + DETECTION_STALE_AFTER,
        point,
        details,
    })
}

/// Track id: `DRONE-` + serial, stripped address, operator id, or a time fallback
pub fn track_id_at(d: &Detection, now: Timestamp) -> TrackId {
    TrackId::from_unique(&d.unique_id_at(now))
}

/// Callsign: first 8 of the serial, last 4 of the address, or millis mod 10000
pub fn callsign_at(d: &Detection, now: Timestamp) -> String {
    if !d.serial_number.is_empty() {
        let short: String = d.serial_number.chars().take(8).collect();
        return format!("{}{}", TRACK_PREFIX, short);
    }
    if let Some(tail) = d.address_tail() {
        return format!("{}{}", TRACK_PREFIX, tail);
    }
    format!("{}{}", TRACK_PREFIX, now.as_millis().rem_euclid(10_000))
}

/// Whole values keep one decimal place, so 271 renders as "271.0"
fn float_text(v: f32) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

fn remote_id_block(d: &Detection) -> DetailBlock {
    let mut block = DetailBlock::new("__remoteid");

    block.set_non_empty("serialNumber", &d.serial_number);
    block.set_non_empty("operatorId", &d.remote_id);
    block.set_non_empty("opId", &d.op_id);
    block.set_non_empty("description", &d.description);
    block.set_non_empty("caaRegId", &d.caa_reg_id);

    // Reception and classification are always present
    block.set("rssi", d.rssi.to_string());
    block.set("recvMethod", d.recv_method_label());
    block.set("uasType", d.uas_type.to_string());

    block.set("heightAGL", format!("{:.1}", d.uas_hag));
    block.set("heightTakeoff", format!("{:.1}", d.uas_hat));
    block.set("vSpeed", format!("{:.1}", d.uas_v_speed));
    block.set("hSpeed", format!("{:.1}", d.uas_h_speed));

    if d.uas_horizontal_error > 0.0 {
        block.set("hAccuracy", format!("{:.1}", d.uas_horizontal_error));
    }
    if d.uas_vertical_error > 0.0 {
        block.set("vAccuracy", format!("{:.1}", d.uas_vertical_error));
    }

    if d.has_operator_location() {
        block.set("opLat", d.op_lat.to_string());
        block.set("opLon", d.op_lon.to_string());
        block.set("opAlt", format!("{:.1}", d.op_hae));
        block.set(
            "opLocType",
            OperatorLocationType::describe(d.op_location_type),
        );
    }

    if d.session_id > 0 {
        block.set("sessionId", d.session_id.to_string());
    }
    block.set_non_empty("utmId", &d.utm_id);

    block.set("detectedBy", DETECTOR_NAME);
    block.set("timestamp", d.timestamp.as_millis().to_string());
    block
}

/// Human-readable summary, one item per line
pub fn remarks(d: &Detection) -> String {
    let mut lines = vec!["Remote ID Drone Detection".to_string()];

    if !d.description.is_empty() {
        lines.push(format!("Desc: {}", d.description));
    }
    if !d.serial_number.is_empty() {
        lines.push(format!("S/N: {}", d.serial_number));
    }

    lines.push(format!("Alt: {:.0}m MSL, {:.0}m AGL", d.uas_hae, d.uas_hag));

    let mut speed = format!("Speed: {:.1}m/s", d.uas_h_speed);
    if d.uas_v_speed != 0.0 {
        speed.push_str(&format!(" (V: {:.1}m/s)", d.uas_v_speed));
    }
    lines.push(speed);

    lines.push(format!("Heading: {:.0}°", d.uas_heading));
    lines.push(format!(
        "Detection: {} (RSSI: {}dBm)",
        d.recv_method_label(),
        d.rssi
    ));

    if d.has_operator_location() {
        lines.push(format!("Operator: {:.6}, {:.6}", d.op_lat, d.op_lon));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::UNKNOWN_ERROR;
    use proptest::prelude::*;
    use ridlink_core::Message;

    const NOW: Timestamp = Timestamp(1_700_000_012_345);

    fn from_json(text: &str) -> Detection {
        match ridlink_wire::decode_at(text, Timestamp::from_millis(1_700_000_000_000)).unwrap() {
            Message::Detection(d) => *d,
            other => panic!("expected detection, got {:?}", other),
        }
    }

    fn full() -> Detection {
        from_json(
            r#"{"uasId":"60:60:1F:AA:BB:CC","remoteId":"FIN87astrdge12k8","serialNumber":"1581F5FHD23456",
                "caaRegId":"FIN-REG-1","description":"Survey flight","opId":"OP-1",
                "rssi":-67,"recvMethod":16,"uasType":2,"sessionId":7,"utmId":"u-1","opStatus":2,
                "uasLat":"60.1699","uasLon":"24.9384","uasHeading":"271.4","uasHSpeed":"12.3",
                "uasVSpeed":"-1.5","uasHae":"152.0","uasHag":"98.4","uasHat":"101.0",
                "uasHorizontalError":"3.0","uasVerticalError":"4.5",
                "opLat":"60.1650","opLon":"24.9300","opHae":"18.0","opLocationType":1}"#,
        )
    }

    #[test]
    fn test_mac_scenario() {
        let d = from_json(
            r#"{"uasId":"AA:BB:CC:DD:EE:FF","uasLat":"47.6062","uasLon":"-122.3321","uasHae":"120.5"}"#,
        );
        let event = convert_at(&d, NOW).unwrap();
        assert!(event.uid.as_str().ends_with("EEFF"));
        assert_eq!(event.uid.as_str(), "DRONE-AABBCCDDEEFF");
        assert_eq!(event.callsign(), Some("DRONE-EEFF"));
        assert_eq!(event.point.lat, 47.6062);
        assert_eq!(event.point.lon, -122.3321);
        assert_eq!(event.point.hae, 120.5);
    }

    #[test]
    fn test_identity_and_timing() {
        let event = convert_at(&full(), NOW).unwrap();
        assert_eq!(event.uid.as_str(), "DRONE-1581F5FHD23456");
        assert_eq!(event.event_type, TYPE_DRONE_UNKNOWN);
        assert_eq!(event.how, "h-s");
        assert_eq!(event.time, NOW);
        assert_eq!(event.start, NOW);
        assert_eq!(event.stale.as_millis() - NOW.as_millis(), 30_000);
        assert!(!event.is_stale_at(NOW));
        assert!(event.is_stale_at(event.stale));
        assert_eq!(event.callsign(), Some("DRONE-1581F5FH"));
    }

    #[test]
    fn test_deterministic_for_same_input() {
        let d = full();
        let a = convert_at(&d, NOW).unwrap();
        let b = convert_at(&d, Timestamp::from_millis(NOW.as_millis() + 5_000)).unwrap();
        assert_eq!(a.uid, b.uid);
        assert_eq!(a.callsign(), b.callsign());
    }

    #[test]
    fn test_invalid_location_yields_none() {
        let d = from_json(r#"{"uasId":"AA:BB","uasLat":0,"uasLon":0}"#);
        assert!(convert_at(&d, NOW).is_none());
    }

    #[test]
    fn test_non_finite_altitude_yields_none() {
        let d = from_json(r#"{"uasId":"AA:BB","uasLat":"10","uasLon":"10","uasHae":"NaN"}"#);
        assert!(convert_at(&d, NOW).is_none());
    }

    #[test]
    fn test_point_errors() {
        let event = convert_at(&full(), NOW).unwrap();
        assert_eq!(event.point.ce, 3.0);
        assert_eq!(event.point.le, 4.5);

        let sparse = from_json(r#"{"uasId":"AA:BB:CC:DD","uasLat":"1","uasLon":"2"}"#);
        let event = convert_at(&sparse, NOW).unwrap();
        assert_eq!(event.point.ce, UNKNOWN_ERROR);
        assert_eq!(event.point.le, UNKNOWN_ERROR);
    }

    #[test]
    fn test_detail_block_order() {
        let event = convert_at(&full(), NOW).unwrap();
        let names: Vec<&str> = event.details.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["contact", "track", "__remoteid", "precisionlocation", "remarks"]
        );
        let track = event.detail("track").unwrap();
        assert_eq!(track.get("course"), Some("271.4"));
        assert_eq!(track.get("speed"), Some("12.3"));
    }

    #[test]
    fn test_whole_course_and_speed_keep_decimal() {
        let d = from_json(
            r#"{"uasId":"AA:BB:CC:DD:EE:FF","uasLat":"47.6","uasLon":"-122.3","uasHeading":"271","uasHSpeed":"0"}"#,
        );
        let event = convert_at(&d, NOW).unwrap();
        let track = event.detail("track").unwrap();
        assert_eq!(track.get("course"), Some("271.0"));
        assert_eq!(track.get("speed"), Some("0.0"));

        let xml = event.to_xml().unwrap();
        assert!(xml.contains(r#"course="271.0""#));
        assert!(xml.contains(r#"speed="0.0""#));
    }

    #[test]
    fn test_full_remote_id_block() {
        let event = convert_at(&full(), NOW).unwrap();
        let rid = event.detail("__remoteid").unwrap();
        assert_eq!(rid.get("serialNumber"), Some("1581F5FHD23456"));
        assert_eq!(rid.get("operatorId"), Some("FIN87astrdge12k8"));
        assert_eq!(rid.get("opId"), Some("OP-1"));
        assert_eq!(rid.get("description"), Some("Survey flight"));
        assert_eq!(rid.get("caaRegId"), Some("FIN-REG-1"));
        assert_eq!(rid.get("rssi"), Some("-67"));
        assert_eq!(rid.get("recvMethod"), Some("Bluetooth"));
        assert_eq!(rid.get("uasType"), Some("2"));
        assert_eq!(rid.get("heightAGL"), Some("98.4"));
        assert_eq!(rid.get("heightTakeoff"), Some("101.0"));
        assert_eq!(rid.get("vSpeed"), Some("-1.5"));
        assert_eq!(rid.get("hAccuracy"), Some("3.0"));
        assert_eq!(rid.get("vAccuracy"), Some("4.5"));
        assert_eq!(rid.get("opLat"), Some("60.165"));
        assert_eq!(rid.get("opAlt"), Some("18.0"));
        assert_eq!(rid.get("opLocType"), Some("live"));
        assert_eq!(rid.get("sessionId"), Some("7"));
        assert_eq!(rid.get("utmId"), Some("u-1"));
        assert_eq!(rid.get("detectedBy"), Some("gyb_detect"));
        assert_eq!(rid.get("timestamp"), Some("1700000000000"));
    }

    #[test]
    fn test_sparse_remote_id_block() {
        let d = from_json(r#"{"uasId":"AA:BB:CC:DD:EE:FF","uasLat":"47.6","uasLon":"-122.3"}"#);
        let event = convert_at(&d, NOW).unwrap();
        let rid = event.detail("__remoteid").unwrap();
        for absent in [
            "serialNumber",
            "operatorId",
            "opId",
            "description",
            "caaRegId",
            "hAccuracy",
            "vAccuracy",
            "opLat",
            "opLon",
            "opAlt",
            "opLocType",
            "sessionId",
            "utmId",
        ] {
            assert!(!rid.contains(absent), "{} should be omitted", absent);
        }
        assert_eq!(rid.get("rssi"), Some("0"));
        assert_eq!(rid.get("recvMethod"), Some("Unknown (0)"));
        assert_eq!(rid.get("uasType"), Some("0"));
    }

    #[test]
    fn test_callsign_fallbacks() {
        let short_mac = Detection {
            uas_id: "A:B".into(),
            uas_lat: 1.0,
            uas_lon: 1.0,
            ..Default::default()
        };
        assert_eq!(callsign_at(&short_mac, NOW), "DRONE-2345");

        let operator_only = Detection {
            uas_id: String::new(),
            remote_id: "OP-9".into(),
            ..short_mac
        };
        assert_eq!(callsign_at(&operator_only, NOW), "DRONE-2345");
        assert_eq!(track_id_at(&operator_only, NOW).as_str(), "DRONE-OP-9");

        let nothing = Detection::default();
        assert_eq!(
            track_id_at(&nothing, NOW).as_str(),
            "DRONE-UNKNOWN-1700000012345"
        );
    }

    #[test]
    fn test_remarks_full() {
        let text = remarks(&full());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Remote ID Drone Detection",
                "Desc: Survey flight",
                "S/N: 1581F5FHD23456",
                "Alt: 152m MSL, 98m AGL",
                "Speed: 12.3m/s (V: -1.5m/s)",
                "Heading: 271°",
                "Detection: Bluetooth (RSSI: -67dBm)",
                "Operator: 60.165000, 24.930000",
            ]
        );
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_remarks_sparse() {
        let d = Detection {
            uas_lat: 1.0,
            uas_lon: 1.0,
            uas_h_speed: 4.0,
            recv_method: 1,
            rssi: -80,
            ..Default::default()
        };
        let text = remarks(&d);
        assert_eq!(
            text,
            "Remote ID Drone Detection\n\
             Alt: 0m MSL, 0m AGL\n\
             Speed: 4.0m/s\n\
             Heading: 0°\n\
             Detection: WiFi Beacon (RSSI: -80dBm)\n"
        );
    }

    proptest! {
        #[test]
        fn prop_valid_location_always_converts(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0) {
            prop_assume!(!(lat == 0.0 && lon == 0.0));
            let d = Detection { uas_lat: lat, uas_lon: lon, ..Default::default() };
            let event = convert_at(&d, NOW).unwrap();
            prop_assert_eq!(event.point.lat, lat);
            prop_assert_eq!(event.point.lon, lon);
            prop_assert_eq!(event.details.len(), 5);
        }
    }
}
