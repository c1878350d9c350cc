//! Cursor on Target XML rendering

use std::io::Cursor;

use chrono::{SecondsFormat, TimeZone, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use ridlink_core::{RidError, RidResult, Timestamp};

use crate::event::{DetailBlock, TrackEvent};

const COT_VERSION: &str = "2.0";

/// ISO-8601 UTC with millisecond precision, e.g. `2023-11-14T22:13:20.000Z`
pub fn iso_time(ts: Timestamp) -> RidResult<String> {
    Utc.timestamp_millis_opt(ts.as_millis())
        .single()
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| RidError::Conversion(format!("timestamp out of range: {}", ts)))
}

fn xml_err(e: quick_xml::Error) -> RidError {
    RidError::Conversion(e.to_string())
}

impl TrackEvent {
    /// Render as a single CoT `<event>` document
    pub fn to_xml(&self) -> RidResult<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(xml_err)?;

        let time = iso_time(self.time)?;
        let start = iso_time(self.start)?;
        let stale = iso_time(self.stale)?;

        let mut event = BytesStart::new("event");
        event.push_attribute(("version", COT_VERSION));
        event.push_attribute(("uid", self.uid.as_str()));
        event.push_attribute(("type", self.event_type.as_str()));
        event.push_attribute(("how", self.how.as_str()));
        event.push_attribute(("time", time.as_str()));
        event.push_attribute(("start", start.as_str()));
        event.push_attribute(("stale", stale.as_str()));
        writer.write_event(Event::Start(event)).map_err(xml_err)?;

        let p = &self.point;
        let (lat, lon, hae) = (p.lat.to_string(), p.lon.to_string(), p.hae.to_string());
        let (ce, le) = (p.ce.to_string(), p.le.to_string());
        let mut point = BytesStart::new("point");
        point.push_attribute(("lat", lat.as_str()));
        point.push_attribute(("lon", lon.as_str()));
        point.push_attribute(("hae", hae.as_str()));
        point.push_attribute(("ce", ce.as_str()));
        point.push_attribute(("le", le.as_str()));
        writer.write_event(Event::Empty(point)).map_err(xml_err)?;

        writer
            .write_event(Event::Start(BytesStart::new("detail")))
            .map_err(xml_err)?;
        for block in &self.details {
            write_block(&mut writer, block)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("detail")))
            .map_err(xml_err)?;

        writer
            .write_event(Event::End(BytesEnd::new("event")))
            .map_err(xml_err)?;

        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| RidError::Conversion(e.to_string()))
    }
}

fn write_block(writer: &mut Writer<Cursor<Vec<u8>>>, block: &DetailBlock) -> RidResult<()> {
    let mut elem = BytesStart::new(block.name.as_str());
    for (key, value) in &block.attributes {
        elem.push_attribute((key.as_str(), value.as_str()));
    }

    match &block.text {
        None => writer.write_event(Event::Empty(elem)).map_err(xml_err),
        Some(text) => {
            writer.write_event(Event::Start(elem)).map_err(xml_err)?;
            writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(xml_err)?;
            writer
                .write_event(Event::End(BytesEnd::new(block.name.as_str())))
                .map_err(xml_err)
        }
    }
}
