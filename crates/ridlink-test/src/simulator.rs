//! Simulated gyb_detect device
//!
//! Produces the message stream a real receiver writes after connect: one
//! device info record, then detections of a single aircraft flying a
//! straight line, with periodic battery reports.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Metres per degree of latitude
const METRES_PER_DEGREE: f64 = 111_320.0;

/// Straight-line flight of the simulated aircraft
#[derive(Clone, Debug)]
pub struct FlightPlan {
    pub start_lat: f64,
    pub start_lon: f64,
    pub altitude: f32,
    /// Degrees clockwise from true north
    pub heading: f32,
    /// Metres per second
    pub speed: f32,
    /// Time between detections
    pub interval: Duration,
}

impl Default for FlightPlan {
    fn default() -> Self {
        FlightPlan {
            start_lat: 47.6062,
            start_lon: -122.3321,
            altitude: 120.0,
            heading: 90.0,
            speed: 12.0,
            interval: Duration::from_secs(1),
        }
    }
}

/// Seeded message generator for one receiver and one aircraft
pub struct DeviceSimulator {
    rng: StdRng,
    plan: FlightPlan,
    mac: String,
    serial: Option<String>,
    step: u32,
    battery: f32,
    battery_every: u32,
}

impl DeviceSimulator {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let octets: Vec<String> = (0..6).map(|_| format!("{:02X}", rng.gen::<u8>())).collect();
        DeviceSimulator {
            rng,
            plan: FlightPlan::default(),
            mac: octets.join(":"),
            serial: None,
            step: 0,
            battery: 1.0,
            battery_every: 5,
        }
    }

    pub fn with_plan(mut self, plan: FlightPlan) -> Self {
        self.plan = plan;
        self
    }

    /// Broadcast a serial number alongside the hardware address
    pub fn with_serial(mut self, serial: &str) -> Self {
        self.serial = Some(serial.to_string());
        self
    }

    /// Emit a battery report after every `n` detections; 0 disables them
    pub fn with_battery_every(mut self, n: u32) -> Self {
        self.battery_every = n;
        self
    }

    /// Hardware address of the simulated aircraft
    pub fn mac(&self) -> &str {
        &self.mac
    }

    /// Identifier the track converter is expected to derive
    pub fn expected_unique_id(&self) -> String {
        match &self.serial {
            Some(serial) => serial.clone(),
            None => self.mac.replace(':', ""),
        }
    }

    pub fn device_info(&self) -> String {
        json!({
            "manufacturer": "GYB",
            "make": "gyb",
            "model": "gyb_detect",
            "version": "1.4.2",
            "serialNumber": "GYB0042",
            "capabilities": 0x33,
        })
        .to_string()
    }

    pub fn battery_status(&mut self) -> String {
        self.battery = (self.battery - 0.01).max(0.0);
        json!({
            "batteryLevel": self.battery,
            "batteryVersion": "B2",
            "batteryTemp": 30.0 + self.rng.gen_range(0.0..5.0f32),
        })
        .to_string()
    }

    /// Current aircraft position
    pub fn position(&self) -> (f64, f64) {
        let elapsed = self.plan.interval.as_secs_f64() * self.step as f64;
        let distance = self.plan.speed as f64 * elapsed;
        let heading = (self.plan.heading as f64).to_radians();

        let d_lat = distance * heading.cos() / METRES_PER_DEGREE;
        let d_lon = distance * heading.sin()
            / (METRES_PER_DEGREE * self.plan.start_lat.to_radians().cos());
        (self.plan.start_lat + d_lat, self.plan.start_lon + d_lon)
    }

    /// Next detection along the flight path
    pub fn detection(&mut self) -> String {
        let (lat, lon) = self.position();
        self.step += 1;

        let mut message = json!({
            "uasId": self.mac,
            "rssi": -40 - self.rng.gen_range(0..40),
            "recvMethod": 16,
            "uasType": 2,
            "opStatus": 2,
            // The receiver writes coordinates as strings
            "uasLat": format!("{:.6}", lat),
            "uasLon": format!("{:.6}", lon),
            "uasHeading": self.plan.heading,
            "uasHSpeed": self.plan.speed,
            "uasVSpeed": 0.0,
            "uasHae": format!("{:.1}", self.plan.altitude),
            "uasHag": self.plan.altitude - 20.0,
            "uasHorizontalError": 3.0,
            "uasVerticalError": 4.0,
            "opLat": self.plan.start_lat,
            "opLon": self.plan.start_lon,
            "opLocationType": 1,
        });
        if let Some(serial) = &self.serial {
            message["serialNumber"] = json!(serial);
        }
        message.to_string()
    }

    /// A detection with no position fix
    pub fn detection_without_fix(&mut self) -> String {
        json!({ "uasId": self.mac, "uasLat": 0, "uasLon": 0, "rssi": -90 }).to_string()
    }

    /// Device info followed by `detections` detections and battery reports
    pub fn session(&mut self, detections: usize) -> Vec<String> {
        let mut out = vec![self.device_info()];
        for i in 1..=detections {
            out.push(self.detection());
            if self.battery_every > 0 && i as u32 % self.battery_every == 0 {
                out.push(self.battery_status());
            }
        }
        out
    }
}

/// Write chunks to a device-side stream, pausing between writes
pub async fn play_chunks<W>(writer: &mut W, chunks: &[Vec<u8>], pause: Duration) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    for chunk in chunks {
        writer.write_all(chunk).await?;
        writer.flush().await?;
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
    Ok(())
}
