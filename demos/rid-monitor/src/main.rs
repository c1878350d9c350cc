//! rid-monitor - print Remote ID tracks from a networked receiver
//!
//! Usage:
//! - `rid-monitor [config.toml]` loads the given file, else `rid-monitor.toml`
//!   if present, else defaults
//! - `--address host:port` overrides the device address
//!
//! With reconnect disabled the monitor exits when the session ends.

mod config;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{error, info, warn};

use ridlink_core::{BatteryStatus, DeviceInfo, RidResult};
use ridlink_runtime::{
    init_logging, ConnectionListener, DataListener, ReconnectPolicy, SessionManager,
};
use ridlink_track::TrackEvent;
use ridlink_transport::TcpTransport;

use config::{MonitorConfig, OutputFormat};

const DEFAULT_CONFIG: &str = "rid-monitor.toml";

/// Ends the monitor once the link is gone for good
struct SessionWatch {
    done: Arc<Notify>,
    reconnects: bool,
}

impl ConnectionListener for SessionWatch {
    fn on_connected(&self, device: &str) {
        info!("Receiving from {}", device);
    }

    fn on_disconnected(&self) {
        if !self.reconnects {
            self.done.notify_one();
        }
    }

    fn on_error(&self, message: &str) {
        error!("{}", message);
        if !self.reconnects {
            self.done.notify_one();
        }
    }
}

struct DeviceLog;

impl DataListener for DeviceLog {
    fn on_device_info(&self, info: &DeviceInfo) {
        info!("Device {} by {}, capabilities: {}", info, info.manufacturer, info.capabilities);
    }

    fn on_battery_status(&self, status: &BatteryStatus) {
        info!("Battery {}% ({:.1} C)", status.percentage(), status.temperature);
    }
}

fn print_track(format: OutputFormat, event: &TrackEvent) {
    match format {
        OutputFormat::Summary => println!(
            "{} {:.6},{:.6} hae={:.1} {}",
            event.uid,
            event.point.lat,
            event.point.lon,
            event.point.hae,
            event.callsign().unwrap_or("-")
        ),
        OutputFormat::Xml => match event.to_xml() {
            Ok(xml) => println!("{}", xml),
            Err(e) => warn!("Failed to render track {}: {}", event.uid, e),
        },
    }
}

fn load_config(args: &[String]) -> RidResult<MonitorConfig> {
    let mut config = match args.get(1) {
        Some(path) if !path.starts_with("--") => MonitorConfig::from_file(path)?,
        _ if Path::new(DEFAULT_CONFIG).exists() => MonitorConfig::from_file(DEFAULT_CONFIG)?,
        _ => MonitorConfig::default(),
    };

    if let Some(address) = args
        .iter()
        .position(|a| a == "--address")
        .and_then(|i| args.get(i + 1))
    {
        config.device.address = address.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> RidResult<()> {
    let args: Vec<String> = std::env::args().collect();
    let config = load_config(&args)?;
    init_logging(&config.logging)?;

    let endpoint = config.device.endpoint();
    let transport = Arc::new(TcpTransport::with_endpoints(vec![endpoint.clone()]));
    let manager = SessionManager::with_config(transport, config.manager.clone());

    let done = Arc::new(Notify::new());
    manager.add_connection_listener(Arc::new(SessionWatch {
        done: done.clone(),
        reconnects: config.manager.reconnect != ReconnectPolicy::Never,
    }));
    manager.add_data_listener(Arc::new(DeviceLog));

    let format = config.output.format;
    manager.add_track_sink(Arc::new(move |event: TrackEvent| print_track(format, &event)));

    info!("Connecting to {} at {}", endpoint.display_name(), endpoint.address);
    manager.connect(endpoint)?;

    done.notified().await;
    manager.shutdown().await;
    Ok(())
}
