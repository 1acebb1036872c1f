//! Sequential config dump driver.
//!
//! Devices are processed one at a time in registry order. Every step has its
//! own failure boundary: a device that cannot be reached, has no config
//! command, or fails the dump is logged and skipped, and the run carries on.

use std::io::Write;

use log::{error, info, warn};

use crate::dispatch;
use crate::inventory::DeviceDescriptor;
use crate::session::{Connector, DeviceSession};

/// Per-run counters, mostly useful to tests and the final log line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub attempted: usize,
    pub connected: usize,
    pub reported: usize,
    pub disconnected: usize,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.attempted - self.reported
    }
}

/// Opens a session to `device`, or logs why it could not.
pub async fn connect_to_device<C: Connector>(
    connector: &C,
    device: &DeviceDescriptor,
) -> Option<C::Session> {
    info!("Connecting to {} ({})...", device.host, device.device_type);
    match connector.connect(device).await {
        Ok(session) => {
            info!("Successfully connected to {}", device.host);
            Some(session)
        }
        Err(err) => {
            error!("Failed to connect to {}: {}", device.host, err);
            None
        }
    }
}

/// Runs the platform's config dump command on an open session.
pub async fn get_device_config<S: DeviceSession>(
    session: &mut S,
    device: &DeviceDescriptor,
) -> Option<String> {
    let command = match dispatch::config_command(&device.device_type) {
        Ok(command) => command,
        Err(_) => {
            error!(
                "Error: No config command defined for device type {}",
                device.device_type
            );
            return None;
        }
    };

    info!("Retrieving configuration using command: '{command}'");
    match session.send_command(command).await {
        Ok(config) => Some(config),
        Err(err) => {
            error!("Error retrieving config from {}: {}", device.host, err);
            None
        }
    }
}

/// Writes one device's configuration between begin and end banners.
pub fn write_config_report<W: Write>(out: &mut W, host: &str, config: &str) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "--- Configuration for {host} ---")?;
    writeln!(out, "{config}")?;
    writeln!(out, "--- End Configuration for {host} ---")?;
    writeln!(out)?;
    out.flush()
}

/// Dumps every device's configuration to `out`.
///
/// Exactly one connection attempt is made per device, and every session that
/// was opened is closed before the next device is touched.
pub async fn run<C, W>(connector: &C, devices: &[DeviceDescriptor], out: &mut W) -> RunSummary
where
    C: Connector,
    W: Write,
{
    let mut summary = RunSummary::default();

    for device in devices {
        summary.attempted += 1;
        let Some(mut session) = connect_to_device(connector, device).await else {
            continue;
        };
        summary.connected += 1;

        match get_device_config(&mut session, device).await {
            Some(config) if config.is_empty() => {
                warn!("Empty configuration returned by {}", device.host);
            }
            Some(config) => match write_config_report(out, &device.host, &config) {
                Ok(()) => summary.reported += 1,
                Err(err) => error!("Failed to write configuration for {}: {}", device.host, err),
            },
            None => {}
        }

        match session.disconnect().await {
            Ok(()) => info!("Disconnected from {}", device.host),
            Err(err) => warn!("Error while disconnecting from {}: {}", device.host, err),
        }
        summary.disconnected += 1;
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_wraps_config_in_host_banners() {
        let mut out = Vec::new();
        write_config_report(&mut out, "10.222.1.11", "hostname R1\n!\n").expect("write");

        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "\n--- Configuration for 10.222.1.11 ---\nhostname R1\n!\n\n--- End Configuration for 10.222.1.11 ---\n\n"
        );
    }

    #[test]
    fn failed_count_covers_everything_not_reported() {
        let summary = RunSummary {
            attempted: 3,
            connected: 2,
            reported: 1,
            disconnected: 2,
        };
        assert_eq!(summary.failed(), 2);
    }
}
