//! Device registry.
//!
//! The lab topology is fixed: one router per vendor, all reachable on the
//! management network with the same credentials.

use std::fmt;
use std::str::FromStr;

use crate::config::RunConfig;
use crate::error::ConnectError;

pub const DEFAULT_SSH_PORT: u16 = 22;

/// Platforms this tool knows how to dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    CiscoIos,
    AristaEos,
    JuniperJunos,
}

impl DeviceType {
    pub const ALL: [DeviceType; 3] = [
        DeviceType::CiscoIos,
        DeviceType::AristaEos,
        DeviceType::JuniperJunos,
    ];

    /// Identifier used in device descriptors.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::CiscoIos => "cisco_ios",
            DeviceType::AristaEos => "arista_eos",
            DeviceType::JuniperJunos => "juniper_junos",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = ConnectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ConnectError::UnsupportedDeviceType(s.to_string()))
    }
}

/// Connection details for one device.
///
/// `device_type` stays a plain string so descriptors for platforms without a
/// config command can still be represented and reported.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub device_type: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub secret: Option<String>,
}

impl DeviceDescriptor {
    /// Descriptor on the default SSH port using the run's credentials.
    pub fn new(device_type: impl Into<String>, host: impl Into<String>, config: &RunConfig) -> Self {
        Self {
            device_type: device_type.into(),
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            username: config.username.clone(),
            password: config.password.clone(),
            secret: config.secret.clone(),
        }
    }
}

impl fmt::Debug for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceDescriptor")
            .field("device_type", &self.device_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Lab routers: (device type, management address).
pub const LAB_DEVICES: &[(&str, &str)] = &[
    // R1, IOS-XE
    ("cisco_ios", "10.222.1.11"),
    // R2, EOS
    ("arista_eos", "10.222.1.31"),
    // R3, Junos
    ("juniper_junos", "10.222.1.51"),
];

/// Builds the lab registry in a fixed order.
pub fn lab_registry(config: &RunConfig) -> Vec<DeviceDescriptor> {
    LAB_DEVICES
        .iter()
        .map(|(device_type, host)| DeviceDescriptor::new(*device_type, *host, config))
        .collect()
}
