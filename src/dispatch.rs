//! Configuration dump command per platform.

use crate::error::ConnectError;
use crate::inventory::DeviceType;

pub const IOS_CONFIG_COMMAND: &str = "show running-config";
pub const EOS_CONFIG_COMMAND: &str = "show running-config";
/// Junos prints the configuration as `set` statements with this pipe.
pub const JUNOS_CONFIG_COMMAND: &str = "show configuration | display set";

pub fn config_command_for(device_type: DeviceType) -> &'static str {
    match device_type {
        DeviceType::CiscoIos => IOS_CONFIG_COMMAND,
        DeviceType::AristaEos => EOS_CONFIG_COMMAND,
        DeviceType::JuniperJunos => JUNOS_CONFIG_COMMAND,
    }
}

/// Looks up the command for a raw device-type identifier.
pub fn config_command(device_type: &str) -> Result<&'static str, ConnectError> {
    device_type.parse().map(config_command_for)
}
