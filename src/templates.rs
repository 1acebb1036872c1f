//! Predefined device templates.
//!
//! Each platform gets a `DeviceHandler` with its prompts, paging marker,
//! error messages and mode transitions, plus the commands that prepare a
//! fresh shell for unpaged output.

use std::collections::HashMap;

use crate::device::DeviceHandler;
use crate::error::ConnectError;
use crate::inventory::DeviceType;

/// Dynamic parameter answered at enable password prompts.
pub const ENABLE_PASSWORD_PARAM: &str = "EnablePassword";

/// Everything a session needs to drive one platform's shell.
pub struct PlatformProfile {
    pub handler: DeviceHandler,
    /// Sent once after login, before any real command.
    pub prepare: &'static [&'static str],
    /// Mode the configuration dump runs in.
    pub exec_mode: &'static str,
}

/// Profile for a device-type identifier.
///
/// Unknown identifiers get the generic profile, so the session can still be
/// opened and closed cleanly.
pub fn for_device_type(device_type: &str) -> Result<PlatformProfile, ConnectError> {
    match device_type.parse::<DeviceType>() {
        Ok(DeviceType::CiscoIos) => Ok(PlatformProfile {
            handler: cisco_ios()?,
            prepare: &["terminal length 0", "terminal width 511"],
            exec_mode: "Enable",
        }),
        Ok(DeviceType::AristaEos) => Ok(PlatformProfile {
            handler: arista_eos()?,
            prepare: &["terminal length 0", "terminal width 32767"],
            exec_mode: "Enable",
        }),
        Ok(DeviceType::JuniperJunos) => Ok(PlatformProfile {
            handler: juniper_junos()?,
            prepare: &["set cli screen-length 0", "set cli screen-width 511"],
            exec_mode: "Enable",
        }),
        Err(_) => Ok(PlatformProfile {
            handler: generic()?,
            prepare: &[],
            exec_mode: "Enable",
        }),
    }
}

/// Returns a `DeviceHandler` configured for Cisco IOS / IOS-XE devices.
pub fn cisco_ios() -> Result<DeviceHandler, ConnectError> {
    DeviceHandler::new(
        // Prompt
        vec![
            ("Config".to_string(), vec![r"^\S+\(\S+\)#\s*$"]),
            ("Enable".to_string(), vec![r"^[^\s#]+#\s*$"]),
            ("Login".to_string(), vec![r"^[^\s<]+>\s*$"]),
        ],
        // Write
        vec![(
            ENABLE_PASSWORD_PARAM.to_string(),
            (true, ENABLE_PASSWORD_PARAM.to_string(), true),
            vec![r"^\x00*\r?(Enable )?Password:\s*$"],
        )],
        // More regex
        vec![r"^\s*--More--\s*$", r"\s*<--- More --->\s*"],
        // Error regex
        vec![
            r"^% Invalid input detected at '\^' marker\.",
            r"^% Incomplete command\.",
            r"^% Ambiguous command:.*",
            r"^% Unknown command.*",
            r"^% Access denied.*",
            r"^% Bad secrets.*",
            r"^Command authorization failed.*",
            r"^Command rejected:.*",
        ],
        // Edges
        vec![
            ("Login".to_string(), "enable".to_string(), "Enable".to_string()),
            (
                "Enable".to_string(),
                "configure terminal".to_string(),
                "Config".to_string(),
            ),
            ("Config".to_string(), "end".to_string(), "Enable".to_string()),
        ],
        // Ignore errors
        vec![],
        HashMap::new(),
    )
}

/// Returns a `DeviceHandler` configured for Arista EOS devices.
pub fn arista_eos() -> Result<DeviceHandler, ConnectError> {
    DeviceHandler::new(
        // Prompt
        vec![
            (
                "Config".to_string(),
                vec![r"^[\w.\-@()/: ]{1,63}\(config[\w.\-@/:+]{0,63}\)#\s*$"],
            ),
            ("Enable".to_string(), vec![r"^[\w.\-@/: ]{1,63}#\s*$"]),
            ("Login".to_string(), vec![r"^[\w.\-@/: ]{1,63}>\s*$"]),
        ],
        // Write
        vec![(
            ENABLE_PASSWORD_PARAM.to_string(),
            (true, ENABLE_PASSWORD_PARAM.to_string(), true),
            vec![r"^\x00*\r?Password:\s*$"],
        )],
        // More regex
        vec![r"^\s*--More--\s*$"],
        // Error regex
        vec![
            r"^% Ambiguous command.*",
            r"^% Error.*",
            r"^% Incomplete command.*",
            r"^% Invalid input.*",
            r"^% Unavailable command.*",
            r"^% Authorization denied.*",
        ],
        // Edges
        vec![
            ("Login".to_string(), "enable".to_string(), "Enable".to_string()),
            (
                "Enable".to_string(),
                "configure terminal".to_string(),
                "Config".to_string(),
            ),
            ("Config".to_string(), "end".to_string(), "Enable".to_string()),
        ],
        // Ignore errors
        vec![],
        HashMap::new(),
    )
}

/// Returns a `DeviceHandler` configured for Juniper Junos devices.
pub fn juniper_junos() -> Result<DeviceHandler, ConnectError> {
    DeviceHandler::new(
        // Prompt
        vec![
            ("Config".to_string(), vec![r"^\S+@\S+#\s*$"]),
            ("Enable".to_string(), vec![r"^\S+@\S+>\s*$"]),
        ],
        // Write
        vec![(
            "Save".to_string(),
            (false, "yes\n".to_string(), true),
            vec![r"Exit with uncommitted changes\? \[yes,no\] \(yes\) "],
        )],
        // More regex
        vec![r"---\(more.*\)---"],
        // Error regex
        vec![
            r".*unknown command.*",
            r"^syntax error.*",
            r"^error:.+",
            r"\s+\^$",
        ],
        // Edges
        vec![
            ("Enable".to_string(), "configure".to_string(), "Config".to_string()),
            ("Config".to_string(), "exit".to_string(), "Enable".to_string()),
        ],
        // Ignore errors
        vec![
            r"warning: statement not found",
            r"warning: element \S+ not found",
        ],
        HashMap::new(),
    )
}

/// Fallback for platforms without a template: any `>`, `#` or `$` prompt.
pub fn generic() -> Result<DeviceHandler, ConnectError> {
    DeviceHandler::new(
        vec![("Enable".to_string(), vec![r"^\S*[>#$]\s*$"])],
        vec![],
        vec![r"^\s*-+\s*\(?[Mm]ore.*-+\s*$"],
        vec![],
        vec![],
        vec![],
        HashMap::new(),
    )
}
