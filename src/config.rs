//! SSH algorithm profiles and run configuration.
//!
//! The algorithm tables back the three [`SecurityLevel`] profiles. Lab gear
//! is often old, so the legacy profile keeps everything russh can speak.
//!
//! [`RunConfig`] collects the environment settings the binary honors.

use std::time::Duration;

use async_ssh2_tokio::ServerCheckMethod;
use log::warn;
use russh::keys::{Algorithm, EcdsaCurve, HashAlg};
use russh::{cipher, compression, kex, mac};

use crate::session::{ConnectionSecurityOptions, SecurityLevel};

pub const SECURE_KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::CURVE25519_PRE_RFC_8731,
    kex::ECDH_SHA2_NISTP256,
    kex::ECDH_SHA2_NISTP384,
    kex::ECDH_SHA2_NISTP521,
    kex::DH_G16_SHA512,
    kex::DH_G14_SHA256,
    kex::DH_GEX_SHA256,
];

pub const SECURE_KEY_TYPES: &[Algorithm] = &[
    Algorithm::Ed25519,
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP256,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP384,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP521,
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha512),
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha256),
    },
];

pub const SECURE_CIPHERS: &[cipher::Name] = &[
    cipher::CHACHA20_POLY1305,
    cipher::AES_256_GCM,
    cipher::AES_256_CTR,
    cipher::AES_192_CTR,
    cipher::AES_128_CTR,
];

pub const SECURE_MAC_ALGORITHMS: &[mac::Name] = &[
    mac::HMAC_SHA512_ETM,
    mac::HMAC_SHA256_ETM,
    mac::HMAC_SHA512,
    mac::HMAC_SHA256,
];

/// Secure set plus the SHA-1 group exchanges most IOS-XE and EOS images still offer.
pub const BALANCED_KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::CURVE25519_PRE_RFC_8731,
    kex::ECDH_SHA2_NISTP256,
    kex::ECDH_SHA2_NISTP384,
    kex::ECDH_SHA2_NISTP521,
    kex::DH_G16_SHA512,
    kex::DH_G14_SHA256,
    kex::DH_GEX_SHA256,
    kex::DH_G14_SHA1,
    kex::DH_GEX_SHA1,
];

pub const BALANCED_KEY_TYPES: &[Algorithm] = &[
    Algorithm::Ed25519,
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP256,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP384,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP521,
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha512),
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha256),
    },
    Algorithm::Rsa { hash: None },
];

pub const BALANCED_CIPHERS: &[cipher::Name] = &[
    cipher::CHACHA20_POLY1305,
    cipher::AES_256_GCM,
    cipher::AES_256_CTR,
    cipher::AES_192_CTR,
    cipher::AES_128_CTR,
    cipher::AES_256_CBC,
    cipher::AES_192_CBC,
    cipher::AES_128_CBC,
];

pub const BALANCED_MAC_ALGORITHMS: &[mac::Name] = &[
    mac::HMAC_SHA512_ETM,
    mac::HMAC_SHA256_ETM,
    mac::HMAC_SHA512,
    mac::HMAC_SHA256,
    mac::HMAC_SHA1_ETM,
    mac::HMAC_SHA1,
];

/// Every key exchange russh supports, including `none`.
pub const LEGACY_KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::CURVE25519_PRE_RFC_8731,
    kex::DH_GEX_SHA1,
    kex::DH_GEX_SHA256,
    kex::DH_G1_SHA1,
    kex::DH_G14_SHA1,
    kex::DH_G14_SHA256,
    kex::DH_G15_SHA512,
    kex::DH_G16_SHA512,
    kex::DH_G17_SHA512,
    kex::DH_G18_SHA512,
    kex::ECDH_SHA2_NISTP256,
    kex::ECDH_SHA2_NISTP384,
    kex::ECDH_SHA2_NISTP521,
    kex::NONE,
];

pub const LEGACY_KEY_TYPES: &[Algorithm] = &[
    Algorithm::Dsa,
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP256,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP384,
    },
    Algorithm::Ecdsa {
        curve: EcdsaCurve::NistP521,
    },
    Algorithm::Ed25519,
    Algorithm::Rsa { hash: None },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha256),
    },
    Algorithm::Rsa {
        hash: Some(HashAlg::Sha512),
    },
];

pub const LEGACY_CIPHERS: &[cipher::Name] = &[
    cipher::AES_128_CTR,
    cipher::AES_192_CTR,
    cipher::AES_256_CTR,
    cipher::AES_256_GCM,
    cipher::AES_128_CBC,
    cipher::AES_192_CBC,
    cipher::AES_256_CBC,
    cipher::CHACHA20_POLY1305,
    cipher::CLEAR,
    cipher::NONE,
];

pub const LEGACY_MAC_ALGORITHMS: &[mac::Name] = &[
    mac::HMAC_SHA1,
    mac::HMAC_SHA256,
    mac::HMAC_SHA512,
    mac::HMAC_SHA1_ETM,
    mac::HMAC_SHA256_ETM,
    mac::HMAC_SHA512_ETM,
    mac::NONE,
];

pub const DEFAULT_COMPRESSION_ALGORITHMS: &[compression::Name] = &[
    compression::NONE,
    compression::ZLIB,
    compression::ZLIB_LEGACY,
];

pub const USERNAME_ENV: &str = "NETMIKO_USERNAME";
pub const PASSWORD_ENV: &str = "NETMIKO_PASSWORD";
pub const SECRET_ENV: &str = "NETMIKO_SECRET";
pub const SECURITY_LEVEL_ENV: &str = "NETMIKO_SECURITY_LEVEL";
pub const TIMEOUT_ENV: &str = "NETMIKO_TIMEOUT";

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings shared by every device in a run.
#[derive(Clone)]
pub struct RunConfig {
    pub username: String,
    pub password: String,
    /// Answer to an enable password prompt, if the device asks for one.
    pub secret: Option<String>,
    pub security_level: SecurityLevel,
    /// Applies to connection setup and to each command.
    pub timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            secret: None,
            security_level: SecurityLevel::Balanced,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("security_level", &self.security_level)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RunConfig {
    /// Reads settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup.
    ///
    /// Unset keys fall back to defaults. Values that fail to parse are logged
    /// and replaced by the default, so a typo never stops a run.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let security_level = match lookup(SECURITY_LEVEL_ENV) {
            Some(raw) => raw.parse::<SecurityLevel>().unwrap_or_else(|err| {
                warn!("{err}, using {:?}", defaults.security_level);
                defaults.security_level
            }),
            None => defaults.security_level,
        };

        let timeout = match lookup(TIMEOUT_ENV) {
            Some(raw) => parse_timeout(&raw).unwrap_or_else(|err| {
                warn!("{err}, using {}s", defaults.timeout.as_secs());
                defaults.timeout
            }),
            None => defaults.timeout,
        };

        Self {
            username: lookup(USERNAME_ENV).unwrap_or(defaults.username),
            password: lookup(PASSWORD_ENV).unwrap_or(defaults.password),
            secret: lookup(SECRET_ENV).filter(|s| !s.is_empty()),
            security_level,
            timeout,
        }
    }

    /// Connection options for this run.
    ///
    /// Host keys are accepted without verification, the same way the lab
    /// tooling always has.
    pub fn security_options(&self) -> ConnectionSecurityOptions {
        ConnectionSecurityOptions {
            level: self.security_level,
            server_check: ServerCheckMethod::NoCheck,
        }
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, crate::error::ConnectError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(crate::error::ConnectError::InvalidSetting {
            key: TIMEOUT_ENV.to_string(),
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_environment_uses_admin_defaults() {
        let config = RunConfig::from_lookup(lookup_from(&[]));

        assert_eq!(config.username, "admin");
        assert_eq!(config.password, "admin");
        assert_eq!(config.secret, None);
        assert_eq!(config.security_level, SecurityLevel::Balanced);
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn credentials_are_overridden_from_environment() {
        let config = RunConfig::from_lookup(lookup_from(&[
            (USERNAME_ENV, "lab"),
            (PASSWORD_ENV, "s3cret"),
            (SECRET_ENV, "enable-me"),
        ]));

        assert_eq!(config.username, "lab");
        assert_eq!(config.password, "s3cret");
        assert_eq!(config.secret.as_deref(), Some("enable-me"));
    }

    #[test]
    fn empty_secret_is_treated_as_unset() {
        let config = RunConfig::from_lookup(lookup_from(&[(SECRET_ENV, "")]));
        assert_eq!(config.secret, None);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = RunConfig::from_lookup(lookup_from(&[
            (SECURITY_LEVEL_ENV, "paranoid"),
            (TIMEOUT_ENV, "soon"),
        ]));

        assert_eq!(config.security_level, SecurityLevel::Balanced);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(parse_timeout("0").is_err());
        assert_eq!(parse_timeout(" 15 ").ok(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn security_level_and_timeout_are_parsed() {
        let config = RunConfig::from_lookup(lookup_from(&[
            (SECURITY_LEVEL_ENV, "legacy"),
            (TIMEOUT_ENV, "10"),
        ]));

        assert_eq!(config.security_level, SecurityLevel::LegacyCompatible);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(matches!(
            config.security_options().server_check,
            ServerCheckMethod::NoCheck
        ));
    }

    #[test]
    fn debug_output_redacts_password() {
        let config = RunConfig::from_lookup(lookup_from(&[(PASSWORD_ENV, "hunter2")]));
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
