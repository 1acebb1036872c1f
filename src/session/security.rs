use super::*;

/// Security level used for SSH algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityLevel {
    /// Strict modern algorithms.
    Secure,
    /// Modern algorithms plus the SHA-1 and CBC fallbacks older images need.
    Balanced,
    /// Maximum compatibility with legacy devices.
    LegacyCompatible,
}

impl FromStr for SecurityLevel {
    type Err = ConnectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "secure" => Ok(SecurityLevel::Secure),
            "balanced" => Ok(SecurityLevel::Balanced),
            "legacy" | "legacy_compatible" => Ok(SecurityLevel::LegacyCompatible),
            _ => Err(ConnectError::InvalidSetting {
                key: config::SECURITY_LEVEL_ENV.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Connection security options for SSH establishment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSecurityOptions {
    /// SSH algorithm policy.
    pub level: SecurityLevel,
    /// Server host key verification method.
    pub server_check: ServerCheckMethod,
}

impl ConnectionSecurityOptions {
    /// Secure profile that verifies the host against the known hosts file.
    pub fn secure_default() -> Self {
        Self {
            level: SecurityLevel::Secure,
            server_check: ServerCheckMethod::DefaultKnownHostsFile,
        }
    }

    pub(super) fn preferred(&self) -> Preferred {
        match self.level {
            SecurityLevel::Secure => Preferred {
                kex: Cow::Borrowed(config::SECURE_KEX_ORDER),
                key: Cow::Borrowed(config::SECURE_KEY_TYPES),
                cipher: Cow::Borrowed(config::SECURE_CIPHERS),
                mac: Cow::Borrowed(config::SECURE_MAC_ALGORITHMS),
                compression: Cow::Borrowed(config::DEFAULT_COMPRESSION_ALGORITHMS),
            },
            SecurityLevel::Balanced => Preferred {
                kex: Cow::Borrowed(config::BALANCED_KEX_ORDER),
                key: Cow::Borrowed(config::BALANCED_KEY_TYPES),
                cipher: Cow::Borrowed(config::BALANCED_CIPHERS),
                mac: Cow::Borrowed(config::BALANCED_MAC_ALGORITHMS),
                compression: Cow::Borrowed(config::DEFAULT_COMPRESSION_ALGORITHMS),
            },
            SecurityLevel::LegacyCompatible => Preferred {
                kex: Cow::Borrowed(config::LEGACY_KEX_ORDER),
                key: Cow::Borrowed(config::LEGACY_KEY_TYPES),
                cipher: Cow::Borrowed(config::LEGACY_CIPHERS),
                mac: Cow::Borrowed(config::LEGACY_MAC_ALGORITHMS),
                compression: Cow::Borrowed(config::DEFAULT_COMPRESSION_ALGORITHMS),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectionSecurityOptions, SecurityLevel};
    use crate::error::ConnectError;
    use async_ssh2_tokio::ServerCheckMethod;
    use russh::{cipher, kex, mac};

    #[test]
    fn secure_default_checks_known_hosts() {
        let options = ConnectionSecurityOptions::secure_default();
        assert_eq!(options.level, SecurityLevel::Secure);
        assert!(matches!(
            options.server_check,
            ServerCheckMethod::DefaultKnownHostsFile
        ));
    }

    #[test]
    fn secure_profile_excludes_weak_algorithms() {
        let preferred = ConnectionSecurityOptions::secure_default().preferred();

        assert!(preferred.kex.iter().all(|alg| *alg != kex::NONE));
        assert!(preferred.kex.iter().all(|alg| *alg != kex::DH_G1_SHA1));
        assert!(preferred.cipher.iter().all(|alg| *alg != cipher::NONE));
        assert!(preferred.cipher.iter().all(|alg| *alg != cipher::AES_128_CBC));
        assert!(preferred.mac.iter().all(|alg| *alg != mac::HMAC_SHA1));
    }

    #[test]
    fn balanced_profile_adds_sha1_fallbacks_only() {
        let options = ConnectionSecurityOptions {
            level: SecurityLevel::Balanced,
            server_check: ServerCheckMethod::NoCheck,
        };
        let preferred = options.preferred();

        assert!(preferred.kex.contains(&kex::DH_G14_SHA1));
        assert!(preferred.mac.contains(&mac::HMAC_SHA1));
        assert!(preferred.cipher.iter().all(|alg| *alg != cipher::NONE));
        assert!(preferred.kex.iter().all(|alg| *alg != kex::NONE));
    }

    #[test]
    fn legacy_profile_keeps_broad_compatibility_algorithms() {
        let options = ConnectionSecurityOptions {
            level: SecurityLevel::LegacyCompatible,
            server_check: ServerCheckMethod::NoCheck,
        };

        let preferred = options.preferred();
        assert!(preferred.kex.contains(&kex::DH_G1_SHA1));
        assert!(preferred.cipher.contains(&cipher::NONE));
        assert!(preferred.mac.contains(&mac::NONE));
    }

    #[test]
    fn security_level_parses_case_insensitively() {
        assert_eq!("Secure".parse::<SecurityLevel>().ok(), Some(SecurityLevel::Secure));
        assert_eq!(
            " LEGACY ".parse::<SecurityLevel>().ok(),
            Some(SecurityLevel::LegacyCompatible)
        );
        assert!(matches!(
            "weak".parse::<SecurityLevel>(),
            Err(ConnectError::InvalidSetting { .. })
        ));
    }
}
