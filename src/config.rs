//! Session configuration and SSH algorithm tiers.
//!
//! [`SessionOptions`] is the configuration surface callers hand to a session:
//! the device family to drive, the timing multiplier and the per-family
//! overrides. The algorithm constants below back the
//! [`SecurityLevel`](crate::session::SecurityLevel) tiers; the legacy tier
//! exists because older switch firmware only speaks SHA-1 key exchange and
//! CBC ciphers.

use russh::keys::{Algorithm, EcdsaCurve, HashAlg};
use russh::{cipher, compression, kex, mac};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::device::DeviceProfile;
use crate::error::ConnectError;
use crate::session::ConnectionSecurityOptions;
use crate::templates;

/// Template used when the options do not name one.
pub const DEFAULT_TEMPLATE: &str = "dell_powerconnect";

/// Modern key exchange algorithms only.
pub const SECURE_KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::CURVE25519_PRE_RFC_8731,
    kex::ECDH_SHA2_NISTP256,
    kex::ECDH_SHA2_NISTP384,
    kex::ECDH_SHA2_NISTP521,
    kex::DH_G16_SHA512,
    kex::DH_G14_SHA256,
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

pub static SECURE_CIPHERS: &[cipher::Name] = &[
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

/// Secure algorithms plus SHA-1 group exchange for mid-life firmware.
pub const BALANCED_KEX_ORDER: &[kex::Name] = &[
    kex::CURVE25519,
    kex::CURVE25519_PRE_RFC_8731,
    kex::ECDH_SHA2_NISTP256,
    kex::ECDH_SHA2_NISTP384,
    kex::ECDH_SHA2_NISTP521,
    kex::DH_GEX_SHA256,
    kex::DH_G16_SHA512,
    kex::DH_G14_SHA256,
    kex::DH_G14_SHA1,
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

pub static BALANCED_CIPHERS: &[cipher::Name] = &[
    cipher::CHACHA20_POLY1305,
    cipher::AES_256_GCM,
    cipher::AES_256_CTR,
    cipher::AES_192_CTR,
    cipher::AES_128_CTR,
];

pub const BALANCED_MAC_ALGORITHMS: &[mac::Name] = &[
    mac::HMAC_SHA512_ETM,
    mac::HMAC_SHA256_ETM,
    mac::HMAC_SHA512,
    mac::HMAC_SHA256,
    mac::HMAC_SHA1_ETM,
    mac::HMAC_SHA1,
];

/// Everything russh can negotiate, including unencrypted and SHA-1 variants.
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

pub static LEGACY_CIPHERS: &[cipher::Name] = &[
    cipher::CLEAR,
    cipher::NONE,
    cipher::AES_128_CTR,
    cipher::AES_192_CTR,
    cipher::AES_256_CTR,
    cipher::AES_256_GCM,
    cipher::AES_128_CBC,
    cipher::AES_192_CBC,
    cipher::AES_256_CBC,
    cipher::CHACHA20_POLY1305,
];

pub const LEGACY_MAC_ALGORITHMS: &[mac::Name] = &[
    mac::NONE,
    mac::HMAC_SHA1,
    mac::HMAC_SHA256,
    mac::HMAC_SHA512,
    mac::HMAC_SHA1_ETM,
    mac::HMAC_SHA256_ETM,
    mac::HMAC_SHA512_ETM,
];

pub const DEFAULT_COMPRESSION_ALGORITHMS: &[compression::Name] = &[
    compression::NONE,
    compression::ZLIB,
    compression::ZLIB_LEGACY,
];

/// Options recognised when opening a device session.
///
/// Every field except `template` and `delay_factor` is an override on top of
/// the named device template; `None` keeps the template's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SessionOptions {
    /// Device family template name, e.g. `dell_powerconnect`.
    pub template: String,

    /// Multiplier applied to every timing wait.
    pub delay_factor: f64,

    /// Whether the device asks for a username during the interactive login.
    pub username_required: Option<bool>,

    /// Terminator of the unprivileged prompt (`>` by default).
    pub pri_prompt_terminator: Option<char>,

    /// Terminator of the privileged prompt (`#` by default).
    pub alt_prompt_terminator: Option<char>,

    /// Command used to disable output paging.
    pub paging_disable_command: Option<String>,

    /// Algorithm tier and host key policy for SSH.
    pub security: ConnectionSecurityOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            delay_factor: 1.0,
            username_required: None,
            pri_prompt_terminator: None,
            alt_prompt_terminator: None,
            paging_disable_command: None,
            security: ConnectionSecurityOptions::default(),
        }
    }
}

impl SessionOptions {
    /// Parses options from a JSON document and validates them.
    pub fn from_json_str(json: &str) -> Result<Self, ConnectError> {
        let options: SessionOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Checks option values that serde cannot express.
    pub fn validate(&self) -> Result<(), ConnectError> {
        if !self.delay_factor.is_finite() || self.delay_factor <= 0.0 {
            return Err(ConnectError::InvalidConfig(format!(
                "delay_factor must be a positive number, got {}",
                self.delay_factor
            )));
        }
        if let Some(command) = self.paging_disable_command.as_ref()
            && command.trim().is_empty()
        {
            return Err(ConnectError::InvalidConfig(
                "paging_disable_command must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Looks up the named template and applies the overrides on top of it.
    pub fn resolve_profile(&self) -> Result<DeviceProfile, ConnectError> {
        self.validate()?;
        let mut profile = templates::profile(&self.template)?;
        if let Some(required) = self.username_required {
            profile.username_required = required;
        }
        if let Some(terminator) = self.pri_prompt_terminator {
            profile.pri_prompt_terminator = terminator;
        }
        if let Some(terminator) = self.alt_prompt_terminator {
            profile.alt_prompt_terminator = terminator;
        }
        if let Some(command) = self.paging_disable_command.as_ref() {
            profile.paging_disable_command = command.clone();
        }
        profile.validate()?;
        Ok(profile)
    }
}
