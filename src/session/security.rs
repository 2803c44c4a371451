use super::*;
use russh::keys::known_hosts;

/// Security level used for SSH algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SecurityLevel {
    /// Strict modern algorithms (default).
    Secure,
    /// Good security with broader compatibility.
    Balanced,
    /// Maximum compatibility with legacy devices.
    LegacyCompatible,
}

/// How the server host key is trusted.
///
/// The policy is a plain value, so one instance can be shared read-only by
/// any number of concurrent sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum HostKeyPolicy {
    /// Accept only keys already present in the user's known_hosts file.
    TrustSystemKnownHosts,
    /// Accept known keys, learn unknown ones, refuse changed ones.
    TrustOnFirstUse,
    /// Refuse every key.
    Reject,
    /// Accept every key without checking. Lab use only.
    NoCheck,
}

/// Connection security options for SSH establishment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ConnectionSecurityOptions {
    /// SSH algorithm policy.
    pub level: SecurityLevel,
    /// Server host key verification policy.
    pub host_key_policy: HostKeyPolicy,
}

impl Default for ConnectionSecurityOptions {
    fn default() -> Self {
        Self::secure_default()
    }
}

impl ConnectionSecurityOptions {
    /// Secure-by-default profile (recommended).
    pub fn secure_default() -> Self {
        Self {
            level: SecurityLevel::Secure,
            host_key_policy: HostKeyPolicy::TrustSystemKnownHosts,
        }
    }

    /// Balanced profile for mixed environments.
    pub fn balanced() -> Self {
        Self {
            level: SecurityLevel::Balanced,
            host_key_policy: HostKeyPolicy::TrustOnFirstUse,
        }
    }

    /// Legacy compatibility profile for older devices.
    pub fn legacy_compatible() -> Self {
        Self {
            level: SecurityLevel::LegacyCompatible,
            host_key_policy: HostKeyPolicy::NoCheck,
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

/// Outcome of a known_hosts lookup, independent of where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum KnownHostStatus {
    Known,
    Unknown,
    Changed,
}

/// What the policy wants done with a server key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum HostKeyDecision {
    Accept,
    AcceptAndLearn,
    Refuse,
}

impl HostKeyPolicy {
    pub(super) fn decide(self, status: KnownHostStatus) -> HostKeyDecision {
        match (self, status) {
            (HostKeyPolicy::NoCheck, _) => HostKeyDecision::Accept,
            (HostKeyPolicy::Reject, _) => HostKeyDecision::Refuse,
            (_, KnownHostStatus::Known) => HostKeyDecision::Accept,
            (_, KnownHostStatus::Changed) => HostKeyDecision::Refuse,
            (HostKeyPolicy::TrustOnFirstUse, KnownHostStatus::Unknown) => {
                HostKeyDecision::AcceptAndLearn
            }
            (HostKeyPolicy::TrustSystemKnownHosts, KnownHostStatus::Unknown) => {
                HostKeyDecision::Refuse
            }
        }
    }
}

/// russh client handler that applies a [`HostKeyPolicy`] to the server key.
#[derive(Debug, Clone)]
pub struct HostKeyVerifier {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
    /// Overrides the user's `~/.ssh/known_hosts`.
    known_hosts: Option<PathBuf>,
}

impl HostKeyVerifier {
    pub fn new(host: impl Into<String>, port: u16, policy: HostKeyPolicy) -> Self {
        Self {
            host: host.into(),
            port,
            policy,
            known_hosts: None,
        }
    }

    /// Checks and learns keys against `path` instead of the user's file.
    pub fn with_known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts = Some(path.into());
        self
    }

    fn known_host_status(&self, key: &PublicKey) -> KnownHostStatus {
        let checked = match self.known_hosts.as_ref() {
            Some(path) => known_hosts::check_known_hosts_path(&self.host, self.port, key, path),
            None => known_hosts::check_known_hosts(&self.host, self.port, key),
        };
        match checked {
            Ok(true) => KnownHostStatus::Known,
            Ok(false) => KnownHostStatus::Unknown,
            Err(e) => {
                debug!("{}:{} known_hosts check failed: {}", self.host, self.port, e);
                KnownHostStatus::Changed
            }
        }
    }
}

impl russh::client::Handler for HostKeyVerifier {
    type Error = ConnectError;

    async fn check_server_key(&mut self, server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        let status = match self.policy {
            HostKeyPolicy::NoCheck | HostKeyPolicy::Reject => KnownHostStatus::Unknown,
            _ => self.known_host_status(server_public_key),
        };

        match self.policy.decide(status) {
            HostKeyDecision::Accept => Ok(true),
            HostKeyDecision::AcceptAndLearn => {
                debug!("{}:{} learning new host key", self.host, self.port);
                match self.known_hosts.as_ref() {
                    Some(path) => known_hosts::learn_known_hosts_path(
                        &self.host,
                        self.port,
                        server_public_key,
                        path,
                    )?,
                    None => {
                        known_hosts::learn_known_hosts(&self.host, self.port, server_public_key)?
                    }
                }
                Ok(true)
            }
            HostKeyDecision::Refuse => Err(ConnectError::HostKeyRejected(format!(
                "{}:{} ({:?})",
                self.host, self.port, self.policy
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ConnectionSecurityOptions, HostKeyDecision, HostKeyPolicy, HostKeyVerifier,
        KnownHostStatus, SecurityLevel,
    };
    use crate::error::ConnectError;
    use russh::client::Handler;
    use russh::keys::{PublicKey, known_hosts, parse_public_key_base64};
    use russh::{cipher, kex, mac};

    const SWITCH_KEY: &str = "AAAAC3NzaC1lZDI1NTE5AAAAIAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8g";
    const REPLACED_KEY: &str = "AAAAC3NzaC1lZDI1NTE5AAAAIGVmZ2hpamtsbW5vcHFyc3R1dnd4eXp7fH1+f4CBgoOE";

    fn key(base64: &str) -> PublicKey {
        parse_public_key_base64(base64).expect("test key")
    }

    #[test]
    fn default_security_options_are_secure() {
        let options = ConnectionSecurityOptions::default();
        assert_eq!(options.level, SecurityLevel::Secure);
        assert_eq!(options.host_key_policy, HostKeyPolicy::TrustSystemKnownHosts);
    }

    #[test]
    fn legacy_profile_uses_no_host_check() {
        let options = ConnectionSecurityOptions::legacy_compatible();
        assert_eq!(options.level, SecurityLevel::LegacyCompatible);
        assert_eq!(options.host_key_policy, HostKeyPolicy::NoCheck);
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
    fn legacy_profile_keeps_switch_era_algorithms() {
        let preferred = ConnectionSecurityOptions::legacy_compatible().preferred();

        assert!(preferred.kex.contains(&kex::DH_G1_SHA1));
        assert!(preferred.cipher.contains(&cipher::AES_128_CBC));
        assert!(preferred.mac.contains(&mac::HMAC_SHA1));
    }

    #[test]
    fn known_hosts_policy_refuses_unknown_keys() {
        let policy = HostKeyPolicy::TrustSystemKnownHosts;
        assert_eq!(policy.decide(KnownHostStatus::Known), HostKeyDecision::Accept);
        assert_eq!(policy.decide(KnownHostStatus::Unknown), HostKeyDecision::Refuse);
        assert_eq!(policy.decide(KnownHostStatus::Changed), HostKeyDecision::Refuse);
    }

    #[test]
    fn trust_on_first_use_learns_but_refuses_changed_keys() {
        let policy = HostKeyPolicy::TrustOnFirstUse;
        assert_eq!(
            policy.decide(KnownHostStatus::Unknown),
            HostKeyDecision::AcceptAndLearn
        );
        assert_eq!(policy.decide(KnownHostStatus::Changed), HostKeyDecision::Refuse);
    }

    #[test]
    fn reject_and_no_check_ignore_known_hosts() {
        assert_eq!(
            HostKeyPolicy::Reject.decide(KnownHostStatus::Known),
            HostKeyDecision::Refuse
        );
        assert_eq!(
            HostKeyPolicy::NoCheck.decide(KnownHostStatus::Changed),
            HostKeyDecision::Accept
        );
    }

    #[tokio::test]
    async fn trust_on_first_use_writes_unknown_key_to_known_hosts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("known_hosts");
        let mut verifier = HostKeyVerifier::new("10.0.0.5", 2222, HostKeyPolicy::TrustOnFirstUse)
            .with_known_hosts_path(&path);

        assert!(verifier.check_server_key(&key(SWITCH_KEY)).await.expect("learn"));
        assert!(
            known_hosts::check_known_hosts_path("10.0.0.5", 2222, &key(SWITCH_KEY), &path)
                .expect("check")
        );

        let mut strict =
            HostKeyVerifier::new("10.0.0.5", 2222, HostKeyPolicy::TrustSystemKnownHosts)
                .with_known_hosts_path(&path);
        assert!(strict.check_server_key(&key(SWITCH_KEY)).await.expect("known"));
    }

    #[tokio::test]
    async fn changed_key_is_rejected_after_learning() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("known_hosts");
        let mut verifier = HostKeyVerifier::new("10.0.0.5", 22, HostKeyPolicy::TrustOnFirstUse)
            .with_known_hosts_path(&path);
        verifier.check_server_key(&key(SWITCH_KEY)).await.expect("learn");

        let err = verifier
            .check_server_key(&key(REPLACED_KEY))
            .await
            .expect_err("changed key");
        assert!(matches!(err, ConnectError::HostKeyRejected(_)));
    }

    #[tokio::test]
    async fn strict_policy_refuses_key_missing_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("known_hosts");
        let mut verifier =
            HostKeyVerifier::new("10.0.0.5", 22, HostKeyPolicy::TrustSystemKnownHosts)
                .with_known_hosts_path(&path);

        let err = verifier
            .check_server_key(&key(SWITCH_KEY))
            .await
            .expect_err("unknown key");
        assert!(matches!(err, ConnectError::HostKeyRejected(_)));
        assert!(!path.exists());
    }
}
