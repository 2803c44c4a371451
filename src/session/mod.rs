//! Device session establishment over SSH and Telnet.
//!
//! A [`Session`] owns one interactive channel to a device and walks it from a
//! freshly connected shell to a stable, scriptable state: authentication
//! negotiation, the in-shell login handshake, base prompt detection,
//! privilege elevation and paging control.
//!
//! # Main Components
//!
//! - [`Session`] - One device connection plus its prompt baseline
//! - [`ChannelIo`] - Byte-stream capability the session drives ([`ShellChannel`] for
//!   SSH/Telnet, [`ScriptedChannel`] for offline use)
//! - [`AuthNegotiator`] - `none` authentication with fallback to standard methods
//! - [`SessionRecorder`] - Event recording with secret redaction

use log::{debug, trace, warn};
use regex::Regex;
use russh::Preferred;
use russh::keys::PublicKey;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{self, SessionOptions};
use crate::device::{self, DeviceProfile};
use crate::error::ConnectError;

pub use auth::{AuthAttemptResult, AuthNegotiator, AuthPrimitives};
pub use channel::{ChannelIo, ShellChannel, TransportKind};
pub use login::{LOGIN_MAX_ITERATIONS, LoginReport, LoginState};
pub use recording::{REDACTED, SessionEvent, SessionRecordEntry, SessionRecordLevel, SessionRecorder};
pub use scripted::ScriptedChannel;
pub use security::{ConnectionSecurityOptions, HostKeyPolicy, HostKeyVerifier, SecurityLevel};
pub use telnet::{Filtered, TelnetFilter};

/// Line terminator sent after every command and credential.
pub const RETURN: &str = "\n";

/// Credentials consulted by authentication, login and elevation.
///
/// Owned by the caller; sessions only borrow them.
#[derive(Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Enable secret used for privilege elevation.
    pub secret: Option<String>,
    /// Private key tried before the password during SSH authentication.
    pub private_key: Option<PathBuf>,
    pub key_passphrase: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_private_key(mut self, path: impl Into<PathBuf>, passphrase: Option<String>) -> Self {
        self.private_key = Some(path.into());
        self.key_passphrase = passphrase;
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("secret", &self.secret.as_ref().map(|_| REDACTED))
            .field("private_key", &self.private_key)
            .finish()
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SessionState {
    /// Transport is up, nothing has been sent yet.
    Connected,
    /// The interactive login submitted the password.
    LoggedIn,
    /// Preparation completed; the session accepts commands.
    Ready,
    /// Preparation failed; the session must be discarded.
    Failed,
    Closed,
}

/// The output of a command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Output with the command echo and trailing prompt removed.
    pub content: String,
    /// Everything read until the prompt reappeared.
    pub all: String,
    /// Prompt that ended the output.
    pub prompt: Option<String>,
}

/// One interactive connection to a device.
pub struct Session<C: ChannelIo> {
    channel: C,
    profile: DeviceProfile,
    delay_factor: f64,
    base_prompt: String,
    ansi_escape_codes: bool,
    state: SessionState,
    device_addr: String,
    recorder: Option<SessionRecorder>,
}

impl<C: ChannelIo> Session<C> {
    /// Wraps an already connected channel.
    pub fn new(channel: C, profile: DeviceProfile, delay_factor: f64) -> Result<Self, ConnectError> {
        if !delay_factor.is_finite() || delay_factor <= 0.0 {
            return Err(ConnectError::InvalidConfig(format!(
                "delay_factor must be a positive number, got {delay_factor}"
            )));
        }
        profile.validate()?;
        Ok(Self {
            channel,
            profile,
            delay_factor,
            base_prompt: String::new(),
            ansi_escape_codes: false,
            state: SessionState::Connected,
            device_addr: String::new(),
            recorder: None,
        })
    }

    /// Wraps a channel using the profile and timing from `options`.
    pub fn from_options(channel: C, options: &SessionOptions) -> Result<Self, ConnectError> {
        let profile = options.resolve_profile()?;
        Self::new(channel, profile, options.delay_factor)
    }

    /// Attaches a recorder and records the connection.
    pub fn with_recorder(mut self, recorder: SessionRecorder) -> Self {
        let _ = recorder.record_event(SessionEvent::ConnectionEstablished {
            device_addr: self.device_addr.clone(),
            transport: self.channel.kind(),
        });
        self.recorder = Some(recorder);
        self
    }

    pub fn with_device_addr(mut self, device_addr: impl Into<String>) -> Self {
        self.device_addr = device_addr.into();
        self
    }

    /// Prompt detected during preparation; empty until then.
    pub fn base_prompt(&self) -> &str {
        &self.base_prompt
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn delay_factor(&self) -> f64 {
        self.delay_factor
    }

    /// Whether escape sequences are stripped from everything read.
    pub fn ansi_escape_codes(&self) -> bool {
        self.ansi_escape_codes
    }

    pub fn set_ansi_escape_codes(&mut self, enabled: bool) {
        self.ansi_escape_codes = enabled;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn device_addr(&self) -> &str {
        &self.device_addr
    }

    pub fn recorder(&self) -> Option<&SessionRecorder> {
        self.recorder.as_ref()
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Scales a wait by the session delay factor.
    pub(crate) fn delay(&self, units: f64) -> Duration {
        Duration::from_secs_f64(units * self.delay_factor)
    }

    async fn pause(&self, units: f64) {
        tokio::time::sleep(self.delay(units)).await;
    }

    fn record(&self, event: SessionEvent) {
        if let Some(recorder) = self.recorder.as_ref() {
            let _ = recorder.record_event(event);
        }
    }

    fn ensure_usable(&self, operation: &str) -> Result<(), ConnectError> {
        match self.state {
            SessionState::Failed | SessionState::Closed => Err(ConnectError::SessionUnusable(
                format!("cannot {operation}: session is {:?}", self.state),
            )),
            _ => Ok(()),
        }
    }
}

mod auth;
mod channel;
mod client;
mod login;
mod modes;
mod prepare;
mod prompt;
mod recording;
mod scripted;
mod security;
mod telnet;
