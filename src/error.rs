//! Error types for session establishment and device interaction.
//!
//! This module defines every error that can surface while connecting to a
//! device, negotiating authentication, detecting prompts and preparing the
//! session for scripted use.

use thiserror::Error;

/// Errors that can occur while establishing or driving a device session.
#[derive(Error, Debug)]
pub enum ConnectError {
    /// Credentials were rejected by the standard authentication methods.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The device produced no usable prompt.
    ///
    /// Raised when the echo after a carriage return is empty or does not end
    /// with one of the expected prompt terminators. An interactive login that
    /// silently ran out of attempts usually surfaces here.
    #[error("prompt detection failed: {0}")]
    PromptDetectionFailed(String),

    /// The device refused privilege elevation.
    #[error("privilege elevation failed: {0}")]
    EscalationFailed(String),

    /// Entering or leaving configuration mode did not take effect.
    #[error("mode change failed: {0}")]
    ModeChangeFailed(String),

    /// The underlying channel was closed while an operation was in flight.
    #[error("transport closed")]
    TransportClosed,

    /// No matching output arrived within the polling budget.
    ///
    /// The error contains the partial output captured before giving up.
    #[error("read timeout: {0}")]
    ReadTimeout(String),

    /// The server host key was refused by the configured policy.
    #[error("host key rejected for {0}")]
    HostKeyRejected(String),

    /// The session is not in a state that allows the requested operation.
    ///
    /// A session whose preparation failed, or that has been closed, must not
    /// be reused.
    #[error("session unusable: {0}")]
    SessionUnusable(String),

    /// The requested device template does not exist.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Session options failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Session options could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParseError(#[from] serde_json::Error),

    /// An error occurred in the russh library.
    #[error("russh error: {0}")]
    RusshError(#[from] russh::Error),

    /// Key loading or known_hosts handling failed.
    #[error("key error: {0}")]
    KeyError(#[from] russh::keys::Error),

    /// Socket level failure (Telnet transport).
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("internal error: {0}")]
    InternalServerError(String),
}
