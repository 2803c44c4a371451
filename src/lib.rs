//! # rdevsh - Network Device Session Establishment
//!
//! `rdevsh` takes a freshly opened SSH or Telnet connection to a network
//! device (switches, routers) and brings it to a stable, scriptable state. It
//! handles the parts vendors get inconsistent: `none` authentication ahead of
//! the standard methods, credentials typed into the shell itself, prompt
//! detection from noisy terminal output, privilege elevation and paging
//! control.
//!
//! ## Features
//!
//! - **Authentication Negotiation**: Tries SSH `none` auth first and falls back to key/password
//! - **Interactive Login**: Answers in-shell `User Name:` / `Password:` prompts
//! - **Prompt Detection**: Derives the base prompt used to delimit command output
//! - **Session Preparation**: Enable mode, paging disable and buffer draining in one call
//! - **Device Templates**: Per-family capability records (Dell PowerConnect, Force10, Cisco IOS)
//! - **Session Recording**: JSONL recording with secret redaction and offline replay
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rdevsh::config::SessionOptions;
//! use rdevsh::session::{Credentials, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = SessionOptions::default();
//!     let credentials = Credentials::new("admin", "password").with_secret("enable-secret");
//!
//!     let mut session = Session::connect_ssh("192.168.1.1", 22, &credentials, &options).await?;
//!     session.establish(&credentials).await?;
//!
//!     let output = session.send_command("show version").await?;
//!     println!("{}", output.content);
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Main Components
//!
//! - [`session::Session`] - One device connection, its prompt baseline and lifecycle
//! - [`session::AuthNegotiator`] - `none` authentication with single fallback
//! - [`device::DeviceProfile`] - Prompt terminators, markers and commands of a device family
//! - [`error::ConnectError`] - Error types for connection and session operations
//! - [`config`] - Session options and SSH algorithm tiers

pub mod config;
pub mod device;
pub mod error;
pub mod session;
pub mod templates;
