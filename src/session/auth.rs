use super::*;
use russh::client::Handle;
use russh::keys::PrivateKeyWithHashAlg;

/// Outcome of a single authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum AuthAttemptResult {
    Succeeded,
    /// The server does not accept this method; another one may still work.
    MethodUnsupported,
    Failed,
}

/// Authentication primitives a transport exposes to the negotiator.
///
/// Transport and network failures are reported as `Err`; a server that
/// answered the request is always reported as `Ok`.
#[allow(async_fn_in_trait)]
pub trait AuthPrimitives {
    /// Attempts the `none` method with only a username.
    async fn try_none_auth(&mut self, username: &str) -> Result<AuthAttemptResult, ConnectError>;

    /// Runs the transport's credentialed methods (public key, password).
    async fn try_standard_auth(
        &mut self,
        credentials: &Credentials,
    ) -> Result<AuthAttemptResult, ConnectError>;
}

/// Chooses the authentication method order for a device family.
///
/// Some switches accept a session with no authentication at all and then ask
/// for credentials inside the shell. Trying `none` first makes that
/// behaviour explicit instead of depending on which method the server
/// happens to accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthNegotiator {
    try_none_first: bool,
}

impl AuthNegotiator {
    pub fn new(try_none_first: bool) -> Self {
        Self { try_none_first }
    }

    pub fn for_profile(profile: &DeviceProfile) -> Self {
        Self::new(profile.try_none_auth)
    }

    /// Runs `none` auth, falling back to standard auth only when the server
    /// reports the method as unsupported.
    ///
    /// Any other `none` outcome is returned unchanged and errors propagate.
    /// There is no retry beyond the single fallback.
    pub async fn authenticate<T: AuthPrimitives>(
        &self,
        transport: &mut T,
        credentials: &Credentials,
    ) -> Result<AuthAttemptResult, ConnectError> {
        if self.try_none_first {
            match transport.try_none_auth(&credentials.username).await? {
                AuthAttemptResult::MethodUnsupported => {
                    debug!(
                        "none authentication not accepted for {}, falling back to standard methods",
                        credentials.username
                    );
                }
                other => {
                    debug!("none authentication for {}: {:?}", credentials.username, other);
                    return Ok(other);
                }
            }
        }
        transport.try_standard_auth(credentials).await
    }

    /// Like [`authenticate`](Self::authenticate) but turns anything other than
    /// success into [`ConnectError::AuthFailed`].
    pub async fn ensure_authenticated<T: AuthPrimitives>(
        &self,
        transport: &mut T,
        credentials: &Credentials,
    ) -> Result<(), ConnectError> {
        match self.authenticate(transport, credentials).await? {
            AuthAttemptResult::Succeeded => Ok(()),
            other => Err(ConnectError::AuthFailed(format!(
                "{} ({:?})",
                credentials.username, other
            ))),
        }
    }
}

impl AuthPrimitives for Handle<HostKeyVerifier> {
    async fn try_none_auth(&mut self, username: &str) -> Result<AuthAttemptResult, ConnectError> {
        // A server that rejects `none` answers with the list of methods it
        // will accept, so a failure here always means "use another method".
        let result = self.authenticate_none(username).await?;
        if result.success() {
            Ok(AuthAttemptResult::Succeeded)
        } else {
            Ok(AuthAttemptResult::MethodUnsupported)
        }
    }

    async fn try_standard_auth(
        &mut self,
        credentials: &Credentials,
    ) -> Result<AuthAttemptResult, ConnectError> {
        if let Some(key_path) = credentials.private_key.as_ref() {
            let key =
                russh::keys::load_secret_key(key_path, credentials.key_passphrase.as_deref())?;
            let hash = self.best_supported_rsa_hash().await?.flatten();
            let result = self
                .authenticate_publickey(
                    credentials.username.as_str(),
                    PrivateKeyWithHashAlg::new(Arc::new(key), hash),
                )
                .await?;
            if result.success() {
                return Ok(AuthAttemptResult::Succeeded);
            }
            debug!("public key rejected for {}", credentials.username);
            if credentials.password.is_empty() {
                return Ok(AuthAttemptResult::Failed);
            }
        }

        let result = self
            .authenticate_password(credentials.username.as_str(), credentials.password.as_str())
            .await?;
        if result.success() {
            Ok(AuthAttemptResult::Succeeded)
        } else {
            Ok(AuthAttemptResult::Failed)
        }
    }
}
