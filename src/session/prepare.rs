use super::*;

/// Polls made while waiting for the startup banner.
const DRAIN_POLLS: usize = 40;

/// Longest single wait between banner polls, in delay-factor units.
const DRAIN_MAX_WAIT: f64 = 8.0;

impl<C: ChannelIo> Session<C> {
    /// Brings a connected (or logged in) session to a scriptable state.
    ///
    /// Runs, strictly in order: escape-code stripping on, banner drain, base
    /// prompt detection, privilege elevation, paging disable, settle, final
    /// buffer clear. Any failure leaves the session `Failed`; it must then be
    /// discarded.
    pub async fn prepare(&mut self, credentials: &Credentials) -> Result<(), ConnectError> {
        match self.state {
            SessionState::Connected | SessionState::LoggedIn => {}
            state => {
                return Err(ConnectError::SessionUnusable(format!(
                    "cannot prepare a session in state {state:?}"
                )));
            }
        }

        match self.run_preparation(credentials).await {
            Ok(()) => {
                self.state = SessionState::Ready;
                debug!(
                    "{} session ready at prompt {:?}",
                    self.device_addr, self.base_prompt
                );
                self.record(SessionEvent::PreparationFinished {
                    prompt: self.base_prompt.clone(),
                });
                Ok(())
            }
            Err(e) => {
                warn!("{} session preparation failed: {}", self.device_addr, e);
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    async fn run_preparation(&mut self, credentials: &Credentials) -> Result<(), ConnectError> {
        self.ansi_escape_codes = true;
        self.test_channel_read().await?;
        self.set_base_prompt().await?;
        self.enable(credentials.secret.as_deref()).await?;
        if !self.base_prompt.ends_with(self.profile.alt_prompt_terminator) {
            self.set_base_prompt().await?;
        }
        let command = self.profile.paging_disable_command.clone();
        self.disable_paging(&command).await?;
        self.pause(0.3).await;
        self.clear_buffer().await?;
        Ok(())
    }

    /// Waits for the first output from a fresh shell.
    ///
    /// Every empty poll sends a return to provoke the device. Stops at the
    /// first non-empty read. A device that stays silent is not an error
    /// here; prompt detection deals with it.
    async fn test_channel_read(&mut self) -> Result<String, ConnectError> {
        let mut wait = 0.1;
        for _ in 0..DRAIN_POLLS {
            let output = self.read_channel().await?;
            if !output.is_empty() {
                return Ok(output);
            }
            self.write_channel(RETURN).await?;
            self.pause(wait).await;
            wait = (wait * 1.1).min(DRAIN_MAX_WAIT);
        }
        debug!("{} no startup output", self.device_addr);
        Ok(String::new())
    }

    /// Sends the command that turns off `--More--` style pagination.
    pub async fn disable_paging(&mut self, command: &str) -> Result<String, ConnectError> {
        self.pause(0.1).await;
        self.clear_buffer().await?;
        self.write_channel(&format!("{}{RETURN}", command.trim_end()))
            .await?;
        let output = self.read_until_prompt().await?;
        debug!("{} paging disabled with {:?}", self.device_addr, command);
        Ok(output)
    }

    /// Runs the interactive login when the profile or the transport calls
    /// for it, then prepares the session. Only a `Connected` session can be
    /// established; everything else is `SessionUnusable`.
    pub async fn establish(&mut self, credentials: &Credentials) -> Result<(), ConnectError> {
        if self.state != SessionState::Connected {
            return Err(ConnectError::SessionUnusable(format!(
                "cannot establish a session in state {:?}",
                self.state
            )));
        }
        if self.profile.interactive_login || self.channel.requires_interactive_login() {
            if let Err(e) = self.perform_login(credentials).await {
                self.state = SessionState::Failed;
                return Err(e);
            }
        }
        self.prepare(credentials).await
    }
}
