use super::*;

/// Hard cap on polls made by the interactive login.
pub const LOGIN_MAX_ITERATIONS: usize = 13;

/// Progress of the in-shell login handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum LoginState {
    AwaitingPrompt,
    UsernameSubmitted,
    PasswordSubmitted,
}

/// How the interactive login ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginReport {
    pub state: LoginState,
    /// Polls consumed, at most [`LOGIN_MAX_ITERATIONS`].
    pub iterations: usize,
}

impl LoginReport {
    /// True once the password has been submitted.
    pub fn completed(&self) -> bool {
        self.state == LoginState::PasswordSubmitted
    }
}

impl<C: ChannelIo> Session<C> {
    /// Types credentials into a shell that asks for them itself.
    ///
    /// Polls the channel for the profile's literal username and password
    /// markers. Silence is answered with a bare return to provoke a prompt.
    /// Running out of attempts is not an error: the session stays
    /// `Connected` and prompt detection is what fails afterwards. Transport
    /// errors do propagate. Only a freshly `Connected` session can log in.
    pub async fn perform_login(
        &mut self,
        credentials: &Credentials,
    ) -> Result<LoginReport, ConnectError> {
        if self.state != SessionState::Connected {
            return Err(ConnectError::SessionUnusable(format!(
                "cannot log in: session is {:?}",
                self.state
            )));
        }
        let username_marker = self.profile.username_marker.clone();
        let password_marker = self.profile.password_marker.clone();
        let answer_username = self.profile.username_required && !username_marker.is_empty();

        let mut state = LoginState::AwaitingPrompt;
        let mut iterations = 0;

        self.pause(0.5).await;
        while iterations < LOGIN_MAX_ITERATIONS {
            let output = self.read_channel().await?;
            iterations += 1;

            if output.is_empty() {
                self.write_channel(RETURN).await?;
                self.pause(1.5).await;
                continue;
            }

            if answer_username && output.contains(&username_marker) {
                debug!("{} username prompt seen", self.device_addr);
                self.write_channel(&format!("{}{RETURN}", credentials.username))
                    .await?;
                state = LoginState::UsernameSubmitted;
            } else if output.contains(&password_marker) {
                debug!("{} password prompt seen", self.device_addr);
                self.write_secret(&credentials.password).await?;
                state = LoginState::PasswordSubmitted;
                break;
            }
            self.pause(1.0).await;
        }

        let report = LoginReport { state, iterations };
        if report.completed() {
            self.state = SessionState::LoggedIn;
        } else {
            warn!(
                "{} interactive login gave up after {} attempts in state {:?}",
                self.device_addr, iterations, state
            );
        }
        self.record(SessionEvent::LoginFinished { state, iterations });
        Ok(report)
    }
}
