use super::*;

/// Upper bound on polls made by the read-until helpers.
const READ_LOOPS: usize = 150;

/// Upper bound on consecutive reads when discarding buffered output.
const CLEAR_BUFFER_READS: usize = 50;

impl Session<ShellChannel> {
    /// Connects over SSH, negotiates authentication and opens a PTY shell.
    ///
    /// The returned session is connected but not prepared; call
    /// [`establish`](Session::establish) next.
    pub async fn connect_ssh(
        host: &str,
        port: u16,
        credentials: &Credentials,
        options: &SessionOptions,
    ) -> Result<Self, ConnectError> {
        let profile = options.resolve_profile()?;
        let device_addr = format!("{}@{host}:{port}", credentials.username);

        let config = Arc::new(russh::client::Config {
            preferred: options.security.preferred(),
            inactivity_timeout: Some(Duration::from_secs(60)),
            ..Default::default()
        });
        let verifier = HostKeyVerifier::new(host, port, options.security.host_key_policy);

        let mut handle = russh::client::connect(config, (host, port), verifier).await?;
        debug!("{} TCP connection successful", device_addr);

        AuthNegotiator::for_profile(&profile)
            .ensure_authenticated(&mut handle, credentials)
            .await?;
        debug!("{} Authentication successful", device_addr);

        let channel = ShellChannel::open_ssh(handle, &device_addr).await?;
        Ok(Session::new(channel, profile, options.delay_factor)?.with_device_addr(device_addr))
    }

    /// Connects over Telnet. Credentials are supplied later by the
    /// interactive login.
    pub async fn connect_telnet(
        host: &str,
        port: u16,
        options: &SessionOptions,
    ) -> Result<Self, ConnectError> {
        let profile = options.resolve_profile()?;
        let device_addr = format!("{host}:{port}");
        let channel = ShellChannel::open_telnet(host, port, &device_addr).await?;
        Ok(Session::new(channel, profile, options.delay_factor)?.with_device_addr(device_addr))
    }
}

impl<C: ChannelIo> Session<C> {
    /// Reads whatever the device has sent since the last read.
    ///
    /// Escape sequences are stripped once `ansi_escape_codes` is enabled.
    pub async fn read_channel(&mut self) -> Result<String, ConnectError> {
        let chunk = self.channel.read_available().await?;
        if chunk.is_empty() {
            return Ok(chunk);
        }
        trace!("{:?}", chunk);
        if let Some(recorder) = self.recorder.as_ref() {
            let _ = recorder.record_raw_chunk(chunk.clone());
        }
        if self.ansi_escape_codes {
            Ok(device::strip_ansi_escape_codes(&chunk))
        } else {
            Ok(chunk)
        }
    }

    /// Sends raw data to the device.
    pub async fn write_channel(&mut self, data: &str) -> Result<(), ConnectError> {
        if let Some(recorder) = self.recorder.as_ref() {
            let _ = recorder.record_input(data, false);
        }
        self.channel.write(data).await
    }

    /// Sends a secret followed by a return, keeping it out of recordings.
    pub(super) async fn write_secret(&mut self, secret: &str) -> Result<(), ConnectError> {
        if let Some(recorder) = self.recorder.as_ref() {
            let _ = recorder.record_input(secret, true);
        }
        self.channel.write(&format!("{secret}{RETURN}")).await
    }

    /// Discards everything currently buffered on the channel.
    pub async fn clear_buffer(&mut self) -> Result<String, ConnectError> {
        let mut discarded = String::new();
        for _ in 0..CLEAR_BUFFER_READS {
            let chunk = self.read_channel().await?;
            if chunk.is_empty() {
                break;
            }
            discarded.push_str(&chunk);
        }
        Ok(discarded)
    }

    /// Polls the channel until `matches` accepts the accumulated output.
    ///
    /// Polls every `0.1 * delay_factor` seconds, at most [`READ_LOOPS`] times.
    async fn read_until<F>(&mut self, matches: F) -> Result<String, ConnectError>
    where
        F: Fn(&str) -> bool,
    {
        let mut output = String::new();
        for _ in 0..READ_LOOPS {
            output.push_str(&self.read_channel().await?);
            if matches(&output) {
                return Ok(output);
            }
            self.pause(0.1).await;
        }
        Err(ConnectError::ReadTimeout(output))
    }

    /// Reads until `pattern` matches the accumulated output.
    pub async fn read_until_pattern(&mut self, pattern: &Regex) -> Result<String, ConnectError> {
        self.read_until(|output| pattern.is_match(output)).await
    }

    /// Reads until the device prompt (in any mode) ends the output.
    pub async fn read_until_prompt(&mut self) -> Result<String, ConnectError> {
        let prompt = self.prompt_regex()?;
        self.read_until(|output| prompt.is_match(output)).await
    }

    /// Reads until either the prompt or `pattern` shows up.
    pub async fn read_until_prompt_or_pattern(
        &mut self,
        pattern: &Regex,
    ) -> Result<String, ConnectError> {
        let prompt = self.prompt_regex()?;
        self.read_until(|output| prompt.is_match(output) || pattern.is_match(output))
            .await
    }

    /// Regex matching the base prompt in any mode.
    pub(super) fn prompt_regex(&self) -> Result<Regex, ConnectError> {
        if self.base_prompt.is_empty() {
            return Err(ConnectError::PromptDetectionFailed(
                "base prompt has not been detected".to_string(),
            ));
        }
        device::prompt_regex(&self.base_prompt, &self.profile)
    }

    /// Runs a command and returns its output without echo or prompt.
    pub async fn send_command(&mut self, command: &str) -> Result<Output, ConnectError> {
        self.ensure_usable("send a command")?;
        let prompt = self.prompt_regex()?;
        self.clear_buffer().await?;
        self.write_channel(&format!("{}{RETURN}", command.trim_end()))
            .await?;
        let all = self.read_until_prompt().await?;

        let body = device::strip_command_echo(&all, command);
        let content = device::strip_trailing_prompt(body, &prompt).to_string();
        let output = Output {
            content,
            prompt: device::extract_prompt(&all),
            all,
        };
        self.record(SessionEvent::CommandOutput {
            command: command.to_string(),
            content: output.content.clone(),
            prompt: output.prompt.clone(),
        });
        Ok(output)
    }

    /// Leaves the device politely and closes the transport.
    ///
    /// The session is unusable afterwards.
    pub async fn close(&mut self) -> Result<(), ConnectError> {
        debug!("{} closing session", self.device_addr);
        if self.state == SessionState::Closed {
            return Ok(());
        }
        if self.channel.is_connected() {
            if let Err(e) = self.channel.write(&format!("exit{RETURN}")).await {
                debug!("Failed to send exit command: {:?}", e);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        let result = self.channel.close().await;
        self.state = SessionState::Closed;
        self.record(SessionEvent::ConnectionClosed {
            reason: "client_close_called".to_string(),
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates;

    fn ready_session(channel: ScriptedChannel) -> Session<ScriptedChannel> {
        let mut session =
            Session::new(channel, templates::dell_powerconnect().expect("profile"), 1.0)
                .expect("session");
        session.base_prompt = "switch1#".to_string();
        session.state = SessionState::Ready;
        session
    }

    #[tokio::test(start_paused = true)]
    async fn send_command_strips_echo_and_prompt() {
        let channel = ScriptedChannel::new().on(
            "show vlan\n",
            "show vlan\r\nVLAN  Name\r\n1     default\r\nswitch1#",
        );
        let mut session = ready_session(channel);

        let output = session.send_command("show vlan").await.expect("command");
        assert_eq!(output.content, "VLAN  Name\r\n1     default");
        assert_eq!(output.prompt.as_deref(), Some("switch1#"));
    }

    #[tokio::test(start_paused = true)]
    async fn read_until_prompt_times_out_with_partial_output() {
        let channel = ScriptedChannel::new().with_pending("partial output");
        let mut session = ready_session(channel);

        let err = session.read_until_prompt().await.expect_err("timeout");
        match err {
            ConnectError::ReadTimeout(captured) => assert_eq!(captured, "partial output"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(session.channel().reads(), READ_LOOPS);
    }

    #[tokio::test(start_paused = true)]
    async fn ansi_codes_are_stripped_when_enabled() {
        let channel = ScriptedChannel::new().with_pending("\x1b[1mswitch1#\x1b[0m");
        let mut session = ready_session(channel);
        session.set_ansi_escape_codes(true);

        assert_eq!(session.read_channel().await.expect("read"), "switch1#");
    }

    #[tokio::test(start_paused = true)]
    async fn closed_transport_surfaces_as_error() {
        let mut channel = ScriptedChannel::new();
        channel.close().await.expect("close");
        let mut session = ready_session(channel);

        assert!(matches!(
            session.read_channel().await,
            Err(ConnectError::TransportClosed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn closed_session_rejects_commands() {
        let mut session = ready_session(ScriptedChannel::new().with_prompt("switch1#"));
        session.close().await.expect("close");

        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.channel().writes(), &["exit\n".to_string()]);
        assert!(matches!(
            session.send_command("show version").await,
            Err(ConnectError::SessionUnusable(_))
        ));
    }
}
