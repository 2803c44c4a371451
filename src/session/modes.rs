use super::*;

fn escalation_error(err: ConnectError) -> ConnectError {
    match err {
        ConnectError::ReadTimeout(output) => {
            ConnectError::EscalationFailed(format!("no prompt after enable: {output:?}"))
        }
        other => other,
    }
}

impl<C: ChannelIo> Session<C> {
    /// Returns true if the current prompt ends with the privileged terminator.
    pub async fn check_enable_mode(&mut self) -> Result<bool, ConnectError> {
        self.write_channel(RETURN).await?;
        let output = self.read_until_prompt().await?;
        let privileged = self.profile.alt_prompt_terminator;
        Ok(device::extract_prompt(&output).is_some_and(|prompt| prompt.ends_with(privileged)))
    }

    /// Elevates to privileged mode, answering the password request with
    /// `secret` when the device asks for one.
    pub async fn enable(&mut self, secret: Option<&str>) -> Result<String, ConnectError> {
        if self.check_enable_mode().await? {
            return Ok(String::new());
        }

        let pattern = Regex::new(&self.profile.enable_password_pattern).map_err(|e| {
            ConnectError::InvalidConfig(format!("invalid enable password pattern: {e}"))
        })?;
        let command = format!("{}{RETURN}", self.profile.enable_command);
        self.write_channel(&command).await?;
        let mut output = self
            .read_until_prompt_or_pattern(&pattern)
            .await
            .map_err(escalation_error)?;

        if pattern.is_match(&output) {
            debug!("{} enable password requested", self.device_addr);
            self.write_secret(secret.unwrap_or_default()).await?;
            output.push_str(&self.read_until_prompt().await.map_err(escalation_error)?);
        }

        if !self.check_enable_mode().await.map_err(escalation_error)? {
            return Err(ConnectError::EscalationFailed(format!(
                "device stayed unprivileged after '{}': {:?}",
                self.profile.enable_command,
                output.trim()
            )));
        }
        debug!("{} privileged mode entered", self.device_addr);
        Ok(output)
    }

    /// Returns true if the prompt shows configuration mode.
    pub async fn check_config_mode(&mut self) -> Result<bool, ConnectError> {
        self.write_channel(RETURN).await?;
        let output = self.read_until_prompt().await?;
        Ok(device::is_in_config_mode(
            &output,
            &self.profile.config_mode_check,
        ))
    }

    /// Enters configuration mode unless already there.
    pub async fn config_mode(&mut self) -> Result<String, ConnectError> {
        self.ensure_usable("enter configuration mode")?;
        if self.check_config_mode().await? {
            return Ok(String::new());
        }
        let command = format!("{}{RETURN}", self.profile.config_command);
        self.write_channel(&command).await?;
        let output = self.read_until_prompt().await?;
        if !self.check_config_mode().await? {
            return Err(ConnectError::ModeChangeFailed(format!(
                "'{}' did not enter configuration mode",
                self.profile.config_command
            )));
        }
        Ok(output)
    }

    /// Leaves configuration mode if currently in it.
    pub async fn exit_config_mode(&mut self) -> Result<String, ConnectError> {
        self.ensure_usable("leave configuration mode")?;
        if !self.check_config_mode().await? {
            return Ok(String::new());
        }
        let command = format!("{}{RETURN}", self.profile.exit_config_command);
        self.write_channel(&command).await?;
        let output = self.read_until_prompt().await?;
        if self.check_config_mode().await? {
            return Err(ConnectError::ModeChangeFailed(format!(
                "'{}' did not leave configuration mode",
                self.profile.exit_config_command
            )));
        }
        Ok(output)
    }
}
