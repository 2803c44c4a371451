use super::*;

/// Extra attempts made when the first return produced no echo.
const FIND_PROMPT_RETRIES: usize = 10;

impl<C: ChannelIo> Session<C> {
    /// Sends a return and extracts the prompt the device prints back.
    ///
    /// Whitespace is trimmed and only the last line is kept. An empty echo
    /// is retried with a fresh return up to ten more times before failing.
    pub async fn find_prompt(&mut self) -> Result<String, ConnectError> {
        self.clear_buffer().await?;
        self.write_channel(RETURN).await?;
        self.pause(0.1).await;

        let mut prompt = device::extract_prompt(&self.read_channel().await?);
        let mut retries = 0;
        while prompt.is_none() && retries < FIND_PROMPT_RETRIES {
            prompt = device::extract_prompt(&self.read_channel().await?);
            if prompt.is_none() {
                self.write_channel(RETURN).await?;
                self.pause(0.1).await;
            }
            retries += 1;
        }

        let prompt = prompt.ok_or_else(|| {
            ConnectError::PromptDetectionFailed(format!(
                "{} sent no echo after {} returns",
                self.device_addr,
                FIND_PROMPT_RETRIES + 1
            ))
        })?;

        self.pause(0.1).await;
        self.clear_buffer().await?;
        Ok(prompt)
    }

    /// Detects and stores the base prompt used to delimit command output.
    ///
    /// The prompt must end with one of the profile's terminators. Calling
    /// this again against an unchanged device yields the same string.
    pub async fn set_base_prompt(&mut self) -> Result<String, ConnectError> {
        let prompt = self.find_prompt().await?;
        let prompt = prompt.trim().to_string();

        match prompt.chars().last() {
            Some(c) if self.profile.is_terminator(c) => {}
            _ => {
                return Err(ConnectError::PromptDetectionFailed(format!(
                    "prompt {:?} does not end with '{}' or '{}'",
                    prompt, self.profile.pri_prompt_terminator, self.profile.alt_prompt_terminator
                )));
            }
        }

        if self.base_prompt != prompt {
            debug!("{} base prompt set to {:?}", self.device_addr, prompt);
            self.record(SessionEvent::PromptChanged {
                prompt: prompt.clone(),
            });
        }
        self.base_prompt = prompt.clone();
        Ok(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates;

    fn session(channel: ScriptedChannel) -> Session<ScriptedChannel> {
        Session::new(channel, templates::dell_powerconnect().expect("profile"), 1.0)
            .expect("session")
    }

    #[tokio::test(start_paused = true)]
    async fn set_base_prompt_is_idempotent() {
        let channel = ScriptedChannel::new()
            .on("\n", "  switch1#  \n")
            .on("\n", "  switch1#  \n");
        let mut session = session(channel);

        let first = session.set_base_prompt().await.expect("first");
        let second = session.set_base_prompt().await.expect("second");

        assert_eq!(first, "switch1#");
        assert_eq!(second, "switch1#");
        assert_eq!(session.base_prompt(), "switch1#");
    }

    #[tokio::test(start_paused = true)]
    async fn stale_output_is_discarded_before_probing() {
        let channel = ScriptedChannel::new()
            .with_pending("Last login: yesterday\r\nold>")
            .with_prompt("switch1>");
        let mut session = session(channel);

        assert_eq!(session.set_base_prompt().await.expect("prompt"), "switch1>");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_echo_fails_after_retries() {
        let mut session = session(ScriptedChannel::new());

        let err = session.set_base_prompt().await.expect_err("no prompt");

        assert!(matches!(err, ConnectError::PromptDetectionFailed(_)));
        assert_eq!(session.base_prompt(), "");
        assert_eq!(
            session.channel().writes().len(),
            1 + FIND_PROMPT_RETRIES
        );
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_echo_is_picked_up_on_retry() {
        let channel = ScriptedChannel::new()
            .on("\n", "")
            .on("\n", "\r\nswitch1#");
        let mut session = session(channel);

        assert_eq!(session.set_base_prompt().await.expect("prompt"), "switch1#");
        assert_eq!(session.channel().writes().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn prompt_without_terminator_is_rejected() {
        let channel = ScriptedChannel::new().with_prompt("Press any key to continue");
        let mut session = session(channel);

        let err = session.set_base_prompt().await.expect_err("bad prompt");
        assert!(matches!(err, ConnectError::PromptDetectionFailed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn ansi_decorated_prompt_is_cleaned() {
        let channel = ScriptedChannel::new().on("\n", "\r\n\x1b[7mswitch1#\x1b[0m ");
        let mut session = session(channel);
        session.set_ansi_escape_codes(true);

        assert_eq!(session.set_base_prompt().await.expect("prompt"), "switch1#");
    }
}
