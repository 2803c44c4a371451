use super::*;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
struct ScriptRule {
    /// Exact input that triggers the rule; `None` matches any input.
    input: Option<String>,
    reply: String,
    prompt_after: Option<String>,
    close: bool,
}

/// Deterministic in-memory device for driving a [`Session`] without a network.
///
/// Output is produced three ways: text queued up front with
/// [`with_pending`](Self::with_pending), replies attached to an exact input
/// with [`on`](Self::on), and, when a prompt is set, an automatic echo of
/// any other input followed by the prompt. Every write is logged and every
/// read counted so tests can assert exact interaction sequences.
#[derive(Debug, Clone, Default)]
pub struct ScriptedChannel {
    pending: String,
    prompt: Option<String>,
    rules: VecDeque<ScriptRule>,
    strict_order: bool,
    writes: Vec<String>,
    reads: usize,
    closed: bool,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues output that is available before anything is written.
    pub fn with_pending(mut self, output: impl Into<String>) -> Self {
        self.pending.push_str(&output.into());
        self
    }

    /// Echoes unmatched input followed by `prompt`, like a live shell.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Replies with `reply` the first time `input` is written.
    pub fn on(self, input: impl Into<String>, reply: impl Into<String>) -> Self {
        self.push_rule(Some(input.into()), reply.into(), None, false)
    }

    /// Like [`on`](Self::on), and switches the echo prompt afterwards.
    pub fn on_then_prompt(
        self,
        input: impl Into<String>,
        reply: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        self.push_rule(Some(input.into()), reply.into(), Some(prompt.into()), false)
    }

    /// Closes the channel when `input` is written.
    pub fn close_on(self, input: impl Into<String>) -> Self {
        self.push_rule(Some(input.into()), String::new(), None, true)
    }

    fn push_rule(
        mut self,
        input: Option<String>,
        reply: String,
        prompt_after: Option<String>,
        close: bool,
    ) -> Self {
        self.rules.push_back(ScriptRule {
            input,
            reply,
            prompt_after,
            close,
        });
        self
    }

    /// Builds a channel that replays a recorded session.
    ///
    /// Chunks read before the first input become pending output; chunks read
    /// after an input become that input's reply. Redacted secrets match any
    /// input. Rules are consumed strictly in recorded order.
    pub fn from_recording(recorder: &SessionRecorder) -> Result<Self, ConnectError> {
        let mut channel = Self {
            strict_order: true,
            ..Self::default()
        };
        for event in recorder.events()? {
            match event {
                SessionEvent::InputSent { data } => {
                    let input = if data == REDACTED { None } else { Some(data) };
                    channel.rules.push_back(ScriptRule {
                        input,
                        reply: String::new(),
                        prompt_after: None,
                        close: false,
                    });
                }
                SessionEvent::RawChunk { data } => match channel.rules.back_mut() {
                    Some(rule) => rule.reply.push_str(&data),
                    None => channel.pending.push_str(&data),
                },
                _ => {}
            }
        }
        Ok(channel)
    }

    /// Makes more output available, as if the device printed it.
    pub fn push_output(&mut self, output: &str) {
        self.pending.push_str(output);
    }

    /// Everything written so far, in order.
    pub fn writes(&self) -> &[String] {
        &self.writes
    }

    /// Number of read calls made so far.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Rules that were never triggered.
    pub fn unused_rules(&self) -> usize {
        self.rules.len()
    }

    fn take_rule(&mut self, data: &str) -> Option<ScriptRule> {
        let matches = |rule: &ScriptRule| rule.input.as_deref().is_none_or(|input| input == data);
        if self.strict_order {
            if self.rules.front().is_some_and(matches) {
                return self.rules.pop_front();
            }
            return None;
        }
        let index = self.rules.iter().position(matches)?;
        self.rules.remove(index)
    }
}

impl ChannelIo for ScriptedChannel {
    async fn read_available(&mut self) -> Result<String, ConnectError> {
        self.reads += 1;
        if self.pending.is_empty() && self.closed {
            return Err(ConnectError::TransportClosed);
        }
        Ok(std::mem::take(&mut self.pending))
    }

    async fn write(&mut self, data: &str) -> Result<(), ConnectError> {
        if self.closed {
            return Err(ConnectError::TransportClosed);
        }
        self.writes.push(data.to_string());

        if let Some(rule) = self.take_rule(data) {
            self.pending.push_str(&rule.reply);
            if let Some(prompt) = rule.prompt_after {
                self.prompt = Some(prompt);
            }
            if rule.close {
                self.closed = true;
            }
            return Ok(());
        }

        if let Some(prompt) = self.prompt.as_ref() {
            let line = data.trim_end();
            if !line.is_empty() {
                self.pending.push_str(line);
            }
            self.pending.push_str("\r\n");
            self.pending.push_str(prompt);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ConnectError> {
        self.closed = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.closed
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Scripted
    }
}
