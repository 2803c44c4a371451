use super::*;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

/// Placeholder stored instead of secrets written to the device.
pub const REDACTED: &str = "******";

/// Session recording granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub enum SessionRecordLevel {
    /// Disable recording.
    Off,
    /// Record key events only.
    KeyEventsOnly,
    /// Record key events, raw chunks and sent input.
    #[default]
    Full,
}

/// A single recorded session event.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionRecordEntry {
    pub ts_ms: u128,
    pub event: SessionEvent,
}

/// Supported recorded event types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    ConnectionEstablished {
        device_addr: String,
        transport: TransportKind,
    },
    RawChunk {
        data: String,
    },
    InputSent {
        data: String,
    },
    LoginFinished {
        state: LoginState,
        iterations: usize,
    },
    PromptChanged {
        prompt: String,
    },
    PreparationFinished {
        prompt: String,
    },
    CommandOutput {
        command: String,
        content: String,
        #[serde(default)]
        prompt: Option<String>,
    },
    ConnectionClosed {
        reason: String,
    },
}

/// In-memory session recorder.
///
/// Cloning shares the underlying buffer, so a caller can keep one handle while
/// the session writes through another.
#[derive(Debug, Clone)]
pub struct SessionRecorder {
    level: SessionRecordLevel,
    entries: Arc<Mutex<Vec<SessionRecordEntry>>>,
}

impl SessionRecorder {
    pub fn new(level: SessionRecordLevel) -> Self {
        Self {
            level,
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn level(&self) -> SessionRecordLevel {
        self.level
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<SessionRecordEntry>>, ConnectError> {
        self.entries
            .lock()
            .map_err(|e| ConnectError::InternalServerError(format!("recorder poisoned: {e}")))
    }

    /// Appends a lifecycle event unless recording is off.
    pub fn record_event(&self, event: SessionEvent) -> Result<(), ConnectError> {
        if self.level == SessionRecordLevel::Off {
            return Ok(());
        }
        let ts_ms = now_ms();
        self.lock()?.push(SessionRecordEntry { ts_ms, event });
        Ok(())
    }

    /// Appends device output. Only kept at [`SessionRecordLevel::Full`].
    pub fn record_raw_chunk(&self, data: String) -> Result<(), ConnectError> {
        match self.level {
            SessionRecordLevel::Full => self.record_event(SessionEvent::RawChunk { data }),
            _ => Ok(()),
        }
    }

    /// Appends data sent to the device, replacing secrets with [`REDACTED`].
    /// Only kept at [`SessionRecordLevel::Full`].
    pub fn record_input(&self, data: &str, secret: bool) -> Result<(), ConnectError> {
        if self.level != SessionRecordLevel::Full {
            return Ok(());
        }
        let data = if secret { REDACTED } else { data };
        self.record_event(SessionEvent::InputSent {
            data: data.to_string(),
        })
    }

    pub fn entries(&self) -> Result<Vec<SessionRecordEntry>, ConnectError> {
        Ok(self.lock()?.clone())
    }

    /// Recorded events in order, timestamps dropped.
    pub fn events(&self) -> Result<Vec<SessionEvent>, ConnectError> {
        Ok(self.lock()?.iter().map(|entry| entry.event.clone()).collect())
    }

    pub fn clear(&self) -> Result<(), ConnectError> {
        self.lock()?.clear();
        Ok(())
    }

    /// One JSON object per line, oldest first.
    pub fn to_jsonl(&self) -> Result<String, ConnectError> {
        let lines = self
            .lock()?
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ConnectError::InternalServerError(format!("cannot encode record: {e}")))?;
        Ok(lines.join("\n"))
    }

    /// Loads a recording written by [`to_jsonl`](Self::to_jsonl). Blank
    /// lines are skipped; the result records at `Full` level.
    pub fn from_jsonl(jsonl: &str) -> Result<Self, ConnectError> {
        let entries = jsonl
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str::<SessionRecordEntry>(line).map_err(|e| {
                    ConnectError::InternalServerError(format!(
                        "cannot decode record on line {}: {e}",
                        idx + 1
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            level: SessionRecordLevel::Full,
            entries: Arc::new(Mutex::new(entries)),
        })
    }
}

impl Default for SessionRecorder {
    fn default() -> Self {
        Self::new(SessionRecordLevel::Full)
    }
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_jsonl_restores_events() {
        let recorder = SessionRecorder::new(SessionRecordLevel::Full);
        recorder
            .record_event(SessionEvent::PromptChanged {
                prompt: "switch1#".to_string(),
            })
            .expect("record prompt");
        recorder
            .record_event(SessionEvent::LoginFinished {
                state: LoginState::PasswordSubmitted,
                iterations: 2,
            })
            .expect("record login");

        let jsonl = recorder.to_jsonl().expect("encode jsonl");
        assert!(jsonl.contains(r#""kind":"login_finished""#));

        let restored = SessionRecorder::from_jsonl(&jsonl).expect("decode jsonl");
        let events = restored.events().expect("events");
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            SessionEvent::PromptChanged {
                prompt: "switch1#".to_string()
            }
        );
    }

    #[test]
    fn secrets_are_redacted() {
        let recorder = SessionRecorder::new(SessionRecordLevel::Full);
        recorder.record_input("secret\n", true).expect("record");
        recorder.record_input("admin\n", false).expect("record");

        let jsonl = recorder.to_jsonl().expect("encode");
        assert!(!jsonl.contains("secret"));
        assert_eq!(
            recorder.events().expect("events")[0],
            SessionEvent::InputSent {
                data: REDACTED.to_string()
            }
        );
    }

    #[test]
    fn key_events_level_skips_chunks_and_input() {
        let recorder = SessionRecorder::new(SessionRecordLevel::KeyEventsOnly);
        recorder
            .record_raw_chunk("banner".to_string())
            .expect("chunk");
        recorder.record_input("admin\n", false).expect("input");
        recorder
            .record_event(SessionEvent::PreparationFinished {
                prompt: "switch1#".to_string(),
            })
            .expect("event");

        assert_eq!(recorder.entries().expect("entries").len(), 1);
    }

    #[test]
    fn off_level_records_nothing() {
        let recorder = SessionRecorder::new(SessionRecordLevel::Off);
        recorder
            .record_event(SessionEvent::ConnectionClosed {
                reason: "test".to_string(),
            })
            .expect("event");
        assert!(recorder.entries().expect("entries").is_empty());
    }

    #[test]
    fn malformed_jsonl_is_rejected() {
        let err = SessionRecorder::from_jsonl("{not json").expect_err("decode");
        assert!(matches!(err, ConnectError::InternalServerError(_)));
    }
}
