//! Device family capabilities and prompt text handling.
//!
//! A [`DeviceProfile`] captures everything that differs between device
//! families during session establishment: prompt terminators, the commands
//! used for elevation, paging and configuration mode, and the literal markers
//! printed by the interactive login. The free functions in this module are
//! the pure text routines shared by prompt detection and output capture.

use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ConnectError;

/// Capability record for one device family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeviceProfile {
    /// Template name the profile was built from.
    pub name: String,
    /// Terminator of the unprivileged prompt, e.g. `>`.
    pub pri_prompt_terminator: char,
    /// Terminator of the privileged prompt, e.g. `#`.
    pub alt_prompt_terminator: char,
    /// Command that makes long output stream without pausing.
    pub paging_disable_command: String,
    /// Command that enters privileged mode.
    pub enable_command: String,
    /// Regex matching the enable password request.
    pub enable_password_pattern: String,
    /// Command that enters configuration mode.
    pub config_command: String,
    /// Command that leaves configuration mode.
    pub exit_config_command: String,
    /// Trailing fragment of the prompt while in configuration mode.
    pub config_mode_check: String,
    /// Literal printed by the device when it wants a username.
    pub username_marker: String,
    /// Literal printed by the device when it wants a password.
    pub password_marker: String,
    /// Whether the interactive login answers the username marker.
    pub username_required: bool,
    /// Whether SSH authentication tries the `none` method first.
    pub try_none_auth: bool,
    /// Whether the device asks for credentials inside the shell after SSH
    /// authentication completed.
    pub interactive_login: bool,
}

impl DeviceProfile {
    /// Rejects profiles that would make prompt detection ambiguous.
    pub fn validate(&self) -> Result<(), ConnectError> {
        if self.pri_prompt_terminator == self.alt_prompt_terminator {
            return Err(ConnectError::InvalidConfig(format!(
                "prompt terminators must differ, both are '{}'",
                self.pri_prompt_terminator
            )));
        }
        if self.pri_prompt_terminator.is_whitespace() || self.alt_prompt_terminator.is_whitespace()
        {
            return Err(ConnectError::InvalidConfig(
                "prompt terminators must not be whitespace".to_string(),
            ));
        }
        if self.password_marker.is_empty() {
            return Err(ConnectError::InvalidConfig(
                "password marker must not be empty".to_string(),
            ));
        }
        Regex::new(&self.enable_password_pattern).map_err(|e| {
            ConnectError::InvalidConfig(format!("invalid enable password pattern: {e}"))
        })?;
        Ok(())
    }

    /// Returns true if `c` terminates a prompt of this family.
    pub fn is_terminator(&self, c: char) -> bool {
        c == self.pri_prompt_terminator || c == self.alt_prompt_terminator
    }
}

/// CSI/OSC escape sequences and the lone control codes terminals send.
static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[()][A-Za-z0-9]|\x1b[=>78DEHM]")
        .expect("valid ansi escape regex")
});

/// Removes terminal escape sequences from device output.
pub fn strip_ansi_escape_codes(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

/// Converts `\r\n`, `\n\r` and lone `\r` line endings into `\n`.
pub fn normalize_linefeeds(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace("\n\r", "\n")
        .replace('\r', "\n")
}

/// Extracts the trailing prompt line from echoed output.
///
/// Surrounding whitespace is removed first, then everything up to the last
/// line break. Returns `None` when nothing printable remains.
pub fn extract_prompt(output: &str) -> Option<String> {
    let normalized = normalize_linefeeds(output);
    let trimmed = normalized.trim();
    let last = trimmed.rsplit('\n').next().unwrap_or(trimmed).trim();
    if last.is_empty() {
        None
    } else {
        Some(last.to_string())
    }
}

/// Returns the prompt without its trailing terminator, if it has one.
pub fn prompt_stem<'a>(prompt: &'a str, profile: &DeviceProfile) -> &'a str {
    match prompt.chars().last() {
        Some(c) if profile.is_terminator(c) => &prompt[..prompt.len() - c.len_utf8()],
        _ => prompt,
    }
}

/// Builds a regex matching any prompt of this device at the end of output.
///
/// Mode suffixes such as `(config)` may appear between the stem and the
/// terminator, so `switch1#` also matches `switch1(config-if)#`.
pub fn prompt_regex(prompt: &str, profile: &DeviceProfile) -> Result<Regex, ConnectError> {
    let stem = prompt_stem(prompt, profile);
    let pattern = format!(
        r"{}[^\r\n]*[{}{}]\s*$",
        regex::escape(stem),
        regex::escape(&profile.pri_prompt_terminator.to_string()),
        regex::escape(&profile.alt_prompt_terminator.to_string()),
    );
    Regex::new(&pattern).map_err(|e| ConnectError::InternalServerError(format!("prompt regex: {e}")))
}

/// Reports whether captured output shows the configuration-mode prompt.
///
/// Trailing whitespace and line breaks left after the prompt are ignored.
pub fn is_in_config_mode(output: &str, expected_suffix: &str) -> bool {
    if expected_suffix.is_empty() {
        return false;
    }
    output.trim_end().ends_with(expected_suffix)
}

/// Removes the echoed command from the start of captured output.
pub fn strip_command_echo<'a>(output: &'a str, command: &str) -> &'a str {
    let command = command.trim_end();
    let trimmed = output.trim_start_matches(['\r', '\n']);
    if !command.is_empty() && trimmed.starts_with(command) {
        trimmed[command.len()..].trim_start_matches(['\r', '\n'])
    } else {
        output
    }
}

/// Removes the trailing prompt line from captured output.
pub fn strip_trailing_prompt<'a>(output: &'a str, prompt: &Regex) -> &'a str {
    let trimmed = output.trim_end();
    let last_line_start = trimmed.rfind('\n').map(|pos| pos + 1).unwrap_or(0);
    if prompt.is_match(&trimmed[last_line_start..]) {
        trimmed[..last_line_start].trim_end_matches(['\r', '\n'])
    } else {
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates;

    fn powerconnect() -> DeviceProfile {
        templates::profile("dell_powerconnect").expect("builtin template")
    }

    #[test]
    fn extract_prompt_takes_last_trimmed_line() {
        assert_eq!(extract_prompt("  switch1#  \n").as_deref(), Some("switch1#"));
        assert_eq!(
            extract_prompt("\r\nbanner line\r\nswitch1>").as_deref(),
            Some("switch1>")
        );
        assert_eq!(extract_prompt(" \r\n \n"), None);
    }

    #[test]
    fn normalize_linefeeds_handles_mixed_endings() {
        assert_eq!(normalize_linefeeds("a\r\nb\n\rc\rd"), "a\nb\nc\nd");
    }

    #[test]
    fn ansi_sequences_are_removed() {
        let raw = "\x1b[2J\x1b[1;1Hswitch1\x1b[0m#";
        assert_eq!(strip_ansi_escape_codes(raw), "switch1#");
    }

    #[test]
    fn prompt_stem_drops_either_terminator() {
        let profile = powerconnect();
        assert_eq!(prompt_stem("switch1#", &profile), "switch1");
        assert_eq!(prompt_stem("switch1>", &profile), "switch1");
        assert_eq!(prompt_stem("switch1", &profile), "switch1");
    }

    #[test]
    fn prompt_regex_matches_mode_suffixes() {
        let profile = powerconnect();
        let re = prompt_regex("switch1#", &profile).expect("regex");
        assert!(re.is_match("show run\r\nswitch1#"));
        assert!(re.is_match("switch1(config)# "));
        assert!(re.is_match("switch1>"));
        assert!(!re.is_match("Password:"));
        assert!(!re.is_match("switch1# more text"));
    }

    #[test]
    fn config_mode_detection() {
        assert!(is_in_config_mode("switch1(config)#", "(config)#"));
        assert!(is_in_config_mode("conf t\r\nswitch1(config)#\r\n", "(config)#"));
        assert!(!is_in_config_mode("switch1#", "(config)#"));
        assert!(!is_in_config_mode("switch1(config-if)#", "(config)#"));
        assert!(!is_in_config_mode("switch1#", ""));
    }

    #[test]
    fn echo_and_prompt_are_stripped() {
        let profile = powerconnect();
        let re = prompt_regex("switch1#", &profile).expect("regex");
        let raw = "show vlan\r\nVLAN 1 default\r\nVLAN 10 users\r\nswitch1#";
        let body = strip_command_echo(raw, "show vlan");
        assert_eq!(strip_trailing_prompt(body, &re), "VLAN 1 default\r\nVLAN 10 users");
    }

    #[test]
    fn output_without_prompt_is_left_alone() {
        let profile = powerconnect();
        let re = prompt_regex("switch1#", &profile).expect("regex");
        assert_eq!(strip_trailing_prompt("partial line", &re), "partial line");
    }

    #[test]
    fn profile_validation_rejects_bad_pattern() {
        let mut profile = powerconnect();
        profile.enable_password_pattern = "(".to_string();
        assert!(matches!(
            profile.validate(),
            Err(ConnectError::InvalidConfig(_))
        ));
    }
}
