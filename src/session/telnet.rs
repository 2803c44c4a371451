//! Minimal Telnet option handling.
//!
//! Devices open a Telnet session with a burst of option negotiation. The
//! filter removes every command sequence from the byte stream, answers
//! negotiation so the peer stops waiting, and hands the remaining bytes to
//! the session. Only ECHO and SUPPRESS-GO-AHEAD are agreed to; everything
//! else is refused.

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const OPT_ECHO: u8 = 1;
const OPT_SUPPRESS_GO_AHEAD: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Data,
    Iac,
    Negotiate(u8),
    Subnegotiation,
    SubnegotiationIac,
}

/// Result of feeding bytes through the filter.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Filtered {
    /// Payload bytes meant for the session.
    pub data: Vec<u8>,
    /// Negotiation answers to write back to the peer.
    pub replies: Vec<u8>,
}

/// Stateful Telnet command stripper. Sequences may be split across reads.
#[derive(Debug, Clone)]
pub struct TelnetFilter {
    state: ParseState,
}

impl Default for TelnetFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl TelnetFilter {
    pub fn new() -> Self {
        Self {
            state: ParseState::Data,
        }
    }

    /// Strips commands from `input` and collects the answers they require.
    pub fn feed(&mut self, input: &[u8]) -> Filtered {
        let mut out = Filtered::default();
        for &byte in input {
            self.state = match self.state {
                ParseState::Data => {
                    if byte == IAC {
                        ParseState::Iac
                    } else {
                        out.data.push(byte);
                        ParseState::Data
                    }
                }
                ParseState::Iac => match byte {
                    IAC => {
                        out.data.push(IAC);
                        ParseState::Data
                    }
                    WILL | WONT | DO | DONT => ParseState::Negotiate(byte),
                    SB => ParseState::Subnegotiation,
                    // NOP, GA, AYT and friends carry no option byte.
                    _ => ParseState::Data,
                },
                ParseState::Negotiate(verb) => {
                    if let Some(answer) = Self::answer(verb, byte) {
                        out.replies.extend_from_slice(&[IAC, answer, byte]);
                    }
                    ParseState::Data
                }
                ParseState::Subnegotiation => {
                    if byte == IAC {
                        ParseState::SubnegotiationIac
                    } else {
                        ParseState::Subnegotiation
                    }
                }
                ParseState::SubnegotiationIac => {
                    if byte == SE {
                        ParseState::Data
                    } else {
                        ParseState::Subnegotiation
                    }
                }
            };
        }
        out
    }

    fn answer(verb: u8, option: u8) -> Option<u8> {
        let accepted = matches!(option, OPT_ECHO | OPT_SUPPRESS_GO_AHEAD);
        match verb {
            WILL if accepted => Some(DO),
            WILL => Some(DONT),
            DO if option == OPT_SUPPRESS_GO_AHEAD => Some(WILL),
            DO => Some(WONT),
            // WONT/DONT need no answer when nothing was enabled.
            _ => None,
        }
    }

    /// Doubles IAC bytes in outgoing data.
    pub fn escape(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len());
        for &byte in data {
            out.push(byte);
            if byte == IAC {
                out.push(IAC);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        let mut filter = TelnetFilter::new();
        let out = filter.feed(b"User Name:");
        assert_eq!(out.data, b"User Name:");
        assert!(out.replies.is_empty());
    }

    #[test]
    fn negotiation_is_stripped_and_answered() {
        let mut filter = TelnetFilter::new();
        // WILL ECHO, DO TERMINAL-TYPE, WILL SGA, then text.
        let input = [IAC, WILL, 1, IAC, DO, 24, IAC, WILL, 3, b'o', b'k'];
        let out = filter.feed(&input);

        assert_eq!(out.data, b"ok");
        assert_eq!(
            out.replies,
            vec![IAC, DO, 1, IAC, WONT, 24, IAC, DO, 3]
        );
    }

    #[test]
    fn sequences_split_across_reads_are_handled() {
        let mut filter = TelnetFilter::new();
        let first = filter.feed(&[b'a', IAC]);
        let second = filter.feed(&[DO, 31, b'b']);

        assert_eq!(first.data, b"a");
        assert_eq!(second.data, b"b");
        assert_eq!(second.replies, vec![IAC, WONT, 31]);
    }

    #[test]
    fn subnegotiation_is_dropped() {
        let mut filter = TelnetFilter::new();
        let input = [IAC, SB, 24, 1, IAC, SE, b'x'];
        let out = filter.feed(&input);
        assert_eq!(out.data, b"x");
        assert!(out.replies.is_empty());
    }

    #[test]
    fn escaped_iac_is_data() {
        let mut filter = TelnetFilter::new();
        let out = filter.feed(&[IAC, IAC, b'z']);
        assert_eq!(out.data, vec![IAC, b'z']);
        assert_eq!(TelnetFilter::escape(&[IAC, b'z']), vec![IAC, IAC, b'z']);
    }
}
