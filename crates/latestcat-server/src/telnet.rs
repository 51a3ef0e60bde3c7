//! Telnet protocol handling (RFC 854).
//!
//! [`TelnetDecoder`] is an incremental byte-at-a-time state machine that
//! separates user data from option negotiation. It understands the two
//! options a session needs from the client: window size (NAWS, RFC 1073)
//! and terminal type (RFC 1091). Everything else is refused.

/// Interpret As Command.
pub const IAC: u8 = 255;
/// Refuse an option on the peer.
pub const DONT: u8 = 254;
/// Request an option on the peer.
pub const DO: u8 = 253;
/// Refuse an option locally.
pub const WONT: u8 = 252;
/// Offer an option locally.
pub const WILL: u8 = 251;
/// Subnegotiation begin.
pub const SB: u8 = 250;
/// Subnegotiation end.
pub const SE: u8 = 240;

/// Telnet option codes.
pub mod option {
    /// Server-side echo.
    pub const ECHO: u8 = 1;
    /// Suppress go-ahead (character mode).
    pub const SUPPRESS_GO_AHEAD: u8 = 3;
    /// Terminal type.
    pub const TERMINAL_TYPE: u8 = 24;
    /// Negotiate about window size.
    pub const NAWS: u8 = 31;
}

const TTYPE_IS: u8 = 0;
const TTYPE_SEND: u8 = 1;

/// Subnegotiation payloads longer than this are truncated.
const MAX_SUBNEGOTIATION: usize = 64;

/// Option negotiation verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Negotiation {
    /// Peer offers an option.
    Will,
    /// Peer refuses an option.
    Wont,
    /// Peer asks us to enable an option.
    Do,
    /// Peer asks us to disable an option.
    Dont,
}

/// Something decoded from the client byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelnetEvent {
    /// One byte of user data. CR LF and CR NUL arrive as a single `\r`.
    Data(u8),
    /// Option negotiation from the peer.
    Negotiate(Negotiation, u8),
    /// Client window size (NAWS).
    WindowSize {
        /// Columns.
        cols: u16,
        /// Rows.
        rows: u16,
    },
    /// Client terminal type (TERMINAL-TYPE IS).
    TerminalType(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum State {
    #[default]
    Data,
    /// Just emitted a CR; swallow a following LF or NUL.
    Cr,
    Iac,
    Negotiate(Negotiation),
    Sub,
    SubIac,
}

/// Incremental telnet decoder.
#[derive(Debug, Default)]
pub struct TelnetDecoder {
    state: State,
    sub: Vec<u8>,
}

impl TelnetDecoder {
    /// Create a decoder in the data state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte.
    pub fn feed(&mut self, byte: u8) -> Option<TelnetEvent> {
        match self.state {
            State::Data => self.data(byte),
            State::Cr => {
                self.state = State::Data;
                if byte == b'\n' || byte == 0 { None } else { self.data(byte) }
            },
            State::Iac => self.command(byte),
            State::Negotiate(verb) => {
                self.state = State::Data;
                Some(TelnetEvent::Negotiate(verb, byte))
            },
            State::Sub => {
                if byte == IAC {
                    self.state = State::SubIac;
                } else {
                    self.push_sub(byte);
                }
                None
            },
            State::SubIac => match byte {
                SE => {
                    self.state = State::Data;
                    self.finish_sub()
                },
                IAC => {
                    self.state = State::Sub;
                    self.push_sub(IAC);
                    None
                },
                // Malformed: drop the subnegotiation and resync
                _ => {
                    self.sub.clear();
                    self.state = State::Data;
                    None
                },
            },
        }
    }

    /// Feed a chunk, collecting every event.
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<TelnetEvent> {
        bytes.iter().filter_map(|&b| self.feed(b)).collect()
    }

    fn data(&mut self, byte: u8) -> Option<TelnetEvent> {
        match byte {
            IAC => {
                self.state = State::Iac;
                None
            },
            b'\r' => {
                self.state = State::Cr;
                Some(TelnetEvent::Data(b'\r'))
            },
            _ => Some(TelnetEvent::Data(byte)),
        }
    }

    fn command(&mut self, byte: u8) -> Option<TelnetEvent> {
        self.state = State::Data;
        match byte {
            IAC => Some(TelnetEvent::Data(IAC)),
            WILL => self.negotiate(Negotiation::Will),
            WONT => self.negotiate(Negotiation::Wont),
            DO => self.negotiate(Negotiation::Do),
            DONT => self.negotiate(Negotiation::Dont),
            SB => {
                self.sub.clear();
                self.state = State::Sub;
                None
            },
            // NOP, GA, AYT and friends carry nothing a session needs
            _ => None,
        }
    }

    fn negotiate(&mut self, verb: Negotiation) -> Option<TelnetEvent> {
        self.state = State::Negotiate(verb);
        None
    }

    fn push_sub(&mut self, byte: u8) {
        if self.sub.len() < MAX_SUBNEGOTIATION {
            self.sub.push(byte);
        }
    }

    fn finish_sub(&mut self) -> Option<TelnetEvent> {
        let sub = std::mem::take(&mut self.sub);
        match sub.as_slice() {
            [option::NAWS, w1, w2, h1, h2, ..] => Some(TelnetEvent::WindowSize {
                cols: u16::from_be_bytes([*w1, *w2]),
                rows: u16::from_be_bytes([*h1, *h2]),
            }),
            [option::TERMINAL_TYPE, TTYPE_IS, name @ ..] => {
                Some(TelnetEvent::TerminalType(String::from_utf8_lossy(name).trim().to_string()))
            },
            _ => None,
        }
    }
}

/// Bytes sent right after accepting a connection: take over echo, switch
/// to character mode and ask for window size and terminal type.
pub fn preamble() -> Vec<u8> {
    vec![
        IAC,
        WILL,
        option::ECHO,
        IAC,
        WILL,
        option::SUPPRESS_GO_AHEAD,
        IAC,
        DO,
        option::NAWS,
        IAC,
        DO,
        option::TERMINAL_TYPE,
    ]
}

/// Reply to a peer negotiation, if one is due.
///
/// Options we asked for are accepted silently (and TERMINAL-TYPE is
/// queried). Anything else is refused so the peer does not wait on us.
pub fn reply(verb: Negotiation, opt: u8) -> Option<Vec<u8>> {
    match (verb, opt) {
        (Negotiation::Will, option::TERMINAL_TYPE) => {
            Some(vec![IAC, SB, option::TERMINAL_TYPE, TTYPE_SEND, IAC, SE])
        },
        (Negotiation::Will, option::NAWS) => None,
        (Negotiation::Will, other) => Some(vec![IAC, DONT, other]),
        (Negotiation::Do, option::ECHO | option::SUPPRESS_GO_AHEAD) => None,
        (Negotiation::Do, other) => Some(vec![IAC, WONT, other]),
        (Negotiation::Wont | Negotiation::Dont, _) => None,
    }
}

/// Escape outgoing data (double every IAC).
pub fn escape(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    for &b in bytes {
        out.push(b);
        if b == IAC {
            out.push(IAC);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(bytes: &[u8]) -> Vec<TelnetEvent> {
        bytes.iter().map(|&b| TelnetEvent::Data(b)).collect()
    }

    #[test]
    fn plain_data_passes_through() {
        assert_eq!(TelnetDecoder::new().decode(b"hi"), data(b"hi"));
    }

    #[test]
    fn crlf_and_crnul_collapse() {
        let mut decoder = TelnetDecoder::new();
        assert_eq!(decoder.decode(b"a\r\nb\r\0c"), data(b"a\rb\rc"));
    }

    #[test]
    fn lone_cr_keeps_next_byte() {
        assert_eq!(TelnetDecoder::new().decode(b"\rx"), data(b"\rx"));
    }

    #[test]
    fn escaped_iac_is_data() {
        assert_eq!(TelnetDecoder::new().decode(&[IAC, IAC]), vec![TelnetEvent::Data(IAC)]);
    }

    #[test]
    fn negotiation_verbs() {
        let events = TelnetDecoder::new().decode(&[IAC, WILL, option::NAWS, IAC, DONT, 5]);
        assert_eq!(events, vec![
            TelnetEvent::Negotiate(Negotiation::Will, option::NAWS),
            TelnetEvent::Negotiate(Negotiation::Dont, 5),
        ]);
    }

    #[test]
    fn naws_subnegotiation() {
        let events = TelnetDecoder::new().decode(&[IAC, SB, option::NAWS, 0, 120, 0, 40, IAC, SE]);
        assert_eq!(events, vec![TelnetEvent::WindowSize { cols: 120, rows: 40 }]);
    }

    #[test]
    fn naws_with_escaped_255() {
        let events =
            TelnetDecoder::new().decode(&[IAC, SB, option::NAWS, 1, IAC, IAC, 0, 50, IAC, SE]);
        assert_eq!(events, vec![TelnetEvent::WindowSize { cols: 511, rows: 50 }]);
    }

    #[test]
    fn terminal_type_subnegotiation() {
        let mut bytes = vec![IAC, SB, option::TERMINAL_TYPE, TTYPE_IS];
        bytes.extend_from_slice(b"XTERM-256COLOR");
        bytes.extend_from_slice(&[IAC, SE]);

        assert_eq!(TelnetDecoder::new().decode(&bytes), vec![TelnetEvent::TerminalType(
            "XTERM-256COLOR".into()
        )]);
    }

    #[test]
    fn split_across_chunks() {
        let mut decoder = TelnetDecoder::new();
        assert!(decoder.decode(&[IAC, SB, option::NAWS, 0]).is_empty());
        assert_eq!(decoder.decode(&[80, 0, 24, IAC]), vec![]);
        assert_eq!(decoder.decode(&[SE, b'x']), vec![
            TelnetEvent::WindowSize { cols: 80, rows: 24 },
            TelnetEvent::Data(b'x'),
        ]);
    }

    #[test]
    fn malformed_subnegotiation_resyncs() {
        let events = TelnetDecoder::new().decode(&[IAC, SB, option::NAWS, 0, IAC, b'z', b'a']);
        assert_eq!(events, data(b"a"));
    }

    #[test]
    fn oversized_subnegotiation_is_bounded() {
        let mut decoder = TelnetDecoder::new();
        let mut bytes = vec![IAC, SB, option::TERMINAL_TYPE, TTYPE_IS];
        bytes.extend(std::iter::repeat_n(b'a', 1000));
        bytes.extend_from_slice(&[IAC, SE]);

        let events = decoder.decode(&bytes);
        let [TelnetEvent::TerminalType(name)] = events.as_slice() else {
            panic!("expected terminal type, got {events:?}");
        };
        assert_eq!(name.len(), MAX_SUBNEGOTIATION - 2);
    }

    #[test]
    fn replies() {
        assert_eq!(
            reply(Negotiation::Will, option::TERMINAL_TYPE),
            Some(vec![IAC, SB, option::TERMINAL_TYPE, TTYPE_SEND, IAC, SE])
        );
        assert_eq!(reply(Negotiation::Will, option::NAWS), None);
        assert_eq!(reply(Negotiation::Will, 36), Some(vec![IAC, DONT, 36]));
        assert_eq!(reply(Negotiation::Do, option::ECHO), None);
        assert_eq!(reply(Negotiation::Do, 34), Some(vec![IAC, WONT, 34]));
        assert_eq!(reply(Negotiation::Wont, option::NAWS), None);
    }

    #[test]
    fn escape_doubles_iac() {
        assert_eq!(escape(&[1, IAC, 2]), vec![1, IAC, IAC, 2]);
    }
}
