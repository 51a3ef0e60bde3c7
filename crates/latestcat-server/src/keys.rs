//! Key decoding.
//!
//! Turns the client's data bytes (already stripped of telnet commands) into
//! [`KeyInput`]s. Handles UTF-8 text, C0 control keys and the CSI/SS3
//! sequences terminals send for cursor and editing keys.

use latestcat_app::KeyInput;

const ESC: u8 = 0x1b;

/// Longest CSI parameter string we keep before giving up on the sequence.
const MAX_PARAMS: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum State {
    #[default]
    Ground,
    Escape,
    Csi(String),
    Ss3,
    /// Partial UTF-8 sequence: bytes so far and total length.
    Utf8(Vec<u8>, usize),
}

/// Incremental key decoder.
#[derive(Debug, Default)]
pub struct KeyDecoder {
    state: State,
}

impl KeyDecoder {
    /// Create a decoder in the ground state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte.
    pub fn feed(&mut self, byte: u8) -> Option<KeyInput> {
        match std::mem::take(&mut self.state) {
            State::Ground => self.ground(byte),
            State::Escape => self.escape(byte),
            State::Csi(params) => self.csi(params, byte),
            State::Ss3 => ss3(byte),
            State::Utf8(mut bytes, len) => {
                if byte & 0xc0 != 0x80 {
                    // Broken sequence; start over with this byte
                    return self.ground(byte);
                }
                bytes.push(byte);
                if bytes.len() < len {
                    self.state = State::Utf8(bytes, len);
                    return None;
                }
                std::str::from_utf8(&bytes)
                    .ok()
                    .and_then(|s| s.chars().next())
                    .filter(|c| !c.is_control())
                    .map(KeyInput::Char)
            },
        }
    }

    /// End of a read chunk. A bare ESC with nothing after it is the Esc key.
    pub fn flush(&mut self) -> Option<KeyInput> {
        if self.state == State::Escape {
            self.state = State::Ground;
            return Some(KeyInput::Esc);
        }
        None
    }

    fn ground(&mut self, byte: u8) -> Option<KeyInput> {
        match byte {
            ESC => {
                self.state = State::Escape;
                None
            },
            b'\r' | b'\n' => Some(KeyInput::Enter),
            0x7f | 0x08 => Some(KeyInput::Backspace),
            0x03 => Some(KeyInput::Interrupt),
            0x01 => Some(KeyInput::Home),
            0x05 => Some(KeyInput::End),
            0x02 => Some(KeyInput::Left),
            0x06 => Some(KeyInput::Right),
            0x04 => Some(KeyInput::Delete),
            0x0b => Some(KeyInput::KillToEnd),
            0x15 => Some(KeyInput::KillToStart),
            0x00..0x20 => None,
            0x20..0x7f => Some(KeyInput::Char(char::from(byte))),
            _ => {
                let len = utf8_len(byte)?;
                self.state = State::Utf8(vec![byte], len);
                None
            },
        }
    }

    fn escape(&mut self, byte: u8) -> Option<KeyInput> {
        match byte {
            b'[' => {
                self.state = State::Csi(String::new());
                None
            },
            b'O' => {
                self.state = State::Ss3;
                None
            },
            ESC => {
                self.state = State::Escape;
                Some(KeyInput::Esc)
            },
            // Alt-modified keys quit like a bare Esc
            _ => Some(KeyInput::Esc),
        }
    }

    fn csi(&mut self, mut params: String, byte: u8) -> Option<KeyInput> {
        match byte {
            b'0'..=b'9' | b';' => {
                if params.len() < MAX_PARAMS {
                    params.push(char::from(byte));
                }
                self.state = State::Csi(params);
                None
            },
            b'C' => Some(KeyInput::Right),
            b'D' => Some(KeyInput::Left),
            b'H' => Some(KeyInput::Home),
            b'F' => Some(KeyInput::End),
            b'~' => match params.split(';').next() {
                Some("1" | "7") => Some(KeyInput::Home),
                Some("4" | "8") => Some(KeyInput::End),
                Some("3") => Some(KeyInput::Delete),
                _ => None,
            },
            // Up/down and everything else have no meaning in a single-line field
            _ => None,
        }
    }
}

fn ss3(byte: u8) -> Option<KeyInput> {
    match byte {
        b'C' => Some(KeyInput::Right),
        b'D' => Some(KeyInput::Left),
        b'H' => Some(KeyInput::Home),
        b'F' => Some(KeyInput::End),
        _ => None,
    }
}

/// Total length of a UTF-8 sequence from its lead byte.
fn utf8_len(lead: u8) -> Option<usize> {
    match lead {
        0xc2..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf4 => Some(4),
        _ => None,
    }
}

/// Decode a whole chunk, flushing a trailing bare ESC.
pub fn decode(decoder: &mut KeyDecoder, bytes: &[u8]) -> Vec<KeyInput> {
    let mut keys: Vec<KeyInput> = bytes.iter().filter_map(|&b| decoder.feed(b)).collect();
    keys.extend(decoder.flush());
    keys
}
