//! Keyboard input and the single-line text field.

/// Terminal-agnostic keyboard input.
///
/// Decouples the session from the wire encoding of keys (telnet byte
/// streams, escape sequences) so the state machine can be driven directly in
/// tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable character.
    Char(char),
    /// Enter/Return key (submit).
    Enter,
    /// Backspace key (delete character before cursor).
    Backspace,
    /// Delete key (delete character at cursor).
    Delete,
    /// Escape key (quit).
    Esc,
    /// Ctrl+C (quit).
    Interrupt,
    /// Left arrow key.
    Left,
    /// Right arrow key.
    Right,
    /// Home key or Ctrl+A (cursor to start).
    Home,
    /// End key or Ctrl+E (cursor to end).
    End,
    /// Ctrl+U (delete everything before the cursor).
    KillToStart,
    /// Ctrl+K (delete everything from the cursor on).
    KillToEnd,
}

/// Single-line text field.
///
/// The cursor is a character index, not a byte offset, so multi-byte input
/// edits correctly. Input beyond `limit` characters is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputState {
    buffer: String,
    cursor: usize,
    limit: usize,
}

/// The slice of the field that fits its display width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputWindow {
    /// Visible text before the cursor.
    pub before: String,
    /// Character under the cursor. `None` when the cursor is at the end.
    pub at: Option<char>,
    /// Visible text after the cursor.
    pub after: String,
}

impl InputState {
    /// Create an empty field holding at most `limit` characters.
    pub fn new(limit: usize) -> Self {
        Self { buffer: String::new(), cursor: 0, limit }
    }

    /// Current text.
    pub fn value(&self) -> &str {
        &self.buffer
    }

    /// Cursor position in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Maximum number of characters.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Field holds no text.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of characters.
    pub fn len(&self) -> usize {
        self.buffer.chars().count()
    }

    /// Apply an editing key. Returns `true` if the field changed.
    ///
    /// Enter, Esc and Ctrl+C are not editing keys and leave the field alone.
    pub fn apply(&mut self, key: KeyInput) -> bool {
        match key {
            KeyInput::Char(c) => self.insert(c),
            KeyInput::Backspace => {
                if self.cursor == 0 {
                    return false;
                }
                self.cursor -= 1;
                let at = self.byte_index(self.cursor);
                self.buffer.remove(at);
                true
            },
            KeyInput::Delete => {
                if self.cursor >= self.len() {
                    return false;
                }
                let at = self.byte_index(self.cursor);
                self.buffer.remove(at);
                true
            },
            KeyInput::Left => self.move_to(self.cursor.saturating_sub(1)),
            KeyInput::Right => self.move_to((self.cursor + 1).min(self.len())),
            KeyInput::Home => self.move_to(0),
            KeyInput::End => self.move_to(self.len()),
            KeyInput::KillToStart => {
                if self.cursor == 0 {
                    return false;
                }
                let at = self.byte_index(self.cursor);
                self.buffer.drain(..at);
                self.cursor = 0;
                true
            },
            KeyInput::KillToEnd => {
                if self.cursor >= self.len() {
                    return false;
                }
                let at = self.byte_index(self.cursor);
                self.buffer.truncate(at);
                true
            },
            KeyInput::Enter | KeyInput::Esc | KeyInput::Interrupt => false,
        }
    }

    /// Visible part of the field for a display `width` in characters.
    ///
    /// Scrolls so the cursor stays inside the window; the cursor cell itself
    /// counts toward the width.
    pub fn window(&self, width: usize) -> InputWindow {
        let chars: Vec<char> = self.buffer.chars().collect();
        let width = width.max(1);
        let start = (self.cursor + 1).saturating_sub(width);
        let end = (start + width).min(chars.len());

        let before = chars[start..self.cursor].iter().collect();
        let at = chars.get(self.cursor).copied();
        let after = if self.cursor < end {
            chars[self.cursor + 1..end].iter().collect()
        } else {
            String::new()
        };

        InputWindow { before, at, after }
    }

    fn insert(&mut self, c: char) -> bool {
        if c.is_control() || self.len() >= self.limit {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.buffer.insert(at, c);
        self.cursor += 1;
        true
    }

    fn move_to(&mut self, cursor: usize) -> bool {
        let moved = cursor != self.cursor;
        self.cursor = cursor;
        moved
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.buffer.char_indices().nth(char_index).map_or(self.buffer.len(), |(i, _)| i)
    }
}
