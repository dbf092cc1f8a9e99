//! Rolling buffer of text typed since the last reset.

use keyspec::{Key, Modifier};

/// How a keypress changed the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fed {
    /// Text was appended; triggers should be checked.
    Typed,
    /// The last char was removed.
    Erased,
    /// A non-text key cleared the buffer.
    Reset,
    /// A bare modifier; nothing changed.
    Ignored,
}

/// Typed text, capped at a maximum length in chars.
#[derive(Clone, Debug)]
pub struct InputBuffer {
    /// Current contents.
    text: String,
    /// Cap; the oldest chars are dropped beyond it.
    max_len: usize,
}

impl InputBuffer {
    /// Empty buffer holding at most `max_len` chars.
    pub fn new(max_len: usize) -> Self {
        Self {
            text: String::new(),
            max_len,
        }
    }

    /// Current contents.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Apply one keypress as reported by the dispatcher.
    ///
    /// Enter and tab are kept as `\n` and `\t` so they can confirm an
    /// abbreviation boundary; other named keys reset the buffer.
    pub fn feed(&mut self, key: &str) -> Fed {
        if Modifier::from_token(key).is_some() {
            return Fed::Ignored;
        }
        match Key::from_token(key) {
            Some(Key::Backspace) => {
                self.text.pop();
                Fed::Erased
            }
            Some(Key::Enter) => self.push("\n"),
            Some(Key::Tab) => self.push("\t"),
            Some(_) => {
                self.clear();
                Fed::Reset
            }
            None => self.push(key),
        }
    }

    /// Append and trim from the front.
    fn push(&mut self, s: &str) -> Fed {
        self.text.push_str(s);
        let excess = self.text.chars().count().saturating_sub(self.max_len);
        if excess > 0 {
            let cut = self
                .text
                .char_indices()
                .nth(excess)
                .map_or(self.text.len(), |(i, _)| i);
            self.text.drain(..cut);
        }
        Fed::Typed
    }
}
