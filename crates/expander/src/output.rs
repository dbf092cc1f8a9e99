//! Outbound operations the expander needs.

use dispatch::{EventDispatcher, Result};

/// The subset of dispatcher sends used to replay an expansion.
pub trait Output: Send + Sync {
    /// Type text with key tokens.
    fn send_string(&self, text: &str) -> Result<()>;
    /// Deliver text through the clipboard.
    fn paste_string(&self, text: &str) -> Result<()>;
    /// Press backspace `count` times.
    fn send_backspace(&self, count: usize) -> Result<()>;
    /// Press left `count` times.
    fn send_left(&self, count: usize) -> Result<()>;
    /// Flush pending output.
    fn flush(&self) -> Result<()>;
}

impl Output for EventDispatcher {
    fn send_string(&self, text: &str) -> Result<()> {
        Self::send_string(self, text)
    }

    fn paste_string(&self, text: &str) -> Result<()> {
        Self::paste_string(self, text)
    }

    fn send_backspace(&self, count: usize) -> Result<()> {
        Self::send_backspace(self, count)
    }

    fn send_left(&self, count: usize) -> Result<()> {
        Self::send_left(self, count)
    }

    fn flush(&self) -> Result<()> {
        Self::flush(self)
    }
}
