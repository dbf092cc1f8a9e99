//! Capability traits at the boundary with the platform and with consumers.

use std::collections::BTreeSet;

use keyspec::{Key, Modifier};
use parking_lot::Mutex;

use crate::{CaptureSink, Result};

/// Platform key capture and synthesis.
///
/// The backend runs its own capture thread and reports through the
/// [`CaptureSink`] handed to [`InputBackend::start`]. The outbound methods
/// are called by the dispatcher while it holds [`InputBackend::send_lock`];
/// implementations must not take that lock themselves.
pub trait InputBackend: Send + Sync {
    /// Begin capturing. Errors are surfaced to the caller unchanged.
    fn start(&self, sink: CaptureSink) -> Result<()>;

    /// Stop capturing. No sink calls may follow once this returns.
    fn cancel(&self);

    /// Resolve a keycode to the character or key token it produces.
    fn lookup_char(&self, keycode: u32, shifted: bool, num_lock: bool, alt_gr: bool) -> String;

    /// Press and release a named key.
    fn send_key(&self, key: Key);

    /// Type literal text.
    fn send_string(&self, text: &str);

    /// Send `target` (one char or a key token) chorded with `modifiers`.
    fn send_modified_key(&self, target: &str, modifiers: &[Modifier]);

    /// Deliver `text` through the clipboard.
    fn send_string_via_clipboard(&self, text: &str);

    /// Press a modifier key.
    fn press_key(&self, modifier: Modifier);

    /// Release a modifier key.
    fn release_key(&self, modifier: Modifier);

    /// Flush buffered output to the display server.
    fn flush(&self);

    /// Lock serializing every outbound send.
    fn send_lock(&self) -> &Mutex<()>;
}

/// Receiver of classified input events.
///
/// Callbacks run on the dispatcher thread, one event at a time, in the
/// order events were captured.
pub trait Listener: Send + Sync {
    /// A printable key or key token was typed.
    fn handle_keypress(&self, key: &str, window_title: &str);

    /// A key was typed while ctrl, alt or super was held.
    fn handle_hotkey(&self, key: &str, modifiers: &BTreeSet<Modifier>, window_title: &str);

    /// A mouse button was clicked.
    fn handle_mouseclick(&self) {}
}
