//! In-memory backend for tests and offline replay.
//!
//! Keycodes are Unicode scalar values, except for a few control codes that
//! stand for named keys (`0x08` backspace, `0x09` tab, `0x0d` enter,
//! `0x1b` escape). Every outbound call is recorded as an [`Op`].

use std::{
    mem,
    sync::atomic::{AtomicBool, Ordering},
};

use keyspec::{Key, Modifier};
use parking_lot::Mutex;
use tracing::trace;

use crate::{CaptureSink, Error, InputBackend, Result};

/// A recorded outbound call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    /// `send_key`.
    Key(Key),
    /// `send_string`.
    Text(String),
    /// `send_modified_key`.
    Chord {
        /// Char or key token.
        target: String,
        /// Modifiers, in application order.
        modifiers: Vec<Modifier>,
    },
    /// `send_string_via_clipboard`.
    Clipboard(String),
    /// `press_key`.
    Press(Modifier),
    /// `release_key`.
    Release(Modifier),
    /// `flush`.
    Flush,
}

/// Keycode to named-key table.
const NAMED: [(u32, Key); 4] = [
    (0x08, Key::Backspace),
    (0x09, Key::Tab),
    (0x0d, Key::Enter),
    (0x1b, Key::Escape),
];

/// Keycode the scripted backend uses for `c`.
pub fn keycode_for(c: char) -> u32 {
    match c {
        '\n' => 0x0d,
        '\t' => 0x09,
        _ => c as u32,
    }
}

/// Keycode the scripted backend uses for a named key, if it has one.
pub fn keycode_for_key(key: Key) -> Option<u32> {
    NAMED.iter().find(|(_, k)| *k == key).map(|(code, _)| *code)
}

/// Backend driven by test code instead of a display server.
#[derive(Default)]
pub struct ScriptedBackend {
    /// Sink received on start.
    sink: Mutex<Option<CaptureSink>>,
    /// Focused window title reported with keypresses.
    title: Mutex<String>,
    /// Recorded outbound calls.
    ops: Mutex<Vec<Op>>,
    /// Outbound send lock.
    lock: Mutex<()>,
    /// When set, `start` fails with this message.
    fail_start: Option<String>,
    /// Set by `cancel`.
    cancelled: AtomicBool,
}

impl ScriptedBackend {
    /// Backend that starts successfully.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose `start` fails.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_start: Some(message.into()),
            ..Self::default()
        }
    }

    /// Change the focused window title.
    pub fn set_title(&self, title: impl Into<String>) {
        *self.title.lock() = title.into();
    }

    /// Whether `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// The sink, once started and until cancelled.
    fn sink(&self) -> Option<CaptureSink> {
        if self.is_cancelled() {
            return None;
        }
        self.sink.lock().clone()
    }

    /// Report a raw keycode.
    pub fn press(&self, keycode: u32) {
        let title = self.title.lock().clone();
        if let Some(s) = self.sink() {
            s.on_keypress(keycode, &title);
        }
    }

    /// Report each char of `text` as a keypress.
    pub fn type_text(&self, text: &str) {
        for c in text.chars() {
            self.press(keycode_for(c));
        }
    }

    /// Report a named key.
    pub fn press_key_named(&self, key: Key) {
        if let Some(code) = keycode_for_key(key) {
            self.press(code);
        }
    }

    /// Report a modifier going down.
    pub fn modifier_down(&self, m: Modifier) {
        if let Some(s) = self.sink() {
            s.on_modifier_down(m);
        }
    }

    /// Report a modifier going up.
    pub fn modifier_up(&self, m: Modifier) {
        if let Some(s) = self.sink() {
            s.on_modifier_up(m);
        }
    }

    /// Report a mouse click.
    pub fn click(&self) {
        if let Some(s) = self.sink() {
            s.on_mouse_click();
        }
    }

    /// Take the recorded outbound calls.
    pub fn take_ops(&self) -> Vec<Op> {
        mem::take(&mut *self.ops.lock())
    }

    /// Record one outbound call.
    fn record(&self, op: Op) {
        trace!(?op, "scripted_op");
        self.ops.lock().push(op);
    }
}

impl InputBackend for ScriptedBackend {
    fn start(&self, sink: CaptureSink) -> Result<()> {
        if let Some(msg) = &self.fail_start {
            return Err(Error::BackendStart(msg.clone()));
        }
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.sink.lock().take();
    }

    fn lookup_char(&self, keycode: u32, shifted: bool, _num_lock: bool, _alt_gr: bool) -> String {
        if let Some((_, key)) = NAMED.iter().find(|(code, _)| *code == keycode) {
            return key.token();
        }
        match char::from_u32(keycode) {
            Some(c) if shifted => c.to_uppercase().collect(),
            Some(c) => c.to_string(),
            None => Key::Code(keycode).token(),
        }
    }

    fn send_key(&self, key: Key) {
        self.record(Op::Key(key));
    }

    fn send_string(&self, text: &str) {
        self.record(Op::Text(text.to_string()));
    }

    fn send_modified_key(&self, target: &str, modifiers: &[Modifier]) {
        self.record(Op::Chord {
            target: target.to_string(),
            modifiers: modifiers.to_vec(),
        });
    }

    fn send_string_via_clipboard(&self, text: &str) {
        self.record(Op::Clipboard(text.to_string()));
    }

    fn press_key(&self, modifier: Modifier) {
        self.record(Op::Press(modifier));
    }

    fn release_key(&self, modifier: Modifier) {
        self.record(Op::Release(modifier));
    }

    fn flush(&self) {
        self.record(Op::Flush);
    }

    fn send_lock(&self) -> &Mutex<()> {
        &self.lock
    }
}
