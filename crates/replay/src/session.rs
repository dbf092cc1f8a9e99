//! Drive the scripted backend through a live dispatcher and expander.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use crossbeam_channel::{Receiver, Sender, unbounded};
use dispatch::{
    EventDispatcher, Listener, ListenerRegistry,
    mock::{Op, ScriptedBackend, keycode_for, keycode_for_key},
};
use expander::{Expander, ExpanderConfig, ExpanderEvent, Output};
use keyspec::{Key, Modifier, Segment, segments};
use parking_lot::Mutex;
use tracing::{debug, info};
use triggers::TriggerTree;

use crate::error::{Error, Result};

/// How long to wait for queued input to be dispatched.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Input token that clicks the mouse.
pub const CLICK_TOKEN: &str = "<click>";

/// What to replay and how.
#[derive(Clone, Debug, Default)]
pub struct SessionOptions {
    /// Input to type.
    pub input: String,
    /// Focused window title.
    pub window: String,
    /// Menu entry to pick whenever a menu is offered.
    pub pick: Option<usize>,
    /// Clear the buffer on mouse clicks.
    pub reset_on_mouse_click: bool,
}

/// Result of a replay.
pub struct Outcome {
    /// Everything sent to the backend, in order.
    pub ops: Vec<Op>,
    /// Events the expander emitted.
    pub events: Vec<ExpanderEvent>,
    /// Expander's running total.
    pub keystrokes_saved: i64,
    /// Tree after the run, usage counts included.
    pub tree: TriggerTree,
}

/// Signals once per dispatched event. Registered after the expander, so a
/// signal means the expander is done with that event.
struct Progress {
    /// Signal sender.
    tx: Sender<()>,
}

impl Progress {
    /// Send one signal.
    fn tick(&self) {
        self.tx.send(()).ok();
    }
}

impl Listener for Progress {
    fn handle_keypress(&self, _key: &str, _window_title: &str) {
        self.tick();
    }

    fn handle_hotkey(&self, _key: &str, _modifiers: &BTreeSet<Modifier>, _window_title: &str) {
        self.tick();
    }

    fn handle_mouseclick(&self) {
        self.tick();
    }
}

/// Feeds input into the backend, keeping modifier changes in step with the
/// consumer thread.
struct Driver<'a> {
    /// Backend receiving the input.
    backend: &'a ScriptedBackend,
    /// Progress signals.
    done: Receiver<()>,
    /// Events reported so far.
    sent: usize,
    /// Events known to be dispatched.
    seen: usize,
}

impl Driver<'_> {
    /// Report a keycode.
    fn press(&mut self, keycode: u32) {
        self.backend.press(keycode);
        self.sent += 1;
    }

    /// Report a named key.
    fn key(&mut self, key: Key) -> Result<()> {
        let code = match key {
            Key::Code(c) => Some(c),
            k => keycode_for_key(k),
        };
        let code = code.ok_or_else(|| Error::UnsupportedKey(key.token()))?;
        self.press(code);
        Ok(())
    }

    /// Report each char of `text`.
    fn text(&mut self, text: &str) {
        for c in text.chars() {
            self.press(keycode_for(c));
        }
    }

    /// Report a mouse click.
    fn click(&mut self) {
        self.backend.click();
        self.sent += 1;
    }

    /// Wait until everything reported so far has been dispatched.
    fn settle(&mut self) -> Result<()> {
        while self.seen < self.sent {
            self.done
                .recv_timeout(SETTLE_TIMEOUT)
                .map_err(|_| Error::Timeout(SETTLE_TIMEOUT))?;
            self.seen += 1;
        }
        Ok(())
    }

    /// Hold `mods` for the first key of `seg`, then type the rest plainly.
    fn chord(&mut self, mods: &[Modifier], seg: &Segment) -> Result<()> {
        self.settle()?;
        for m in mods {
            self.backend.modifier_down(*m);
        }
        let rest = match seg {
            Segment::Text(t) => {
                let mut chars = t.chars();
                if let Some(c) = chars.next() {
                    self.press(keycode_for(c));
                }
                chars.as_str().to_string()
            }
            Segment::Key(k) => {
                self.key(*k)?;
                String::new()
            }
            Segment::Modifier(_) => String::new(),
        };
        self.settle()?;
        for m in mods.iter().rev() {
            self.backend.modifier_up(*m);
        }
        self.text(&rest);
        Ok(())
    }

    /// Type a run of input containing no clicks.
    fn feed(&mut self, input: &str) -> Result<()> {
        let mut mods = Vec::new();
        for seg in segments(input) {
            match seg {
                Segment::Modifier(m) => mods.push(m),
                seg if !mods.is_empty() => {
                    self.chord(&mods, &seg)?;
                    mods.clear();
                }
                Segment::Text(t) => self.text(&t),
                Segment::Key(k) => self.key(k)?,
            }
        }
        if !mods.is_empty() {
            debug!(?mods, "dangling_modifier_in_input");
        }
        Ok(())
    }

    /// Type the whole input, clicking at each click token.
    fn run(&mut self, input: &str) -> Result<()> {
        for (i, part) in input.split(CLICK_TOKEN).enumerate() {
            if i > 0 {
                self.click();
            }
            self.feed(part)?;
        }
        self.settle()
    }
}

/// Type `opts.input` into a fresh pipeline built around `tree`.
///
/// Menus are answered with `opts.pick` when set, and recorded either way.
pub fn replay(tree: TriggerTree, opts: &SessionOptions) -> Result<Outcome> {
    let backend = Arc::new(ScriptedBackend::new());
    backend.set_title(opts.window.clone());
    let registry = Arc::new(ListenerRegistry::new());
    let dispatcher = Arc::new(EventDispatcher::start(backend.clone(), registry.clone())?);
    let out: Arc<dyn Output> = dispatcher.clone();
    let config = ExpanderConfig {
        reset_on_mouse_click: opts.reset_on_mouse_click,
        ..ExpanderConfig::default()
    };
    let (expander, events) = Expander::new(Arc::new(Mutex::new(tree)), &out, config);
    registry.register(expander.clone());
    let (tx, done) = unbounded();
    registry.register(Arc::new(Progress { tx }));

    let mut driver = Driver {
        backend: &backend,
        done,
        sent: 0,
        seen: 0,
    };
    driver.run(&opts.input)?;

    let mut seen = Vec::new();
    while let Ok(ev) = events.try_recv() {
        if let (Some(index), ExpanderEvent::ShowMenu { items, buffer }) = (opts.pick, &ev) {
            let item = *items.get(index).ok_or(Error::PickOutOfRange {
                index,
                len: items.len(),
            })?;
            debug!(?item, "menu_pick");
            expander.activate(item, buffer)?;
        }
        seen.push(ev);
    }
    dispatcher.shutdown();
    info!(events = driver.sent, "replay_finished");

    let tree = expander.tree().lock().clone();
    Ok(Outcome {
        ops: backend.take_ops(),
        events: seen,
        keystrokes_saved: expander.keystrokes_saved(),
        tree,
    })
}
