//! The expansion service.
//!
//! Registered as a [`Listener`], it keeps the typed-input buffer, looks for
//! the first node in the tree that fires on it, and replays the result
//! through an [`Output`]. Scripts and menus are handed off as
//! [`ExpanderEvent`]s.

use std::{
    collections::BTreeSet,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, AtomicI64, Ordering},
    },
};

use crossbeam_channel::{Receiver, Sender, unbounded};
use dispatch::Listener;
use keyspec::{Modifier, Segment, segments};
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use triggers::{NodeId, NodeKind, SendMode, TriggerTree, build_phrase, build_script};

use crate::{Error, Fed, InputBuffer, Output, Result};

/// Tuning for the expansion service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpanderConfig {
    /// Longest buffer kept, in chars.
    pub max_buffer_len: usize,
    /// Clear the buffer when the mouse is clicked.
    pub reset_on_mouse_click: bool,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            max_buffer_len: 150,
            reset_on_mouse_click: true,
        }
    }
}

/// Work handed to the rest of the application.
#[derive(Clone, Debug, PartialEq)]
pub enum ExpanderEvent {
    /// A script fired; its trigger has already been erased.
    RunScript {
        /// Script node.
        item: NodeId,
        /// Script description.
        description: String,
        /// Source to execute.
        code: String,
    },
    /// Ask the user to pick one of `items`, then call
    /// [`Expander::activate`] with the choice and `buffer`.
    ShowMenu {
        /// Candidates.
        items: Vec<NodeId>,
        /// Buffer at the time the menu was requested.
        buffer: String,
    },
}

/// What activating a node does.
enum Action {
    /// Send a phrase.
    Expand,
    /// Hand off a script.
    Script,
    /// Offer these children.
    Menu(Vec<NodeId>),
}

/// Chars an expansion leaves in the target, counting key tokens as one.
fn typed_len(text: &str) -> i64 {
    let n: usize = segments(text).iter().map(Segment::char_len).sum();
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Text expansion listener.
pub struct Expander {
    /// Trigger tree; shared with whoever edits or saves it.
    tree: Arc<Mutex<TriggerTree>>,
    /// Outbound sends.
    output: Weak<dyn Output>,
    /// Typed text since the last reset.
    buffer: Mutex<InputBuffer>,
    /// Settings.
    config: ExpanderConfig,
    /// Ignore input while set.
    paused: AtomicBool,
    /// Keystrokes saved across all expansions.
    saved: AtomicI64,
    /// Event channel.
    events: Sender<ExpanderEvent>,
}

impl Expander {
    /// Build an expander sending through `output`.
    ///
    /// Only a weak reference to `output` is kept, so registering the
    /// expander with the dispatcher it sends through does not leak.
    pub fn new(
        tree: Arc<Mutex<TriggerTree>>,
        output: &Arc<dyn Output>,
        config: ExpanderConfig,
    ) -> (Arc<Self>, Receiver<ExpanderEvent>) {
        let (tx, rx) = unbounded();
        let expander = Self {
            tree,
            output: Arc::downgrade(output),
            buffer: Mutex::new(InputBuffer::new(config.max_buffer_len)),
            config,
            paused: AtomicBool::new(false),
            saved: AtomicI64::new(0),
            events: tx,
        };
        (Arc::new(expander), rx)
    }

    /// Shared tree.
    pub fn tree(&self) -> &Arc<Mutex<TriggerTree>> {
        &self.tree
    }

    /// Current buffer contents.
    pub fn buffer(&self) -> String {
        self.buffer.lock().as_str().to_string()
    }

    /// Keystrokes saved so far. Negative if expansions cost more than they
    /// saved.
    pub fn keystrokes_saved(&self) -> i64 {
        self.saved.load(Ordering::SeqCst)
    }

    /// Stop reacting to input and clear the buffer.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
        self.buffer.lock().clear();
        info!("expander_paused");
    }

    /// React to input again.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        info!("expander_resumed");
    }

    /// Whether input is being ignored.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Live output, or [`Error::OutputGone`].
    fn output(&self) -> Result<Arc<dyn Output>> {
        self.output.upgrade().ok_or(Error::OutputGone)
    }

    /// Run a node as if the user picked it from a menu.
    ///
    /// Phrases expand, scripts erase their trigger and emit
    /// [`ExpanderEvent::RunScript`], folders emit a menu of their children.
    pub fn activate(&self, item: NodeId, buffer: &str) -> Result<()> {
        let action = {
            let tree = self.tree.lock();
            match &tree.node(item)?.kind {
                NodeKind::Phrase(_) => Action::Expand,
                NodeKind::Script(_) => Action::Script,
                NodeKind::Folder(_) => Action::Menu(tree.children(item)),
            }
        };
        match action {
            Action::Expand => self.expand_phrase(item, buffer),
            Action::Script => self.run_script(item, buffer),
            Action::Menu(items) => {
                self.emit(ExpanderEvent::ShowMenu {
                    items,
                    buffer: buffer.to_string(),
                });
                Ok(())
            }
        }
    }

    /// React to a node firing: prompt first if it asks to.
    fn fire(&self, item: NodeId, buffer: &str) -> Result<()> {
        let prompt = self.tree.lock().node(item)?.should_prompt();
        if prompt {
            self.emit(ExpanderEvent::ShowMenu {
                items: vec![item],
                buffer: buffer.to_string(),
            });
            return Ok(());
        }
        self.activate(item, buffer)
    }

    /// Build and send a phrase.
    fn expand_phrase(&self, item: NodeId, buffer: &str) -> Result<()> {
        let (exp, send_mode, consumed) = {
            let mut tree = self.tree.lock();
            let consumed = tree.keystrokes_consumed(item, buffer);
            let send_mode = match &tree.node(item)?.kind {
                NodeKind::Phrase(p) => p.send_mode,
                _ => SendMode::default(),
            };
            (build_phrase(&mut tree, item, buffer)?, send_mode, consumed)
        };
        let out = self.output()?;
        out.send_backspace(exp.backspaces)?;
        match send_mode {
            SendMode::Keyboard => out.send_string(&exp.string)?,
            mode => {
                out.paste_string(&exp.string)?;
                if let Some(chord) = mode.paste_chord() {
                    out.send_string(chord)?;
                }
            }
        }
        out.send_left(exp.lefts)?;
        out.flush()?;
        let consumed = i64::try_from(consumed).unwrap_or(i64::MAX);
        self.saved
            .fetch_add(typed_len(&exp.string) - consumed, Ordering::SeqCst);
        debug!(
            ?item,
            backspaces = exp.backspaces,
            lefts = exp.lefts,
            ?send_mode,
            "phrase_expanded"
        );
        Ok(())
    }

    /// Erase a script's trigger and hand the script off.
    fn run_script(&self, item: NodeId, buffer: &str) -> Result<()> {
        let ((backspaces, prefix), description, code) = {
            let mut tree = self.tree.lock();
            let (description, code) = match &tree.node(item)?.kind {
                NodeKind::Script(s) => (s.description.clone(), s.code.clone()),
                _ => Default::default(),
            };
            (build_script(&mut tree, item, buffer)?, description, code)
        };
        let out = self.output()?;
        out.send_backspace(backspaces)?;
        out.send_string(&prefix)?;
        out.flush()?;
        debug!(?item, backspaces, "script_triggered");
        self.emit(ExpanderEvent::RunScript {
            item,
            description,
            code,
        });
        Ok(())
    }

    /// Send an event, ignoring a closed receiver.
    fn emit(&self, ev: ExpanderEvent) {
        if self.events.send(ev).is_err() {
            debug!("expander_event_dropped");
        }
    }

    /// First node, in pre-order, firing on `buffer` in window `title`.
    fn find_abbreviation(&self, buffer: &str, title: &str) -> Option<NodeId> {
        let tree = self.tree.lock();
        tree.walk()
            .into_iter()
            .find(|id| tree.check_input(*id, buffer, title))
    }

    /// First node, in pre-order, bound to this hotkey in window `title`.
    fn find_hotkey(&self, key: &str, modifiers: &BTreeSet<Modifier>, title: &str) -> Option<NodeId> {
        let tree = self.tree.lock();
        tree.walk().into_iter().find(|id| {
            tree.get(*id)
                .is_some_and(|n| n.triggers.check_hotkey(modifiers, key, title))
        })
    }
}

impl Listener for Expander {
    fn handle_keypress(&self, key: &str, window_title: &str) {
        if self.is_paused() {
            return;
        }
        let buffer = {
            let mut b = self.buffer.lock();
            if b.feed(key) != Fed::Typed {
                return;
            }
            b.as_str().to_string()
        };
        let Some(item) = self.find_abbreviation(&buffer, window_title) else {
            return;
        };
        self.buffer.lock().clear();
        if let Err(e) = self.fire(item, &buffer) {
            warn!(?item, error = %e, "abbreviation_fire_failed");
        }
    }

    fn handle_hotkey(&self, key: &str, modifiers: &BTreeSet<Modifier>, window_title: &str) {
        if self.is_paused() {
            return;
        }
        self.buffer.lock().clear();
        let Some(item) = self.find_hotkey(key, modifiers, window_title) else {
            return;
        };
        if let Err(e) = self.fire(item, "") {
            warn!(?item, error = %e, "hotkey_fire_failed");
        }
    }

    fn handle_mouseclick(&self) {
        if self.config.reset_on_mouse_click {
            self.buffer.lock().clear();
        }
    }
}
