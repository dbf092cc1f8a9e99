//! Modal listeners used by settings dialogs to capture keys.

use std::{
    collections::BTreeSet,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

use crossbeam_channel::{Receiver, Sender, unbounded};
use keyspec::Modifier;
use tracing::debug;

use crate::{Listener, ListenerId, ListenerRegistry};

/// Whether `key` is a bare modifier token such as `<shift>`.
fn is_modifier(key: &str) -> bool {
    Modifier::from_token(key).is_some()
}

/// Captures the next non-modifier keypress, then removes itself.
pub struct KeyGrabber {
    /// Own registration.
    id: ListenerId,
    /// Registry to leave once a key is captured.
    registry: Weak<ListenerRegistry>,
    /// Set after the first capture.
    done: AtomicBool,
    /// Where the captured key goes.
    tx: Sender<String>,
}

impl KeyGrabber {
    /// Register a grabber; the returned channel yields exactly one key.
    pub fn start(registry: &Arc<ListenerRegistry>) -> Receiver<String> {
        let (tx, rx) = unbounded();
        let weak = Arc::downgrade(registry);
        registry.register_with(|id| {
            Arc::new(Self {
                id,
                registry: weak,
                done: AtomicBool::new(false),
                tx,
            })
        });
        rx
    }
}

impl Listener for KeyGrabber {
    fn handle_keypress(&self, key: &str, _window_title: &str) {
        if is_modifier(key) || self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.deregister(self.id);
        }
        debug!(%key, "key_grabbed");
        self.tx.send(key.to_string()).ok();
    }

    fn handle_hotkey(&self, _key: &str, _modifiers: &BTreeSet<Modifier>, _window_title: &str) {}
}

/// One captured input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recorded {
    /// Plain keypress.
    Key(String),
    /// Key with modifiers held.
    Hotkey {
        /// Key pressed.
        key: String,
        /// Modifiers held, sorted.
        modifiers: BTreeSet<Modifier>,
    },
}

/// Sends a captured input to the recorder's channel.
struct RecorderListener {
    /// Destination.
    tx: Sender<Recorded>,
}

impl Listener for RecorderListener {
    fn handle_keypress(&self, key: &str, _window_title: &str) {
        if !is_modifier(key) {
            self.tx.send(Recorded::Key(key.to_string())).ok();
        }
    }

    fn handle_hotkey(&self, key: &str, modifiers: &BTreeSet<Modifier>, _window_title: &str) {
        self.tx
            .send(Recorded::Hotkey {
                key: key.to_string(),
                modifiers: modifiers.clone(),
            })
            .ok();
    }
}

/// Records keys and hotkeys until stopped or dropped.
pub struct KeyRecorder {
    /// Own registration.
    id: ListenerId,
    /// Registry to leave on stop.
    registry: Weak<ListenerRegistry>,
    /// Recorded inputs.
    rx: Receiver<Recorded>,
}

impl KeyRecorder {
    /// Register a recorder.
    pub fn start(registry: &Arc<ListenerRegistry>) -> Self {
        let (tx, rx) = unbounded();
        let id = registry.register(Arc::new(RecorderListener { tx }));
        Self {
            id,
            registry: Arc::downgrade(registry),
            rx,
        }
    }

    /// Channel of recorded inputs.
    pub fn events(&self) -> &Receiver<Recorded> {
        &self.rx
    }

    /// Stop recording. Inputs already recorded stay readable.
    pub fn stop(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.deregister(self.id);
        }
    }
}

impl Drop for KeyRecorder {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grabber_takes_first_non_modifier_then_leaves() {
        let reg = Arc::new(ListenerRegistry::new());
        let rx = KeyGrabber::start(&reg);
        assert_eq!(reg.len(), 1);
        reg.broadcast_keypress("<shift>", "");
        assert_eq!(reg.len(), 1);
        reg.broadcast_keypress("k", "");
        reg.broadcast_keypress("j", "");
        assert_eq!(rx.try_recv().unwrap(), "k");
        assert!(rx.try_recv().is_err());
        assert!(reg.is_empty());
    }

    #[test]
    fn recorder_records_until_stopped() {
        let reg = Arc::new(ListenerRegistry::new());
        let rec = KeyRecorder::start(&reg);
        let mods: BTreeSet<_> = [Modifier::Control].into_iter().collect();
        reg.broadcast_keypress("a", "");
        reg.broadcast_keypress("<ctrl>", "");
        reg.broadcast_hotkey("c", &mods, "");
        rec.stop();
        reg.broadcast_keypress("b", "");
        let got: Vec<_> = rec.events().try_iter().collect();
        assert_eq!(
            got,
            vec![
                Recorded::Key("a".into()),
                Recorded::Hotkey { key: "c".into(), modifiers: mods },
            ]
        );
        assert!(reg.is_empty());
    }
}
