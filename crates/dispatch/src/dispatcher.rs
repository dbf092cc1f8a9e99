//! The single-consumer event pipeline and outbound send operations.
//!
//! Capture sources push into an unbounded FIFO through a [`CaptureSink`].
//! One named consumer thread drains it, classifies each keycode as a
//! keypress or a hotkey using the modifier state at dequeue time, and
//! broadcasts to the [`ListenerRegistry`].
//!
//! Shutdown order is cancel backend, enqueue sentinel, join. Once
//! [`EventDispatcher::shutdown`] returns on any thread other than the
//! consumer, no listener callback will run.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Receiver, Sender, unbounded};
use keyspec::{Key, Modifier, Segment, segments};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{Error, InputBackend, ListenerRegistry, ModifierTracker, Result};

/// Depth at which the queue starts warning; repeats at each doubling.
pub const QUEUE_DEPTH_WARN: usize = 1024;

/// One unit of work for the consumer thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueuedEvent {
    /// A key was pressed in the window with this title.
    Key {
        /// Raw backend keycode.
        keycode: u32,
        /// Focused window title.
        title: String,
    },
    /// A mouse button was clicked.
    MouseClick,
    /// Termination sentinel.
    Shutdown,
}

/// Sender half of the event queue plus the modifier tracker.
///
/// Handed to the backend on start. Cheap to clone, so several capture
/// sources can feed the same dispatcher.
#[derive(Clone)]
pub struct CaptureSink {
    /// Shared modifier state; written here, read by the consumer.
    tracker: Arc<ModifierTracker>,
    /// Queue producer.
    tx: Sender<QueuedEvent>,
    /// Events queued but not yet dequeued.
    depth: Arc<AtomicUsize>,
}

impl CaptureSink {
    /// Record a modifier press. Applied immediately, not queued.
    pub fn on_modifier_down(&self, m: Modifier) {
        self.tracker.on_modifier_down(m);
    }

    /// Record a modifier release. Applied immediately, not queued.
    pub fn on_modifier_up(&self, m: Modifier) {
        self.tracker.on_modifier_up(m);
    }

    /// Queue a keypress.
    pub fn on_keypress(&self, keycode: u32, title: &str) {
        self.push(QueuedEvent::Key {
            keycode,
            title: title.to_string(),
        });
    }

    /// Queue a mouse click behind any pending keypresses.
    pub fn on_mouse_click(&self) {
        self.push(QueuedEvent::MouseClick);
    }

    /// Enqueue, tracking depth.
    fn push(&self, ev: QueuedEvent) {
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        if self.tx.send(ev).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            trace!("event_dropped_after_shutdown");
            return;
        }
        if depth >= QUEUE_DEPTH_WARN && depth.is_power_of_two() {
            warn!(depth, "event_queue_backlog");
        }
    }
}

/// Drain the queue until the sentinel arrives.
fn consumer_loop(
    rx: &Receiver<QueuedEvent>,
    depth: &AtomicUsize,
    tracker: &ModifierTracker,
    backend: &dyn InputBackend,
    registry: &ListenerRegistry,
) {
    while let Ok(ev) = rx.recv() {
        depth.fetch_sub(1, Ordering::SeqCst);
        match ev {
            QueuedEvent::Shutdown => break,
            QueuedEvent::MouseClick => registry.broadcast_mouseclick(),
            QueuedEvent::Key { keycode, title } => {
                let state = tracker.snapshot();
                let num_lock = state.is_active(Modifier::NumLock);
                let alt_gr = state.is_active(Modifier::AltGr);
                let mut mods = state.non_printing();
                if mods.is_empty() {
                    let shifted =
                        state.is_active(Modifier::CapsLock) ^ state.is_active(Modifier::Shift);
                    let key = backend.lookup_char(keycode, shifted, num_lock, alt_gr);
                    trace!(keycode, %key, "dispatch_keypress");
                    registry.broadcast_keypress(&key, &title);
                } else {
                    if state.is_active(Modifier::Shift) {
                        mods.insert(Modifier::Shift);
                    }
                    let key = backend.lookup_char(keycode, false, num_lock, alt_gr);
                    trace!(keycode, %key, ?mods, "dispatch_hotkey");
                    registry.broadcast_hotkey(&key, &mods, &title);
                }
            }
        }
    }
    debug!("dispatcher_exited");
}

/// Running event pipeline bound to one backend.
pub struct EventDispatcher {
    /// Platform backend.
    backend: Arc<dyn InputBackend>,
    /// Modifier state shared with the capture sink.
    tracker: Arc<ModifierTracker>,
    /// Listeners receiving broadcasts.
    registry: Arc<ListenerRegistry>,
    /// Producer kept for the shutdown sentinel.
    tx: Sender<QueuedEvent>,
    /// Queue depth gauge.
    depth: Arc<AtomicUsize>,
    /// Consumer thread; taken on shutdown.
    consumer: Mutex<Option<JoinHandle<()>>>,
    /// Set once shutdown begins.
    closing: AtomicBool,
    /// Set once the consumer has joined; outbound sends fail after this.
    closed: AtomicBool,
}

impl EventDispatcher {
    /// Spawn the consumer thread, then start the backend.
    ///
    /// If the backend fails to start, the consumer is stopped again and
    /// [`Error::BackendStart`] (or whatever the backend returned) is passed
    /// through.
    pub fn start(backend: Arc<dyn InputBackend>, registry: Arc<ListenerRegistry>) -> Result<Self> {
        let tracker = Arc::new(ModifierTracker::new());
        let depth = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = unbounded();
        let handle = {
            let (tracker, depth, backend, registry) =
                (tracker.clone(), depth.clone(), backend.clone(), registry.clone());
            thread::Builder::new()
                .name("event-dispatch".to_string())
                .spawn(move || consumer_loop(&rx, &depth, &tracker, backend.as_ref(), &registry))?
        };
        let dispatcher = Self {
            backend,
            tracker,
            registry,
            tx,
            depth,
            consumer: Mutex::new(Some(handle)),
            closing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        };
        if let Err(e) = dispatcher.backend.start(dispatcher.sink()) {
            warn!(error = %e, "backend_start_failed");
            dispatcher.stop_consumer();
            return Err(e);
        }
        debug!("dispatcher_started");
        Ok(dispatcher)
    }

    /// A new producer handle for an additional capture source.
    pub fn sink(&self) -> CaptureSink {
        CaptureSink {
            tracker: self.tracker.clone(),
            tx: self.tx.clone(),
            depth: self.depth.clone(),
        }
    }

    /// Shared modifier state.
    pub fn tracker(&self) -> &Arc<ModifierTracker> {
        &self.tracker
    }

    /// Listener registry.
    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    /// Events waiting to be dispatched.
    pub fn queue_depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Stop capture and wait for the consumer to finish pending events.
    ///
    /// Listeners may still send while the queue drains. Safe to call more
    /// than once; later calls are no-ops. Called from a listener callback,
    /// it returns without waiting for the queue to drain.
    pub fn shutdown(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            return;
        }
        self.backend.cancel();
        self.stop_consumer();
        debug!("dispatcher_shutdown");
    }

    /// Push the sentinel and join the consumer.
    ///
    /// When the last handle is dropped inside a listener callback this runs
    /// on the consumer itself; the sentinel is still queued but the join is
    /// skipped, and the thread exits once the current callback returns.
    fn stop_consumer(&self) {
        self.closing.store(true, Ordering::SeqCst);
        if let Some(handle) = self.consumer.lock().take() {
            self.depth.fetch_add(1, Ordering::SeqCst);
            let sent = self.tx.send(QueuedEvent::Shutdown).is_ok();
            if handle.thread().id() == thread::current().id() {
                debug!("dispatcher_stopped_from_consumer");
            } else if sent && handle.join().is_err() {
                warn!("dispatcher_thread_panicked");
            }
        }
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Fail once shutdown has begun.
    fn ensure_running(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(Error::AlreadyShutdown)
        } else {
            Ok(())
        }
    }

    /// Type `text`, interpreting `<key>` tokens and `<mod>+` chords.
    ///
    /// Held modifiers are released for the duration and pressed again
    /// afterwards. A chord applied to a literal run covers only its first
    /// character.
    pub fn send_string(&self, text: &str) -> Result<()> {
        self.ensure_running()?;
        if text.is_empty() {
            return Ok(());
        }
        let b = self.backend.as_ref();
        let _guard = b.send_lock().lock();
        let released = self.tracker.snapshot().held();
        for m in &released {
            b.release_key(*m);
        }
        let mut chord: Vec<Modifier> = Vec::new();
        for seg in segments(text) {
            match seg {
                Segment::Modifier(m) => chord.push(m),
                Segment::Key(k) if chord.is_empty() => b.send_key(k),
                Segment::Text(t) if chord.is_empty() => b.send_string(&t),
                Segment::Key(k) => {
                    b.send_modified_key(&k.token(), &chord);
                    chord.clear();
                }
                Segment::Text(t) => {
                    let mut chars = t.chars();
                    if let Some(first) = chars.next() {
                        b.send_modified_key(first.encode_utf8(&mut [0u8; 4]), &chord);
                    }
                    let rest = chars.as_str();
                    if !rest.is_empty() {
                        b.send_string(rest);
                    }
                    chord.clear();
                }
            }
        }
        if !chord.is_empty() {
            debug!(?chord, "dangling_modifier_application");
        }
        for m in &released {
            b.press_key(*m);
        }
        trace!(len = text.len(), released = released.len(), "sent_string");
        Ok(())
    }

    /// Deliver `text` through the clipboard.
    pub fn paste_string(&self, text: &str) -> Result<()> {
        self.ensure_running()?;
        if text.is_empty() {
            return Ok(());
        }
        let _guard = self.backend.send_lock().lock();
        self.backend.send_string_via_clipboard(text);
        trace!(len = text.len(), "pasted_string");
        Ok(())
    }

    /// Erase a previously sent `text`, one backspace short to account for
    /// the backspace the user already typed.
    pub fn remove_string(&self, text: &str) -> Result<()> {
        let count = remove_count(text);
        self.send_backspace(count)
    }

    /// Press a named key.
    pub fn send_key(&self, key: Key) -> Result<()> {
        self.repeat_key(key, 1)
    }

    /// Press left `count` times.
    pub fn send_left(&self, count: usize) -> Result<()> {
        self.repeat_key(Key::Left, count)
    }

    /// Press right `count` times.
    pub fn send_right(&self, count: usize) -> Result<()> {
        self.repeat_key(Key::Right, count)
    }

    /// Press up `count` times.
    pub fn send_up(&self, count: usize) -> Result<()> {
        self.repeat_key(Key::Up, count)
    }

    /// Press backspace `count` times.
    pub fn send_backspace(&self, count: usize) -> Result<()> {
        self.repeat_key(Key::Backspace, count)
    }

    /// Press `key` `count` times under the send lock.
    fn repeat_key(&self, key: Key, count: usize) -> Result<()> {
        self.ensure_running()?;
        if count == 0 {
            return Ok(());
        }
        let _guard = self.backend.send_lock().lock();
        for _ in 0..count {
            self.backend.send_key(key);
        }
        Ok(())
    }

    /// Flush backend output.
    pub fn flush(&self) -> Result<()> {
        self.ensure_running()?;
        self.backend.flush();
        Ok(())
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Backspaces needed to remove `text` after the user's own backspace.
///
/// Key tokens count one each, literal chars one each, chord prefixes nothing.
pub fn remove_count(text: &str) -> usize {
    segments(text)
        .iter()
        .map(Segment::char_len)
        .sum::<usize>()
        .saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_count_discounts_one() {
        assert_eq!(remove_count("hello"), 4);
        assert_eq!(remove_count("a<tab>b"), 2);
        assert_eq!(remove_count("<ctrl>+v"), 0);
        assert_eq!(remove_count(""), 0);
    }
}
