//! Live modifier key state.
//!
//! Writer is the capture thread, reader is the dispatcher thread. The whole
//! state sits behind one `RwLock`, so a reader always sees a complete
//! snapshot.

use std::collections::BTreeSet;

use keyspec::{Modifier, NON_PRINTING_MODIFIERS};
use parking_lot::RwLock;
use tracing::trace;

/// Point-in-time view of every tracked modifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModifierState {
    /// Indexed by [`Modifier::index`].
    active: [bool; Modifier::COUNT],
}

impl Default for ModifierState {
    /// Everything released except num lock, which starts on.
    fn default() -> Self {
        let mut active = [false; Modifier::COUNT];
        active[Modifier::NumLock.index()] = true;
        Self { active }
    }
}

impl ModifierState {
    /// Whether `m` is held (or toggled on, for lock keys).
    pub fn is_active(&self, m: Modifier) -> bool {
        self.active[m.index()]
    }

    /// All active modifiers.
    pub fn active(&self) -> BTreeSet<Modifier> {
        Modifier::ALL.into_iter().filter(|m| self.is_active(*m)).collect()
    }

    /// Active modifiers among ctrl, alt and super.
    pub fn non_printing(&self) -> BTreeSet<Modifier> {
        NON_PRINTING_MODIFIERS
            .into_iter()
            .filter(|m| self.is_active(*m))
            .collect()
    }

    /// Held modifiers that a send has to release first; lock keys excluded.
    pub fn held(&self) -> Vec<Modifier> {
        Modifier::ALL
            .into_iter()
            .filter(|m| !m.is_toggle() && self.is_active(*m))
            .collect()
    }
}

/// Shared, thread-safe modifier state machine.
#[derive(Debug, Default)]
pub struct ModifierTracker {
    /// Current state.
    state: RwLock<ModifierState>,
}

impl ModifierTracker {
    /// Tracker in the initial state.
    pub fn new() -> Self {
        Self::default()
    }

    /// A modifier key went down. Lock keys flip; others become active.
    pub fn on_modifier_down(&self, m: Modifier) {
        let mut s = self.state.write();
        let slot = &mut s.active[m.index()];
        *slot = if m.is_toggle() { !*slot } else { true };
        trace!(modifier = %m, active = *slot, "modifier_down");
    }

    /// A modifier key went up. Lock keys ignore releases.
    pub fn on_modifier_up(&self, m: Modifier) {
        if m.is_toggle() {
            return;
        }
        self.state.write().active[m.index()] = false;
        trace!(modifier = %m, "modifier_up");
    }

    /// Whether `m` is currently active.
    pub fn is_active(&self, m: Modifier) -> bool {
        self.state.read().is_active(m)
    }

    /// Consistent copy of the whole state.
    pub fn snapshot(&self) -> ModifierState {
        *self.state.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state() {
        let t = ModifierTracker::new();
        assert!(t.is_active(Modifier::NumLock));
        assert!(!t.is_active(Modifier::CapsLock));
        assert!(!t.is_active(Modifier::Shift));
    }

    #[test]
    fn momentary_follow_down_and_up() {
        let t = ModifierTracker::new();
        t.on_modifier_down(Modifier::Control);
        assert!(t.is_active(Modifier::Control));
        t.on_modifier_up(Modifier::Control);
        assert!(!t.is_active(Modifier::Control));
    }

    #[test]
    fn toggles_flip_on_down_only() {
        let t = ModifierTracker::new();
        t.on_modifier_down(Modifier::CapsLock);
        t.on_modifier_up(Modifier::CapsLock);
        assert!(t.is_active(Modifier::CapsLock));
        t.on_modifier_down(Modifier::CapsLock);
        assert!(!t.is_active(Modifier::CapsLock));
        t.on_modifier_down(Modifier::NumLock);
        t.on_modifier_up(Modifier::NumLock);
        assert!(!t.is_active(Modifier::NumLock));
    }

    #[test]
    fn snapshot_views() {
        let t = ModifierTracker::new();
        t.on_modifier_down(Modifier::Shift);
        t.on_modifier_down(Modifier::Super);
        t.on_modifier_down(Modifier::Alt);
        t.on_modifier_down(Modifier::CapsLock);
        let s = t.snapshot();
        assert_eq!(
            s.non_printing().into_iter().collect::<Vec<_>>(),
            vec![Modifier::Alt, Modifier::Super]
        );
        assert_eq!(s.held(), vec![Modifier::Alt, Modifier::Shift, Modifier::Super]);
        assert!(s.active().contains(&Modifier::NumLock));
    }
}
