use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::Key;

/// Modifier keys tracked by the dispatcher.
///
/// Variant order matches the lexical order of the token strings, so a
/// `BTreeSet<Modifier>` iterates in the same order a sorted list of tokens
/// would.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Modifier {
    /// `<alt>`
    #[serde(rename = "<alt>")]
    Alt,
    /// `<alt_gr>`
    #[serde(rename = "<alt_gr>")]
    AltGr,
    /// `<capslock>` (toggle)
    #[serde(rename = "<capslock>")]
    CapsLock,
    /// `<ctrl>`
    #[serde(rename = "<ctrl>")]
    Control,
    /// `<numlock>` (toggle)
    #[serde(rename = "<numlock>")]
    NumLock,
    /// `<shift>`
    #[serde(rename = "<shift>")]
    Shift,
    /// `<super>`
    #[serde(rename = "<super>")]
    Super,
}

/// Modifiers that turn a keypress into a hotkey rather than printable input.
pub const NON_PRINTING_MODIFIERS: [Modifier; 3] =
    [Modifier::Control, Modifier::Alt, Modifier::Super];

impl Modifier {
    /// Every modifier, in sorted order.
    pub const ALL: [Self; 7] = [
        Self::Alt,
        Self::AltGr,
        Self::CapsLock,
        Self::Control,
        Self::NumLock,
        Self::Shift,
        Self::Super,
    ];

    /// Number of modifier variants.
    pub const COUNT: usize = Self::ALL.len();

    /// Stable index of this modifier in [`Modifier::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Token form, e.g. `<ctrl>`.
    pub fn token(self) -> &'static str {
        match self {
            Self::Alt => "<alt>",
            Self::AltGr => "<alt_gr>",
            Self::CapsLock => "<capslock>",
            Self::Control => "<ctrl>",
            Self::NumLock => "<numlock>",
            Self::Shift => "<shift>",
            Self::Super => "<super>",
        }
    }

    /// Parse a modifier token (case-insensitive).
    pub fn from_token(s: &str) -> Option<Self> {
        let lowered = s.to_ascii_lowercase();
        Self::ALL.into_iter().find(|m| m.token() == lowered)
    }

    /// Toggle modifiers flip on key-down and ignore key-up.
    pub fn is_toggle(self) -> bool {
        matches!(self, Self::CapsLock | Self::NumLock)
    }

    /// Render a modifier set as `<ctrl>+<shift>+`, in sorted order.
    pub fn join(mods: &BTreeSet<Self>) -> String {
        let mut out = String::new();
        for m in mods {
            out.push_str(m.token());
            out.push('+');
        }
        out
    }
}

impl From<Modifier> for Key {
    fn from(m: Modifier) -> Self {
        Self::Mod(m)
    }
}

impl TryFrom<Key> for Modifier {
    type Error = ();
    fn try_from(k: Key) -> Result<Self, Self::Error> {
        match k {
            Key::Mod(m) => Ok(m),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
