use std::fmt;

use crate::Modifier;

// Central mapping between named keys and their `<token>` spelling.
macro_rules! key_token_map {
    ($m:ident, $arg:tt) => {
        $m! { $arg,
            Left => "<left>",
            Right => "<right>",
            Up => "<up>",
            Down => "<down>",
            Backspace => "<backspace>",
            Tab => "<tab>",
            Enter => "<enter>",
            ScrollLock => "<scroll_lock>",
            PrintScreen => "<print_screen>",
            Pause => "<pause>",
            Menu => "<menu>",
            F1 => "<f1>",
            F2 => "<f2>",
            F3 => "<f3>",
            F4 => "<f4>",
            F5 => "<f5>",
            F6 => "<f6>",
            F7 => "<f7>",
            F8 => "<f8>",
            F9 => "<f9>",
            F10 => "<f10>",
            F11 => "<f11>",
            F12 => "<f12>",
            Escape => "<escape>",
            Insert => "<insert>",
            Delete => "<delete>",
            Home => "<home>",
            End => "<end>",
            PageUp => "<page_up>",
            PageDown => "<page_down>",
        }
    };
}

macro_rules! define_keys {
    ( $_arg:tt, $( $k:ident => $s:expr, )* ) => {
        /// A named, non-printing key as written in replacement text.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Key {
            $(
                #[doc = $s]
                $k,
            )*
            /// A modifier key, e.g. `<ctrl>`.
            Mod(Modifier),
            /// A raw backend keycode, written `<codeN>`.
            Code(u32),
        }
    };
}

macro_rules! to_token_match {
    ( $key:expr, $( $k:ident => $s:expr, )* ) => {
        match $key {
            $( Key::$k => $s.to_string(), )*
            Key::Mod(m) => m.token().to_string(),
            Key::Code(c) => format!("<code{}>", c),
        }
    }
}

macro_rules! from_token_match {
    ( $s:expr, $( $k:ident => $v:expr, )* ) => {{
        match $s {
            $( $v => Some(Key::$k), )*
            _ => None,
        }
    }}
}

key_token_map!(define_keys, ());

/// Keys that move the cursor; their presence disables cursor-marker
/// repositioning.
pub const NAVIGATION_KEYS: [Key; 9] = [
    Key::Left,
    Key::Right,
    Key::Up,
    Key::Down,
    Key::Backspace,
    Key::Home,
    Key::End,
    Key::PageUp,
    Key::PageDown,
];

impl Key {
    /// Parse a `<name>` token. Case-insensitive; modifiers and `<codeN>` are
    /// accepted.
    pub fn from_token(s: &str) -> Option<Self> {
        let lowered = s.to_ascii_lowercase();
        if let some @ Some(_) = key_token_map!(from_token_match, (lowered.as_str())) {
            return some;
        }
        if let Some(m) = Modifier::from_token(&lowered) {
            return Some(Self::Mod(m));
        }
        lowered
            .strip_prefix("<code")
            .and_then(|rest| rest.strip_suffix('>'))
            .and_then(|digits| digits.parse().ok())
            .map(Self::Code)
    }

    /// Canonical lowercase token for this key.
    pub fn token(self) -> String {
        key_token_map!(to_token_match, self)
    }

    /// Whether this key moves the cursor.
    pub fn is_navigation(self) -> bool {
        NAVIGATION_KEYS.contains(&self)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}
