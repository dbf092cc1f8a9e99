//! keyspec: modifier identifiers and named key tokens.
//!
//! - `Modifier`: the seven tracked modifiers, ordered so that a sorted set
//!   compares equal regardless of insertion order.
//! - `Key`: named keys written as `<name>` tokens inside replacement text
//!   (`<tab>`, `<left>`, `<code38>`, ...).
//! - `Segment` and [`segments`]: split send strings into literal text and key
//!   tokens, including `<mod>+` modifier applications.
//!
//! Token matching is case-insensitive: `<TAB>` and `<tab>` name the same key.

mod key;
pub use key::{Key, NAVIGATION_KEYS};

mod modifiers;
pub use modifiers::{Modifier, NON_PRINTING_MODIFIERS};

mod segment;
pub use segment::{Segment, contains_navigation_key, segments};

/// Marker placed in replacement text to position the cursor after sending.
pub const CURSOR_MARKER: &str = "<cursor>";
