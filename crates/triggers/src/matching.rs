//! Abbreviation, hotkey and window-filter matching.
//!
//! The abbreviation check is split in two: [`partition`] finds the rightmost
//! occurrence of the abbreviation in the input buffer, and
//! [`should_trigger`] applies the boundary rules to that partition. Callers
//! that need both the decision and the substrings go through
//! [`abbreviation_match`], so the backspace and case computations always see
//! the same partition the decision was made on.

use std::collections::BTreeSet;

use keyspec::Modifier;

use crate::{AbbreviationConfig, HotkeyConfig, WindowFilterConfig};

/// The input buffer split around the last occurrence of an abbreviation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    /// Text typed before the abbreviation.
    pub before: String,
    /// The abbreviation exactly as typed (original case).
    pub matched: String,
    /// Text typed after the abbreviation.
    pub after: String,
}

impl Partition {
    /// Characters typed after the abbreviation.
    pub fn after_len(&self) -> usize {
        self.after.chars().count()
    }
}

/// Lowercase a single char, keeping it when lowercasing would expand it.
fn fold(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Split `buffer` at the last occurrence of the configured abbreviation.
///
/// With `ignore_case` both sides are case-folded for the search, but the
/// returned substrings keep the case the user typed. Returns `None` when no
/// abbreviation is configured or it does not occur.
pub fn partition(cfg: &AbbreviationConfig, buffer: &str) -> Option<Partition> {
    let abbr = cfg.abbreviation.as_deref().filter(|a| !a.is_empty())?;
    let hay: Vec<char> = buffer.chars().collect();
    let needle: Vec<char> = abbr.chars().collect();
    if needle.len() > hay.len() {
        return None;
    }
    let eq = |a: char, b: char| {
        if cfg.ignore_case {
            fold(a) == fold(b)
        } else {
            a == b
        }
    };
    let start = (0..=hay.len() - needle.len())
        .rev()
        .find(|&i| hay[i..i + needle.len()].iter().zip(&needle).all(|(&h, &n)| eq(h, n)))?;
    let end = start + needle.len();
    Some(Partition {
        before: hay[..start].iter().collect(),
        matched: hay[start..end].iter().collect(),
        after: hay[end..].iter().collect(),
    })
}

/// Apply the boundary rules to a partition.
///
/// - Not immediate: exactly one char must follow, and it must not be a word
///   char.
/// - Immediate: nothing may follow.
/// - A word char directly before the abbreviation blocks the trigger unless
///   `trigger_inside` is set.
pub fn should_trigger(cfg: &AbbreviationConfig, p: &Partition) -> bool {
    if p.matched.is_empty() {
        return false;
    }
    let mut after = p.after.chars();
    if cfg.immediate {
        if after.next().is_some() {
            return false;
        }
    } else {
        match (after.next(), after.next()) {
            (Some(c), None) if !cfg.word_chars.is_word_char(c) => {}
            _ => return false,
        }
    }
    match p.before.chars().next_back() {
        Some(c) if cfg.word_chars.is_word_char(c) => cfg.trigger_inside,
        _ => true,
    }
}

/// Partition `buffer` and return the partition only if the abbreviation fires.
pub fn abbreviation_match(cfg: &AbbreviationConfig, buffer: &str) -> Option<Partition> {
    partition(cfg, buffer).filter(|p| should_trigger(cfg, p))
}

/// Exact hotkey match: filter passes, same modifier set, same key.
pub fn check_hotkey(
    cfg: &HotkeyConfig,
    filter: &WindowFilterConfig,
    modifiers: &BTreeSet<Modifier>,
    key: &str,
    title: &str,
) -> bool {
    match cfg.hot_key.as_deref() {
        Some(k) => filter.passes(title) && cfg.modifiers == *modifiers && k == key,
        None => false,
    }
}
