//! Trigger configuration value objects shared by folders, phrases and scripts.
//!
//! Each trigger-bearing node owns one [`Triggers`] bundle: the enabled
//! [`TriggerMode`]s plus three independent configs (abbreviation, hotkey,
//! window filter). Matching over these values lives in [`crate::matching`].

use std::{collections::BTreeSet, fmt};

use keyspec::Modifier;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, matching};

/// Default word-character class.
pub const DEFAULT_WORD_CHARS: &str = r"[\w]";

/// Compiled form of [`DEFAULT_WORD_CHARS`].
static DEFAULT_WORD_CHARS_RE: Lazy<Regex> = Lazy::new(|| {
    anchored(DEFAULT_WORD_CHARS).expect("default word chars compile")
});

/// Compile `pattern` so that it only matches at the start of the input.
fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})", pattern))
}

/// Which trigger kinds are enabled for a node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    /// Node is only reachable from menus.
    None,
    /// Node fires on its abbreviation.
    Abbreviation,
    /// Node fires on its hotkey.
    Hotkey,
}

/// A single-character class deciding what counts as part of a word.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WordChars {
    /// Source pattern as configured.
    pattern: String,
    /// Start-anchored compiled pattern.
    re: Regex,
}

impl WordChars {
    /// Compile a word-character pattern.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        let re = anchored(pattern).map_err(|e| Error::InvalidWordChars {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            re,
        })
    }

    /// Source pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True when `c` is a word character.
    pub fn is_word_char(&self, c: char) -> bool {
        let mut buf = [0u8; 4];
        self.re.is_match(c.encode_utf8(&mut buf))
    }
}

impl Default for WordChars {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_WORD_CHARS.to_string(),
            re: DEFAULT_WORD_CHARS_RE.clone(),
        }
    }
}

impl PartialEq for WordChars {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl fmt::Debug for WordChars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WordChars({:?})", self.pattern)
    }
}

impl TryFrom<String> for WordChars {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<WordChars> for String {
    fn from(value: WordChars) -> Self {
        value.pattern
    }
}

/// Abbreviation settings for a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbbreviationConfig {
    /// Literal text that triggers the node.
    #[serde(default)]
    pub abbreviation: Option<String>,
    /// Erase the typed abbreviation before sending.
    #[serde(default = "default_true")]
    pub backspace: bool,
    /// Match the abbreviation case-insensitively.
    #[serde(default)]
    pub ignore_case: bool,
    /// Fire as soon as the abbreviation is typed, without a boundary char.
    #[serde(default)]
    pub immediate: bool,
    /// Allow firing when the abbreviation follows a word character.
    #[serde(default)]
    pub trigger_inside: bool,
    /// Character class that defines word boundaries.
    #[serde(default)]
    pub word_chars: WordChars,
}

/// Serde default for flags that are on unless stated otherwise.
fn default_true() -> bool {
    true
}

impl Default for AbbreviationConfig {
    fn default() -> Self {
        Self {
            abbreviation: None,
            backspace: true,
            ignore_case: false,
            immediate: false,
            trigger_inside: false,
            word_chars: WordChars::default(),
        }
    }
}

impl AbbreviationConfig {
    /// Config with the given abbreviation and default options.
    pub fn new(abbreviation: impl Into<String>) -> Self {
        Self {
            abbreviation: Some(abbreviation.into()),
            ..Self::default()
        }
    }

    /// Length of the configured abbreviation in characters.
    pub fn len(&self) -> usize {
        self.abbreviation
            .as_deref()
            .map_or(0, |a| a.chars().count())
    }

    /// True when no abbreviation text is configured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hotkey settings: an exact modifier set plus a key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotkeyConfig {
    /// Required modifiers; kept sorted by construction.
    #[serde(default)]
    pub modifiers: BTreeSet<Modifier>,
    /// The key character or token, e.g. `k` or `<f5>`.
    #[serde(default)]
    pub hot_key: Option<String>,
}

impl HotkeyConfig {
    /// Build a hotkey from any iterable of modifiers.
    pub fn new(modifiers: impl IntoIterator<Item = Modifier>, key: impl Into<String>) -> Self {
        Self {
            modifiers: modifiers.into_iter().collect(),
            hot_key: Some(key.into()),
        }
    }

    /// Render as `<ctrl>+<alt>+k`; a space key renders as `<space>`.
    pub fn render(&self) -> String {
        let mut out = Modifier::join(&self.modifiers);
        match self.hot_key.as_deref() {
            Some(" ") => out.push_str("<space>"),
            Some(k) => out.push_str(k),
            None => {}
        }
        out
    }
}

/// Window title regex; matched from the start of the title.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TitlePattern {
    /// Source pattern as configured.
    pattern: String,
    /// Start-anchored compiled pattern.
    re: Regex,
}

impl TitlePattern {
    /// Compile a window title pattern.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        let re = anchored(pattern).map_err(|e| Error::InvalidWindowFilter {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            re,
        })
    }

    /// Source pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True when the pattern matches at the start of `title`.
    pub fn matches(&self, title: &str) -> bool {
        self.re.is_match(title)
    }
}

impl PartialEq for TitlePattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl fmt::Debug for TitlePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TitlePattern({:?})", self.pattern)
    }
}

impl TryFrom<String> for TitlePattern {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<TitlePattern> for String {
    fn from(value: TitlePattern) -> Self {
        value.pattern
    }
}

/// Restricts a node to windows whose title matches.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowFilterConfig {
    /// No pattern means every window passes.
    pub title: Option<TitlePattern>,
}

impl WindowFilterConfig {
    /// Filter matching titles against `pattern`.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        Ok(Self {
            title: Some(TitlePattern::new(pattern)?),
        })
    }

    /// True when the filter admits `title`.
    pub fn passes(&self, title: &str) -> bool {
        self.title.as_ref().is_none_or(|p| p.matches(title))
    }

    /// True when no pattern is configured.
    pub fn is_default(&self) -> bool {
        self.title.is_none()
    }
}

/// Complete trigger configuration carried by every node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Triggers {
    /// Enabled trigger kinds.
    pub modes: BTreeSet<TriggerMode>,
    /// Abbreviation settings.
    pub abbreviation: AbbreviationConfig,
    /// Hotkey settings.
    pub hotkey: HotkeyConfig,
    /// Window restriction.
    pub filter: WindowFilterConfig,
}

impl Triggers {
    /// Triggers firing on `abbreviation` with default options.
    pub fn abbreviation(abbreviation: impl Into<String>) -> Self {
        Self {
            modes: [TriggerMode::Abbreviation].into_iter().collect(),
            abbreviation: AbbreviationConfig::new(abbreviation),
            ..Self::default()
        }
    }

    /// Triggers firing on a hotkey.
    pub fn hotkey(modifiers: impl IntoIterator<Item = Modifier>, key: impl Into<String>) -> Self {
        Self {
            modes: [TriggerMode::Hotkey].into_iter().collect(),
            hotkey: HotkeyConfig::new(modifiers, key),
            ..Self::default()
        }
    }

    /// True when `mode` is enabled.
    pub fn has_mode(&self, mode: TriggerMode) -> bool {
        self.modes.contains(&mode)
    }

    /// Abbreviation text for display; empty when abbreviation mode is off.
    pub fn abbreviation_for_display(&self) -> &str {
        if self.has_mode(TriggerMode::Abbreviation) {
            self.abbreviation.abbreviation.as_deref().unwrap_or("")
        } else {
            ""
        }
    }

    /// Hotkey rendering for display; empty when hotkey mode is off.
    pub fn hotkey_string(&self) -> String {
        if self.has_mode(TriggerMode::Hotkey) {
            self.hotkey.render()
        } else {
            String::new()
        }
    }

    /// The abbreviation partition when abbreviation mode is on and the
    /// abbreviation fires against `buffer`.
    pub fn abbreviation_match(&self, buffer: &str) -> Option<matching::Partition> {
        if !self.has_mode(TriggerMode::Abbreviation) {
            return None;
        }
        matching::abbreviation_match(&self.abbreviation, buffer)
    }

    /// Hotkey check including the window filter; requires hotkey mode.
    pub fn check_hotkey(&self, modifiers: &BTreeSet<Modifier>, key: &str, title: &str) -> bool {
        self.has_mode(TriggerMode::Hotkey)
            && matching::check_hotkey(&self.hotkey, &self.filter, modifiers, key, title)
    }
}
