//! Splitting send strings into literal text and key tokens.
//!
//! A send string alternates literal runs with bracketed tokens. A token that
//! names a modifier and is immediately followed by `+` (e.g. `<ctrl>+`) is a
//! modifier application: it chords onto whatever segment comes next.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{Key, Modifier};

/// Bracketed token, optionally followed by `+`.
static KEY_SPLIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<[^<>]+>\+?").expect("static key split regex")
});

/// One piece of a send string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Segment {
    /// Literal text sent as typed characters.
    Text(String),
    /// A named key press.
    Key(Key),
    /// A modifier to hold while sending the next segment.
    Modifier(Modifier),
}

impl Segment {
    /// Number of characters this segment leaves in a text field.
    ///
    /// Keys count as one; modifier applications leave nothing behind on
    /// their own.
    pub fn char_len(&self) -> usize {
        match self {
            Self::Text(t) => t.chars().count(),
            Self::Key(_) => 1,
            Self::Modifier(_) => 0,
        }
    }
}

/// Push literal text, merging with a preceding text segment.
fn push_text(out: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Segment::Text(prev)) = out.last_mut() {
        prev.push_str(text);
    } else {
        out.push(Segment::Text(text.to_string()));
    }
}

/// Split `s` into segments. Unknown `<...>` tokens are kept as literal text.
pub fn segments(s: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut last = 0;
    for found in KEY_SPLIT_RE.find_iter(s) {
        push_text(&mut out, &s[last..found.start()]);
        last = found.end();
        let tok = found.as_str();
        let (name, plus) = match tok.strip_suffix('+') {
            Some(name) => (name, true),
            None => (tok, false),
        };
        match Key::from_token(name) {
            Some(Key::Mod(m)) if plus => out.push(Segment::Modifier(m)),
            Some(k) => {
                out.push(Segment::Key(k));
                if plus {
                    push_text(&mut out, "+");
                }
            }
            None => push_text(&mut out, tok),
        }
    }
    push_text(&mut out, &s[last..]);
    out
}

/// True when any navigation key token appears in `s`.
pub fn contains_navigation_key(s: &str) -> bool {
    segments(s)
        .iter()
        .any(|seg| matches!(seg, Segment::Key(k) if k.is_navigation()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Segment {
        Segment::Text(s.to_string())
    }

    #[test]
    fn plain_text_is_one_segment() {
        assert_eq!(segments("hello world"), vec![text("hello world")]);
        assert!(segments("").is_empty());
    }

    #[test]
    fn keys_split_literal_runs() {
        assert_eq!(
            segments("a<tab>b<ENTER>"),
            vec![text("a"), Segment::Key(Key::Tab), text("b"), Segment::Key(Key::Enter)]
        );
    }

    #[test]
    fn modifier_application() {
        assert_eq!(
            segments("<ctrl>+<shift>+v"),
            vec![
                Segment::Modifier(Modifier::Control),
                Segment::Modifier(Modifier::Shift),
                text("v"),
            ]
        );
        // A modifier without the trailing plus is a plain key press.
        assert_eq!(segments("<shift>"), vec![Segment::Key(Key::Mod(Modifier::Shift))]);
    }

    #[test]
    fn non_modifier_with_plus_keeps_plus_as_text() {
        assert_eq!(
            segments("<tab>+x"),
            vec![Segment::Key(Key::Tab), text("+x")]
        );
    }

    #[test]
    fn unknown_tokens_stay_literal() {
        assert_eq!(segments("a <b> c"), vec![text("a <b> c")]);
        assert_eq!(segments("1 < 2 > 0"), vec![text("1 < 2 > 0")]);
    }

    #[test]
    fn char_len_accounting() {
        let total: usize = segments("ab<tab><ctrl>+c").iter().map(Segment::char_len).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn navigation_detection() {
        assert!(contains_navigation_key("x<left>"));
        assert!(contains_navigation_key("<HOME>"));
        assert!(!contains_navigation_key("x<tab>y"));
        assert!(!contains_navigation_key("<lefty>"));
    }
}
