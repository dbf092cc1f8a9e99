//! Turning a fired phrase or script into something the sender can replay.

use keyspec::{CURSOR_MARKER, Segment, contains_navigation_key, segments};
use tracing::trace;

use crate::{Error, NodeId, NodeKind, Result, TriggerTree, matching::Partition};

/// What to send for one activation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Text to insert, with key tokens still embedded.
    pub string: String,
    /// Backspaces to send before the text.
    pub backspaces: usize,
    /// Left-arrow presses to send after the text.
    pub lefts: usize,
}

/// Case shape of the abbreviation as the user typed it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CaseShape {
    /// Each word starts upper and continues lower, e.g. `Btw`.
    Title,
    /// Every cased char is upper.
    Upper,
    /// Every cased char is lower.
    Lower,
    /// Anything else, or no cased chars at all.
    Mixed,
}

/// Classify the case of `s`. Title wins over upper, so a lone `A` is title.
fn case_shape(s: &str) -> CaseShape {
    let mut any_cased = false;
    let mut title = true;
    let mut prev_cased = false;
    let (mut all_upper, mut all_lower) = (true, true);
    for c in s.chars() {
        if c.is_uppercase() {
            any_cased = true;
            all_lower = false;
            if prev_cased {
                title = false;
            }
            prev_cased = true;
        } else if c.is_lowercase() {
            any_cased = true;
            all_upper = false;
            if !prev_cased {
                title = false;
            }
            prev_cased = true;
        } else {
            prev_cased = false;
        }
    }
    match (any_cased, title, all_upper, all_lower) {
        (false, ..) => CaseShape::Mixed,
        (true, true, ..) => CaseShape::Title,
        (true, _, true, _) => CaseShape::Upper,
        (true, _, _, true) => CaseShape::Lower,
        _ => CaseShape::Mixed,
    }
}

/// First char uppercased, the rest lowercased.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Reshape `text` to follow the case the abbreviation was typed in.
fn mirror_case(typed: &str, text: &str) -> String {
    match case_shape(typed) {
        CaseShape::Title => capitalize(text),
        CaseShape::Upper => text.to_uppercase(),
        CaseShape::Lower => text.to_lowercase(),
        CaseShape::Mixed => text.to_string(),
    }
}

/// Strip the cursor marker from `text`, returning the joined text and the
/// left-arrow presses needed to put the caret back where the marker was.
///
/// Key tokens after the marker do not count. Any navigation key anywhere in
/// the text disables the count, since the caret position is then unknown.
fn take_cursor(text: &str) -> (String, usize) {
    let Some((first, second)) = text.split_once(CURSOR_MARKER) else {
        return (text.to_string(), 0);
    };
    let lefts = if contains_navigation_key(text) {
        0
    } else {
        segments(second)
            .iter()
            .map(|s| match s {
                Segment::Text(t) => t.chars().count(),
                Segment::Key(_) | Segment::Modifier(_) => 0,
            })
            .sum()
    };
    (format!("{first}{second}"), lefts)
}

/// Backspaces for a live match.
fn backspaces_for(backspace: bool, abbr_len: usize, p: &Partition) -> usize {
    if backspace {
        abbr_len + p.after_len()
    } else {
        p.after_len()
    }
}

/// Live abbreviation match for `id`, if any, with its backspace count.
fn live_match(tree: &TriggerTree, id: NodeId, buffer: &str) -> Result<Option<(Partition, usize)>> {
    let t = &tree.node(id)?.triggers;
    Ok(t.abbreviation_match(buffer).map(|p| {
        let bs = backspaces_for(t.abbreviation.backspace, t.abbreviation.len(), &p);
        (p, bs)
    }))
}

/// Backspaces inherited from the nearest matching ancestor folder.
fn inherited_backspaces(tree: &TriggerTree, id: NodeId, buffer: &str) -> Result<usize> {
    Ok(tree
        .node(id)?
        .parent()
        .map_or(0, |p| tree.backspace_count_for_ancestors(p, buffer)))
}

/// Build the expansion for phrase `id` against `buffer`.
///
/// Counts as a use of the phrase and of every folder above it.
pub fn build_phrase(tree: &mut TriggerTree, id: NodeId, buffer: &str) -> Result<Expansion> {
    let NodeKind::Phrase(phrase) = &tree.node(id)?.kind else {
        return Err(Error::WrongKind {
            id,
            expected: "phrase",
        });
    };
    let phrase = phrase.clone();
    let mut exp = Expansion {
        string: phrase.phrase.clone(),
        ..Expansion::default()
    };
    match live_match(tree, id, buffer)? {
        Some((p, backspaces)) => {
            exp.backspaces = backspaces;
            if !phrase.omit_trigger {
                exp.string.push_str(&p.after);
            }
            let (joined, lefts) = take_cursor(&exp.string);
            exp.lefts = lefts;
            exp.string = if phrase.match_case {
                mirror_case(&p.matched, &joined)
            } else {
                joined
            };
        }
        None => {
            exp.backspaces = inherited_backspaces(tree, id, buffer)?;
            (exp.string, exp.lefts) = take_cursor(&exp.string);
        }
    }
    tree.increment_usage(id)?;
    trace!(?id, backspaces = exp.backspaces, lefts = exp.lefts, "phrase_built");
    Ok(exp)
}

/// Build the deletion count and literal prefix for script `id`.
///
/// The returned string is the boundary char to retype, or empty.
pub fn build_script(tree: &mut TriggerTree, id: NodeId, buffer: &str) -> Result<(usize, String)> {
    let NodeKind::Script(script) = &tree.node(id)?.kind else {
        return Err(Error::WrongKind {
            id,
            expected: "script",
        });
    };
    let omit = script.omit_trigger;
    let out = match live_match(tree, id, buffer)? {
        Some((p, backspaces)) => (backspaces, if omit { String::new() } else { p.after }),
        None => (inherited_backspaces(tree, id, buffer)?, String::new()),
    };
    tree.increment_usage(id)?;
    trace!(?id, backspaces = out.0, "script_built");
    Ok(out)
}
