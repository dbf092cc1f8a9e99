//! Human-readable output lines.

use dispatch::mock::Op;
use expander::ExpanderEvent;
use triggers::{NodeId, TriggerTree};

/// One line for an outbound call.
fn describe(op: &Op) -> String {
    match op {
        Op::Key(k) => format!("key {k}"),
        Op::Text(t) => format!("type {t:?}"),
        Op::Chord { target, modifiers } => {
            let prefix: String = modifiers.iter().map(|m| format!("{}+", m.token())).collect();
            format!("chord {prefix}{target}")
        }
        Op::Clipboard(t) => format!("paste {t:?}"),
        Op::Press(m) => format!("press {}", m.token()),
        Op::Release(m) => format!("release {}", m.token()),
        Op::Flush => "flush".to_string(),
    }
}

/// Outbound calls, with runs of identical calls folded into one line.
pub fn ops(ops: &[Op]) -> Vec<String> {
    let mut out: Vec<(String, usize)> = Vec::new();
    for line in ops.iter().map(describe) {
        match out.last_mut() {
            Some((prev, n)) if *prev == line => *n += 1,
            _ => out.push((line, 1)),
        }
    }
    out.into_iter()
        .map(|(line, n)| if n > 1 { format!("{line} x{n}") } else { line })
        .collect()
}

/// Title of a node, or its id when it is gone.
fn title(tree: &TriggerTree, id: NodeId) -> String {
    tree.get(id)
        .map_or_else(|| format!("{id:?}"), |n| n.title().to_string())
}

/// Expander events, naming nodes by title.
pub fn events(events: &[ExpanderEvent], tree: &TriggerTree) -> Vec<String> {
    events
        .iter()
        .map(|ev| match ev {
            ExpanderEvent::RunScript { description, code, .. } => {
                format!("run script {description:?}: {code:?}")
            }
            ExpanderEvent::ShowMenu { items, buffer } => {
                let names: Vec<String> = items.iter().map(|id| title(tree, *id)).collect();
                format!("menu [{}] for {buffer:?}", names.join(", "))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use keyspec::{Key, Modifier};
    use triggers::{Phrase, Triggers};

    use super::*;

    #[test]
    fn repeated_ops_fold() {
        let lines = ops(&[
            Op::Key(Key::Backspace),
            Op::Key(Key::Backspace),
            Op::Key(Key::Backspace),
            Op::Text("hi".into()),
            Op::Chord {
                target: "v".into(),
                modifiers: vec![Modifier::Control, Modifier::Shift],
            },
            Op::Flush,
        ]);
        assert_eq!(
            lines,
            vec![
                "key <backspace> x3",
                "type \"hi\"",
                "chord <ctrl>+<shift>+v",
                "flush",
            ]
        );
    }

    #[test]
    fn menu_lists_titles() {
        let mut tree = TriggerTree::new("root");
        let a = tree
            .add_phrase(tree.root(), Phrase::new("alpha", "a"), Triggers::default())
            .unwrap();
        let lines = events(
            &[ExpanderEvent::ShowMenu {
                items: vec![a],
                buffer: "x ".into(),
            }],
            &tree,
        );
        assert_eq!(lines, vec!["menu [alpha] for \"x \""]);
    }
}
