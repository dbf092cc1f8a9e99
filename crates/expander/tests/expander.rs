use std::{collections::BTreeSet, sync::Arc, time::Duration};

use crossbeam_channel::{Receiver, Sender, unbounded};
use dispatch::{
    EventDispatcher, Listener, ListenerRegistry,
    mock::{Op, ScriptedBackend},
};
use expander::{Expander, ExpanderConfig, ExpanderEvent, Output};
use keyspec::{Key, Modifier};
use parking_lot::Mutex;
use triggers::{NodeId, Phrase, Script, SendMode, TriggerTree, Triggers, WindowFilterConfig};

/// Registered after the expander; one signal per event it has finished.
struct Dispatched(Sender<()>);

impl Listener for Dispatched {
    fn handle_keypress(&self, _key: &str, _window_title: &str) {
        self.0.send(()).ok();
    }

    fn handle_hotkey(&self, _key: &str, _modifiers: &BTreeSet<Modifier>, _window_title: &str) {
        self.0.send(()).ok();
    }

    fn handle_mouseclick(&self) {
        self.0.send(()).ok();
    }
}

struct Harness {
    backend: Arc<ScriptedBackend>,
    dispatcher: Arc<EventDispatcher>,
    expander: Arc<Expander>,
    events: Receiver<ExpanderEvent>,
    dispatched: Receiver<()>,
}

impl Harness {
    fn new(tree: TriggerTree) -> Self {
        Self::with_config(tree, ExpanderConfig::default())
    }

    fn with_config(tree: TriggerTree, config: ExpanderConfig) -> Self {
        let backend = Arc::new(ScriptedBackend::new());
        let registry = Arc::new(ListenerRegistry::new());
        let dispatcher = Arc::new(EventDispatcher::start(backend.clone(), registry.clone()).unwrap());
        let out: Arc<dyn Output> = dispatcher.clone();
        let (expander, events) = Expander::new(Arc::new(Mutex::new(tree)), &out, config);
        registry.register(expander.clone());
        let (tx, dispatched) = unbounded();
        registry.register(Arc::new(Dispatched(tx)));
        Self {
            backend,
            dispatcher,
            expander,
            events,
            dispatched,
        }
    }

    /// Block until the expander has handled `n` more events.
    fn wait_dispatched(&self, n: usize) {
        for _ in 0..n {
            self.dispatched.recv_timeout(Duration::from_secs(5)).unwrap();
        }
    }

    /// Type `text`, drain the queue, and return what was sent.
    fn type_and_drain(&self, text: &str) -> Vec<Op> {
        self.backend.type_text(text);
        self.dispatcher.shutdown();
        self.backend.take_ops()
    }

    fn next_event(&self) -> ExpanderEvent {
        self.events.recv_timeout(Duration::from_secs(5)).unwrap()
    }
}

fn backspaces(n: usize) -> Vec<Op> {
    vec![Op::Key(Key::Backspace); n]
}

fn tree_with(phrase: Phrase, triggers: Triggers) -> (TriggerTree, NodeId) {
    let mut tree = TriggerTree::new("root");
    let id = tree.add_phrase(tree.root(), phrase, triggers).unwrap();
    (tree, id)
}

#[test]
fn abbreviation_expands_and_keeps_boundary() {
    let (tree, id) = tree_with(Phrase::new("sig", "Best regards"), Triggers::abbreviation("sig"));
    let h = Harness::new(tree);
    let ops = h.type_and_drain("so sig ");
    let mut want = backspaces(4);
    want.extend([Op::Text("Best regards ".into()), Op::Flush]);
    assert_eq!(ops, want);
    assert_eq!(h.expander.keystrokes_saved(), 13 - 4);
    assert_eq!(h.expander.buffer(), "");
    let tree = h.expander.tree().lock();
    assert_eq!(tree.node(id).unwrap().usage_count, 1);
    assert_eq!(tree.node(tree.root()).unwrap().usage_count, 1);
}

#[test]
fn word_char_before_abbreviation_blocks() {
    let (tree, _) = tree_with(Phrase::new("sig", "Best regards"), Triggers::abbreviation("sig"));
    let h = Harness::new(tree);
    assert!(h.type_and_drain("design ").is_empty());
}

#[test]
fn cursor_marker_and_omitted_trigger() {
    let mut phrase = Phrase::new("parens", "(<cursor>)");
    phrase.omit_trigger = true;
    let (tree, _) = tree_with(phrase, Triggers::abbreviation("pp"));
    let h = Harness::new(tree);
    let ops = h.type_and_drain("pp ");
    let mut want = backspaces(3);
    want.extend([Op::Text("()".into()), Op::Key(Key::Left), Op::Flush]);
    assert_eq!(ops, want);
}

#[test]
fn match_case_follows_typed_abbreviation() {
    let mut phrase = Phrase::new("hw", "hello world");
    phrase.match_case = true;
    let mut triggers = Triggers::abbreviation("hw");
    triggers.abbreviation.ignore_case = true;
    let (tree, _) = tree_with(phrase, triggers);
    let h = Harness::new(tree);
    let ops = h.type_and_drain("Hw.HW.");
    let mut want = backspaces(3);
    want.push(Op::Text("Hello world.".into()));
    want.push(Op::Flush);
    want.extend(backspaces(3));
    want.push(Op::Text("HELLO WORLD.".into()));
    want.push(Op::Flush);
    assert_eq!(ops, want);
}

#[test]
fn clipboard_send_mode_pastes_with_chord() {
    let mut phrase = Phrase::new("addr", "1 Main St");
    phrase.send_mode = SendMode::ClipboardCtrlV;
    phrase.omit_trigger = true;
    let (tree, _) = tree_with(phrase, Triggers::abbreviation("addr"));
    let h = Harness::new(tree);
    let ops = h.type_and_drain("addr\t");
    let mut want = backspaces(5);
    want.extend([
        Op::Clipboard("1 Main St".into()),
        Op::Chord {
            target: "v".into(),
            modifiers: vec![Modifier::Control],
        },
        Op::Flush,
    ]);
    assert_eq!(ops, want);
}

#[test]
fn selection_send_mode_pastes_without_chord() {
    let mut phrase = Phrase::new("sel", "picked");
    phrase.send_mode = SendMode::Selection;
    phrase.omit_trigger = true;
    let (tree, _) = tree_with(phrase, Triggers::abbreviation("sel"));
    let h = Harness::new(tree);
    let ops = h.type_and_drain("sel ");
    let mut want = backspaces(4);
    want.extend([Op::Clipboard("picked".into()), Op::Flush]);
    assert_eq!(ops, want);
}

#[test]
fn script_erases_trigger_and_emits_event() {
    let mut tree = TriggerTree::new("root");
    let id = tree
        .add_script(tree.root(), Script::new("greet", "print('hi')"), Triggers::abbreviation("gr"))
        .unwrap();
    let h = Harness::new(tree);
    let ops = h.type_and_drain("gr.");
    let mut want = backspaces(3);
    want.extend([Op::Text(".".into()), Op::Flush]);
    assert_eq!(ops, want);
    assert_eq!(
        h.next_event(),
        ExpanderEvent::RunScript {
            item: id,
            description: "greet".into(),
            code: "print('hi')".into(),
        }
    );
}

#[test]
fn folder_abbreviation_offers_menu_then_activates() {
    let mut tree = TriggerTree::new("root");
    let folder = tree
        .add_folder(tree.root(), "greetings", Triggers::abbreviation("ff"))
        .unwrap();
    let hello = tree
        .add_phrase(folder, Phrase::new("hello", "Hello"), Triggers::default())
        .unwrap();
    let bye = tree
        .add_phrase(folder, Phrase::new("bye", "Bye"), Triggers::default())
        .unwrap();
    let h = Harness::new(tree);
    h.backend.type_text("ff ");
    let ExpanderEvent::ShowMenu { items, buffer } = h.next_event() else {
        panic!("expected a menu");
    };
    assert_eq!(items, vec![hello, bye]);
    assert_eq!(buffer, "ff ");

    h.expander.activate(hello, &buffer).unwrap();
    let mut want = backspaces(3);
    want.extend([Op::Text("Hello".into()), Op::Flush]);
    assert_eq!(h.backend.take_ops(), want);
    assert_eq!(h.expander.keystrokes_saved(), 5 - 3);

    let tree = h.expander.tree().lock();
    assert_eq!(tree.node(hello).unwrap().usage_count, 1);
    assert_eq!(tree.node(folder).unwrap().usage_count, 1);
    assert_eq!(tree.node(bye).unwrap().usage_count, 0);
}

#[test]
fn prompting_phrase_waits_for_activation() {
    let mut phrase = Phrase::new("sig", "Best regards");
    phrase.prompt = true;
    let (tree, id) = tree_with(phrase, Triggers::abbreviation("sig"));
    let h = Harness::new(tree);
    h.backend.type_text("sig ");
    assert_eq!(
        h.next_event(),
        ExpanderEvent::ShowMenu {
            items: vec![id],
            buffer: "sig ".into(),
        }
    );
    assert!(h.backend.take_ops().is_empty());
    h.expander.activate(id, "sig ").unwrap();
    assert_eq!(h.backend.take_ops().len(), 4 + 2);
}

#[test]
fn hotkey_releases_held_modifier_around_text() {
    let (tree, id) = tree_with(
        Phrase::new("hello", "Hello there"),
        Triggers::hotkey([Modifier::Control], "e"),
    );
    let h = Harness::new(tree);
    h.backend.modifier_down(Modifier::Control);
    let ops = h.type_and_drain("e");
    assert_eq!(
        ops,
        vec![
            Op::Release(Modifier::Control),
            Op::Text("Hello there".into()),
            Op::Press(Modifier::Control),
            Op::Flush,
        ]
    );
    assert_eq!(h.expander.keystrokes_saved(), 11 - 2);
    assert_eq!(h.expander.buffer(), "");
    assert_eq!(h.expander.tree().lock().node(id).unwrap().usage_count, 1);
}

#[test]
fn wrong_hotkey_modifiers_do_nothing() {
    let (tree, _) = tree_with(
        Phrase::new("hello", "Hello"),
        Triggers::hotkey([Modifier::Control], "e"),
    );
    let h = Harness::new(tree);
    h.backend.modifier_down(Modifier::Control);
    h.backend.modifier_down(Modifier::Alt);
    assert!(h.type_and_drain("e").is_empty());
}

#[test]
fn window_filter_limits_expansion() {
    let mut triggers = Triggers::abbreviation("sig");
    triggers.filter = WindowFilterConfig::new("Mail").unwrap();
    let (tree, _) = tree_with(Phrase::new("sig", "Best regards"), triggers);
    let h = Harness::new(tree);
    h.backend.set_title("Terminal - Mail");
    h.backend.type_text("sig ");
    h.backend.set_title("Mail - Inbox");
    let ops = h.type_and_drain("sig ");
    assert_eq!(ops.len(), 4 + 2);
}

#[test]
fn backspace_edits_the_buffer() {
    let (tree, _) = tree_with(Phrase::new("sig", "Best regards"), Triggers::abbreviation("sig"));
    let h = Harness::new(tree);
    h.backend.type_text("sx");
    h.backend.press_key_named(Key::Backspace);
    let ops = h.type_and_drain("ig ");
    assert_eq!(ops.len(), 4 + 2);
}

#[test]
fn escape_resets_the_buffer() {
    let (tree, _) = tree_with(Phrase::new("sig", "Best regards"), Triggers::abbreviation("sig"));
    let h = Harness::new(tree);
    h.backend.type_text("si");
    h.backend.press_key_named(Key::Escape);
    assert!(h.type_and_drain("g ").is_empty());
}

#[test]
fn mouse_click_resets_the_buffer() {
    let (tree, _) = tree_with(Phrase::new("sig", "Best regards"), Triggers::abbreviation("sig"));
    let h = Harness::new(tree);
    h.backend.type_text("si");
    h.backend.click();
    assert!(h.type_and_drain("g ").is_empty());
}

#[test]
fn mouse_click_reset_can_be_disabled() {
    let (tree, _) = tree_with(Phrase::new("sig", "Best regards"), Triggers::abbreviation("sig"));
    let h = Harness::with_config(
        tree,
        ExpanderConfig {
            reset_on_mouse_click: false,
            ..ExpanderConfig::default()
        },
    );
    h.backend.type_text("si");
    h.backend.click();
    assert_eq!(h.type_and_drain("g ").len(), 4 + 2);
}

#[test]
fn paused_expander_ignores_input() {
    let (tree, _) = tree_with(Phrase::new("sig", "Best regards"), Triggers::abbreviation("sig"));
    let h = Harness::new(tree);
    h.expander.pause();
    assert!(h.expander.is_paused());
    h.backend.type_text("sig ");
    h.wait_dispatched(4);
    h.expander.resume();
    let ops = h.type_and_drain("sig ");
    assert_eq!(ops.len(), 4 + 2);
}

#[test]
fn first_match_in_tree_order_wins() {
    let mut tree = TriggerTree::new("root");
    let folder = tree.add_folder(tree.root(), "a", Triggers::default()).unwrap();
    tree.add_phrase(folder, Phrase::new("one", "first"), Triggers::abbreviation("x"))
        .unwrap();
    tree.add_phrase(tree.root(), Phrase::new("two", "second"), Triggers::abbreviation("x"))
        .unwrap();
    let h = Harness::new(tree);
    let ops = h.type_and_drain("x ");
    assert!(ops.contains(&Op::Text("first ".into())));
    assert!(!ops.contains(&Op::Text("second ".into())));
}

#[test]
fn expander_does_not_keep_dispatcher_alive() {
    let (tree, id) = tree_with(Phrase::new("sig", "Best regards"), Triggers::abbreviation("sig"));
    let h = Harness::new(tree);
    let Harness {
        dispatcher,
        expander,
        ..
    } = h;
    drop(dispatcher);
    assert!(matches!(
        expander.activate(id, "sig "),
        Err(expander::Error::OutputGone)
    ));
}
