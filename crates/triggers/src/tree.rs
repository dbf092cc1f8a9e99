//! Arena-backed trigger tree: folders containing phrases and scripts.
//!
//! Nodes live in a single arena and are addressed by [`NodeId`]. Each node
//! records its parent's id for upward lookups; the arena owns every node and
//! each folder lists its children by id. Removed slots are never reused, so a
//! stale id resolves to `None` instead of a different node.

use std::iter;

use serde_json::{Map, Value};
use tracing::debug;

use crate::{Error, Result, TriggerMode, Triggers, matching};

/// Stable identifier of a node in a [`TriggerTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// How a phrase's text reaches the focused application.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SendMode {
    /// Typed as key events.
    #[default]
    #[serde(rename = "kb")]
    Keyboard,
    /// Placed on the clipboard and pasted with Ctrl+V.
    #[serde(rename = "<ctrl>+v")]
    ClipboardCtrlV,
    /// Placed on the clipboard and pasted with Ctrl+Shift+V.
    #[serde(rename = "<ctrl>+<shift>+v")]
    ClipboardCtrlShiftV,
    /// Placed on the clipboard and pasted with Shift+Insert.
    #[serde(rename = "<shift>+<insert>")]
    ClipboardShiftInsert,
    /// Placed in the mouse selection and pasted by the backend.
    #[serde(rename = "selection")]
    Selection,
}

impl SendMode {
    /// Key sequence that pastes after the text has been placed, if any.
    pub fn paste_chord(self) -> Option<&'static str> {
        match self {
            Self::Keyboard | Self::Selection => None,
            Self::ClipboardCtrlV => Some("<ctrl>+v"),
            Self::ClipboardCtrlShiftV => Some("<ctrl>+<shift>+v"),
            Self::ClipboardShiftInsert => Some("<shift>+<insert>"),
        }
    }
}

/// Container node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Folder {
    /// Display title.
    pub title: String,
    /// Child folders, in order.
    folders: Vec<NodeId>,
    /// Child phrases and scripts, in order.
    items: Vec<NodeId>,
}

impl Folder {
    /// Empty folder with a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Child folder ids.
    pub fn folders(&self) -> &[NodeId] {
        &self.folders
    }

    /// Child item ids.
    pub fn items(&self) -> &[NodeId] {
        &self.items
    }
}

/// Literal text replacement.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Phrase {
    /// Display name.
    pub description: String,
    /// Replacement text; may contain key tokens and a cursor marker.
    pub phrase: String,
    /// Ask the user before expanding.
    pub prompt: bool,
    /// Do not retype the boundary character after the replacement.
    pub omit_trigger: bool,
    /// Mirror the typed abbreviation's case onto the replacement.
    pub match_case: bool,
    /// Delivery mechanism.
    pub send_mode: SendMode,
}

impl Phrase {
    /// Phrase with default options.
    pub fn new(description: impl Into<String>, phrase: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            phrase: phrase.into(),
            ..Self::default()
        }
    }
}

/// Script payload; execution happens elsewhere.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Script {
    /// Display name.
    pub description: String,
    /// Opaque source code.
    pub code: String,
    /// Opaque persistent key/value store.
    pub store: Map<String, Value>,
    /// Ask the user before running.
    pub prompt: bool,
    /// Do not retype the boundary character.
    pub omit_trigger: bool,
}

impl Script {
    /// Script with default options.
    pub fn new(description: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            code: code.into(),
            ..Self::default()
        }
    }
}

/// Node payload.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// Container.
    Folder(Folder),
    /// Text replacement leaf.
    Phrase(Phrase),
    /// Script leaf.
    Script(Script),
}

impl NodeKind {
    /// Lowercase kind name, as persisted.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Folder(_) => "folder",
            Self::Phrase(_) => "phrase",
            Self::Script(_) => "script",
        }
    }
}

/// A node in the tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Parent folder; `None` only for the root.
    parent: Option<NodeId>,
    /// Successful activations of this node or anything beneath it.
    pub usage_count: u64,
    /// Show in the tray menu.
    pub show_in_menu: bool,
    /// Trigger configuration.
    pub triggers: Triggers,
    /// Payload.
    pub kind: NodeKind,
}

impl Node {
    /// Parent folder id.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Folder title or item description.
    pub fn title(&self) -> &str {
        match &self.kind {
            NodeKind::Folder(f) => &f.title,
            NodeKind::Phrase(p) => &p.description,
            NodeKind::Script(s) => &s.description,
        }
    }

    /// Whether the user should be asked before this node runs.
    pub fn should_prompt(&self) -> bool {
        match &self.kind {
            NodeKind::Folder(_) => false,
            NodeKind::Phrase(p) => p.prompt,
            NodeKind::Script(s) => s.prompt,
        }
    }

    /// Folder payload, if this is a folder.
    pub fn as_folder(&self) -> Option<&Folder> {
        match &self.kind {
            NodeKind::Folder(f) => Some(f),
            _ => None,
        }
    }
}

/// Hierarchy of folders, phrases and scripts with a single root folder.
#[derive(Clone, Debug)]
pub struct TriggerTree {
    /// Arena slots; `None` marks a removed node.
    nodes: Vec<Option<Node>>,
    /// Root folder.
    root: NodeId,
}

impl TriggerTree {
    /// Tree with an empty root folder.
    pub fn new(root_title: impl Into<String>) -> Self {
        Self::with_root(Folder::new(root_title), Triggers::default())
    }

    /// Tree whose root folder carries the given triggers.
    pub fn with_root(folder: Folder, triggers: Triggers) -> Self {
        let root = Node {
            parent: None,
            usage_count: 0,
            show_in_menu: false,
            triggers,
            kind: NodeKind::Folder(Folder {
                folders: Vec::new(),
                items: Vec::new(),
                ..folder
            }),
        };
        Self {
            nodes: vec![Some(root)],
            root: NodeId(0),
        }
    }

    /// Root folder id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a live node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Mutable lookup of a live node.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Look up a live node or fail with [`Error::UnknownNode`].
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id).ok_or(Error::UnknownNode(id))
    }

    /// Mutable variant of [`TriggerTree::node`].
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.get_mut(id).ok_or(Error::UnknownNode(id))
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Always false: the root cannot be removed.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Insert a node under `parent`.
    fn insert(&mut self, parent: NodeId, kind: NodeKind, triggers: Triggers) -> Result<NodeId> {
        let is_folder = matches!(kind, NodeKind::Folder(_));
        let id = NodeId(self.nodes.len());
        let NodeKind::Folder(folder) = &mut self.node_mut(parent)?.kind else {
            return Err(Error::NotAFolder(parent));
        };
        if is_folder {
            folder.folders.push(id);
        } else {
            folder.items.push(id);
        }
        self.nodes.push(Some(Node {
            parent: Some(parent),
            usage_count: 0,
            show_in_menu: false,
            triggers,
            kind,
        }));
        Ok(id)
    }

    /// Add an empty folder under `parent`.
    pub fn add_folder(
        &mut self,
        parent: NodeId,
        title: impl Into<String>,
        triggers: Triggers,
    ) -> Result<NodeId> {
        self.insert(parent, NodeKind::Folder(Folder::new(title)), triggers)
    }

    /// Add a phrase under `parent`.
    pub fn add_phrase(&mut self, parent: NodeId, phrase: Phrase, triggers: Triggers) -> Result<NodeId> {
        self.insert(parent, NodeKind::Phrase(phrase), triggers)
    }

    /// Add a script under `parent`.
    pub fn add_script(&mut self, parent: NodeId, script: Script, triggers: Triggers) -> Result<NodeId> {
        self.insert(parent, NodeKind::Script(script), triggers)
    }

    /// Remove a node and everything beneath it.
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        if id == self.root {
            return Err(Error::RemoveRoot);
        }
        let parent = self.node(id)?.parent;
        if let Some(NodeKind::Folder(f)) = parent.and_then(|p| self.get_mut(p)).map(|n| &mut n.kind)
        {
            f.folders.retain(|c| *c != id);
            f.items.retain(|c| *c != id);
        }
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(cur.0).and_then(Option::take)
                && let NodeKind::Folder(f) = node.kind
            {
                stack.extend(f.folders);
                stack.extend(f.items);
            }
        }
        debug!(?id, "node_removed");
        Ok(())
    }

    /// Children of a folder: sub-folders first, then items. Empty for leaves.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.get(id).and_then(Node::as_folder) {
            Some(f) => f.folders.iter().chain(&f.items).copied().collect(),
            None => Vec::new(),
        }
    }

    /// Pre-order walk from the root.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            let mut kids = self.children(id);
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    /// First node in pre-order whose title or description equals `title`.
    pub fn find_by_title(&self, title: &str) -> Option<NodeId> {
        self.walk()
            .into_iter()
            .find(|id| self.get(*id).is_some_and(|n| n.title() == title))
    }

    /// `id` followed by each ancestor up to the root.
    pub fn self_and_ancestors(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        let mut cur = Some(id);
        iter::from_fn(move || {
            let id = cur?;
            let node = self.get(id)?;
            cur = node.parent;
            Some((id, node))
        })
    }

    /// Increment the usage count of `id` and of every ancestor up to the root.
    pub fn increment_usage(&mut self, id: NodeId) -> Result<()> {
        self.node(id)?;
        let mut cur = Some(id);
        while let Some(c) = cur {
            let node = self.node_mut(c)?;
            node.usage_count += 1;
            cur = node.parent;
        }
        Ok(())
    }

    /// Backspaces needed to erase whatever abbreviation brought the user to
    /// `id`, searching from `id` up through its ancestors.
    ///
    /// The first node with abbreviation mode on, backspacing enabled and a
    /// live match in `buffer` decides: `len(abbreviation) + len(after)`.
    /// Returns 0 when no node on the path matches.
    pub fn backspace_count_for_ancestors(&self, id: NodeId, buffer: &str) -> usize {
        self.self_and_ancestors(id)
            .find_map(|(_, node)| {
                let t = &node.triggers;
                if !t.abbreviation.backspace {
                    return None;
                }
                t.abbreviation_match(buffer)
                    .map(|p| t.abbreviation.len() + p.after_len())
            })
            .unwrap_or(0)
    }

    /// Keystrokes the user spent on the abbreviation that brought them to
    /// `id`, searching from `id` up through its ancestors.
    ///
    /// A match counts `len(abbreviation)`, plus one for the boundary char
    /// when the abbreviation is not immediate. Returns 0 when no node on the
    /// path matches.
    pub fn keystrokes_consumed_for_ancestors(&self, id: NodeId, buffer: &str) -> usize {
        self.self_and_ancestors(id)
            .find_map(|(_, node)| {
                let t = &node.triggers;
                if !t.abbreviation.backspace {
                    return None;
                }
                t.abbreviation_match(buffer).map(|_| abbreviation_keystrokes(t))
            })
            .unwrap_or(0)
    }

    /// Keystrokes spent triggering `id` itself.
    ///
    /// Leaves count their own abbreviation match first, then a hotkey press
    /// (modifiers plus key) when the buffer is empty, then fall back to their
    /// ancestors. Folders go straight to the ancestor search.
    pub fn keystrokes_consumed(&self, id: NodeId, buffer: &str) -> usize {
        let Some(node) = self.get(id) else {
            return 0;
        };
        if matches!(node.kind, NodeKind::Folder(_)) {
            return self.keystrokes_consumed_for_ancestors(id, buffer);
        }
        let t = &node.triggers;
        if t.abbreviation_match(buffer).is_some() {
            return abbreviation_keystrokes(t);
        }
        if t.has_mode(TriggerMode::Hotkey) && buffer.is_empty() {
            return t.hotkey.modifiers.len() + 1;
        }
        node.parent
            .map_or(0, |p| self.keystrokes_consumed_for_ancestors(p, buffer))
    }

    /// Whether `id` fires on `buffer` in a window titled `title`.
    pub fn check_input(&self, id: NodeId, buffer: &str, title: &str) -> bool {
        self.get(id).is_some_and(|n| {
            n.triggers.filter.passes(title) && n.triggers.abbreviation_match(buffer).is_some()
        })
    }

    /// The typed abbreviation plus whatever followed it, or empty.
    pub fn trigger_chars(&self, id: NodeId, buffer: &str) -> String {
        self.get(id)
            .and_then(|n| matching::partition(&n.triggers.abbreviation, buffer))
            .map(|p| p.matched + &p.after)
            .unwrap_or_default()
    }

    /// Sum of the usage counts of the leaves beneath `id`.
    pub fn leaf_usage_total(&self, id: NodeId) -> u64 {
        let Some(node) = self.get(id) else {
            return 0;
        };
        match &node.kind {
            NodeKind::Folder(_) => self
                .children(id)
                .into_iter()
                .map(|c| self.leaf_usage_total(c))
                .sum(),
            _ => node.usage_count,
        }
    }

    /// Used by the loader to restore persisted state onto a node.
    pub(crate) fn restore(&mut self, id: NodeId, usage_count: u64, show_in_menu: bool) -> Result<()> {
        let node = self.node_mut(id)?;
        node.usage_count = usage_count;
        node.show_in_menu = show_in_menu;
        Ok(())
    }
}

/// Abbreviation length plus the confirming boundary char when not immediate.
fn abbreviation_keystrokes(t: &Triggers) -> usize {
    if t.abbreviation.immediate {
        t.abbreviation.len()
    } else {
        t.abbreviation.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use keyspec::Modifier;

    use super::*;

    fn sample() -> (TriggerTree, NodeId, NodeId, NodeId) {
        let mut tree = TriggerTree::new("root");
        let root = tree.root();
        let work = tree
            .add_folder(root, "work", Triggers::abbreviation("wk"))
            .unwrap();
        let sig = tree
            .add_phrase(work, Phrase::new("sig", "Regards"), Triggers::abbreviation("sig"))
            .unwrap();
        (tree, root, work, sig)
    }

    #[test]
    fn usage_propagates_to_root() {
        let (mut tree, root, work, sig) = sample();
        tree.increment_usage(sig).unwrap();
        tree.increment_usage(sig).unwrap();
        assert_eq!(tree.node(sig).unwrap().usage_count, 2);
        assert_eq!(tree.node(work).unwrap().usage_count, 2);
        assert_eq!(tree.node(root).unwrap().usage_count, 2);
    }

    #[test]
    fn children_and_walk_order() {
        let (mut tree, root, work, sig) = sample();
        let misc = tree.add_phrase(root, Phrase::new("misc", "m"), Triggers::default()).unwrap();
        assert_eq!(tree.children(root), vec![work, misc]);
        assert_eq!(tree.walk(), vec![root, work, sig, misc]);
        assert_eq!(tree.find_by_title("sig"), Some(sig));
        assert!(tree.children(sig).is_empty());
    }

    #[test]
    fn add_under_leaf_fails() {
        let (mut tree, _, _, sig) = sample();
        assert!(matches!(
            tree.add_folder(sig, "x", Triggers::default()),
            Err(Error::NotAFolder(_))
        ));
    }

    #[test]
    fn remove_is_recursive() {
        let (mut tree, root, work, sig) = sample();
        assert_eq!(tree.len(), 3);
        tree.remove(work).unwrap();
        assert!(tree.get(sig).is_none());
        assert!(tree.children(root).is_empty());
        assert_eq!(tree.len(), 1);
        assert!(matches!(tree.remove(root), Err(Error::RemoveRoot)));
        assert!(matches!(tree.remove(work), Err(Error::UnknownNode(_))));
    }

    #[test]
    fn backspaces_found_on_nearest_matching_ancestor() {
        let (tree, _, work, sig) = sample();
        // Folder abbreviation typed; phrase chosen from the folder's menu.
        assert_eq!(tree.backspace_count_for_ancestors(work, "go wk "), 3);
        assert_eq!(tree.backspace_count_for_ancestors(sig, "go wk "), 3);
        assert_eq!(tree.backspace_count_for_ancestors(sig, "nothing"), 0);
    }

    #[test]
    fn backspace_disabled_skips_to_parent() {
        let (mut tree, root, work, _) = sample();
        tree.node_mut(root).unwrap().triggers = Triggers::abbreviation("r");
        tree.node_mut(work).unwrap().triggers.abbreviation.backspace = false;
        assert_eq!(tree.backspace_count_for_ancestors(work, "x wk "), 0);
        assert_eq!(tree.backspace_count_for_ancestors(work, "x r "), 2);
    }

    #[test]
    fn keystroke_accounting() {
        let (mut tree, root, work, sig) = sample();
        assert_eq!(tree.keystrokes_consumed(sig, "a sig "), 4);
        assert_eq!(tree.keystrokes_consumed(sig, "a wk "), 3);
        assert_eq!(tree.keystrokes_consumed(work, "a wk "), 3);
        let hk = tree
            .add_phrase(
                root,
                Phrase::new("hk", "x"),
                Triggers::hotkey([Modifier::Control, Modifier::Alt], "k"),
            )
            .unwrap();
        assert_eq!(tree.keystrokes_consumed(hk, ""), 3);
        assert_eq!(tree.keystrokes_consumed(hk, "typed"), 0);
        tree.node_mut(sig).unwrap().triggers.abbreviation.immediate = true;
        assert_eq!(tree.keystrokes_consumed(sig, "a sig"), 3);
    }

    #[test]
    fn check_input_and_trigger_chars() {
        let (mut tree, _, _, sig) = sample();
        assert!(tree.check_input(sig, "my sig.", "Editor"));
        assert_eq!(tree.trigger_chars(sig, "my sig."), "sig.");
        tree.node_mut(sig).unwrap().triggers.filter =
            crate::WindowFilterConfig::new("Mail").unwrap();
        assert!(!tree.check_input(sig, "my sig.", "Editor"));
        assert!(tree.check_input(sig, "my sig.", "Mail - Inbox"));
    }

    #[test]
    fn send_mode_paste_chords() {
        assert_eq!(SendMode::Keyboard.paste_chord(), None);
        assert_eq!(SendMode::ClipboardCtrlV.paste_chord(), Some("<ctrl>+v"));
        assert_eq!(SendMode::Selection.paste_chord(), None);
    }
}
