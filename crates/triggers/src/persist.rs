//! JSON persistence for trigger trees.
//!
//! The document is the root folder; folders nest their children under
//! `folders` (sub-folders) and `items` (phrases and scripts). Every node
//! carries a `type` tag. Nodes are decoded one at a time from
//! [`serde_json::Value`] so that an error names the node it came from.

use std::{collections::BTreeSet, fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::{
    AbbreviationConfig, Error, Folder, HotkeyConfig, NodeId, NodeKind, Phrase, Result, Script,
    SendMode, TitlePattern, TriggerMode, TriggerTree, Triggers, WindowFilterConfig,
};

/// On-disk shape of any node. Everything is optional here; required fields
/// are checked while converting.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    /// `folder`, `phrase` or `script`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    /// Folder title.
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    /// Phrase or script description.
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    /// Phrase text.
    #[serde(skip_serializing_if = "Option::is_none")]
    phrase: Option<String>,
    /// Script source.
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    /// Enabled trigger modes.
    #[serde(skip_serializing_if = "Option::is_none")]
    modes: Option<BTreeSet<TriggerMode>>,
    /// Activation counter.
    #[serde(skip_serializing_if = "Option::is_none")]
    usage_count: Option<u64>,
    /// Tray menu visibility.
    #[serde(alias = "showInMenu", skip_serializing_if = "Option::is_none")]
    show_in_tray_menu: Option<bool>,
    /// Abbreviation settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    abbreviation: Option<AbbreviationConfig>,
    /// Hotkey settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    hotkey: Option<HotkeyConfig>,
    /// Window title pattern.
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
    /// Child folders.
    #[serde(skip_serializing_if = "Option::is_none")]
    folders: Option<Vec<Value>>,
    /// Child phrases and scripts.
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<Vec<Value>>,
    /// Phrase delivery mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    send_mode: Option<SendMode>,
    /// Script key/value store.
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<Map<String, Value>>,
    /// Ask before running.
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<bool>,
    /// Skip retyping the boundary char.
    #[serde(skip_serializing_if = "Option::is_none")]
    omit_trigger: Option<bool>,
    /// Mirror abbreviation case.
    #[serde(skip_serializing_if = "Option::is_none")]
    match_case: Option<bool>,
}

/// Human label for a node value, e.g. `phrase 'signature'`.
fn label(value: &Value) -> String {
    let kind = value.get("type").and_then(Value::as_str).unwrap_or("node");
    let name = value
        .get("title")
        .or_else(|| value.get("description"))
        .and_then(Value::as_str)
        .unwrap_or("?");
    format!("{kind} '{name}'")
}

/// Fail with [`Error::MissingField`] when a required field is absent.
fn required<T>(field: Option<T>, node: &str, name: &'static str) -> Result<T> {
    field.ok_or_else(|| Error::MissingField {
        node: node.to_string(),
        field: name,
    })
}

/// A decoded node, ready to be attached to a tree.
struct Decoded {
    /// Payload.
    kind: NodeKind,
    /// Trigger configuration.
    triggers: Triggers,
    /// Persisted counter.
    usage_count: u64,
    /// Persisted menu flag.
    show_in_menu: bool,
    /// Undecoded child folders.
    folders: Vec<Value>,
    /// Undecoded child items.
    items: Vec<Value>,
}

/// Decode one node without touching its children.
fn decode(value: Value) -> Result<Decoded> {
    let node = label(&value);
    let raw: RawNode = serde_json::from_value(value).map_err(|e| Error::InvalidNode {
        node: node.clone(),
        message: e.to_string(),
    })?;
    let kind_name = required(raw.kind, &node, "type")?;
    let filter = match raw.filter {
        Some(p) => WindowFilterConfig {
            title: Some(TitlePattern::new(&p).map_err(|e| Error::InvalidNode {
                node: node.clone(),
                message: e.to_string(),
            })?),
        },
        None => WindowFilterConfig::default(),
    };
    let triggers = Triggers {
        modes: required(raw.modes, &node, "modes")?,
        abbreviation: required(raw.abbreviation, &node, "abbreviation")?,
        hotkey: required(raw.hotkey, &node, "hotkey")?,
        filter,
    };
    let kind = match kind_name.as_str() {
        "folder" => NodeKind::Folder(Folder::new(required(raw.title, &node, "title")?)),
        "phrase" => NodeKind::Phrase(Phrase {
            description: required(raw.description, &node, "description")?,
            phrase: required(raw.phrase, &node, "phrase")?,
            prompt: raw.prompt.unwrap_or(false),
            omit_trigger: raw.omit_trigger.unwrap_or(false),
            match_case: raw.match_case.unwrap_or(false),
            send_mode: raw.send_mode.unwrap_or_default(),
        }),
        "script" => NodeKind::Script(Script {
            description: required(raw.description, &node, "description")?,
            code: required(raw.code, &node, "code")?,
            store: raw.store.unwrap_or_default(),
            prompt: raw.prompt.unwrap_or(false),
            omit_trigger: raw.omit_trigger.unwrap_or(false),
        }),
        other => {
            return Err(Error::InvalidNode {
                node,
                message: format!("unknown node type '{other}'"),
            });
        }
    };
    Ok(Decoded {
        kind,
        triggers,
        usage_count: raw.usage_count.unwrap_or(0),
        show_in_menu: raw.show_in_tray_menu.unwrap_or(false),
        folders: raw.folders.unwrap_or_default(),
        items: raw.items.unwrap_or_default(),
    })
}

/// Attach the children of a decoded folder under `parent`.
fn attach_children(tree: &mut TriggerTree, parent: NodeId, folders: Vec<Value>, items: Vec<Value>) -> Result<()> {
    for value in folders {
        let node = label(&value);
        let d = decode(value)?;
        let NodeKind::Folder(f) = d.kind else {
            return Err(Error::InvalidNode {
                node,
                message: "only folders may appear under 'folders'".to_string(),
            });
        };
        let id = tree.add_folder(parent, f.title, d.triggers)?;
        tree.restore(id, d.usage_count, d.show_in_menu)?;
        attach_children(tree, id, d.folders, d.items)?;
    }
    for value in items {
        let node = label(&value);
        let d = decode(value)?;
        let id = match d.kind {
            NodeKind::Phrase(p) => tree.add_phrase(parent, p, d.triggers)?,
            NodeKind::Script(s) => tree.add_script(parent, s, d.triggers)?,
            NodeKind::Folder(_) => {
                return Err(Error::InvalidNode {
                    node,
                    message: "folders may not appear under 'items'".to_string(),
                });
            }
        };
        tree.restore(id, d.usage_count, d.show_in_menu)?;
    }
    Ok(())
}

/// Parse a tree from a JSON document.
pub fn load_from_str(s: &str) -> Result<TriggerTree> {
    let value: Value = serde_json::from_str(s)?;
    let node = label(&value);
    let d = decode(value)?;
    let NodeKind::Folder(root) = d.kind else {
        return Err(Error::InvalidNode {
            node,
            message: "the root node must be a folder".to_string(),
        });
    };
    let mut tree = TriggerTree::with_root(root, d.triggers);
    let root_id = tree.root();
    tree.restore(root_id, d.usage_count, d.show_in_menu)?;
    attach_children(&mut tree, root_id, d.folders, d.items)?;
    debug!(nodes = tree.len(), "tree_loaded");
    Ok(tree)
}

/// Read and parse a tree file.
pub fn load_from_path(path: &Path) -> Result<TriggerTree> {
    let s = fs::read_to_string(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let tree = load_from_str(&s)?;
    info!(path = %path.display(), nodes = tree.len(), "tree_loaded_from_file");
    Ok(tree)
}

/// Encode node `id` and everything beneath it.
fn encode(tree: &TriggerTree, id: NodeId) -> Result<Value> {
    let n = tree.node(id)?;
    let t = &n.triggers;
    let mut raw = RawNode {
        kind: Some(n.kind.name().to_string()),
        modes: Some(t.modes.clone()),
        usage_count: Some(n.usage_count),
        show_in_tray_menu: Some(n.show_in_menu),
        abbreviation: Some(t.abbreviation.clone()),
        hotkey: Some(t.hotkey.clone()),
        filter: t.filter.title.as_ref().map(|p| p.pattern().to_string()),
        ..RawNode::default()
    };
    match &n.kind {
        NodeKind::Folder(f) => {
            raw.title = Some(f.title.clone());
            raw.folders = Some(f.folders().iter().map(|c| encode(tree, *c)).collect::<Result<_>>()?);
            raw.items = Some(f.items().iter().map(|c| encode(tree, *c)).collect::<Result<_>>()?);
        }
        NodeKind::Phrase(p) => {
            raw.description = Some(p.description.clone());
            raw.phrase = Some(p.phrase.clone());
            raw.prompt = Some(p.prompt);
            raw.omit_trigger = Some(p.omit_trigger);
            raw.match_case = Some(p.match_case);
            raw.send_mode = Some(p.send_mode);
        }
        NodeKind::Script(s) => {
            raw.description = Some(s.description.clone());
            raw.code = Some(s.code.clone());
            raw.store = Some(s.store.clone());
            raw.prompt = Some(s.prompt);
            raw.omit_trigger = Some(s.omit_trigger);
        }
    }
    Ok(serde_json::to_value(raw)?)
}

/// Serialize the whole tree as pretty-printed JSON.
pub fn to_json_string(tree: &TriggerTree) -> Result<String> {
    Ok(serde_json::to_string_pretty(&encode(tree, tree.root())?)?)
}

/// Write the tree to `path`, replacing any existing file.
pub fn save_to_path(tree: &TriggerTree, path: &Path) -> Result<()> {
    let s = to_json_string(tree)?;
    fs::write(path, s).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    info!(path = %path.display(), nodes = tree.len(), "tree_saved");
    Ok(())
}
