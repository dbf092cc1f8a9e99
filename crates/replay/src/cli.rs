//! Command-line interface definitions for replay.

use std::path::PathBuf;

use clap::Parser;
use logging::LogArgs;

use crate::session::SessionOptions;

/// Command-line interface for the `replay` binary.
#[derive(Parser, Debug)]
#[command(
    name = "replay",
    about = "Feed typed input through a trigger tree and print the keystrokes it would send",
    version
)]
pub struct Cli {
    /// Logging controls.
    #[command(flatten)]
    pub log: LogArgs,

    /// Trigger tree document (JSON).
    #[arg(long, short, value_name = "PATH")]
    pub tree: PathBuf,

    /// Focused window title reported with every keypress.
    #[arg(long, short, default_value = "")]
    pub window: String,

    /// When a menu is offered, pick the entry at this index.
    #[arg(long, value_name = "INDEX")]
    pub pick: Option<usize>,

    /// Keep the buffer across mouse clicks.
    #[arg(long)]
    pub keep_on_click: bool,

    /// Write the tree, with updated usage counts, to this path afterwards.
    #[arg(long, value_name = "PATH")]
    pub save: Option<PathBuf>,

    /// Input to type. `<key>` tokens press named keys, `<mod>+` holds a
    /// modifier for the next key, and `<click>` clicks the mouse.
    #[arg(value_name = "INPUT")]
    pub input: String,
}

impl Cli {
    /// Session settings from the parsed flags.
    pub fn session(&self) -> SessionOptions {
        SessionOptions {
            input: self.input.clone(),
            window: self.window.clone(),
            pick: self.pick,
            reset_on_mouse_click: !self.keep_on_click,
        }
    }
}
