#![warn(missing_docs)]

//! Entry point for the `replay` binary.

mod cli;
mod error;
mod render;
mod session;

use std::process;

use clap::Parser;
use tracing::error;

use crate::{cli::Cli, error::Result};

fn main() {
    if let Err(err) = run() {
        error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Parse CLI arguments, install logging, and replay the input.
fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_stderr(&cli.log.spec());

    let tree = triggers::persist::load_from_path(&cli.tree)?;
    let outcome = session::replay(tree, &cli.session())?;
    for line in render::ops(&outcome.ops) {
        println!("{line}");
    }
    for line in render::events(&outcome.events, &outcome.tree) {
        println!("{line}");
    }
    println!("keystrokes saved: {}", outcome.keystrokes_saved);

    if let Some(path) = &cli.save {
        triggers::persist::save_to_path(&outcome.tree, path)?;
    }
    Ok(())
}
