//! Error types and result alias for the dispatch crate.
use std::{io, result::Result as StdResult};

use thiserror::Error;

/// Convenient result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;

/// Error variants produced by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// The input backend could not start capturing.
    #[error("Input backend failed to start: {0}")]
    BackendStart(String),
    /// The dispatcher was used after `shutdown`.
    #[error("Dispatcher has been shut down")]
    AlreadyShutdown,
    /// The consumer thread could not be spawned.
    #[error("Failed to spawn dispatcher thread: {0}")]
    ThreadSpawn(#[from] io::Error),
}
