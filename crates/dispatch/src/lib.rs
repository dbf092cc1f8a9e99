//! dispatch: ordered input-event pipeline for the expansion core.
//!
//! - [`ModifierTracker`]: toggle vs momentary modifier state, shared between
//!   the capture thread and the dispatcher thread.
//! - [`InputBackend`] / [`Listener`]: the platform seam and the consumer seam.
//! - [`EventDispatcher`]: FIFO queue, classifying consumer thread, and the
//!   outbound send operations with modifier isolation.
//! - [`KeyGrabber`] / [`KeyRecorder`]: modal capture listeners.
//! - [`mock`]: scripted in-memory backend for tests and offline replay.

mod backend;
mod capture;
mod dispatcher;
mod error;
pub mod mock;
mod modifier_state;
mod registry;

pub use backend::{InputBackend, Listener};
pub use capture::{KeyGrabber, KeyRecorder, Recorded};
pub use dispatcher::{CaptureSink, EventDispatcher, QUEUE_DEPTH_WARN, QueuedEvent, remove_count};
pub use error::{Error, Result};
pub use modifier_state::{ModifierState, ModifierTracker};
pub use registry::{ListenerId, ListenerRegistry};
