//! Error types for the event channel.

use std::{io, path::PathBuf};

/// The channel could not start listening.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// The directory holding the endpoint could not be created.
    #[error("creating endpoint directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A stale endpoint file was present and could not be removed.
    #[error("removing stale endpoint {path}: {source}")]
    RemoveStale {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The listener could not be bound.
    #[error("binding endpoint {path}: {source}")]
    Bind {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `start` was called on a channel that is already listening.
    #[error("event channel already started")]
    AlreadyStarted,

    /// `start` was called on a channel that has been closed.
    #[error("event channel is closed")]
    Closed,
}
