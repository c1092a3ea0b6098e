// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use thiserror::Error;

use crate::Status;

/// Errors generated by the filesystem-backed queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// No item for the given key was found in the expected status
    /// directory.
    #[error("no item found in {0:?}")]
    NotFound(Status),
    /// Filesystem I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Queue item body failed to (de)serialize as JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
