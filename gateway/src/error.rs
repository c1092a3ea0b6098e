// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use thiserror::Error;

/// The top-level error returned by every pipeline stage.
///
/// The queue sweep loop matches on this only to decide whether to retry
/// or abandon the in-flight item; it never inspects it to recover
/// partial state.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A collaborator trait implementation has not been wired up yet.
    #[error("{0} is not implemented in this build")]
    NotImplemented(&'static str),
    /// Post-proof building failed.
    #[error(transparent)]
    Car(#[from] atgate_car::CarError),
    /// DID-update proof building failed.
    #[error(transparent)]
    Plc(#[from] atgate_plc::PlcError),
    /// The queue itself failed (filesystem I/O, missing item).
    #[error(transparent)]
    Queue(#[from] atgate_queue::QueueError),
    /// The bot configuration or a layered config source failed to parse.
    #[error("configuration error: {0}")]
    Config(String),
    /// Filesystem I/O outside the queue (reading fixtures, bot config).
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A fixture or queue item body was not valid JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
