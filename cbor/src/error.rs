// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

/// Alias for a `Result` with the default error type `CborError`.
pub type Result<T, E = CborError> = std::result::Result<T, E>;

/// Errors produced by the DAG-CBOR / CID codec.
///
/// This is the closed taxonomy the on-chain proof builders rely on: every
/// encode/decode failure here is fatal to the proof being built and maps
/// 1:1 onto a retry of the in-flight queue item, never a partial payload.
#[derive(Debug, thiserror::Error)]
pub enum CborError {
    /// A value could not be represented as canonical DAG-CBOR (an integer
    /// out of range, a non-UTF8 map key, or similar).
    #[error("failed to encode value as DAG-CBOR: {0}")]
    Encoding(String),
    /// The input bytes are not a valid (or not a canonical) DAG-CBOR block.
    #[error("failed to decode DAG-CBOR: {0}")]
    Decoding(#[from] minicbor::decode::Error),
    /// I/O error while reading a block from disk or the network.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// JSON codec error (DAG-JSON representation).
    #[error("{0}")]
    JsonCodec(#[from] serde_json::Error),
}
