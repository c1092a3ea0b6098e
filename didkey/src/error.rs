// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use thiserror::Error;

/// Errors generated from this library.
#[derive(Debug, Error)]
pub enum DidKeyError {
    /// The string is missing the exact `did:key:` prefix.
    #[error("not a did:key: {0}")]
    MissingPrefix(String),
    /// The multibase body did not decode.
    #[error("multibase decode error: {0}")]
    Multibase(String),
    /// The multibase body did not use base58btc.
    #[error("did:key must be base58btc encoded")]
    WrongBase,
    /// The multicodec prefix does not identify secp256k1.
    #[error("not a secp256k1 did:key")]
    WrongCodec,
    /// The key bytes are not a valid compressed secp256k1 public key length.
    #[error("expected a 33-byte compressed public key, got {0}")]
    WrongKeyLength(usize),
}
