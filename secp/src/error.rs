// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use thiserror::Error;

/// Errors generated from this library.
#[derive(Debug, Error)]
pub enum SecpError {
    /// Neither recovery candidate's compressed public key matched one of
    /// the expected signers.
    #[error("recovered key does not match any expected signer")]
    UnmatchedSigner,
    /// The digest, signature, or a candidate key was malformed.
    #[error("invalid secp256k1 input: {0}")]
    InvalidInput(#[from] secp256k1::Error),
}
