// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use thiserror::Error;

/// Errors generated while parsing a CAR or building a post-inclusion proof.
#[derive(Debug, Error)]
pub enum CarError {
    /// The byte stream ended before a declared length could be read.
    #[error("truncated CAR")]
    Truncated,
    /// The CAR header or a block framing entry was malformed.
    #[error("invalid CAR: {0}")]
    InvalidCar(String),
    /// A required block shape (commit, text, tip) was not found, or more
    /// than one candidate was found for it.
    #[error("unexpected CAR block shape: {0}")]
    UnexpectedShape(String),
    /// A required field was missing from a decoded block map.
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    /// The post text did not begin with `@`, or the handle length was
    /// outside `[1, 100]`.
    #[error("bot name invalid")]
    BotNameInvalid,
    /// A tree node did not contain the expected child CID while walking
    /// the proof path inward.
    #[error("proof path broken")]
    ProofPathBroken,
    /// The final reduced target did not equal the commit's `data` field.
    #[error("commit root mismatch")]
    CommitRootMismatch,
    /// DAG-CBOR encode/decode failure.
    #[error(transparent)]
    Cbor(#[from] atgate_cbor::CborError),
    /// secp256k1 recovery failure.
    #[error(transparent)]
    Secp(#[from] atgate_secp::SecpError),
}
