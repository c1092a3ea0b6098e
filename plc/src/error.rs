// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use thiserror::Error;

/// Errors generated while building a DID-update proof from a PLC audit log.
#[derive(Debug, Error)]
pub enum PlcError {
    /// A required field was missing or of the wrong shape on an operation.
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    /// The genesis operation carried a non-null `prev`.
    #[error("genesis operation had a prev set")]
    GenesisHasPrev,
    /// Reconstructing the signed bytes from the signable bytes and the
    /// stripped `sig` field did not reproduce the original operation bytes.
    #[error("signed/signable cbor assumption violated")]
    SignedFormAssumptionViolated,
    /// `prev` did not decode to the hash of the previous signed operation.
    #[error("prev does not match hash of previous entry")]
    PrevMismatch,
    /// Neither recovery candidate matched a key in the authorizing set.
    #[error("no rotation key in the authorizing set matches the signature")]
    NoAuthorizingKey,
    /// A multibase string (a `prev` CID) failed to decode.
    #[error("invalid multibase string: {0}")]
    Multibase(String),
    /// The base64url-encoded `sig` field failed to decode.
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
    /// DAG-CBOR encode/decode failure.
    #[error(transparent)]
    Cbor(#[from] atgate_cbor::CborError),
    /// secp256k1 recovery failure.
    #[error(transparent)]
    Secp(#[from] atgate_secp::SecpError),
    /// A `did:key:` string failed to decode.
    #[error(transparent)]
    DidKey(#[from] atgate_didkey::DidKeyError),
}
