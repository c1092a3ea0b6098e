// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! Deterministic DAG-CBOR encode/decode and CID construction.
//!
//! The on-chain verifier this system feeds re-hashes the exact bytes it is
//! given, so every block handled here must round-trip byte-for-byte:
//! `decode(encode(x)) == x`, and for inputs that were already canonical,
//! `encode(decode(b)) == b`. Map keys are ordered by length, then
//! lexicographically (the canonical DAG-CBOR ordering), definite-length
//! arrays/maps only, shortest-form integers, and CID links as tag-42
//! byte strings.

#![deny(missing_docs)]

pub mod block;
pub mod cid;
mod error;
#[macro_use]
mod value;

pub use self::block::IpldBlock;
pub use self::cid::{cid_equals_hash, cid_of, digest_of, Cid, CID_PREFIX};
pub use self::error::{CborError, Result};
pub use self::value::{Bytes, Integer, IpldValue, Map, MapKey};

/// Encode `value` as canonical DAG-CBOR.
pub fn encode<T: minicbor::Encode>(value: &T) -> Result<Vec<u8>> {
    minicbor::to_vec(value).map_err(|e| CborError::Encoding(e.to_string()))
}

/// Decode canonical DAG-CBOR bytes back into `T`.
pub fn decode<'b, T: minicbor::Decode<'b>>(bytes: &'b [u8]) -> Result<T> {
    minicbor::decode(bytes).map_err(CborError::Decoding)
}

/// Convert JSON object into an IPLD value.
pub fn json_to_ipld<T>(value: &T) -> Result<IpldValue>
where
    T: ?Sized + serde::ser::Serialize,
{
    let json = serde_json::to_string(value)?;
    let value = serde_json::from_str::<IpldValue>(&json)?;
    Ok(value)
}

/// Interpret an `IpldValue` as an instance of type `T`.
pub fn json_from_ipld<T>(value: &IpldValue) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let json = serde_json::to_string(value)?;
    let value = serde_json::from_str::<T>(&json)?;
    Ok(value)
}
