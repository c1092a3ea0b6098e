// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! The one CID shape this system ever produces or compares: CIDv1, codec
//! `dag-cbor` (0x71), multihash sha2-256. On the wire this is always the
//! 36-byte sequence `0x01 0x71 0x12 0x20 || sha256(block)`.

pub use cid::Cid;
use cid::{Codec, IntoExt};

/// The fixed 4-byte CID prefix used throughout: version 1, dag-cbor codec,
/// sha2-256 multihash, 32-byte digest length.
pub const CID_PREFIX: [u8; 4] = [0x01, 0x71, 0x12, 0x20];

/// Hash `bytes` (expected to already be canonical DAG-CBOR) and wrap the
/// digest as a CIDv1/dag-cbor/sha2-256.
pub fn cid_of(bytes: &[u8]) -> Cid {
    let hash = multihash::Sha2_256::digest(bytes).into_ext();
    Cid::new_v1(Codec::DagCBOR, hash)
}

/// The raw 36-byte wire form of a CID constructed by [`cid_of`].
pub fn cid_bytes(cid: &Cid) -> Vec<u8> {
    cid.to_bytes()
}

/// Build the raw 36-byte CID bytes directly from a block's bytes, without
/// going through a [`Cid`] value.
pub fn cid_of_bytes(bytes: &[u8]) -> [u8; 36] {
    let mut out = [0u8; 36];
    out[..4].copy_from_slice(&CID_PREFIX);
    out[4..].copy_from_slice(&sha256(bytes));
    out
}

/// Compare a 36-byte (or longer) CID wire form against a raw 32-byte digest,
/// ignoring the leading prefix.
pub fn cid_equals_hash(cid_bytes: &[u8], digest: &[u8; 32]) -> bool {
    cid_bytes.len() == 36 && cid_bytes[..4] == CID_PREFIX && &cid_bytes[4..] == digest.as_slice()
}

/// Extract the trailing 32-byte digest from a 36-byte CID wire form.
pub fn digest_of(cid_bytes: &[u8]) -> Option<[u8; 32]> {
    if cid_bytes.len() != 36 || cid_bytes[..4] != CID_PREFIX {
        return None;
    }
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&cid_bytes[4..]);
    Some(digest)
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    atgate_hashing::sha256(bytes)
}
