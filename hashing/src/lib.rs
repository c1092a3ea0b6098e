// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! The hash function used throughout the codec and proof builders.

#![deny(missing_docs)]

use digest::Digest;

/// Generates sha256 hash.
///
/// # Example
/// ```
/// use atgate_hashing::sha256;
///
/// let data: Vec<u8> = vec![];
/// let hash = sha256(&data);
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256<T: AsRef<[u8]>>(data: T) -> [u8; 32] {
    let hash = sha2::Sha256::digest(data.as_ref());
    let mut res = [0u8; 32];
    res.copy_from_slice(hash.as_slice());
    res
}
