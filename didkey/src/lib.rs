// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! The `did:key` codec, restricted to the one variant this system ever
//! produces or consumes: secp256k1, multicodec prefix `0xe7 0x01`,
//! base58btc multibase.

#![deny(missing_docs)]

mod error;

pub use self::error::DidKeyError;

use multibase::Base;

const PREFIX: &str = "did:key:";

/// The two-byte multicodec prefix identifying a compressed secp256k1 key.
pub const SECP256K1_MULTICODEC: [u8; 2] = [0xe7, 0x01];

/// Decode a `did:key:z...` identifier into its 33-byte compressed
/// secp256k1 public key.
pub fn decode_did_key(s: &str) -> Result<[u8; 33], DidKeyError> {
    let body = s
        .strip_prefix(PREFIX)
        .ok_or_else(|| DidKeyError::MissingPrefix(s.to_owned()))?;
    let (base, bytes) =
        multibase::decode(body).map_err(|e| DidKeyError::Multibase(e.to_string()))?;
    if base != Base::Base58Btc {
        return Err(DidKeyError::WrongBase);
    }
    if bytes.len() < 2 || bytes[..2] != SECP256K1_MULTICODEC {
        return Err(DidKeyError::WrongCodec);
    }
    let key = &bytes[2..];
    if key.len() != 33 {
        return Err(DidKeyError::WrongKeyLength(key.len()));
    }
    let mut out = [0u8; 33];
    out.copy_from_slice(key);
    Ok(out)
}

/// Encode a 33-byte compressed secp256k1 public key as a `did:key:z...`
/// identifier.
pub fn encode_did_key(compressed_pubkey: &[u8; 33]) -> String {
    let mut bytes = Vec::with_capacity(2 + 33);
    bytes.extend_from_slice(&SECP256K1_MULTICODEC);
    bytes.extend_from_slice(compressed_pubkey);
    let body = multibase::encode(Base::Base58Btc, &bytes);
    format!("{}{}", PREFIX, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBKEY: [u8; 33] = [
        0x02, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d,
        0x1e, 0x1f, 0x20,
    ];

    #[test]
    fn round_trips() {
        let did = encode_did_key(&PUBKEY);
        assert!(did.starts_with("did:key:z"));
        let decoded = decode_did_key(&did).unwrap();
        assert_eq!(decoded, PUBKEY);
    }

    #[test]
    fn rejects_missing_prefix() {
        let err = decode_did_key("key:zFoo").unwrap_err();
        assert!(matches!(err, DidKeyError::MissingPrefix(_)));
    }

    #[test]
    fn rejects_wrong_codec() {
        let mut bytes = vec![0x00, 0x00];
        bytes.extend_from_slice(&PUBKEY);
        let body = multibase::encode(Base::Base58Btc, &bytes);
        let did = format!("did:key:{}", body);
        let err = decode_did_key(&did).unwrap_err();
        assert!(matches!(err, DidKeyError::WrongCodec));
    }
}
