// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! secp256k1 ECDSA signing and Ethereum-style signature recovery.
//!
//! [`recover`] is the one operation the proof builders actually need: given
//! a digest and an `r‖s` signature, find which of a small set of candidate
//! public keys produced it, trying both recovery IDs.

#![deny(missing_docs)]

mod error;

pub use self::error::SecpError;

/// A recovered public key, its chain-style recovery tag, and the index of
/// the candidate it matched.
pub struct Recovered {
    /// The 65-byte uncompressed public key.
    pub uncompressed_pubkey: [u8; 65],
    /// `27` if recovery ID 0 produced the match, `28` if recovery ID 1 did.
    pub v: u8,
    /// Index into the `candidates` slice that was passed to [`recover`].
    pub candidate_index: usize,
}

/// Recover the signer of `(r, s)` over `digest`, matching against
/// `candidates` (compressed public keys). Tries recovery ID 0 then 1;
/// fails with [`SecpError::UnmatchedSigner`] if neither recovers to any
/// candidate.
pub fn recover(
    digest: &[u8; 32],
    r: &[u8; 32],
    s: &[u8; 32],
    candidates: &[[u8; 33]],
) -> Result<Recovered, SecpError> {
    let message = secp256k1::Message::parse(digest);
    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(r);
    sig_bytes[32..].copy_from_slice(s);
    let signature = secp256k1::Signature::parse(&sig_bytes);

    for (recovery_id, v) in [(0u8, 27u8), (1u8, 28u8)] {
        let recovery_id = secp256k1::RecoveryId::parse(recovery_id)?;
        let pubkey = match secp256k1::recover(&message, &signature, &recovery_id) {
            Ok(pubkey) => pubkey,
            Err(_) => continue,
        };
        let compressed = pubkey.serialize_compressed();
        if let Some(candidate_index) = candidates.iter().position(|c| *c == compressed) {
            return Ok(Recovered {
                uncompressed_pubkey: pubkey.serialize(),
                v,
                candidate_index,
            });
        }
    }
    Err(SecpError::UnmatchedSigner)
}

/// Sign `digest` (already hashed) with `seckey`, returning `r‖s‖v`
/// (65 bytes, `v ∈ {27,28}`).
pub fn sign_recoverable(seckey: &[u8; 32], digest: &[u8; 32]) -> Result<[u8; 65], SecpError> {
    let seckey = secp256k1::SecretKey::parse(seckey)?;
    let message = secp256k1::Message::parse(digest);
    let (signature, recovery_id) = secp256k1::sign(&message, &seckey);
    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&signature.serialize());
    out[64] = 27 + recovery_id.serialize();
    Ok(out)
}

/// Derive the compressed public key for `seckey`.
pub fn compressed_pubkey(seckey: &[u8; 32]) -> Result<[u8; 33], SecpError> {
    let seckey = secp256k1::SecretKey::parse(seckey)?;
    let pubkey = secp256k1::PublicKey::from_secret_key(&seckey);
    Ok(pubkey.serialize_compressed())
}

/// Expand a 33-byte compressed public key to its 65-byte uncompressed form.
pub fn decompress_pubkey(compressed: &[u8; 33]) -> Result<[u8; 65], SecpError> {
    let pubkey = secp256k1::PublicKey::parse_slice(compressed, None)?;
    Ok(pubkey.serialize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_matching_signer() {
        let seckey_bytes = [7u8; 32];
        let digest = [9u8; 32];
        let sig = sign_recoverable(&seckey_bytes, &digest).unwrap();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig[..32]);
        s.copy_from_slice(&sig[32..64]);

        let compressed = compressed_pubkey(&seckey_bytes).unwrap();
        let candidates = [[0u8; 33], compressed];

        let recovered = recover(&digest, &r, &s, &candidates).unwrap();
        assert_eq!(recovered.candidate_index, 1);
        assert!(recovered.v == 27 || recovered.v == 28);
    }

    #[test]
    fn decompresses_back_to_recovered_form() {
        let seckey_bytes = [7u8; 32];
        let compressed = compressed_pubkey(&seckey_bytes).unwrap();
        let uncompressed = decompress_pubkey(&compressed).unwrap();
        assert_eq!(uncompressed[0], 0x04);
    }

    #[test]
    fn fails_on_unrelated_candidates() {
        let seckey_bytes = [7u8; 32];
        let digest = [9u8; 32];
        let sig = sign_recoverable(&seckey_bytes, &digest).unwrap();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig[..32]);
        s.copy_from_slice(&sig[32..64]);

        let candidates = [[0u8; 33]];
        let err = recover(&digest, &r, &s, &candidates).unwrap_err();
        assert!(matches!(err, SecpError::UnmatchedSigner));
    }
}
