// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! The DID-history proof builder.
//!
//! Walks a PLC audit log and, for each non-nullified operation, recovers
//! the signer and the rotation-key index in the *previous* operation's key
//! set that authorized it (see [`build_did_update_proof`]).

#![deny(missing_docs)]

mod error;

pub use self::error::PlcError;

use std::collections::BTreeMap;

use atgate_cbor::{IpldValue, MapKey};
use serde::{Deserialize, Serialize};

/// One entry of a PLC audit log, as returned by `GET /<did>/log/audit`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    /// The operation's own CID.
    pub cid: String,
    /// The PLC operation, as a JSON object mirroring its DAG-CBOR map.
    pub operation: serde_json::Value,
    /// Whether this entry was later nullified (a recovery/takeover event).
    pub nullified: bool,
    /// ISO-8601 timestamp, carried through unused.
    pub created_at: String,
}

/// The DID-update proof payload handed to the on-chain verifier.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DidUpdateProofPayload {
    /// The DID this proof authenticates updates for.
    pub did: String,
    /// Hex-encoded signable-CBOR of each operation, genesis first.
    pub ops: Vec<String>,
    /// `r‖s‖v` signatures, 65 bytes hex-encoded, parallel to `ops`.
    pub sigs: Vec<String>,
    /// Hex-encoded uncompressed signer public keys. Entry `i` signed
    /// `ops[i+1]`; the final entry is the tail operation's own
    /// `verificationMethods.atproto` key.
    pub pubkeys: Vec<String>,
    /// Index into the preceding operation's `rotationKeys` selecting the
    /// key that signed each operation, parallel to `pubkeys`.
    pub pubkey_indexes: Vec<u64>,
}

/// Build the DID-update proof for an ordered PLC audit log.
///
/// `log` must be in chronological order; nullified entries are skipped
/// entirely and do not participate in `prev` chaining.
pub fn build_did_update_proof(
    did: &str,
    log: &[AuditLogEntry],
) -> Result<DidUpdateProofPayload, PlcError> {
    let mut ops = Vec::new();
    let mut sigs = Vec::new();
    let mut pubkeys = Vec::new();
    let mut pubkey_indexes = Vec::new();

    let mut active_rotation_keys: Vec<[u8; 33]> = Vec::new();
    let mut last_signed_cid: Option<[u8; 32]> = None;
    let mut last_verification_key: Option<[u8; 33]> = None;
    let mut is_first = true;

    for entry in log.iter().filter(|entry| !entry.nullified) {
        let op_value = atgate_cbor::json_to_ipld(&entry.operation)?;
        let op_map = as_map(&op_value)?;

        let sig_b64url = match op_map.get("sig") {
            Some(IpldValue::String(s)) => s.clone(),
            _ => return Err(PlcError::MissingField("sig")),
        };
        let sig_bytes = base64::decode_config(&sig_b64url, base64::URL_SAFE_NO_PAD)?;
        if sig_bytes.len() < 64 {
            return Err(PlcError::MissingField("sig"));
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&sig_bytes[0..32]);
        s.copy_from_slice(&sig_bytes[32..64]);

        let signed_cbor = atgate_cbor::encode(&op_value)?;

        let mut signable_map = op_map.clone();
        signable_map.remove("sig");
        let signable_cbor = atgate_cbor::encode(&IpldValue::Map(signable_map))?;

        verify_signed_form(&signed_cbor, &signable_cbor, &sig_b64url)?;

        let rotation_keys = decode_rotation_keys(op_map)?;

        if is_first {
            let prev_is_null = matches!(op_map.get("prev"), None | Some(IpldValue::Null));
            if !prev_is_null {
                return Err(PlcError::GenesisHasPrev);
            }
            active_rotation_keys = rotation_keys.clone();
        } else {
            let prev = match op_map.get("prev") {
                Some(IpldValue::String(s)) => s,
                _ => return Err(PlcError::MissingField("prev")),
            };
            let (_, prev_bytes) =
                multibase::decode(prev).map_err(|e| PlcError::Multibase(e.to_string()))?;
            let prev_digest = atgate_cbor::digest_of(&prev_bytes).ok_or(PlcError::PrevMismatch)?;
            if Some(prev_digest) != last_signed_cid {
                return Err(PlcError::PrevMismatch);
            }
        }

        let digest = atgate_hashing::sha256(&signable_cbor);
        let recovered = atgate_secp::recover(&digest, &r, &s, &active_rotation_keys)
            .map_err(|_| PlcError::NoAuthorizingKey)?;

        let mut sig65 = Vec::with_capacity(65);
        sig65.extend_from_slice(&r);
        sig65.extend_from_slice(&s);
        sig65.push(recovered.v);

        ops.push(to_hex(&signable_cbor));
        pubkey_indexes.push(recovered.candidate_index as u64);
        pubkeys.push(to_hex(&recovered.uncompressed_pubkey));
        sigs.push(to_hex(&sig65));

        if let Some(IpldValue::Map(verification_methods)) = op_map.get("verificationMethods") {
            if let Some(IpldValue::String(key)) = verification_methods.get("atproto") {
                last_verification_key = Some(atgate_didkey::decode_did_key(key)?);
            }
        }

        last_signed_cid = Some(atgate_hashing::sha256(&signed_cbor));
        active_rotation_keys = rotation_keys;
        is_first = false;
    }

    if ops.is_empty() {
        return Err(PlcError::MissingField("operation"));
    }

    pubkeys.remove(0);
    pubkey_indexes.remove(0);

    let verification_key = last_verification_key.ok_or(PlcError::MissingField(
        "verificationMethods.atproto",
    ))?;
    let uncompressed = atgate_secp::decompress_pubkey(&verification_key)?;
    pubkeys.push(to_hex(&uncompressed));

    Ok(DidUpdateProofPayload {
        did: did.to_owned(),
        ops,
        sigs,
        pubkeys,
        pubkey_indexes,
    })
}

/// Reconstruct `signed_cbor` from `signable_cbor` and the `sig` field's own
/// canonical encoding, and verify it matches byte-for-byte.
///
/// The two encodings differ only in the map's entry-count byte and the
/// presence of one `sig` entry, so splicing it back at the position it
/// occupies in `signed_cbor` must reproduce `signed_cbor` exactly.
fn verify_signed_form(
    signed_cbor: &[u8],
    signable_cbor: &[u8],
    sig_b64url: &str,
) -> Result<(), PlcError> {
    if signed_cbor.is_empty() || signable_cbor.is_empty() {
        return Err(PlcError::SignedFormAssumptionViolated);
    }
    if signed_cbor[0] != signable_cbor[0] + 1 {
        return Err(PlcError::SignedFormAssumptionViolated);
    }

    let mut sig_field_bytes = atgate_cbor::encode(&IpldValue::String("sig".to_owned()))?;
    sig_field_bytes.extend(atgate_cbor::encode(&IpldValue::String(
        sig_b64url.to_owned(),
    ))?);

    let sig_start = find_subslice(signed_cbor, &sig_field_bytes)
        .ok_or(PlcError::SignedFormAssumptionViolated)?;
    if sig_start > signable_cbor.len() {
        return Err(PlcError::SignedFormAssumptionViolated);
    }

    let mut recreated = Vec::with_capacity(signed_cbor.len());
    recreated.push(signed_cbor[0]);
    recreated.extend_from_slice(&signable_cbor[1..sig_start]);
    recreated.extend_from_slice(&sig_field_bytes);
    recreated.extend_from_slice(&signable_cbor[sig_start..]);

    if recreated != signed_cbor {
        return Err(PlcError::SignedFormAssumptionViolated);
    }
    Ok(())
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn decode_rotation_keys(
    op_map: &BTreeMap<MapKey, IpldValue>,
) -> Result<Vec<[u8; 33]>, PlcError> {
    let keys = match op_map.get("rotationKeys") {
        Some(IpldValue::List(list)) => list,
        _ => return Err(PlcError::MissingField("rotationKeys")),
    };
    keys.iter()
        .map(|key| match key {
            IpldValue::String(s) => Ok(atgate_didkey::decode_did_key(s)?),
            _ => Err(PlcError::MissingField("rotationKeys")),
        })
        .collect()
}

fn as_map(value: &IpldValue) -> Result<&BTreeMap<MapKey, IpldValue>, PlcError> {
    match value {
        IpldValue::Map(map) => Ok(map),
        _ => Err(PlcError::MissingField("operation")),
    }
}

fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use multibase::Base;

    fn sign_op(seckey: &[u8; 32], op_without_sig: &serde_json::Value) -> (Vec<u8>, String) {
        let ipld = atgate_cbor::json_to_ipld(op_without_sig).unwrap();
        let signable_cbor = atgate_cbor::encode(&ipld).unwrap();
        let digest = atgate_hashing::sha256(&signable_cbor);
        let sig = atgate_secp::sign_recoverable(seckey, &digest).unwrap();
        let sig_b64url = base64::encode_config(&sig[0..64], base64::URL_SAFE_NO_PAD);
        (signable_cbor, sig_b64url)
    }

    fn signed_cid_string(signed_cbor: &[u8]) -> String {
        let digest = atgate_hashing::sha256(signed_cbor);
        let mut cid_bytes = atgate_cbor::CID_PREFIX.to_vec();
        cid_bytes.extend_from_slice(&digest);
        multibase::encode(Base::Base32Lower, &cid_bytes)
    }

    #[test]
    fn genesis_only_log_yields_self_authorized_proof() {
        let seckey = [11u8; 32];
        let pubkey = atgate_secp::compressed_pubkey(&seckey).unwrap();
        let did_key = atgate_didkey::encode_did_key(&pubkey);

        let unsigned = serde_json::json!({
            "type": "plc_operation",
            "rotationKeys": [did_key],
            "verificationMethods": { "atproto": did_key },
            "alsoKnownAs": ["at://example.test"],
            "services": {},
            "prev": null,
        });
        let (_signable, sig) = sign_op(&seckey, &unsigned);
        let mut operation = unsigned;
        operation["sig"] = serde_json::Value::String(sig);

        let entry = AuditLogEntry {
            cid: "unused".to_owned(),
            operation,
            nullified: false,
            created_at: "2024-01-01T00:00:00Z".to_owned(),
        };

        let payload = build_did_update_proof("did:plc:test", &[entry]).unwrap();
        assert_eq!(payload.ops.len(), 1);
        assert_eq!(payload.pubkeys.len(), 1);
        assert!(payload.pubkey_indexes.is_empty());
        assert!(payload.sigs.len() == 1);
    }

    #[test]
    fn second_op_is_authorized_by_genesis_rotation_key() {
        let genesis_key = [11u8; 32];
        let genesis_pubkey = atgate_secp::compressed_pubkey(&genesis_key).unwrap();
        let genesis_did_key = atgate_didkey::encode_did_key(&genesis_pubkey);

        let next_key = [22u8; 32];
        let next_pubkey = atgate_secp::compressed_pubkey(&next_key).unwrap();
        let next_did_key = atgate_didkey::encode_did_key(&next_pubkey);

        let unsigned_genesis = serde_json::json!({
            "type": "plc_operation",
            "rotationKeys": [genesis_did_key],
            "verificationMethods": { "atproto": genesis_did_key },
            "alsoKnownAs": ["at://example.test"],
            "services": {},
            "prev": null,
        });
        let (signable_genesis, sig_genesis) = sign_op(&genesis_key, &unsigned_genesis);
        let mut genesis_op = unsigned_genesis;
        genesis_op["sig"] = serde_json::Value::String(sig_genesis.clone());
        let genesis_ipld = atgate_cbor::json_to_ipld(&genesis_op).unwrap();
        let genesis_signed_cbor = atgate_cbor::encode(&genesis_ipld).unwrap();
        let _ = signable_genesis;

        let prev = signed_cid_string(&genesis_signed_cbor);

        let unsigned_second = serde_json::json!({
            "type": "plc_operation",
            "rotationKeys": [next_did_key],
            "verificationMethods": { "atproto": next_did_key },
            "alsoKnownAs": ["at://example.test"],
            "services": {},
            "prev": prev,
        });
        let (_signable_second, sig_second) = sign_op(&genesis_key, &unsigned_second);
        let mut second_op = unsigned_second;
        second_op["sig"] = serde_json::Value::String(sig_second);

        let entries = vec![
            AuditLogEntry {
                cid: "unused".to_owned(),
                operation: genesis_op,
                nullified: false,
                created_at: "2024-01-01T00:00:00Z".to_owned(),
            },
            AuditLogEntry {
                cid: "unused".to_owned(),
                operation: second_op,
                nullified: false,
                created_at: "2024-01-02T00:00:00Z".to_owned(),
            },
        ];

        let payload = build_did_update_proof("did:plc:test", &entries).unwrap();
        assert_eq!(payload.ops.len(), 2);
        assert_eq!(payload.pubkeys.len(), 2);
        assert_eq!(payload.pubkey_indexes.len(), 1);
        assert_eq!(payload.pubkey_indexes[0], 0);
    }

    #[test]
    fn nullified_entry_is_skipped_entirely() {
        let seckey = [33u8; 32];
        let pubkey = atgate_secp::compressed_pubkey(&seckey).unwrap();
        let did_key = atgate_didkey::encode_did_key(&pubkey);

        let unsigned = serde_json::json!({
            "type": "plc_operation",
            "rotationKeys": [did_key],
            "verificationMethods": { "atproto": did_key },
            "prev": null,
        });
        let (_signable, sig) = sign_op(&seckey, &unsigned);
        let mut operation = unsigned;
        operation["sig"] = serde_json::Value::String(sig);

        let entries = vec![
            AuditLogEntry {
                cid: "unused".to_owned(),
                operation: operation.clone(),
                nullified: true,
                created_at: "2024-01-01T00:00:00Z".to_owned(),
            },
            AuditLogEntry {
                cid: "unused".to_owned(),
                operation,
                nullified: false,
                created_at: "2024-01-02T00:00:00Z".to_owned(),
            },
        ];

        let payload = build_did_update_proof("did:plc:test", &entries).unwrap();
        assert_eq!(payload.ops.len(), 1);
    }
}
