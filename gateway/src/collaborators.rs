// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! Trait boundaries standing in for the external systems this crate does
//! not implement: HTTP fetching of DID documents and PLC logs, CAR
//! retrieval, on-chain submission, and the social client. Production
//! wiring of these is out of scope; [`Unimplemented`] stands in for it
//! in the CLI and in tests that do not exercise a given stage.

use crate::error::GatewayError;

/// A DID document's verification methods and service endpoint, the
/// subset the post-proof builder and pipeline need.
#[derive(Debug, Clone)]
pub struct DidDocument {
    /// Compressed secp256k1 public keys found under `verificationMethod`.
    pub verification_keys: Vec<[u8; 33]>,
    /// `service[0].serviceEndpoint`, if present.
    pub service_endpoint: Option<String>,
    /// `alsoKnownAs[]` handles.
    pub also_known_as: Vec<String>,
}

/// The outcome of submitting a built payload to the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The transaction was mined and included.
    Included {
        /// Transaction hash, hex-encoded.
        tx_hash: String,
    },
    /// The contract reverted with `execution reverted: Already handled`,
    /// which this system treats as a successful, idempotent replay.
    AlreadyHandled,
}

/// Fetches a DID document for a given DID.
pub trait DidResolver {
    /// Resolve `did` to its current document.
    fn resolve(&self, did: &str) -> Result<DidDocument, GatewayError>;
}

/// Fetches the ordered PLC audit log for a DID.
pub trait PlcAuditLog {
    /// Fetch every audit-log entry for `did`, oldest first.
    fn audit_log(&self, did: &str) -> Result<Vec<atgate_plc::AuditLogEntry>, GatewayError>;
}

/// Fetches a CAR for a single post record.
pub trait CarFetcher {
    /// Fetch the CAR containing the record at `(did, rkey)`.
    fn fetch(&self, did: &str, rkey: &str) -> Result<atgate_car::CarFile, GatewayError>;
}

/// Submits a built payload on-chain and polls for inclusion.
pub trait ChainSubmitter {
    /// Submit `payload` (already JSON-encoded) and block until it is
    /// included or definitively rejected.
    fn submit(&self, payload: &serde_json::Value) -> Result<SubmitOutcome, GatewayError>;
}

/// Posts replies and looks up mentions on the social network.
pub trait SocialClient {
    /// Reply to `at_uri` with `text`.
    fn reply(&self, at_uri: &str, text: &str) -> Result<(), GatewayError>;
    /// Look up posts mentioning `handle` since the last sweep.
    fn mentions(&self, handle: &str) -> Result<Vec<String>, GatewayError>;
}

/// A collaborator implementation that performs no I/O and fails every
/// call with [`GatewayError::NotImplemented`]. Used to wire up the CLI
/// and pipeline before the real HTTP/JSON-RPC/ATProto clients exist.
pub struct Unimplemented;

impl DidResolver for Unimplemented {
    fn resolve(&self, _did: &str) -> Result<DidDocument, GatewayError> {
        Err(GatewayError::NotImplemented("DidResolver"))
    }
}

impl PlcAuditLog for Unimplemented {
    fn audit_log(&self, _did: &str) -> Result<Vec<atgate_plc::AuditLogEntry>, GatewayError> {
        Err(GatewayError::NotImplemented("PlcAuditLog"))
    }
}

impl CarFetcher for Unimplemented {
    fn fetch(&self, _did: &str, _rkey: &str) -> Result<atgate_car::CarFile, GatewayError> {
        Err(GatewayError::NotImplemented("CarFetcher"))
    }
}

impl ChainSubmitter for Unimplemented {
    fn submit(&self, _payload: &serde_json::Value) -> Result<SubmitOutcome, GatewayError> {
        Err(GatewayError::NotImplemented("ChainSubmitter"))
    }
}

impl SocialClient for Unimplemented {
    fn reply(&self, _at_uri: &str, _text: &str) -> Result<(), GatewayError> {
        Err(GatewayError::NotImplemented("SocialClient"))
    }
    fn mentions(&self, _handle: &str) -> Result<Vec<String>, GatewayError> {
        Err(GatewayError::NotImplemented("SocialClient"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unimplemented_resolver_fails_clearly() {
        let err = Unimplemented.resolve("did:plc:abc").unwrap_err();
        assert!(matches!(err, GatewayError::NotImplemented("DidResolver")));
    }

    #[test]
    fn unimplemented_submitter_fails_clearly() {
        let err = Unimplemented
            .submit(&serde_json::json!({}))
            .unwrap_err();
        assert!(matches!(err, GatewayError::NotImplemented("ChainSubmitter")));
    }
}
