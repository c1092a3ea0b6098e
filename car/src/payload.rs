// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! The post-inclusion proof builder (see module docs on [`crate`]).

use std::collections::BTreeMap;

use atgate_cbor::{Cid, IpldValue, MapKey};
use serde::Serialize;

use crate::error::CarError;
use crate::reader::{as_map, CarFile};

/// The post-inclusion proof payload handed to the on-chain verifier.
///
/// Field order matches the alphabetical key order the on-chain ABI
/// decoder expects.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostProofPayload {
    /// The `at://` URI of the post.
    #[serde(rename = "atURI")]
    pub at_uri: String,
    /// The mentioned bot handle, without the leading `@`.
    pub bot_name: String,
    /// Byte length of `bot_name`.
    pub bot_name_length: usize,
    /// Hex-encoded commit block with `sig` removed.
    pub commit_node: String,
    /// Hex-encoded content blocks: the post, then optionally its reply parent.
    pub content: Vec<String>,
    /// The DID of the repository the post lives in.
    pub did: String,
    /// Hex-encoded proof-path nodes, tip-first.
    pub nodes: Vec<String>,
    /// Per-node child-selection hints, parallel to `nodes`.
    pub node_hints: Vec<u64>,
    /// The record key of the post.
    pub rkey: String,
    /// `r‖s‖v` signature, 65 bytes hex-encoded.
    pub sig: String,
}

/// Build the post-inclusion proof for a single post's CAR.
///
/// `reply_parent` must be supplied (already fetched) whenever the bot's
/// configuration requires reply-parent content; its presence is not
/// re-derived from the post text here.
pub fn build_post_proof(
    car: &CarFile,
    at_uri: &str,
    did: &str,
    rkey: &str,
    candidate_pubkeys: &[[u8; 33]],
    reply_parent: Option<&CarFile>,
) -> Result<PostProofPayload, CarError> {
    let classified = classify(car)?;

    let mut commit_map = as_map(&classified.commit.1)?.clone();
    let sig_value = commit_map
        .remove("sig")
        .ok_or(CarError::MissingField("sig"))?;
    let sig_bytes = expect_bytes(&sig_value)?;
    if sig_bytes.len() < 64 {
        return Err(CarError::MissingField("sig"));
    }
    let commit_node_bytes = atgate_cbor::encode(&IpldValue::Map(commit_map))?;

    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&sig_bytes[0..32]);
    s.copy_from_slice(&sig_bytes[32..64]);
    let digest = atgate_hashing::sha256(&commit_node_bytes);
    let recovered = atgate_secp::recover(&digest, &r, &s, candidate_pubkeys)?;

    let mut sig = Vec::with_capacity(65);
    sig.extend_from_slice(&r);
    sig.extend_from_slice(&s);
    sig.push(recovered.v);

    let text_map = as_map(&classified.text.1)?;
    let text = match text_map.get("text") {
        Some(IpldValue::String(s)) => s.as_str(),
        _ => return Err(CarError::MissingField("text")),
    };
    if !text.starts_with('@') {
        return Err(CarError::BotNameInvalid);
    }
    let first_token = text.split_whitespace().next().unwrap_or("");
    let bot_name = first_token.strip_prefix('@').unwrap_or("");
    if bot_name.is_empty() || bot_name.len() > 100 {
        return Err(CarError::BotNameInvalid);
    }

    let mut content = vec![to_hex(&classified.text.0)];

    if let Some(parent_car) = reply_parent {
        let parent_cid = reply_parent_cid(text_map)?;
        let parent_bytes = parent_car
            .get(&parent_cid)
            .ok_or(CarError::MissingField("reply.parent"))?;
        let parent_value: IpldValue = atgate_cbor::decode(parent_bytes)?;
        let parent_map = as_map(&parent_value)?;
        if !parent_map.contains_key("text") {
            return Err(CarError::UnexpectedShape(
                "reply parent is not a text block".to_owned(),
            ));
        }
        content.push(to_hex(parent_bytes));
    }

    let mut nodes = Vec::new();
    let mut node_hints = Vec::new();

    let text_target = atgate_cbor::cid_of(&classified.text.0).to_bytes();
    let tip_map = as_map(&classified.tip.1)?;
    let tip_entries = match tip_map.get("e") {
        Some(IpldValue::List(list)) => list,
        _ => return Err(CarError::MissingField("e")),
    };
    let tip_index = tip_entries
        .iter()
        .position(|entry| link_field(entry, "v").as_deref() == Some(text_target.as_slice()))
        .ok_or(CarError::ProofPathBroken)?;
    nodes.push(to_hex(&classified.tip.0));
    node_hints.push(tip_index as u64 + 1);
    let mut target = atgate_cbor::cid_of(&classified.tip.0).to_bytes();

    for (tree_bytes, tree_value) in &classified.tree_nodes {
        let tree_map = as_map(tree_value)?;
        let node_cid = atgate_cbor::cid_of(tree_bytes).to_bytes();

        let left_matches = tree_map
            .get("l")
            .and_then(expect_link_bytes)
            .as_deref()
            == Some(target.as_slice());

        if left_matches {
            node_hints.push(0);
            nodes.push(to_hex(tree_bytes));
            target = node_cid;
            continue;
        }

        let entries = match tree_map.get("e") {
            Some(IpldValue::List(list)) => list,
            _ => return Err(CarError::ProofPathBroken),
        };
        let found = entries
            .iter()
            .position(|entry| link_field(entry, "t").as_deref() == Some(target.as_slice()));
        match found {
            Some(index) => {
                node_hints.push(index as u64 + 1);
                nodes.push(to_hex(tree_bytes));
                target = node_cid;
            }
            None => return Err(CarError::ProofPathBroken),
        }
    }

    let commit_data_target = commit_map_data_target(&classified.commit.1)?;
    if commit_data_target != target {
        return Err(CarError::CommitRootMismatch);
    }

    Ok(PostProofPayload {
        at_uri: at_uri.to_owned(),
        bot_name: bot_name.to_owned(),
        bot_name_length: bot_name.len(),
        commit_node: to_hex(&commit_node_bytes),
        content,
        did: did.to_owned(),
        nodes,
        node_hints,
        rkey: rkey.to_owned(),
        sig: to_hex(&sig),
    })
}

/// If the post's text block references a reply parent, return that
/// parent's `at://` URI so the caller can fetch its CAR before calling
/// [`build_post_proof`] with `reply_parent` filled in.
pub fn reply_parent_at_uri(car: &CarFile) -> Result<Option<String>, CarError> {
    let classified = classify(car)?;
    let text_map = as_map(&classified.text.1)?;
    let reply = match text_map.get("reply") {
        Some(v) => v,
        None => return Ok(None),
    };
    let parent = as_map(reply)?
        .get("parent")
        .ok_or(CarError::MissingField("reply.parent"))?;
    match as_map(parent)?.get("uri") {
        Some(IpldValue::String(uri)) => Ok(Some(uri.clone())),
        _ => Err(CarError::MissingField("reply.parent.uri")),
    }
}

struct Classified {
    commit: (Vec<u8>, IpldValue),
    text: (Vec<u8>, IpldValue),
    tip: (Vec<u8>, IpldValue),
    tree_nodes: Vec<(Vec<u8>, IpldValue)>,
}

fn classify(car: &CarFile) -> Result<Classified, CarError> {
    let mut commit = None;
    let mut text = None;
    let mut tip = None;
    let mut tree_nodes = Vec::new();

    let last_index = car.blocks.len().saturating_sub(1);
    for (i, (_, data)) in car.blocks.iter().enumerate() {
        let value: IpldValue = atgate_cbor::decode(data)?;
        let map = as_map(&value)?;
        if map.contains_key("sig") {
            if commit.is_some() {
                return Err(CarError::UnexpectedShape("more than one commit block".to_owned()));
            }
            commit = Some((data.clone(), value));
        } else if map.contains_key("text") {
            if text.is_some() {
                return Err(CarError::UnexpectedShape("more than one text block".to_owned()));
            }
            text = Some((data.clone(), value));
        } else if i == last_index {
            tip = Some((data.clone(), value));
        } else {
            tree_nodes.push((data.clone(), value));
        }
    }
    tree_nodes.reverse();

    Ok(Classified {
        commit: commit.ok_or(CarError::UnexpectedShape("no commit block found".to_owned()))?,
        text: text.ok_or(CarError::UnexpectedShape("no text block found".to_owned()))?,
        tip: tip.ok_or(CarError::ProofPathBroken)?,
        tree_nodes,
    })
}

fn reply_parent_cid(text_map: &BTreeMap<MapKey, IpldValue>) -> Result<[u8; 36], CarError> {
    let reply = match text_map.get("reply") {
        Some(v) => as_map(v)?,
        None => return Err(CarError::MissingField("reply")),
    };
    let parent = match reply.get("parent") {
        Some(v) => as_map(v)?,
        None => return Err(CarError::MissingField("reply.parent")),
    };
    match parent.get("cid") {
        Some(IpldValue::Link(cid)) => cid_to_array(cid),
        _ => Err(CarError::MissingField("reply.parent.cid")),
    }
}

fn cid_to_array(cid: &Cid) -> Result<[u8; 36], CarError> {
    let bytes = cid.to_bytes();
    if bytes.len() != 36 {
        return Err(CarError::InvalidCar("CID has unexpected length".to_owned()));
    }
    let mut out = [0u8; 36];
    out.copy_from_slice(&bytes);
    Ok(out)
}

fn commit_map_data_target(commit: &IpldValue) -> Result<Vec<u8>, CarError> {
    let map = as_map(commit)?;
    match map.get("data") {
        Some(IpldValue::Link(cid)) => Ok(cid.to_bytes()),
        _ => Err(CarError::MissingField("data")),
    }
}

fn link_field(entry: &IpldValue, key: &str) -> Option<Vec<u8>> {
    let map = as_map(entry).ok()?;
    expect_link_bytes(map.get(key)?)
}

fn expect_link_bytes(value: &IpldValue) -> Option<Vec<u8>> {
    match value {
        IpldValue::Link(cid) => Some(cid.to_bytes()),
        _ => None,
    }
}

fn expect_bytes(value: &IpldValue) -> Result<&[u8], CarError> {
    match value {
        IpldValue::Bytes(bytes) => Ok(bytes.as_slice()),
        _ => Err(CarError::MissingField("sig")),
    }
}

fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: Vec<(&str, IpldValue)>) -> IpldValue {
        let mut m = BTreeMap::new();
        for (k, v) in pairs {
            m.insert(MapKey::from(k), v);
        }
        IpldValue::Map(m)
    }

    fn encode(value: &IpldValue) -> Vec<u8> {
        atgate_cbor::encode(value).unwrap()
    }

    fn link(bytes: &[u8]) -> IpldValue {
        IpldValue::Link(atgate_cbor::cid_of(bytes))
    }

    fn block_entry(bytes: &[u8]) -> ([u8; 36], Vec<u8>) {
        let cid = atgate_cbor::cid_of(bytes).to_bytes();
        let mut cid_array = [0u8; 36];
        cid_array.copy_from_slice(&cid);
        (cid_array, bytes.to_vec())
    }

    /// A post CAR with only a tip node (the entry that directly
    /// references the text block): `commit, text, tip`, commit sealed
    /// against the tip.
    fn single_tip_car() -> (CarFile, Vec<u8>, [u8; 33]) {
        let seckey = [11u8; 32];
        let text_bytes = encode(&map(vec![("text", IpldValue::String("@bot hello".to_owned()))]));

        let tip_value = map(vec![("e", IpldValue::List(vec![map(vec![("v", link(&text_bytes))])]))]);
        let tip_bytes = encode(&tip_value);

        let commit_unsigned = map(vec![("data", link(&tip_bytes))]);
        let commit_node_bytes = encode(&commit_unsigned);
        let digest = atgate_hashing::sha256(&commit_node_bytes);
        let sig65 = atgate_secp::sign_recoverable(&seckey, &digest).unwrap();

        let commit_value = map(vec![
            ("data", link(&tip_bytes)),
            ("sig", IpldValue::Bytes(sig65[..64].to_vec().into())),
        ]);
        let commit_bytes = encode(&commit_value);

        let car = CarFile {
            roots: vec![],
            blocks: vec![
                block_entry(&commit_bytes),
                block_entry(&text_bytes),
                block_entry(&tip_bytes),
            ],
        };

        let candidate = atgate_secp::compressed_pubkey(&seckey).unwrap();
        (car, text_bytes, candidate)
    }

    #[test]
    fn builds_payload_for_a_single_tip_car() {
        let (car, text_bytes, candidate) = single_tip_car();

        let payload = build_post_proof(
            &car,
            "at://did:plc:test/app.bsky.feed.post/abc",
            "did:plc:test",
            "abc",
            &[candidate],
            None,
        )
        .unwrap();

        assert_eq!(payload.at_uri, "at://did:plc:test/app.bsky.feed.post/abc");
        assert_eq!(payload.did, "did:plc:test");
        assert_eq!(payload.rkey, "abc");
        assert_eq!(payload.bot_name, "bot");
        assert_eq!(payload.bot_name_length, 3);
        assert_eq!(payload.content, vec![to_hex(&text_bytes)]);
        assert_eq!(payload.nodes.len(), 1);
        assert_eq!(payload.node_hints, vec![1]);
        assert_eq!(payload.sig.len(), 2 + 65 * 2);
    }

    #[test]
    fn walks_a_tree_node_above_the_tip_via_left_link() {
        let seckey = [22u8; 32];
        let text_bytes = encode(&map(vec![("text", IpldValue::String("@relay hi".to_owned()))]));

        let tip_value = map(vec![("e", IpldValue::List(vec![map(vec![("v", link(&text_bytes))])]))]);
        let tip_bytes = encode(&tip_value);

        let tree_value = map(vec![("l", link(&tip_bytes))]);
        let tree_bytes = encode(&tree_value);

        let commit_unsigned = map(vec![("data", link(&tree_bytes))]);
        let commit_node_bytes = encode(&commit_unsigned);
        let digest = atgate_hashing::sha256(&commit_node_bytes);
        let sig65 = atgate_secp::sign_recoverable(&seckey, &digest).unwrap();
        let commit_value = map(vec![
            ("data", link(&tree_bytes)),
            ("sig", IpldValue::Bytes(sig65[..64].to_vec().into())),
        ]);
        let commit_bytes = encode(&commit_value);

        let car = CarFile {
            roots: vec![],
            blocks: vec![
                block_entry(&commit_bytes),
                block_entry(&text_bytes),
                block_entry(&tree_bytes),
                block_entry(&tip_bytes),
            ],
        };

        let candidate = atgate_secp::compressed_pubkey(&seckey).unwrap();
        let payload = build_post_proof(
            &car,
            "at://did:plc:test/app.bsky.feed.post/xyz",
            "did:plc:test",
            "xyz",
            &[candidate],
            None,
        )
        .unwrap();

        assert_eq!(payload.nodes.len(), 2);
        assert_eq!(payload.node_hints, vec![1, 0]);
        assert_eq!(payload.nodes[0], to_hex(&tip_bytes));
        assert_eq!(payload.nodes[1], to_hex(&tree_bytes));
    }

    #[test]
    fn misordered_car_where_tip_position_is_consumed_by_text_fails_with_proof_path_broken() {
        // Degenerate ordering: the block in the CAR's *last* position is
        // the text block itself, so nothing is left to classify as the
        // tip. The documented failure mode (ordering assumption
        // violated) is `ProofPathBroken`, not a generic "shape missing"
        // error.
        let seckey = [33u8; 32];
        let tip_value = map(vec![("e", IpldValue::List(vec![]))]);
        let tip_bytes = encode(&tip_value);

        let commit_unsigned = map(vec![("data", link(&tip_bytes))]);
        let commit_node_bytes = encode(&commit_unsigned);
        let digest = atgate_hashing::sha256(&commit_node_bytes);
        let sig65 = atgate_secp::sign_recoverable(&seckey, &digest).unwrap();
        let commit_value = map(vec![
            ("data", link(&tip_bytes)),
            ("sig", IpldValue::Bytes(sig65[..64].to_vec().into())),
        ]);
        let commit_bytes = encode(&commit_value);

        let text_bytes = encode(&map(vec![("text", IpldValue::String("@bot hi".to_owned()))]));

        // tip_bytes would normally be last; here text is last instead.
        let car = CarFile {
            roots: vec![],
            blocks: vec![
                block_entry(&commit_bytes),
                block_entry(&tip_bytes),
                block_entry(&text_bytes),
            ],
        };

        let candidate = atgate_secp::compressed_pubkey(&seckey).unwrap();
        let err = build_post_proof(
            &car,
            "at://did:plc:test/app.bsky.feed.post/abc",
            "did:plc:test",
            "abc",
            &[candidate],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, CarError::ProofPathBroken));
    }
}
