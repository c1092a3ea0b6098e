// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! The queue sweep loop: one pass over a status directory per call, each
//! item driven through the relevant builder against injected
//! collaborators, with failures routed to the matching `*_retry` status.

use atgate_queue::{Queue, QueueKey, Status};
use log::{error, info, warn};

use crate::bot_config::BotConfig;
use crate::collaborators::{CarFetcher, ChainSubmitter, DidResolver, PlcAuditLog, SocialClient, SubmitOutcome};
use crate::error::GatewayError;

/// Which kind of payload-stage item a sweep should pick out of `payload`
/// (and its retry sibling), since both kinds share the same directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepKind {
    /// A post mentioning one of the configured bots.
    Post,
    /// A DID due for a fresh update proof.
    DidUpdate,
}

fn parse_at_uri(at_uri: &str) -> Result<(String, String), GatewayError> {
    let rest = at_uri.strip_prefix("at://").ok_or_else(|| {
        GatewayError::Config(format!("not an at:// URI: {}", at_uri))
    })?;
    let mut parts = rest.splitn(3, '/');
    let did = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GatewayError::Config(format!("missing DID in at:// URI: {}", at_uri)))?;
    let rkey = parts
        .nth(1)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GatewayError::Config(format!("missing rkey in at:// URI: {}", at_uri)))?;
    Ok((did.to_owned(), rkey.to_owned()))
}

/// Run one sweep of the `payload` status directory for items of `kind`,
/// building the relevant proof payload for every item found and
/// promoting it to `tx`, or routing it to `payload_retry` on failure.
pub fn sweep_payload(
    queue: &Queue,
    kind: SweepKind,
    resolver: &dyn DidResolver,
    car_fetcher: &dyn CarFetcher,
    plc_log: &dyn PlcAuditLog,
    bot_config: &BotConfig,
) -> Result<usize, GatewayError> {
    let mut processed = 0;
    for (_, item) in queue.list(Status::Payload)? {
        match kind {
            SweepKind::Post => {
                let at_uri = match item.get("atURI").and_then(|v| v.as_str()) {
                    Some(v) => v,
                    None => continue,
                };
                let bot = item["botName"].as_str().unwrap_or_default();
                let key = QueueKey::Post { bot, at_uri };

                match build_post_payload(at_uri, bot, resolver, car_fetcher, bot_config) {
                    Ok(built) => {
                        queue.promote_to_tx(&key, &built)?;
                        info!("built post proof for {}", at_uri);
                    }
                    Err(err) => {
                        error!("post proof build failed for {}: {}", at_uri, err);
                        queue.fail_payload(&key)?;
                    }
                }
                processed += 1;
            }
            SweepKind::DidUpdate => {
                let did = match item.get("did").and_then(|v| v.as_str()) {
                    Some(v) => v,
                    None => continue,
                };
                let key = QueueKey::DidUpdate { did };

                match build_did_payload(did, plc_log) {
                    Ok(built) => {
                        queue.promote_to_tx(&key, &built)?;
                        info!("built DID update proof for {}", did);
                    }
                    Err(err) => {
                        error!("DID update proof build failed for {}: {}", did, err);
                        queue.fail_payload(&key)?;
                    }
                }
                processed += 1;
            }
        }
    }
    Ok(processed)
}

fn build_post_payload(
    at_uri: &str,
    bot: &str,
    resolver: &dyn DidResolver,
    car_fetcher: &dyn CarFetcher,
    bot_config: &BotConfig,
) -> Result<serde_json::Value, GatewayError> {
    let (did, rkey) = parse_at_uri(at_uri)?;
    let document = resolver.resolve(&did)?;
    let car = car_fetcher.fetch(&did, &rkey)?;

    let reply_parent = if bot_config.requires_reply_parent(bot) {
        match atgate_car::reply_parent_at_uri(&car)? {
            Some(parent_uri) => {
                let (parent_did, parent_rkey) = parse_at_uri(&parent_uri)?;
                Some(car_fetcher.fetch(&parent_did, &parent_rkey)?)
            }
            None => None,
        }
    } else {
        None
    };

    let payload = atgate_car::build_post_proof(
        &car,
        at_uri,
        &did,
        &rkey,
        &document.verification_keys,
        reply_parent.as_ref(),
    )?;
    Ok(serde_json::to_value(payload)?)
}

fn build_did_payload(did: &str, plc_log: &dyn PlcAuditLog) -> Result<serde_json::Value, GatewayError> {
    let log = plc_log.audit_log(did)?;
    let payload = atgate_plc::build_did_update_proof(did, &log)?;
    Ok(serde_json::to_value(payload)?)
}

/// Run one sweep of the `tx` status directory: submit every item's
/// built payload and promote it to `report`, or route to `tx_retry`.
pub fn sweep_tx(queue: &Queue, submitter: &dyn ChainSubmitter) -> Result<usize, GatewayError> {
    let mut processed = 0;
    for (_, item) in queue.list(Status::Tx)? {
        let key = item_key(&item)?;
        match submitter.submit(&item) {
            Ok(SubmitOutcome::Included { tx_hash }) => {
                info!("submitted, tx {}", tx_hash);
                queue.promote_to_report(&key, &item)?;
            }
            Ok(SubmitOutcome::AlreadyHandled) => {
                warn!("already handled on-chain, treating as success");
                queue.promote_to_report(&key, &item)?;
            }
            Err(err) => {
                error!("chain submission failed: {}", err);
                queue.fail_tx(&key)?;
            }
        }
        processed += 1;
    }
    Ok(processed)
}

/// Run one sweep of the `report` status directory: post the reply-back
/// report for every item and mark it `completed`, or route to
/// `report_retry`.
pub fn sweep_report(queue: &Queue, social: &dyn SocialClient) -> Result<usize, GatewayError> {
    let mut processed = 0;
    for (_, item) in queue.list(Status::Report)? {
        let key = item_key(&item)?;
        let at_uri = item.get("atURI").and_then(|v| v.as_str());
        let result = match at_uri {
            Some(at_uri) => social.reply(at_uri, "done"),
            None => Ok(()),
        };
        match result {
            Ok(()) => {
                queue.complete(&key)?;
            }
            Err(err) => {
                error!("reply-back report failed: {}", err);
                queue.fail_report(&key)?;
            }
        }
        processed += 1;
    }
    Ok(processed)
}

fn item_key(item: &serde_json::Value) -> Result<QueueKey<'_>, GatewayError> {
    if let (Some(at_uri), Some(bot)) = (
        item.get("atURI").and_then(|v| v.as_str()),
        item.get("botName").and_then(|v| v.as_str()),
    ) {
        return Ok(QueueKey::Post { bot, at_uri });
    }
    if let Some(did) = item.get("did").and_then(|v| v.as_str()) {
        return Ok(QueueKey::DidUpdate { did });
    }
    Err(GatewayError::Config("queue item has neither atURI nor did".to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_did_and_rkey_from_at_uri() {
        let (did, rkey) =
            parse_at_uri("at://did:plc:abc123/app.bsky.feed.post/3jzfc").unwrap();
        assert_eq!(did, "did:plc:abc123");
        assert_eq!(rkey, "3jzfc");
    }

    #[test]
    fn rejects_a_uri_without_the_at_scheme() {
        assert!(parse_at_uri("https://example.com").is_err());
    }

    #[test]
    fn item_key_prefers_post_shape_when_both_fields_present() {
        let item = serde_json::json!({ "atURI": "at://x", "botName": "bot" });
        match item_key(&item).unwrap() {
            QueueKey::Post { bot, at_uri } => {
                assert_eq!(bot, "bot");
                assert_eq!(at_uri, "at://x");
            }
            QueueKey::DidUpdate { .. } => panic!("expected Post key"),
        }
    }
}
