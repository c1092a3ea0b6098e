// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! A filesystem-backed work queue: one subdirectory per status, items as
//! JSON files, transitions as atomic renames between directories.
//!
//! [`Queue`] exposes only named transition methods (`promote_to_tx`,
//! `fail_payload`, `abandon_payload`, ...), one per declared edge of the
//! status graph — there is no generic `move(from, to)`, so an undeclared
//! transition is simply a method that does not exist.

#![deny(missing_docs)]

mod error;

pub use self::error::QueueError;

use std::fs;
use std::path::PathBuf;

/// A queue item's lifecycle state, one subdirectory per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Freshly enqueued, awaiting the post/DID-update proof builder.
    Payload,
    /// `Payload` builder failed; awaiting a retry sweep.
    PayloadRetry,
    /// Proof built; awaiting on-chain submission.
    Tx,
    /// `Tx` submission failed; awaiting a retry sweep.
    TxRetry,
    /// Submitted; awaiting the reply-back report.
    Report,
    /// `Report` step failed; awaiting a retry sweep.
    ReportRetry,
    /// Given up on after exhausting retries.
    Abandoned,
    /// Fully processed.
    Completed,
    /// Skipped by policy (e.g. bot configuration says not to handle it).
    Ignored,
}

impl Status {
    /// All statuses, used to create the directory layout and to scan for
    /// an item whose status is unknown.
    pub const ALL: [Status; 9] = [
        Status::Payload,
        Status::PayloadRetry,
        Status::Tx,
        Status::TxRetry,
        Status::Report,
        Status::ReportRetry,
        Status::Abandoned,
        Status::Completed,
        Status::Ignored,
    ];

    /// The directory name for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Payload => "payload",
            Status::PayloadRetry => "payload_retry",
            Status::Tx => "tx",
            Status::TxRetry => "tx_retry",
            Status::Report => "report",
            Status::ReportRetry => "report_retry",
            Status::Abandoned => "abandoned",
            Status::Completed => "completed",
            Status::Ignored => "ignored",
        }
    }
}

/// The key identifying a queued unit of work, used to derive its
/// filesystem-safe filename.
pub enum QueueKey<'a> {
    /// A post mention: the bot it mentioned and the post's `at://` URI.
    Post {
        /// The mentioned bot's handle.
        bot: &'a str,
        /// The post's `at://` URI.
        at_uri: &'a str,
    },
    /// A DID whose PLC history needs a fresh update proof.
    DidUpdate {
        /// The DID.
        did: &'a str,
    },
}

impl<'a> QueueKey<'a> {
    /// A deterministic, filesystem-safe filename for this key: the hex
    /// SHA-256 digest of a tag byte plus the key's own length-prefixed
    /// fields, so a post key and a DID-update key never collide even if
    /// their strings do, and two post keys never collide by shifting a
    /// byte across the bot/at_uri boundary.
    pub fn hashed_name(&self) -> String {
        let mut buf = Vec::new();
        match self {
            QueueKey::Post { bot, at_uri } => {
                buf.push(0u8);
                buf.extend_from_slice(&(bot.len() as u64).to_le_bytes());
                buf.extend_from_slice(bot.as_bytes());
                buf.extend_from_slice(&(at_uri.len() as u64).to_le_bytes());
                buf.extend_from_slice(at_uri.as_bytes());
            }
            QueueKey::DidUpdate { did } => {
                buf.push(1u8);
                buf.extend_from_slice(&(did.len() as u64).to_le_bytes());
                buf.extend_from_slice(did.as_bytes());
            }
        }
        hex::encode(atgate_hashing::sha256(&buf))
    }
}

/// A new post item's JSON body, before the post-proof builder has run.
pub fn new_post_item(at_uri: &str, bot: &str) -> serde_json::Value {
    serde_json::json!({ "atURI": at_uri, "botName": bot })
}

/// A new DID-update item's JSON body, before the DID-update proof
/// builder has run.
pub fn new_did_item(did: &str) -> serde_json::Value {
    serde_json::json!({ "did": did })
}

/// A filesystem-backed queue rooted at a directory with one subdirectory
/// per [`Status`].
pub struct Queue {
    root: PathBuf,
}

impl Queue {
    /// Open (creating if necessary) a queue rooted at `root`, ensuring
    /// every status subdirectory exists.
    pub fn open(root: impl Into<PathBuf>) -> Result<Queue, QueueError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        for status in Status::ALL {
            fs::create_dir_all(root.join(status.as_str()))?;
        }
        Ok(Queue { root })
    }

    fn path(&self, status: Status, filename: &str) -> PathBuf {
        self.root.join(status.as_str()).join(filename)
    }

    /// Write a new item's JSON under `status/`.
    fn enqueue(
        &self,
        status: Status,
        key: &QueueKey,
        item: &serde_json::Value,
    ) -> Result<(), QueueError> {
        let path = self.path(status, &key.hashed_name());
        let body = serde_json::to_vec_pretty(item)?;
        fs::write(path, body)?;
        Ok(())
    }

    /// Enqueue a freshly mentioned post under `payload`.
    pub fn enqueue_post(&self, at_uri: &str, bot: &str) -> Result<(), QueueError> {
        let key = QueueKey::Post { bot, at_uri };
        self.enqueue(Status::Payload, &key, &new_post_item(at_uri, bot))
    }

    /// Enqueue a DID needing a fresh update proof under `payload`.
    pub fn enqueue_did_update(&self, did: &str) -> Result<(), QueueError> {
        let key = QueueKey::DidUpdate { did };
        self.enqueue(Status::Payload, &key, &new_did_item(did))
    }

    /// Read (without removing) the first item found in `status`, in
    /// directory-listing order.
    pub fn read_next(&self, status: Status) -> Result<Option<(String, serde_json::Value)>, QueueError> {
        let dir = self.root.join(status.as_str());
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let filename = entry.file_name().to_string_lossy().into_owned();
            let body = fs::read(entry.path())?;
            let item = serde_json::from_slice(&body)?;
            return Ok(Some((filename, item)));
        }
        Ok(None)
    }

    fn move_file(&self, key: &QueueKey, from: Status, to: Status) -> Result<PathBuf, QueueError> {
        let filename = key.hashed_name();
        let from_path = self.path(from, &filename);
        if !from_path.exists() {
            return Err(QueueError::NotFound(from));
        }
        let to_path = self.path(to, &filename);
        fs::rename(&from_path, &to_path)?;
        Ok(to_path)
    }

    fn move_and_rewrite(
        &self,
        key: &QueueKey,
        from: Status,
        to: Status,
        content: &serde_json::Value,
    ) -> Result<(), QueueError> {
        let to_path = self.move_file(key, from, to)?;
        fs::write(to_path, serde_json::to_vec_pretty(content)?)?;
        Ok(())
    }

    /// `payload -> ignored`: skip an item by policy, with no proof built.
    pub fn ignore(&self, key: &QueueKey) -> Result<(), QueueError> {
        self.move_file(key, Status::Payload, Status::Ignored).map(drop)
    }

    /// `payload -> payload_retry`: the proof builder failed.
    pub fn fail_payload(&self, key: &QueueKey) -> Result<(), QueueError> {
        self.move_file(key, Status::Payload, Status::PayloadRetry).map(drop)
    }

    /// `payload_retry -> payload`: try the proof builder again.
    pub fn retry_payload(&self, key: &QueueKey) -> Result<(), QueueError> {
        self.move_file(key, Status::PayloadRetry, Status::Payload).map(drop)
    }

    /// `payload_retry -> abandoned`: give up after exhausting retries.
    pub fn abandon_payload(&self, key: &QueueKey) -> Result<(), QueueError> {
        self.move_file(key, Status::PayloadRetry, Status::Abandoned).map(drop)
    }

    /// `payload -> tx`: the proof was built; rewrite the item with its
    /// payload fields and hand it to chain submission.
    pub fn promote_to_tx(&self, key: &QueueKey, built: &serde_json::Value) -> Result<(), QueueError> {
        self.move_and_rewrite(key, Status::Payload, Status::Tx, built)
    }

    /// `tx -> tx_retry`: chain submission failed.
    pub fn fail_tx(&self, key: &QueueKey) -> Result<(), QueueError> {
        self.move_file(key, Status::Tx, Status::TxRetry).map(drop)
    }

    /// `tx_retry -> tx`: try chain submission again.
    pub fn retry_tx(&self, key: &QueueKey) -> Result<(), QueueError> {
        self.move_file(key, Status::TxRetry, Status::Tx).map(drop)
    }

    /// `tx_retry -> abandoned`: give up after exhausting retries.
    pub fn abandon_tx(&self, key: &QueueKey) -> Result<(), QueueError> {
        self.move_file(key, Status::TxRetry, Status::Abandoned).map(drop)
    }

    /// `tx -> report`: the transaction was included; move on to the
    /// reply-back report.
    pub fn promote_to_report(&self, key: &QueueKey, built: &serde_json::Value) -> Result<(), QueueError> {
        self.move_and_rewrite(key, Status::Tx, Status::Report, built)
    }

    /// `report -> report_retry`: posting the reply-back report failed.
    pub fn fail_report(&self, key: &QueueKey) -> Result<(), QueueError> {
        self.move_file(key, Status::Report, Status::ReportRetry).map(drop)
    }

    /// `report_retry -> report`: try the reply-back report again.
    pub fn retry_report(&self, key: &QueueKey) -> Result<(), QueueError> {
        self.move_file(key, Status::ReportRetry, Status::Report).map(drop)
    }

    /// `report_retry -> abandoned`: give up after exhausting retries.
    pub fn abandon_report(&self, key: &QueueKey) -> Result<(), QueueError> {
        self.move_file(key, Status::ReportRetry, Status::Abandoned).map(drop)
    }

    /// `report -> completed`: the whole pipeline finished for this item.
    pub fn complete(&self, key: &QueueKey) -> Result<(), QueueError> {
        self.move_file(key, Status::Report, Status::Completed).map(drop)
    }

    /// Scan every status directory for `key`, returning the one it is
    /// currently in, if any.
    pub fn status_of(&self, key: &QueueKey) -> Result<Option<Status>, QueueError> {
        let filename = key.hashed_name();
        for status in Status::ALL {
            if self.path(status, &filename).exists() {
                return Ok(Some(status));
            }
        }
        Ok(None)
    }

    /// Read every item currently in `status`, in directory-listing order.
    /// Unlike [`Queue::read_next`], this loads the whole directory; used
    /// by callers that need to pick out items of one kind from a status
    /// directory holding a mix (e.g. post and DID-update items both sit
    /// in `payload`).
    pub fn list(&self, status: Status) -> Result<Vec<(String, serde_json::Value)>, QueueError> {
        let dir = self.root.join(status.as_str());
        let mut out = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let filename = entry.file_name().to_string_lossy().into_owned();
            let body = fs::read(entry.path())?;
            out.push((filename, serde_json::from_slice(&body)?));
        }
        Ok(out)
    }

    /// Count the items currently in each status, in [`Status::ALL`] order.
    pub fn counts(&self) -> Result<Vec<(Status, usize)>, QueueError> {
        let mut out = Vec::with_capacity(Status::ALL.len());
        for status in Status::ALL {
            let count = fs::read_dir(self.root.join(status.as_str()))?.count();
            out.push((status, count));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_then_read_next_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Queue::open(dir.path()).unwrap();
        queue
            .enqueue_post("at://did:plc:abc/app.bsky.feed.post/123", "bot.test")
            .unwrap();

        let (_, item) = queue.read_next(Status::Payload).unwrap().unwrap();
        assert_eq!(item["botName"], "bot.test");

        let key = QueueKey::Post {
            bot: "bot.test",
            at_uri: "at://did:plc:abc/app.bsky.feed.post/123",
        };
        assert_eq!(queue.status_of(&key).unwrap(), Some(Status::Payload));
    }

    #[test]
    fn promote_to_tx_moves_the_file_and_rewrites_content() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Queue::open(dir.path()).unwrap();
        queue.enqueue_did_update("did:plc:abc").unwrap();
        let key = QueueKey::DidUpdate { did: "did:plc:abc" };

        let built = serde_json::json!({ "did": "did:plc:abc", "ops": [] });
        queue.promote_to_tx(&key, &built).unwrap();

        assert_eq!(queue.status_of(&key).unwrap(), Some(Status::Tx));
        let (_, item) = queue.read_next(Status::Tx).unwrap().unwrap();
        assert_eq!(item["ops"], serde_json::json!([]));
    }

    #[test]
    fn retry_then_abandon_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Queue::open(dir.path()).unwrap();
        queue.enqueue_did_update("did:plc:abc").unwrap();
        let key = QueueKey::DidUpdate { did: "did:plc:abc" };

        queue.fail_payload(&key).unwrap();
        assert_eq!(queue.status_of(&key).unwrap(), Some(Status::PayloadRetry));

        queue.abandon_payload(&key).unwrap();
        assert_eq!(queue.status_of(&key).unwrap(), Some(Status::Abandoned));
    }

    #[test]
    fn moving_an_absent_item_fails_with_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Queue::open(dir.path()).unwrap();
        let key = QueueKey::DidUpdate { did: "did:plc:never-enqueued" };
        let err = queue.fail_payload(&key).unwrap_err();
        assert!(matches!(err, QueueError::NotFound(Status::Payload)));
    }

    #[test]
    fn post_and_did_update_keys_never_collide() {
        let post = QueueKey::Post { bot: "a", at_uri: "b" };
        let did = QueueKey::DidUpdate { did: "a\u{0}b" };
        assert_ne!(post.hashed_name(), did.hashed_name());
    }

    #[test]
    fn post_keys_do_not_collide_across_the_bot_at_uri_boundary() {
        let shifted_into_bot = QueueKey::Post { bot: "a\u{0}", at_uri: "b" };
        let shifted_into_uri = QueueKey::Post { bot: "a", at_uri: "\u{0}b" };
        assert_ne!(shifted_into_bot.hashed_name(), shifted_into_uri.hashed_name());
    }

    #[test]
    fn list_returns_every_item_in_a_status() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Queue::open(dir.path()).unwrap();
        queue.enqueue_post("at://a", "bot").unwrap();
        queue.enqueue_did_update("did:plc:abc").unwrap();

        let items = queue.list(Status::Payload).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn counts_reflect_enqueued_items() {
        let dir = tempfile::tempdir().unwrap();
        let queue = Queue::open(dir.path()).unwrap();
        queue.enqueue_post("at://a", "bot").unwrap();
        queue.enqueue_did_update("did:plc:abc").unwrap();

        let counts: std::collections::HashMap<_, _> = queue.counts().unwrap().into_iter().collect();
        assert_eq!(counts[&Status::Payload], 2);
        assert_eq!(counts[&Status::Tx], 0);
    }
}
