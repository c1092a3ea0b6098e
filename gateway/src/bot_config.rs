// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! The bot handle → behavior mapping, loaded once at startup and held
//! read-only for the lifetime of the process.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::GatewayError;

/// Per-bot metadata consulted by the post-proof builder.
#[derive(Debug, Clone, Deserialize)]
pub struct BotMetadata {
    /// Whether a reply-parent's text block must be included in the
    /// proof payload's `content`.
    #[serde(default)]
    pub reply: bool,
}

/// One configured bot: its content parser name and metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct BotEntry {
    /// Name of the parser used to interpret this bot's post content.
    /// Opaque to this crate; forwarded as configuration only.
    pub parser: String,
    /// Behavior flags.
    #[serde(default)]
    pub metadata: BotMetadata,
}

/// The full bot handle → configuration mapping.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BotConfig(HashMap<String, BotEntry>);

impl BotConfig {
    /// Load a bot configuration from a JSON file.
    pub fn load(path: &Path) -> Result<BotConfig, GatewayError> {
        let text = std::fs::read_to_string(path)?;
        let config: BotConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Look up a bot by handle (case-sensitive, without leading `@`).
    pub fn get(&self, handle: &str) -> Option<&BotEntry> {
        self.0.get(handle)
    }

    /// Whether `handle` requires reply-parent content to be included.
    pub fn requires_reply_parent(&self, handle: &str) -> bool {
        self.get(handle).map(|e| e.metadata.reply).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_reply_flag_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bots.json");
        std::fs::write(
            &path,
            r#"{"relay.example.com": {"parser": "default", "metadata": {"reply": true}}}"#,
        )
        .unwrap();

        let config = BotConfig::load(&path).unwrap();
        assert!(config.requires_reply_parent("relay.example.com"));
        assert!(!config.requires_reply_parent("unknown.example.com"));
    }

    #[test]
    fn metadata_defaults_to_no_reply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bots.json");
        std::fs::write(&path, r#"{"plain": {"parser": "default"}}"#).unwrap();

        let config = BotConfig::load(&path).unwrap();
        assert!(!config.requires_reply_parent("plain"));
    }
}
