// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use std::path::PathBuf;

use structopt::clap::{arg_enum, AppSettings};
use structopt::StructOpt;

use crate::config::ConfigOverrides;

arg_enum! {
    /// Which kind of payload-stage item a `queue sweep` pass should pick out.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum SweepKind {
        /// A post mentioning one of the configured bots.
        Post,
        /// A DID due for a fresh update proof.
        DidUpdate,
    }
}

impl From<SweepKind> for crate::pipeline::SweepKind {
    fn from(kind: SweepKind) -> Self {
        match kind {
            SweepKind::Post => crate::pipeline::SweepKind::Post,
            SweepKind::DidUpdate => crate::pipeline::SweepKind::DidUpdate,
        }
    }
}

/// Operations on the filesystem queue.
#[derive(StructOpt, Debug, Clone)]
pub enum QueueCmd {
    /// Run one sweep of a queue stage against injected collaborators.
    #[structopt(name = "sweep")]
    Sweep {
        /// Which kind of payload to sweep: `post` or `did-update`.
        #[structopt(possible_values = &SweepKind::variants(), case_insensitive = true)]
        kind: SweepKind,
    },
    /// Print a count of items per status directory.
    #[structopt(name = "status")]
    Status,
}

/// The gateway's top-level subcommands.
#[derive(StructOpt, Debug, Clone)]
pub enum Command {
    /// Operate on the filesystem queue.
    #[structopt(name = "queue")]
    Queue(QueueCmd),
    /// Build and print a post proof payload from local fixture files.
    #[structopt(name = "build-post-proof")]
    BuildPostProof {
        /// The post's `at://` URI.
        at_uri: String,
        /// Path to a JSON file with `{"car": "<hex>", "did": {...}}`
        /// describing the post's CAR and the signer's DID document.
        fixture: PathBuf,
    },
    /// Build and print a DID-update proof payload from a local audit
    /// log fixture file.
    #[structopt(name = "build-did-proof")]
    BuildDidProof {
        /// The DID to build the proof for.
        did: String,
        /// Path to a JSON audit log (array of `{cid, operation,
        /// nullified, createdAt}` entries).
        fixture: PathBuf,
    },
}

/// Top-level CLI, parsed by `structopt` from `std::env::args`.
#[derive(StructOpt, Debug, Clone)]
#[structopt(name = "atgate-gateway")]
#[structopt(setting = AppSettings::ArgRequiredElseHelp)]
pub struct Opt {
    /// Path to a TOML configuration file.
    #[structopt(short = "c", long = "config")]
    pub config: Option<PathBuf>,
    /// Override the configured queue root directory.
    #[structopt(long = "queue-root")]
    pub queue_root: Option<PathBuf>,
    /// Override the configured PLC directory base URL.
    #[structopt(long = "plc-directory-base-url")]
    pub plc_directory_base_url: Option<String>,
    /// Override the configured bot configuration file path.
    #[structopt(long = "bot-config")]
    pub bot_config_path: Option<PathBuf>,
    /// Override the configured log level.
    #[structopt(long = "log-level")]
    pub log_level: Option<String>,

    #[structopt(subcommand)]
    pub cmd: Command,
}

impl Opt {
    /// The CLI-flag layer of [`crate::config::Config`] layering.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            queue_root: self.queue_root.clone(),
            plc_directory_base_url: self.plc_directory_base_url.clone(),
            bot_config_path: self.bot_config_path.clone(),
            log_level: self.log_level.clone(),
        }
    }
}
