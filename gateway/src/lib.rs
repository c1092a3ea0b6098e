// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! The CLI entry point and surrounding ambient stack (configuration,
//! logging, the filesystem queue sweep loop, and collaborator trait
//! wiring) around the post-proof and DID-update-proof builders.

#![deny(missing_docs)]

/// The bot handle → behavior mapping.
pub mod bot_config;
/// `structopt` CLI surface.
pub mod cli;
/// Trait boundaries for the external systems this crate does not implement.
pub mod collaborators;
/// Layered configuration (defaults, TOML file, env, CLI flags).
pub mod config;
mod error;
/// The queue sweep loop driving the builders against collaborators.
pub mod pipeline;

pub use self::error::GatewayError;

use std::path::Path;

use log::info;
use structopt::StructOpt;

use crate::bot_config::BotConfig;
use crate::cli::{Command, Opt, QueueCmd};
use crate::collaborators::Unimplemented;
use crate::config::Config;

/// Parse `std::env::args`, initialize logging, and dispatch to the
/// requested subcommand.
pub fn run() -> Result<(), GatewayError> {
    let opt = Opt::from_args();
    let config = Config::load(opt.config.as_deref(), &opt.overrides())?;
    init_logging(&config.log_level);
    dispatch(&opt.cmd, &config)
}

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn dispatch(cmd: &Command, config: &Config) -> Result<(), GatewayError> {
    match cmd {
        Command::Queue(QueueCmd::Sweep { kind }) => {
            let queue = atgate_queue::Queue::open(&config.queue_root)?;
            let bot_config = BotConfig::load(&config.bot_config_path)?;
            let collaborators = Unimplemented;
            match (*kind).into() {
                pipeline::SweepKind::Post => {
                    let n = pipeline::sweep_payload(
                        &queue,
                        pipeline::SweepKind::Post,
                        &collaborators,
                        &collaborators,
                        &collaborators,
                        &bot_config,
                    )?;
                    info!("post payload sweep processed {} item(s)", n);
                }
                pipeline::SweepKind::DidUpdate => {
                    let n = pipeline::sweep_payload(
                        &queue,
                        pipeline::SweepKind::DidUpdate,
                        &collaborators,
                        &collaborators,
                        &collaborators,
                        &bot_config,
                    )?;
                    info!("DID update payload sweep processed {} item(s)", n);
                }
            }
            Ok(())
        }
        Command::Queue(QueueCmd::Status) => {
            let queue = atgate_queue::Queue::open(&config.queue_root)?;
            for (status, count) in queue.counts()? {
                println!("{:<15} {}", status.as_str(), count);
            }
            Ok(())
        }
        Command::BuildPostProof { at_uri, fixture } => {
            let payload = build_post_proof_from_fixture(at_uri, fixture)?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
        Command::BuildDidProof { did, fixture } => {
            let payload = build_did_proof_from_fixture(did, fixture)?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
            Ok(())
        }
    }
}

/// A local fixture for `build-post-proof`: the post's CAR and the
/// signer's candidate public keys, with no network access.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostProofFixture {
    car: String,
    did: String,
    rkey: String,
    verification_keys: Vec<String>,
    #[serde(default)]
    reply_parent_car: Option<String>,
}

fn build_post_proof_from_fixture(
    at_uri: &str,
    fixture_path: &Path,
) -> Result<serde_json::Value, GatewayError> {
    let text = std::fs::read_to_string(fixture_path)?;
    let fixture: PostProofFixture = serde_json::from_str(&text)?;

    let car_bytes = hex::decode(strip_hex_prefix(&fixture.car))
        .map_err(|e| GatewayError::Config(format!("invalid car hex: {}", e)))?;
    let car = atgate_car::parse_car(&car_bytes)?;

    let candidate_pubkeys: Vec<[u8; 33]> = fixture
        .verification_keys
        .iter()
        .map(|hex_key| decode_compressed_pubkey(hex_key))
        .collect::<Result<_, _>>()?;

    let reply_parent = fixture
        .reply_parent_car
        .as_deref()
        .map(|hex_bytes| -> Result<_, GatewayError> {
            let bytes = hex::decode(strip_hex_prefix(hex_bytes))
                .map_err(|e| GatewayError::Config(format!("invalid reply car hex: {}", e)))?;
            Ok(atgate_car::parse_car(&bytes)?)
        })
        .transpose()?;

    let payload = atgate_car::build_post_proof(
        &car,
        at_uri,
        &fixture.did,
        &fixture.rkey,
        &candidate_pubkeys,
        reply_parent.as_ref(),
    )?;
    Ok(serde_json::to_value(payload)?)
}

fn build_did_proof_from_fixture(
    did: &str,
    fixture_path: &Path,
) -> Result<serde_json::Value, GatewayError> {
    let text = std::fs::read_to_string(fixture_path)?;
    let log: Vec<atgate_plc::AuditLogEntry> = serde_json::from_str(&text)?;
    let payload = atgate_plc::build_did_update_proof(did, &log)?;
    Ok(serde_json::to_value(payload)?)
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x").unwrap_or(s)
}

fn decode_compressed_pubkey(hex_key: &str) -> Result<[u8; 33], GatewayError> {
    let bytes = hex::decode(strip_hex_prefix(hex_key))
        .map_err(|e| GatewayError::Config(format!("invalid pubkey hex: {}", e)))?;
    if bytes.len() != 33 {
        return Err(GatewayError::Config(format!(
            "expected a 33-byte compressed public key, got {}",
            bytes.len()
        )));
    }
    let mut out = [0u8; 33];
    out.copy_from_slice(&bytes);
    Ok(out)
}
