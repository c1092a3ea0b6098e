// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! CARv1 parsing and the post-inclusion proof builder.
//!
//! Given a single post's CAR, this walks its DAG-CBOR blocks to assemble
//! the Merkle-path proof and signature the on-chain verifier needs, per
//! the block classification rules in the module-level algorithm (see
//! [`payload::build_post_proof`]).

#![deny(missing_docs)]

mod error;
mod payload;
mod reader;

pub use self::error::CarError;
pub use self::payload::{build_post_proof, reply_parent_at_uri, PostProofPayload};
pub use self::reader::{parse_car, CarFile};
