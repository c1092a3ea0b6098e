// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

use crate::cid::{cid_of, Cid};

/// A DAG-CBOR block: a CID and the canonical bytes that hash to it.
///
/// +-----+--------------------------------+
/// | CID | Data                           |
/// +-----+--------------------------------+
///
/// See [Concept: Block](https://github.com/ipld/specs/blob/master/block-layer/block.md) for details.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct IpldBlock {
    cid: Cid,
    data: Vec<u8>,
}

impl IpldBlock {
    /// Wrap already-canonical DAG-CBOR bytes as a block, computing its CID.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let cid = cid_of(&data);
        Self { cid, data }
    }

    /// Encode `entity` to canonical DAG-CBOR and wrap it as a block.
    pub fn new<T: minicbor::Encode>(entity: &T) -> crate::error::Result<Self> {
        let data = crate::encode(entity)?;
        Ok(Self::from_bytes(data))
    }

    /// Return the CID of the block.
    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    /// Return the binary data value of the block.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl std::fmt::Display for IpldBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Block {}]", self.cid)
    }
}
