// Copyright 2019-2020 PolkaX Authors. Licensed under GPL-3.0.

//! A minimal CARv1 reader.
//!
//! Every CID this system ever reads or writes has the one fixed shape
//! described in `atgate_cbor::cid` (CIDv1, dag-cbor, sha2-256, 36 bytes),
//! so block framing is read as `varint(len) ‖ cid[36] ‖ data` rather than
//! parsing the general multiformats CID varint.

use atgate_cbor::{IpldValue, MapKey};
use std::collections::BTreeMap;

use crate::error::CarError;

/// One CAR, decoded into its root CIDs and its blocks in file order.
pub struct CarFile {
    /// The CAR header's declared roots, as raw 36-byte CID wire forms.
    pub roots: Vec<[u8; 36]>,
    /// `(cid, block bytes)` in the order they appear in the file.
    pub blocks: Vec<([u8; 36], Vec<u8>)>,
}

impl CarFile {
    /// Find a block by its CID.
    pub fn get(&self, cid: &[u8; 36]) -> Option<&[u8]> {
        self.blocks
            .iter()
            .find(|(c, _)| c == cid)
            .map(|(_, data)| data.as_slice())
    }
}

/// Parse a CARv1 byte stream.
pub fn parse_car(bytes: &[u8]) -> Result<CarFile, CarError> {
    let mut pos = 0usize;
    let header_len = read_varint(bytes, &mut pos)? as usize;
    let header_bytes = slice(bytes, pos, header_len)?;
    pos += header_len;

    let header: IpldValue = atgate_cbor::decode(header_bytes)?;
    let roots = read_roots(&header)?;

    let mut blocks = Vec::new();
    while pos < bytes.len() {
        let entry_len = read_varint(bytes, &mut pos)? as usize;
        let entry = slice(bytes, pos, entry_len)?;
        pos += entry_len;

        if entry.len() < 36 {
            return Err(CarError::InvalidCar(
                "block entry shorter than a CID".to_owned(),
            ));
        }
        let mut cid = [0u8; 36];
        cid.copy_from_slice(&entry[..36]);
        blocks.push((cid, entry[36..].to_vec()));
    }

    Ok(CarFile { roots, blocks })
}

fn read_roots(header: &IpldValue) -> Result<Vec<[u8; 36]>, CarError> {
    let map = as_map(header)?;
    let roots = map
        .get("roots")
        .ok_or(CarError::MissingField("roots"))?;
    let list = match roots {
        IpldValue::List(list) => list,
        _ => return Err(CarError::InvalidCar("roots is not a list".to_owned())),
    };
    list.iter()
        .map(|root| match root {
            IpldValue::Link(cid) => {
                let bytes = cid.to_bytes();
                if bytes.len() != 36 {
                    return Err(CarError::InvalidCar("root CID has unexpected length".to_owned()));
                }
                let mut out = [0u8; 36];
                out.copy_from_slice(&bytes);
                Ok(out)
            }
            _ => Err(CarError::InvalidCar("root is not a CID".to_owned())),
        })
        .collect()
}

pub(crate) fn as_map(value: &IpldValue) -> Result<&BTreeMap<MapKey, IpldValue>, CarError> {
    match value {
        IpldValue::Map(map) => Ok(map),
        _ => Err(CarError::InvalidCar("expected a CBOR map".to_owned())),
    }
}

fn slice(bytes: &[u8], pos: usize, len: usize) -> Result<&[u8], CarError> {
    let end = pos.checked_add(len).ok_or(CarError::Truncated)?;
    bytes.get(pos..end).ok_or(CarError::Truncated)
}

fn read_varint(buf: &[u8], pos: &mut usize) -> Result<u64, CarError> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    loop {
        let byte = *buf.get(*pos).ok_or(CarError::Truncated)?;
        *pos += 1;
        result |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift >= 64 {
            return Err(CarError::InvalidCar("varint too long".to_owned()));
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varint(mut n: u64) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let mut byte = (n & 0x7f) as u8;
            n >>= 7;
            if n != 0 {
                byte |= 0x80;
            }
            out.push(byte);
            if n == 0 {
                break;
            }
        }
        out
    }

    #[test]
    fn parses_header_and_one_block() {
        let mut root_map = BTreeMap::new();
        root_map.insert(
            MapKey::from("text"),
            IpldValue::String("@bot hi".to_owned()),
        );
        let block = IpldValue::Map(root_map);
        let block_bytes = atgate_cbor::encode(&block).unwrap();
        let cid = atgate_cbor::cid_of(&block_bytes);
        let cid_bytes = cid.to_bytes();

        let mut header_map = BTreeMap::new();
        header_map.insert(
            MapKey::from("version"),
            IpldValue::Integer(1.into()),
        );
        header_map.insert(MapKey::from("roots"), IpldValue::List(vec![IpldValue::Link(cid)]));
        let header_bytes = atgate_cbor::encode(&IpldValue::Map(header_map)).unwrap();

        let mut car = Vec::new();
        car.extend(varint(header_bytes.len() as u64));
        car.extend(&header_bytes);

        let mut entry = cid_bytes.clone();
        entry.extend(&block_bytes);
        car.extend(varint(entry.len() as u64));
        car.extend(&entry);

        let parsed = parse_car(&car).unwrap();
        assert_eq!(parsed.roots.len(), 1);
        assert_eq!(parsed.blocks.len(), 1);
        assert_eq!(parsed.blocks[0].1, block_bytes);
    }

    #[test]
    fn truncated_header_fails() {
        let err = parse_car(&[5, 1, 2]).unwrap_err();
        assert!(matches!(err, CarError::Truncated));
    }
}
