//! Bucketed name table for LSF resources
//!
//! SPDX-FileCopyrightText: 2026 lsforge, 2015 Norbyte (`LSLib`, MIT)
//!
//! SPDX-License-Identifier: MIT

use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::HashMap;
use std::io::{Cursor, Read};

/// Bucket count LSLib always writes.
pub(crate) const NUM_BUCKETS: usize = 512;

/// 32-bit wrapping hash over UTF-16 code units, matching LSLib's
/// overflow semantics. 64-bit arithmetic here would shift bucket
/// assignments and break byte-identical output.
pub(crate) fn name_hash(s: &str) -> u32 {
    let mut hash = 0u32;
    for unit in s.encode_utf16() {
        hash = (hash << 5).wrapping_sub(hash).wrapping_add(u32::from(unit));
    }
    hash
}

/// Fold a hash into one of the 512 buckets.
pub(crate) fn bucket_index(hash: u32) -> usize {
    ((hash ^ (hash >> 9) ^ (hash >> 18) ^ (hash >> 27)) & 0x1FF) as usize
}

/// Write-side interning table.
///
/// Strings land in the bucket chosen by [`bucket_index`], in first-seen
/// order within their chain. A reference packs as `(bucket << 16) | index`.
#[derive(Debug)]
pub(crate) struct StringTableBuilder {
    buckets: Vec<Vec<String>>,
    refs: HashMap<String, u32>,
}

impl StringTableBuilder {
    pub(crate) fn new() -> Self {
        StringTableBuilder {
            buckets: vec![Vec::new(); NUM_BUCKETS],
            refs: HashMap::new(),
        }
    }

    /// Intern a string, returning its packed reference.
    pub(crate) fn intern(&mut self, s: &str) -> u32 {
        if let Some(&packed) = self.refs.get(s) {
            return packed;
        }
        let bucket = bucket_index(name_hash(s));
        let chain = &mut self.buckets[bucket];
        let packed = ((bucket as u32) << 16) | (chain.len() as u32);
        chain.push(s.to_string());
        self.refs.insert(s.to_string(), packed);
        packed
    }

    /// Serialize as `u32 numBuckets`, then per bucket a `u16` chain length
    /// and `{u16 length, bytes}` entries.
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        buffer
            .write_u32::<LittleEndian>(NUM_BUCKETS as u32)
            .expect("vec write");
        for chain in &self.buckets {
            buffer
                .write_u16::<LittleEndian>(chain.len() as u16)
                .expect("vec write");
            for name in chain {
                buffer
                    .write_u16::<LittleEndian>(name.len() as u16)
                    .expect("vec write");
                buffer.extend_from_slice(name.as_bytes());
            }
        }
        buffer
    }
}

/// Read-side name table.
#[derive(Debug)]
pub(crate) struct NameTable {
    buckets: Vec<Vec<String>>,
}

impl NameTable {
    /// Parse the decompressed strings block. Readers accept whatever bucket
    /// count the file declares.
    pub(crate) fn parse(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(NameTable {
                buckets: Vec::new(),
            });
        }

        let mut cursor = Cursor::new(data);
        let num_buckets = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::CorruptBlock("strings block truncated".into()))?
            as usize;
        if num_buckets > data.len() {
            return Err(Error::CorruptBlock(format!(
                "implausible bucket count {num_buckets}"
            )));
        }

        let mut buckets = Vec::with_capacity(num_buckets);
        for _ in 0..num_buckets {
            let chain_len = cursor
                .read_u16::<LittleEndian>()
                .map_err(|_| Error::CorruptBlock("strings block truncated".into()))?
                as usize;
            let mut chain = Vec::with_capacity(chain_len);
            for _ in 0..chain_len {
                let len = cursor
                    .read_u16::<LittleEndian>()
                    .map_err(|_| Error::CorruptBlock("strings block truncated".into()))?
                    as usize;
                let mut bytes = vec![0u8; len];
                cursor
                    .read_exact(&mut bytes)
                    .map_err(|_| Error::CorruptBlock("strings block truncated".into()))?;
                chain.push(String::from_utf8_lossy(&bytes).into_owned());
            }
            buckets.push(chain);
        }

        Ok(NameTable { buckets })
    }

    /// Resolve a packed `(bucket << 16) | index` reference.
    pub(crate) fn resolve(&self, packed: u32) -> Result<&str> {
        let bucket = (packed >> 16) as usize;
        let index = (packed & 0xFFFF) as usize;
        self.buckets
            .get(bucket)
            .and_then(|chain| chain.get(index))
            .map(String::as_str)
            .ok_or_else(|| {
                Error::CorruptBlock(format!("unresolved name reference {bucket}:{index}"))
            })
    }
}
