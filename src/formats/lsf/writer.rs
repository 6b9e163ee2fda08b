//! LSF resource writing
//!
//! The writer reproduces LSLib's layout decisions so a
//! read-then-write cycle is a fixpoint: depth-first flattening, bucketed
//! string interning in visit order, LZ4 block compression for every
//! section, and zero-sized empty sections.
//!
//! SPDX-FileCopyrightText: 2026 lsforge, 2015 Norbyte (`LSLib`, MIT)
//!
//! SPDX-License-Identifier: MIT

#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use super::string_table::StringTableBuilder;
use super::values::encode_value;
use super::{LSF_VERSION_BG3, LSF_VERSION_BG3_KEYS, LSF_VERSION_DOS2};
use crate::error::{Error, Result};
use crate::tree::{Node, Version};
use byteorder::{LittleEndian, WriteBytesExt};
use std::path::Path;

/// Compression flags LSLib writes: LZ4, default level.
const WRITE_COMPRESSION_FLAGS: u8 = 0x22;

/// Options for [`serialize_lsf`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LsfWriteOptions {
    /// Container version; defaults to 6 for BG3 engines and 3 for DOS2.
    pub lsf_version: Option<u32>,
    /// Node/attribute table format; defaults to 1 (V3) for BG3 and 0 (V2)
    /// for DOS2.
    pub metadata_format: Option<u32>,
}

/// Write a tree to disk as an LSF resource.
///
/// # Errors
/// Returns an error if serialization or file writing fails.
pub fn write_lsf<P: AsRef<Path>>(
    path: P,
    root: &Node,
    version: Version,
    options: &LsfWriteOptions,
) -> Result<()> {
    let bytes = serialize_lsf(root, version, options)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Serialize a tree to LSF bytes.
///
/// # Errors
/// Returns an error if an attribute value does not match its type tag or
/// the requested version is outside the handled set.
pub fn serialize_lsf(root: &Node, version: Version, options: &LsfWriteOptions) -> Result<Vec<u8>> {
    let lsf_version = options.lsf_version.unwrap_or(if version.is_bg3() {
        LSF_VERSION_BG3_KEYS
    } else {
        LSF_VERSION_DOS2
    });
    if ![LSF_VERSION_DOS2, LSF_VERSION_BG3, LSF_VERSION_BG3_KEYS].contains(&lsf_version) {
        return Err(Error::UnsupportedVersion {
            version: lsf_version,
        });
    }

    let metadata_format = options
        .metadata_format
        .unwrap_or(u32::from(version.is_bg3()));
    if metadata_format > 1 {
        return Err(Error::Format(format!(
            "unknown metadata format {metadata_format}"
        )));
    }
    let extended = metadata_format == 1;

    let mut flattener = Flattener::new(lsf_version);
    // A virtual `save` root only groups regions; anything else is itself
    // the sole region.
    if root.name == "save" && root.attributes.is_empty() {
        for region in &root.children {
            flattener.flatten(region, -1)?;
        }
    } else {
        flattener.flatten(root, -1)?;
    }
    flattener.link_siblings();

    let strings_data = flattener.strings.to_bytes();
    let nodes_data = flattener.serialize_nodes(extended);
    let attributes_data = flattener.serialize_attributes(extended);
    let keys_data = flattener.serialize_keys();
    let values_data = flattener.values;

    let mut output = Vec::new();
    output.extend_from_slice(b"LSOF");
    output.write_u32::<LittleEndian>(lsf_version)?;
    if lsf_version >= LSF_VERSION_BG3 {
        output.write_u64::<LittleEndian>(version.to_packed_u64())?;
    } else {
        output.write_u32::<LittleEndian>(version.to_packed_u32())?;
    }

    let strings = CompressedBlock::build(&strings_data);
    let keys = CompressedBlock::build(&keys_data);
    let nodes = CompressedBlock::build(&nodes_data);
    let attributes = CompressedBlock::build(&attributes_data);
    let values = CompressedBlock::build(&values_data);

    strings.write_sizes(&mut output)?;
    if lsf_version >= LSF_VERSION_BG3_KEYS {
        keys.write_sizes(&mut output)?;
    }
    nodes.write_sizes(&mut output)?;
    attributes.write_sizes(&mut output)?;
    values.write_sizes(&mut output)?;

    if lsf_version >= LSF_VERSION_BG3_KEYS {
        output.write_u8(WRITE_COMPRESSION_FLAGS)?;
        output.extend_from_slice(&[0u8; 3]);
        output.write_u32::<LittleEndian>(metadata_format)?;
    } else {
        output.write_u32::<LittleEndian>(u32::from(WRITE_COMPRESSION_FLAGS))?;
        output.write_u8(0)?;
        output.write_u16::<LittleEndian>(0)?;
        output.write_u8(metadata_format as u8)?;
    }

    // Block order on disk: strings, nodes, [keys], attributes, values.
    output.extend_from_slice(&strings.compressed);
    output.extend_from_slice(&nodes.compressed);
    if lsf_version >= LSF_VERSION_BG3_KEYS {
        output.extend_from_slice(&keys.compressed);
    }
    output.extend_from_slice(&attributes.compressed);
    output.extend_from_slice(&values.compressed);

    Ok(output)
}

struct CompressedBlock {
    uncompressed_size: usize,
    compressed: Vec<u8>,
}

impl CompressedBlock {
    /// Empty sections stay zero-sized on disk.
    fn build(data: &[u8]) -> Self {
        if data.is_empty() {
            return CompressedBlock {
                uncompressed_size: 0,
                compressed: Vec::new(),
            };
        }
        CompressedBlock {
            uncompressed_size: data.len(),
            compressed: lz4_flex::block::compress(data),
        }
    }

    fn write_sizes(&self, output: &mut Vec<u8>) -> Result<()> {
        output.write_u32::<LittleEndian>(self.uncompressed_size as u32)?;
        output.write_u32::<LittleEndian>(self.compressed.len() as u32)?;
        Ok(())
    }
}

struct FlatNode {
    name_ref: u32,
    parent_index: i32,
    next_sibling_index: i32,
    first_attribute_index: i32,
}

struct FlatAttribute {
    name_ref: u32,
    type_and_length: u32,
    next_index: i32,
    node_index: i32,
    offset: u32,
}

struct Flattener {
    lsf_version: u32,
    strings: StringTableBuilder,
    nodes: Vec<FlatNode>,
    attributes: Vec<FlatAttribute>,
    keys: Vec<(u32, u32)>,
    values: Vec<u8>,
}

impl Flattener {
    fn new(lsf_version: u32) -> Self {
        Flattener {
            lsf_version,
            strings: StringTableBuilder::new(),
            nodes: Vec::new(),
            attributes: Vec::new(),
            keys: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Depth-first preorder flattening. Strings intern in visit order:
    /// node name, then attribute names, then the key, then children.
    fn flatten(&mut self, node: &Node, parent_index: i32) -> Result<usize> {
        let node_index = self.nodes.len();
        let name_ref = self.strings.intern(&node.name);
        self.nodes.push(FlatNode {
            name_ref,
            parent_index,
            next_sibling_index: -1,
            first_attribute_index: -1,
        });

        let mut first_attribute_index = -1;
        for (name, attribute) in &node.attributes {
            let attribute_index = self.attributes.len() as i32;
            if first_attribute_index < 0 {
                first_attribute_index = attribute_index;
            }
            let name_ref = self.strings.intern(name);
            let offset = self.values.len() as u32;
            let length =
                encode_value(&mut self.values, attribute.ty, &attribute.value, self.lsf_version)?;
            self.attributes.push(FlatAttribute {
                name_ref,
                type_and_length: attribute.ty.id() | ((length as u32) << 6),
                next_index: -1,
                node_index: node_index as i32,
                offset,
            });
            if attribute_index > 0
                && self.attributes[attribute_index as usize - 1].node_index == node_index as i32
            {
                self.attributes[attribute_index as usize - 1].next_index = attribute_index;
            }
        }
        self.nodes[node_index].first_attribute_index = first_attribute_index;

        if self.lsf_version >= LSF_VERSION_BG3_KEYS
            && let Some(key) = &node.key
        {
            let key_ref = self.strings.intern(key);
            self.keys.push((node_index as u32, key_ref));
        }

        for child in &node.children {
            self.flatten(child, node_index as i32)?;
        }

        Ok(node_index)
    }

    /// Fill in V3 sibling links from parent/child order.
    fn link_siblings(&mut self) {
        let mut last_child_of: std::collections::HashMap<i32, usize> =
            std::collections::HashMap::new();
        for index in 0..self.nodes.len() {
            let parent = self.nodes[index].parent_index;
            if let Some(&previous) = last_child_of.get(&parent) {
                self.nodes[previous].next_sibling_index = index as i32;
            }
            last_child_of.insert(parent, index);
        }
    }

    fn serialize_nodes(&self, extended: bool) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.nodes.len() * if extended { 16 } else { 12 });
        for node in &self.nodes {
            buffer.extend_from_slice(&node.name_ref.to_le_bytes());
            if extended {
                buffer.extend_from_slice(&node.parent_index.to_le_bytes());
                buffer.extend_from_slice(&node.next_sibling_index.to_le_bytes());
                buffer.extend_from_slice(&node.first_attribute_index.to_le_bytes());
            } else {
                buffer.extend_from_slice(&node.first_attribute_index.to_le_bytes());
                buffer.extend_from_slice(&node.parent_index.to_le_bytes());
            }
        }
        buffer
    }

    fn serialize_attributes(&self, extended: bool) -> Vec<u8> {
        let mut buffer =
            Vec::with_capacity(self.attributes.len() * if extended { 16 } else { 12 });
        for attribute in &self.attributes {
            buffer.extend_from_slice(&attribute.name_ref.to_le_bytes());
            buffer.extend_from_slice(&attribute.type_and_length.to_le_bytes());
            if extended {
                buffer.extend_from_slice(&attribute.next_index.to_le_bytes());
                buffer.extend_from_slice(&attribute.offset.to_le_bytes());
            } else {
                buffer.extend_from_slice(&attribute.node_index.to_le_bytes());
            }
        }
        buffer
    }

    fn serialize_keys(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.keys.len() * 8);
        for (node_index, name_ref) in &self.keys {
            buffer.extend_from_slice(&node_index.to_le_bytes());
            buffer.extend_from_slice(&name_ref.to_le_bytes());
        }
        buffer
    }
}
