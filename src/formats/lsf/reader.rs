//! LSF resource reading
//!
//! SPDX-FileCopyrightText: 2026 lsforge, 2015 Norbyte (`LSLib`, MIT)
//!
//! SPDX-License-Identifier: MIT

// Binary format parsing requires many intentional casts between integer types
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]

use super::string_table::NameTable;
use super::values::decode_value;
use super::{LSF_VERSION_BG3, LSF_VERSION_BG3_KEYS, LSF_VERSION_DOS2, LsfDocument};
use crate::compression::{self, CompressionMethod};
use crate::error::{Error, Result};
use crate::tree::{Node, Version};
use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::HashSet;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

/// Deepest node nesting the reconstruction will follow.
const MAX_TREE_DEPTH: usize = 512;

/// Read an LSF resource from disk.
///
/// # Errors
/// Returns an error if the file cannot be read or has an invalid format.
pub fn read_lsf<P: AsRef<Path>>(path: P) -> Result<LsfDocument> {
    let mut file = File::open(path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    parse_lsf_bytes(&buffer)
}

/// Parse an LSF resource from bytes.
///
/// # Errors
/// Returns an error if the data has an invalid LSF format.
pub fn parse_lsf_bytes(data: &[u8]) -> Result<LsfDocument> {
    let mut cursor = Cursor::new(data);

    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic)?;
    if &magic != b"LSOF" {
        return Err(Error::Format(format!(
            "invalid LSF magic: expected LSOF, found {magic:?}"
        )));
    }

    let lsf_version = cursor.read_u32::<LittleEndian>()?;
    if ![LSF_VERSION_DOS2, LSF_VERSION_BG3, LSF_VERSION_BG3_KEYS].contains(&lsf_version) {
        return Err(Error::UnsupportedVersion {
            version: lsf_version,
        });
    }

    let version = if lsf_version >= LSF_VERSION_BG3 {
        Version::from_packed_u64(cursor.read_u64::<LittleEndian>()?)
    } else {
        Version::from_packed_u32(cursor.read_u32::<LittleEndian>()?)
    };

    // Metadata block: {uncompressed, compressed} size pairs, compression
    // flags, metadata format. v6 adds the keys pair and widens the layout.
    let strings_sizes = read_size_pair(&mut cursor)?;
    let keys_sizes = if lsf_version >= LSF_VERSION_BG3_KEYS {
        read_size_pair(&mut cursor)?
    } else {
        (0, 0)
    };
    let nodes_sizes = read_size_pair(&mut cursor)?;
    let attributes_sizes = read_size_pair(&mut cursor)?;
    let values_sizes = read_size_pair(&mut cursor)?;

    let (compression_flags, metadata_format) = if lsf_version >= LSF_VERSION_BG3_KEYS {
        let flags = cursor.read_u8()?;
        let mut reserved = [0u8; 3];
        cursor.read_exact(&mut reserved)?;
        (flags, cursor.read_u32::<LittleEndian>()?)
    } else {
        let flags = cursor.read_u32::<LittleEndian>()? as u8;
        cursor.read_u8()?;
        cursor.read_u16::<LittleEndian>()?;
        (flags, u32::from(cursor.read_u8()?))
    };

    if metadata_format > 1 {
        return Err(Error::Format(format!(
            "unknown metadata format {metadata_format}"
        )));
    }
    let extended = metadata_format == 1;

    // Blocks in file order: strings, nodes, [keys], attributes, values.
    let strings_data = read_block(&mut cursor, strings_sizes, compression_flags, false)?;
    let nodes_data = read_block(&mut cursor, nodes_sizes, compression_flags, false)?;
    let keys_data = if lsf_version >= LSF_VERSION_BG3_KEYS {
        read_block(&mut cursor, keys_sizes, compression_flags, false)?
    } else {
        Vec::new()
    };
    let attributes_data = read_block(&mut cursor, attributes_sizes, compression_flags, false)?;
    let values_data = read_block(&mut cursor, values_sizes, compression_flags, true)?;

    let names = NameTable::parse(&strings_data)?;
    let nodes = parse_nodes(&nodes_data, extended)?;
    let attributes = parse_attributes(&attributes_data, extended)?;
    let keys = parse_keys(&keys_data, &names, nodes.len())?;

    let root = reconstruct_tree(
        &nodes,
        &attributes,
        &keys,
        &names,
        &values_data,
        lsf_version,
    )?;

    Ok(LsfDocument {
        root,
        version,
        lsf_version,
        metadata_format,
    })
}

fn read_size_pair(cursor: &mut Cursor<&[u8]>) -> Result<(usize, usize)> {
    let uncompressed = cursor.read_u32::<LittleEndian>()? as usize;
    let compressed = cursor.read_u32::<LittleEndian>()? as usize;
    Ok((uncompressed, compressed))
}

fn read_block(
    cursor: &mut Cursor<&[u8]>,
    (uncompressed, compressed): (usize, usize),
    compression_flags: u8,
    is_value_block: bool,
) -> Result<Vec<u8>> {
    if uncompressed == 0 && compressed == 0 {
        return Ok(Vec::new());
    }

    let method = CompressionMethod::from_flags(compression_flags)?;
    // compressedSize == 0 with a nonzero uncompressedSize means stored raw,
    // as does an uncompressed resource.
    let stored_raw = method == CompressionMethod::None || compressed == 0;
    let read_size = if stored_raw { uncompressed } else { compressed };

    let remaining = cursor.get_ref().len() as u64 - cursor.position();
    if read_size as u64 > remaining {
        return Err(Error::CorruptHeader(format!(
            "declared block size {read_size} exceeds remaining {remaining} bytes"
        )));
    }

    let mut buffer = vec![0u8; read_size];
    cursor.read_exact(&mut buffer)?;

    if stored_raw {
        return Ok(buffer);
    }

    let result = if is_value_block {
        compression::decompress_value_block(&buffer, uncompressed, compression_flags)
    } else {
        compression::decompress(&buffer, uncompressed, compression_flags)
    };
    result.map_err(|e| Error::CorruptBlock(e.to_string()))
}

/// Flattened node table entry.
#[derive(Debug, Clone)]
struct NodeEntry {
    name_ref: u32,
    parent_index: i32,
    first_attribute_index: i32,
}

/// Flattened attribute table entry with its resolved value offset.
#[derive(Debug, Clone)]
struct AttributeEntry {
    name_ref: u32,
    type_and_length: u32,
    next_index: i32,
    offset: usize,
}

fn parse_nodes(data: &[u8], extended: bool) -> Result<Vec<NodeEntry>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let entry_size = if extended { 16 } else { 12 };
    if data.len() % entry_size != 0 {
        return Err(Error::CorruptBlock(format!(
            "node table of {} bytes is not a multiple of {entry_size}",
            data.len()
        )));
    }

    let mut cursor = Cursor::new(data);
    let mut nodes = Vec::with_capacity(data.len() / entry_size);

    for _ in 0..data.len() / entry_size {
        let name_ref = cursor.read_u32::<LittleEndian>()?;
        let entry = if extended {
            let parent_index = cursor.read_i32::<LittleEndian>()?;
            let _next_sibling_index = cursor.read_i32::<LittleEndian>()?;
            let first_attribute_index = cursor.read_i32::<LittleEndian>()?;
            NodeEntry {
                name_ref,
                parent_index,
                first_attribute_index,
            }
        } else {
            let first_attribute_index = cursor.read_i32::<LittleEndian>()?;
            let parent_index = cursor.read_i32::<LittleEndian>()?;
            NodeEntry {
                name_ref,
                parent_index,
                first_attribute_index,
            }
        };
        nodes.push(entry);
    }

    Ok(nodes)
}

fn parse_attributes(data: &[u8], extended: bool) -> Result<Vec<AttributeEntry>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let entry_size = if extended { 16 } else { 12 };
    if data.len() % entry_size != 0 {
        return Err(Error::CorruptBlock(format!(
            "attribute table of {} bytes is not a multiple of {entry_size}",
            data.len()
        )));
    }

    let mut cursor = Cursor::new(data);
    let count = data.len() / entry_size;
    let mut attributes = Vec::with_capacity(count);

    if extended {
        for _ in 0..count {
            let name_ref = cursor.read_u32::<LittleEndian>()?;
            let type_and_length = cursor.read_u32::<LittleEndian>()?;
            let next_index = cursor.read_i32::<LittleEndian>()?;
            let offset = cursor.read_u32::<LittleEndian>()? as usize;
            attributes.push(AttributeEntry {
                name_ref,
                type_and_length,
                next_index,
                offset,
            });
        }
        return Ok(attributes);
    }

    // V2 entries carry the owning node instead of chain links; attributes
    // appear in declaration order and value offsets accumulate.
    let mut owners = Vec::with_capacity(count);
    let mut running_offset = 0usize;
    for _ in 0..count {
        let name_ref = cursor.read_u32::<LittleEndian>()?;
        let type_and_length = cursor.read_u32::<LittleEndian>()?;
        let node_index = cursor.read_i32::<LittleEndian>()?;
        owners.push(node_index);
        attributes.push(AttributeEntry {
            name_ref,
            type_and_length,
            next_index: -1,
            offset: running_offset,
        });
        running_offset += (type_and_length >> 6) as usize;
    }

    // Rebuild per-node chains from the stream order.
    let mut last_of_node: std::collections::HashMap<i32, usize> =
        std::collections::HashMap::new();
    for index in 0..count {
        if let Some(&previous) = last_of_node.get(&owners[index]) {
            attributes[previous].next_index = index as i32;
        }
        last_of_node.insert(owners[index], index);
    }

    Ok(attributes)
}

fn parse_keys(
    data: &[u8],
    names: &NameTable,
    node_count: usize,
) -> Result<Vec<Option<String>>> {
    let mut keys = vec![None; node_count];
    if data.is_empty() {
        return Ok(keys);
    }

    // 8 bytes per entry: node index, packed name reference.
    let mut cursor = Cursor::new(data);
    while (cursor.position() as usize) + 8 <= data.len() {
        let node_index = cursor.read_u32::<LittleEndian>()? as usize;
        let name_ref = cursor.read_u32::<LittleEndian>()?;
        if node_index < keys.len() {
            keys[node_index] = Some(names.resolve(name_ref)?.to_string());
        }
    }

    Ok(keys)
}

fn reconstruct_tree(
    nodes: &[NodeEntry],
    attributes: &[AttributeEntry],
    keys: &[Option<String>],
    names: &NameTable,
    values: &[u8],
    lsf_version: u32,
) -> Result<Node> {
    let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut roots = Vec::new();
    for (index, entry) in nodes.iter().enumerate() {
        if entry.parent_index < 0 {
            roots.push(index);
        } else {
            let parent = entry.parent_index as usize;
            if parent >= nodes.len() {
                return Err(Error::CorruptBlock(format!(
                    "node {index} has out-of-range parent {parent}"
                )));
            }
            children_of[parent].push(index);
        }
    }

    let mut visited_attributes = HashSet::new();
    let mut build = |index: usize| {
        build_node(
            index,
            nodes,
            attributes,
            keys,
            names,
            values,
            &children_of,
            &mut visited_attributes,
            lsf_version,
            0,
        )
    };

    if roots.len() == 1 {
        build(roots[0])
    } else {
        let mut save = Node::new("save");
        for root in roots {
            let region = build(root)?;
            save.add_child(region);
        }
        Ok(save)
    }
}

#[allow(clippy::too_many_arguments)]
fn build_node(
    index: usize,
    nodes: &[NodeEntry],
    attributes: &[AttributeEntry],
    keys: &[Option<String>],
    names: &NameTable,
    values: &[u8],
    children_of: &[Vec<usize>],
    visited_attributes: &mut HashSet<usize>,
    lsf_version: u32,
    depth: usize,
) -> Result<Node> {
    if depth > MAX_TREE_DEPTH {
        return Err(Error::CorruptBlock("node nesting too deep".into()));
    }

    let entry = &nodes[index];
    let mut node = Node::new(names.resolve(entry.name_ref)?);
    node.key = keys.get(index).cloned().flatten();

    // Attribute chains can loop in malformed files; the visited set caps
    // the walk at one visit per attribute.
    let mut attribute_index = entry.first_attribute_index;
    while attribute_index >= 0 {
        let current = attribute_index as usize;
        if current >= attributes.len() || !visited_attributes.insert(current) {
            break;
        }
        let attribute = &attributes[current];
        let ty_id = attribute.type_and_length & 0x3F;
        let length = (attribute.type_and_length >> 6) as usize;
        let Some(ty) = crate::tree::AttributeType::from_id(ty_id) else {
            return Err(Error::CorruptBlock(format!("unknown attribute type {ty_id}")));
        };
        let value = decode_value(values, attribute.offset, length, ty, lsf_version)?;
        node.set_attribute(names.resolve(attribute.name_ref)?, ty, value);
        attribute_index = attribute.next_index;
    }

    for &child in &children_of[index] {
        let child_node = build_node(
            child,
            nodes,
            attributes,
            keys,
            names,
            values,
            children_of,
            visited_attributes,
            lsf_version,
            depth + 1,
        )?;
        node.add_child(child_node);
    }

    Ok(node)
}
