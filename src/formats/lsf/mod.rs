//! LSF ("LSOF") binary resource codec
//!
//! SPDX-FileCopyrightText: 2026 lsforge, 2015 Norbyte (`LSLib`, MIT)
//!
//! SPDX-License-Identifier: MIT

mod reader;
mod string_table;
mod values;
mod writer;

pub use reader::{parse_lsf_bytes, read_lsf};
pub use writer::{LsfWriteOptions, serialize_lsf, write_lsf};

use crate::tree::{Node, Version};

/// LSF container version written by DOS2.
pub const LSF_VERSION_DOS2: u32 = 3;
/// LSF container version written by early BG3.
pub const LSF_VERSION_BG3: u32 = 5;
/// LSF container version with the node keys section.
pub const LSF_VERSION_BG3_KEYS: u32 = 6;

/// A decoded LSF resource.
#[derive(Debug, Clone)]
pub struct LsfDocument {
    /// Document tree; a virtual `save` node when the resource has several
    /// regions, otherwise the region node itself.
    pub root: Node,
    /// Engine version from the header.
    pub version: Version,
    /// Container version (3, 5, or 6).
    pub lsf_version: u32,
    /// Node/attribute table format (0 = V2, 1 = V3).
    pub metadata_format: u32,
}
