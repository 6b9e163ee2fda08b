//! Types for LSV package handling
//!
//! SPDX-FileCopyrightText: 2026 lsforge, 2015 Norbyte (`LSLib`, MIT)
//!
//! SPDX-License-Identifier: MIT

use crate::error::{Error, Result};

/// "LSPK"
pub const MAGIC: [u8; 4] = *b"LSPK";
/// "LSPK" as a little-endian u32, used by the trailer signature.
pub const SIGNATURE: u32 = 0x4B50_534C;

pub(crate) const PATH_LENGTH: usize = 256;
pub(crate) const TRAILER_SIZE: usize = 40;
/// DOS2 payloads start on 64-byte boundaries, padded with this byte.
pub(crate) const DOS2_ALIGNMENT: usize = 64;
pub(crate) const PADDING_BYTE: u8 = 0xAD;
/// Offset marker for deleted package entries.
pub(crate) const DELETED_SENTINEL: u64 = 0xBEEF_DEAD_BEEF;

/// Package container versions this crate handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageVersion {
    /// D:OS
    V10,
    /// D:OS 2
    V13,
    /// BG3 early access
    V15,
    /// BG3 early access, later patches
    V16,
    /// BG3 release
    V18,
}

impl PackageVersion {
    /// # Errors
    /// Returns [`Error::UnsupportedVersion`] outside the handled set.
    pub fn from_u32(version: u32) -> Result<Self> {
        match version {
            10 => Ok(PackageVersion::V10),
            13 => Ok(PackageVersion::V13),
            15 => Ok(PackageVersion::V15),
            16 => Ok(PackageVersion::V16),
            18 => Ok(PackageVersion::V18),
            version => Err(Error::UnsupportedVersion { version }),
        }
    }

    #[must_use]
    pub fn as_u32(self) -> u32 {
        match self {
            PackageVersion::V10 => 10,
            PackageVersion::V13 => 13,
            PackageVersion::V15 => 15,
            PackageVersion::V16 => 16,
            PackageVersion::V18 => 18,
        }
    }

    /// BG3 packages carry the header at the start of the file; DOS2
    /// packages carry it in a trailer at the end.
    #[must_use]
    pub fn is_bg3_layout(self) -> bool {
        matches!(
            self,
            PackageVersion::V15 | PackageVersion::V16 | PackageVersion::V18
        )
    }

    /// Fixed width of one file-list entry.
    #[must_use]
    pub fn entry_size(self) -> usize {
        match self {
            PackageVersion::V10 | PackageVersion::V13 => 280,
            PackageVersion::V15 | PackageVersion::V16 => 304,
            PackageVersion::V18 => 272,
        }
    }

    /// Entries of v10..v16 carry a CRC-32 over the compressed payload.
    #[must_use]
    pub fn has_crc(self) -> bool {
        !matches!(self, PackageVersion::V18)
    }

    /// Base added to entry offsets when slicing payloads.
    #[must_use]
    pub fn data_offset(self) -> u64 {
        match self {
            PackageVersion::V10 => TRAILER_SIZE as u64,
            _ => 0,
        }
    }
}

/// Parsed package header (head or trailer form).
#[derive(Debug, Clone)]
pub struct PackageHeader {
    pub version: PackageVersion,
    pub file_list_offset: u64,
    pub file_list_size: u32,
    pub flags: u8,
    pub priority: u8,
    pub md5: [u8; 16],
    pub num_parts: u16,
}

/// One parsed file-list entry.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub offset: u64,
    pub size_on_disk: u64,
    pub uncompressed_size: u64,
    pub part: u32,
    /// Compression method in the low nibble, level hint above.
    pub flags: u8,
    pub crc: u32,
}

impl FileEntry {
    #[must_use]
    pub(crate) fn is_deleted(&self) -> bool {
        self.offset & 0x00FF_FFFF_FFFF_FFFF == DELETED_SENTINEL
    }
}

/// A file extracted from (or destined for) a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFile {
    /// Path inside the package, `/`-separated.
    pub name: String,
    /// Compression flags for this file.
    pub flags: u8,
    /// Uncompressed contents.
    pub data: Vec<u8>,
}

/// A fully decoded package.
#[derive(Debug, Clone)]
pub struct Package {
    pub version: PackageVersion,
    /// Files in file-list order.
    pub files: Vec<PackageFile>,
}
