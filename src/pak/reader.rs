//! LSV package reading
//!
//! SPDX-FileCopyrightText: 2026 lsforge, 2015 Norbyte (`LSLib`, MIT)
//!
//! SPDX-License-Identifier: MIT

#![allow(clippy::cast_possible_truncation)]

use super::types::{
    FileEntry, MAGIC, Package, PackageFile, PackageHeader, PackageVersion, PATH_LENGTH,
    SIGNATURE, TRAILER_SIZE,
};
use crate::compression;
use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::path::Path;

/// Single-shot package reader; owns the input buffer.
pub struct LsvReader {
    data: Vec<u8>,
}

impl LsvReader {
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        LsvReader { data }
    }

    /// # Errors
    /// Returns [`Error::Io`] if the file cannot be read.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(LsvReader {
            data: std::fs::read(path)?,
        })
    }

    /// Parse the header and file list without extracting payloads.
    ///
    /// # Errors
    /// Returns format/corruption errors for invalid packages.
    pub fn list(&self) -> Result<(PackageHeader, Vec<FileEntry>)> {
        let header = read_header(&self.data)?;
        let entries = read_file_list(&self.data, &header)?;
        Ok((header, entries))
    }

    /// Decode the whole package.
    ///
    /// # Errors
    /// Returns format/corruption errors for invalid packages and
    /// [`Error::Unsupported`] for multi-part archives.
    pub fn read(self) -> Result<Package> {
        let (header, entries) = self.list()?;
        tracing::debug!(
            "package v{} with {} entries",
            header.version.as_u32(),
            entries.len()
        );

        let base = header.version.data_offset();
        let mut files = Vec::with_capacity(entries.len());
        for entry in &entries {
            if entry.is_deleted() {
                tracing::debug!("skipping deleted entry {}", entry.name);
                continue;
            }
            if entry.part != 0 {
                return Err(Error::Unsupported(format!(
                    "multi-part package ({} lives in part {})",
                    entry.name, entry.part
                )));
            }

            let start = base
                .checked_add(entry.offset)
                .and_then(|s| usize::try_from(s).ok())
                .ok_or_else(|| Error::CorruptIndex(format!("offset overflow for {}", entry.name)))?;
            let end = start
                .checked_add(entry.size_on_disk as usize)
                .filter(|&end| end <= self.data.len())
                .ok_or_else(|| {
                    Error::CorruptIndex(format!(
                        "entry {} [{start}, +{}) exceeds package size {}",
                        entry.name,
                        entry.size_on_disk,
                        self.data.len()
                    ))
                })?;
            let payload = &self.data[start..end];

            let data = if entry.flags & 0x0F != 0 {
                compression::decompress(payload, entry.uncompressed_size as usize, entry.flags)?
            } else {
                payload.to_vec()
            };

            files.push(PackageFile {
                name: entry.name.clone(),
                flags: entry.flags,
                data,
            });
        }

        Ok(Package {
            version: header.version,
            files,
        })
    }
}

fn read_header(data: &[u8]) -> Result<PackageHeader> {
    // BG3 layout: header at the start of the file.
    if data.len() >= 8 && data[..4] == MAGIC {
        let version = u32::from_le_bytes(data[4..8].try_into().unwrap());
        if matches!(version, 15 | 16 | 18) {
            if data.len() < 40 {
                return Err(Error::CorruptHeader("package shorter than header".into()));
            }
            let mut cursor = Cursor::new(&data[8..40]);
            let file_list_offset = cursor.read_u64::<LittleEndian>()?;
            let file_list_size = cursor.read_u32::<LittleEndian>()?;
            let flags = cursor.read_u8()?;
            let priority = cursor.read_u8()?;
            let mut md5 = [0u8; 16];
            cursor.read_exact(&mut md5)?;
            let num_parts = cursor.read_u16::<LittleEndian>()?;
            return Ok(PackageHeader {
                version: PackageVersion::from_u32(version)?,
                file_list_offset,
                file_list_size,
                flags,
                priority,
                md5,
                num_parts,
            });
        }
    }

    // DOS2 layout: 32-byte header, trailer size, and signature at the tail.
    if data.len() < TRAILER_SIZE {
        return Err(Error::Format("file too small to be a package".into()));
    }
    let tail = &data[data.len() - TRAILER_SIZE..];
    let signature = u32::from_le_bytes(tail[36..40].try_into().unwrap());
    if signature != SIGNATURE {
        return Err(Error::Format("invalid package signature".into()));
    }
    let trailer_size = u32::from_le_bytes(tail[32..36].try_into().unwrap());
    if trailer_size as usize != TRAILER_SIZE {
        return Err(Error::CorruptHeader(format!(
            "unexpected trailer size {trailer_size}"
        )));
    }

    let mut cursor = Cursor::new(&tail[..32]);
    let version = cursor.read_u32::<LittleEndian>()?;
    let version = match PackageVersion::from_u32(version)? {
        v @ (PackageVersion::V10 | PackageVersion::V13) => v,
        _ => return Err(Error::UnsupportedVersion { version }),
    };
    let file_list_offset = u64::from(cursor.read_u32::<LittleEndian>()?);
    let file_list_size = cursor.read_u32::<LittleEndian>()?;
    let flags = cursor.read_u8()?;
    let priority = cursor.read_u8()?;
    let mut md5 = [0u8; 16];
    cursor.read_exact(&mut md5)?;
    let num_parts = cursor.read_u16::<LittleEndian>()?;

    Ok(PackageHeader {
        version,
        file_list_offset,
        file_list_size,
        flags,
        priority,
        md5,
        num_parts,
    })
}

fn read_file_list(data: &[u8], header: &PackageHeader) -> Result<Vec<FileEntry>> {
    let offset = usize::try_from(header.file_list_offset)
        .ok()
        .filter(|&o| o + 4 <= data.len())
        .ok_or_else(|| Error::CorruptHeader("file list offset out of bounds".into()))?;
    let num_files = u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap()) as usize;

    let entry_size = header.version.entry_size();
    let table_size = num_files
        .checked_mul(entry_size)
        .ok_or_else(|| Error::CorruptIndex("file count overflow".into()))?;
    if table_size == 0 {
        return Ok(Vec::new());
    }

    let compressed = if header.version.is_bg3_layout() {
        let size_end = offset + 8;
        if size_end > data.len() {
            return Err(Error::CorruptHeader("file list header out of bounds".into()));
        }
        let compressed_size =
            u32::from_le_bytes(data[offset + 4..size_end].try_into().unwrap()) as usize;
        data.get(size_end..size_end + compressed_size)
            .ok_or_else(|| Error::CorruptHeader("file list out of bounds".into()))?
    } else {
        // fileListSize counts the leading numFiles word.
        let list_size = header.file_list_size as usize;
        if list_size < 4 || offset + list_size > data.len() {
            return Err(Error::CorruptHeader("file list out of bounds".into()));
        }
        &data[offset + 4..offset + list_size]
    };

    let table = lz4_flex::block::decompress(compressed, table_size)
        .map_err(|e| Error::CorruptIndex(format!("file table decode: {e}")))?;
    if table.len() != table_size {
        return Err(Error::CorruptIndex(format!(
            "file table of {} bytes for {num_files} entries of {entry_size}",
            table.len()
        )));
    }

    let mut entries = Vec::with_capacity(num_files);
    for chunk in table.chunks_exact(entry_size) {
        entries.push(parse_entry(chunk, header.version)?);
    }
    Ok(entries)
}

fn parse_entry(bytes: &[u8], version: PackageVersion) -> Result<FileEntry> {
    let name_end = bytes[..PATH_LENGTH]
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(PATH_LENGTH);
    let name = String::from_utf8_lossy(&bytes[..name_end]).into_owned();

    let mut cursor = Cursor::new(&bytes[PATH_LENGTH..]);
    let entry = match version {
        PackageVersion::V18 => {
            let offset_low = cursor.read_u32::<LittleEndian>()?;
            let offset_high = cursor.read_u16::<LittleEndian>()?;
            let part = cursor.read_u8()?;
            let flags = cursor.read_u8()?;
            let size_on_disk = cursor.read_u32::<LittleEndian>()?;
            let uncompressed_size = cursor.read_u32::<LittleEndian>()?;
            FileEntry {
                name,
                offset: u64::from(offset_low) | (u64::from(offset_high) << 32),
                size_on_disk: u64::from(size_on_disk),
                uncompressed_size: u64::from(uncompressed_size),
                part: u32::from(part),
                flags,
                crc: 0,
            }
        }
        PackageVersion::V15 | PackageVersion::V16 => {
            let offset = cursor.read_u64::<LittleEndian>()?;
            let size_on_disk = cursor.read_u64::<LittleEndian>()?;
            let uncompressed_size = cursor.read_u64::<LittleEndian>()?;
            let part = cursor.read_u32::<LittleEndian>()?;
            let flags = cursor.read_u32::<LittleEndian>()?;
            let crc = cursor.read_u32::<LittleEndian>()?;
            FileEntry {
                name,
                offset,
                size_on_disk,
                uncompressed_size,
                part,
                flags: flags as u8,
                crc,
            }
        }
        PackageVersion::V10 | PackageVersion::V13 => {
            let offset = cursor.read_u32::<LittleEndian>()?;
            let size_on_disk = cursor.read_u32::<LittleEndian>()?;
            let uncompressed_size = cursor.read_u32::<LittleEndian>()?;
            let part = cursor.read_u32::<LittleEndian>()?;
            let flags = cursor.read_u32::<LittleEndian>()?;
            let crc = cursor.read_u32::<LittleEndian>()?;
            FileEntry {
                name,
                offset: u64::from(offset),
                size_on_disk: u64::from(size_on_disk),
                uncompressed_size: u64::from(uncompressed_size),
                part,
                flags: flags as u8,
                crc,
            }
        }
    };
    Ok(entry)
}
