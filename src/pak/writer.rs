//! LSV package writing
//!
//! SPDX-FileCopyrightText: 2026 lsforge, 2015 Norbyte (`LSLib`, MIT)
//!
//! SPDX-License-Identifier: MIT

#![allow(clippy::cast_possible_truncation)]

use super::types::{
    DOS2_ALIGNMENT, MAGIC, PADDING_BYTE, PackageFile, PackageVersion, PATH_LENGTH, SIGNATURE,
    TRAILER_SIZE,
};
use crate::compression;
use crate::error::{Error, Result};
use crate::formats::{lsf, lsx};
use byteorder::{LittleEndian, WriteBytesExt};
use std::path::Path;

/// Options for [`LsvWriter`].
#[derive(Debug, Clone, Copy)]
pub struct LsvWriteOptions {
    pub version: PackageVersion,
    /// Header flags byte.
    pub flags: u8,
    /// Load priority.
    pub priority: u8,
}

impl Default for LsvWriteOptions {
    fn default() -> Self {
        LsvWriteOptions {
            version: PackageVersion::V18,
            flags: 0,
            priority: 0,
        }
    }
}

impl LsvWriteOptions {
    #[must_use]
    pub fn for_version(version: PackageVersion) -> Self {
        LsvWriteOptions {
            version,
            ..LsvWriteOptions::default()
        }
    }
}

/// Package writer. Files are emitted in insertion order, which is
/// significant for byte-stable repacks.
pub struct LsvWriter {
    options: LsvWriteOptions,
    files: Vec<PackageFile>,
}

struct RawEntry {
    name: String,
    offset: u64,
    size_on_disk: u64,
    uncompressed_size: u64,
    flags: u8,
    crc: u32,
}

impl LsvWriter {
    #[must_use]
    pub fn new(options: LsvWriteOptions) -> Self {
        LsvWriter {
            options,
            files: Vec::new(),
        }
    }

    /// Queue a file. `flags` selects the payload compression.
    pub fn add_file(&mut self, name: impl Into<String>, data: Vec<u8>, flags: u8) {
        self.files.push(PackageFile {
            name: name.into(),
            flags,
            data,
        });
    }

    /// Queue an `.lsx` document as its binary `.lsf` equivalent, renaming
    /// the in-package path.
    ///
    /// # Errors
    /// Returns an error if the document does not parse.
    pub fn add_lsx_as_lsf(&mut self, name: &str, lsx_text: &str, flags: u8) -> Result<()> {
        let document = lsx::parse_lsx(lsx_text)?;
        let bytes = lsf::serialize_lsf(
            &document.root,
            document.version,
            &lsf::LsfWriteOptions::default(),
        )?;
        self.add_file(rename_lsx_to_lsf(name), bytes, flags);
        Ok(())
    }

    /// Assemble the package.
    ///
    /// # Errors
    /// Returns an error for v10 targets, oversized offsets, or a file list
    /// that does not compress.
    pub fn finish(self) -> Result<Vec<u8>> {
        let version = self.options.version;
        if version == PackageVersion::V10 {
            return Err(Error::Unsupported("writing v10 packages".into()));
        }
        let bg3 = version.is_bg3_layout();

        let mut out = Vec::new();
        if bg3 {
            out.resize(40, 0);
        }

        let mut entries = Vec::with_capacity(self.files.len());
        for file in &self.files {
            // DOS2 payloads start on 64-byte boundaries.
            if !bg3 && !out.len().is_multiple_of(DOS2_ALIGNMENT) {
                let padded = out.len().next_multiple_of(DOS2_ALIGNMENT);
                out.resize(padded, PADDING_BYTE);
            }

            let payload = compression::compress(&file.data, file.flags)?;
            let crc = if version.has_crc() {
                crc32fast::hash(&payload)
            } else {
                0
            };
            entries.push(RawEntry {
                name: file.name.clone(),
                offset: out.len() as u64,
                size_on_disk: payload.len() as u64,
                uncompressed_size: file.data.len() as u64,
                flags: file.flags,
                crc,
            });
            out.extend_from_slice(&payload);
        }

        let file_list_offset = out.len() as u64;
        let table = serialize_entries(&entries, version)?;
        let compressed_table = lz4_flex::block::compress(&table);
        if compressed_table.len() > table.len() {
            return Err(Error::CorruptIndex(
                "compressed file list larger than raw table".into(),
            ));
        }

        if bg3 {
            out.write_u32::<LittleEndian>(entries.len() as u32)?;
            out.write_u32::<LittleEndian>(compressed_table.len() as u32)?;
            out.extend_from_slice(&compressed_table);

            let mut header = Vec::with_capacity(40);
            header.extend_from_slice(&MAGIC);
            header.write_u32::<LittleEndian>(version.as_u32())?;
            header.write_u64::<LittleEndian>(file_list_offset)?;
            header.write_u32::<LittleEndian>(8 + compressed_table.len() as u32)?;
            header.write_u8(self.options.flags)?;
            header.write_u8(self.options.priority)?;
            header.extend_from_slice(&[0u8; 16]);
            header.write_u16::<LittleEndian>(1)?;
            out[..40].copy_from_slice(&header);
        } else {
            let file_list_offset = u32::try_from(file_list_offset)
                .map_err(|_| Error::CorruptIndex("package exceeds 4 GiB".into()))?;
            out.write_u32::<LittleEndian>(entries.len() as u32)?;
            out.extend_from_slice(&compressed_table);

            // Trailer: the 32-byte header, its size, and the signature.
            out.write_u32::<LittleEndian>(version.as_u32())?;
            out.write_u32::<LittleEndian>(file_list_offset)?;
            out.write_u32::<LittleEndian>(4 + compressed_table.len() as u32)?;
            out.write_u8(self.options.flags)?;
            out.write_u8(self.options.priority)?;
            out.extend_from_slice(&[0u8; 16]);
            out.write_u16::<LittleEndian>(1)?;
            out.write_u32::<LittleEndian>(TRAILER_SIZE as u32)?;
            out.write_u32::<LittleEndian>(SIGNATURE)?;
        }

        Ok(out)
    }

    /// Assemble and write to disk.
    ///
    /// # Errors
    /// See [`LsvWriter::finish`].
    pub fn write_to_file<P: AsRef<Path>>(self, path: P) -> Result<()> {
        let bytes = self.finish()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

fn serialize_entries(entries: &[RawEntry], version: PackageVersion) -> Result<Vec<u8>> {
    let mut table = Vec::with_capacity(entries.len() * version.entry_size());
    for entry in entries {
        let start = table.len();
        if entry.name.len() >= PATH_LENGTH {
            return Err(Error::Format(format!(
                "package path too long: {}",
                entry.name
            )));
        }
        table.extend_from_slice(entry.name.as_bytes());
        table.resize(start + PATH_LENGTH, 0);

        match version {
            PackageVersion::V18 => {
                table.write_u32::<LittleEndian>(entry.offset as u32)?;
                table.write_u16::<LittleEndian>((entry.offset >> 32) as u16)?;
                table.write_u8(0)?; // part
                table.write_u8(entry.flags)?;
                table.write_u32::<LittleEndian>(entry.size_on_disk as u32)?;
                table.write_u32::<LittleEndian>(entry.uncompressed_size as u32)?;
            }
            PackageVersion::V15 | PackageVersion::V16 => {
                table.write_u64::<LittleEndian>(entry.offset)?;
                table.write_u64::<LittleEndian>(entry.size_on_disk)?;
                table.write_u64::<LittleEndian>(entry.uncompressed_size)?;
                table.write_u32::<LittleEndian>(0)?; // part
                table.write_u32::<LittleEndian>(u32::from(entry.flags))?;
                table.write_u32::<LittleEndian>(entry.crc)?;
                table.extend_from_slice(&[0u8; 12]);
            }
            PackageVersion::V10 | PackageVersion::V13 => {
                let offset = u32::try_from(entry.offset)
                    .map_err(|_| Error::CorruptIndex("offset overflow".into()))?;
                table.write_u32::<LittleEndian>(offset)?;
                table.write_u32::<LittleEndian>(entry.size_on_disk as u32)?;
                table.write_u32::<LittleEndian>(entry.uncompressed_size as u32)?;
                table.write_u32::<LittleEndian>(0)?; // part
                table.write_u32::<LittleEndian>(u32::from(entry.flags))?;
                table.write_u32::<LittleEndian>(entry.crc)?;
            }
        }
    }
    Ok(table)
}

fn rename_lsx_to_lsf(name: &str) -> String {
    if name.len() >= 4 && name[name.len() - 4..].eq_ignore_ascii_case(".lsx") {
        format!("{}.lsf", &name[..name.len() - 4])
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lsx_paths_are_renamed() {
        assert_eq!(rename_lsx_to_lsf("Globals/meta.lsx"), "Globals/meta.lsf");
        assert_eq!(rename_lsx_to_lsf("Globals/meta.LSX"), "Globals/meta.lsf");
        assert_eq!(rename_lsx_to_lsf("raw.bin"), "raw.bin");
    }
}
