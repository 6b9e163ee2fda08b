//! Method-dispatched compression facade
//!
//! The package and LSF codecs both store a flags byte whose low four bits
//! select the method and whose upper bits hint the level. All payload and
//! section (de)compression goes through here.
//!
//! SPDX-FileCopyrightText: 2026 lsforge, 2015 Norbyte (`LSLib`, MIT)
//!
//! SPDX-License-Identifier: MIT

use crate::error::{Error, Result};
use std::io::{Read, Write};

/// LZ4 frame magic (`0x184D2204` little-endian).
const LZ4_FRAME_MAGIC: [u8; 4] = [0x04, 0x22, 0x4D, 0x18];

/// Compression method stored in the low four bits of a flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    None,
    Zlib,
    Lz4,
    Zstd,
}

impl CompressionMethod {
    /// Parse the method from a flags byte.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedCompression`] for unknown method tags.
    pub fn from_flags(flags: u8) -> Result<Self> {
        match flags & 0x0F {
            0 => Ok(CompressionMethod::None),
            1 => Ok(CompressionMethod::Zlib),
            2 => Ok(CompressionMethod::Lz4),
            3 => Ok(CompressionMethod::Zstd),
            method => Err(Error::UnsupportedCompression { method }),
        }
    }

    /// Method tag for a flags byte.
    #[must_use]
    pub fn to_flags(self) -> u8 {
        match self {
            CompressionMethod::None => 0,
            CompressionMethod::Zlib => 1,
            CompressionMethod::Lz4 => 2,
            CompressionMethod::Zstd => 3,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CompressionMethod::None => "none",
            CompressionMethod::Zlib => "zlib",
            CompressionMethod::Lz4 => "lz4",
            CompressionMethod::Zstd => "zstd",
        }
    }
}

/// Level hint stored in the upper bits of a flags byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompressionLevel {
    /// 0x10
    Fast,
    /// 0x20
    #[default]
    Default,
    /// 0x40
    Max,
}

impl CompressionLevel {
    /// Parse the level hint from a flags byte; unset bits mean Default.
    #[must_use]
    pub fn from_flags(flags: u8) -> Self {
        if flags & 0x10 != 0 {
            CompressionLevel::Fast
        } else if flags & 0x40 != 0 {
            CompressionLevel::Max
        } else {
            CompressionLevel::Default
        }
    }

    /// Level bits for a flags byte.
    #[must_use]
    pub fn to_flags(self) -> u8 {
        match self {
            CompressionLevel::Fast => 0x10,
            CompressionLevel::Default => 0x20,
            CompressionLevel::Max => 0x40,
        }
    }

    fn zlib(self) -> flate2::Compression {
        match self {
            CompressionLevel::Fast => flate2::Compression::fast(),
            CompressionLevel::Default => flate2::Compression::default(),
            CompressionLevel::Max => flate2::Compression::best(),
        }
    }

    fn zstd(self) -> i32 {
        match self {
            CompressionLevel::Fast => 1,
            CompressionLevel::Default => 3,
            CompressionLevel::Max => 19,
        }
    }
}

/// Build a flags byte from a method and level.
#[must_use]
pub fn make_flags(method: CompressionMethod, level: CompressionLevel) -> u8 {
    method.to_flags() | level.to_flags()
}

/// Compress `data` according to `method_flags`.
///
/// # Errors
/// Returns [`Error::UnsupportedCompression`] for unknown method tags and
/// [`Error::CorruptPayload`] if an encoder fails.
pub fn compress(data: &[u8], method_flags: u8) -> Result<Vec<u8>> {
    let method = CompressionMethod::from_flags(method_flags)?;
    let level = CompressionLevel::from_flags(method_flags);

    match method {
        CompressionMethod::None => Ok(data.to_vec()),
        CompressionMethod::Zlib => {
            let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), level.zlib());
            encoder.write_all(data)?;
            Ok(encoder.finish()?)
        }
        CompressionMethod::Lz4 => Ok(lz4_flex::block::compress(data)),
        CompressionMethod::Zstd => zstd::encode_all(data, level.zstd())
            .map_err(|e| Error::CorruptPayload(format!("zstd encode: {e}"))),
    }
}

/// Decompress `data` according to `method_flags`.
///
/// For LZ4 the buffer is sniffed: a leading frame magic selects the frame
/// decoder (which handles frames with dependent blocks), anything else is
/// decoded as a raw block of `uncompressed_size` bytes.
///
/// # Errors
/// Returns [`Error::UnsupportedCompression`] for unknown method tags and
/// [`Error::CorruptPayload`] if decoding fails.
pub fn decompress(data: &[u8], uncompressed_size: usize, method_flags: u8) -> Result<Vec<u8>> {
    let method = CompressionMethod::from_flags(method_flags)?;

    match method {
        CompressionMethod::None => Ok(data.to_vec()),
        CompressionMethod::Zlib => {
            let mut decoder = flate2::read::ZlibDecoder::new(data);
            let mut decompressed = Vec::with_capacity(uncompressed_size);
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| Error::CorruptPayload(format!("zlib decode: {e}")))?;
            Ok(decompressed)
        }
        CompressionMethod::Lz4 => decompress_lz4(data, uncompressed_size),
        CompressionMethod::Zstd => decompress_zstd(data, uncompressed_size),
    }
}

/// Decompress an LSF value block.
///
/// BG3 level caches ship value blocks with non-standard layouts; after the
/// normal path fails this tries Zstd, then falls back to the raw bytes
/// zero-padded to `uncompressed_size`. The fallback is flagged with a
/// non-fatal diagnostic.
pub(crate) fn decompress_value_block(
    data: &[u8],
    uncompressed_size: usize,
    method_flags: u8,
) -> Result<Vec<u8>> {
    match decompress(data, uncompressed_size, method_flags) {
        Ok(decompressed) => Ok(decompressed),
        Err(err) => {
            if let Ok(decompressed) = zstd::decode_all(data) {
                return Ok(decompressed);
            }
            tracing::warn!("value block not decodable ({err}), keeping raw bytes");
            let mut raw = data.to_vec();
            raw.resize(uncompressed_size.max(raw.len()), 0);
            Ok(raw)
        }
    }
}

fn decompress_lz4(data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    if data.len() >= 4 && data[..4] == LZ4_FRAME_MAGIC {
        let mut decoder = lz4_flex::frame::FrameDecoder::new(data);
        let mut decompressed = Vec::with_capacity(uncompressed_size);
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| Error::CorruptPayload(format!("LZ4 frame decode: {e}")))?;
        if decompressed.is_empty() && uncompressed_size > 0 {
            return Err(Error::CorruptPayload("LZ4 frame decoded to nothing".into()));
        }
        Ok(decompressed)
    } else {
        lz4_flex::block::decompress(data, uncompressed_size)
            .map_err(|e| Error::CorruptPayload(format!("LZ4 block decode: {e}")))
    }
}

fn decompress_zstd(data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    let decompressed =
        zstd::decode_all(data).map_err(|e| Error::CorruptPayload(format!("zstd decode: {e}")))?;
    if decompressed.is_empty() && uncompressed_size > 0 {
        return Err(Error::CorruptPayload("zstd decoded to nothing".into()));
    }
    Ok(decompressed)
}
