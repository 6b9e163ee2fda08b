//! Value block encoding and decoding
//!
//! Every attribute value is a contiguous run of bytes in the value block
//! whose length is carried in the upper 26 bits of `typeAndLength`. This
//! module maps those runs to and from [`AttributeValue`].
//!
//! SPDX-FileCopyrightText: 2026 lsforge, 2015 Norbyte (`LSLib`, MIT)
//!
//! SPDX-License-Identifier: MIT

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]

use crate::error::{Error, Result};
use crate::tree::{
    AttributeType, AttributeValue, TranslatedFsArgument, TranslatedFsString, TranslatedString,
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

/// Nested TranslatedFSString arguments deeper than this are treated as
/// corrupt rather than recursed into.
const MAX_ARGUMENT_DEPTH: usize = 64;

fn truncated() -> Error {
    Error::CorruptBlock("value block truncated".into())
}

/// Decode the value run `[offset, offset + length)` for an attribute.
///
/// A run that extends past the value block is kept as a raw hex string so
/// malformed resources still round-trip.
///
/// # Errors
/// Returns [`Error::CorruptBlock`] for internally inconsistent runs.
pub(crate) fn decode_value(
    values: &[u8],
    offset: usize,
    length: usize,
    ty: AttributeType,
    lsf_version: u32,
) -> Result<AttributeValue> {
    let Some(end) = offset.checked_add(length).filter(|&end| end <= values.len()) else {
        tracing::debug!("value run {offset}+{length} exceeds block, keeping raw hex");
        let clamped = values.get(offset..).unwrap_or(&[]);
        return Ok(AttributeValue::String(to_hex(clamped)));
    };
    let bytes = &values[offset..end];

    Ok(match ty {
        AttributeType::None => AttributeValue::None,
        AttributeType::Byte => AttributeValue::Byte(*bytes.first().ok_or_else(truncated)?),
        AttributeType::Int8 => {
            AttributeValue::Int8(*bytes.first().ok_or_else(truncated)? as i8)
        }
        AttributeType::Short => {
            AttributeValue::Short(i16::from_le_bytes(fixed(bytes)?))
        }
        AttributeType::UShort => {
            AttributeValue::UShort(u16::from_le_bytes(fixed(bytes)?))
        }
        AttributeType::Int => AttributeValue::Int(i32::from_le_bytes(fixed(bytes)?)),
        AttributeType::UInt => AttributeValue::UInt(u32::from_le_bytes(fixed(bytes)?)),
        AttributeType::Float => AttributeValue::Float(f32::from_le_bytes(fixed(bytes)?)),
        AttributeType::Double => AttributeValue::Double(f64::from_le_bytes(fixed(bytes)?)),
        AttributeType::ULongLong => {
            AttributeValue::ULongLong(u64::from_le_bytes(fixed(bytes)?))
        }
        AttributeType::Long | AttributeType::Int64 => {
            AttributeValue::Long(i64::from_le_bytes(fixed(bytes)?))
        }
        AttributeType::Bool => AttributeValue::Bool(bytes.first() == Some(&1)),
        AttributeType::IVec2 | AttributeType::IVec3 | AttributeType::IVec4 => {
            AttributeValue::IVec(read_i32_run(bytes, ty.columns().unwrap())?)
        }
        AttributeType::Vec2
        | AttributeType::Vec3
        | AttributeType::Vec4
        | AttributeType::Mat2
        | AttributeType::Mat3
        | AttributeType::Mat3x4
        | AttributeType::Mat4x3
        | AttributeType::Mat4 => {
            AttributeValue::Vec(read_f32_run(bytes, ty.columns().unwrap())?)
        }
        AttributeType::String
        | AttributeType::Path
        | AttributeType::FixedString
        | AttributeType::LsString
        | AttributeType::WString
        | AttributeType::LsWString => AttributeValue::String(trim_nul(bytes)),
        AttributeType::ScratchBuffer => AttributeValue::Buffer(bytes.to_vec()),
        AttributeType::Uuid => {
            if bytes.len() != 16 {
                return Err(Error::CorruptBlock(format!(
                    "UUID value of {} bytes",
                    bytes.len()
                )));
            }
            let mut stored = [0u8; 16];
            stored.copy_from_slice(bytes);
            AttributeValue::Uuid(uuid::Uuid::from_bytes(unswap_guid(stored)))
        }
        AttributeType::TranslatedString => {
            let mut cursor = Cursor::new(bytes);
            AttributeValue::TranslatedString(read_translated_string(&mut cursor)?)
        }
        AttributeType::TranslatedFsString => {
            let mut cursor = Cursor::new(bytes);
            AttributeValue::TranslatedFsString(read_translated_fs_string(
                &mut cursor,
                lsf_version,
                0,
            )?)
        }
    })
}

/// Append the encoding of `value` to the value block, returning the number
/// of bytes written.
///
/// A [`AttributeValue::String`] under a non-string tag is the raw-hex
/// fallback of [`decode_value`]; its bytes are restored verbatim.
///
/// # Errors
/// Returns [`Error::Format`] when the value variant cannot be encoded
/// under the attribute's type tag.
pub(crate) fn encode_value(
    buffer: &mut Vec<u8>,
    ty: AttributeType,
    value: &AttributeValue,
    lsf_version: u32,
) -> Result<usize> {
    let start = buffer.len();

    match (ty, value) {
        (AttributeType::None, _) => {}
        (AttributeType::Byte, AttributeValue::Byte(v)) => buffer.push(*v),
        (AttributeType::Int8, AttributeValue::Int8(v)) => buffer.push(*v as u8),
        (AttributeType::Short, AttributeValue::Short(v)) => {
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        (AttributeType::UShort, AttributeValue::UShort(v)) => {
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        (AttributeType::Int, AttributeValue::Int(v)) => {
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        (AttributeType::UInt, AttributeValue::UInt(v)) => {
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        (AttributeType::Float, AttributeValue::Float(v)) => {
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        (AttributeType::Double, AttributeValue::Double(v)) => {
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        (AttributeType::ULongLong, AttributeValue::ULongLong(v)) => {
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        (AttributeType::Long | AttributeType::Int64, AttributeValue::Long(v)) => {
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        (AttributeType::Bool, AttributeValue::Bool(v)) => buffer.push(u8::from(*v)),
        (
            AttributeType::IVec2 | AttributeType::IVec3 | AttributeType::IVec4,
            AttributeValue::IVec(elements),
        ) => {
            for i in 0..ty.columns().unwrap() {
                let element = elements.get(i).copied().unwrap_or(0);
                buffer.extend_from_slice(&element.to_le_bytes());
            }
        }
        (vec_ty, AttributeValue::Vec(elements)) if vec_ty.is_float_vector() => {
            for i in 0..vec_ty.columns().unwrap() {
                let element = elements.get(i).copied().unwrap_or(0.0);
                buffer.extend_from_slice(&element.to_le_bytes());
            }
        }
        (
            AttributeType::String
            | AttributeType::Path
            | AttributeType::FixedString
            | AttributeType::LsString
            | AttributeType::WString
            | AttributeType::LsWString,
            AttributeValue::String(s),
        ) => {
            buffer.extend_from_slice(s.as_bytes());
            buffer.push(0);
        }
        (AttributeType::ScratchBuffer, AttributeValue::Buffer(bytes)) => {
            buffer.extend_from_slice(bytes);
        }
        (AttributeType::Uuid, AttributeValue::Uuid(uuid)) => {
            buffer.extend_from_slice(&swap_guid(*uuid.as_bytes()));
        }
        (AttributeType::TranslatedString, AttributeValue::TranslatedString(ts)) => {
            write_length_prefixed(buffer, &ts.value);
            write_length_prefixed(buffer, &ts.handle);
        }
        (AttributeType::TranslatedFsString, AttributeValue::TranslatedFsString(fs)) => {
            write_translated_fs_string(buffer, fs, lsf_version);
        }
        // Raw-hex fallback produced by the reader for out-of-range runs.
        (_, AttributeValue::String(s)) => {
            let bytes = from_hex(s).ok_or_else(|| {
                Error::Format(format!("cannot encode string value under {} tag", ty.name()))
            })?;
            buffer.extend_from_slice(&bytes);
        }
        (ty, value) => {
            return Err(Error::Format(format!(
                "value {value:?} does not match attribute type {}",
                ty.name()
            )));
        }
    }

    Ok(buffer.len() - start)
}

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| truncated())
}

fn read_i32_run(bytes: &[u8], count: usize) -> Result<Vec<i32>> {
    if bytes.len() < count * 4 {
        return Err(truncated());
    }
    Ok((0..count)
        .map(|i| i32::from_le_bytes(bytes[i * 4..i * 4 + 4].try_into().unwrap()))
        .collect())
}

fn read_f32_run(bytes: &[u8], count: usize) -> Result<Vec<f32>> {
    if bytes.len() < count * 4 {
        return Err(truncated());
    }
    Ok((0..count)
        .map(|i| f32::from_le_bytes(bytes[i * 4..i * 4 + 4].try_into().unwrap()))
        .collect())
}

/// Strings are stored with a trailing NUL; some tools pad with more.
fn trim_nul(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |pos| pos + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Stored GUID layout → canonical byte order: the first group is reversed,
/// the next two groups are byte-swapped, and the last eight bytes are
/// swapped pairwise. The permutation is its own inverse.
fn unswap_guid(b: [u8; 16]) -> [u8; 16] {
    [
        b[3], b[2], b[1], b[0], b[5], b[4], b[7], b[6], b[9], b[8], b[11], b[10], b[13], b[12],
        b[15], b[14],
    ]
}

fn swap_guid(b: [u8; 16]) -> [u8; 16] {
    unswap_guid(b)
}

fn read_length_prefixed(cursor: &mut Cursor<&[u8]>) -> Result<String> {
    let length = cursor
        .read_i32::<LittleEndian>()
        .map_err(|_| truncated())?
        .max(0) as usize;
    if length == 0 {
        return Ok(String::new());
    }
    let mut bytes = vec![0u8; length];
    cursor.read_exact(&mut bytes).map_err(|_| truncated())?;
    Ok(trim_nul(&bytes))
}

fn write_length_prefixed(buffer: &mut Vec<u8>, s: &str) {
    if s.is_empty() {
        buffer
            .write_i32::<LittleEndian>(0)
            .expect("vec write");
        return;
    }
    buffer
        .write_i32::<LittleEndian>(s.len() as i32 + 1)
        .expect("vec write");
    buffer.extend_from_slice(s.as_bytes());
    buffer.push(0);
}

fn read_translated_string(cursor: &mut Cursor<&[u8]>) -> Result<TranslatedString> {
    let value = read_length_prefixed(cursor)?;
    let handle = read_length_prefixed(cursor)?;
    Ok(TranslatedString { value, handle })
}

fn read_translated_fs_string(
    cursor: &mut Cursor<&[u8]>,
    lsf_version: u32,
    depth: usize,
) -> Result<TranslatedFsString> {
    if depth > MAX_ARGUMENT_DEPTH {
        return Err(Error::CorruptBlock("argument nesting too deep".into()));
    }

    let version = if lsf_version >= 5 {
        cursor.read_u16::<LittleEndian>().map_err(|_| truncated())?
    } else {
        0
    };
    let value = read_length_prefixed(cursor)?;
    let handle = read_length_prefixed(cursor)?;

    let num_arguments = cursor
        .read_i32::<LittleEndian>()
        .map_err(|_| truncated())?
        .max(0) as usize;
    if num_arguments > cursor.get_ref().len() {
        return Err(Error::CorruptBlock(format!(
            "implausible argument count {num_arguments}"
        )));
    }

    let mut arguments = Vec::with_capacity(num_arguments);
    for _ in 0..num_arguments {
        let key = read_length_prefixed(cursor)?;
        let string = read_translated_fs_string(cursor, lsf_version, depth + 1)?;
        let value = read_length_prefixed(cursor)?;
        arguments.push(TranslatedFsArgument { key, string, value });
    }

    Ok(TranslatedFsString {
        value,
        handle,
        version,
        arguments,
    })
}

fn write_translated_fs_string(buffer: &mut Vec<u8>, fs: &TranslatedFsString, lsf_version: u32) {
    if lsf_version >= 5 {
        buffer
            .write_u16::<LittleEndian>(fs.version)
            .expect("vec write");
    }
    write_length_prefixed(buffer, &fs.value);
    write_length_prefixed(buffer, &fs.handle);
    buffer
        .write_i32::<LittleEndian>(fs.arguments.len() as i32)
        .expect("vec write");
    for argument in &fs.arguments {
        write_length_prefixed(buffer, &argument.key);
        write_translated_fs_string(buffer, &argument.string, lsf_version);
        write_length_prefixed(buffer, &argument.value);
    }
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn from_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len() / 2)
        .map(|i| u8::from_str_radix(s.get(i * 2..i * 2 + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(ty: AttributeType, value: AttributeValue, lsf_version: u32) {
        let mut buffer = Vec::new();
        let length = encode_value(&mut buffer, ty, &value, lsf_version).unwrap();
        assert_eq!(length, buffer.len());
        let decoded = decode_value(&buffer, 0, length, ty, lsf_version).unwrap();
        assert_eq!(decoded, value, "{}", ty.name());
    }

    #[test]
    fn scalars_roundtrip() {
        roundtrip(AttributeType::Byte, AttributeValue::Byte(255), 6);
        roundtrip(AttributeType::Short, AttributeValue::Short(-32768), 6);
        roundtrip(AttributeType::Int, AttributeValue::Int(i32::MIN), 6);
        roundtrip(AttributeType::ULongLong, AttributeValue::ULongLong(u64::MAX), 6);
        roundtrip(AttributeType::Float, AttributeValue::Float(-3.619_99e-6), 6);
        roundtrip(AttributeType::Bool, AttributeValue::Bool(true), 6);
        roundtrip(
            AttributeType::Vec3,
            AttributeValue::Vec(vec![1.0, -2.5, 0.125]),
            6,
        );
    }

    #[test]
    fn guid_byte_swap_matches_lslib_layout() {
        let uuid = uuid::Uuid::parse_str("427baeec-054d-4354-8bbe-f5a8f42a75b0").unwrap();
        let mut buffer = Vec::new();
        encode_value(&mut buffer, AttributeType::Uuid, &AttributeValue::Uuid(uuid), 6).unwrap();
        assert_eq!(
            &buffer[..8],
            &[0xEC, 0xAE, 0x7B, 0x42, 0x4D, 0x05, 0x54, 0x43]
        );

        let decoded = decode_value(&buffer, 0, 16, AttributeType::Uuid, 6).unwrap();
        assert_eq!(decoded, AttributeValue::Uuid(uuid));
    }

    #[test]
    fn translated_fs_string_recurses() {
        let nested = TranslatedFsString {
            value: "inner".into(),
            handle: "h2".into(),
            version: 0,
            arguments: Vec::new(),
        };
        let fs = TranslatedFsString {
            value: "outer".into(),
            handle: "h1".into(),
            version: 0,
            arguments: vec![TranslatedFsArgument {
                key: "Player".into(),
                string: nested,
                value: "Tav".into(),
            }],
        };
        roundtrip(
            AttributeType::TranslatedFsString,
            AttributeValue::TranslatedFsString(fs.clone()),
            6,
        );
        // DOS2 resources have no version prefix.
        roundtrip(
            AttributeType::TranslatedFsString,
            AttributeValue::TranslatedFsString(fs),
            3,
        );
    }

    #[test]
    fn out_of_range_run_becomes_hex() {
        let values = [0xDE, 0xAD];
        let decoded = decode_value(&values, 1, 8, AttributeType::Int, 6).unwrap();
        assert_eq!(decoded, AttributeValue::String("ad".into()));

        // And the hex fallback restores the original bytes on encode.
        let mut buffer = Vec::new();
        encode_value(&mut buffer, AttributeType::Int, &decoded, 6).unwrap();
        assert_eq!(buffer, [0xAD]);
    }

    #[test]
    fn strings_drop_trailing_padding() {
        let decoded = decode_value(b"abc\0\0", 0, 5, AttributeType::FixedString, 6).unwrap();
        assert_eq!(decoded, AttributeValue::String("abc".into()));
    }
}
