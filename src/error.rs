//! Error types for `lsforge`

use thiserror::Error;

/// The error type for `lsforge` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrong magic, malformed header, or missing required XML structure.
    #[error("format error: {0}")]
    Format(String),

    /// A declared size or offset in a header exceeds the buffer.
    #[error("corrupt header: {0}")]
    CorruptHeader(String),

    /// The package file index is inconsistent (entry width, offset overflow).
    #[error("corrupt file index: {0}")]
    CorruptIndex(String),

    /// A compressed section of an LSF resource could not be decoded.
    #[error("corrupt block: {0}")]
    CorruptBlock(String),

    /// A compressed payload could not be decoded.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    /// The compression method tag is not one of None/Zlib/LZ4/Zstd.
    #[error("unsupported compression method: {method}")]
    UnsupportedCompression {
        /// The low four bits of the method flags.
        method: u8,
    },

    /// The file version is outside the handled set.
    #[error("unsupported version: {version}")]
    UnsupportedVersion {
        /// The version number found in the file.
        version: u32,
    },

    /// The file uses a feature this crate does not handle
    /// (multi-part packages, deleted entries).
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Format(format!("XML parse error: {err}"))
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Format(format!("XML attribute error: {err}"))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::Format(format!("UTF-8 conversion error: {err}"))
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Self {
        match err.io_error() {
            Some(_) => Error::Io(err.into_io_error().unwrap()),
            None => Error::Format(format!("directory walk error: {err}")),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Format(format!("JSON error: {err}"))
    }
}

/// A specialized Result type for `lsforge` operations.
pub type Result<T> = std::result::Result<T, Error>;
