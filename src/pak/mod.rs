//! LSV ("LSPK") package codec
//!
//! SPDX-FileCopyrightText: 2026 lsforge, 2015 Norbyte (`LSLib`, MIT)
//!
//! SPDX-License-Identifier: MIT

mod reader;
mod types;
mod writer;

pub use reader::LsvReader;
pub use types::{FileEntry, MAGIC, Package, PackageFile, PackageHeader, PackageVersion, SIGNATURE};
pub use writer::{LsvWriteOptions, LsvWriter};
