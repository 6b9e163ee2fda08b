//! LSX XML document codec
//!
//! SPDX-FileCopyrightText: 2026 lsforge, 2015 Norbyte (`LSLib`, MIT)
//!
//! SPDX-License-Identifier: MIT

mod float;
mod reader;
mod writer;

pub use float::{format_double, format_float};
pub use reader::{parse_lsx, read_lsx};
pub use writer::{LsxWriteOptions, serialize_lsx, write_lsx};

use crate::tree::{Node, Version};

/// A decoded LSX document.
#[derive(Debug, Clone)]
pub struct LsxDocument {
    /// Document tree; a virtual `save` node when the document has several
    /// regions, otherwise the region node itself.
    pub root: Node,
    /// Engine version from the `<version>` element.
    pub version: Version,
}
