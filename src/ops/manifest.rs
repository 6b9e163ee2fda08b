//! Unpack directory manifest
//!
//! `__manifest__.json` records the file order and per-file compression
//! flags needed to reproduce a package byte-for-byte. Pack operations
//! consult it when present and fall back to a sorted directory scan.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the manifest inside an unpack directory.
pub const MANIFEST_NAME: &str = "__manifest__.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Package container version.
    pub version: u32,
    /// Files in package order.
    pub files: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// `/`-separated path, as stored in the package.
    pub path: String,
    /// Compression flags of the original entry.
    pub flags: u8,
}

impl Manifest {
    /// Load the manifest from an unpack directory, if one exists.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MANIFEST_NAME);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Write the manifest into an unpack directory.
    ///
    /// # Errors
    /// Returns an error if serialization or writing fails.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(MANIFEST_NAME), text)?;
        Ok(())
    }
}
