//! Package and conversion operations consumed by external drivers

mod manifest;

pub use manifest::{MANIFEST_NAME, Manifest, ManifestEntry};

use crate::compression::{self, CompressionLevel, CompressionMethod};
use crate::error::{Error, Result};
use crate::formats::{lsf, lsx};
use crate::pak::{LsvReader, LsvWriteOptions, LsvWriter, PackageFile, PackageVersion};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extract a package into a directory, writing a manifest that preserves
/// file order and compression flags.
///
/// # Errors
/// Returns format/corruption errors for invalid packages and IO errors for
/// the output directory.
pub fn unpack<P: AsRef<Path>>(input: P, output_dir: P) -> Result<Vec<PathBuf>> {
    let package = LsvReader::from_file(input.as_ref())?.read()?;
    tracing::info!(
        "unpacking {} files from {:?}",
        package.files.len(),
        input.as_ref()
    );
    write_unpacked(output_dir.as_ref(), package.version, &package.files)
}

/// [`unpack`] plus LSF→LSX conversion of every `.lsf` entry.
///
/// Entries that fail to convert are kept in their binary form with a
/// diagnostic; the manifest records what actually landed on disk.
///
/// # Errors
/// Returns format/corruption errors for invalid packages and IO errors for
/// the output directory.
pub fn extract_lsx<P: AsRef<Path>>(input: P, output_dir: P) -> Result<Vec<PathBuf>> {
    let package = LsvReader::from_file(input.as_ref())?.read()?;
    tracing::info!(
        "extracting {} files from {:?} with LSX conversion",
        package.files.len(),
        input.as_ref()
    );

    // Documents are independent; conversion is the driver-level parallelism
    // the codecs themselves never use.
    let files: Vec<PackageFile> = package
        .files
        .into_par_iter()
        .map(|file| {
            if !file.name.to_ascii_lowercase().ends_with(".lsf") {
                return file;
            }
            match convert_lsf_bytes_to_lsx(&file.data) {
                Ok(xml) => PackageFile {
                    name: format!("{}.lsx", &file.name[..file.name.len() - 4]),
                    flags: file.flags,
                    data: xml.into_bytes(),
                },
                Err(e) => {
                    tracing::warn!("keeping {} binary: {e}", file.name);
                    file
                }
            }
        })
        .collect();

    write_unpacked(output_dir.as_ref(), package.version, &files)
}

/// Pack a directory into a package, consulting the manifest when present
/// and otherwise scanning the directory in sorted order.
///
/// # Errors
/// Returns IO errors for unreadable inputs and writer errors for
/// unsupported targets.
pub fn pack<P: AsRef<Path>>(input_dir: P, output: P, version: PackageVersion) -> Result<()> {
    let inputs = collect_inputs(input_dir.as_ref())?;
    tracing::info!(
        "packing {} files into {:?} (v{})",
        inputs.len(),
        output.as_ref(),
        version.as_u32()
    );

    let mut writer = LsvWriter::new(LsvWriteOptions::for_version(version));
    for (name, data, flags) in inputs {
        writer.add_file(name, data, flags);
    }
    writer.write_to_file(output)
}

/// [`pack`] plus LSX→LSF conversion of every `.lsx` entry, renaming the
/// in-package paths to `.lsf`.
///
/// # Errors
/// Returns parse errors for invalid `.lsx` inputs in addition to the
/// [`pack`] failure modes.
pub fn pack_lsx<P: AsRef<Path>>(input_dir: P, output: P, version: PackageVersion) -> Result<()> {
    let inputs = collect_inputs(input_dir.as_ref())?;
    tracing::info!(
        "packing {} files into {:?} (v{}) with LSF conversion",
        inputs.len(),
        output.as_ref(),
        version.as_u32()
    );

    let converted: Result<Vec<(String, Vec<u8>, u8)>> = inputs
        .into_par_iter()
        .map(|(name, data, flags)| {
            if !name.to_ascii_lowercase().ends_with(".lsx") {
                return Ok((name, data, flags));
            }
            let text = String::from_utf8_lossy(&data);
            let document = lsx::parse_lsx(&text)?;
            let bytes = lsf::serialize_lsf(
                &document.root,
                document.version,
                &lsf::LsfWriteOptions::default(),
            )?;
            Ok((format!("{}.lsf", &name[..name.len() - 4]), bytes, flags))
        })
        .collect();

    let mut writer = LsvWriter::new(LsvWriteOptions::for_version(version));
    for (name, data, flags) in converted? {
        writer.add_file(name, data, flags);
    }
    writer.write_to_file(output)
}

/// Convert a single document between LSF and LSX based on the file
/// extensions.
///
/// # Errors
/// Returns [`Error::Format`] for extensions outside `lsf`/`lsx` and codec
/// errors for invalid documents.
pub fn convert<P: AsRef<Path>>(input: P, output: P) -> Result<()> {
    let input = input.as_ref();
    let output = output.as_ref();
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    tracing::info!("converting {input:?} -> {output:?}");
    match extension.as_str() {
        "lsf" => {
            let document = lsf::read_lsf(input)?;
            lsx::write_lsx(
                output,
                &document.root,
                document.version,
                &lsx::LsxWriteOptions::default(),
            )
        }
        "lsx" => {
            let document = lsx::read_lsx(input)?;
            lsf::write_lsf(
                output,
                &document.root,
                document.version,
                &lsf::LsfWriteOptions::default(),
            )
        }
        other => Err(Error::Format(format!(
            "cannot infer conversion for '.{other}'"
        ))),
    }
}

fn convert_lsf_bytes_to_lsx(data: &[u8]) -> Result<String> {
    let document = lsf::parse_lsf_bytes(data)?;
    lsx::serialize_lsx(
        &document.root,
        document.version,
        &lsx::LsxWriteOptions::default(),
    )
}

fn write_unpacked(
    output_dir: &Path,
    version: PackageVersion,
    files: &[PackageFile],
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;

    let mut written = Vec::with_capacity(files.len());
    let mut manifest = Manifest {
        version: version.as_u32(),
        files: Vec::with_capacity(files.len()),
    };
    for file in files {
        let path = output_dir.join(relative_path(&file.name)?);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &file.data)?;
        manifest.files.push(ManifestEntry {
            path: file.name.clone(),
            flags: file.flags,
        });
        written.push(path);
    }
    manifest.save(output_dir)?;
    Ok(written)
}

/// Turn a `/`-separated package path into a relative filesystem path,
/// rejecting anything that would escape the output directory.
fn relative_path(name: &str) -> Result<PathBuf> {
    let mut path = PathBuf::new();
    for component in name.split('/') {
        if component.is_empty() || component == "." || component == ".." {
            return Err(Error::Format(format!("unsafe package path: {name}")));
        }
        path.push(component);
    }
    Ok(path)
}

/// Gather `(name, data, flags)` inputs for packing: manifest order when a
/// manifest exists, otherwise a sorted directory scan with default LZ4.
fn collect_inputs(dir: &Path) -> Result<Vec<(String, Vec<u8>, u8)>> {
    let default_flags =
        compression::make_flags(CompressionMethod::Lz4, CompressionLevel::Default);

    if let Some(manifest) = Manifest::load(dir)? {
        tracing::debug!("using manifest order for {} files", manifest.files.len());
        return manifest
            .files
            .iter()
            .map(|entry| {
                let data = std::fs::read(dir.join(relative_path(&entry.path)?))?;
                Ok((entry.path.clone(), data, entry.flags))
            })
            .collect();
    }

    let mut inputs = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|_| Error::Format(format!("path outside pack root: {:?}", entry.path())))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if name == MANIFEST_NAME {
            continue;
        }
        inputs.push((name, std::fs::read(entry.path())?, default_flags));
    }
    inputs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(inputs)
}
