// src/archive/mod.rs

//! Archive expansion
//!
//! Expands a cached package archive into its expansion directory. The format
//! is picked from the archive's file name: `.zip`, `.tar.gz`/`.tgz`,
//! `.tar.xz` or `.tar.zst`.

use crate::error::ExtractError;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use tar::Archive;
use tracing::debug;
use xz2::read::XzDecoder;

/// Expand capability used by the package pipeline
pub trait Extractor: Send + Sync {
    /// Expand `archive` into `dest`, creating `dest` if needed
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ExtractError>;
}

/// Supported archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    TarXz,
    TarZst,
}

impl ArchiveFormat {
    /// Detect the format from the archive's file name
    pub fn detect(path: &Path) -> Result<Self, ExtractError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if name.ends_with(".zip") {
            Ok(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else if name.ends_with(".tar.xz") {
            Ok(Self::TarXz)
        } else if name.ends_with(".tar.zst") {
            Ok(Self::TarZst)
        } else {
            Err(ExtractError::UnsupportedFormat(format!(
                "{}. Expected .zip, .tar.gz, .tgz, .tar.xz or .tar.zst",
                path.display()
            )))
        }
    }
}

/// Extractor backed by the `zip` and `tar` crates
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_zip(archive: &Path, dest: &Path) -> Result<(), ExtractError> {
        let file = File::open(archive)?;
        let mut zip = zip::ZipArchive::new(file)?;

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;

            // enclosed_name rejects absolute paths and `..` components
            let relative = entry
                .enclosed_name()
                .ok_or_else(|| ExtractError::UnsafePath(entry.name().to_string()))?;
            let outpath = dest.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&outpath)?;
            } else {
                if let Some(parent) = outpath.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut outfile = File::create(&outpath)?;
                io::copy(&mut entry, &mut outfile)?;
            }
        }

        Ok(())
    }

    /// Open and decompress a tarball
    fn open_tarball(archive: &Path, format: ArchiveFormat) -> Result<Archive<Box<dyn Read>>, ExtractError> {
        let file = File::open(archive)?;

        let reader: Box<dyn Read> = match format {
            ArchiveFormat::TarGz => Box::new(GzDecoder::new(file)),
            ArchiveFormat::TarXz => Box::new(XzDecoder::new(file)),
            ArchiveFormat::TarZst => Box::new(zstd::Decoder::new(file)?),
            ArchiveFormat::Zip => {
                return Err(ExtractError::UnsupportedFormat(format!(
                    "{} is not a tarball",
                    archive.display()
                )));
            }
        };

        Ok(Archive::new(reader))
    }
}

impl Extractor for ArchiveExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ExtractError> {
        let format = ArchiveFormat::detect(archive)?;
        debug!(
            "Expanding {} ({:?}) into {}",
            archive.display(),
            format,
            dest.display()
        );

        fs::create_dir_all(dest)?;

        match format {
            ArchiveFormat::Zip => Self::extract_zip(archive, dest),
            tarball => {
                // tar skips entries containing `..` on unpack
                let mut archive = Self::open_tarball(archive, tarball)?;
                archive.unpack(dest)?;
                Ok(())
            }
        }
    }
}
