//! JSON manifest reader/writer.

use std::io::{Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::types::{Manifest, SweepError, SweepResult};

/// Writer for gallery manifests.
pub struct ManifestWriter;

/// Reader for gallery manifests.
pub struct ManifestReader;

impl ManifestWriter {
    /// Write a manifest to a file, creating parent directories and replacing any prior content.
    ///
    /// The manifest is written to a temporary file beside `path` and renamed
    /// into place, so a failed write never leaves a truncated manifest.
    pub fn write_to_file(manifest: &Manifest, path: &Path) -> SweepResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        Self::write_to(manifest, tmp.as_file_mut())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| SweepError::Io(e.error))?;
        Ok(())
    }

    /// Write a manifest as pretty-printed JSON to any writer.
    pub fn write_to<W: Write>(manifest: &Manifest, writer: &mut W) -> SweepResult<()> {
        serde_json::to_writer_pretty(&mut *writer, manifest)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

impl ManifestReader {
    /// Read a manifest from a file.
    pub fn read_from_file(path: &Path) -> SweepResult<Manifest> {
        let mut file = std::fs::File::open(path)?;
        Self::read_from(&mut file)
    }

    /// Read a manifest from any reader.
    pub fn read_from<R: Read>(reader: &mut R) -> SweepResult<Manifest> {
        Ok(serde_json::from_reader(reader)?)
    }
}
