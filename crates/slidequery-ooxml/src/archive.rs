//! Archive handling for PPTX packages
//!
//! A PPTX file is a ZIP archive of XML parts and media. Entries are read
//! lazily by name; the archive is never modified.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tracing::debug;
use zip::read::ZipArchive;

use crate::error::{OoxmlError, Result};
use crate::xml::XmlDocument;

/// Guards applied while opening and reading an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveLimits {
    /// Maximum number of entries in the central directory
    pub max_entries: usize,
    /// Maximum size of the archive file on disk, in bytes
    pub max_file_size: u64,
    /// Maximum uncompressed size of a single entry, in bytes
    pub max_entry_size: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_file_size: 100 * 1024 * 1024,
            max_entry_size: 64 * 1024 * 1024,
        }
    }
}

/// A read-only OOXML package
///
/// The underlying reader is owned by the archive and released when it is
/// dropped, on every exit path.
pub struct OoxmlArchive<R = BufReader<File>> {
    /// Display name used in error messages (usually the file path)
    label: String,
    zip: ZipArchive<R>,
    /// File entries (directories excluded), sorted for deterministic listing
    entries: BTreeSet<String>,
    limits: ArchiveLimits,
}

impl<R> std::fmt::Debug for OoxmlArchive<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OoxmlArchive")
            .field("label", &self.label)
            .field("entries", &self.entries.len())
            .field("limits", &self.limits)
            .finish()
    }
}

impl OoxmlArchive {
    /// Open a PPTX file with default limits
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_limits(path, ArchiveLimits::default())
    }

    /// Open a PPTX file, enforcing the given limits
    pub fn open_with_limits<P: AsRef<Path>>(path: P, limits: ArchiveLimits) -> Result<Self> {
        let path = path.as_ref();
        let label = path.display().to_string();

        let file = File::open(path).map_err(|e| OoxmlError::unreadable(&label, e))?;
        let size = file
            .metadata()
            .map_err(|e| OoxmlError::unreadable(&label, e))?
            .len();
        if size > limits.max_file_size {
            return Err(OoxmlError::unreadable(
                &label,
                format!(
                    "file is {} bytes, limit is {} bytes",
                    size, limits.max_file_size
                ),
            ));
        }

        Self::from_reader(BufReader::new(file), label, limits)
    }
}

impl<R: Read + Seek> OoxmlArchive<R> {
    /// Create from any reader that implements Read + Seek
    pub fn from_reader(reader: R, label: impl Into<String>, limits: ArchiveLimits) -> Result<Self> {
        let label = label.into();
        let zip = ZipArchive::new(reader).map_err(|e| OoxmlError::unreadable(&label, e))?;

        if zip.len() > limits.max_entries {
            return Err(OoxmlError::unreadable(
                &label,
                format!(
                    "archive has {} entries, limit is {}",
                    zip.len(),
                    limits.max_entries
                ),
            ));
        }

        let entries: BTreeSet<String> = zip
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(str::to_string)
            .collect();

        debug!(archive = %label, entries = entries.len(), "opened package");

        Ok(Self {
            label,
            zip,
            entries,
            limits,
        })
    }

    /// Display name of the archive (path for file-backed archives)
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Limits this archive was opened with
    pub fn limits(&self) -> ArchiveLimits {
        self.limits
    }

    /// Check if an entry exists in the archive
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains(name)
    }

    /// List all file entries in name order
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|s| s.as_str())
    }

    /// Number of file entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the archive has no file entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read an entry's bytes
    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        if !self.entries.contains(name) {
            return Err(OoxmlError::entry_not_found(&self.label, name));
        }

        let limit = self.limits.max_entry_size;
        let file = self
            .zip
            .by_name(name)
            .map_err(|e| OoxmlError::unreadable(&self.label, format!("{}: {}", name, e)))?;
        if file.size() > limit {
            return Err(OoxmlError::unreadable(
                &self.label,
                format!("entry {} is {} bytes, limit is {}", name, file.size(), limit),
            ));
        }

        // The declared size can lie; cap the actual read as well
        let mut contents = Vec::with_capacity(file.size() as usize);
        file.take(limit + 1)
            .read_to_end(&mut contents)
            .map_err(|e| OoxmlError::unreadable(&self.label, format!("{}: {}", name, e)))?;
        if contents.len() as u64 > limit {
            return Err(OoxmlError::unreadable(
                &self.label,
                format!("entry {} exceeds {} bytes when inflated", name, limit),
            ));
        }

        Ok(contents)
    }

    /// Read an entry that may legitimately be absent
    pub fn read_optional(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        if self.contains(name) {
            self.read_entry(name).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Read and parse an XML part
    pub fn read_xml(&mut self, name: &str) -> Result<XmlDocument> {
        let bytes = self.read_entry(name)?;
        XmlDocument::parse_part(name, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn build_zip(files: &[(&str, &str)]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, contents) in files {
            zip.start_file(*name, options).unwrap();
            zip.write_all(contents.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_read_entry() {
        let bytes = build_zip(&[("ppt/presentation.xml", "<p:presentation/>")]);
        let mut archive =
            OoxmlArchive::from_reader(Cursor::new(bytes), "mem", ArchiveLimits::default()).unwrap();

        assert!(archive.contains("ppt/presentation.xml"));
        assert_eq!(
            archive.read_entry("ppt/presentation.xml").unwrap(),
            b"<p:presentation/>".to_vec()
        );
    }

    #[test]
    fn test_missing_entry() {
        let bytes = build_zip(&[("a.xml", "<a/>")]);
        let mut archive =
            OoxmlArchive::from_reader(Cursor::new(bytes), "mem", ArchiveLimits::default()).unwrap();

        let err = archive.read_entry("b.xml").unwrap_err();
        assert!(matches!(err, OoxmlError::EntryNotFound { ref entry, .. } if entry == "b.xml"));
        assert!(archive.read_optional("b.xml").unwrap().is_none());
    }

    #[test]
    fn test_entries_are_sorted() {
        let bytes = build_zip(&[("z.xml", "<z/>"), ("a.xml", "<a/>"), ("m/n.xml", "<n/>")]);
        let archive =
            OoxmlArchive::from_reader(Cursor::new(bytes), "mem", ArchiveLimits::default()).unwrap();

        let names: Vec<&str> = archive.entries().collect();
        assert_eq!(names, vec!["a.xml", "m/n.xml", "z.xml"]);
    }

    #[test]
    fn test_not_a_zip() {
        let err = OoxmlArchive::from_reader(
            Cursor::new(b"definitely not a zip".to_vec()),
            "junk.pptx",
            ArchiveLimits::default(),
        )
        .unwrap_err();
        assert!(matches!(err, OoxmlError::ArchiveUnreadable { .. }));
        assert!(err.to_string().contains("junk.pptx"));
    }

    #[test]
    fn test_entry_count_limit() {
        let bytes = build_zip(&[("a.xml", "<a/>"), ("b.xml", "<b/>"), ("c.xml", "<c/>")]);
        let limits = ArchiveLimits {
            max_entries: 2,
            ..ArchiveLimits::default()
        };
        let err = OoxmlArchive::from_reader(Cursor::new(bytes), "bomb.pptx", limits).unwrap_err();
        assert!(matches!(err, OoxmlError::ArchiveUnreadable { .. }));
    }

    #[test]
    fn test_entry_size_limit() {
        let big = "x".repeat(4096);
        let bytes = build_zip(&[("big.xml", big.as_str())]);
        let limits = ArchiveLimits {
            max_entry_size: 1024,
            ..ArchiveLimits::default()
        };
        let mut archive = OoxmlArchive::from_reader(Cursor::new(bytes), "mem", limits).unwrap();
        assert!(matches!(
            archive.read_entry("big.xml"),
            Err(OoxmlError::ArchiveUnreadable { .. })
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let err = OoxmlArchive::open("/nonexistent/deck.pptx").unwrap_err();
        assert!(matches!(err, OoxmlError::ArchiveUnreadable { .. }));
    }

    fn write_zip(dir: &tempfile::TempDir, files: &[(&str, &str)]) -> std::path::PathBuf {
        let path = dir.path().join("deck.pptx");
        std::fs::write(&path, build_zip(files)).unwrap();
        path
    }

    #[test]
    fn test_open_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(&dir, &[("ppt/presentation.xml", "<p:presentation/>")]);

        let mut archive = OoxmlArchive::open(&path).unwrap();
        assert_eq!(archive.label(), path.display().to_string());
        assert_eq!(archive.len(), 1);
        assert!(archive.read_xml("ppt/presentation.xml").is_ok());
    }

    #[test]
    fn test_file_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(&dir, &[("ppt/presentation.xml", "<p:presentation/>")]);
        let size = std::fs::metadata(&path).unwrap().len();

        let limits = ArchiveLimits {
            max_file_size: size - 1,
            ..Default::default()
        };
        match OoxmlArchive::open_with_limits(&path, limits).unwrap_err() {
            OoxmlError::ArchiveUnreadable { path: label, reason } => {
                assert_eq!(label, path.display().to_string());
                assert!(reason.contains(&format!("file is {} bytes", size)), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let limits = ArchiveLimits {
            max_file_size: size,
            ..Default::default()
        };
        assert!(OoxmlArchive::open_with_limits(&path, limits).is_ok());
    }

    #[test]
    fn test_entry_count_limit_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(&dir, &[("a.xml", "<a/>"), ("b.xml", "<b/>"), ("c.xml", "<c/>")]);

        let limits = ArchiveLimits {
            max_entries: 2,
            ..Default::default()
        };
        let err = OoxmlArchive::open_with_limits(&path, limits).unwrap_err();
        assert!(matches!(err, OoxmlError::ArchiveUnreadable { .. }));
    }
}
