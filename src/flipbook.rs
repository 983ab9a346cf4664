//! # Flipbook Loading
//!
//! Builds a [`Flipbook`] from a directory of pre-encoded `.ico` frames. The loader
//! reads its source exactly once; the resulting book is never refreshed.
//!
//! ## Ordering
//! Frames play in ascending file-name order, so the converter writes zero-padded
//! names (`frame_0000.ico`, `frame_0001.ico`, ...). Anything that is not a `.ico`
//! file is ignored.
//!
//! ## Validation
//! Frames come from a trusted converter, so the only check is a minimum length:
//! a file shorter than the icon header plus one directory entry cannot be an icon.
//! Such files, and files that fail to read, are skipped with a warning. Only an
//! empty source or a source with no usable frame at all is an error.

use crate::{ico, Flipbook, IconFrame};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{fs, io};
use thiserror::Error;
use tracing::{debug, warn};

/// Smallest byte count that can hold an icon header and one directory entry.
pub const MIN_ICON_LEN: usize = ico::HEADER_LEN;

const ICON_EXTENSION: &str = "ico";

/// Errors that can occur while loading a flipbook.
#[derive(Error, Debug)]
pub enum BookError {
    /// The source itself could not be listed
    #[error("cannot list frame source {source_name}: {err}")]
    Source { source_name: String, err: io::Error },

    /// No `.ico` entries at all
    #[error("no .ico files found in {0}")]
    EmptySource(String),

    /// Every candidate was unreadable or too short
    #[error("no valid .ico frames could be loaded from {0}")]
    NoValidFrames(String),

    /// A single frame that is too short to be an icon (non-fatal)
    #[error("{name} is {len} bytes, too short to be an icon (minimum 22)")]
    CorruptFrame { name: String, len: usize },

    /// A single frame that could not be read (non-fatal)
    #[error("cannot read {name}: {err}")]
    Read { name: String, err: io::Error },
}

/// A named collection of byte blobs, such as a directory of frame files.
pub trait FrameSource {
    /// Names of the regular entries; directories are not listed.
    fn entries(&self) -> io::Result<Vec<String>>;

    fn read(&self, name: &str) -> io::Result<Vec<u8>>;

    /// Human-readable location for log messages and errors.
    fn describe(&self) -> String;
}

/// Frames stored as files in one directory (no recursion).
#[derive(Debug, Clone)]
pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl FrameSource for DirSource {
    fn entries(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            // Non UTF-8 names can never match the converter's naming scheme
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.dir.join(name))
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Frames held in memory, keyed by file name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    label: String,
    files: BTreeMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            files: BTreeMap::new(),
        }
    }

    pub fn with_file(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(name.into(), bytes.into());
    }
}

impl FrameSource for MemorySource {
    fn entries(&self) -> io::Result<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()))
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

fn is_icon_name(name: &str) -> bool {
    Path::new(name).extension().and_then(|ext| ext.to_str()) == Some(ICON_EXTENSION)
}

/// Load every `.ico` frame from `source`, in name order.
///
/// # Errors
/// - [`BookError::Source`] when the source cannot be listed
/// - [`BookError::EmptySource`] when it holds no `.ico` entries
/// - [`BookError::NoValidFrames`] when every candidate was skipped
///
/// # Example
/// ```
/// use std::time::Duration;
/// use cpu_flipbook_lib::flipbook::{load_book, MemorySource};
///
/// let source = MemorySource::new("idle")
///     .with_file("frame_0001.ico", vec![0u8; 30])
///     .with_file("frame_0000.ico", vec![1u8; 30])
///     .with_file("notes.txt", b"ignored".to_vec());
///
/// let book = load_book(&source, Duration::from_millis(50)).unwrap();
/// assert_eq!(book.len(), 2);
/// assert_eq!(book.frame(0).unwrap().as_bytes()[0], 1);
/// ```
pub fn load_book(source: &impl FrameSource, base_rate: Duration) -> Result<Flipbook, BookError> {
    let source_name = source.describe();

    let mut names: Vec<String> = source
        .entries()
        .map_err(|err| BookError::Source {
            source_name: source_name.clone(),
            err,
        })?
        .into_iter()
        .filter(|name| is_icon_name(name))
        .collect();

    if names.is_empty() {
        return Err(BookError::EmptySource(source_name));
    }
    names.sort();
    debug!(count = names.len(), source = %source_name, "found icon files");

    let mut frames = Vec::with_capacity(names.len());
    for name in names {
        let bytes = match source.read(&name) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("skipping frame: {}", BookError::Read { name, err });
                continue;
            }
        };
        if bytes.len() < MIN_ICON_LEN {
            let len = bytes.len();
            warn!("skipping frame: {}", BookError::CorruptFrame { name, len });
            continue;
        }
        frames.push(IconFrame::from_bytes(bytes));
    }

    Flipbook::new(frames, base_rate).ok_or(BookError::NoValidFrames(source_name))
}

/// Convenience wrapper for [`load_book`] over a filesystem directory.
pub fn load_book_from_dir(
    dir: impl AsRef<Path>,
    base_rate: Duration,
) -> Result<Flipbook, BookError> {
    load_book(&DirSource::new(dir.as_ref()), base_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RATE: Duration = Duration::from_millis(50);

    fn icon_bytes(tag: u8) -> Vec<u8> {
        let mut bytes = vec![0u8; 40];
        bytes[0] = tag;
        bytes
    }

    #[test]
    fn test_loads_in_name_order() {
        let source = MemorySource::new("mem")
            .with_file("frame_0002.ico", icon_bytes(2))
            .with_file("frame_0000.ico", icon_bytes(0))
            .with_file("frame_0001.ico", icon_bytes(1));

        let book = load_book(&source, RATE).unwrap();
        let tags: Vec<u8> = book.frames().iter().map(|f| f.as_bytes()[0]).collect();
        assert_eq!(tags, vec![0, 1, 2]);
        assert_eq!(book.frame_rate(), RATE);
    }

    #[test]
    fn test_skips_undersized_frames() {
        let mut source = MemorySource::new("mem");
        for i in 0..5 {
            source.insert(format!("frame_{i:04}.ico"), icon_bytes(i));
        }
        source.insert("frame_0005.ico", vec![0u8; 21]);

        let book = load_book(&source, RATE).unwrap();
        assert_eq!(book.len(), 5);
    }

    #[test]
    fn test_exactly_minimum_length_is_kept() {
        let source = MemorySource::new("mem").with_file("a.ico", vec![0u8; MIN_ICON_LEN]);
        assert_eq!(load_book(&source, RATE).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_source() {
        let source = MemorySource::new("mem").with_file("readme.md", b"hello".to_vec());
        assert!(matches!(
            load_book(&source, RATE),
            Err(BookError::EmptySource(name)) if name == "mem"
        ));
    }

    #[test]
    fn test_no_valid_frames() {
        let source = MemorySource::new("mem")
            .with_file("a.ico", vec![0u8; 3])
            .with_file("b.ico", Vec::new());
        assert!(matches!(
            load_book(&source, RATE),
            Err(BookError::NoValidFrames(_))
        ));
    }

    #[test]
    fn test_extension_match_is_exact() {
        let source = MemorySource::new("mem")
            .with_file("frame.ICO", icon_bytes(1))
            .with_file("frame.ico.bak", icon_bytes(2))
            .with_file("frame.png", icon_bytes(3));
        assert!(matches!(
            load_book(&source, RATE),
            Err(BookError::EmptySource(_))
        ));
    }

    #[test]
    fn test_dir_source_ignores_subdirectories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("frame_0000.ico"), icon_bytes(7)).unwrap();
        fs::create_dir(dir.path().join("nested.ico")).unwrap();

        let book = load_book_from_dir(dir.path(), RATE).unwrap();
        assert_eq!(book.len(), 1);
        assert_eq!(book.frame(0).unwrap().as_bytes()[0], 7);
    }

    #[test]
    fn test_missing_directory() {
        let err = load_book_from_dir("/nonexistent/frames", RATE).unwrap_err();
        assert!(matches!(err, BookError::Source { .. }));
        assert!(err.to_string().contains("/nonexistent/frames"));
    }
}
