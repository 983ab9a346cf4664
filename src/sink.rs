//! # Display Sinks
//!
//! The tray itself is an external collaborator. These traits are the seam the
//! render and status loops write through, with two families of implementations:
//!
//! - **File sinks**: the current icon and status text are kept in files that a
//!   tray host, status bar or widget can watch. The icon file is replaced
//!   atomically so readers never see a half-written frame.
//! - **Development sinks**: icon updates are traced and status lines printed to
//!   stdout, for running without any tray host (`--stdout`).

use crate::status::StatusLine;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::trace;

/// Failure to hand an update to the display. Never fatal to the calling loop.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("display unavailable: {0}")]
    Unavailable(String),

    #[error("display IO: {0}")]
    Io(#[from] io::Error),
}

/// Receives encoded `.ico` frames and replaces the visible indicator with each one.
pub trait IconSink: Send {
    fn set_icon(&mut self, icon: &[u8]) -> Result<(), SinkError>;
}

/// Receives periodic status text (menu title, tooltip).
pub trait StatusSink: Send {
    fn set_status(&mut self, status: &StatusLine) -> Result<(), SinkError>;
}

impl<T: IconSink + ?Sized> IconSink for Box<T> {
    fn set_icon(&mut self, icon: &[u8]) -> Result<(), SinkError> {
        (**self).set_icon(icon)
    }
}

impl<T: StatusSink + ?Sized> StatusSink for Box<T> {
    fn set_status(&mut self, status: &StatusLine) -> Result<(), SinkError> {
        (**self).set_status(status)
    }
}

/// Keeps the current frame in a single `.ico` file.
#[derive(Debug, Clone)]
pub struct FileIconSink {
    path: PathBuf,
    staging: PathBuf,
}

impl FileIconSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut staging = path.clone().into_os_string();
        staging.push(".tmp");
        Self {
            path,
            staging: staging.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IconSink for FileIconSink {
    fn set_icon(&mut self, icon: &[u8]) -> Result<(), SinkError> {
        // Same directory, so the rename is atomic on every platform we target
        fs::write(&self.staging, icon)?;
        fs::rename(&self.staging, &self.path)?;
        Ok(())
    }
}

/// Writes the tooltip text of each refresh to a file.
#[derive(Debug, Clone)]
pub struct FileStatusSink {
    path: PathBuf,
}

impl FileStatusSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StatusSink for FileStatusSink {
    fn set_status(&mut self, status: &StatusLine) -> Result<(), SinkError> {
        fs::write(&self.path, format!("{}\n", status.tooltip()))?;
        Ok(())
    }
}

/// Development sink: traces each icon update instead of displaying it.
#[derive(Debug, Default)]
pub struct LogIconSink {
    updates: u64,
}

impl LogIconSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }
}

/// Width and height from the first directory entry; `0` stands for 256.
fn icon_dimensions(icon: &[u8]) -> Option<(u32, u32)> {
    let dim = |b: u8| if b == 0 { 256 } else { u32::from(b) };
    match icon.get(6..8) {
        Some(&[w, h]) => Some((dim(w), dim(h))),
        _ => None,
    }
}

impl IconSink for LogIconSink {
    fn set_icon(&mut self, icon: &[u8]) -> Result<(), SinkError> {
        let (width, height) = icon_dimensions(icon).ok_or_else(|| {
            SinkError::Unavailable(format!("{} byte frame has no header", icon.len()))
        })?;
        self.updates += 1;
        trace!(update = self.updates, width, height, bytes = icon.len(), "icon updated");
        Ok(())
    }
}

/// Development sink: prints each status line to stdout.
#[derive(Debug, Default)]
pub struct StdoutStatusSink;

impl StatusSink for StdoutStatusSink {
    fn set_status(&mut self, status: &StatusLine) -> Result<(), SinkError> {
        println!("{}", status.menu_title());
        Ok(())
    }
}
