//! # Frame Conversion
//!
//! Turns a directory of PNG frames (for example the output of a video transcoder)
//! into the `.ico` flipbook directories the agent loads at startup.
//!
//! Every frame is scaled to a square `size` x `size` icon (Lanczos filter) before
//! encoding, so source frames of any resolution work. Input files are processed in
//! name order and written as `frame_0000.ico`, `frame_0001.ico`, ... so the loader's
//! name sort reproduces the input order. A frame that fails to decode or encode is
//! logged and skipped.

use crate::ico::{self, IcoError, PixelBuffer};
use image::imageops::{self, FilterType};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Icon edge length used when none is given; tray icons are typically 32x32.
pub const DEFAULT_FRAME_SIZE: u32 = 32;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error on {path}: {err}")]
    Io { path: PathBuf, err: io::Error },

    #[error("no usable .png frames in {0}")]
    NoFrames(PathBuf),

    #[error("invalid frame size {0} (expected 1 to 256)")]
    InvalidSize(u32),

    #[error("cannot decode {path}: {err}")]
    Decode {
        path: PathBuf,
        err: image::ImageError,
    },

    #[error("cannot encode {path}: {err}")]
    Encode { path: PathBuf, err: IcoError },
}

/// Outcome of [`convert_dir`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConvertReport {
    /// Files written, in playback order
    pub written: Vec<PathBuf>,
    /// Input frames that were skipped
    pub skipped: usize,
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ConvertError {
    let path = path.to_path_buf();
    move |err| ConvertError::Io { path, err }
}

/// Name of the `index`-th output frame.
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{index:04}.ico")
}

/// Decode one image file and scale it to a `size` x `size` RGBA pixel buffer.
pub fn load_pixels(path: &Path, size: u32) -> Result<PixelBuffer, ConvertError> {
    let mut image = image::open(path)
        .map_err(|err| ConvertError::Decode {
            path: path.to_path_buf(),
            err,
        })?
        .to_rgba8();
    if image.dimensions() != (size, size) {
        image = imageops::resize(&image, size, size, FilterType::Lanczos3);
    }
    PixelBuffer::from_rgba(size, size, image.into_raw()).map_err(|err| ConvertError::Encode {
        path: path.to_path_buf(),
        err,
    })
}

fn png_frames(input: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    let mut frames = Vec::new();
    for entry in fs::read_dir(input).map_err(io_err(input))? {
        let path = entry.map_err(io_err(input))?.path();
        let is_png = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if is_png && path.is_file() {
            frames.push(path);
        }
    }
    frames.sort();
    Ok(frames)
}

/// Convert every PNG in `input` into a numbered `size` x `size` `.ico` frame in `output`.
///
/// `output` is created if needed. Existing files with the same names are
/// overwritten; other files are left alone.
///
/// # Errors
/// - [`ConvertError::InvalidSize`] when `size` is 0 or above 256
/// - [`ConvertError::NoFrames`] when `input` has no PNGs or none of them converted
pub fn convert_dir(input: &Path, output: &Path, size: u32) -> Result<ConvertReport, ConvertError> {
    if size == 0 || size > ico::MAX_DIMENSION {
        return Err(ConvertError::InvalidSize(size));
    }
    let frames = png_frames(input)?;
    if frames.is_empty() {
        return Err(ConvertError::NoFrames(input.to_path_buf()));
    }
    fs::create_dir_all(output).map_err(io_err(output))?;
    info!(
        "converting {} frames from {} at {size}x{size}",
        frames.len(),
        input.display()
    );

    let mut report = ConvertReport::default();
    for path in &frames {
        let icon = match load_pixels(path, size).and_then(|pixels| {
            ico::encode(&pixels).map_err(|err| ConvertError::Encode {
                path: path.clone(),
                err,
            })
        }) {
            Ok(icon) => icon,
            Err(err) => {
                warn!("skipping frame: {err}");
                report.skipped += 1;
                continue;
            }
        };

        let target = output.join(frame_file_name(report.written.len()));
        fs::write(&target, icon.as_bytes()).map_err(io_err(&target))?;
        report.written.push(target);
    }

    if report.written.is_empty() {
        return Err(ConvertError::NoFrames(input.to_path_buf()));
    }
    info!(
        "wrote {} frames to {} ({} skipped)",
        report.written.len(),
        output.display(),
        report.skipped
    );
    Ok(report)
}
