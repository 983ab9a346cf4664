//! # CPU Flipbook Core Library
//!
//! This library provides the building blocks for a tray indicator that plays a short
//! icon animation whose speed follows the machine's CPU load. It is split into a
//! byte-exact icon codec and a small scheduler that reacts to a noisy, continuously
//! sampled percentage.
//!
//! ## Design Philosophy
//!
//! ### Pre-encoded Frames
//! - **Encode once**: Frames are converted to the `.ico` container offline (see [`convert`])
//!   and handed to the tray API verbatim at runtime
//! - **Cheap clones**: [`IconFrame`] wraps an `Arc<[u8]>`, so the render loop never copies
//!   icon bytes
//! - **Immutable books**: A [`Flipbook`] is built once at startup and only read afterwards
//!
//! ### Latest Value Wins
//! The sampler, render and status loops share a single atomic percentage
//! ([`sample::SharedSample`]). No queues and no locks: a reading that is one sampling
//! period old is perfectly fine for choosing an animation speed.
//!
//! ### Data Flow
//! 1. **Sampler**: CPU probe → [`sample::SharedSample`]
//! 2. **Render**: [`sample::SharedSample`] → [`engine::AnimationEngine`] → [`sink::IconSink`]
//! 3. **Status**: [`sample::SharedSample`] → [`status::StatusLine`] → [`sink::StatusSink`]
//!
//! ## Core Types
//! - [`IconFrame`]: One fully encoded icon container image
//! - [`Flipbook`]: An ordered, non-empty run of frames plus its nominal frame duration

use std::sync::Arc;
use std::time::Duration;

// Module declarations
pub mod config;
pub mod convert;
pub mod engine;
pub mod flipbook;
pub mod ico;
pub mod sample;
pub mod sampler;
pub mod sink;
pub mod shutdown;
pub mod status;

/// One encoded icon container, exactly as it is handed to the tray API.
///
/// The payload is never inspected or mutated after construction. Cloning only
/// bumps a reference count, which keeps the render loop allocation-free.
///
/// # Example
/// ```
/// use cpu_flipbook_lib::IconFrame;
///
/// let frame = IconFrame::from_bytes(vec![0u8; 22]);
/// assert_eq!(frame.len(), 22);
/// assert!(!frame.is_empty());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IconFrame(Arc<[u8]>);

impl IconFrame {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for IconFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// An ordered, non-empty sequence of icon frames plus a nominal frame duration.
///
/// Frame order is playback order. The loader sorts source files by name, so frames
/// must be named with zero-padded indices (`frame_0000.ico`, `frame_0001.ico`, ...).
///
/// # Example
/// ```
/// use std::time::Duration;
/// use cpu_flipbook_lib::{Flipbook, IconFrame};
///
/// let book = Flipbook::new(
///     vec![IconFrame::from_bytes(vec![1u8; 22]), IconFrame::from_bytes(vec![2u8; 22])],
///     Duration::from_millis(50),
/// )
/// .unwrap();
///
/// assert_eq!(book.len(), 2);
/// assert!(Flipbook::new(Vec::new(), Duration::from_millis(50)).is_none());
/// ```
#[derive(Clone, Debug)]
pub struct Flipbook {
    frames: Vec<IconFrame>,
    frame_rate: Duration,
}

impl Flipbook {
    /// Returns `None` for an empty frame list; a book always has something to show.
    pub fn new(frames: Vec<IconFrame>, frame_rate: Duration) -> Option<Self> {
        if frames.is_empty() {
            return None;
        }
        Some(Self { frames, frame_rate })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false, kept for the `len`/`is_empty` pairing.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame(&self, index: usize) -> Option<&IconFrame> {
        self.frames.get(index)
    }

    pub fn frames(&self) -> &[IconFrame] {
        &self.frames
    }

    /// Nominal display duration of a single frame at 1.0x speed.
    pub fn frame_rate(&self) -> Duration {
        self.frame_rate
    }
}
