//! # CPU-Adaptive Animation Engine
//!
//! Plays one of two flipbooks in the tray and stretches or squeezes the frame
//! duration according to the latest CPU reading.
//!
//! ## Mode Selection
//!
//! | CPU            | Book     | Speed                                             |
//! |----------------|----------|---------------------------------------------------|
//! | `<= 20%`       | idle     | 1.0x                                              |
//! | `> 20%`        | active   | `0.5 + (cpu - 21) / 79 * 1.5`, clamped to 0.5–2.0 |
//!
//! The active curve starts at 21%, so readings between 20 and 21 land on the
//! 0.5 clamp and there is a step from 1.0x idle to 0.5x active at the boundary.
//!
//! ## Per-tick Steps
//! 1. Read the shared sample and pick the book and speed
//! 2. Restart at frame 0 whenever the book changes
//! 3. Emit the frame under the cursor (empty payloads are skipped)
//! 4. Delay `frame_rate / speed`, never below the refresh floor
//! 5. Advance the cursor, wrapping at the end of the book

use crate::sample::SharedSample;
use crate::shutdown::Shutdown;
use crate::sink::IconSink;
use crate::{Flipbook, IconFrame};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Readings at or below this percentage play the idle book.
pub const IDLE_THRESHOLD: f64 = 20.0;

/// CPU percentage where the active speed curve starts.
const ACTIVE_CURVE_START: f64 = 21.0;
const ACTIVE_CURVE_END: f64 = 100.0;

pub const MIN_SPEED: f64 = 0.5;
pub const MAX_SPEED: f64 = 2.0;

/// Which flipbook is playing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Idle,
    Active,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Idle => f.write_str("idle"),
            Mode::Active => f.write_str("active"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The selected book was not loaded; the loop waits and retries
    #[error("no frames available for {0} mode")]
    MissingBook(Mode),
}

/// Timing limits for the render loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// Shortest delay between icon updates (~30 updates per second)
    pub min_delay: Duration,
    /// Wait applied when the selected book is missing
    pub missing_book_wait: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(33),
            missing_book_wait: Duration::from_millis(100),
        }
    }
}

/// Choose the book and speed multiplier for a CPU reading.
///
/// Non-finite readings are treated as 0%.
///
/// # Example
/// ```
/// use cpu_flipbook_lib::engine::{select_mode, Mode};
///
/// assert_eq!(select_mode(0.0), (Mode::Idle, 1.0));
/// assert_eq!(select_mode(21.0), (Mode::Active, 0.5));
/// assert_eq!(select_mode(100.0), (Mode::Active, 2.0));
/// ```
pub fn select_mode(cpu: f64) -> (Mode, f64) {
    let cpu = if cpu.is_finite() { cpu } else { 0.0 };
    if cpu <= IDLE_THRESHOLD {
        return (Mode::Idle, 1.0);
    }
    let progress = (cpu - ACTIVE_CURVE_START) / (ACTIVE_CURVE_END - ACTIVE_CURVE_START);
    let speed = MIN_SPEED + progress * (MAX_SPEED - MIN_SPEED);
    (Mode::Active, speed.clamp(MIN_SPEED, MAX_SPEED))
}

/// `base / speed`, floored at `min_delay`.
///
/// A zero, negative or non-finite speed leaves `base` unscaled.
pub fn frame_delay(base: Duration, speed: f64, min_delay: Duration) -> Duration {
    let scaled = if speed > 0.0 && speed.is_finite() {
        // Whole nanoseconds, so 50ms / 1.25 is exactly 40ms
        Duration::from_nanos((base.as_nanos() as f64 / speed).round() as u64)
    } else {
        base
    };
    scaled.max(min_delay)
}

/// Cursor state owned by the render loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaybackState {
    pub cursor: usize,
    pub last_mode: Option<Mode>,
}

/// What a single tick decided.
#[derive(Clone, Debug, PartialEq)]
pub struct Tick {
    pub mode: Mode,
    pub speed: f64,
    /// Index of `frame` within the selected book
    pub index: usize,
    pub frame: IconFrame,
    /// How long to wait before the next tick
    pub delay: Duration,
    /// True when this tick started a different book
    pub switched: bool,
}

/// Owns the two flipbooks and the playback cursor.
#[derive(Debug)]
pub struct AnimationEngine {
    idle: Option<Flipbook>,
    active: Option<Flipbook>,
    timing: Timing,
    state: PlaybackState,
}

impl AnimationEngine {
    pub fn new(idle: Option<Flipbook>, active: Option<Flipbook>, timing: Timing) -> Self {
        Self {
            idle,
            active,
            timing,
            state: PlaybackState::default(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    fn book(&self, mode: Mode) -> Option<&Flipbook> {
        match mode {
            Mode::Idle => self.idle.as_ref(),
            Mode::Active => self.active.as_ref(),
        }
        .filter(|book| !book.is_empty())
    }

    /// Run one iteration of the playback state machine without sleeping.
    ///
    /// # Errors
    /// [`EngineError::MissingBook`] when the book for the selected mode was not
    /// loaded. The mode change is still recorded, so the book restarts from its
    /// first frame once it is available again.
    pub fn tick(&mut self, cpu: f64) -> Result<Tick, EngineError> {
        let (mode, speed) = select_mode(cpu);

        let switched = self.state.last_mode != Some(mode);
        if switched {
            self.state.cursor = 0;
            self.state.last_mode = Some(mode);
        }

        let book = self.book(mode).ok_or(EngineError::MissingBook(mode))?;
        let len = book.len();
        let frame_rate = book.frame_rate();

        let index = self.state.cursor % len;
        let frame = book.frames()[index].clone();

        let delay = frame_delay(frame_rate, speed, self.timing.min_delay);
        self.state.cursor = (index + 1) % len;

        Ok(Tick {
            mode,
            speed,
            index,
            frame,
            delay,
            switched,
        })
    }

    /// Render loop: tick, emit, sleep, until `shutdown` fires.
    ///
    /// Nothing that goes wrong in steady state ends the loop. Missing books and
    /// sink failures are logged and playback carries on.
    pub async fn run<S: IconSink>(
        mut self,
        sample: SharedSample,
        mut sink: S,
        mut shutdown: Shutdown,
    ) {
        debug!(timing = ?self.timing, "render loop started");
        loop {
            let cpu = sample.load();
            let wait = match self.tick(cpu) {
                Ok(tick) => {
                    if tick.switched {
                        match tick.mode {
                            Mode::Idle => info!("switched to idle mode (CPU: {cpu:.1}%)"),
                            Mode::Active => info!(
                                "switched to active mode (CPU: {cpu:.1}%, speed: {:.2}x)",
                                tick.speed
                            ),
                        }
                    }
                    if !tick.frame.is_empty() {
                        if let Err(err) = sink.set_icon(tick.frame.as_bytes()) {
                            warn!(frame = tick.index, "icon update failed: {err}");
                        }
                    }
                    tick.delay
                }
                Err(err) => {
                    warn!("{err}");
                    self.timing.missing_book_wait
                }
            };

            if shutdown.sleep(wait).await {
                break;
            }
        }
        debug!("render loop stopped");
    }
}
