//! # CPU Sampler
//!
//! Feeds [`SharedSample`] with the machine-wide CPU percentage. CPU usage is a
//! difference between two readings, so every measurement refreshes once, waits a
//! short sampling window and refreshes again before reading the value.

use crate::sample::SharedSample;
use crate::shutdown::Shutdown;
use std::time::Duration;
use sysinfo::{CpuExt, System, SystemExt};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampleError {
    #[error("CPU usage unavailable: {0}")]
    Unavailable(String),
}

/// Source of CPU readings.
pub trait CpuProbe: Send {
    /// Take a snapshot of the CPU counters.
    fn refresh(&mut self);

    /// Usage in percent since the previous [`refresh`](CpuProbe::refresh).
    fn usage(&self) -> Result<f64, SampleError>;
}

/// Global CPU usage via `sysinfo`.
pub struct SysinfoProbe {
    system: System,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        Self { system }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuProbe for SysinfoProbe {
    fn refresh(&mut self) {
        self.system.refresh_cpu();
    }

    fn usage(&self) -> Result<f64, SampleError> {
        if self.system.cpus().is_empty() {
            return Err(SampleError::Unavailable("no CPUs reported".to_string()));
        }
        let usage = f64::from(self.system.global_cpu_info().cpu_usage());
        if usage.is_finite() {
            Ok(usage)
        } else {
            Err(SampleError::Unavailable(format!("non-finite reading {usage}")))
        }
    }
}

/// Sampling cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerTiming {
    /// Time between the two refreshes of one measurement
    pub window: Duration,
    /// Pause after publishing a measurement
    pub interval: Duration,
}

impl Default for SamplerTiming {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(500),
            interval: Duration::from_millis(500),
        }
    }
}

/// Measure CPU usage forever (until shutdown) and publish each reading.
///
/// A failed measurement keeps the previous value in `sample`.
pub async fn run_sampler<P: CpuProbe>(
    mut probe: P,
    sample: SharedSample,
    timing: SamplerTiming,
    mut shutdown: Shutdown,
) {
    debug!(?timing, "sampler loop started");
    loop {
        probe.refresh();
        if shutdown.sleep(timing.window).await {
            break;
        }
        probe.refresh();

        match probe.usage() {
            Ok(percent) => sample.store(percent),
            Err(err) => warn!("CPU sample failed: {err}"),
        }

        if shutdown.sleep(timing.interval).await {
            break;
        }
    }
    debug!("sampler loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown;
    use std::collections::VecDeque;

    /// Test helper: replays scripted readings, one per refresh pair
    struct ScriptedProbe {
        readings: VecDeque<Result<f64, SampleError>>,
        current: Result<f64, SampleError>,
        refreshes: usize,
    }

    impl ScriptedProbe {
        fn new(readings: Vec<Result<f64, SampleError>>) -> Self {
            Self {
                readings: readings.into(),
                current: Ok(0.0),
                refreshes: 0,
            }
        }
    }

    impl CpuProbe for ScriptedProbe {
        fn refresh(&mut self) {
            self.refreshes += 1;
            if self.refreshes % 2 == 0 {
                if let Some(next) = self.readings.pop_front() {
                    self.current = next;
                }
            }
        }

        fn usage(&self) -> Result<f64, SampleError> {
            self.current.clone()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_publishes_each_measurement() {
        let sample = SharedSample::new();
        let probe = ScriptedProbe::new(vec![
            Ok(12.0),
            Err(SampleError::Unavailable("flaky".into())),
            Ok(64.0),
        ]);
        let (trigger, listener) = shutdown::channel();
        let timing = SamplerTiming {
            window: Duration::from_millis(100),
            interval: Duration::from_millis(100),
        };

        let task = tokio::spawn(run_sampler(probe, sample.clone(), timing, listener));

        // First reading lands at t=100
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(sample.load(), 12.0);

        // Second measurement (t=300) fails and keeps the old value
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(sample.load(), 12.0);

        // Third lands at t=500
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(sample.load(), 64.0);

        trigger.trigger();
        task.await.unwrap();
    }

    #[test]
    fn test_sysinfo_probe_reports_percentage() {
        let mut probe = SysinfoProbe::new();
        std::thread::sleep(Duration::from_millis(250));
        probe.refresh();
        if let Ok(usage) = probe.usage() {
            assert!(usage >= 0.0, "usage {usage} should not be negative");
        }
    }
}
