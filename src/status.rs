//! Periodic status text (tray menu title and tooltip) built from the latest CPU sample.

use crate::sample::SharedSample;
use crate::shutdown::Shutdown;
use crate::sink::StatusSink;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// One status refresh: the raw CPU reading. The formatters round it to one decimal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatusLine {
    pub cpu: f64,
}

impl StatusLine {
    pub fn new(cpu: f64) -> Self {
        Self { cpu }
    }

    /// Short label for a disabled menu entry, e.g. `CPU: 12.3%`.
    pub fn menu_title(&self) -> String {
        format!("CPU: {:.1}%", self.cpu)
    }

    /// Hover text for the tray icon.
    pub fn tooltip(&self) -> String {
        format!("CPU usage: {:.1}%", self.cpu)
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.menu_title())
    }
}

/// Push a [`StatusLine`] to `sink` every `period` until shutdown.
///
/// Sink failures are logged and the loop keeps going.
pub async fn run_status<S: StatusSink>(
    sample: SharedSample,
    mut sink: S,
    period: Duration,
    mut shutdown: Shutdown,
) {
    debug!(?period, "status loop started");
    loop {
        let line = StatusLine::new(sample.load());
        if let Err(err) = sink.set_status(&line) {
            warn!("status update failed: {err}");
        }
        if shutdown.sleep(period).await {
            break;
        }
    }
    debug!("status loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown;
    use crate::sink::SinkError;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl StatusSink for Recorder {
        fn set_status(&mut self, status: &StatusLine) -> Result<(), SinkError> {
            self.0.lock().unwrap().push(status.menu_title());
            Ok(())
        }
    }

    #[test]
    fn test_formats_one_decimal() {
        let line = StatusLine::new(12.345);
        assert_eq!(line.menu_title(), "CPU: 12.3%");
        assert_eq!(line.tooltip(), "CPU usage: 12.3%");
        assert_eq!(StatusLine::new(0.0).to_string(), "CPU: 0.0%");
        assert_eq!(StatusLine::new(100.0).to_string(), "CPU: 100.0%");
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_loop_follows_sample_and_stops() {
        let sample = SharedSample::new();
        sample.store(37.5);
        let recorder = Recorder::default();
        let (trigger, listener) = shutdown::channel();

        let task = tokio::spawn(run_status(
            sample.clone(),
            recorder.clone(),
            Duration::from_secs(1),
            listener,
        ));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        sample.store(80.0);
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.trigger();
        task.await.unwrap();

        let lines = recorder.0.lock().unwrap().clone();
        assert_eq!(lines[0], "CPU: 37.5%");
        assert_eq!(lines[1], "CPU: 37.5%");
        assert_eq!(lines[2], "CPU: 80.0%");
    }
}
