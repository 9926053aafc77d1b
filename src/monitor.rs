//! Monitoring session loop: sample, smooth, classify, signal

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::classify::{Classification, classify};
use crate::constants;
use crate::overlay::{OverlayController, OverlaySink};
use crate::smoothing::MedianFilter;

/// Failure reading the current level from a device
#[derive(Debug)]
pub enum ReadError {
    /// Momentary failure; the tick is skipped and monitoring continues
    Transient(String),
    /// The device is gone; the session ends gracefully
    Disconnected(String),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Transient(msg) => write!(f, "device read failed: {}", msg),
            ReadError::Disconnected(msg) => write!(f, "device unavailable: {}", msg),
        }
    }
}

/// Source of peak amplitude readings in the 0.0-1.0 range
pub trait LevelSource {
    fn friendly_name(&self) -> &str;
    fn peak_level(&mut self) -> Result<f32, ReadError>;
}

/// Receives per-tick status updates
pub trait StatusSink {
    fn publish(&self, report: TickReport);
}

impl StatusSink for tokio::sync::watch::Sender<TickReport> {
    fn publish(&self, report: TickReport) {
        self.send_replace(report);
    }
}

/// Outcome of one monitoring tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Status line for the UI; empty while idle
    pub message: String,
    /// Smoothed level in percent, if a sample was taken
    pub level: Option<f32>,
    pub classification: Option<Classification>,
}

impl TickReport {
    /// Report shown when no session is active
    pub fn idle() -> Self {
        Self::default()
    }

    fn notice(message: String) -> Self {
        Self {
            message,
            level: None,
            classification: None,
        }
    }
}

/// Immutable configuration snapshot captured at session start
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub warning_level: f32,
    pub alarm_level: f32,
    pub window_size: usize,
    pub sampling_interval: Duration,
}

/// One monitoring session's state: the sample window and the overlay
/// indicator it drives.
pub struct Monitor<S: OverlaySink> {
    config: MonitorConfig,
    filter: MedianFilter,
    controller: OverlayController<S>,
}

impl<S: OverlaySink> Monitor<S> {
    pub fn new(config: MonitorConfig, sink: S) -> Self {
        let filter = MedianFilter::new(config.window_size);
        Self {
            config,
            filter,
            controller: OverlayController::new(sink),
        }
    }

    /// Take one sample and push the result through the pipeline: scale to
    /// percent, smooth, classify, update the overlay, format the status line.
    pub fn tick(&mut self, source: &mut dyn LevelSource) -> Result<TickReport, ReadError> {
        let peak = source.peak_level()?;
        let level = peak * constants::levels::PEAK_SCALE;
        self.filter.push(level);
        let median = self.filter.median();
        let classification = classify(median, self.config.warning_level, self.config.alarm_level);
        self.controller.apply(classification);
        Ok(TickReport {
            message: classification.message(source.friendly_name(), median),
            level: Some(median),
            classification: Some(classification),
        })
    }

    /// End-of-session cleanup: hide overlays and discard the window
    pub fn finish(&mut self) {
        self.controller.reset();
        self.filter.clear();
    }

    pub fn sampling_interval(&self) -> Duration {
        self.config.sampling_interval
    }

    #[cfg(test)]
    fn window_len(&self) -> usize {
        self.filter.len()
    }
}

/// Run a monitoring session until `active` is cleared or the device goes
/// away.
///
/// The flag is checked at the top of every iteration, so a stop request
/// takes effect within one sampling interval. Cleanup always runs before
/// returning: overlays are hidden and the sample window is discarded. A
/// transient read failure skips the tick; a disconnect ends the session with
/// a user-visible notice instead of tearing down the process.
pub async fn run<S, L, T>(mut monitor: Monitor<S>, mut source: L, active: Arc<AtomicBool>, status: T)
where
    S: OverlaySink,
    L: LevelSource,
    T: StatusSink,
{
    let mut interval = tokio::time::interval(monitor.sampling_interval());
    // The first interval tick completes immediately
    interval.tick().await;

    while active.load(Ordering::SeqCst) {
        match monitor.tick(&mut source) {
            Ok(report) => status.publish(report),
            Err(err @ ReadError::Transient(_)) => {
                log::warn!("skipping sample: {}", err);
            }
            Err(err @ ReadError::Disconnected(_)) => {
                log::error!("{}", err);
                active.store(false, Ordering::SeqCst);
                monitor.finish();
                status.publish(TickReport::notice(format!("Monitoring stopped: {}", err)));
                return;
            }
        }
        interval.tick().await;
    }

    monitor.finish();
    status.publish(TickReport::idle());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{Severity, SharedOverlay};
    use std::collections::VecDeque;
    use tokio::sync::watch;

    struct ScriptedSource {
        name: &'static str,
        readings: VecDeque<Result<f32, ReadError>>,
        fallback: f32,
    }

    impl ScriptedSource {
        fn new(name: &'static str, peaks: &[f32]) -> Self {
            Self {
                name,
                readings: peaks.iter().map(|&p| Ok(p)).collect(),
                fallback: 0.0,
            }
        }

        /// Source that reports the same peak forever
        fn steady(name: &'static str, peak: f32) -> Self {
            Self {
                name,
                readings: VecDeque::new(),
                fallback: peak,
            }
        }
    }

    impl LevelSource for ScriptedSource {
        fn friendly_name(&self) -> &str {
            self.name
        }

        fn peak_level(&mut self) -> Result<f32, ReadError> {
            self.readings.pop_front().unwrap_or(Ok(self.fallback))
        }
    }

    fn test_config(window_size: usize) -> MonitorConfig {
        MonitorConfig {
            warning_level: 20.0,
            alarm_level: 30.0,
            window_size,
            sampling_interval: Duration::from_millis(1),
        }
    }

    #[test]
    fn quiet_input_reports_normal() {
        let overlay = SharedOverlay::new();
        let mut monitor = Monitor::new(test_config(3), overlay.clone());
        let mut source = ScriptedSource::new("DeviceX", &[0.1, 0.1, 0.1]);

        let mut last = TickReport::idle();
        for _ in 0..3 {
            last = monitor.tick(&mut source).unwrap();
        }

        assert_eq!(last.message, "DeviceX is at 10.00%");
        assert_eq!(last.classification, Some(Classification::Normal));
        assert_eq!(overlay.current(), None);
    }

    #[test]
    fn sustained_loud_input_raises_the_alarm_overlay() {
        let overlay = SharedOverlay::new();
        let mut monitor = Monitor::new(test_config(3), overlay.clone());
        let mut source = ScriptedSource::new("DeviceX", &[0.1, 0.1, 0.1, 0.5, 0.5, 0.5]);

        let mut last = TickReport::idle();
        for _ in 0..6 {
            last = monitor.tick(&mut source).unwrap();
        }

        assert_eq!(last.message, "ALARM! DeviceX is too loud at 50.00%");
        assert_eq!(last.classification, Some(Classification::Alarm));
        assert_eq!(overlay.current(), Some(Severity::Alarm));
    }

    #[test]
    fn alarm_clears_once_quiet_samples_dominate_the_window() {
        let overlay = SharedOverlay::new();
        let mut monitor = Monitor::new(test_config(3), overlay.clone());
        // Window after four ticks is [50, 10, 10], median 10
        let mut source = ScriptedSource::new("DeviceX", &[0.5, 0.5, 0.1, 0.1]);

        let mut last = TickReport::idle();
        for _ in 0..4 {
            last = monitor.tick(&mut source).unwrap();
        }

        assert_eq!(last.level, Some(10.0));
        assert_eq!(last.classification, Some(Classification::Normal));
        assert_eq!(overlay.current(), None);
    }

    #[test]
    fn transient_read_failure_skips_the_tick() {
        let overlay = SharedOverlay::new();
        let mut monitor = Monitor::new(test_config(3), overlay.clone());
        let mut source = ScriptedSource::new("DeviceX", &[]);
        source
            .readings
            .push_back(Err(ReadError::Transient("busy".to_string())));
        source.readings.push_back(Ok(0.1));

        assert!(monitor.tick(&mut source).is_err());
        assert_eq!(monitor.window_len(), 0);

        let report = monitor.tick(&mut source).unwrap();
        assert_eq!(report.level, Some(10.0));
        assert_eq!(monitor.window_len(), 1);
    }

    #[test]
    fn finish_clears_window_and_overlay() {
        let overlay = SharedOverlay::new();
        let mut monitor = Monitor::new(test_config(3), overlay.clone());
        let mut source = ScriptedSource::steady("DeviceX", 0.5);

        monitor.tick(&mut source).unwrap();
        monitor.tick(&mut source).unwrap();
        assert_eq!(overlay.current(), Some(Severity::Alarm));

        monitor.finish();
        assert_eq!(monitor.window_len(), 0);
        assert_eq!(overlay.current(), None);
    }

    #[tokio::test]
    async fn stop_flag_ends_the_session_and_clears_state() {
        let overlay = SharedOverlay::new();
        let monitor = Monitor::new(test_config(3), overlay.clone());
        let source = ScriptedSource::steady("DeviceX", 0.9);
        let active = Arc::new(AtomicBool::new(true));
        let (tx, rx) = watch::channel(TickReport::idle());

        let task = tokio::spawn(run(monitor, source, Arc::clone(&active), tx));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(overlay.current(), Some(Severity::Alarm));

        active.store(false, Ordering::SeqCst);
        task.await.unwrap();

        assert_eq!(overlay.current(), None);
        assert_eq!(*rx.borrow(), TickReport::idle());
    }

    #[tokio::test]
    async fn device_removal_stops_the_session_with_a_notice() {
        let overlay = SharedOverlay::new();
        let monitor = Monitor::new(test_config(3), overlay.clone());
        let mut source = ScriptedSource::new("DeviceX", &[0.9]);
        source
            .readings
            .push_back(Err(ReadError::Disconnected("unplugged".to_string())));
        let active = Arc::new(AtomicBool::new(true));
        let (tx, rx) = watch::channel(TickReport::idle());

        run(monitor, source, Arc::clone(&active), tx).await;

        assert!(!active.load(Ordering::SeqCst));
        assert_eq!(overlay.current(), None);
        let report = rx.borrow().clone();
        assert!(report.message.starts_with("Monitoring stopped:"), "{}", report.message);
        assert_eq!(report.level, None);
    }
}
