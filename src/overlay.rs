//! Overlay indicator state and control

use std::sync::{Arc, Mutex};

use crate::classify::Classification;

/// Overlay color tag; one indicator exists per severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Alarm,
}

/// Where overlay show/hide commands land
pub trait OverlaySink {
    fn show(&mut self, severity: Severity);
    fn hide(&mut self, severity: Severity);
}

/// Drives at most one overlay indicator at a time.
///
/// The controller tracks its own shown flags instead of relying on the sink
/// being idempotent, so repeated classifications never produce duplicate
/// show or hide calls, and the Warning and Alarm indicators are never
/// visible together.
pub struct OverlayController<S: OverlaySink> {
    sink: S,
    warning_shown: bool,
    alarm_shown: bool,
}

impl<S: OverlaySink> OverlayController<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            warning_shown: false,
            alarm_shown: false,
        }
    }

    /// Transition the overlay indicators to match a classification
    pub fn apply(&mut self, classification: Classification) {
        match classification {
            Classification::Alarm => {
                if self.warning_shown {
                    self.sink.hide(Severity::Warning);
                    self.warning_shown = false;
                }
                if !self.alarm_shown {
                    self.sink.show(Severity::Alarm);
                    self.alarm_shown = true;
                }
            }
            Classification::Warning => {
                if self.alarm_shown {
                    self.sink.hide(Severity::Alarm);
                    self.alarm_shown = false;
                }
                if !self.warning_shown {
                    self.sink.show(Severity::Warning);
                    self.warning_shown = true;
                }
            }
            Classification::Normal => self.reset(),
        }
    }

    /// Hide whichever indicator is currently shown
    pub fn reset(&mut self) {
        if self.warning_shown {
            self.sink.hide(Severity::Warning);
            self.warning_shown = false;
        }
        if self.alarm_shown {
            self.sink.hide(Severity::Alarm);
            self.alarm_shown = false;
        }
    }

    /// Currently shown indicator, if any
    pub fn shown(&self) -> Option<Severity> {
        if self.alarm_shown {
            Some(Severity::Alarm)
        } else if self.warning_shown {
            Some(Severity::Warning)
        } else {
            None
        }
    }
}

/// Thread-safe overlay slot shared between the monitoring task and the
/// renderer. The renderer draws a border in the severity color whenever the
/// slot is occupied.
#[derive(Clone, Default)]
pub struct SharedOverlay {
    visible: Arc<Mutex<Option<Severity>>>,
}

impl SharedOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indicator the renderer should draw, if any
    pub fn current(&self) -> Option<Severity> {
        *self.visible.lock().unwrap()
    }
}

impl OverlaySink for SharedOverlay {
    fn show(&mut self, severity: Severity) {
        *self.visible.lock().unwrap() = Some(severity);
    }

    fn hide(&mut self, severity: Severity) {
        let mut visible = self.visible.lock().unwrap();
        if *visible == Some(severity) {
            *visible = None;
        }
    }
}
