//! Level classification against warning and alarm thresholds

/// Severity of a smoothed level reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Classification {
    Normal,
    Warning,
    Alarm,
}

/// Classify a level against the two thresholds.
///
/// Alarm is checked first so it wins when both thresholds are exceeded, and
/// equality counts as a crossing. There is no hysteresis: a single sample
/// above or below a threshold moves the classification immediately.
pub fn classify(level: f32, warning_level: f32, alarm_level: f32) -> Classification {
    if level >= alarm_level {
        Classification::Alarm
    } else if level >= warning_level {
        Classification::Warning
    } else {
        Classification::Normal
    }
}

impl Classification {
    /// Status line for this classification at the given smoothed level
    pub fn message(&self, device_name: &str, level: f32) -> String {
        match self {
            Classification::Normal => format!("{} is at {:.2}%", device_name, level),
            Classification::Warning => {
                format!("WARNING: {} is getting loud at {:.2}%", device_name, level)
            }
            Classification::Alarm => {
                format!("ALARM! {} is too loud at {:.2}%", device_name, level)
            }
        }
    }
}
