//! Application constants and configuration values

/// Level and threshold constants (percent scale)
pub mod levels {
    /// Default warning threshold in percent
    pub const DEFAULT_WARNING_LEVEL: f32 = 20.0;
    /// Default alarm threshold in percent
    pub const DEFAULT_ALARM_LEVEL: f32 = 30.0;
    /// Scale factor from peak amplitude (0.0-1.0) to percent
    pub const PEAK_SCALE: f32 = 100.0;
}

/// Sampling and smoothing constants
pub mod sampling {
    /// Default moving median window size in samples
    pub const DEFAULT_WINDOW_SIZE: usize = 20;
    /// Default sampling interval in milliseconds
    pub const DEFAULT_INTERVAL_MS: u64 = 100;
}

/// Audio capture constants
pub mod audio {
    /// Buffer size for audio streams
    pub const BUFFER_SIZE: cpal::BufferSize = cpal::BufferSize::Default;
    /// Preferred channel count for capture
    pub const DEFAULT_CHANNELS: u16 = 1;
}

/// Settings persistence constants
pub mod settings {
    /// Default path of the persisted settings file
    pub const FILE_NAME: &str = "screamguard_settings.json";
}

/// UI display constants
pub mod ui {
    /// UI update interval in milliseconds
    pub const UPDATE_INTERVAL_MS: u64 = 50;
    /// Bar width calculation accounts for borders
    pub const BAR_BORDER_WIDTH: usize = 2;
}
