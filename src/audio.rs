//! Audio device handling and peak level capture

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait};

use crate::error::{AppError, AppResult};
use crate::monitor::{LevelSource, ReadError};

/// Capture configuration and device information
pub struct AudioConfig {
    pub device_name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Find and configure an audio input device
pub fn setup_audio_device(device_name: Option<String>) -> AppResult<(cpal::Device, AudioConfig)> {
    let host = cpal::default_host();

    // Resolve the requested device, or fall back to the system default
    let device = if let Some(name) = device_name {
        host.input_devices()?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| AppError::AudioDevice(format!("input device \"{}\" not found", name)))?
    } else {
        host.default_input_device().ok_or(AppError::NoDevice)?
    };

    let device_name = device.name()?;

    // Get supported input configs and determine sample rate from device
    let mut supported_configs = device.supported_input_configs()?;
    let config_range = supported_configs
        .next()
        .ok_or_else(|| AppError::AudioDevice("No supported input configs found".to_string()))?;

    // Prefer 44.1kHz if supported, otherwise use the minimum supported rate
    let sample_rate =
        if config_range.min_sample_rate().0 <= 44100 && config_range.max_sample_rate().0 >= 44100 {
            44100
        } else {
            config_range.min_sample_rate().0
        };

    let channels = if config_range.channels() >= crate::constants::audio::DEFAULT_CHANNELS {
        crate::constants::audio::DEFAULT_CHANNELS
    } else {
        config_range.channels()
    };

    let audio_config = AudioConfig {
        device_name,
        sample_rate,
        channels,
    };

    Ok((device, audio_config))
}

/// Slots written by the stream callbacks and read by the monitoring task
struct PeakShared {
    peak: Mutex<f32>,
    failure: Mutex<Option<String>>,
}

/// Peak-hold level source backed by a cpal input stream.
///
/// The data callback folds the maximum absolute sample into a shared slot;
/// each `peak_level` call takes the held value and resets it, yielding the
/// peak observed since the previous tick. A stream error marks the source
/// as disconnected.
pub struct MicLevelSource {
    name: String,
    shared: Arc<PeakShared>,
}

impl LevelSource for MicLevelSource {
    fn friendly_name(&self) -> &str {
        &self.name
    }

    fn peak_level(&mut self) -> Result<f32, ReadError> {
        {
            let failure = self
                .shared
                .failure
                .lock()
                .map_err(|_| ReadError::Transient("failure slot poisoned".to_string()))?;
            if let Some(msg) = failure.as_ref() {
                return Err(ReadError::Disconnected(msg.clone()));
            }
        }

        let mut peak = self
            .shared
            .peak
            .lock()
            .map_err(|_| ReadError::Transient("peak slot poisoned".to_string()))?;
        let value = *peak;
        *peak = 0.0;
        Ok(value)
    }
}

/// Build the input stream feeding a `MicLevelSource`.
///
/// The returned stream must stay alive for the source to keep producing
/// readings; dropping it stops capture.
pub fn start_capture(
    device: &cpal::Device,
    audio_config: &AudioConfig,
) -> AppResult<(MicLevelSource, cpal::Stream)> {
    let shared = Arc::new(PeakShared {
        peak: Mutex::new(0.0),
        failure: Mutex::new(None),
    });

    let data_shared = Arc::clone(&shared);
    let error_shared = Arc::clone(&shared);

    let config = cpal::StreamConfig {
        channels: audio_config.channels,
        sample_rate: cpal::SampleRate(audio_config.sample_rate),
        buffer_size: crate::constants::audio::BUFFER_SIZE,
    };

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let max_sample = data.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
            if let Ok(mut peak) = data_shared.peak.lock() {
                *peak = peak.max(max_sample);
            }
        },
        move |err| {
            log::error!("audio stream error: {}", err);
            if let Ok(mut failure) = error_shared.failure.lock() {
                *failure = Some(err.to_string());
            }
        },
        None,
    )?;

    let source = MicLevelSource {
        name: audio_config.device_name.clone(),
        shared,
    };

    Ok((source, stream))
}
