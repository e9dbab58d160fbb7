//! Microphone capture using cpal

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use hound::{WavSpec, WavWriter};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::Settings;

use super::AudioCapture;

type SharedWriter = Arc<Mutex<Option<WavWriter<std::io::BufWriter<std::fs::File>>>>>;

/// Level that maps to 0.0; anything quieter is treated as silence
const FLOOR_DB: f32 = -50.0;

/// Convert a buffer of samples to a level in `0.0..=1.0`.
///
/// RMS in dBFS, mapped linearly from [`FLOOR_DB`] (0.0) to 0 dBFS (1.0).
pub fn normalized_level(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&s| {
            let v = s as f64 / i16::MAX as f64;
            v * v
        })
        .sum();
    let rms = (sum_squares / samples.len() as f64).sqrt() as f32;
    if rms <= 0.0 {
        return 0.0;
    }

    let db = 20.0 * rms.log10();
    ((db - FLOOR_DB) / -FLOOR_DB).clamp(0.0, 1.0)
}

/// Records the default (or configured) input device to a temporary WAV file
/// and tracks the loudest buffer seen during the take.
pub struct MicrophoneCapture {
    writer: SharedWriter,

    stream: Option<Stream>,

    recording: Arc<AtomicBool>,

    /// Peak normalized level of the current take, stored as `f32` bits
    peak_level: Arc<AtomicU32>,

    voice_threshold: f32,

    sample_rate: u32,

    channels: u16,

    device_name: String,

    temp_dir: PathBuf,

    output_path: Option<PathBuf>,
}

impl MicrophoneCapture {
    pub fn new(settings: &Settings) -> Self {
        Self {
            writer: Arc::new(Mutex::new(None)),
            stream: None,
            recording: Arc::new(AtomicBool::new(false)),
            peak_level: Arc::new(AtomicU32::new(0f32.to_bits())),
            voice_threshold: settings.audio.voice_activity_threshold,
            sample_rate: settings.audio.sample_rate,
            channels: settings.audio.channels,
            device_name: settings.audio.device.clone(),
            temp_dir: std::env::temp_dir(),
            output_path: None,
        }
    }

    /// Peak level reached during the current take
    pub fn peak_level(&self) -> f32 {
        f32::from_bits(self.peak_level.load(Ordering::SeqCst))
    }

    fn select_device(&self, host: &cpal::Host) -> Result<cpal::Device> {
        if !self.device_name.is_empty() {
            let found = host
                .input_devices()
                .context("Failed to enumerate input devices")?
                .find(|device| device.name().map(|n| n == self.device_name).unwrap_or(false));

            match found {
                Some(device) => return Ok(device),
                None => tracing::warn!(
                    "Input device '{}' not found, using default",
                    self.device_name
                ),
            }
        }

        host.default_input_device()
            .context("No input device available")
    }

    fn finalize_writer(&self) -> Result<()> {
        if let Ok(mut guard) = self.writer.lock() {
            if let Some(writer) = guard.take() {
                writer.finalize().context("Failed to finalize WAV file")?;
            }
        }
        Ok(())
    }
}

impl AudioCapture for MicrophoneCapture {
    fn start(&mut self) -> Result<()> {
        if self.is_recording() {
            anyhow::bail!("Already recording");
        }

        let host = cpal::default_host();
        let device = self.select_device(&host)?;

        tracing::info!("Using audio device: {}", device.name().unwrap_or_default());

        let supported_configs = device
            .supported_input_configs()
            .context("Failed to get supported configs")?;
        let config = find_suitable_config(supported_configs, self.sample_rate, self.channels)?;

        tracing::debug!(
            "Audio config: {} Hz, {} channels, {:?}",
            config.sample_rate().0,
            config.channels(),
            config.sample_format()
        );

        let stream_config = StreamConfig {
            channels: config.channels(),
            sample_rate: config.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        let output_path = self
            .temp_dir
            .join(format!("scrivener-{}.wav", uuid::Uuid::new_v4()));

        let spec = WavSpec {
            channels: config.channels(),
            sample_rate: config.sample_rate().0,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = WavWriter::create(&output_path, spec)
            .with_context(|| format!("Failed to create WAV file: {}", output_path.display()))?;

        if let Ok(mut guard) = self.writer.lock() {
            *guard = Some(writer);
        }
        self.output_path = Some(output_path.clone());
        self.peak_level.store(0f32.to_bits(), Ordering::SeqCst);
        self.recording.store(true, Ordering::SeqCst);

        let writer = self.writer.clone();
        let recording = self.recording.clone();
        let peak = self.peak_level.clone();

        let built = match config.sample_format() {
            SampleFormat::I8 => build_stream::<i8>(&device, &stream_config, writer, recording, peak),
            SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, writer, recording, peak),
            SampleFormat::I32 => build_stream::<i32>(&device, &stream_config, writer, recording, peak),
            SampleFormat::U8 => build_stream::<u8>(&device, &stream_config, writer, recording, peak),
            SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, writer, recording, peak),
            SampleFormat::U32 => build_stream::<u32>(&device, &stream_config, writer, recording, peak),
            SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, writer, recording, peak),
            SampleFormat::F64 => build_stream::<f64>(&device, &stream_config, writer, recording, peak),
            format => Err(anyhow::anyhow!("Unsupported sample format: {:?}", format)),
        };

        let started = built.and_then(|stream| {
            stream.play().context("Failed to start audio stream")?;
            Ok(stream)
        });

        match started {
            Ok(stream) => {
                self.stream = Some(stream);
                tracing::info!("Recording to {}", output_path.display());
                Ok(())
            }
            Err(e) => {
                self.recording.store(false, Ordering::SeqCst);
                let _ = self.finalize_writer();
                let _ = std::fs::remove_file(&output_path);
                self.output_path = None;
                Err(e)
            }
        }
    }

    fn stop(&mut self) -> Result<PathBuf> {
        self.recording.store(false, Ordering::SeqCst);
        self.stream.take();

        let path = self.output_path.take().context("Not recording")?;
        if let Err(e) = self.finalize_writer() {
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }

        tracing::info!("Recording stopped (peak level {:.2})", self.peak_level());
        Ok(path)
    }

    fn had_voice_activity(&self) -> bool {
        self.peak_level() > self.voice_threshold
    }

    fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }
}

impl Drop for MicrophoneCapture {
    fn drop(&mut self) {
        if let Ok(path) = self.stop() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Find a suitable audio configuration
fn find_suitable_config(
    configs: cpal::SupportedInputConfigs,
    target_sample_rate: u32,
    target_channels: u16,
) -> Result<cpal::SupportedStreamConfig> {
    let configs: Vec<_> = configs.collect();
    let supports_rate = |config: &cpal::SupportedStreamConfigRange| {
        config.min_sample_rate().0 <= target_sample_rate
            && config.max_sample_rate().0 >= target_sample_rate
    };

    if let Some(config) = configs
        .iter()
        .find(|c| c.channels() == target_channels && supports_rate(c))
    {
        return Ok(config
            .clone()
            .with_sample_rate(cpal::SampleRate(target_sample_rate)));
    }

    if let Some(config) = configs.iter().find(|c| supports_rate(c)) {
        return Ok(config
            .clone()
            .with_sample_rate(cpal::SampleRate(target_sample_rate)));
    }

    configs
        .into_iter()
        .next()
        .map(|c| c.with_max_sample_rate())
        .context("No supported audio configuration found")
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    writer: SharedWriter,
    recording: Arc<AtomicBool>,
    peak: Arc<AtomicU32>,
) -> Result<Stream>
where
    T: cpal::Sample + cpal::SizedSample + 'static,
    i16: cpal::FromSample<T>,
{
    let err_fn = |err| tracing::error!("Audio stream error: {}", err);
    let mut buffer: Vec<i16> = Vec::new();

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            if !recording.load(Ordering::SeqCst) {
                return;
            }

            buffer.clear();
            buffer.extend(data.iter().map(|&s| -> i16 { cpal::Sample::from_sample(s) }));

            let level = normalized_level(&buffer);
            if level > f32::from_bits(peak.load(Ordering::Relaxed)) {
                peak.store(level.to_bits(), Ordering::Relaxed);
            }

            if let Ok(mut guard) = writer.lock() {
                if let Some(ref mut writer) = *guard {
                    for &sample in &buffer {
                        if writer.write_sample(sample).is_err() {
                            break;
                        }
                    }
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_is_zero() {
        assert_eq!(normalized_level(&[]), 0.0);
        assert_eq!(normalized_level(&[0; 512]), 0.0);
    }

    #[test]
    fn full_scale_is_one() {
        let samples: Vec<i16> = (0..512)
            .map(|i| if i % 2 == 0 { i16::MAX } else { -i16::MAX })
            .collect();
        assert!((normalized_level(&samples) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn quiet_hiss_stays_below_default_threshold() {
        // ~ -60 dBFS
        let samples = vec![33i16; 512];
        assert!(normalized_level(&samples) < 0.33);
    }

    #[test]
    fn speech_level_crosses_default_threshold() {
        // ~ -12 dBFS
        let samples: Vec<i16> = (0..512)
            .map(|i| if i % 2 == 0 { 8000 } else { -8000 })
            .collect();
        assert!(normalized_level(&samples) > 0.33);
    }

    #[test]
    fn new_capture_is_idle_and_silent() {
        let capture = MicrophoneCapture::new(&Settings::default());
        assert!(!capture.is_recording());
        assert!(!capture.had_voice_activity());
    }
}
