// Loop export - Offline rendering of a kit to a WAV file
//
// The engine is driven tick by tick with `step()` into a CaptureSink, as fast
// as possible. Every hit is mixed at the sample position of its tick; tails
// that run past the end of the loop wrap around to its start so the file
// loops seamlessly.

use crate::audio::dsp_utils::soft_clip;
use crate::audio::format_conversion::f32_to_i16;
use crate::audio::sink::CaptureSink;
use crate::kit::{KitConfig, KitError};
use hound::{WavSpec, WavWriter};
use log::info;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Invalid export settings: {0}")]
    InvalidSettings(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error(transparent)]
    Kit(#[from] KitError),
}

#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub sample_rate: u32,
    /// Number of whole bars in the loop
    pub bars: u32,
    /// 1 = mono, 2 = stereo (same signal on both channels)
    pub channels: u16,
    /// Noise seed, identical seeds give identical files
    pub seed: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bars: 2,
            channels: 2,
            seed: 0x5eed,
        }
    }
}

/// What was written
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub frames: usize,
    pub hits: usize,
    pub duration_seconds: f64,
}

/// Renders a kit's loop offline
pub struct LoopExporter {
    settings: ExportSettings,
}

impl LoopExporter {
    pub fn new(settings: ExportSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Render the loop as mono f32 samples, before clipping
    ///
    /// Returns the samples and the number of hits mixed in.
    pub fn render(&self, kit: &KitConfig) -> Result<(Vec<f32>, usize), ExportError> {
        if self.settings.bars == 0 {
            return Err(ExportError::InvalidSettings("bars must be > 0".to_string()));
        }
        if self.settings.sample_rate == 0 {
            return Err(ExportError::InvalidSettings(
                "sample rate must be > 0".to_string(),
            ));
        }

        let sample_rate = self.settings.sample_rate as f64;
        let sink = Arc::new(CaptureSink::new(self.settings.sample_rate as f32));
        let engine = kit.build_engine(sink.clone(), Some(self.settings.seed))?;
        let shape = engine.grid_shape();
        let total_ticks = self.settings.bars as u64 * shape.grid_len() as u64;

        engine.prime();

        // Tick start positions follow the tempo active at each tick
        let mut tick_starts = Vec::with_capacity(total_ticks as usize);
        let mut position = 0.0f64;
        for _ in 0..total_ticks {
            tick_starts.push(position.round() as usize);
            let ticks_per_minute = engine.active_bpm() as f64 * shape.ticks_per_beat() as f64;
            position += 60.0 * sample_rate / ticks_per_minute;
            engine.step();
        }

        let length = position.round() as usize;
        if length == 0 {
            return Err(ExportError::InvalidSettings(format!(
                "{} Hz is too low to hold {} bar(s) at {:.1} BPM",
                self.settings.sample_rate,
                self.settings.bars,
                engine.active_bpm()
            )));
        }
        let mut mix = vec![0.0f32; length];
        let hits = sink.take_hits();

        for hit in &hits {
            let Some(&start) = tick_starts.get(hit.tick() as usize) else {
                continue;
            };
            for (i, &sample) in hit.samples().iter().enumerate() {
                mix[(start + i) % length] += sample;
            }
        }

        Ok((mix, hits.len()))
    }

    /// Render and write a 16-bit PCM WAV file
    pub fn export_wav<P: AsRef<Path>>(
        &self,
        kit: &KitConfig,
        path: P,
    ) -> Result<ExportSummary, ExportError> {
        let channels = self.settings.channels;
        if channels == 0 || channels > 2 {
            return Err(ExportError::InvalidSettings(format!(
                "channels must be 1 or 2 (got {})",
                channels
            )));
        }

        let (mix, hits) = self.render(kit)?;

        let spec = WavSpec {
            channels,
            sample_rate: self.settings.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path.as_ref(), spec)?;
        for &sample in &mix {
            let value = f32_to_i16(soft_clip(sample));
            for _ in 0..channels {
                writer.write_sample(value)?;
            }
        }
        writer.finalize()?;

        let summary = ExportSummary {
            frames: mix.len(),
            hits,
            duration_seconds: mix.len() as f64 / self.settings.sample_rate as f64,
        };
        info!(
            "Exported {} ({} hits, {:.2}s)",
            path.as_ref().display(),
            summary.hits,
            summary.duration_seconds
        );
        Ok(summary)
    }
}
