// Kit - RON configuration describing the grid, the tempo and every track

use crate::audio::sink::AudioSink;
use crate::sequencer::{Bar, GridShape, PatternEngine, SequencerError, Tempo, TrackSpec};
use crate::synth::{InstrumentKind, NoiseSource};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    #[error("Invalid kit: {0}")]
    Invalid(String),

    #[error(transparent)]
    Sequencer(#[from] SequencerError),
}

pub type KitResult<T> = Result<T, KitError>;

fn default_gain() -> f32 {
    1.0
}

fn default_enabled() -> bool {
    true
}

/// One track of a kit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackConfig {
    pub id: String,
    pub instrument: InstrumentKind,
    /// One character per tick, e.g. "x...x...": see `Bar::parse`
    pub pattern: String,
    #[serde(default = "default_gain")]
    pub gain: f32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl TrackConfig {
    pub fn new(id: &str, instrument: InstrumentKind, pattern: &str, gain: f32) -> Self {
        Self {
            id: id.to_string(),
            instrument,
            pattern: pattern.to_string(),
            gain,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitConfig {
    pub beats_per_bar: u32,
    pub ticks_per_beat: u32,
    pub bpm: f32,
    pub tracks: Vec<TrackConfig>,
}

impl Default for KitConfig {
    /// Basic rock beat, 4/4 in sixteenths at 120 BPM
    fn default() -> Self {
        Self {
            beats_per_bar: 4,
            ticks_per_beat: 4,
            bpm: Tempo::DEFAULT_BPM,
            tracks: vec![
                TrackConfig::new("kick", InstrumentKind::Kick, "x...x...x...x...", 1.0),
                TrackConfig::new("snare", InstrumentKind::Snare, "....x.......x...", 0.8),
                TrackConfig::new("hihat", InstrumentKind::HiHat, "x.x.x.x.x.x.x.x.", 0.6),
            ],
        }
    }
}

impl KitConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> KitResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let kit = Self::from_ron_str(&text)?;
        info!("Loaded kit {} ({} tracks)", path.display(), kit.tracks.len());
        Ok(kit)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> KitResult<()> {
        fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }

    /// Parse and validate a kit
    pub fn from_ron_str(text: &str) -> KitResult<Self> {
        let kit: KitConfig = ron::from_str(text)?;
        kit.validate()?;
        Ok(kit)
    }

    pub fn to_ron_string(&self) -> KitResult<String> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::new(),
        )?)
    }

    pub fn grid_shape(&self) -> KitResult<GridShape> {
        Ok(GridShape::new(self.beats_per_bar, self.ticks_per_beat)?)
    }

    /// Check everything the engine would reject, with kit-level messages
    pub fn validate(&self) -> KitResult<()> {
        let shape = self.grid_shape()?;

        if !self.bpm.is_finite() {
            return Err(KitError::Invalid(format!("bpm must be a number (got {})", self.bpm)));
        }

        let mut ids = HashSet::new();
        for track in &self.tracks {
            if track.id.trim().is_empty() {
                return Err(KitError::Invalid("track id must not be empty".to_string()));
            }
            if !ids.insert(track.id.as_str()) {
                return Err(KitError::Invalid(format!("duplicate track id '{}'", track.id)));
            }
            if !track.gain.is_finite() || track.gain < 0.0 {
                return Err(KitError::Invalid(format!(
                    "track '{}': gain must be a non-negative number (got {})",
                    track.id, track.gain
                )));
            }
            Bar::parse(shape, &track.pattern).map_err(|e| {
                KitError::Invalid(format!("track '{}': {}", track.id, e))
            })?;
        }

        Ok(())
    }

    /// Instantiate every track
    ///
    /// With a seed, track `i` gets noise seeded with `seed + i` so renders
    /// are reproducible; without one, noise comes from the OS.
    pub fn build_tracks(&self, seed: Option<u64>) -> KitResult<Vec<TrackSpec>> {
        self.validate()?;
        let shape = self.grid_shape()?;

        self.tracks
            .iter()
            .enumerate()
            .map(|(index, track)| -> KitResult<TrackSpec> {
                let noise = match seed {
                    Some(seed) => NoiseSource::seeded(seed.wrapping_add(index as u64)),
                    None => NoiseSource::from_entropy(),
                };
                Ok(TrackSpec {
                    id: track.id.clone(),
                    template: Bar::parse(shape, &track.pattern)?,
                    instrument: track.instrument.build(noise),
                    gain: track.gain,
                    enabled: track.enabled,
                })
            })
            .collect()
    }

    /// Build a stopped engine playing this kit into `sink`
    pub fn build_engine(
        &self,
        sink: Arc<dyn AudioSink>,
        seed: Option<u64>,
    ) -> KitResult<PatternEngine> {
        let tracks = self.build_tracks(seed)?;
        Ok(PatternEngine::new(self.grid_shape()?, self.bpm, tracks, sink)?)
    }
}
