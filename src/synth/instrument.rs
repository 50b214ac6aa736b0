// BeatInstrument - Procedural drum voice contract
// One call renders one complete hit into a caller-provided buffer

use super::hihat::HiHat;
use super::kick::Kick;
use super::snare::Snare;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A procedural percussion voice
///
/// Implementations are pure functions of their arguments and fixed timbral
/// parameters; the only internal state is the noise source.
pub trait BeatInstrument: Send {
    /// Instrument name (used in logs)
    fn name(&self) -> &'static str;

    /// Length of one hit in seconds
    fn hit_duration(&self) -> f32;

    /// Length of one hit in samples at `sample_rate`
    fn max_hit_samples(&self, sample_rate: f32) -> usize {
        (self.hit_duration() * sample_rate).ceil().max(0.0) as usize
    }

    /// Additively mix one hit into `buffer`, starting at `offset_samples`
    ///
    /// Writes at most `min(max_samples - offset_samples, hit samples)` samples,
    /// all scaled by `gain`, and never touches anything outside
    /// `[0, min(max_samples, buffer.len()))`.
    fn render(
        &mut self,
        buffer: &mut [f32],
        offset_samples: usize,
        sample_rate: f32,
        max_samples: usize,
        gain: f32,
    );
}

/// Number of samples a render may write
pub fn render_span(
    buffer_len: usize,
    offset_samples: usize,
    max_samples: usize,
    hit_samples: usize,
) -> usize {
    max_samples
        .min(buffer_len)
        .saturating_sub(offset_samples)
        .min(hit_samples)
}

/// White noise source for drum textures
///
/// Seeded sources are reproducible (tests, offline export); the default
/// source draws its seed from the OS.
#[derive(Debug, Clone)]
pub struct NoiseSource {
    rng: StdRng,
}

impl NoiseSource {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform sample in [-1, 1)
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        self.rng.gen_range(-1.0f32..1.0)
    }
}

impl Default for NoiseSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Built-in instrument algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    Kick,
    Snare,
    #[serde(alias = "hat")]
    HiHat,
}

impl InstrumentKind {
    /// Instantiate the instrument with its stock parameters
    pub fn build(self, noise: NoiseSource) -> Box<dyn BeatInstrument> {
        match self {
            InstrumentKind::Kick => Box::new(Kick::new(noise)),
            InstrumentKind::Snare => Box::new(Snare::new(noise)),
            InstrumentKind::HiHat => Box::new(HiHat::new(noise)),
        }
    }

    pub fn all() -> [InstrumentKind; 3] {
        [
            InstrumentKind::Kick,
            InstrumentKind::Snare,
            InstrumentKind::HiHat,
        ]
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstrumentKind::Kick => "kick",
            InstrumentKind::Snare => "snare",
            InstrumentKind::HiHat => "hihat",
        };
        write!(f, "{}", name)
    }
}
