// Timeline - Grid shape and tempo
// Converts between ticks, beats, bars and wall-clock time

use super::{SequencerError, SequencerResult};
use std::fmt;
use std::time::Duration;

/// Shape of one bar: `beats_per_bar × ticks_per_beat` slots
/// Example: 4/4 with sixteenth-note resolution = GridShape { 4, 4 } = 16 ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridShape {
    beats_per_bar: u32,
    ticks_per_beat: u32,
}

impl GridShape {
    /// Creates a new grid shape, rejecting zero dimensions
    pub fn new(beats_per_bar: u32, ticks_per_beat: u32) -> SequencerResult<Self> {
        if beats_per_bar == 0 || ticks_per_beat == 0 {
            return Err(SequencerError::Configuration(format!(
                "grid dimensions must be positive (got {} beats x {} ticks)",
                beats_per_bar, ticks_per_beat
            )));
        }
        Ok(Self {
            beats_per_bar,
            ticks_per_beat,
        })
    }

    /// Common 4 beats × 4 ticks (sixteenth notes) grid
    pub fn four_by_four() -> Self {
        Self {
            beats_per_bar: 4,
            ticks_per_beat: 4,
        }
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    pub fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    /// Number of ticks in one bar
    pub fn grid_len(&self) -> usize {
        self.beats_per_bar as usize * self.ticks_per_beat as usize
    }

    /// Position of a global tick inside its bar
    pub fn tick_in_bar(&self, tick: u64) -> usize {
        (tick % self.grid_len() as u64) as usize
    }

    /// Bar index of a global tick (0-based)
    pub fn bar_index(&self, tick: u64) -> u64 {
        tick / self.grid_len() as u64
    }
}

impl Default for GridShape {
    fn default() -> Self {
        Self::four_by_four()
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.beats_per_bar, self.ticks_per_beat)
    }
}

/// Tempo in BPM, always inside [MIN_BPM, MAX_BPM]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    bpm: f32,
}

impl Tempo {
    pub const MIN_BPM: f32 = 20.0;
    pub const MAX_BPM: f32 = 300.0;
    pub const DEFAULT_BPM: f32 = 120.0;

    /// Creates a tempo, clamping into the supported range
    /// Non-finite input falls back to the default tempo
    pub fn clamped(bpm: f32) -> Self {
        let bpm = if bpm.is_finite() {
            bpm.clamp(Self::MIN_BPM, Self::MAX_BPM)
        } else {
            Self::DEFAULT_BPM
        };
        Self { bpm }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Duration of one beat in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm as f64
    }

    /// Duration of one tick at the given resolution
    pub fn tick_period(&self, ticks_per_beat: u32) -> Duration {
        tick_period(self.bpm, ticks_per_beat)
    }

    /// Duration of one bar in seconds
    pub fn bar_duration_seconds(&self, shape: &GridShape) -> f64 {
        self.beat_duration_seconds() * shape.beats_per_bar() as f64
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::clamped(Self::DEFAULT_BPM)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// Tick period = 60 / (max(1, bpm) · ticks_per_beat) seconds
///
/// This is the raw clock formula: it does not clamp to the tempo range,
/// only guards against zero/negative rates.
pub fn tick_period(bpm: f32, ticks_per_beat: u32) -> Duration {
    let bpm = if bpm.is_finite() { bpm.max(1.0) } else { 1.0 };
    let ticks_per_beat = ticks_per_beat.max(1);
    Duration::from_secs_f64(60.0 / (bpm as f64 * ticks_per_beat as f64))
}
