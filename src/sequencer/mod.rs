// Sequencer module - Tick clock, bar patterns, rolling windows and the pattern engine
// Everything between "a tick fired" and "a hit buffer was handed to the sink"

pub mod bar;
pub mod clock;
pub mod engine;
pub mod rolling_bar;
pub mod timeline;

pub use bar::{Bar, BarIter};
pub use clock::TickClock;
pub use engine::{PatternEngine, TrackSpec, TrackWindow};
pub use rolling_bar::RollingBar;
pub use timeline::{GridShape, Tempo};

use crate::audio::sink::SinkError;
use thiserror::Error;

/// Sequencer-related errors
#[derive(Debug, Error)]
pub enum SequencerError {
    /// Invalid grid dimensions, template length mismatch, duplicate track ids...
    /// Always fatal at construction time.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Tick index {index} out of range for a {len}-tick bar")]
    InvalidIndex { index: usize, len: usize },

    #[error("Unknown track: {0}")]
    UnknownTrack(String),

    #[error("Audio sink unavailable: {0}")]
    SinkUnavailable(#[from] SinkError),

    #[error("Tick clock thread error: {0}")]
    ClockThread(#[from] std::io::Error),
}

pub type SequencerResult<T> = Result<T, SequencerError>;
