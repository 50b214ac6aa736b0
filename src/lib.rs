// drumloop - Library exports for the binary, tests and benchmarks

pub mod audio;
pub mod connection;
pub mod console;
pub mod kit;
pub mod messaging;
pub mod sequencer;
pub mod synth;

// Re-export commonly used types for convenience
pub use audio::buffer::HitBuffer;
pub use audio::engine::{AudioEngine, StreamSink};
pub use audio::export::{ExportError, ExportSettings, LoopExporter};
pub use audio::sink::{AudioSink, CaptureSink, SinkError};
pub use kit::{KitConfig, KitError, TrackConfig};
pub use messaging::channels::create_notification_channel;
pub use sequencer::{
    Bar, GridShape, PatternEngine, RollingBar, SequencerError, Tempo, TickClock, TrackSpec,
    TrackWindow,
};
pub use synth::{BeatInstrument, HiHat, InstrumentKind, Kick, NoiseSource, Snare};
