// Synth module - Procedural percussion voices (no samples)

pub mod hihat;
pub mod instrument;
pub mod kick;
pub mod snare;

pub use hihat::{HiHat, HiHatParams};
pub use instrument::{BeatInstrument, InstrumentKind, NoiseSource};
pub use kick::{Kick, KickParams};
pub use snare::{Snare, SnareParams};
