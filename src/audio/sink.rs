// Audio sinks - Where rendered hits go
//
// The sequencer never waits on a sink: `schedule()` hands a buffer over
// and returns. A failed handoff drops that hit, playback continues.

use crate::audio::buffer::HitBuffer;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("audio output unavailable: {0}")]
    Unavailable(String),

    #[error("audio device error: {0}")]
    Device(String),

    #[error("audio output queue is full")]
    Full,
}

/// Output collaborator of the pattern engine
pub trait AudioSink: Send + Sync {
    /// Sample rate hits must be rendered at
    fn output_sample_rate(&self) -> f32;

    /// Accept one fully rendered hit for immediate playback
    fn schedule(&self, buffer: HitBuffer) -> Result<(), SinkError>;

    /// Whether the sink can currently accept buffers (checked on start)
    fn check_ready(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Cut every hit that is still sounding
    fn silence(&self) {}
}

/// In-memory sink recording every scheduled hit
///
/// Used for offline rendering and tests. Can be switched unavailable to
/// simulate a lost output device.
pub struct CaptureSink {
    sample_rate: f32,
    hits: Mutex<Vec<HitBuffer>>,
    available: AtomicBool,
    silence_count: AtomicUsize,
}

impl CaptureSink {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            hits: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            silence_count: AtomicUsize::new(0),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Remove and return all captured hits, in scheduling order
    pub fn take_hits(&self) -> Vec<HitBuffer> {
        std::mem::take(&mut *self.hits.lock())
    }

    pub fn hit_count(&self) -> usize {
        self.hits.lock().len()
    }

    /// Ticks of the captured hits, in scheduling order
    pub fn hit_ticks(&self) -> Vec<u64> {
        self.hits.lock().iter().map(HitBuffer::tick).collect()
    }

    /// Number of times `silence()` was requested
    pub fn silence_count(&self) -> usize {
        self.silence_count.load(Ordering::Relaxed)
    }
}

impl AudioSink for CaptureSink {
    fn output_sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn schedule(&self, buffer: HitBuffer) -> Result<(), SinkError> {
        if !self.available.load(Ordering::Acquire) {
            return Err(SinkError::Unavailable("capture sink disabled".to_string()));
        }
        self.hits.lock().push(buffer);
        Ok(())
    }

    fn check_ready(&self) -> Result<(), SinkError> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(SinkError::Unavailable("capture sink disabled".to_string()))
        }
    }

    fn silence(&self) {
        self.silence_count.fetch_add(1, Ordering::Relaxed);
    }
}
