// PatternEngine - Ties the tick clock to rolling bars, instruments and the sink
//
// Threads:
// - tick thread (TickClock): polls every track, renders hits, hands buffers
//   to the sink, advances the global tick counter, applies tempo changes
//   at bar boundaries
// - control thread: start/stop/tempo/enable/toggle/window
//
// Each track's RollingBar sits behind its own lock, so a roll and an edit
// can never interleave. Locks are held for a handful of instructions only.

use super::bar::Bar;
use super::clock::TickClock;
use super::rolling_bar::RollingBar;
use super::timeline::{GridShape, Tempo};
use super::{SequencerError, SequencerResult};
use crate::audio::buffer::HitBuffer;
use crate::audio::parameters::AtomicF32;
use crate::audio::sink::AudioSink;
use crate::messaging::channels::NotificationProducer;
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::synth::instrument::BeatInstrument;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Everything needed to create one track
pub struct TrackSpec {
    pub id: String,
    pub template: Arc<Bar>,
    pub instrument: Box<dyn BeatInstrument>,
    pub gain: f32,
    pub enabled: bool,
}

/// Visualization snapshot of one track
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackWindow {
    /// `grid_len` past ticks followed by `grid_len` future ticks
    pub ticks: Vec<bool>,
    /// Index of the next tick to play (== grid_len)
    pub center_index: usize,
}

struct Track {
    id: String,
    gain: f32,
    bar: Mutex<RollingBar>,
    instrument: Mutex<Box<dyn BeatInstrument>>,
}

/// State shared between the control side and the tick thread
struct EngineCore {
    shape: GridShape,
    tracks: Vec<Track>,
    sink: Arc<dyn AudioSink>,
    tick: AtomicU64,
    running: AtomicBool,
    desired_bpm: AtomicF32,
    active_bpm: AtomicF32,
    /// Shared with the TickClock: writing it reprograms the period
    clock_bpm: AtomicF32,
    notifications: Mutex<Option<NotificationProducer>>,
}

impl EngineCore {
    fn track(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|track| track.id == id)
    }

    /// One tick of work: poll, render, schedule, advance, reconcile tempo
    fn process_tick(&self) {
        let sample_rate = self.sink.output_sample_rate();
        let tick = self.tick.load(Ordering::Acquire);

        for track in &self.tracks {
            let hit = track.bar.lock().next_tick();
            if !hit {
                continue;
            }

            let buffer = {
                let mut instrument = track.instrument.lock();
                let frames = instrument.max_hit_samples(sample_rate);
                let mut buffer = HitBuffer::silent(tick, 1, frames);
                instrument.render(buffer.samples_mut(), 0, sample_rate, frames, track.gain);
                buffer
            };

            if let Err(e) = self.sink.schedule(buffer) {
                warn!("Dropped {} hit at tick {}: {}", track.id, tick, e);
                self.notify(Notification::warning(
                    NotificationCategory::Audio,
                    format!("Dropped {} hit: {}", track.id, e),
                ));
            }
        }

        let counter = self.tick.fetch_add(1, Ordering::AcqRel) + 1;
        if counter % self.shape.grid_len() as u64 == 0 {
            self.reconcile_tempo(counter);
        }
    }

    /// Bar boundary: the desired tempo becomes the active one
    fn reconcile_tempo(&self, counter: u64) {
        let desired = self.desired_bpm.get();
        if self.active_bpm.get() != desired {
            let previous = self.active_bpm.replace(desired);
            self.clock_bpm.set(desired);
            debug!(
                "Tempo {:.1} -> {:.1} BPM at bar {}",
                previous,
                desired,
                self.shape.bar_index(counter)
            );
        }
    }

    /// Push a notification without ever blocking
    fn notify(&self, notification: Notification) {
        if let Some(mut guard) = self.notifications.try_lock()
            && let Some(tx) = guard.as_mut()
        {
            let _ = ringbuf::traits::Producer::try_push(tx, notification);
        }
    }
}

pub struct PatternEngine {
    core: Arc<EngineCore>,
    clock: Mutex<TickClock>,
}

impl PatternEngine {
    /// Build an engine; every configuration problem is reported here
    pub fn new(
        shape: GridShape,
        bpm: f32,
        tracks: Vec<TrackSpec>,
        sink: Arc<dyn AudioSink>,
    ) -> SequencerResult<Self> {
        let mut seen = HashSet::new();
        let mut built = Vec::with_capacity(tracks.len());

        for spec in tracks {
            if spec.id.trim().is_empty() {
                return Err(SequencerError::Configuration(
                    "track id must not be empty".to_string(),
                ));
            }
            if !seen.insert(spec.id.clone()) {
                return Err(SequencerError::Configuration(format!(
                    "duplicate track id '{}'",
                    spec.id
                )));
            }
            if spec.template.shape() != shape {
                return Err(SequencerError::Configuration(format!(
                    "track '{}' template is {} ticks, grid {} expects {}",
                    spec.id,
                    spec.template.len(),
                    shape,
                    shape.grid_len()
                )));
            }
            if !spec.gain.is_finite() || spec.gain < 0.0 {
                return Err(SequencerError::Configuration(format!(
                    "track '{}' gain must be a non-negative number (got {})",
                    spec.id, spec.gain
                )));
            }

            built.push(Track {
                bar: Mutex::new(RollingBar::new(spec.template, spec.enabled)),
                instrument: Mutex::new(spec.instrument),
                id: spec.id,
                gain: spec.gain,
            });
        }

        let sample_rate = sink.output_sample_rate();
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(SequencerError::Configuration(format!(
                "sink sample rate must be positive (got {})",
                sample_rate
            )));
        }

        let tempo = Tempo::clamped(bpm);
        let clock = TickClock::new(tempo.bpm(), shape.ticks_per_beat());

        let core = EngineCore {
            shape,
            tracks: built,
            sink,
            tick: AtomicU64::new(0),
            running: AtomicBool::new(false),
            desired_bpm: AtomicF32::new(tempo.bpm()),
            active_bpm: AtomicF32::new(tempo.bpm()),
            clock_bpm: clock.bpm_handle(),
            notifications: Mutex::new(None),
        };

        info!(
            "Pattern engine ready: grid {}, {} tracks, {}",
            shape,
            core.tracks.len(),
            tempo
        );

        Ok(Self {
            core: Arc::new(core),
            clock: Mutex::new(clock),
        })
    }

    /// Route engine warnings/errors to a notification channel
    pub fn attach_notifications(&self, producer: NotificationProducer) {
        *self.core.notifications.lock() = Some(producer);
    }

    /// Stopped → Running
    ///
    /// Primes every track, rewinds the tick counter and starts the clock at
    /// the desired tempo. No-op when already running. If the sink cannot
    /// accept buffers the engine stays stopped.
    pub fn start(&self) -> SequencerResult<()> {
        let mut clock = self.clock.lock();
        if self.core.running.load(Ordering::Acquire) {
            return Ok(());
        }

        if let Err(e) = self.core.sink.check_ready() {
            warn!("Cannot start playback: {}", e);
            self.core.notify(Notification::error(
                NotificationCategory::Audio,
                format!("Cannot start playback: {}", e),
            ));
            return Err(e.into());
        }

        self.prime();
        clock.set_bpm(self.core.active_bpm.get());
        self.core.running.store(true, Ordering::Release);

        let core = Arc::clone(&self.core);
        let started = clock.start(move || {
            if core.running.load(Ordering::Acquire) {
                core.process_tick();
            }
        });
        if let Err(e) = started {
            self.core.running.store(false, Ordering::Release);
            return Err(e.into());
        }

        info!("Playback started at {:.1} BPM", self.core.active_bpm.get());
        Ok(())
    }

    /// Running → Stopped; silences the sink, keeps the tick counter
    pub fn stop(&self) {
        let mut clock = self.clock.lock();
        if !self.core.running.swap(false, Ordering::AcqRel) {
            return;
        }
        clock.stop();
        self.core.sink.silence();
        info!("Playback stopped at tick {}", self.current_tick());
    }

    pub fn is_running(&self) -> bool {
        self.core.running.load(Ordering::Acquire)
    }

    /// Prepare for playback without starting the clock
    ///
    /// Every track's first bar reflects its enabled flag, the tick counter
    /// is zero and the desired tempo is active. `start()` does this itself;
    /// call it directly before driving the engine with `step()`.
    pub fn prime(&self) {
        for track in &self.core.tracks {
            track.bar.lock().prime_current_to_template();
        }
        self.core.tick.store(0, Ordering::Release);
        let bpm = self.core.desired_bpm.get();
        self.core.active_bpm.set(bpm);
        self.core.clock_bpm.set(bpm);
    }

    /// Process exactly one tick on the calling thread
    ///
    /// Offline rendering and tests drive the engine with this instead of the
    /// clock. Works whether or not the clock is running.
    pub fn step(&self) {
        self.core.process_tick();
    }

    /// Store a new desired tempo (clamped to 20–300 BPM)
    ///
    /// The clock keeps its rate until the next bar boundary.
    /// Returns the tempo actually stored.
    pub fn set_bpm(&self, bpm: f32) -> f32 {
        if !bpm.is_finite() {
            warn!("Ignoring non-finite tempo {}", bpm);
            return self.core.desired_bpm.get();
        }
        let tempo = Tempo::clamped(bpm);
        self.core.desired_bpm.set(tempo.bpm());
        debug!("Desired tempo set to {}", tempo);
        tempo.bpm()
    }

    pub fn desired_bpm(&self) -> f32 {
        self.core.desired_bpm.get()
    }

    /// Tempo of the bar currently playing
    pub fn active_bpm(&self) -> f32 {
        self.core.active_bpm.get()
    }

    /// Rate the tick clock is programmed with
    pub fn clock_bpm(&self) -> f32 {
        self.core.clock_bpm.get()
    }

    /// Enable or disable a track from the next bar on
    /// Returns false for an unknown track.
    pub fn set_enabled(&self, track_id: &str, enabled: bool) -> bool {
        match self.core.track(track_id) {
            Some(track) => {
                track.bar.lock().set_enabled(enabled);
                debug!("Track {} {}", track_id, if enabled { "enabled" } else { "disabled" });
                true
            }
            None => {
                self.unknown_track(track_id);
                false
            }
        }
    }

    pub fn is_enabled(&self, track_id: &str) -> bool {
        self.core
            .track(track_id)
            .is_some_and(|track| track.bar.lock().is_enabled())
    }

    /// Flip one tick of a track's next bar
    ///
    /// Only audible for enabled tracks: on a disabled track the edit is kept
    /// in its template (heard once re-enabled) and false is returned.
    /// Returns false for unknown tracks and out-of-range indices.
    pub fn toggle_next_bar_tick(&self, track_id: &str, index: usize) -> bool {
        let Some(track) = self.core.track(track_id) else {
            self.unknown_track(track_id);
            return false;
        };

        let mut bar = track.bar.lock();
        if bar.is_enabled() {
            let toggled = bar.toggle_next_bar_tick(index);
            if !toggled {
                debug!("Ignoring toggle of {} at invalid tick {}", track_id, index);
            }
            toggled
        } else {
            bar.toggle_template_tick(index);
            false
        }
    }

    /// Past/future window around the cursor of a track
    /// Unknown tracks yield an empty window.
    pub fn window_for_instrument(&self, track_id: &str) -> TrackWindow {
        match self.core.track(track_id) {
            Some(track) => {
                let ticks = track.bar.lock().display();
                TrackWindow {
                    ticks,
                    center_index: self.core.shape.grid_len(),
                }
            }
            None => {
                self.unknown_track(track_id);
                TrackWindow::default()
            }
        }
    }

    /// Copy of a track's template pattern
    pub fn template_for_instrument(&self, track_id: &str) -> Option<Arc<Bar>> {
        self.core
            .track(track_id)
            .map(|track| Arc::clone(track.bar.lock().template()))
    }

    /// Global tick counter (ticks processed since the last start)
    pub fn current_tick(&self) -> u64 {
        self.core.tick.load(Ordering::Acquire)
    }

    pub fn grid_shape(&self) -> GridShape {
        self.core.shape
    }

    pub fn track_ids(&self) -> Vec<&str> {
        self.core.tracks.iter().map(|track| track.id.as_str()).collect()
    }

    pub fn sample_rate(&self) -> f32 {
        self.core.sink.output_sample_rate()
    }

    /// Recovered locally: reported, never returned
    fn unknown_track(&self, track_id: &str) {
        let error = SequencerError::UnknownTrack(track_id.to_string());
        warn!("{}", error);
        self.core.notify(Notification::warning(
            NotificationCategory::Sequencer,
            error.to_string(),
        ));
    }
}

impl Drop for PatternEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sink::CaptureSink;
    use crate::synth::instrument::{InstrumentKind, NoiseSource};

    fn engine_with(sink: Arc<CaptureSink>) -> PatternEngine {
        let shape = GridShape::four_by_four();
        let tracks = vec![
            TrackSpec {
                id: "kick".to_string(),
                template: Bar::from_hits(shape, &[0, 8]).unwrap(),
                instrument: InstrumentKind::Kick.build(NoiseSource::seeded(1)),
                gain: 1.0,
                enabled: true,
            },
            TrackSpec {
                id: "snare".to_string(),
                template: Bar::from_hits(shape, &[4, 12]).unwrap(),
                instrument: InstrumentKind::Snare.build(NoiseSource::seeded(2)),
                gain: 0.5,
                enabled: false,
            },
        ];
        PatternEngine::new(shape, 120.0, tracks, sink).unwrap()
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let shape = GridShape::four_by_four();
        let spec = || TrackSpec {
            id: "kick".to_string(),
            template: Bar::empty(shape),
            instrument: InstrumentKind::Kick.build(NoiseSource::seeded(1)),
            gain: 1.0,
            enabled: true,
        };
        let sink = Arc::new(CaptureSink::new(48000.0));
        let result = PatternEngine::new(shape, 120.0, vec![spec(), spec()], sink);
        assert!(matches!(result, Err(SequencerError::Configuration(_))));
    }

    #[test]
    fn test_rejects_template_of_other_shape() {
        let shape = GridShape::four_by_four();
        let spec = TrackSpec {
            id: "kick".to_string(),
            template: Bar::empty(GridShape::new(3, 4).unwrap()),
            instrument: InstrumentKind::Kick.build(NoiseSource::seeded(1)),
            gain: 1.0,
            enabled: true,
        };
        let sink = Arc::new(CaptureSink::new(48000.0));
        assert!(PatternEngine::new(shape, 120.0, vec![spec], sink).is_err());
    }

    #[test]
    fn test_step_schedules_primed_hits() {
        let sink = Arc::new(CaptureSink::new(48000.0));
        let engine = engine_with(Arc::clone(&sink));
        engine.prime();

        for _ in 0..16 {
            engine.step();
        }

        assert_eq!(engine.current_tick(), 16);
        assert_eq!(sink.hit_ticks(), vec![0, 8]);

        let hits = sink.take_hits();
        let kick_frames = InstrumentKind::Kick
            .build(NoiseSource::seeded(1))
            .max_hit_samples(48000.0);
        assert_eq!(hits[0].frames(), kick_frames);
        assert!(hits[0].peak() > 0.1);
    }

    #[test]
    fn test_unknown_track_is_ignored() {
        let sink = Arc::new(CaptureSink::new(48000.0));
        let engine = engine_with(sink);
        let (tx, mut rx) = crate::messaging::create_notification_channel(8);
        engine.attach_notifications(tx);

        assert!(!engine.set_enabled("cowbell", true));
        assert!(!engine.toggle_next_bar_tick("cowbell", 0));
        assert_eq!(engine.window_for_instrument("cowbell"), TrackWindow::default());
        assert!(!engine.is_enabled("cowbell"));

        let notifications = crate::messaging::channels::drain_notifications(&mut rx);
        assert!(!notifications.is_empty());
        assert_eq!(notifications[0].category, NotificationCategory::Sequencer);
        assert_eq!(notifications[0].message, "Unknown track: cowbell");
    }

    #[test]
    fn test_set_bpm_clamps() {
        let sink = Arc::new(CaptureSink::new(48000.0));
        let engine = engine_with(sink);

        assert_eq!(engine.set_bpm(1000.0), 300.0);
        assert_eq!(engine.set_bpm(5.0), 20.0);
        assert_eq!(engine.set_bpm(f32::NAN), 20.0);
        assert_eq!(engine.active_bpm(), 120.0);
    }

    #[test]
    fn test_start_fails_when_sink_unavailable() {
        let sink = Arc::new(CaptureSink::new(48000.0));
        sink.set_available(false);
        let engine = engine_with(Arc::clone(&sink));

        assert!(matches!(
            engine.start(),
            Err(SequencerError::SinkUnavailable(_))
        ));
        assert!(!engine.is_running());
    }
}
