// TickClock - Periodic tick generator on a dedicated thread
//
// Deadlines are absolute (previous deadline + period) so sleep jitter does
// not accumulate. Each period is read from the shared BPM just before its
// callback runs, so a tempo change made inside the callback applies from the
// following tick on, without resetting phase.

use super::timeline::tick_period;
use crate::audio::parameters::AtomicF32;
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// If the callback falls this many periods behind, the clock resyncs to
/// "now" instead of firing a burst of catch-up ticks.
const MAX_LAG_PERIODS: u32 = 4;

pub struct TickClock {
    ticks_per_beat: u32,
    bpm: AtomicF32,
    running: Arc<AtomicBool>,
    fired: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl TickClock {
    pub fn new(bpm: f32, ticks_per_beat: u32) -> Self {
        Self {
            ticks_per_beat: ticks_per_beat.max(1),
            bpm: AtomicF32::new(bpm),
            running: Arc::new(AtomicBool::new(false)),
            fired: Arc::new(AtomicU64::new(0)),
            handle: None,
        }
    }

    pub fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    pub fn bpm(&self) -> f32 {
        self.bpm.get()
    }

    /// Change the rate; applies from the next period on
    pub fn set_bpm(&self, bpm: f32) {
        self.bpm.set(bpm);
    }

    /// Handle on the rate, for reprogramming the clock from its own callback
    pub fn bpm_handle(&self) -> AtomicF32 {
        self.bpm.clone()
    }

    /// Current tick period: 60 / (max(1, bpm) · ticks_per_beat)
    pub fn tick_period(&self) -> Duration {
        tick_period(self.bpm.get(), self.ticks_per_beat)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ticks fired since construction
    pub fn ticks_fired(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }

    /// Start firing `callback` once per period; the first tick fires immediately
    ///
    /// The callback runs on the clock thread and must not block.
    /// Calling `start` on a running clock is a no-op.
    pub fn start<F>(&mut self, mut callback: F) -> std::io::Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        if self.is_running() {
            return Ok(());
        }
        // A previous thread that exited on its own still needs joining
        self.join_thread();

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let fired = Arc::clone(&self.fired);
        let bpm = self.bpm.clone();
        let ticks_per_beat = self.ticks_per_beat;

        let spawned = thread::Builder::new()
            .name("tick-clock".to_string())
            .spawn(move || {
                let mut deadline = Instant::now();
                while running.load(Ordering::Acquire) {
                    let period = tick_period(bpm.get(), ticks_per_beat);
                    callback();
                    fired.fetch_add(1, Ordering::Relaxed);

                    deadline += period;

                    let now = Instant::now();
                    if now > deadline && now - deadline > period * MAX_LAG_PERIODS {
                        warn!(
                            "Tick clock fell {:?} behind, resynchronizing",
                            now - deadline
                        );
                        deadline = now;
                    }

                    // park_timeout may wake early; stop() unparks us on purpose
                    while running.load(Ordering::Acquire) {
                        let now = Instant::now();
                        if now >= deadline {
                            break;
                        }
                        thread::park_timeout(deadline - now);
                    }
                }
                debug!("Tick clock thread exiting");
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    /// Stop firing; returns once the clock thread has exited
    /// (unless called from the clock thread itself)
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.join_thread();
    }

    fn join_thread(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            // Called from inside the callback: the loop exits on its own
            return;
        }
        handle.thread().unpark();
        if handle.join().is_err() {
            warn!("Tick clock thread panicked");
        }
    }
}

impl Drop for TickClock {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_period_follows_bpm() {
        let clock = TickClock::new(120.0, 4);
        assert_eq!(clock.tick_period(), Duration::from_millis(125));

        clock.set_bpm(60.0);
        assert_eq!(clock.tick_period(), Duration::from_millis(250));

        clock.set_bpm(0.0);
        assert_eq!(clock.tick_period(), Duration::from_secs(15));
    }

    #[test]
    fn test_clock_fires_and_stops() {
        // 300 BPM × 20 ticks/beat = 10ms period
        let mut clock = TickClock::new(300.0, 20);
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        clock
            .start(move || {
                count_clone.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
        assert!(clock.is_running());

        thread::sleep(Duration::from_millis(200));
        clock.stop();
        assert!(!clock.is_running());

        let fired = count.load(Ordering::Relaxed);
        // ~20 expected; generous bounds for loaded CI machines
        assert!(fired >= 5, "only {} ticks fired", fired);
        assert!(fired <= 40, "{} ticks fired", fired);

        // No more ticks after stop
        thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::Relaxed), fired);
        assert_eq!(clock.ticks_fired(), fired as u64);
    }

    #[test]
    fn test_start_twice_is_noop() {
        let mut clock = TickClock::new(300.0, 20);
        let count = Arc::new(AtomicUsize::new(0));
        let a = Arc::clone(&count);
        let b = Arc::clone(&count);

        clock.start(move || {
            a.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        clock.start(move || {
            b.fetch_add(1000, Ordering::Relaxed);
        })
        .unwrap();

        thread::sleep(Duration::from_millis(50));
        clock.stop();
        assert!(count.load(Ordering::Relaxed) < 1000);
    }

    #[test]
    fn test_rate_change_from_callback_applies_after_current_tick() {
        // 300 BPM × 20 ticks/beat = 10ms; the first callback drops to 20 BPM × 20 = 150ms
        let mut clock = TickClock::new(300.0, 20);
        let bpm = clock.bpm_handle();
        let stamps = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let stamps_clone = Arc::clone(&stamps);

        clock
            .start(move || {
                let mut stamps = stamps_clone.lock();
                stamps.push(Instant::now());
                if stamps.len() == 1 {
                    bpm.set(20.0);
                }
            })
            .unwrap();

        thread::sleep(Duration::from_millis(100));
        clock.stop();

        // Tick 1 still came after the old 10ms period, tick 2 waits 150ms
        let stamps = stamps.lock();
        assert_eq!(stamps.len(), 2, "{} ticks fired", stamps.len());
        assert!(stamps[1] - stamps[0] < Duration::from_millis(80));
    }

    #[test]
    fn test_stop_wakes_long_period() {
        // 20 BPM × 1 tick/beat = 3s period; stop must not wait for it
        let mut clock = TickClock::new(20.0, 1);
        clock.start(|| {}).unwrap();
        thread::sleep(Duration::from_millis(20));

        let before = Instant::now();
        clock.stop();
        assert!(before.elapsed() < Duration::from_secs(1));
    }
}
