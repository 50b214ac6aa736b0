// DSP utilities - Audio hygiene, envelopes and smoothing
//
// Small building blocks shared by the drum voices and the output mixer.

/// Flush denormals to zero
///
/// Denormal numbers (very close to 0) can cause large CPU slowdowns on some
/// processors. Threshold: 1e-15, far below 32-bit float noise.
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < 1e-15 { 0.0 } else { x }
}

/// Soft clipping with tanh
///
/// Keeps the output inside [-1, 1] with a smooth, musical saturation curve.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    x.tanh()
}

/// Drive-normalized tanh saturation
///
/// `tanh(x · drive) / tanh(drive)`: a full-scale input still peaks at 1.0,
/// smaller inputs get pushed up. A drive of 0 (or less) is a no-op.
#[inline]
pub fn saturate(x: f32, drive: f32) -> f32 {
    if drive <= f32::EPSILON {
        return x;
    }
    (x * drive).tanh() / drive.tanh()
}

/// Exponential decay `e^(-t/τ)`
#[inline]
pub fn exp_decay(t: f32, time_constant: f32) -> f32 {
    if time_constant <= 0.0 {
        return 0.0;
    }
    (-t / time_constant).exp()
}

/// Linear attack ramp from 0 to 1 over `attack` seconds
#[inline]
pub fn linear_attack(t: f32, attack: f32) -> f32 {
    if attack <= 0.0 {
        1.0
    } else {
        (t / attack).min(1.0)
    }
}

/// One-pole smoother (1st order low-pass)
///
/// Smooths abrupt parameter changes to avoid clicks/pops.
///
/// Formula: y[n] = y[n-1] + α * (x[n] - y[n-1])
pub struct OnePoleSmoother {
    current: f32,
    coefficient: f32,
}

impl OnePoleSmoother {
    /// Create a new smoother
    ///
    /// # Arguments
    /// * `initial_value` - Starting value
    /// * `time_constant_ms` - Time to reach ~63% of the target (milliseconds)
    /// * `sample_rate` - Sample rate in Hz
    ///
    /// # Example
    /// ```
    /// use drumloop::audio::dsp_utils::OnePoleSmoother;
    /// // 10ms smoothing at 44.1kHz
    /// let smoother = OnePoleSmoother::new(0.5, 10.0, 44100.0);
    /// assert_eq!(smoother.get(), 0.5);
    /// ```
    pub fn new(initial_value: f32, time_constant_ms: f32, sample_rate: f32) -> Self {
        let time_constant_samples = (time_constant_ms * 0.001 * sample_rate).max(1.0);
        let coefficient = 1.0 / time_constant_samples;

        Self {
            current: initial_value,
            coefficient: coefficient.min(1.0),
        }
    }

    #[inline]
    pub fn process(&mut self, target: f32) -> f32 {
        self.current += self.coefficient * (target - self.current);
        self.current = flush_denormals_to_zero(self.current);
        self.current
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }
}

/// One-sample low-pass used for tonal tilt: y[n] = (1-a)·x[n] + a·y[n-1]
#[derive(Debug, Clone, Copy)]
pub struct OnePoleLowPass {
    amount: f32,
    last: f32,
}

impl OnePoleLowPass {
    /// `amount` in [0, 1): 0 = bypass, closer to 1 = darker
    pub fn new(amount: f32) -> Self {
        Self {
            amount: amount.clamp(0.0, 0.99),
            last: 0.0,
        }
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.last = (1.0 - self.amount) * x + self.amount * self.last;
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_denormals() {
        assert_eq!(flush_denormals_to_zero(1e-20), 0.0);
        assert_eq!(flush_denormals_to_zero(0.1), 0.1);
        assert_eq!(flush_denormals_to_zero(-0.1), -0.1);
    }

    #[test]
    fn test_soft_clip() {
        assert!((soft_clip(0.0) - 0.0).abs() < 0.001);
        assert!((soft_clip(0.5) - 0.462).abs() < 0.01);
        assert!(soft_clip(10.0) <= 1.0);
        assert!(soft_clip(10.0) > 0.99);
        assert!(soft_clip(-10.0) >= -1.0);
    }

    #[test]
    fn test_saturate_normalized() {
        assert!((saturate(1.0, 3.0) - 1.0).abs() < 1e-6);
        assert!((saturate(-1.0, 3.0) + 1.0).abs() < 1e-6);
        // Small signals get boosted
        assert!(saturate(0.2, 3.0) > 0.2);
        assert_eq!(saturate(0.3, 0.0), 0.3);
    }

    #[test]
    fn test_envelope_helpers() {
        assert_eq!(exp_decay(0.0, 0.1), 1.0);
        assert!((exp_decay(0.1, 0.1) - (-1.0f32).exp()).abs() < 1e-6);
        assert_eq!(exp_decay(0.1, 0.0), 0.0);

        assert_eq!(linear_attack(0.0, 0.002), 0.0);
        assert!((linear_attack(0.001, 0.002) - 0.5).abs() < 1e-6);
        assert_eq!(linear_attack(1.0, 0.002), 1.0);
        assert_eq!(linear_attack(0.0, 0.0), 1.0);
    }

    #[test]
    fn test_smoother_convergence() {
        let mut smoother = OnePoleSmoother::new(0.0, 10.0, 44100.0);
        let mut final_value = 0.0;
        for _ in 0..4410 {
            final_value = smoother.process(1.0);
        }
        assert!((final_value - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_lowpass_smooths_step() {
        let mut lp = OnePoleLowPass::new(0.5);
        assert!((lp.process(1.0) - 0.5).abs() < 1e-6);
        assert!((lp.process(1.0) - 0.75).abs() < 1e-6);

        let mut bypass = OnePoleLowPass::new(0.0);
        assert_eq!(bypass.process(0.8), 0.8);
    }
}
