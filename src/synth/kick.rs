// Kick drum - Swept sine with sub pulse, noise click and tanh drive

use super::instrument::{BeatInstrument, NoiseSource, render_span};
use crate::audio::dsp_utils::{OnePoleLowPass, exp_decay, linear_attack, saturate};
use std::f32::consts::TAU;

/// Timbral constants of the kick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KickParams {
    pub amplitude: f32,
    /// Hit length in seconds
    pub duration: f32,
    /// Sweep start frequency (Hz)
    pub start_freq: f32,
    /// Sweep end frequency (Hz), reached at the end of the hit
    pub end_freq: f32,
    /// Amplitude decay time constant (seconds)
    pub decay: f32,
    pub attack: f32,
    /// Sub pulse pitch relative to the body
    pub sub_ratio: f32,
    pub sub_level: f32,
    pub sub_duration: f32,
    pub click_level: f32,
    pub click_duration: f32,
    /// tanh drive (0 = clean)
    pub drive: f32,
    /// One-sample low-pass amount (0 = bypass)
    pub tone: f32,
}

impl Default for KickParams {
    fn default() -> Self {
        Self {
            amplitude: 0.9,
            duration: 0.45,
            start_freq: 150.0,
            end_freq: 42.0,
            decay: 0.11,
            attack: 0.002,
            sub_ratio: 0.5,
            sub_level: 0.35,
            sub_duration: 0.04,
            click_level: 0.3,
            click_duration: 0.004,
            drive: 2.2,
            tone: 0.2,
        }
    }
}

pub struct Kick {
    params: KickParams,
    noise: NoiseSource,
}

impl Kick {
    pub fn new(noise: NoiseSource) -> Self {
        Self::with_params(KickParams::default(), noise)
    }

    pub fn with_params(params: KickParams, noise: NoiseSource) -> Self {
        Self { params, noise }
    }
}

impl BeatInstrument for Kick {
    fn name(&self) -> &'static str {
        "kick"
    }

    fn hit_duration(&self) -> f32 {
        self.params.duration
    }

    fn render(
        &mut self,
        buffer: &mut [f32],
        offset_samples: usize,
        sample_rate: f32,
        max_samples: usize,
        gain: f32,
    ) {
        let p = self.params;
        let hit_samples = self.max_hit_samples(sample_rate);
        let count = render_span(buffer.len(), offset_samples, max_samples, hit_samples);
        if count == 0 {
            return;
        }

        let mut phase = 0.0f32;
        let mut sub_phase = 0.0f32;
        let mut tone = OnePoleLowPass::new(p.tone);

        for (i, out) in buffer[offset_samples..offset_samples + count]
            .iter_mut()
            .enumerate()
        {
            let t = i as f32 / sample_rate;
            let progress = i as f32 / hit_samples as f32;
            let freq = p.start_freq + (p.end_freq - p.start_freq) * progress;

            let envelope = exp_decay(t, p.decay) * linear_attack(t, p.attack);
            let mut sample = phase.sin() * envelope;

            if t < p.sub_duration {
                let fade = 1.0 - t / p.sub_duration;
                sample += sub_phase.sin() * p.sub_level * fade;
            }

            if t < p.click_duration {
                let fade = 1.0 - t / p.click_duration;
                sample += self.noise.next_sample() * p.click_level * fade;
            }

            let shaped = tone.process(saturate(sample, p.drive));
            *out += shaped * p.amplitude * gain;

            phase = (phase + TAU * freq / sample_rate) % TAU;
            sub_phase = (sub_phase + TAU * freq * p.sub_ratio / sample_rate) % TAU;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48000.0;

    fn peak(buffer: &[f32]) -> f32 {
        buffer.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }

    #[test]
    fn test_kick_length() {
        let kick = Kick::new(NoiseSource::seeded(1));
        assert_eq!(kick.max_hit_samples(SAMPLE_RATE), 21600);
    }

    #[test]
    fn test_kick_decays() {
        let mut kick = Kick::new(NoiseSource::seeded(1));
        let len = kick.max_hit_samples(SAMPLE_RATE);
        let mut buffer = vec![0.0f32; len];
        kick.render(&mut buffer, 0, SAMPLE_RATE, len, 1.0);

        let head = peak(&buffer[..2400]);
        let tail = peak(&buffer[len - 2400..]);
        assert!(head > 0.3);
        assert!(tail < head * 0.1);
        assert!(buffer.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_kick_respects_max_samples() {
        let mut kick = Kick::new(NoiseSource::seeded(1));
        let mut buffer = vec![0.0f32; 30000];
        kick.render(&mut buffer, 1000, SAMPLE_RATE, 2000, 1.0);

        assert!(buffer[..1000].iter().all(|&s| s == 0.0));
        assert!(buffer[2000..].iter().all(|&s| s == 0.0));
        assert!(peak(&buffer[1000..2000]) > 0.0);
    }

    #[test]
    fn test_kick_mixes_additively() {
        let mut kick = Kick::new(NoiseSource::seeded(3));
        let len = kick.max_hit_samples(SAMPLE_RATE);
        let mut single = vec![0.0f32; len];
        kick.render(&mut single, 0, SAMPLE_RATE, len, 0.5);

        let mut kick = Kick::new(NoiseSource::seeded(3));
        let mut doubled = vec![0.25f32; len];
        kick.render(&mut doubled, 0, SAMPLE_RATE, len, 0.5);

        for (a, b) in single.iter().zip(doubled.iter()) {
            assert!((a + 0.25 - b).abs() < 1e-5);
        }
    }
}
