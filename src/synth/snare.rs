// Snare drum - Decaying noise burst with a faint tonal body

use super::instrument::{BeatInstrument, NoiseSource, render_span};
use crate::audio::dsp_utils::{exp_decay, linear_attack};
use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnareParams {
    pub amplitude: f32,
    pub duration: f32,
    /// Body tone frequency (Hz)
    pub tone_freq: f32,
    /// Share of noise in the mix; the tone gets the rest
    pub noise_mix: f32,
    pub decay: f32,
    pub attack: f32,
}

impl Default for SnareParams {
    fn default() -> Self {
        Self {
            amplitude: 0.7,
            duration: 0.2,
            tone_freq: 185.0,
            noise_mix: 0.9,
            decay: 0.045,
            attack: 0.001,
        }
    }
}

pub struct Snare {
    params: SnareParams,
    noise: NoiseSource,
}

impl Snare {
    pub fn new(noise: NoiseSource) -> Self {
        Self::with_params(SnareParams::default(), noise)
    }

    pub fn with_params(params: SnareParams, noise: NoiseSource) -> Self {
        Self { params, noise }
    }
}

impl BeatInstrument for Snare {
    fn name(&self) -> &'static str {
        "snare"
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

        for (i, out) in buffer[offset_samples..offset_samples + count]
            .iter_mut()
            .enumerate()
        {
            let t = i as f32 / sample_rate;
            let envelope = exp_decay(t, p.decay) * linear_attack(t, p.attack);
            let body = (TAU * p.tone_freq * t).sin();
            let sample = self.noise.next_sample() * p.noise_mix + body * (1.0 - p.noise_mix);
            *out += sample * envelope * p.amplitude * gain;
        }
    }
}
