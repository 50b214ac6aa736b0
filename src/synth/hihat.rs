// Hi-hat - Very short high-passed noise burst

use super::instrument::{BeatInstrument, NoiseSource, render_span};
use crate::audio::dsp_utils::{exp_decay, linear_attack};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HiHatParams {
    pub amplitude: f32,
    pub duration: f32,
    /// Fraction of the previous noise sample subtracted (first-order high-pass)
    pub high_pass: f32,
    pub decay: f32,
    pub attack: f32,
}

impl Default for HiHatParams {
    fn default() -> Self {
        Self {
            amplitude: 0.3,
            duration: 0.07,
            high_pass: 0.9,
            decay: 0.014,
            attack: 0.0005,
        }
    }
}

pub struct HiHat {
    params: HiHatParams,
    noise: NoiseSource,
}

impl HiHat {
    pub fn new(noise: NoiseSource) -> Self {
        Self::with_params(HiHatParams::default(), noise)
    }

    pub fn with_params(params: HiHatParams, noise: NoiseSource) -> Self {
        Self { params, noise }
    }
}

impl BeatInstrument for HiHat {
    fn name(&self) -> &'static str {
        "hihat"
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

        let mut previous = 0.0f32;
        for (i, out) in buffer[offset_samples..offset_samples + count]
            .iter_mut()
            .enumerate()
        {
            let t = i as f32 / sample_rate;
            let noise = self.noise.next_sample();
            let bright = noise - p.high_pass * previous;
            previous = noise;

            let envelope = exp_decay(t, p.decay) * linear_attack(t, p.attack);
            *out += bright * envelope * p.amplitude * gain;
        }
    }
}
