// Hit buffers - One rendered drum hit, handed from the tick thread to a sink

/// Interleaved f32 buffer holding one rendered hit
#[derive(Debug, Clone, PartialEq)]
pub struct HitBuffer {
    /// Global sequencer tick that triggered the hit
    tick: u64,
    channels: u16,
    frames: usize,
    samples: Vec<f32>,
}

impl HitBuffer {
    /// Zero-initialized buffer of `channels × frames` samples
    pub fn silent(tick: u64, channels: u16, frames: usize) -> Self {
        let channels = channels.max(1);
        Self {
            tick,
            channels,
            frames,
            samples: vec![0.0; channels as usize * frames],
        }
    }

    /// Mono buffer wrapping already rendered samples
    pub fn from_mono(tick: u64, samples: Vec<f32>) -> Self {
        Self {
            tick,
            channels: 1,
            frames: samples.len(),
            samples,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Sample of `channel` in `frame`; mono buffers answer for every channel
    #[inline]
    pub fn sample_at(&self, frame: usize, channel: usize) -> f32 {
        if frame >= self.frames {
            return 0.0;
        }
        let channel = channel.min(self.channels as usize - 1);
        self.samples[frame * self.channels as usize + channel]
    }

    /// Peak absolute amplitude
    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }

    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0.0)
    }
}
