// Format conversion - f32 mix to device / file sample formats
//
// The mixer works in f32 internally; conversion happens only when writing
// into the cpal output buffer or the exported WAV file. Allocation-free.

use cpal::{FromSample, Sample};

/// Convert f32 sample to i16
///
/// Maps [-1.0, 1.0] to [i16::MIN, i16::MAX], clamping out-of-range input.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    let clamped = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };

    if clamped >= 0.0 {
        (clamped * i16::MAX as f32) as i16
    } else {
        (clamped * -(i16::MIN as f32)) as i16
    }
}

/// Write one mono sample to every channel of an interleaved output frame
#[inline]
pub fn write_mono_to_interleaved_frame<T>(sample: f32, output_frame: &mut [T])
where
    T: Sample + FromSample<f32>,
{
    for channel_sample in output_frame.iter_mut() {
        *channel_sample = Sample::from_sample::<f32>(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_to_i16_conversion() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.0), i16::MAX);
        assert_eq!(f32_to_i16(-1.0), i16::MIN);
        assert_eq!(f32_to_i16(2.0), i16::MAX);
        assert_eq!(f32_to_i16(-2.0), i16::MIN);
        assert_eq!(f32_to_i16(f32::NAN), 0);
    }

    #[test]
    fn test_write_mono_to_interleaved() {
        let mut output: [f32; 2] = [0.0; 2];
        write_mono_to_interleaved_frame(0.5, &mut output);
        assert_eq!(output, [0.5, 0.5]);

        let mut output_i16: [i16; 2] = [0; 2];
        write_mono_to_interleaved_frame(0.5, &mut output_i16);
        assert!(output_i16[0] > 0);
        assert_eq!(output_i16[0], output_i16[1]);
    }
}
