use crate::audio::pcm::AudioBuffer;
use crate::error::AppError;

/// Linear-interpolation resampler for normalized `f32` audio.
/// Used when the output device cannot open at the buffer's own rate.
pub struct Resampler {
    source_rate: u32,
    target_rate: u32,
}

impl Resampler {
    pub fn new(source_rate: u32, target_rate: u32) -> Self {
        Self {
            source_rate,
            target_rate,
        }
    }

    /// Returns true if resampling is needed (rates differ).
    pub fn needs_resampling(&self) -> bool {
        self.source_rate != self.target_rate
    }

    /// Number of output frames produced for `input_len` source frames.
    pub fn output_len(&self, input_len: usize) -> usize {
        if self.source_rate == 0 {
            return 0;
        }
        (input_len as u64 * u64::from(self.target_rate) / u64::from(self.source_rate)) as usize
    }

    /// Resample one channel of samples from source rate to target rate.
    pub fn resample(&self, input: &[f32]) -> Vec<f32> {
        if !self.needs_resampling() {
            return input.to_vec();
        }
        if input.is_empty() {
            return Vec::new();
        }

        let ratio = self.source_rate as f64 / self.target_rate as f64;
        let out_len = self.output_len(input.len());
        let last = input.len() - 1;

        (0..out_len)
            .map(|i| {
                let pos = i as f64 * ratio;
                let idx = (pos.floor() as usize).min(last);
                let next = (idx + 1).min(last);
                let frac = (pos - idx as f64) as f32;
                input[idx] + (input[next] - input[idx]) * frac
            })
            .collect()
    }
}

/// Resample every channel of `buffer` to `target_rate`.
pub fn resample_buffer(buffer: &AudioBuffer, target_rate: u32) -> Result<AudioBuffer, AppError> {
    if target_rate == 0 {
        return Err(AppError::InvalidParameter(
            "Target sample rate must be greater than zero".into(),
        ));
    }
    let resampler = Resampler::new(buffer.sample_rate(), target_rate);
    let channels = (0..buffer.number_of_channels())
        .filter_map(|c| buffer.channel(c))
        .map(|data| resampler.resample(data))
        .collect();
    AudioBuffer::from_channels(target_rate, channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_resampling_needed() {
        let r = Resampler::new(24000, 24000);
        assert!(!r.needs_resampling());
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(r.resample(&input), input);
    }

    #[test]
    fn test_upsample_24k_to_48k() {
        let r = Resampler::new(24000, 48000);
        assert!(r.needs_resampling());
        let output = r.resample(&[0.0, 1.0, 0.0]);
        assert_eq!(output.len(), 6);
        // Midpoint between the first two samples is interpolated
        assert!((output[1] - 0.5).abs() < 1e-6);
        assert_eq!(output[2], 1.0);
    }

    #[test]
    fn test_downsample_48k_to_16k() {
        let r = Resampler::new(48000, 16000);
        let input: Vec<f32> = (0..48).map(|i| i as f32 / 48.0).collect();
        let output = r.resample(&input);
        // 48kHz -> 16kHz is 3:1 ratio
        assert_eq!(output.len(), 16);
        assert_eq!(output[1], input[3]);
    }

    #[test]
    fn test_resample_buffer_keeps_channel_layout() {
        let buffer =
            AudioBuffer::from_channels(24000, vec![vec![0.25; 240], vec![-0.25; 240]]).unwrap();
        let resampled = resample_buffer(&buffer, 44100).unwrap();

        assert_eq!(resampled.sample_rate(), 44100);
        assert_eq!(resampled.number_of_channels(), 2);
        assert_eq!(resampled.frame_count(), 441);
        assert!(resampled.channel(1).unwrap().iter().all(|&s| s == -0.25));
    }
}
