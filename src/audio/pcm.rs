use crate::error::AppError;

/// Divisor used to normalize signed 16-bit PCM. `i16::MAX` maps just below 1.0.
pub const PCM16_SCALE: f32 = 32768.0;

/// Immutable, de-interleaved audio with normalized `f32` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    frame_count: usize,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Build a buffer from per-channel data. Every channel must hold the same number of frames.
    pub fn from_channels(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, AppError> {
        if sample_rate == 0 {
            return Err(AppError::InvalidParameter(
                "Sample rate must be greater than zero".into(),
            ));
        }
        let Some(first) = channels.first() else {
            return Err(AppError::InvalidParameter(
                "Audio buffer needs at least one channel".into(),
            ));
        };
        let frame_count = first.len();
        if channels.iter().any(|ch| ch.len() != frame_count) {
            return Err(AppError::InvalidParameter(
                "All channels must have the same length".into(),
            ));
        }
        Ok(Self {
            sample_rate,
            frame_count,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn number_of_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    pub fn duration_secs(&self) -> f32 {
        self.frame_count as f32 / self.sample_rate as f32
    }
}

/// Interpret `bytes` as interleaved signed 16-bit little-endian PCM.
///
/// A trailing odd byte and any samples past the last complete frame are dropped.
pub fn build_buffer(
    bytes: &[u8],
    sample_rate: u32,
    num_channels: u16,
) -> Result<AudioBuffer, AppError> {
    if sample_rate == 0 {
        return Err(AppError::InvalidParameter(
            "Sample rate must be greater than zero".into(),
        ));
    }
    if num_channels == 0 {
        return Err(AppError::InvalidParameter(
            "Channel count must be at least 1".into(),
        ));
    }

    let channel_count = usize::from(num_channels);
    let samples: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let frame_count = samples.len() / channel_count;

    let mut channels: Vec<Vec<f32>> = (0..channel_count)
        .map(|_| Vec::with_capacity(frame_count))
        .collect();
    for frame in samples.chunks_exact(channel_count) {
        for (dest, &sample) in channels.iter_mut().zip(frame) {
            dest.push(f32::from(sample) / PCM16_SCALE);
        }
    }

    Ok(AudioBuffer {
        sample_rate,
        frame_count,
        channels,
    })
}

/// Encode samples as little-endian 16-bit PCM bytes.
pub fn encode_pcm16(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Convert a normalized sample back to 16-bit PCM, saturating out-of-range input.
pub fn to_pcm16(sample: f32) -> i16 {
    (sample * PCM16_SCALE)
        .round()
        .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}
