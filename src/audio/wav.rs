use crate::audio::pcm::{to_pcm16, AudioBuffer};

/// Encode an audio buffer into a WAV file (16-bit, little-endian, interleaved).
pub fn encode_wav(buffer: &AudioBuffer) -> Vec<u8> {
    let num_channels = buffer.number_of_channels() as u16;
    let sample_rate = buffer.sample_rate();
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * u32::from(num_channels) * u32::from(bits_per_sample) / 8;
    let block_align = num_channels * bits_per_sample / 8;
    let sample_count = buffer.frame_count() * usize::from(num_channels);
    let data_size = (sample_count * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + sample_count * 2);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt sub-chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // sub-chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&num_channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data sub-chunk, re-interleaved frame by frame
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    let channels: Vec<&[f32]> = (0..buffer.number_of_channels())
        .filter_map(|c| buffer.channel(c))
        .collect();
    for frame in 0..buffer.frame_count() {
        for data in &channels {
            buf.extend_from_slice(&to_pcm16(data[frame]).to_le_bytes());
        }
    }

    buf
}

/// Calculate RMS level across all channels, normalized to 0.0–1.0.
pub fn calculate_rms(buffer: &AudioBuffer) -> f32 {
    let total = buffer.frame_count() * buffer.number_of_channels();
    if total == 0 {
        return 0.0;
    }
    let sum_sq: f64 = (0..buffer.number_of_channels())
        .filter_map(|c| buffer.channel(c))
        .flat_map(|data| data.iter())
        .map(|&s| f64::from(s) * f64::from(s))
        .sum();
    (sum_sq / total as f64).sqrt() as f32
}
