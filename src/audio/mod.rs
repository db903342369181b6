pub mod decoder;
pub mod mixer;
pub mod output;
pub mod pcm;
pub mod resampler;
pub mod session;
pub mod wav;

/// Sample rate of the speech model's raw PCM output.
pub const SONG_SAMPLE_RATE: u32 = 24000;

/// Channel count of the speech model's raw PCM output.
pub const SONG_CHANNELS: u16 = 1;
