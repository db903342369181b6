use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::audio::pcm::AudioBuffer;

pub type SharedMixer = Arc<Mutex<Mixer>>;

static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// Caller-side handle for one playing voice.
///
/// Dropping the handle leaves the voice playing; it is removed from the mixer
/// once its buffer runs out or `stop` is called.
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    id: u64,
    stop: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl PlaybackHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Ask the mixer to drop this voice on its next render. Idempotent.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// One buffer source wired to the mixer output.
pub struct Voice {
    buffer: Arc<AudioBuffer>,
    cursor: usize,
    stop: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl Voice {
    pub fn new(buffer: Arc<AudioBuffer>) -> (Self, PlaybackHandle) {
        let stop = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let handle = PlaybackHandle {
            id: NEXT_VOICE_ID.fetch_add(1, Ordering::Relaxed),
            stop: stop.clone(),
            finished: finished.clone(),
        };
        let voice = Self {
            buffer,
            cursor: 0,
            stop,
            finished,
        };
        (voice, handle)
    }

    fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Sample for `out_channel` of an output with `out_channels` channels at `frame`.
    fn sample_for(&self, frame: usize, out_channel: usize, out_channels: usize) -> f32 {
        let src_channels = self.buffer.number_of_channels();
        if src_channels == 1 {
            return self.buffer.channel(0).map_or(0.0, |d| d[frame]);
        }
        if out_channels == 1 {
            let sum: f32 = (0..src_channels)
                .filter_map(|c| self.buffer.channel(c))
                .map(|d| d[frame])
                .sum();
            return sum / src_channels as f32;
        }
        self.buffer.channel(out_channel).map_or(0.0, |d| d[frame])
    }

    /// Add this voice into `out` and advance. Returns true once the voice is done.
    fn mix_into(&mut self, out: &mut [f32], out_channels: usize) -> bool {
        if self.is_stopped() {
            return true;
        }
        let remaining = self.buffer.frame_count().saturating_sub(self.cursor);
        let frames = (out.len() / out_channels).min(remaining);
        for (f, frame) in out.chunks_exact_mut(out_channels).take(frames).enumerate() {
            let src = self.cursor + f;
            for (c, slot) in frame.iter_mut().enumerate() {
                *slot += self.sample_for(src, c, out_channels);
            }
        }
        self.cursor += frames;
        self.cursor >= self.buffer.frame_count()
    }
}

/// Sums all active voices into an interleaved output block.
#[derive(Default)]
pub struct Mixer {
    voices: Vec<Voice>,
}

impl Mixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedMixer {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn add(&mut self, voice: Voice) {
        self.voices.push(voice);
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn stop_all(&mut self) {
        for voice in &self.voices {
            voice.stop.store(true, Ordering::Release);
        }
    }

    /// Render one block of interleaved audio. Finished voices are released here.
    pub fn render(&mut self, out: &mut [f32], out_channels: usize) {
        out.fill(0.0);
        if out_channels == 0 {
            return;
        }

        self.voices.retain_mut(|voice| {
            let done = voice.mix_into(out, out_channels);
            if done {
                voice.finished.store(true, Ordering::Release);
            }
            !done
        });

        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }
}
