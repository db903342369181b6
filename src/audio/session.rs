use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::audio::mixer::{Mixer, PlaybackHandle, SharedMixer, Voice};
use crate::audio::output::{OutputDevice, OutputStream, StreamFormat};
use crate::audio::pcm::AudioBuffer;
use crate::audio::resampler::resample_buffer;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Suspended,
    Running,
    Closed,
}

struct SessionInner {
    state: SessionState,
    stream: Option<Box<dyn OutputStream>>,
}

/// Output session shared by every play request of one app instance.
///
/// Starts suspended; `resume` opens the device. The sample rate is fixed at creation.
pub struct PlaybackSession {
    sample_rate: u32,
    device: Box<dyn OutputDevice>,
    mixer: SharedMixer,
    inner: Mutex<SessionInner>,
}

impl PlaybackSession {
    pub fn new(sample_rate: u32, device: Box<dyn OutputDevice>) -> Result<Self, AppError> {
        if sample_rate == 0 {
            return Err(AppError::InvalidParameter(
                "Session sample rate must be greater than zero".into(),
            ));
        }
        Ok(Self {
            sample_rate,
            device,
            mixer: Mixer::shared(),
            inner: Mutex::new(SessionInner {
                state: SessionState::Suspended,
                stream: None,
            }),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn state(&self) -> SessionState {
        self.lock_inner().state
    }

    /// Format of the open stream, if running.
    pub fn stream_format(&self) -> Option<StreamFormat> {
        self.lock_inner().stream.as_ref().map(|s| s.format())
    }

    pub fn active_voices(&self) -> usize {
        self.mixer.lock().map(|m| m.active_voices()).unwrap_or(0)
    }

    /// Move a suspended session to running. No-op when already running.
    pub fn resume(&self) -> Result<(), AppError> {
        let mut inner = self.lock_inner();
        match inner.state {
            SessionState::Running => Ok(()),
            SessionState::Closed => Err(AppError::Playback("Playback session is closed".into())),
            SessionState::Suspended => {
                let stream = self.device.open(self.sample_rate, self.mixer.clone())?;
                crate::app_log!(
                    "[playback] session resumed device={} requested_rate={} stream_rate={}",
                    self.device.device_name(),
                    self.sample_rate,
                    stream.format().sample_rate
                );
                inner.stream = Some(stream);
                inner.state = SessionState::Running;
                Ok(())
            }
        }
    }

    /// Start `buffer` immediately on a fresh voice. The session must be running.
    pub fn play(&self, buffer: Arc<AudioBuffer>) -> Result<PlaybackHandle, AppError> {
        let format = {
            let inner = self.lock_inner();
            if inner.state != SessionState::Running {
                return Err(AppError::Playback(format!(
                    "Playback session is not running (state: {:?})",
                    inner.state
                )));
            }
            inner
                .stream
                .as_ref()
                .map(|s| s.format())
                .ok_or_else(|| AppError::Playback("Playback session has no output stream".into()))?
        };

        if buffer.is_empty() {
            return Err(AppError::Playback("Audio buffer holds no frames".into()));
        }
        if format.channels == 0 {
            return Err(AppError::Playback("Output stream has no channels".into()));
        }

        let source = if buffer.sample_rate() == format.sample_rate {
            buffer
        } else {
            Arc::new(resample_buffer(&buffer, format.sample_rate)?)
        };

        let (voice, handle) = Voice::new(source);
        self.mixer
            .lock()
            .map_err(|_| AppError::Playback("Mixer lock poisoned".into()))?
            .add(voice);
        crate::app_log!("[playback] voice {} started", handle.id());
        Ok(handle)
    }

    pub fn stop_all(&self) {
        if let Ok(mut mixer) = self.mixer.lock() {
            mixer.stop_all();
        }
    }

    /// Release the output device. A closed session cannot be resumed.
    pub fn close(&self) {
        let mut inner = self.lock_inner();
        if let Some(stream) = inner.stream.take() {
            stream.close();
        }
        inner.state = SessionState::Closed;
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Holds the one playback session of this app instance, created on first use.
#[derive(Default)]
pub struct SessionSlot {
    session: Mutex<Option<Arc<PlaybackSession>>>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the existing session, or create one at `sample_rate`.
    ///
    /// An existing session keeps its original rate; a different `sample_rate` is ignored.
    pub fn ensure<F>(&self, sample_rate: u32, make_device: F) -> Result<Arc<PlaybackSession>, AppError>
    where
        F: FnOnce() -> Box<dyn OutputDevice>,
    {
        let mut slot = self.session.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = slot.as_ref() {
            if session.sample_rate() != sample_rate {
                crate::app_log!(
                    "[playback] keeping session at {} Hz, ignoring requested {} Hz",
                    session.sample_rate(),
                    sample_rate
                );
            }
            return Ok(session.clone());
        }

        let session = Arc::new(PlaybackSession::new(sample_rate, make_device())?);
        crate::app_log!("[playback] session created rate={}", sample_rate);
        *slot = Some(session.clone());
        Ok(session)
    }

    pub fn current(&self) -> Option<Arc<PlaybackSession>> {
        self.session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    /// Output device that never touches hardware. Render calls are driven by the test.
    pub struct FakeDevice {
        pub format: StreamFormat,
        pub fail: bool,
        pub opened: Arc<AtomicUsize>,
        pub mixer: Arc<Mutex<Option<SharedMixer>>>,
    }

    impl FakeDevice {
        pub fn new(sample_rate: u32, channels: u16) -> Self {
            Self {
                format: StreamFormat {
                    sample_rate,
                    channels,
                },
                fail: false,
                opened: Arc::new(AtomicUsize::new(0)),
                mixer: Arc::new(Mutex::new(None)),
            }
        }
    }

    struct FakeStream(StreamFormat);

    impl OutputStream for FakeStream {
        fn format(&self) -> StreamFormat {
            self.0
        }

        fn close(self: Box<Self>) {}
    }

    impl OutputDevice for FakeDevice {
        fn open(&self, _sample_rate: u32, mixer: SharedMixer) -> Result<Box<dyn OutputStream>, AppError> {
            if self.fail {
                return Err(AppError::Playback("No output device available".into()));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            *self.mixer.lock().unwrap() = Some(mixer);
            Ok(Box::new(FakeStream(self.format)))
        }

        fn device_name(&self) -> &str {
            "fake"
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::FakeDevice;
    use super::*;

    fn tone(sample_rate: u32, frames: usize) -> Arc<AudioBuffer> {
        Arc::new(AudioBuffer::from_channels(sample_rate, vec![vec![0.5; frames]]).unwrap())
    }

    #[test]
    fn test_new_session_is_suspended() {
        let session = PlaybackSession::new(24000, Box::new(FakeDevice::new(24000, 1))).unwrap();
        assert_eq!(session.state(), SessionState::Suspended);
        assert_eq!(session.sample_rate(), 24000);
        assert!(session.stream_format().is_none());
    }

    #[test]
    fn test_zero_rate_is_invalid() {
        let result = PlaybackSession::new(0, Box::new(FakeDevice::new(24000, 1)));
        assert!(matches!(result, Err(AppError::InvalidParameter(_))));
    }

    #[test]
    fn test_resume_is_idempotent() {
        let device = FakeDevice::new(24000, 1);
        let opened = device.opened.clone();
        let session = PlaybackSession::new(24000, Box::new(device)).unwrap();

        session.resume().unwrap();
        session.resume().unwrap();
        assert_eq!(session.state(), SessionState::Running);
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resume_failure_stays_suspended() {
        let mut device = FakeDevice::new(24000, 1);
        device.fail = true;
        let session = PlaybackSession::new(24000, Box::new(device)).unwrap();

        assert!(matches!(session.resume(), Err(AppError::Playback(_))));
        assert_eq!(session.state(), SessionState::Suspended);
    }

    #[test]
    fn test_play_requires_running() {
        let session = PlaybackSession::new(24000, Box::new(FakeDevice::new(24000, 1))).unwrap();
        let result = session.play(tone(24000, 10));
        assert!(matches!(result, Err(AppError::Playback(_))));
    }

    #[test]
    fn test_closed_session_cannot_resume() {
        let session = PlaybackSession::new(24000, Box::new(FakeDevice::new(24000, 1))).unwrap();
        session.resume().unwrap();
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(matches!(session.resume(), Err(AppError::Playback(_))));
        assert!(session.play(tone(24000, 10)).is_err());
    }

    #[test]
    fn test_empty_buffer_is_rejected() {
        let session = PlaybackSession::new(24000, Box::new(FakeDevice::new(24000, 1))).unwrap();
        session.resume().unwrap();
        let result = session.play(tone(24000, 0));
        assert!(matches!(result, Err(AppError::Playback(_))));
        assert_eq!(session.active_voices(), 0);
    }

    #[test]
    fn test_play_shares_buffer_and_renders() {
        let device = FakeDevice::new(24000, 1);
        let mixer_slot = device.mixer.clone();
        let session = PlaybackSession::new(24000, Box::new(device)).unwrap();
        session.resume().unwrap();

        let buffer = tone(24000, 3);
        let handle = session.play(buffer.clone()).unwrap();
        // same rate: the voice holds the caller's buffer, not a copy
        assert_eq!(Arc::strong_count(&buffer), 2);

        let mixer = mixer_slot.lock().unwrap().clone().unwrap();
        let mut out = [0.0f32; 4];
        mixer.lock().unwrap().render(&mut out, 1);
        assert_eq!(out, [0.5, 0.5, 0.5, 0.0]);
        assert!(handle.is_finished());
    }

    #[test]
    fn test_concurrent_plays_overlap() {
        let session = PlaybackSession::new(24000, Box::new(FakeDevice::new(24000, 2))).unwrap();
        session.resume().unwrap();
        let a = session.play(tone(24000, 100)).unwrap();
        let b = session.play(tone(24000, 100)).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(session.active_voices(), 2);

        session.stop_all();
        assert!(!a.is_finished());
    }

    #[test]
    fn test_play_resamples_to_stream_rate() {
        let device = FakeDevice::new(48000, 2);
        let mixer_slot = device.mixer.clone();
        let session = PlaybackSession::new(24000, Box::new(device)).unwrap();
        session.resume().unwrap();
        assert_eq!(session.stream_format().unwrap().sample_rate, 48000);

        let buffer = tone(24000, 2);
        let handle = session.play(buffer.clone()).unwrap();
        assert_eq!(Arc::strong_count(&buffer), 1);

        let mixer = mixer_slot.lock().unwrap().clone().unwrap();
        let mut out = [0.0f32; 10];
        mixer.lock().unwrap().render(&mut out, 2);
        assert_eq!(&out[..8], &[0.5; 8]);
        assert!(handle.is_finished());
    }

    #[test]
    fn test_slot_returns_same_session() {
        let slot = SessionSlot::new();
        assert!(slot.current().is_none());

        let first = slot
            .ensure(24000, || Box::new(FakeDevice::new(24000, 1)))
            .unwrap();
        let second = slot
            .ensure(24000, || panic!("a second session must not be created"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &slot.current().unwrap()));
    }

    #[test]
    fn test_slot_ignores_later_rate() {
        let slot = SessionSlot::new();
        slot.ensure(24000, || Box::new(FakeDevice::new(24000, 1)))
            .unwrap();
        let again = slot
            .ensure(44100, || Box::new(FakeDevice::new(44100, 1)))
            .unwrap();
        assert_eq!(again.sample_rate(), 24000);
    }

    #[test]
    fn test_slot_rejects_invalid_rate_without_storing() {
        let slot = SessionSlot::new();
        let result = slot.ensure(0, || Box::new(FakeDevice::new(24000, 1)));
        assert!(matches!(result, Err(AppError::InvalidParameter(_))));
        assert!(slot.current().is_none());
    }
}
