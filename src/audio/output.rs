use crate::audio::mixer::SharedMixer;
use crate::error::AppError;

/// Format the hardware stream actually opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

/// A running output stream pulling audio from a mixer.
pub trait OutputStream: Send {
    fn format(&self) -> StreamFormat;

    /// Stop pulling audio and release the device.
    fn close(self: Box<Self>);
}

/// Something that can open an output stream, e.g. the default sound card.
pub trait OutputDevice: Send + Sync {
    /// Open a stream that renders `mixer`, preferring `sample_rate` when the device supports it.
    fn open(&self, sample_rate: u32, mixer: SharedMixer) -> Result<Box<dyn OutputStream>, AppError>;

    fn device_name(&self) -> &str;
}

#[cfg(feature = "cpal-output")]
pub use self::cpal_output::CpalOutput;

#[cfg(feature = "cpal-output")]
mod cpal_output {
    use std::sync::mpsc;
    use std::thread::JoinHandle;
    use std::time::Duration;

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{SampleFormat, SampleRate, Stream, StreamConfig, SupportedStreamConfig};

    use super::{OutputDevice, OutputStream, StreamFormat};
    use crate::audio::mixer::SharedMixer;
    use crate::error::AppError;

    /// Default output device via cpal.
    ///
    /// `cpal::Stream` is `!Send`, so the stream lives on its own thread for as long
    /// as the session is running and is dropped there when the session closes.
    pub struct CpalOutput;

    impl CpalOutput {
        pub fn new() -> Self {
            Self
        }
    }

    impl Default for CpalOutput {
        fn default() -> Self {
            Self::new()
        }
    }

    struct CpalStream {
        format: StreamFormat,
        close_tx: mpsc::Sender<()>,
        thread: Option<JoinHandle<()>>,
    }

    impl OutputStream for CpalStream {
        fn format(&self) -> StreamFormat {
            self.format
        }

        fn close(mut self: Box<Self>) {
            let _ = self.close_tx.send(());
            if let Some(thread) = self.thread.take() {
                let _ = thread.join();
            }
        }
    }

    impl OutputDevice for CpalOutput {
        fn open(
            &self,
            sample_rate: u32,
            mixer: SharedMixer,
        ) -> Result<Box<dyn OutputStream>, AppError> {
            let (ready_tx, ready_rx) = mpsc::channel::<Result<StreamFormat, AppError>>();
            let (close_tx, close_rx) = mpsc::channel::<()>();

            let thread = std::thread::Builder::new()
                .name("cocompose-output".into())
                .spawn(move || {
                    let stream = match start_stream(sample_rate, mixer) {
                        Ok((stream, format)) => {
                            let _ = ready_tx.send(Ok(format));
                            stream
                        }
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                    // Blocks until close() or the session is dropped
                    let _ = close_rx.recv();
                    drop(stream);
                    crate::app_log!("[playback] output stream closed");
                })
                .map_err(|e| AppError::Playback(format!("Failed to spawn output thread: {e}")))?;

            let format = ready_rx
                .recv_timeout(Duration::from_secs(5))
                .map_err(|e| AppError::Playback(format!("Output device did not start: {e}")))??;

            Ok(Box::new(CpalStream {
                format,
                close_tx,
                thread: Some(thread),
            }))
        }

        fn device_name(&self) -> &str {
            "Default output (cpal)"
        }
    }

    fn pick_config(device: &cpal::Device, sample_rate: u32) -> Result<SupportedStreamConfig, AppError> {
        let wanted = SampleRate(sample_rate);
        if let Ok(ranges) = device.supported_output_configs() {
            let exact = ranges
                .filter(|r| r.min_sample_rate() <= wanted && wanted <= r.max_sample_rate())
                .filter(|r| r.sample_format() == SampleFormat::F32 || r.sample_format() == SampleFormat::I16)
                .min_by_key(|r| r.channels());
            if let Some(range) = exact {
                return Ok(range.with_sample_rate(wanted));
            }
        }

        crate::app_log!(
            "[playback] device cannot open at {} Hz, falling back to its default rate",
            sample_rate
        );
        device
            .default_output_config()
            .map_err(|e| AppError::Playback(format!("Failed to get output config: {e}")))
    }

    fn start_stream(sample_rate: u32, mixer: SharedMixer) -> Result<(Stream, StreamFormat), AppError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AppError::Playback("No output device available".into()))?;

        let config = pick_config(&device, sample_rate)?;
        let format = StreamFormat {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
        };
        let stream_config = StreamConfig {
            channels: config.channels(),
            sample_rate: config.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = match config.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, mixer)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, mixer)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, mixer)?,
            format => {
                return Err(AppError::Playback(format!(
                    "Unsupported sample format: {format:?}"
                )));
            }
        };

        stream
            .play()
            .map_err(|e| AppError::Playback(format!("Failed to start stream: {e}")))?;

        crate::app_log!(
            "[playback] output stream running rate={} channels={}",
            format.sample_rate,
            format.channels
        );
        Ok((stream, format))
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<f32>>(
        device: &cpal::Device,
        config: &StreamConfig,
        mixer: SharedMixer,
    ) -> Result<Stream, AppError> {
        let channels = usize::from(config.channels);
        let mut scratch: Vec<f32> = Vec::new();

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    scratch.resize(data.len(), 0.0);
                    match mixer.lock() {
                        Ok(mut mixer) => mixer.render(&mut scratch, channels),
                        Err(_) => scratch.fill(0.0),
                    }
                    for (out, &sample) in data.iter_mut().zip(scratch.iter()) {
                        *out = T::from_sample(sample);
                    }
                },
                |err| crate::app_log!("[playback] output stream error: {err}"),
                None,
            )
            .map_err(|e| AppError::Playback(format!("Failed to build stream: {e}")))
    }
}
