use std::sync::Arc;

use parking_lot::Mutex;

use crate::capture::source::AudioFormat;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::backend::FrameRGBA;

/// Configuration provided to an [`EncoderSink`] when a session starts.
///
/// The geometry and bitrate are fixed for the lifetime of the sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    /// Target video bitrate in bits per second.
    pub bitrate: u64,
    /// Live microphone layout, when audio should be muxed in.
    pub audio: Option<AudioFormat>,
}

/// Outcome of attaching the audio track in [`EncoderSink::begin`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioAttachment {
    /// Audio is muxed with the named codec.
    Attached {
        /// Encoder name.
        codec: String,
    },
    /// Audio was requested but the sink records video only.
    Skipped {
        /// Human-readable cause.
        reason: String,
    },
    /// No audio was requested.
    NotRequested,
}

/// What a sink negotiated in [`EncoderSink::begin`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeginReport {
    /// Video encoder name.
    pub video_codec: String,
    /// Audio track outcome.
    pub audio: AudioAttachment,
}

/// Readiness reported by [`EncoderSink::poll_state`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncoderState {
    /// Started but not yet accepting data reliably.
    Starting,
    /// Accepting frames.
    Recording,
}

/// Sink contract for a live recording.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order and never
/// after `finish`. `finish` consumes the sink's state and returns the encoded chunks in order.
pub trait EncoderSink: Send {
    /// Start the encoder at the fixed geometry in `cfg`.
    ///
    /// An audio track that cannot be attached is reported in [`BeginReport::audio`] rather than
    /// failing the call.
    fn begin(&mut self, cfg: SinkConfig) -> SlidecastResult<BeginReport>;
    /// Report readiness; fails when the encoder has died.
    fn poll_state(&mut self) -> SlidecastResult<EncoderState>;
    /// Push one frame in strictly increasing index order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SlidecastResult<()>;
    /// Push interleaved `f32` samples in the layout announced in `begin`.
    fn push_audio(&mut self, samples: &[f32]) -> SlidecastResult<()>;
    /// Flush and stop the encoder, returning the encoded chunks.
    fn finish(&mut self) -> SlidecastResult<Vec<Vec<u8>>>;
    /// File extension of the produced container.
    fn extension(&self) -> &'static str {
        "webm"
    }
}

/// Builds one fresh [`EncoderSink`] per session.
pub trait SinkFactory: Send + Sync {
    /// Create an unstarted sink.
    fn create(&self) -> SlidecastResult<Box<dyn EncoderSink>>;
}

impl<F> SinkFactory for F
where
    F: Fn() -> SlidecastResult<Box<dyn EncoderSink>> + Send + Sync,
{
    fn create(&self) -> SlidecastResult<Box<dyn EncoderSink>> {
        self()
    }
}

#[derive(Debug, Default)]
struct ProbeState {
    config: Option<SinkConfig>,
    frames: Vec<FrameIndex>,
    last_frame: Option<FrameRGBA>,
    audio_samples: usize,
    finished: bool,
}

/// Shared view into what an [`InMemorySink`] received.
#[derive(Clone, Debug, Default)]
pub struct SinkProbe {
    inner: Arc<Mutex<ProbeState>>,
}

impl SinkProbe {
    /// Configuration passed to `begin`, if it was called.
    pub fn config(&self) -> Option<SinkConfig> {
        self.inner.lock().config.clone()
    }

    /// Indices of every accepted frame.
    pub fn frame_indices(&self) -> Vec<FrameIndex> {
        self.inner.lock().frames.clone()
    }

    /// Number of accepted frames.
    pub fn frame_count(&self) -> usize {
        self.inner.lock().frames.len()
    }

    /// Most recent accepted frame.
    pub fn last_frame(&self) -> Option<FrameRGBA> {
        self.inner.lock().last_frame.clone()
    }

    /// Total audio samples received.
    pub fn audio_samples(&self) -> usize {
        self.inner.lock().audio_samples
    }

    /// Whether `finish` has run.
    pub fn finished(&self) -> bool {
        self.inner.lock().finished
    }
}

/// In-memory sink for tests and demos.
///
/// Each accepted frame becomes one small chunk (index plus a checksum of the pixels), so the
/// output is non-empty exactly when at least one frame was pushed.
#[derive(Debug)]
pub struct InMemorySink {
    probe: SinkProbe,
    audio_codec: Option<String>,
    started: bool,
    last_idx: Option<FrameIndex>,
    chunks: Vec<Vec<u8>>,
}

impl InMemorySink {
    /// Create a sink that accepts audio.
    pub fn new() -> Self {
        Self {
            probe: SinkProbe::default(),
            audio_codec: Some("pcm".to_owned()),
            started: false,
            last_idx: None,
            chunks: Vec::new(),
        }
    }

    /// Create a sink that reports audio as unsupported.
    pub fn video_only() -> Self {
        Self {
            audio_codec: None,
            ..Self::new()
        }
    }

    /// Handle for inspecting the sink after it has been moved into a session.
    pub fn probe(&self) -> SinkProbe {
        self.probe.clone()
    }
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoderSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> SlidecastResult<BeginReport> {
        let audio = match (&cfg.audio, &self.audio_codec) {
            (None, _) => AudioAttachment::NotRequested,
            (Some(_), Some(codec)) => AudioAttachment::Attached {
                codec: codec.clone(),
            },
            (Some(_), None) => AudioAttachment::Skipped {
                reason: "in-memory sink configured without audio".to_owned(),
            },
        };
        let mut probe = self.probe.inner.lock();
        probe.config = Some(cfg);
        probe.frames.clear();
        probe.audio_samples = 0;
        probe.finished = false;
        drop(probe);

        self.started = true;
        self.last_idx = None;
        self.chunks.clear();
        Ok(BeginReport {
            video_codec: "raw".to_owned(),
            audio,
        })
    }

    fn poll_state(&mut self) -> SlidecastResult<EncoderState> {
        if !self.started {
            return Err(SlidecastError::encoder("in-memory sink not started"));
        }
        Ok(EncoderState::Recording)
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> SlidecastResult<()> {
        if !self.started {
            return Err(SlidecastError::encoder("in-memory sink not started"));
        }
        if let Some(last) = self.last_idx
            && idx <= last
        {
            return Err(SlidecastError::encoder(format!(
                "out-of-order frame index {} after {}",
                idx.0, last.0
            )));
        }
        self.last_idx = Some(idx);

        let mut chunk = idx.0.to_le_bytes().to_vec();
        chunk.extend_from_slice(&checksum(&frame.data).to_le_bytes());
        self.chunks.push(chunk);

        let mut probe = self.probe.inner.lock();
        probe.frames.push(idx);
        probe.last_frame = Some(frame.clone());
        Ok(())
    }

    fn push_audio(&mut self, samples: &[f32]) -> SlidecastResult<()> {
        if self.audio_codec.is_some() {
            self.probe.inner.lock().audio_samples += samples.len();
        }
        Ok(())
    }

    fn finish(&mut self) -> SlidecastResult<Vec<Vec<u8>>> {
        if !self.started {
            return Err(SlidecastError::encoder("in-memory sink not started"));
        }
        self.started = false;
        self.probe.inner.lock().finished = true;
        Ok(std::mem::take(&mut self.chunks))
    }
}

// FNV-1a
fn checksum(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |h, b| {
        (h ^ u64::from(*b)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
