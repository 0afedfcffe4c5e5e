//! Synthetic capture devices for demos and tests.
//!
//! Both devices derive their output from `tokio::time::Instant`, so paused test clocks drive
//! them deterministically.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::capture::source::{
    AudioDevice, AudioFeed, AudioFormat, VideoDevice, VideoFeed, VideoFrame,
};
use crate::foundation::color::Rgb8;
use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Camera producing animated color bars.
#[derive(Clone, Debug)]
pub struct TestPatternCamera {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second the pattern advances at.
    pub fps: u32,
}

impl Default for TestPatternCamera {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

#[async_trait]
impl VideoDevice for TestPatternCamera {
    fn name(&self) -> &str {
        "test-pattern"
    }

    async fn open(&self) -> SlidecastResult<Box<dyn VideoFeed>> {
        if self.width == 0 || self.height == 0 || self.fps == 0 {
            return Err(SlidecastError::device_unavailable(
                "test pattern needs non-zero size and fps",
            ));
        }
        Ok(Box::new(TestPatternFeed {
            cfg: self.clone(),
            started: Instant::now(),
            current: Mutex::new(None),
        }))
    }
}

struct TestPatternFeed {
    cfg: TestPatternCamera,
    started: Instant,
    current: Mutex<Option<Arc<VideoFrame>>>,
}

impl VideoFeed for TestPatternFeed {
    fn latest_frame(&self) -> Option<Arc<VideoFrame>> {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        let sequence = elapsed_ms * u64::from(self.cfg.fps) / 1000;

        let mut current = self.current.lock();
        if let Some(frame) = current.as_ref()
            && frame.sequence == sequence
        {
            return Some(frame.clone());
        }
        let frame = Arc::new(test_pattern_frame(
            self.cfg.width,
            self.cfg.height,
            sequence,
        ));
        *current = Some(frame.clone());
        Some(frame)
    }
}

/// Eight vertical bars whose hues rotate with `sequence`.
pub fn test_pattern_frame(width: u32, height: u32, sequence: u64) -> VideoFrame {
    let mut bytes = vec![0u8; (width as usize) * (height as usize) * 4];
    let bar_w = (width / 8).max(1);
    let shift = (sequence % 360) as f64;
    let mut row = Vec::with_capacity(width as usize * 4);
    for x in 0..width {
        let bar = x / bar_w;
        let c = Rgb8::from_hsl(f64::from(bar) * 45.0 + shift, 0.7, 0.5);
        row.extend_from_slice(&[c.r, c.g, c.b, 255]);
    }
    for line in bytes.chunks_exact_mut(row.len().max(1)) {
        line.copy_from_slice(&row);
    }
    VideoFrame::new(width, height, bytes, sequence)
}

/// Microphone producing a sine tone.
#[derive(Clone, Debug)]
pub struct ToneMicrophone {
    /// Output layout.
    pub format: AudioFormat,
    /// Tone frequency in Hz.
    pub frequency_hz: f32,
    /// Peak amplitude in `[0, 1]`.
    pub amplitude: f32,
}

impl Default for ToneMicrophone {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            frequency_hz: 440.0,
            amplitude: 0.2,
        }
    }
}

#[async_trait]
impl AudioDevice for ToneMicrophone {
    fn name(&self) -> &str {
        "tone"
    }

    async fn open(&self) -> SlidecastResult<Box<dyn AudioFeed>> {
        if self.format.sample_rate == 0 || self.format.channels == 0 {
            return Err(SlidecastError::device_unavailable(
                "tone microphone needs non-zero sample rate and channels",
            ));
        }
        Ok(Box::new(ToneFeed {
            cfg: self.clone(),
            started: Instant::now(),
            emitted_frames: Mutex::new(0),
        }))
    }
}

struct ToneFeed {
    cfg: ToneMicrophone,
    started: Instant,
    emitted_frames: Mutex<u64>,
}

impl AudioFeed for ToneFeed {
    fn format(&self) -> AudioFormat {
        self.cfg.format
    }

    fn drain_samples(&self, out: &mut Vec<f32>) -> usize {
        let rate = u64::from(self.cfg.format.sample_rate);
        let channels = usize::from(self.cfg.format.channels);
        let due = self.started.elapsed().as_millis() as u64 * rate / 1000;

        let mut emitted = self.emitted_frames.lock();
        // A long gap between drains yields at most one second of audio.
        let start = (*emitted).max(due.saturating_sub(rate));
        let frames = due.saturating_sub(start);
        let step = std::f64::consts::TAU * f64::from(self.cfg.frequency_hz) / rate as f64;
        out.reserve(frames as usize * channels);
        for n in start..due {
            let v = ((n as f64 * step).sin() as f32) * self.cfg.amplitude;
            out.extend(std::iter::repeat_n(v, channels));
        }
        *emitted = due;
        frames as usize * channels
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/synthetic.rs"]
mod tests;
