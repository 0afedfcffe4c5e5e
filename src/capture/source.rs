use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::foundation::math::premultiply_rgba8_in_place;

/// Which live input a capture operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    /// Camera.
    Video,
    /// Microphone.
    Audio,
}

impl std::fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video => f.write_str("camera"),
            Self::Audio => f.write_str("microphone"),
        }
    }
}

static NEXT_FRAME_ID: AtomicU64 = AtomicU64::new(1);

/// One camera frame in premultiplied RGBA8.
///
/// Every constructed frame gets a process-unique [`VideoFrame::id`]; clones share it.
#[derive(Clone, Debug)]
pub struct VideoFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 bytes, tightly packed, row-major.
    pub rgba8_premul: Vec<u8>,
    /// Increases by one for every new frame a feed publishes. Restarts with each feed.
    pub sequence: u64,
    id: u64,
}

impl VideoFrame {
    /// Wrap premultiplied RGBA8 bytes.
    pub fn new(width: u32, height: u32, rgba8_premul: Vec<u8>, sequence: u64) -> Self {
        Self {
            width,
            height,
            rgba8_premul,
            sequence,
            id: NEXT_FRAME_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Build a frame from straight-alpha RGBA8 bytes.
    pub fn from_rgba8(width: u32, height: u32, mut rgba8: Vec<u8>, sequence: u64) -> Self {
        premultiply_rgba8_in_place(&mut rgba8);
        Self::new(width, height, rgba8, sequence)
    }

    /// Identity of this frame's pixels, unique across feeds.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Check that the buffer matches the geometry.
    pub fn validate(&self) -> SlidecastResult<()> {
        let expected = (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4);
        if self.width == 0 || self.height == 0 || self.rgba8_premul.len() != expected {
            return Err(SlidecastError::composite(format!(
                "camera frame {}x{} carries {} bytes",
                self.width,
                self.height,
                self.rgba8_premul.len()
            )));
        }
        Ok(())
    }
}

/// Interleaved `f32` PCM layout of a microphone feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AudioFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

/// Lifecycle of one live input.
#[derive(Debug, Default)]
pub enum CaptureSource<F> {
    /// No device held.
    #[default]
    Disabled,
    /// Device acquired and producing data through `F`.
    Active(F),
}

impl<F> CaptureSource<F> {
    /// Return `true` while a device is held.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    /// Borrow the live handle, if any.
    pub fn active(&self) -> Option<&F> {
        match self {
            Self::Active(f) => Some(f),
            Self::Disabled => None,
        }
    }

    /// Take the live handle out, leaving the source disabled.
    pub fn take(&mut self) -> Option<F> {
        match std::mem::take(self) {
            Self::Active(f) => Some(f),
            Self::Disabled => None,
        }
    }
}

/// A camera that can be opened into a live [`VideoFeed`].
#[async_trait]
pub trait VideoDevice: Send + Sync {
    /// Human-readable device name for logs.
    fn name(&self) -> &str;
    /// Acquire the device. Fails with a device error when access is refused or impossible.
    async fn open(&self) -> SlidecastResult<Box<dyn VideoFeed>>;
}

/// A running camera. Dropping the feed releases the device.
pub trait VideoFeed: Send + Sync {
    /// Most recent frame, or `None` before the first frame arrives.
    fn latest_frame(&self) -> Option<Arc<VideoFrame>>;
}

/// A microphone that can be opened into a live [`AudioFeed`].
#[async_trait]
pub trait AudioDevice: Send + Sync {
    /// Human-readable device name for logs.
    fn name(&self) -> &str;
    /// Acquire the device.
    async fn open(&self) -> SlidecastResult<Box<dyn AudioFeed>>;
}

/// A running microphone. Dropping the feed releases the device.
pub trait AudioFeed: Send + Sync {
    /// Sample layout of [`AudioFeed::drain_samples`].
    fn format(&self) -> AudioFormat;
    /// Append every sample captured since the previous drain to `out`; returns how many.
    fn drain_samples(&self, out: &mut Vec<f32>) -> usize;
}

#[cfg(test)]
#[path = "../../tests/unit/capture/source.rs"]
mod tests;
