use std::sync::Arc;

use parking_lot::Mutex;

use crate::capture::source::{
    AudioDevice, AudioFeed, AudioFormat, CaptureKind, CaptureSource, VideoDevice, VideoFeed,
    VideoFrame,
};
use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Owns the camera and microphone lifecycles and serves their latest data.
///
/// Shared behind an `Arc` between the controller and the draw task. Locks guard only the
/// `CaptureSource` swap and are never held while a device is being opened.
pub struct CaptureAdapter {
    camera_device: Option<Box<dyn VideoDevice>>,
    microphone_device: Option<Box<dyn AudioDevice>>,
    camera: Mutex<CaptureSource<Box<dyn VideoFeed>>>,
    microphone: Mutex<CaptureSource<Box<dyn AudioFeed>>>,
}

impl CaptureAdapter {
    /// Adapter over the given devices. A missing device makes `enable` fail as unavailable.
    pub fn new(
        camera_device: Option<Box<dyn VideoDevice>>,
        microphone_device: Option<Box<dyn AudioDevice>>,
    ) -> Self {
        Self {
            camera_device,
            microphone_device,
            camera: Mutex::new(CaptureSource::Disabled),
            microphone: Mutex::new(CaptureSource::Disabled),
        }
    }

    /// Adapter with no devices at all.
    pub fn without_devices() -> Self {
        Self::new(None, None)
    }

    /// Acquire the device for `kind`. Idempotent when already active.
    pub async fn enable(&self, kind: CaptureKind) -> SlidecastResult<()> {
        if self.is_active(kind) {
            return Ok(());
        }
        match kind {
            CaptureKind::Video => {
                let device = self.camera_device.as_ref().ok_or_else(|| {
                    SlidecastError::device_unavailable("no camera device configured")
                })?;
                let feed = device.open().await?;
                let mut slot = self.camera.lock();
                if !slot.is_active() {
                    *slot = CaptureSource::Active(feed);
                    tracing::info!(device = device.name(), "camera enabled");
                }
            }
            CaptureKind::Audio => {
                let device = self.microphone_device.as_ref().ok_or_else(|| {
                    SlidecastError::device_unavailable("no microphone device configured")
                })?;
                let feed = device.open().await?;
                let mut slot = self.microphone.lock();
                if !slot.is_active() {
                    *slot = CaptureSource::Active(feed);
                    tracing::info!(device = device.name(), "microphone enabled");
                }
            }
        }
        Ok(())
    }

    /// Release the device for `kind`. Returns whether it was active.
    ///
    /// Frames already handed out stay valid for their holders; no new frames are served.
    pub fn disable(&self, kind: CaptureKind) -> bool {
        // Feeds are dropped outside the lock; their Drop may wait on reader threads.
        let released = match kind {
            CaptureKind::Video => {
                let feed = self.camera.lock().take();
                feed.is_some()
            }
            CaptureKind::Audio => {
                let feed = self.microphone.lock().take();
                feed.is_some()
            }
        };
        if released {
            tracing::info!(%kind, "capture disabled");
        }
        released
    }

    /// Return `true` while `kind` holds a device.
    pub fn is_active(&self, kind: CaptureKind) -> bool {
        match kind {
            CaptureKind::Video => self.camera.lock().is_active(),
            CaptureKind::Audio => self.microphone.lock().is_active(),
        }
    }

    /// Latest camera frame; `None` when disabled or before the first frame.
    pub fn latest_frame(&self) -> Option<Arc<VideoFrame>> {
        self.camera.lock().active().and_then(|feed| feed.latest_frame())
    }

    /// Format of the active microphone, if any.
    pub fn audio_format(&self) -> Option<AudioFormat> {
        self.microphone.lock().active().map(|feed| feed.format())
    }

    /// Append microphone samples captured since the last drain; 0 when disabled.
    pub fn drain_audio(&self, out: &mut Vec<f32>) -> usize {
        self.microphone
            .lock()
            .active()
            .map_or(0, |feed| feed.drain_samples(out))
    }
}

impl std::fmt::Debug for CaptureAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureAdapter")
            .field("camera_active", &self.is_active(CaptureKind::Video))
            .field("microphone_active", &self.is_active(CaptureKind::Audio))
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/capture/adapter.rs"]
mod tests;
