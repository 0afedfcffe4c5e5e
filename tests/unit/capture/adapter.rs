use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::*;
use crate::foundation::error::DeviceFailure;

struct StillFeed(Arc<VideoFrame>);

impl VideoFeed for StillFeed {
    fn latest_frame(&self) -> Option<Arc<VideoFrame>> {
        Some(self.0.clone())
    }
}

struct CountingCamera {
    opens: Arc<AtomicUsize>,
}

#[async_trait]
impl VideoDevice for CountingCamera {
    fn name(&self) -> &str {
        "counting"
    }

    async fn open(&self) -> SlidecastResult<Box<dyn VideoFeed>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StillFeed(Arc::new(VideoFrame::from_rgba8(
            1,
            1,
            vec![1, 2, 3, 255],
            0,
        )))))
    }
}

struct DeniedMic;

#[async_trait]
impl AudioDevice for DeniedMic {
    fn name(&self) -> &str {
        "denied"
    }

    async fn open(&self) -> SlidecastResult<Box<dyn AudioFeed>> {
        Err(SlidecastError::permission_denied("user refused"))
    }
}

#[tokio::test]
async fn enable_is_idempotent_and_disable_releases() {
    let opens = Arc::new(AtomicUsize::new(0));
    let adapter = CaptureAdapter::new(
        Some(Box::new(CountingCamera {
            opens: opens.clone(),
        })),
        None,
    );

    assert!(adapter.latest_frame().is_none());
    adapter.enable(CaptureKind::Video).await.unwrap();
    adapter.enable(CaptureKind::Video).await.unwrap();
    assert_eq!(opens.load(Ordering::SeqCst), 1);

    let held = adapter.latest_frame().unwrap();
    assert!(adapter.disable(CaptureKind::Video));
    assert!(!adapter.disable(CaptureKind::Video));
    assert!(adapter.latest_frame().is_none());
    assert_eq!(held.rgba8_premul, vec![1, 2, 3, 255]);
}

#[tokio::test]
async fn failures_keep_source_disabled() {
    let adapter = CaptureAdapter::new(None, Some(Box::new(DeniedMic)));

    let err = adapter.enable(CaptureKind::Audio).await.unwrap_err();
    assert_eq!(err.device_failure(), Some(DeviceFailure::PermissionDenied));
    assert!(!adapter.is_active(CaptureKind::Audio));

    let err = adapter.enable(CaptureKind::Video).await.unwrap_err();
    assert_eq!(err.device_failure(), Some(DeviceFailure::Unavailable));

    let mut out = Vec::new();
    assert_eq!(adapter.drain_audio(&mut out), 0);
    assert!(adapter.audio_format().is_none());
}
