use std::time::Duration;

use super::*;

#[test]
fn pattern_frames_are_valid_and_vary() {
    let a = test_pattern_frame(64, 8, 0);
    let b = test_pattern_frame(64, 8, 90);
    assert!(a.validate().is_ok());
    assert_eq!(a.rgba8_premul.len(), 64 * 8 * 4);
    assert_ne!(a.rgba8_premul, b.rgba8_premul);
    assert_eq!(&a.rgba8_premul[0..4], &a.rgba8_premul[64 * 4..64 * 4 + 4]);
}

#[tokio::test(start_paused = true)]
async fn pattern_feed_advances_with_time() {
    let cam = TestPatternCamera {
        width: 16,
        height: 16,
        fps: 10,
    };
    let feed = cam.open().await.unwrap();
    let first = feed.latest_frame().unwrap();
    let again = feed.latest_frame().unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    tokio::time::advance(Duration::from_millis(250)).await;
    let later = feed.latest_frame().unwrap();
    assert_eq!(later.sequence, 2);
}

#[tokio::test(start_paused = true)]
async fn tone_feed_yields_samples_for_elapsed_time() {
    let mic = ToneMicrophone {
        format: AudioFormat {
            sample_rate: 1_000,
            channels: 2,
        },
        ..ToneMicrophone::default()
    };
    let feed = mic.open().await.unwrap();
    let mut out = Vec::new();
    assert_eq!(feed.drain_samples(&mut out), 0);

    tokio::time::advance(Duration::from_millis(100)).await;
    assert_eq!(feed.drain_samples(&mut out), 200);
    assert_eq!(out.len(), 200);
    assert!(out.iter().all(|s| s.abs() <= 0.2 + f32::EPSILON));

    tokio::time::advance(Duration::from_secs(5)).await;
    out.clear();
    assert_eq!(feed.drain_samples(&mut out), 2_000);
}

#[tokio::test]
async fn zero_sized_devices_are_unavailable() {
    let cam = TestPatternCamera {
        width: 0,
        ..TestPatternCamera::default()
    };
    assert!(cam.open().await.is_err());
}
