use super::*;
use crate::slides::store::SlideStore;

const W: u32 = 320;
const H: u32 = 180;

fn compositor() -> Compositor {
    Compositor::new(CompositorOpts::default()).unwrap()
}

fn idle_state<'a>(document: Option<&'a Document>, page_index: usize) -> CompositeState<'a> {
    CompositeState {
        document,
        page_index,
        camera: None,
        recording: None,
        theme: Theme::default(),
        now_ms: 0,
    }
}

fn red_document() -> std::sync::Arc<Document> {
    let mut store = SlideStore::new();
    store
        .replace(vec![Page::solid(0, 40, 30, [255, 0, 0])])
        .unwrap();
    store.document().unwrap()
}

fn near(px: [u8; 4], rgb: [u8; 3], tol: u8) -> bool {
    px[0].abs_diff(rgb[0]) <= tol && px[1].abs_diff(rgb[1]) <= tol && px[2].abs_diff(rgb[2]) <= tol
}

#[test]
fn frame_has_requested_geometry() {
    let mut c = compositor();
    let frame = c.composite(W, H, &idle_state(None, 0)).unwrap();
    assert_eq!((frame.width, frame.height), (W, H));
    assert_eq!(frame.data.len(), (W * H * 4) as usize);
    assert!(frame.premultiplied);
}

#[test]
fn background_starts_at_theme_base() {
    let mut c = compositor();
    let frame = c.composite(W, H, &idle_state(None, 0)).unwrap();
    let px = frame.pixel(1, 1).unwrap();
    assert_eq!(px[3], 255);
    assert!(near(px, [0x1e, 0x29, 0x3b], 4), "{px:?}");
}

#[test]
fn active_page_lands_in_slide_region() {
    let doc = red_document();
    let mut c = compositor();
    let frame = c.composite(W, H, &idle_state(Some(&doc), 0)).unwrap();
    assert!(near(frame.pixel(206, 90).unwrap(), [255, 0, 0], 2));
}

#[test]
fn out_of_range_page_draws_placeholder() {
    let doc = red_document();
    let mut c = compositor();
    let frame = c.composite(W, H, &idle_state(Some(&doc), 7)).unwrap();
    assert!(!near(frame.pixel(206, 90).unwrap(), [255, 0, 0], 40));
}

#[test]
fn broken_camera_frame_falls_back_to_placeholder() {
    let bad = VideoFrame::new(16, 16, vec![0u8; 10], 1);
    let mut c = compositor();
    let state = CompositeState {
        camera: Some(&bad),
        ..idle_state(None, 0)
    };
    let frame = c.composite(W, H, &state).unwrap();
    assert_eq!((frame.width, frame.height), (W, H));
}

#[test]
fn camera_frame_fills_camera_panel() {
    let green = VideoFrame::from_rgba8(8, 6, [0u8, 255, 0, 255].repeat(48), 3);
    let mut c = compositor();
    let state = CompositeState {
        camera: Some(&green),
        ..idle_state(None, 0)
    };
    let frame = c.composite(W, H, &state).unwrap();
    assert!(near(frame.pixel(70, 90).unwrap(), [0, 255, 0], 2));
}

#[test]
fn camera_cache_follows_frame_identity_not_sequence() {
    let green = VideoFrame::from_rgba8(8, 6, [0u8, 255, 0, 255].repeat(48), 3);
    let blue = VideoFrame::from_rgba8(8, 6, [0u8, 0, 255, 255].repeat(48), 3);
    let mut c = compositor();

    let state = CompositeState {
        camera: Some(&green),
        ..idle_state(None, 0)
    };
    assert!(near(c.composite(W, H, &state).unwrap().pixel(70, 90).unwrap(), [0, 255, 0], 2));

    // A new feed restarts its sequence numbers.
    let state = CompositeState {
        camera: Some(&blue),
        ..idle_state(None, 0)
    };
    assert!(near(c.composite(W, H, &state).unwrap().pixel(70, 90).unwrap(), [0, 0, 255], 2));
}

#[test]
fn recording_stamps_timestamp_into_last_pixel() {
    let mut c = compositor();
    let state = CompositeState {
        recording: Some(RecordingOverlay { elapsed_secs: 5 }),
        now_ms: 0x0012_3456,
        ..idle_state(None, 0)
    };
    let frame = c.composite(W, H, &state).unwrap();
    assert_eq!(frame.pixel(W - 1, H - 1), Some([0x56, 0x34, 0x12, 255]));
}

#[test]
fn marks_differ_between_timestamps() {
    let mut c = compositor();
    let at = |now_ms| CompositeState {
        recording: Some(RecordingOverlay { elapsed_secs: 0 }),
        now_ms,
        ..idle_state(None, 0)
    };
    let a = c.composite(W, H, &at(1_000)).unwrap().pixel(W - 1, H - 1);
    let b = c.composite(W, H, &at(1_033)).unwrap().pixel(W - 1, H - 1);
    assert_ne!(a, b);
}

#[test]
fn marks_can_be_disabled() {
    let mut c = Compositor::new(CompositorOpts {
        frame_marks: false,
        ..CompositorOpts::default()
    })
    .unwrap();
    let state = CompositeState {
        recording: Some(RecordingOverlay { elapsed_secs: 0 }),
        now_ms: 0x0012_3456,
        ..idle_state(None, 0)
    };
    let frame = c.composite(W, H, &state).unwrap();
    assert_ne!(frame.pixel(W - 1, H - 1), Some([0x56, 0x34, 0x12, 255]));
}

#[test]
fn geometry_change_reallocates_buffers() {
    let mut c = compositor();
    c.composite(W, H, &idle_state(None, 0)).unwrap();
    let frame = c.composite(128, 72, &idle_state(None, 0)).unwrap();
    assert_eq!((frame.width, frame.height), (128, 72));
    assert_eq!(frame.data.len(), 128 * 72 * 4);
}

#[test]
fn invalid_geometry_is_rejected() {
    let mut c = compositor();
    assert!(c.composite(0, H, &idle_state(None, 0)).is_err());
}
