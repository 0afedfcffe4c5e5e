use super::*;

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
    let fps = Fps::new(30, 1).unwrap();
    assert_eq!(Fps::default(), fps);
}

#[test]
fn canvas_bounds_are_checked() {
    assert!(Canvas::new(0, 10).is_err());
    assert!(Canvas::new(70_000, 10).is_err());
    let c = Canvas::new(3840, 2160).unwrap();
    assert_eq!(c.byte_len(), 3840 * 2160 * 4);
}
