use super::*;

#[test]
fn transparent_frame_has_exact_length() {
    let f = FrameRGBA::transparent(4, 3);
    assert_eq!(f.data.len(), 4 * 3 * 4);
    assert!(f.premultiplied);
    assert_eq!(f.pixel(3, 2), Some([0, 0, 0, 0]));
    assert_eq!(f.pixel(4, 0), None);
}

#[test]
fn opaque_flatten_uses_background_for_transparent_pixels() {
    let mut f = FrameRGBA::transparent(2, 1);
    f.data[4..8].copy_from_slice(&[10, 20, 30, 255]);
    let out = f.to_opaque_rgba8([1, 2, 3]);
    assert_eq!(out, vec![1, 2, 3, 255, 10, 20, 30, 255]);
}

#[test]
fn write_png_round_trips_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("frame.png");
    let mut f = FrameRGBA::transparent(5, 2);
    f.data[0..4].copy_from_slice(&[255, 0, 0, 255]);
    f.write_png(&path).unwrap();

    let img = image::open(&path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (5, 2));
    assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
    assert_eq!(img.get_pixel(1, 0).0, [0, 0, 0, 255]);
}
