use std::io::Cursor;

use super::*;

fn png_bytes(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[test]
fn image_rasterizer_yields_one_premultiplied_page() {
    let bytes = png_bytes(3, 2, [200, 100, 0, 255]);
    let pages = ImageRasterizer.rasterize(&bytes).unwrap();
    assert_eq!(pages.len(), 1);
    let p = &pages[0];
    assert_eq!((p.index, p.width, p.height), (0, 3, 2));
    assert_eq!(&p.rgba8_premul[0..4], &[200, 100, 0, 255]);
}

#[test]
fn image_rasterizer_rejects_unknown_bytes() {
    let err = ImageRasterizer.rasterize(b"hello world").unwrap_err();
    assert!(err.to_string().contains("unsupported format"));
}

#[test]
fn pdftoppm_rejects_non_pdf_before_spawning() {
    let r = PdftoppmRasterizer {
        dpi: 72,
        program: PathBuf::from("definitely-not-a-real-pdftoppm"),
    };
    let err = r.rasterize(b"GIF89a").unwrap_err();
    assert!(err.to_string().contains("missing %PDF header"));
}

#[test]
fn pdftoppm_missing_program_is_decode_error() {
    let r = PdftoppmRasterizer {
        dpi: 72,
        program: PathBuf::from("definitely-not-a-real-pdftoppm"),
    };
    let err = r.rasterize(b"%PDF-1.7\n").unwrap_err();
    assert!(matches!(err, SlidecastError::Decode(_)));
}

#[test]
fn auto_dispatches_images() {
    let bytes = png_bytes(1, 1, [0, 0, 0, 255]);
    let pages = AutoRasterizer::default().rasterize(&bytes).unwrap();
    assert_eq!(pages.len(), 1);
}

#[test]
fn page_numbers_parse_from_pdftoppm_names() {
    assert_eq!(page_number_from_stem("page-1"), Some(1));
    assert_eq!(page_number_from_stem("page-012"), Some(12));
    assert_eq!(page_number_from_stem("input"), None);
    assert_eq!(page_number_from_stem("other-3"), None);
}

#[test]
fn collect_pages_orders_numerically() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("page-10.png"), png_bytes(1, 1, [10, 0, 0, 255])).unwrap();
    std::fs::write(dir.path().join("page-2.png"), png_bytes(1, 1, [2, 0, 0, 255])).unwrap();
    std::fs::write(dir.path().join("input.pdf"), b"%PDF").unwrap();

    let pages = PdftoppmRasterizer::collect_pages(dir.path()).unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].rgba8_premul[0], 2);
    assert_eq!(pages[1].rgba8_premul[0], 10);
    assert_eq!(pages[1].index, 1);
}
