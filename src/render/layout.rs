//! Pure layout and animation math for the composition.
//!
//! Every function here depends only on its arguments. Time-varying terms take wall-clock
//! milliseconds, never frame counts.

use crate::foundation::core::Rect;

/// Left edge of the camera panel in pixels.
pub const CAMERA_MARGIN_X: f64 = 30.0;
/// Margin of the slide matte and camera backing around their content.
pub const MATTE_MARGIN: f64 = 5.0;

/// Slide panel region: x = 0.32W, width 0.65W, height 0.8H, vertically centered.
pub fn slide_region(width: u32, height: u32) -> Rect {
    let (w, h) = (f64::from(width), f64::from(height));
    let rw = w * 0.65;
    let rh = h * 0.8;
    let x = w * 0.32;
    let y = (h - rh) / 2.0;
    Rect::new(x, y, x + rw, y + rh)
}

/// Camera panel region: x = 30, width 0.25W, height 0.55H, vertically centered.
pub fn camera_region(width: u32, height: u32) -> Rect {
    let (w, h) = (f64::from(width), f64::from(height));
    let rw = w * 0.25;
    let rh = h * 0.55;
    let y = (h - rh) / 2.0;
    Rect::new(CAMERA_MARGIN_X, y, CAMERA_MARGIN_X + rw, y + rh)
}

/// Corner radius of the camera panel.
pub fn camera_corner_radius(region: Rect) -> f64 {
    region.width().min(region.height()) * 0.08
}

/// Largest rect with the source aspect ratio that fits inside `region`, centered.
pub fn fit_within(src_w: u32, src_h: u32, region: Rect) -> Rect {
    if src_w == 0 || src_h == 0 {
        return Rect::new(region.x0, region.y0, region.x0, region.y0);
    }
    let aspect = f64::from(src_w) / f64::from(src_h);
    let mut w = region.width();
    let mut h = w / aspect;
    if h > region.height() {
        h = region.height();
        w = h * aspect;
    }
    let x = region.x0 + (region.width() - w) / 2.0;
    let y = region.y0 + (region.height() - h) / 2.0;
    Rect::new(x, y, x + w, y + h)
}

/// Smallest rect with the source aspect ratio that covers `region`, centered on it.
///
/// The result overflows `region` along one axis; callers clip to `region`.
pub fn cover(src_w: u32, src_h: u32, region: Rect) -> Rect {
    if src_w == 0 || src_h == 0 {
        return region;
    }
    let src_aspect = f64::from(src_w) / f64::from(src_h);
    let dst_aspect = region.width() / region.height();
    let (w, h) = if src_aspect > dst_aspect {
        let h = region.height();
        (h * src_aspect, h)
    } else {
        let w = region.width();
        (w, w / src_aspect)
    };
    let x = region.x0 - (w - region.width()) / 2.0;
    let y = region.y0 - (h - region.height()) / 2.0;
    Rect::new(x, y, x + w, y + h)
}

/// `mm:ss` with zero padding. Minutes keep growing past 99.
pub fn format_mmss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn t(now_ms: u64, period: f64) -> f64 {
    (now_ms as f64 / period).sin()
}

/// Slide drop-shadow offset: `3 + 2·sin(t/1000)`.
pub fn slide_shadow_offset(now_ms: u64) -> f64 {
    3.0 + t(now_ms, 1000.0) * 2.0
}

/// Slide border hue in degrees: `(t/50) mod 360`.
pub fn slide_border_hue(now_ms: u64) -> f64 {
    (now_ms as f64 / 50.0) % 360.0
}

/// Scale of the "PRESENTATION" placeholder: `0.8 + 0.2·sin(t/500)`.
pub fn placeholder_pulse(now_ms: u64) -> f64 {
    0.8 + t(now_ms, 500.0) * 0.2
}

/// Camera drop-shadow offset: `5 + 3·sin(t/800)`.
pub fn camera_shadow_offset(now_ms: u64) -> f64 {
    5.0 + t(now_ms, 800.0) * 3.0
}

/// Camera border alpha: `0.7 + 0.3·sin(t/600)`.
pub fn camera_border_alpha(now_ms: u64) -> f64 {
    (0.7 + t(now_ms, 600.0) * 0.3).clamp(0.0, 1.0)
}

/// Camera placeholder fill alpha: `0.9 + 0.1·sin(t/1000)`.
pub fn camera_placeholder_alpha(now_ms: u64) -> f64 {
    (0.9 + t(now_ms, 1000.0) * 0.1).clamp(0.0, 1.0)
}

/// Recording dot pulse in `[0, 1]`: `0.5 + 0.5·sin(t/250)`.
pub fn rec_pulse(now_ms: u64) -> f64 {
    t(now_ms, 250.0) * 0.5 + 0.5
}

/// Font size of the camera placeholder labels: `min(28, w/12)`.
pub fn camera_label_size(region: Rect) -> f64 {
    (region.width() / 12.0).min(28.0)
}

/// Endpoints of the low-opacity uniqueness stroke for `now_ms` on a canvas of `width`.
pub fn unique_stroke(now_ms: u64, width: u32) -> ((f64, f64), (f64, f64)) {
    let w = u64::from(width.max(1));
    let u = now_ms % 10_000;
    ((((u % w) as f64), 0.0), ((((u + 100) % w) as f64), 10.0))
}

/// RGB carried by the bottom-right uniqueness pixel: the low 24 bits of `now_ms`.
pub fn unique_pixel_rgb(now_ms: u64) -> [u8; 3] {
    [
        (now_ms & 0xff) as u8,
        ((now_ms >> 8) & 0xff) as u8,
        ((now_ms >> 16) & 0xff) as u8,
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/render/layout.rs"]
mod tests;
