use std::sync::Arc;

use crate::foundation::color::Rgb8;
use crate::foundation::core::{Affine, Rect};
use crate::foundation::error::{SlidecastError, SlidecastResult};

pub(crate) fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

pub(crate) fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

/// Rounded rectangle outline as a path in canvas space.
pub(crate) fn rounded_rect_path(r: Rect, radius: f64) -> vello_cpu::kurbo::BezPath {
    use vello_cpu::kurbo::Shape as _;

    vello_cpu::kurbo::RoundedRect::from_rect(rect_to_cpu(r), radius).to_path(0.1)
}

/// Full circle as a path in canvas space.
pub(crate) fn circle_path(cx: f64, cy: f64, radius: f64) -> vello_cpu::kurbo::BezPath {
    use vello_cpu::kurbo::Shape as _;

    vello_cpu::kurbo::Circle::new((cx, cy), radius).to_path(0.1)
}

pub(crate) fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> SlidecastResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| SlidecastError::composite("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| SlidecastError::composite("pixmap height exceeds u16"))?;
    if w == 0 || h == 0 {
        return Err(SlidecastError::composite("pixmap has empty dimensions"));
    }
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(SlidecastError::composite(format!(
            "pixmap byte len mismatch: got {}, expected {}x{}x4",
            bytes.len(),
            width,
            height
        )));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        may_have_opacities |= px[3] != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

pub(crate) fn premul_to_image(
    bytes_premul: &[u8],
    width: u32,
    height: u32,
) -> SlidecastResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(bytes_premul, width, height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

/// Opaque two-stop gradient along the diagonal from `(0, 0)` to `(w, h)`.
///
/// Each pixel takes `t` as its projection onto the diagonal, so the top-left corner is `start`
/// and the bottom-right corner is `end`.
pub(crate) fn diagonal_gradient_premul(start: Rgb8, end: Rgb8, w: u32, h: u32) -> Vec<u8> {
    let mut bytes = vec![0u8; (w as usize).saturating_mul(h as usize).saturating_mul(4)];
    let (wf, hf) = (f64::from(w), f64::from(h));
    let len2 = wf * wf + hf * hf;
    for y in 0..h {
        for x in 0..w {
            let px = f64::from(x) + 0.5;
            let py = f64::from(y) + 0.5;
            let t = if len2 > 0.0 {
                ((px * wf + py * hf) / len2).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let c = start.lerp(end, t);
            let idx = ((y as usize) * (w as usize) + (x as usize)) * 4;
            bytes[idx..idx + 4].copy_from_slice(&[c.r, c.g, c.b, 255]);
        }
    }
    bytes
}

pub(crate) fn clear_pixmap_to_transparent(pixmap: &mut vello_cpu::Pixmap) {
    pixmap.data_as_u8_slice_mut().fill(0);
}

#[cfg(test)]
#[path = "../../tests/unit/render/paint.rs"]
mod tests;
