use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::foundation::math::flatten_premul_over_bg;

/// A composited frame as RGBA8 pixels.
///
/// Frames produced by the compositor are **premultiplied alpha**. The `premultiplied` flag makes
/// this explicit at API boundaries.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Allocate a fully transparent premultiplied frame.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; (width as usize) * (height as usize) * 4],
            premultiplied: true,
        }
    }

    /// RGBA8 bytes of the pixel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Flatten onto an opaque background and return straight RGBA8 bytes.
    pub fn to_opaque_rgba8(&self, bg_rgb: [u8; 3]) -> Vec<u8> {
        let mut out = vec![0u8; self.data.len()];
        if self.premultiplied {
            flatten_premul_over_bg(&mut out, &self.data, bg_rgb);
        } else {
            let mut premul = self.data.clone();
            crate::foundation::math::premultiply_rgba8_in_place(&mut premul);
            flatten_premul_over_bg(&mut out, &premul, bg_rgb);
        }
        out
    }

    /// Write the frame as an opaque PNG (flattened over black).
    pub fn write_png(&self, path: &Path) -> SlidecastResult<()> {
        let rgba = self.to_opaque_rgba8([0, 0, 0]);
        let img = image::RgbaImage::from_raw(self.width, self.height, rgba)
            .ok_or_else(|| SlidecastError::validation("frame buffer does not match geometry"))?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
        }
        img.save(path)
            .with_context(|| format!("failed to write png '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/backend.rs"]
mod tests;
