use std::sync::Arc;

use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::foundation::math::premultiply_rgba8_in_place;
use crate::slides::raster::Rasterizer;

/// One pre-rasterized document page.
#[derive(Clone, Debug)]
pub struct Page {
    /// 0-based position in the document.
    pub index: usize,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 bytes, tightly packed, row-major.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl Page {
    /// Build a page from straight-alpha RGBA8 bytes.
    pub fn from_rgba8(index: usize, width: u32, height: u32, mut rgba8: Vec<u8>) -> Self {
        premultiply_rgba8_in_place(&mut rgba8);
        Self {
            index,
            width,
            height,
            rgba8_premul: Arc::new(rgba8),
        }
    }

    /// Build a page from a decoded image.
    pub fn from_image(index: usize, img: image::DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba8(index, width, height, rgba.into_raw())
    }

    /// Build a page filled with one opaque color. Handy for placeholders and tests.
    pub fn solid(index: usize, width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let px = (width as usize).saturating_mul(height as usize);
        let mut bytes = Vec::with_capacity(px.saturating_mul(4));
        for _ in 0..px {
            bytes.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        Self {
            index,
            width,
            height,
            rgba8_premul: Arc::new(bytes),
        }
    }

    fn validate(&self) -> SlidecastResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SlidecastError::decode(format!(
                "page {} has empty dimensions {}x{}",
                self.index, self.width, self.height
            )));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(SlidecastError::decode(format!(
                "page {} is too large: {}x{}",
                self.index, self.width, self.height
            )));
        }
        let expected = (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(4);
        if self.rgba8_premul.len() != expected {
            return Err(SlidecastError::decode(format!(
                "page {} buffer is {} bytes, expected {expected}",
                self.index,
                self.rgba8_premul.len()
            )));
        }
        Ok(())
    }
}

/// An immutable, fully validated set of pages.
#[derive(Debug)]
pub struct Document {
    generation: u64,
    pages: Vec<Page>,
}

impl Document {
    /// Load generation, unique per [`SlideStore`]. Changes on every replace.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Pages in order.
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Number of pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Return `true` when the document has no pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Page at `index`, if any.
    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }
}

/// Holds the currently loaded document and the active-page cursor.
#[derive(Debug, Default)]
pub struct SlideStore {
    document: Option<Arc<Document>>,
    active: usize,
    generations: u64,
}

impl SlideStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rasterize `bytes` and replace the current document.
    ///
    /// On failure the previous document and cursor are kept.
    pub fn load(&mut self, bytes: &[u8], rasterizer: &dyn Rasterizer) -> SlidecastResult<usize> {
        let pages = rasterizer.rasterize(bytes)?;
        self.replace(pages)
    }

    /// Replace the current document with already rasterized pages.
    ///
    /// All pages are validated before anything is swapped in. Pages are re-indexed by
    /// position and the active page resets to 0.
    pub fn replace(&mut self, mut pages: Vec<Page>) -> SlidecastResult<usize> {
        if pages.is_empty() {
            return Err(SlidecastError::decode("document has no pages"));
        }
        for (i, page) in pages.iter_mut().enumerate() {
            page.index = i;
            page.validate()?;
        }

        self.generations = self.generations.wrapping_add(1);
        let count = pages.len();
        self.document = Some(Arc::new(Document {
            generation: self.generations,
            pages,
        }));
        self.active = 0;
        tracing::info!(pages = count, "document loaded");
        Ok(count)
    }

    /// Drop the current document.
    pub fn clear(&mut self) {
        self.document = None;
        self.active = 0;
    }

    /// Shared handle to the current document.
    pub fn document(&self) -> Option<Arc<Document>> {
        self.document.clone()
    }

    /// Page at `index` of the current document.
    pub fn get(&self, index: usize) -> SlidecastResult<&Page> {
        let doc = self
            .document
            .as_ref()
            .ok_or_else(|| SlidecastError::not_found("no document loaded"))?;
        doc.page(index).ok_or_else(|| {
            SlidecastError::not_found(format!(
                "page {index} out of range (document has {} pages)",
                doc.len()
            ))
        })
    }

    /// Number of pages in the current document (0 when none).
    pub fn page_count(&self) -> usize {
        self.document.as_ref().map_or(0, |d| d.len())
    }

    /// Active page index.
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Move the cursor to `index`.
    pub fn select(&mut self, index: usize) -> SlidecastResult<()> {
        self.get(index)?;
        self.active = index;
        Ok(())
    }

    /// Advance one page, stopping at the last. Returns the new index.
    pub fn next(&mut self) -> usize {
        let count = self.page_count();
        if count > 0 && self.active + 1 < count {
            self.active += 1;
        }
        self.active
    }

    /// Go back one page, stopping at the first. Returns the new index.
    pub fn prev(&mut self) -> usize {
        self.active = self.active.saturating_sub(1);
        self.active
    }
}

#[cfg(test)]
#[path = "../../tests/unit/slides/store.rs"]
mod tests;
