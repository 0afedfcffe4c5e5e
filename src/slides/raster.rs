use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context as _;

use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::slides::store::Page;

/// Turns uploaded document bytes into one bitmap per page.
///
/// Implementations either return every page or an error; they never return a partial document.
pub trait Rasterizer: Send + Sync {
    /// Rasterize all pages of `bytes`.
    fn rasterize(&self, bytes: &[u8]) -> SlidecastResult<Vec<Page>>;
}

/// Decodes a single raster image (PNG, JPEG, ...) as a one-page document.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageRasterizer;

impl Rasterizer for ImageRasterizer {
    fn rasterize(&self, bytes: &[u8]) -> SlidecastResult<Vec<Page>> {
        let format = image::guess_format(bytes)
            .map_err(|e| SlidecastError::unsupported_format(format!("not a raster image: {e}")))?;
        let img = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| SlidecastError::decode(format!("decode {format:?} image: {e}")))?;
        Ok(vec![Page::from_image(0, img)])
    }
}

/// Rasterizes PDF documents through poppler's `pdftoppm`.
#[derive(Clone, Debug)]
pub struct PdftoppmRasterizer {
    /// Render resolution. 144 dpi matches a 2x viewport of a 72 dpi page.
    pub dpi: u32,
    /// Program to invoke.
    pub program: PathBuf,
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self {
            dpi: 144,
            program: PathBuf::from("pdftoppm"),
        }
    }
}

impl PdftoppmRasterizer {
    fn collect_pages(dir: &Path) -> SlidecastResult<Vec<Page>> {
        let mut numbered = Vec::new();
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("list rasterized pages in '{}'", dir.display()))?;
        for entry in entries {
            let path = entry.context("read rasterized page entry")?.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Some(num) = page_number_from_stem(stem) else {
                continue;
            };
            numbered.push((num, path));
        }
        numbered.sort_by_key(|(n, _)| *n);

        let mut pages = Vec::with_capacity(numbered.len());
        for (i, (_, path)) in numbered.into_iter().enumerate() {
            let bytes =
                std::fs::read(&path).with_context(|| format!("read '{}'", path.display()))?;
            let img = image::load_from_memory_with_format(&bytes, image::ImageFormat::Png)
                .map_err(|e| SlidecastError::decode(format!("page {}: {e}", i + 1)))?;
            pages.push(Page::from_image(i, img));
        }
        Ok(pages)
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn rasterize(&self, bytes: &[u8]) -> SlidecastResult<Vec<Page>> {
        if !is_pdf(bytes) {
            return Err(SlidecastError::unsupported_format("missing %PDF header"));
        }

        let dir = tempfile::tempdir().context("create rasterization temp dir")?;
        let input = dir.path().join("input.pdf");
        std::fs::write(&input, bytes).context("write pdf to temp dir")?;
        let prefix = dir.path().join("page");

        let out = Command::new(&self.program)
            .args(["-r", &self.dpi.to_string(), "-png"])
            .arg(&input)
            .arg(&prefix)
            .output()
            .map_err(|e| {
                SlidecastError::decode(format!(
                    "failed to run '{}' (is poppler installed?): {e}",
                    self.program.display()
                ))
            })?;
        if !out.status.success() {
            return Err(SlidecastError::decode(format!(
                "pdftoppm exited with status {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let pages = Self::collect_pages(dir.path())?;
        if pages.is_empty() {
            return Err(SlidecastError::decode("pdftoppm produced no pages"));
        }
        tracing::debug!(pages = pages.len(), dpi = self.dpi, "pdf rasterized");
        Ok(pages)
    }
}

/// Picks PDF or raster-image decoding from the leading bytes.
#[derive(Clone, Debug, Default)]
pub struct AutoRasterizer {
    /// PDF backend.
    pub pdf: PdftoppmRasterizer,
    /// Single-image backend.
    pub image: ImageRasterizer,
}

impl Rasterizer for AutoRasterizer {
    fn rasterize(&self, bytes: &[u8]) -> SlidecastResult<Vec<Page>> {
        if is_pdf(bytes) {
            self.pdf.rasterize(bytes)
        } else {
            self.image.rasterize(bytes)
        }
    }
}

fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

/// `pdftoppm` names pages `<prefix>-<n>` with `n` zero-padded to the page count width.
fn page_number_from_stem(stem: &str) -> Option<u32> {
    let (prefix, num) = stem.rsplit_once('-')?;
    if prefix != "page" {
        return None;
    }
    num.parse().ok()
}

#[cfg(test)]
#[path = "../../tests/unit/slides/raster.rs"]
mod tests;
