use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::foundation::core::{Affine, Point};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::paint::affine_to_cpu;

/// Font files probed when no font is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Label caches are cleared once they grow past this many entries.
const LABEL_CACHE_LIMIT: usize = 64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// Horizontal anchoring of a label relative to its anchor point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TextAlign {
    Left,
    Center,
}

/// Style of one single-line label.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct LabelStyle {
    pub(crate) size_px: f32,
    pub(crate) bold: bool,
    pub(crate) color: TextBrushRgba8,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct LabelKey {
    text: String,
    size_bits: u32,
    bold: bool,
    color: [u8; 4],
}

struct PreparedLabel {
    layout: parley::Layout<TextBrushRgba8>,
    width: f64,
    baseline: f64,
}

/// Loaded font shared by layout (parley) and glyph rasterization (vello_cpu).
struct LoadedFont {
    family_name: String,
    data: vello_cpu::peniko::FontData,
}

/// Shapes and draws short single-line labels with one registered font.
///
/// Without a font every draw call is a no-op.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    font: Option<LoadedFont>,
    labels: HashMap<LabelKey, Arc<PreparedLabel>>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    /// Engine without a font; labels are skipped.
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
            font: None,
            labels: HashMap::new(),
        }
    }

    /// Engine with the given font bytes registered.
    pub(crate) fn with_font_bytes(font_bytes: Vec<u8>) -> SlidecastResult<Self> {
        let mut engine = Self::new();
        engine.load_font(font_bytes)?;
        Ok(engine)
    }

    /// Engine using `path`, or the first system font found when `path` is `None`.
    pub(crate) fn discover(path: Option<&Path>) -> SlidecastResult<Self> {
        let Some(found) = path
            .map(Path::to_path_buf)
            .or_else(find_system_font)
        else {
            return Ok(Self::new());
        };
        let bytes = std::fs::read(&found).map_err(|e| {
            SlidecastError::validation(format!("failed to read font '{}': {e}", found.display()))
        })?;
        tracing::debug!(font = %found.display(), "font loaded");
        Self::with_font_bytes(bytes)
    }

    pub(crate) fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn load_font(&mut self, font_bytes: Vec<u8>) -> SlidecastResult<()> {
        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.clone()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            SlidecastError::validation("no font families registered from font bytes")
        })?;
        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| SlidecastError::validation("registered font family has no name"))?
            .to_string();

        self.font = Some(LoadedFont {
            family_name,
            data: vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(font_bytes), 0),
        });
        self.labels.clear();
        Ok(())
    }

    fn prepare(&mut self, text: &str, style: LabelStyle) -> SlidecastResult<Option<Arc<PreparedLabel>>> {
        let Some(font) = self.font.as_ref() else {
            return Ok(None);
        };
        if !style.size_px.is_finite() || style.size_px <= 0.0 {
            return Err(SlidecastError::composite(
                "label size_px must be finite and > 0",
            ));
        }

        let key = LabelKey {
            text: text.to_owned(),
            size_bits: style.size_px.to_bits(),
            bold: style.bold,
            color: [style.color.r, style.color.g, style.color.b, style.color.a],
        };
        if let Some(label) = self.labels.get(&key) {
            return Ok(Some(label.clone()));
        }

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(font.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(style.size_px));
        builder.push_default(parley::style::StyleProperty::Brush(style.color));
        if style.bold {
            builder.push_default(parley::style::StyleProperty::FontWeight(
                parley::style::FontWeight::BOLD,
            ));
        }

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);

        let baseline = layout
            .lines()
            .next()
            .map(|line| f64::from(line.metrics().baseline))
            .unwrap_or(f64::from(style.size_px));
        let label = Arc::new(PreparedLabel {
            width: f64::from(layout.width()),
            baseline,
            layout,
        });

        if self.labels.len() >= LABEL_CACHE_LIMIT {
            self.labels.clear();
        }
        self.labels.insert(key, label.clone());
        Ok(Some(label))
    }

    /// Draw `text` with its baseline at `anchor.y`, scaled by `scale` around the anchor.
    pub(crate) fn draw_label(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        text: &str,
        style: LabelStyle,
        anchor: Point,
        align: TextAlign,
        scale: f64,
    ) -> SlidecastResult<()> {
        let Some(label) = self.prepare(text, style)? else {
            return Ok(());
        };
        let Some(font) = self.font.as_ref() else {
            return Ok(());
        };

        let dx = match align {
            TextAlign::Left => 0.0,
            TextAlign::Center => -label.width / 2.0,
        };
        let transform = Affine::translate((anchor.x, anchor.y))
            * Affine::scale(scale)
            * Affine::translate((dx, -label.baseline));
        ctx.set_transform(affine_to_cpu(transform));
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        for line in label.layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));

                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font.data)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        Ok(())
    }
}

fn find_system_font() -> Option<PathBuf> {
    SYSTEM_FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
