use std::collections::HashMap;
use std::path::PathBuf;

use crate::capture::source::VideoFrame;
use crate::foundation::color::Rgb8;
use crate::foundation::core::{Affine, Canvas, Point, Rect};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::render::backend::FrameRGBA;
use crate::render::layout;
use crate::render::paint::{
    affine_to_cpu, circle_path, clear_pixmap_to_transparent, diagonal_gradient_premul,
    premul_to_image, rect_to_cpu, rounded_rect_path,
};
use crate::render::text::{LabelStyle, TextAlign, TextBrushRgba8, TextLayoutEngine};
use crate::render::theme::Theme;
use crate::slides::store::{Document, Page};

const PLACEHOLDER_GRAY: Rgb8 = Rgb8::new(0x6b, 0x72, 0x80);
const CAMERA_LABEL_GRAY: Rgb8 = Rgb8::new(0x9c, 0xa3, 0xaf);
const CAMERA_PANEL: Rgb8 = Rgb8::new(55, 65, 81);
const CAMERA_BORDER: Rgb8 = Rgb8::new(59, 130, 246);
const REC_RED: Rgb8 = Rgb8::new(0xef, 0x44, 0x44);
const SLIDE_INFO: Rgb8 = Rgb8::new(0x37, 0x41, 0x51);
const BLACK: Rgb8 = Rgb8::new(0, 0, 0);
const WHITE: Rgb8 = Rgb8::new(255, 255, 255);

/// Recording decoration drawn on top of the composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordingOverlay {
    /// Whole seconds since the session became active.
    pub elapsed_secs: u64,
}

/// Everything one composite reads. Rebuilt every tick and never persisted.
#[derive(Clone, Copy, Debug)]
pub struct CompositeState<'a> {
    /// Loaded document, if any.
    pub document: Option<&'a Document>,
    /// Active page index; out-of-range values draw the placeholder.
    pub page_index: usize,
    /// Latest camera frame, if the camera is active and has produced one.
    pub camera: Option<&'a VideoFrame>,
    /// Recording decoration, present only while a session is active.
    pub recording: Option<RecordingOverlay>,
    /// Background theme.
    pub theme: Theme,
    /// Wall-clock milliseconds driving every animation term.
    pub now_ms: u64,
}

impl<'a> CompositeState<'a> {
    /// Active page, or `None` when no document is loaded or the index is out of range.
    pub fn page(&self) -> Option<&'a Page> {
        self.document.and_then(|d| d.page(self.page_index))
    }

    /// Number of pages in the loaded document.
    pub fn page_count(&self) -> usize {
        self.document.map_or(0, Document::len)
    }
}

/// Options for [`Compositor`].
#[derive(Clone, Debug)]
pub struct CompositorOpts {
    /// Font used for labels. When `None`, common system fonts are probed.
    pub font_path: Option<PathBuf>,
    /// Draw the per-frame uniqueness marks while recording.
    pub frame_marks: bool,
}

impl Default for CompositorOpts {
    fn default() -> Self {
        Self {
            font_path: None,
            frame_marks: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct GradientKey {
    start: Rgb8,
    end: Rgb8,
    w: u32,
    h: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct SlideKey {
    generation: u64,
    index: usize,
}

/// Draws [`CompositeState`] snapshots into a reused fixed-size frame buffer.
pub struct Compositor {
    opts: CompositorOpts,
    ctx: Option<vello_cpu::RenderContext>,
    pixmap: Option<vello_cpu::Pixmap>,
    frame: FrameRGBA,

    gradient_cache: HashMap<GradientKey, vello_cpu::Image>,
    slide_cache: HashMap<SlideKey, vello_cpu::Image>,
    camera_cache: Option<(u64, vello_cpu::Image)>,
    text_engine: TextLayoutEngine,
}

impl Compositor {
    /// Build a compositor, loading the configured (or a system) font.
    pub fn new(opts: CompositorOpts) -> SlidecastResult<Self> {
        let text_engine = TextLayoutEngine::discover(opts.font_path.as_deref())?;
        if !text_engine.has_font() {
            tracing::warn!("no font configured or found; text labels will be skipped");
        }
        Ok(Self {
            opts,
            ctx: None,
            pixmap: None,
            frame: FrameRGBA::transparent(0, 0),
            gradient_cache: HashMap::new(),
            slide_cache: HashMap::new(),
            camera_cache: None,
            text_engine,
        })
    }

    /// Whether text labels can be drawn.
    pub fn has_font(&self) -> bool {
        self.text_engine.has_font()
    }

    /// Compose one frame of exactly `width`×`height`.
    ///
    /// Layer faults are logged and replaced by that layer's placeholder; only invalid geometry
    /// fails the call.
    pub fn composite(
        &mut self,
        width: u32,
        height: u32,
        state: &CompositeState<'_>,
    ) -> SlidecastResult<&FrameRGBA> {
        let canvas = Canvas::new(width, height)?;
        let (w16, h16) = (width as u16, height as u16);

        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w16 && ctx.height() == h16 => ctx,
            _ => vello_cpu::RenderContext::new(w16, h16),
        };
        ctx.reset();

        self.draw_layers(&mut ctx, canvas, state);

        ctx.flush();
        let mut pixmap = match self.pixmap.take() {
            Some(p) if p.width() == w16 && p.height() == h16 => p,
            _ => vello_cpu::Pixmap::new(w16, h16),
        };
        clear_pixmap_to_transparent(&mut pixmap);
        ctx.render_to_pixmap(&mut pixmap);

        if self.frame.width != width || self.frame.height != height {
            self.frame = FrameRGBA::transparent(width, height);
        }
        self.frame
            .data
            .copy_from_slice(pixmap.data_as_u8_slice());

        if state.recording.is_some() && self.opts.frame_marks {
            let [r, g, b] = layout::unique_pixel_rgb(state.now_ms);
            let n = self.frame.data.len();
            self.frame.data[n - 4..].copy_from_slice(&[r, g, b, 255]);
        }

        self.ctx = Some(ctx);
        self.pixmap = Some(pixmap);
        Ok(&self.frame)
    }

    fn draw_layers(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        canvas: Canvas,
        state: &CompositeState<'_>,
    ) {
        if let Err(e) = self.draw_background(ctx, canvas, state.theme) {
            tracing::warn!(layer = "background", error = %e, "layer failed; using flat base color");
            fill_rect(ctx, full_rect(canvas), state.theme.base().opaque());
        }

        let slide = match state.page() {
            Some(page) => {
                let generation = state.document.map_or(0, Document::generation);
                self.draw_slide(ctx, canvas, page, generation, state.now_ms)
            }
            None => Err(SlidecastError::not_found("no active page")),
        };
        if let Err(e) = slide {
            if state.page_count() > 0 {
                tracing::warn!(layer = "slide", error = %e, "layer failed; drawing placeholder");
            }
            self.guard("slide placeholder", |this| {
                this.draw_slide_placeholder(ctx, canvas, state.now_ms)
            });
        }

        let camera = match state.camera {
            Some(frame) => self.draw_camera(ctx, canvas, frame, state.now_ms),
            None => Err(SlidecastError::not_found("no camera frame")),
        };
        if let Err(e) = camera {
            if state.camera.is_some() {
                tracing::warn!(layer = "camera", error = %e, "layer failed; drawing placeholder");
            }
            self.guard("camera placeholder", |this| {
                this.draw_camera_placeholder(ctx, canvas, state.now_ms)
            });
        }

        if let Some(overlay) = state.recording {
            self.guard("recording overlay", |this| {
                this.draw_overlay(ctx, canvas, state, overlay)
            });
        }
    }

    fn guard(&mut self, layer: &'static str, f: impl FnOnce(&mut Self) -> SlidecastResult<()>) {
        if let Err(e) = f(self) {
            tracing::warn!(layer, error = %e, "layer failed; skipped");
        }
    }

    fn draw_background(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        canvas: Canvas,
        theme: Theme,
    ) -> SlidecastResult<()> {
        let key = GradientKey {
            start: theme.base(),
            end: theme.accent(),
            w: canvas.width,
            h: canvas.height,
        };
        let paint = match self.gradient_cache.get(&key) {
            Some(img) => img.clone(),
            None => {
                let bytes = diagonal_gradient_premul(key.start, key.end, key.w, key.h);
                let img = premul_to_image(&bytes, key.w, key.h)?;
                self.gradient_cache.retain(|k, _| k.w == key.w && k.h == key.h);
                self.gradient_cache.insert(key, img.clone());
                img
            }
        };

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(paint);
        ctx.fill_rect(&rect_to_cpu(full_rect(canvas)));
        Ok(())
    }

    fn slide_image(&mut self, page: &Page, generation: u64) -> SlidecastResult<vello_cpu::Image> {
        let key = SlideKey {
            generation,
            index: page.index,
        };
        if let Some(img) = self.slide_cache.get(&key) {
            return Ok(img.clone());
        }
        let img = premul_to_image(&page.rgba8_premul, page.width, page.height)?;
        self.slide_cache.retain(|k, _| k.generation == generation);
        self.slide_cache.insert(key, img.clone());
        Ok(img)
    }

    fn draw_slide(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        canvas: Canvas,
        page: &Page,
        generation: u64,
        now_ms: u64,
    ) -> SlidecastResult<()> {
        let image = self.slide_image(page, generation)?;
        let region = layout::slide_region(canvas.width, canvas.height);
        let dst = layout::fit_within(page.width, page.height, region);
        let m = layout::MATTE_MARGIN;

        let off = layout::slide_shadow_offset(now_ms);
        fill_rect(
            ctx,
            Rect::new(
                dst.x0 + off,
                dst.y0 + off,
                dst.x0 + off + dst.width() + 2.0 * m,
                dst.y0 + off + dst.height() + 2.0 * m,
            ),
            BLACK.with_alpha(0.2),
        );
        fill_rect(ctx, dst.inflate(m, m), WHITE.opaque());

        let transform = Affine::translate((dst.x0, dst.y0))
            * Affine::scale_non_uniform(
                dst.width() / f64::from(page.width),
                dst.height() / f64::from(page.height),
            );
        ctx.set_transform(affine_to_cpu(transform));
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(image);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(page.width),
            f64::from(page.height),
        ));
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);

        let border = Rgb8::from_hsl(layout::slide_border_hue(now_ms), 0.5, 0.6);
        ctx.set_paint(border.opaque());
        ctx.set_stroke(vello_cpu::kurbo::Stroke::new(3.0));
        ctx.stroke_rect(&rect_to_cpu(dst));
        Ok(())
    }

    fn draw_slide_placeholder(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        canvas: Canvas,
        now_ms: u64,
    ) -> SlidecastResult<()> {
        let (w, h) = (f64::from(canvas.width), f64::from(canvas.height));
        let color = brush(PLACEHOLDER_GRAY);
        self.text_engine.draw_label(
            ctx,
            "PRESENTATION",
            LabelStyle {
                size_px: 48.0,
                bold: false,
                color,
            },
            Point::new(w * 0.65, h / 2.0),
            TextAlign::Center,
            layout::placeholder_pulse(now_ms),
        )?;
        self.text_engine.draw_label(
            ctx,
            "Upload a PDF file",
            LabelStyle {
                size_px: 24.0,
                bold: false,
                color,
            },
            Point::new(w * 0.65, h / 2.0 + 50.0),
            TextAlign::Center,
            1.0,
        )
    }

    fn camera_image(&mut self, frame: &VideoFrame) -> SlidecastResult<vello_cpu::Image> {
        if let Some((id, img)) = &self.camera_cache
            && *id == frame.id()
        {
            return Ok(img.clone());
        }
        let img = premul_to_image(&frame.rgba8_premul, frame.width, frame.height)?;
        self.camera_cache = Some((frame.id(), img.clone()));
        Ok(img)
    }

    fn draw_camera(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        canvas: Canvas,
        frame: &VideoFrame,
        now_ms: u64,
    ) -> SlidecastResult<()> {
        let image = self.camera_image(frame)?;
        let region = layout::camera_region(canvas.width, canvas.height);
        let radius = layout::camera_corner_radius(region);
        let m = layout::MATTE_MARGIN;

        let off = layout::camera_shadow_offset(now_ms);
        let shadow = Rect::new(
            region.x0 + off,
            region.y0 + off,
            region.x0 + off + region.width() + 2.0 * m,
            region.y0 + off + region.height() + 2.0 * m,
        );
        fill_path(ctx, &rounded_rect_path(shadow, radius), BLACK.with_alpha(0.3));
        fill_path(
            ctx,
            &rounded_rect_path(region.inflate(m, m), radius),
            BLACK.opaque(),
        );

        // Filling the panel shape in image space clips the cover-fit frame to the rounded rect.
        let dst = layout::cover(frame.width, frame.height, region);
        let transform = affine_to_cpu(
            Affine::translate((dst.x0, dst.y0))
                * Affine::scale_non_uniform(
                    dst.width() / f64::from(frame.width),
                    dst.height() / f64::from(frame.height),
                ),
        );
        let clip_in_image_space = transform.inverse() * rounded_rect_path(region, radius);
        ctx.set_transform(transform);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(image);
        ctx.fill_path(&clip_in_image_space);
        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);

        ctx.set_paint(CAMERA_BORDER.with_alpha(layout::camera_border_alpha(now_ms)));
        ctx.set_stroke(vello_cpu::kurbo::Stroke::new(5.0));
        ctx.stroke_path(&rounded_rect_path(region, radius));
        Ok(())
    }

    fn draw_camera_placeholder(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        canvas: Canvas,
        now_ms: u64,
    ) -> SlidecastResult<()> {
        let region = layout::camera_region(canvas.width, canvas.height);
        let radius = layout::camera_corner_radius(region);
        let panel = rounded_rect_path(region, radius);

        fill_path(
            ctx,
            &panel,
            CAMERA_PANEL.with_alpha(layout::camera_placeholder_alpha(now_ms)),
        );

        ctx.set_paint(PLACEHOLDER_GRAY.opaque());
        ctx.set_stroke(vello_cpu::kurbo::Stroke::new(2.0));
        ctx.stroke_path(&panel);

        let style = LabelStyle {
            size_px: layout::camera_label_size(region) as f32,
            bold: false,
            color: brush(CAMERA_LABEL_GRAY),
        };
        let c = region.center();
        self.text_engine.draw_label(
            ctx,
            "CAMERA",
            style,
            Point::new(c.x, c.y - 15.0),
            TextAlign::Center,
            1.0,
        )?;
        self.text_engine.draw_label(
            ctx,
            "DEACTIVATED",
            style,
            Point::new(c.x, c.y + 25.0),
            TextAlign::Center,
            1.0,
        )
    }

    fn draw_overlay(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        canvas: Canvas,
        state: &CompositeState<'_>,
        overlay: RecordingOverlay,
    ) -> SlidecastResult<()> {
        let (w, h) = (f64::from(canvas.width), f64::from(canvas.height));
        let (cx, cy) = (w - 100.0, 60.0);
        let p = layout::rec_pulse(state.now_ms);

        fill_path(
            ctx,
            &circle_path(cx, cy, 18.0 + p * 5.0),
            REC_RED.with_alpha(0.7 + p * 0.3),
        );
        ctx.set_paint(REC_RED.opaque());
        ctx.set_stroke(vello_cpu::kurbo::Stroke::new(3.0));
        ctx.stroke_path(&circle_path(cx, cy, 25.0));

        if self.opts.frame_marks {
            let ((x0, y0), (x1, y1)) = layout::unique_stroke(state.now_ms, canvas.width);
            let mut line = vello_cpu::kurbo::BezPath::new();
            line.move_to((x0, y0));
            line.line_to((x1, y1));
            ctx.set_paint(vello_cpu::peniko::Color::new([1.0, 1.0, 1.0, 0.001]));
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(1.0));
            ctx.stroke_path(&line);
        }

        self.text_engine.draw_label(
            ctx,
            &format!("● REC {}", layout::format_mmss(overlay.elapsed_secs)),
            LabelStyle {
                size_px: 28.0,
                bold: true,
                color: brush(REC_RED),
            },
            Point::new(w - 320.0, 70.0),
            TextAlign::Left,
            1.0,
        )?;

        let count = state.page_count();
        if count > 0 {
            self.text_engine.draw_label(
                ctx,
                &format!("Slide {} of {}", state.page_index + 1, count),
                LabelStyle {
                    size_px: 20.0,
                    bold: false,
                    color: brush(SLIDE_INFO),
                },
                Point::new(w - 320.0, h - 40.0),
                TextAlign::Left,
                1.0,
            )?;
        }
        Ok(())
    }
}

fn full_rect(canvas: Canvas) -> Rect {
    Rect::new(0.0, 0.0, f64::from(canvas.width), f64::from(canvas.height))
}

fn brush(c: Rgb8) -> TextBrushRgba8 {
    TextBrushRgba8 {
        r: c.r,
        g: c.g,
        b: c.b,
        a: 255,
    }
}

fn fill_rect(ctx: &mut vello_cpu::RenderContext, r: Rect, color: vello_cpu::peniko::Color) {
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(color);
    ctx.fill_rect(&rect_to_cpu(r));
}

fn fill_path(
    ctx: &mut vello_cpu::RenderContext,
    path: &vello_cpu::kurbo::BezPath,
    color: vello_cpu::peniko::Color,
) {
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(color);
    ctx.fill_path(path);
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
