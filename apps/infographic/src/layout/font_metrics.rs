//! Text measurement and rasterization backed by the bundled DejaVu Sans face.
//!
//! `font_size` is the em size in pixels. A multi-line string (lines separated
//! by `\n`) measures as wide as its widest line and as tall as
//! `lines * (ascent - descent) + (lines - 1) * LINE_SPACING`. Spaces count
//! toward line width, so `"a \n b"` is measured exactly as it will be drawn.

use ab_glyph::{point, Font, FontArc, GlyphId, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use thiserror::Error;

/// Vertical gap between consecutive lines, in pixels.
pub const LINE_SPACING: f32 = 4.0;

static DEJAVU_SANS: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

#[derive(Debug, Error)]
pub enum FontError {
    #[error("invalid font data: {0}")]
    Invalid(#[from] ab_glyph::InvalidFont),
}

/// Rendered size of a (possibly multi-line) string.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextExtent {
    pub width: f32,
    pub height: f32,
}

/// Anything that can tell how large a string renders at a given font size.
pub trait TextMeasure {
    fn measure(&self, text: &str, font_size: u32) -> TextExtent;
}

/// Measures and draws text with a single TrueType face.
#[derive(Clone)]
pub struct Typesetter {
    font: FontArc,
}

impl std::fmt::Debug for Typesetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typesetter").finish_non_exhaustive()
    }
}

impl Typesetter {
    /// The face compiled into the binary.
    pub fn dejavu_sans() -> Result<Self, FontError> {
        Ok(Self {
            font: FontArc::try_from_slice(DEJAVU_SANS)?,
        })
    }

    /// ab_glyph scales by `ascent - descent`; convert from an em size.
    fn scale(&self, font_size: u32) -> PxScale {
        let em = font_size as f32;
        match self.font.units_per_em() {
            Some(units_per_em) if units_per_em > 0.0 => {
                PxScale::from(em * self.font.height_unscaled() / units_per_em)
            }
            _ => PxScale::from(em),
        }
    }

    fn line_width<F: Font>(scaled: &ab_glyph::PxScaleFont<F>, line: &str) -> f32 {
        let mut width = 0.0;
        let mut prev: Option<GlyphId> = None;
        for c in line.chars() {
            let id = scaled.glyph_id(c);
            if let Some(p) = prev {
                width += scaled.kern(p, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width
    }

    /// Draws `text` with its top-left corner at `(left, top)`. Pixels outside
    /// the canvas are clipped; a `font_size` of zero draws nothing.
    pub fn draw(
        &self,
        canvas: &mut RgbImage,
        left: i64,
        top: i64,
        text: &str,
        font_size: u32,
        color: Rgb<u8>,
    ) {
        if font_size == 0 || text.is_empty() {
            return;
        }
        let scale = self.scale(font_size);
        let scaled = self.font.as_scaled(scale);
        let line_height = scaled.ascent() - scaled.descent();
        let (canvas_w, canvas_h) = (canvas.width() as i64, canvas.height() as i64);

        for (i, line) in text.split('\n').enumerate() {
            let baseline = top as f32 + i as f32 * (line_height + LINE_SPACING) + scaled.ascent();
            let mut caret = left as f32;
            let mut prev: Option<GlyphId> = None;

            for c in line.chars() {
                let id = scaled.glyph_id(c);
                if let Some(p) = prev {
                    caret += scaled.kern(p, id);
                }
                let glyph = id.with_scale_and_position(scale, point(caret, baseline));
                caret += scaled.h_advance(id);
                prev = Some(id);

                let Some(outlined) = self.font.outline_glyph(glyph) else {
                    continue;
                };
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let x = bounds.min.x as i64 + gx as i64;
                    let y = bounds.min.y as i64 + gy as i64;
                    if x < 0 || y < 0 || x >= canvas_w || y >= canvas_h {
                        return;
                    }
                    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
                    let coverage = coverage.clamp(0.0, 1.0);
                    for (dst, src) in pixel.0.iter_mut().zip(color.0) {
                        *dst = (*dst as f32 * (1.0 - coverage) + src as f32 * coverage).round()
                            as u8;
                    }
                });
            }
        }
    }
}

impl TextMeasure for Typesetter {
    fn measure(&self, text: &str, font_size: u32) -> TextExtent {
        if text.is_empty() {
            return TextExtent::default();
        }
        let scaled = self.font.as_scaled(self.scale(font_size));
        let line_height = scaled.ascent() - scaled.descent();

        let mut width = 0.0_f32;
        let mut lines = 0usize;
        for line in text.split('\n') {
            width = width.max(Self::line_width(&scaled, line));
            lines += 1;
        }
        let height = lines as f32 * line_height + (lines - 1) as f32 * LINE_SPACING;
        TextExtent { width, height }
    }
}
