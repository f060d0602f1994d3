use std::sync::Arc;

use cupi_core::frame::FrameBuffer;

use crate::font::GlyphSource;

/// Marge autour du texte, en pixels.
pub const PADDING: f32 = 10.0;

/// Texte rasterisé hors-écran, source de la texture du plan.
///
/// Multi-line text is split on `\n`; lines share one height derived from the
/// ink extent of "M" and are spaced by `line_height × line_spacing`.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use cupi_ascii::font::BlockFont;
/// use cupi_ascii::text::TextCanvas;
///
/// let canvas = TextCanvas::new("CUPI", Arc::new(BlockFont), 200.0, 1.0, (253, 249, 243));
/// // 4 × 0.6 × 200 + 2 × 10, and a 140 px cap height + 2 × 10.
/// assert_eq!((canvas.width(), canvas.height()), (500, 160));
/// ```
pub struct TextCanvas {
    text: String,
    font: Arc<dyn GlyphSource>,
    font_size: f32,
    line_spacing: f32,
    color: (u8, u8, u8),
    ascent: f32,
    line_height: f32,
    buffer: FrameBuffer,
}

impl TextCanvas {
    /// Measure and paint `text`.
    #[must_use]
    pub fn new(
        text: &str,
        font: Arc<dyn GlyphSource>,
        font_size: f32,
        line_spacing: f32,
        color: (u8, u8, u8),
    ) -> Self {
        let mut canvas = Self {
            text: text.to_string(),
            font,
            font_size,
            line_spacing,
            color,
            ascent: 0.0,
            line_height: font_size,
            buffer: FrameBuffer::new(0, 0),
        };
        canvas.resize();
        canvas.render();
        canvas
    }

    fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }

    #[inline]
    fn step(&self) -> f32 {
        self.line_height * self.line_spacing
    }

    /// Recompute the raster size from the current text metrics.
    pub fn resize(&mut self) {
        let max_width = self
            .lines()
            .map(|line| {
                let sample = if line.is_empty() { " " } else { line };
                self.font.measure(sample, self.font_size).ceil()
            })
            .fold(0.0_f32, f32::max);

        let (ascent, descent) = self.font.cap_metrics(self.font_size);
        let measured = (ascent + descent).ceil();
        self.ascent = ascent;
        self.line_height = if measured > 0.0 { measured } else { self.font_size };

        let line_count = self.lines().count().max(1) as f32;
        let width = max_width + PADDING * 2.0;
        let height = self.line_height + self.step() * (line_count - 1.0) + PADDING * 2.0;
        self.buffer.resize(width as u32, height as u32);
    }

    /// Clear and paint every line.
    pub fn render(&mut self) {
        self.buffer.clear();
        let step = self.step();
        for (i, line) in self.text.split('\n').enumerate() {
            let baseline = PADDING + self.ascent + i as f32 * step;
            self.font
                .draw_line(line, self.font_size, PADDING, baseline, self.color, &mut self.buffer);
        }
    }

    /// Raster width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.buffer.width
    }

    /// Raster height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.buffer.height
    }

    /// Width over height, 1.0 for an empty raster.
    #[must_use]
    pub fn aspect(&self) -> f32 {
        if self.buffer.height == 0 {
            return 1.0;
        }
        self.buffer.width as f32 / self.buffer.height as f32
    }

    /// Shared line height in pixels.
    #[must_use]
    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    /// The painted pixels (straight alpha).
    #[must_use]
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::OutlineFont;

    /// Fixed metrics: every char is 37.3 px wide, "M" rises 71.2 and drops 3.1.
    struct FixedMetrics;

    impl GlyphSource for FixedMetrics {
        fn family(&self) -> &str {
            "fixed"
        }
        fn measure(&self, text: &str, _px: f32) -> f32 {
            text.chars().count() as f32 * 37.3
        }
        fn cap_metrics(&self, _px: f32) -> (f32, f32) {
            (71.2, 3.1)
        }
        fn draw_line(
            &self,
            _: &str,
            _: f32,
            _: f32,
            _: f32,
            _: (u8, u8, u8),
            _: &mut FrameBuffer,
        ) {
        }
    }

    struct NoInk;

    impl GlyphSource for NoInk {
        fn family(&self) -> &str {
            "none"
        }
        fn measure(&self, _text: &str, _px: f32) -> f32 {
            0.0
        }
        fn cap_metrics(&self, _px: f32) -> (f32, f32) {
            (0.0, 0.0)
        }
        fn draw_line(
            &self,
            _: &str,
            _: f32,
            _: f32,
            _: f32,
            _: (u8, u8, u8),
            _: &mut FrameBuffer,
        ) {
        }
    }

    #[test]
    fn single_line_is_measured_plus_padding() {
        let c = TextCanvas::new("CUPI", Arc::new(FixedMetrics), 100.0, 1.0, (255, 255, 255));
        // ceil(149.2) + 20, ceil(74.3) + 20.
        assert_eq!(c.width(), 170);
        assert_eq!(c.height(), 95);
        assert!((c.line_height() - 75.0).abs() < f32::EPSILON);
    }

    #[test]
    fn stacked_lines_use_spacing() {
        let c = TextCanvas::new("C\nU\nP\nI", Arc::new(FixedMetrics), 100.0, 1.08, (255, 255, 255));
        // 75 + 3 × 81 + 20 = 338
        assert_eq!(c.height(), 338);
        assert_eq!(c.width(), 58);
    }

    #[test]
    fn empty_line_measures_a_space() {
        let c = TextCanvas::new("AB\n", Arc::new(FixedMetrics), 100.0, 1.0, (255, 255, 255));
        assert_eq!(c.width(), 95);
        assert_eq!(c.height(), 170);
    }

    #[test]
    fn zero_ink_falls_back_to_font_size() {
        let c = TextCanvas::new("x", Arc::new(NoInk), 42.0, 1.0, (255, 255, 255));
        assert!((c.line_height() - 42.0).abs() < f32::EPSILON);
        assert_eq!((c.width(), c.height()), (20, 62));
    }

    #[test]
    fn outline_font_canvas_is_measured_plus_padding() {
        let data = include_bytes!("../assets/DejaVuSansMono.ttf").to_vec();
        let font = Arc::new(OutlineFont::from_bytes(data, "DejaVuSansMono".into()).unwrap());
        let width = font.measure("CUPI", 200.0);
        let (ascent, descent) = font.cap_metrics(200.0);
        assert!(ascent > 140.0);

        let c = TextCanvas::new("CUPI", font, 200.0, 1.0, (253, 249, 243));
        assert_eq!(c.width(), (width.ceil() + PADDING * 2.0) as u32);
        assert_eq!(c.height(), ((ascent + descent).ceil() + PADDING * 2.0) as u32);

        let fb = c.buffer();
        let row_inked = |y: u32| (0..fb.width).filter(|&x| fb.pixel(x, y).3 > 0).count();
        // Margins stay clear, the glyph body fills the band between them.
        assert_eq!(row_inked(0), 0);
        assert_eq!(row_inked(fb.height - 1), 0);
        assert!(row_inked(PADDING as u32 + 5) > 0);
        assert!(row_inked(fb.height / 2) > 0);
        assert!(row_inked(fb.height - PADDING as u32 - 5) > 0);
        let inked: usize = (0..fb.height).map(row_inked).sum();
        assert!(inked > 8000, "inked {inked}");
    }

    #[test]
    fn block_font_paints_inside_padding() {
        let c = TextCanvas::new("I", Arc::new(crate::font::BlockFont), 10.0, 1.0, (9, 8, 7));
        let fb = c.buffer();
        // Top bar of 'I' starts one unit right of the padding.
        assert_eq!(fb.pixel(11, 10), (9, 8, 7, 255));
        assert_eq!(fb.pixel(0, 0).3, 0);
    }
}
