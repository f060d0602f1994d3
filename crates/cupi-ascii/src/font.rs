use std::path::Path;
use std::sync::Arc;

use ab_glyph::{Font, FontVec, PxScale, ScaleFont, point};
use cupi_core::config::AsciiTextConfig;
use cupi_core::error::CoreError;
use cupi_core::frame::FrameBuffer;

/// Source de glyphes : mesure et peinture d'une ligne de texte.
///
/// Implémenté par : `OutlineFont` (TTF/OTF), `BlockFont` (bitmap intégrée).
pub trait GlyphSource: Send + Sync {
    /// Family name shown in logs.
    fn family(&self) -> &str;

    /// Advance width of `text` at `px`, in pixels.
    fn measure(&self, text: &str, px: f32) -> f32;

    /// Ink ascent and descent of "M" at `px` (both ≥ 0).
    fn cap_metrics(&self, px: f32) -> (f32, f32);

    /// Paint `text` starting at `x` with its baseline at `baseline`.
    fn draw_line(
        &self,
        text: &str,
        px: f32,
        x: f32,
        baseline: f32,
        color: (u8, u8, u8),
        target: &mut FrameBuffer,
    );
}

/// Load the glyph source a config asks for.
///
/// `font_path` set → outline font from that file; otherwise the built-in
/// block font.
///
/// # Errors
/// Returns `CoreError::FileNotFound` or `CoreError::Font` when the file
/// cannot be read or parsed.
pub fn load_glyph_source(config: &AsciiTextConfig) -> Result<Arc<dyn GlyphSource>, CoreError> {
    match &config.font_path {
        Some(path) => Ok(Arc::new(OutlineFont::from_file(path)?)),
        None => Ok(Arc::new(BlockFont)),
    }
}

/// Police vectorielle chargée via `ab_glyph`, rendu antialiasé.
pub struct OutlineFont {
    font: FontVec,
    family: String,
}

impl OutlineFont {
    /// Parse a TTF/OTF file.
    ///
    /// # Errors
    /// Returns an error if the file is missing or not a font.
    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Err(CoreError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let data = std::fs::read(path)
            .map_err(|e| CoreError::Font(format!("{}: {e}", path.display())))?;
        let family = path
            .file_stem()
            .map_or_else(|| "outline".to_string(), |s| s.to_string_lossy().into_owned());
        Self::from_bytes(data, family)
    }

    /// Parse font bytes already in memory.
    ///
    /// # Errors
    /// Returns `CoreError::Font` if the bytes are not a font.
    pub fn from_bytes(data: Vec<u8>, family: String) -> Result<Self, CoreError> {
        let font = FontVec::try_from_vec(data).map_err(|e| CoreError::Font(e.to_string()))?;
        Ok(Self { font, family })
    }

    /// `px` is an em size, as in CSS; ab_glyph scales by ascent − descent.
    #[inline]
    fn px_scale(&self, px: f32) -> PxScale {
        let height = self.font.height_unscaled();
        let em = self.font.units_per_em().unwrap_or(height);
        PxScale::from(px * height / em)
    }
}

impl GlyphSource for OutlineFont {
    fn family(&self) -> &str {
        &self.family
    }

    fn measure(&self, text: &str, px: f32) -> f32 {
        let scaled = self.font.as_scaled(self.px_scale(px));
        let mut width = 0.0;
        let mut prev = None;
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(p) = prev {
                width += scaled.kern(p, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width
    }

    fn cap_metrics(&self, px: f32) -> (f32, f32) {
        let id = self.font.glyph_id('M');
        let Some(outline) = self.font.outline(id) else {
            return (0.0, 0.0);
        };
        // Outline bounds are stored flipped: min.y is yMax, max.y is yMin.
        let k = self.px_scale(px).y / self.font.height_unscaled();
        ((outline.bounds.min.y * k).max(0.0), (-outline.bounds.max.y * k).max(0.0))
    }

    fn draw_line(
        &self,
        text: &str,
        px: f32,
        x: f32,
        baseline: f32,
        color: (u8, u8, u8),
        target: &mut FrameBuffer,
    ) {
        let scale = self.px_scale(px);
        let scaled = self.font.as_scaled(scale);
        let mut caret = x;
        let mut prev = None;
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(p) = prev {
                caret += scaled.kern(p, id);
            }
            let glyph = id.with_scale_and_position(scale, point(caret, baseline));
            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                #[allow(clippy::cast_possible_wrap)]
                outlined.draw(|gx, gy, v| {
                    let px_x = gx as i32 + bounds.min.x as i32;
                    let px_y = gy as i32 + bounds.min.y as i32;
                    if px_x >= 0 && px_y >= 0 {
                        target.blend_pixel(px_x as u32, px_y as u32, color, v);
                    }
                });
            }
            caret += scaled.h_advance(id);
            prev = Some(id);
        }
    }
}

/// Police bitmap 5×7 intégrée (A–Z, 0–9, ponctuation courante).
///
/// One glyph unit is `px / 10`: advance 0.6 em, cap height 0.7 em, no
/// descent. Lowercase letters render as capitals; anything else draws a
/// hollow box.
///
/// # Example
/// ```
/// use cupi_ascii::font::{BlockFont, GlyphSource};
/// assert_eq!(BlockFont.measure("CUPI", 100.0), 240.0);
/// assert_eq!(BlockFont.cap_metrics(100.0), (70.0, 0.0));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockFont;

/// Glyph rows top to bottom, bit 4 is the leftmost column.
type Bitmap = [u8; 7];

const TOFU: Bitmap = [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F];

#[rustfmt::skip]
fn bitmap(ch: char) -> Bitmap {
    match ch.to_ascii_uppercase() {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        ' ' => [0; 7],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        '!' => [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '?' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '\'' => [0x04, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
        '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        '+' => [0x00, 0x04, 0x04, 0x1F, 0x04, 0x04, 0x00],
        '=' => [0x00, 0x00, 0x1F, 0x00, 0x1F, 0x00, 0x00],
        '_' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F],
        '#' => [0x0A, 0x0A, 0x1F, 0x0A, 0x1F, 0x0A, 0x0A],
        '&' => [0x0C, 0x12, 0x14, 0x08, 0x15, 0x12, 0x0D],
        _ => TOFU,
    }
}

impl BlockFont {
    const ADVANCE_UNITS: f32 = 6.0;
    const CAP_UNITS: f32 = 7.0;

    #[inline(always)]
    fn unit(px: f32) -> f32 {
        px / 10.0
    }
}

impl GlyphSource for BlockFont {
    fn family(&self) -> &str {
        "block"
    }

    fn measure(&self, text: &str, px: f32) -> f32 {
        text.chars().count() as f32 * Self::ADVANCE_UNITS * Self::unit(px)
    }

    fn cap_metrics(&self, px: f32) -> (f32, f32) {
        (Self::CAP_UNITS * Self::unit(px), 0.0)
    }

    fn draw_line(
        &self,
        text: &str,
        px: f32,
        x: f32,
        baseline: f32,
        color: (u8, u8, u8),
        target: &mut FrameBuffer,
    ) {
        let unit = Self::unit(px);
        let top = baseline - Self::CAP_UNITS * unit;
        for (i, ch) in text.chars().enumerate() {
            let origin_x = x + i as f32 * Self::ADVANCE_UNITS * unit;
            for (row, bits) in bitmap(ch).iter().enumerate() {
                for col in 0..5 {
                    if bits & (0x10 >> col) == 0 {
                        continue;
                    }
                    let x0 = origin_x + col as f32 * unit;
                    let y0 = top + row as f32 * unit;
                    fill_unit(target, x0, y0, unit, color);
                }
            }
        }
    }
}

/// Fill the pixels whose centres fall inside the square.
fn fill_unit(target: &mut FrameBuffer, x0: f32, y0: f32, size: f32, color: (u8, u8, u8)) {
    let first = |v: f32| (v - 0.5).ceil().max(0.0) as u32;
    let (px0, py0) = (first(x0), first(y0));
    let (px1, py1) = (first(x0 + size), first(y0 + size));
    for py in py0..py1.min(target.height) {
        for px in px0..px1.min(target.width) {
            target.set_pixel(px, py, (color.0, color.1, color.2, 255));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONO: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

    fn mono() -> OutlineFont {
        OutlineFont::from_bytes(MONO.to_vec(), "DejaVuSansMono".into()).unwrap()
    }

    #[test]
    fn outline_font_measures_in_em_units() {
        // 2048 units per em, every glyph advances 1233 units.
        let width = mono().measure("CUPI", 100.0);
        let expected = 4.0 * 1233.0 * 100.0 / 2048.0;
        assert!((width - expected).abs() < 0.5, "width {width}, expected {expected}");
    }

    #[test]
    fn outline_font_cap_metrics_are_ink_extent() {
        let (ascent, descent) = mono().cap_metrics(100.0);
        // Cap height of M is 1493 units, sitting on the baseline.
        assert!((ascent - 1493.0 * 100.0 / 2048.0).abs() < 1.0, "ascent {ascent}");
        assert!(descent < 1.0, "descent {descent}");
    }

    #[test]
    fn outline_font_draws_above_the_baseline() {
        let font = mono();
        let mut fb = FrameBuffer::new(80, 100);
        font.draw_line("M", 100.0, 10.0, 85.0, (255, 255, 255), &mut fb);
        let inked_rows: Vec<u32> = (0..fb.height)
            .filter(|&y| (0..fb.width).any(|x| fb.pixel(x, y).3 > 0))
            .collect();
        let (top, bottom) = (inked_rows[0], inked_rows[inked_rows.len() - 1]);
        // M spans about 73 px, ending on the baseline at row 85.
        assert!((84..=85).contains(&bottom), "bottom {bottom}");
        assert!((11..=13).contains(&top), "top {top}");
    }

    #[test]
    fn block_font_paints_cap_height() {
        let mut fb = FrameBuffer::new(20, 20);
        // 'I' at 10 px: 1 px units, top bar spans columns 1..4.
        BlockFont.draw_line("I", 10.0, 0.0, 7.0, (255, 0, 0), &mut fb);
        assert_eq!(fb.pixel(2, 0), (255, 0, 0, 255));
        assert_eq!(fb.pixel(0, 0), (0, 0, 0, 0));
        // Stem in the middle row.
        assert_eq!(fb.pixel(2, 3).3, 255);
        // Nothing below the baseline.
        assert_eq!(fb.pixel(2, 7).3, 0);
    }

    #[test]
    fn lowercase_maps_to_capitals() {
        assert_eq!(bitmap('c'), bitmap('C'));
        assert_eq!(bitmap('é'), TOFU);
    }

    #[test]
    fn block_font_measure_counts_chars() {
        assert!((BlockFont.measure("", 50.0)).abs() < f32::EPSILON);
        assert!((BlockFont.measure("ab", 50.0) - 60.0).abs() < 1e-4);
    }

    #[test]
    fn default_config_loads_block_font() {
        let source = load_glyph_source(&AsciiTextConfig::default()).unwrap();
        assert_eq!(source.family(), "block");
    }

    #[test]
    fn missing_font_file_is_reported() {
        let mut config = AsciiTextConfig::default();
        config.font_path = Some("/nonexistent/font.ttf".into());
        assert!(matches!(
            load_glyph_source(&config),
            Err(CoreError::FileNotFound { .. })
        ));
    }

    #[test]
    fn garbage_bytes_are_not_a_font() {
        let result = OutlineFont::from_bytes(vec![0, 1, 2, 3], "junk".into());
        assert!(matches!(result, Err(CoreError::Font(_))));
    }
}
