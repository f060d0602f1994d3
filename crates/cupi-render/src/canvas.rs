use cupi_core::color::{difference, hue_rotate};
use cupi_core::frame::FrameBuffer;
use cupi_core::stage::{BlendMode, OverlayLayer};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;

/// Monospace advance of the overlay glyphs, as a fraction of the font size.
const OVERLAY_CHAR_ASPECT: f32 = 0.6;

/// Peint les cellules échantillonnées en couleur de fond.
///
/// `cells` is expected at one pixel per terminal cell (see
/// [`CellSampler`](crate::sampler::CellSampler)); cells outside it keep
/// their current style.
///
/// # Example
/// ```
/// use cupi_core::frame::FrameBuffer;
/// use cupi_render::canvas::render_background;
/// use ratatui::buffer::Buffer;
/// use ratatui::layout::Rect;
/// use ratatui::style::Color;
///
/// let area = Rect::new(0, 0, 2, 1);
/// let mut buf = Buffer::empty(area);
/// let mut cells = FrameBuffer::new(2, 1);
/// cells.fill((26, 26, 26, 255));
/// render_background(&mut buf, area, &cells);
/// assert_eq!(buf[(1, 0)].bg, Color::Rgb(26, 26, 26));
/// ```
pub fn render_background(buf: &mut Buffer, area: Rect, cells: &FrameBuffer) {
    let w = u32::from(area.width).min(cells.width);
    let h = u32::from(area.height).min(cells.height);
    for cy in 0..h {
        for cx in 0..w {
            let (r, g, b, _) = cells.pixel(cx, cy);
            // cx, cy < area size, so they fit in u16.
            let pos = (area.x + cx as u16, area.y + cy as u16);
            if let Some(cell) = buf.cell_mut(pos) {
                cell.set_char(' ').set_bg(Color::Rgb(r, g, b));
            }
        }
    }
}

/// Géométrie d'un overlay projeté sur la grille terminal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayGeometry {
    /// Overlay glyph width in viewport pixels.
    pub char_w: f32,
    /// Overlay glyph height in viewport pixels.
    pub char_h: f32,
    /// Left edge of the centred text block.
    pub left: f32,
    /// Top edge of the centred text block.
    pub top: f32,
}

impl OverlayGeometry {
    /// Centre a `cols × rows` block of `font_size` glyphs in the viewport.
    ///
    /// # Example
    /// ```
    /// use cupi_render::canvas::OverlayGeometry;
    /// let g = OverlayGeometry::centred(10, 2, 10.0, (100.0, 40.0));
    /// assert_eq!((g.left, g.top), (20.0, 10.0));
    /// ```
    #[must_use]
    pub fn centred(cols: usize, rows: usize, font_size: f32, viewport_px: (f32, f32)) -> Self {
        let char_w = font_size * OVERLAY_CHAR_ASPECT;
        let char_h = font_size;
        Self {
            char_w,
            char_h,
            left: (viewport_px.0 - cols as f32 * char_w) / 2.0,
            top: (viewport_px.1 - rows as f32 * char_h) / 2.0,
        }
    }

    /// Overlay (column, row) under the viewport point, if inside the block.
    #[must_use]
    pub fn locate(&self, px: f32, py: f32) -> Option<(usize, usize)> {
        if self.char_w <= 0.0 || self.char_h <= 0.0 {
            return None;
        }
        let col = ((px - self.left) / self.char_w).floor();
        let row = ((py - self.top) / self.char_h).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        Some((col as usize, row as usize))
    }
}

/// Composite a text overlay over the terminal buffer.
///
/// Each terminal cell covers `cell_px` viewport pixels; its centre picks
/// the overlay glyph underneath. Blank glyphs leave the cell untouched.
/// With [`BlendMode::Difference`] the glyph colour is the absolute
/// difference between the hue-rotated text colour and the cell background
/// taken from `bg` (black when absent).
pub fn render_overlay(
    buf: &mut Buffer,
    area: Rect,
    layer: &OverlayLayer,
    viewport_px: (f32, f32),
    cell_px: (f32, f32),
    bg: Option<&FrameBuffer>,
) {
    if layer.text.is_empty() || cell_px.0 <= 0.0 || cell_px.1 <= 0.0 {
        return;
    }
    let lines: Vec<&[u8]> = layer.text.lines().map(str::as_bytes).collect();
    let cols = lines.iter().map(|l| l.len()).max().unwrap_or(0);
    let geometry = OverlayGeometry::centred(cols, lines.len(), layer.font_size, viewport_px);
    let tint = hue_rotate(layer.color, layer.hue_rotate_deg);

    for cy in 0..area.height {
        let py = (f32::from(cy) + 0.5) * cell_px.1;
        for cx in 0..area.width {
            let px = (f32::from(cx) + 0.5) * cell_px.0;
            let Some((col, row)) = geometry.locate(px, py) else {
                continue;
            };
            let Some(&byte) = lines.get(row).and_then(|l| l.get(col)) else {
                continue;
            };
            if byte == b' ' || !byte.is_ascii_graphic() {
                continue;
            }
            let fg = match layer.blend {
                BlendMode::Normal => tint,
                BlendMode::Difference => {
                    let under = bg
                        .filter(|b| u32::from(cx) < b.width && u32::from(cy) < b.height)
                        .map_or((0, 0, 0), |b| {
                            let (r, g, b, _) = b.pixel(u32::from(cx), u32::from(cy));
                            (r, g, b)
                        });
                    difference(tint, under)
                }
            };
            if let Some(cell) = buf.cell_mut((area.x + cx, area.y + cy)) {
                cell.set_char(char::from(byte)).set_fg(Color::Rgb(fg.0, fg.1, fg.2));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(text: &str, blend: BlendMode) -> OverlayLayer {
        OverlayLayer {
            text: text.to_string(),
            font_size: 10.0,
            font_family: "IBM Plex Mono".to_string(),
            color: (200, 100, 50),
            hue_rotate_deg: 0.0,
            blend,
        }
    }

    #[test]
    fn overlay_glyph_lands_on_centre_cell() {
        // 1 glyph of 6×10 px centred in a 30×30 viewport of 6×10 px cells.
        let area = Rect::new(0, 0, 5, 3);
        let mut buf = Buffer::empty(area);
        let glyph = layer("@", BlendMode::Normal);
        render_overlay(&mut buf, area, &glyph, (30.0, 30.0), (6.0, 10.0), None);
        assert_eq!(buf[(2, 1)].symbol(), "@");
        assert_eq!(buf[(2, 1)].fg, Color::Rgb(200, 100, 50));
        assert_eq!(buf[(0, 0)].symbol(), " ");
    }

    #[test]
    fn spaces_leave_cells_untouched() {
        let area = Rect::new(0, 0, 3, 1);
        let mut buf = Buffer::empty(area);
        buf[(1, 0)].set_char('x');
        let blank = layer("   ", BlendMode::Normal);
        render_overlay(&mut buf, area, &blank, (18.0, 10.0), (6.0, 10.0), None);
        assert_eq!(buf[(1, 0)].symbol(), "x");
    }

    #[test]
    fn difference_blend_reads_background() {
        let area = Rect::new(0, 0, 1, 1);
        let mut buf = Buffer::empty(area);
        let mut bg = FrameBuffer::new(1, 1);
        bg.fill((50, 50, 50, 255));
        render_overlay(
            &mut buf,
            area,
            &layer("#", BlendMode::Difference),
            (6.0, 10.0),
            (6.0, 10.0),
            Some(&bg),
        );
        assert_eq!(buf[(0, 0)].fg, Color::Rgb(150, 50, 0));
    }

    #[test]
    fn locate_rejects_points_left_of_block() {
        let g = OverlayGeometry::centred(2, 1, 10.0, (100.0, 10.0));
        assert_eq!(g.locate(10.0, 5.0), None);
        assert_eq!(g.locate(45.0, 5.0), Some((0, 0)));
    }

    #[test]
    fn background_copies_cell_colours() {
        let area = Rect::new(0, 0, 2, 2);
        let mut buf = Buffer::empty(area);
        let mut cells = FrameBuffer::new(2, 2);
        cells.set_pixel(1, 1, (1, 2, 3, 255));
        render_background(&mut buf, area, &cells);
        assert_eq!(buf[(1, 1)].bg, Color::Rgb(1, 2, 3));
        assert_eq!(buf[(0, 0)].bg, Color::Rgb(0, 0, 0));
    }
}
