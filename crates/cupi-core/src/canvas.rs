use crate::frame::FrameBuffer;

/// Contexte 2D minimal au-dessus d'un `FrameBuffer`.
///
/// Only what the background needs: opaque clears and translucent rounded
/// rectangles with 2×2 supersampled coverage.
///
/// # Example
/// ```
/// use cupi_core::canvas::Canvas2d;
/// let mut ctx = Canvas2d::new(20, 10);
/// ctx.clear_opaque((0, 0, 0));
/// ctx.fill_rounded_rect(3.0, 3.0, 4.0, 4.0, 1.5, (255, 255, 255), 0.1);
/// assert!(ctx.buffer().pixel(5, 5).0 > 0);
/// assert_eq!(ctx.buffer().pixel(15, 5).0, 0);
/// ```
#[derive(Clone, Debug)]
pub struct Canvas2d {
    buffer: FrameBuffer,
}

/// Sub-pixel sample offsets for coverage estimation.
const SAMPLES: [(f32, f32); 4] = [(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)];

impl Canvas2d {
    /// Create a transparent canvas.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: FrameBuffer::new(width, height),
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.buffer.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.buffer.height
    }

    /// Change the backing store size (like assigning `canvas.width`/`height`).
    pub fn set_size(&mut self, width: u32, height: u32) {
        if width != self.buffer.width || height != self.buffer.height {
            self.buffer.resize(width, height);
        }
    }

    /// Read-only access to the pixels.
    #[must_use]
    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }

    /// Fill the whole canvas with an opaque colour.
    pub fn clear_opaque(&mut self, rgb: (u8, u8, u8)) {
        self.buffer.fill((rgb.0, rgb.1, rgb.2, 255));
    }

    /// Fill a rounded rectangle with `rgb` at opacity `alpha`.
    #[allow(clippy::too_many_arguments)]
    pub fn fill_rounded_rect(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        radius: f32,
        rgb: (u8, u8, u8),
        alpha: f32,
    ) {
        if w <= 0.0 || h <= 0.0 || alpha <= 0.0 {
            return;
        }
        let r = radius.clamp(0.0, w.min(h) / 2.0);
        let x0 = x.floor().max(0.0) as u32;
        let y0 = y.floor().max(0.0) as u32;
        let x1 = ((x + w).ceil() as u32).min(self.buffer.width);
        let y1 = ((y + h).ceil() as u32).min(self.buffer.height);

        for py in y0..y1 {
            for px in x0..x1 {
                let hits = SAMPLES
                    .iter()
                    .filter(|(sx, sy)| {
                        inside_rounded_rect(px as f32 + sx, py as f32 + sy, x, y, w, h, r)
                    })
                    .count();
                if hits > 0 {
                    let coverage = hits as f32 / SAMPLES.len() as f32;
                    self.buffer.blend_pixel(px, py, rgb, alpha * coverage);
                }
            }
        }
    }
}

#[inline]
fn inside_rounded_rect(px: f32, py: f32, x: f32, y: f32, w: f32, h: f32, r: f32) -> bool {
    if px < x || py < y || px > x + w || py > y + h {
        return false;
    }
    let cx = px.clamp(x + r, x + w - r);
    let cy = py.clamp(y + r, y + h - r);
    let dx = px - cx;
    let dy = py - cy;
    dx * dx + dy * dy <= r * r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_get_less_coverage_than_centre() {
        let mut ctx = Canvas2d::new(10, 10);
        ctx.clear_opaque((0, 0, 0));
        ctx.fill_rounded_rect(3.0, 3.0, 4.0, 4.0, 1.5, (255, 255, 255), 1.0);
        let centre = ctx.buffer().pixel(5, 5).0;
        let corner = ctx.buffer().pixel(3, 3).0;
        assert_eq!(centre, 255);
        assert!(corner < centre);
    }

    #[test]
    fn set_size_reallocates() {
        let mut ctx = Canvas2d::new(1, 1);
        ctx.set_size(4, 2);
        assert_eq!(ctx.buffer().data.len(), 32);
    }
}
