/// Buffer de pixels réutilisable.
///
/// Stocke les pixels en RGBA row-major, 4 bytes par pixel. Used for the text
/// texture, the offscreen scene raster, and the background canvas.
///
/// # Example
/// ```
/// use cupi_core::frame::FrameBuffer;
/// let fb = FrameBuffer::new(10, 10);
/// assert_eq!(fb.data.len(), 400);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    /// Pixels RGBA, row-major, 4 bytes par pixel.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FrameBuffer {
    /// Crée un buffer transparent aux dimensions données.
    ///
    /// # Example
    /// ```
    /// use cupi_core::frame::FrameBuffer;
    /// let fb = FrameBuffer::new(100, 50);
    /// assert_eq!(fb.width, 100);
    /// assert_eq!(fb.data.len(), 100 * 50 * 4);
    /// ```
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; width as usize * height as usize * 4],
            width,
            height,
        }
    }

    /// `true` when the buffer holds no pixel at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Reallocate to new dimensions, clearing to transparent black.
    ///
    /// Keeps the allocation when the pixel count is unchanged.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(width as usize * height as usize * 4, 0);
    }

    /// Accès au pixel (x, y) → (r, g, b, a). Out-of-range reads return transparent black.
    ///
    /// # Example
    /// ```
    /// use cupi_core::frame::FrameBuffer;
    /// let fb = FrameBuffer::new(10, 10);
    /// assert_eq!(fb.pixel(0, 0), (0, 0, 0, 0));
    /// assert_eq!(fb.pixel(50, 50), (0, 0, 0, 0));
    /// ```
    #[inline(always)]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8, u8) {
        if x >= self.width || y >= self.height {
            return (0, 0, 0, 0);
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        (
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        )
    }

    /// Write one pixel. Out-of-range writes are dropped.
    #[inline(always)]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: (u8, u8, u8, u8)) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        self.data[idx] = rgba.0;
        self.data[idx + 1] = rgba.1;
        self.data[idx + 2] = rgba.2;
        self.data[idx + 3] = rgba.3;
    }

    /// Composite `rgb` with coverage `alpha` [0.0, 1.0] over the stored pixel
    /// (source-over, non-premultiplied storage like a 2D canvas readback).
    ///
    /// # Example
    /// ```
    /// use cupi_core::frame::FrameBuffer;
    /// let mut fb = FrameBuffer::new(1, 1);
    /// fb.fill((0, 0, 0, 255));
    /// fb.blend_pixel(0, 0, (255, 255, 255), 0.5);
    /// let (r, _, _, a) = fb.pixel(0, 0);
    /// assert_eq!(r, 128);
    /// assert_eq!(a, 255);
    /// ```
    #[inline]
    pub fn blend_pixel(&mut self, x: u32, y: u32, rgb: (u8, u8, u8), alpha: f32) {
        if x >= self.width || y >= self.height || alpha <= 0.0 {
            return;
        }
        let a = alpha.min(1.0);
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let dst_a = f32::from(self.data[idx + 3]) / 255.0;
        let out_a = a + dst_a * (1.0 - a);
        let mix = |dst: u8, src: u8| -> u8 {
            ((f32::from(src) * a + f32::from(dst) * dst_a * (1.0 - a)) / out_a)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        self.data[idx] = mix(self.data[idx], rgb.0);
        self.data[idx + 1] = mix(self.data[idx + 1], rgb.1);
        self.data[idx + 2] = mix(self.data[idx + 2], rgb.2);
        self.data[idx + 3] = (out_a * 255.0).round() as u8;
    }

    /// Fill every pixel with `rgba`.
    pub fn fill(&mut self, rgba: (u8, u8, u8, u8)) {
        for px in self.data.chunks_exact_mut(4) {
            px[0] = rgba.0;
            px[1] = rgba.1;
            px[2] = rgba.2;
            px[3] = rgba.3;
        }
    }

    /// Clear to transparent black.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_clears_and_reallocates() {
        let mut fb = FrameBuffer::new(2, 2);
        fb.fill((9, 9, 9, 9));
        fb.resize(3, 1);
        assert_eq!(fb.data.len(), 12);
        assert!(fb.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn blend_over_transparent_keeps_straight_colour() {
        let mut fb = FrameBuffer::new(1, 1);
        fb.blend_pixel(0, 0, (255, 255, 255), 0.1);
        assert_eq!(fb.pixel(0, 0), (255, 255, 255, 26));
    }

    #[test]
    fn blend_over_opaque_mixes() {
        let mut fb = FrameBuffer::new(1, 1);
        fb.fill((0, 0, 0, 255));
        fb.blend_pixel(0, 0, (255, 255, 255), 0.1);
        assert_eq!(fb.pixel(0, 0), (26, 26, 26, 255));
    }
}
