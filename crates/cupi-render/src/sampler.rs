use anyhow::{Context, Result, bail};
use cupi_core::frame::FrameBuffer;
use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};

/// Réduit le canvas de fond à un pixel par cellule terminal.
///
/// Box filtering averages every canvas pixel under a cell, so translucent
/// automaton squares show up as a faint tint. Buffers are kept between
/// frames.
///
/// # Example
/// ```
/// use cupi_core::frame::FrameBuffer;
/// use cupi_render::sampler::CellSampler;
/// let mut sampler = CellSampler::new();
/// let mut canvas = FrameBuffer::new(80, 32);
/// canvas.fill((0, 0, 0, 255));
/// let cells = sampler.sample(&canvas, 10, 2).unwrap();
/// assert_eq!((cells.width, cells.height), (10, 2));
/// assert_eq!(cells.pixel(3, 1), (0, 0, 0, 255));
/// ```
pub struct CellSampler {
    resizer: Resizer,
    options: ResizeOptions,
    src_copy: Vec<u8>,
    cells: FrameBuffer,
}

impl CellSampler {
    /// Sampler with empty buffers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
            options: ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Box)),
            src_copy: Vec::new(),
            cells: FrameBuffer::new(0, 0),
        }
    }

    /// Average `canvas` down to `cols × rows`.
    ///
    /// # Errors
    /// Returns an error if either image has a zero dimension or the
    /// resize fails.
    pub fn sample(&mut self, canvas: &FrameBuffer, cols: u16, rows: u16) -> Result<&FrameBuffer> {
        let (cols, rows) = (u32::from(cols), u32::from(rows));
        if canvas.is_empty() || cols == 0 || rows == 0 {
            bail!(
                "échantillonnage impossible : {}×{} → {cols}×{rows}",
                canvas.width,
                canvas.height
            );
        }
        if self.cells.width != cols || self.cells.height != rows {
            self.cells.resize(cols, rows);
            log::debug!("sampler: {}×{} → {cols}×{rows}", canvas.width, canvas.height);
        }
        if canvas.width == cols && canvas.height == rows {
            self.cells.data.copy_from_slice(&canvas.data);
            return Ok(&self.cells);
        }

        // The source view needs a mutable slice.
        self.src_copy.clear();
        self.src_copy.extend_from_slice(&canvas.data);
        {
            let (width, height) = (canvas.width, canvas.height);
            let src = Image::from_slice_u8(width, height, &mut self.src_copy, PixelType::U8x4)
                .context("canvas de fond vide")?;
            let mut dst = Image::from_slice_u8(cols, rows, &mut self.cells.data, PixelType::U8x4)
                .context("grille de cellules vide")?;
            self.resizer
                .resize(&src, &mut dst, Some(&self.options))
                .context("échantillonnage du fond")?;
        }
        Ok(&self.cells)
    }

    /// Last sampled cells.
    #[must_use]
    pub fn cells(&self) -> &FrameBuffer {
        &self.cells
    }
}

impl Default for CellSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_size_is_a_copy() {
        let mut sampler = CellSampler::new();
        let mut canvas = FrameBuffer::new(4, 2);
        canvas.set_pixel(1, 1, (9, 8, 7, 255));
        let cells = sampler.sample(&canvas, 4, 2).unwrap();
        assert_eq!(cells.pixel(1, 1), (9, 8, 7, 255));
    }

    #[test]
    fn uniform_canvas_stays_uniform() {
        let mut sampler = CellSampler::new();
        let mut canvas = FrameBuffer::new(100, 60);
        canvas.fill((26, 26, 26, 255));
        let cells = sampler.sample(&canvas, 12, 4).unwrap();
        for (x, y) in [(0, 0), (11, 3), (5, 2)] {
            let (r, g, b, a) = cells.pixel(x, y);
            assert!(r.abs_diff(26) <= 1 && g.abs_diff(26) <= 1 && b.abs_diff(26) <= 1);
            assert_eq!(a, 255);
        }
    }

    #[test]
    fn empty_canvas_is_an_error() {
        let mut sampler = CellSampler::new();
        let canvas = FrameBuffer::new(0, 0);
        assert!(sampler.sample(&canvas, 10, 10).is_err());
    }
}
