use glam::Vec2;
use rayon::prelude::*;

use cupi_core::charset::AsciiRamp;
use cupi_core::frame::FrameBuffer;

use crate::raster::SoftwareRenderer;
use crate::scene::{PerspectiveCamera, PlaneMesh};

/// Monospace advance as a fraction of the font size.
pub const CHAR_ASPECT: f64 = 0.6;
/// Minimum ASCII glyph size in pixels.
pub const MIN_FONT_SIZE: f32 = 2.0;
/// Changes smaller than this leave the filter grid alone.
const FONT_EPSILON: f32 = 0.01;
/// Per-frame easing factor of the hue cycler.
pub const HUE_EASING: f32 = 0.075;
/// Width at which the ASCII font reaches its base size.
pub const RESPONSIVE_REFERENCE_WIDTH: f32 = 900.0;
/// Smallest responsive ratio.
pub const RESPONSIVE_MIN_RATIO: f32 = 0.25;

/// Convert a straight-alpha raster to text, one line per pixel row.
///
/// Every row, the last included, ends with `\n`. Pure: the same raster
/// always yields the same string.
///
/// # Example
/// ```
/// use cupi_core::charset::AsciiRamp;
/// use cupi_core::frame::FrameBuffer;
/// use cupi_ascii::filter::asciify;
///
/// let mut fb = FrameBuffer::new(3, 1);
/// fb.set_pixel(0, 0, (255, 255, 255, 255));
/// fb.set_pixel(1, 0, (0, 0, 0, 255));
/// let ramp = AsciiRamp::new(" .:#@", true);
/// assert_eq!(asciify(&fb, &ramp), "@  \n");
/// ```
#[must_use]
pub fn asciify(raster: &FrameBuffer, ramp: &AsciiRamp) -> String {
    if raster.is_empty() {
        return String::new();
    }
    let stride = raster.width as usize * 4;
    let rows: Vec<String> = raster
        .data
        .par_chunks_exact(stride)
        .map(|row| {
            let mut line = String::with_capacity(raster.width as usize + 1);
            for px in row.chunks_exact(4) {
                line.push(ramp.map(px[0], px[1], px[2], px[3]));
            }
            line.push('\n');
            line
        })
        .collect();
    rows.concat()
}

/// Font size scaled to the container width, rounded to 2 decimals.
///
/// Full size from 900 px up, a quarter of it at 225 px and below.
///
/// # Example
/// ```
/// use cupi_ascii::filter::responsive_font_size;
/// assert_eq!(responsive_font_size(10.8, 1200.0), 10.8);
/// assert_eq!(responsive_font_size(10.8, 400.0), 4.8);
/// assert_eq!(responsive_font_size(10.8, 100.0), 2.7);
/// assert_eq!(responsive_font_size(10.8, 0.0), 10.8);
/// ```
#[must_use]
pub fn responsive_font_size(base: f32, width: f32) -> f32 {
    if width <= 0.0 || base == 0.0 {
        return base;
    }
    let ratio = (width / RESPONSIVE_REFERENCE_WIDTH).clamp(RESPONSIVE_MIN_RATIO, 1.0);
    (f64::from(base * ratio) * 100.0).round() as f32 / 100.0
}

/// Teinte qui suit le pointeur autour du centre du conteneur.
///
/// # Example
/// ```
/// use cupi_ascii::filter::HueCycler;
/// let mut hue = HueCycler::default();
/// hue.update(0.0, 10.0); // pointer straight below the centre: 90°
/// assert!((hue.degrees() - 6.75).abs() < 1e-4);
/// assert_eq!(hue.css_degrees(), 6.8);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HueCycler {
    deg: f32,
}

impl HueCycler {
    /// Ease toward the angle of (dx, dy).
    pub fn update(&mut self, dx: f32, dy: f32) -> f32 {
        let target = dy.atan2(dx).to_degrees();
        self.deg += (target - self.deg) * HUE_EASING;
        self.deg
    }

    /// Current angle.
    #[must_use]
    pub fn degrees(&self) -> f32 {
        self.deg
    }

    /// Angle rounded to one decimal for the `hue-rotate` filter.
    #[must_use]
    pub fn css_degrees(&self) -> f32 {
        (self.deg * 10.0).round() / 10.0
    }
}

/// Filtre ASCII : rend la scène à la résolution des caractères puis la convertit.
///
/// The grid has `floor(width / (font × 0.6))` columns and
/// `floor(height / font)` rows; each tick renders one pixel per character.
pub struct AsciiFilter {
    ramp: AsciiRamp,
    font_size: f32,
    width: f32,
    height: f32,
    cols: u32,
    rows: u32,
    renderer: SoftwareRenderer,
    readback: FrameBuffer,
    hue: HueCycler,
    center: Vec2,
    pointer: Vec2,
    text: String,
}

impl AsciiFilter {
    /// Unsized filter.
    #[must_use]
    pub fn new(ramp: AsciiRamp, font_size: f32) -> Self {
        Self {
            ramp,
            font_size: font_size.max(MIN_FONT_SIZE),
            width: 0.0,
            height: 0.0,
            cols: 0,
            rows: 0,
            renderer: SoftwareRenderer::new(0, 0),
            readback: FrameBuffer::new(0, 0),
            hue: HueCycler::default(),
            center: Vec2::ZERO,
            pointer: Vec2::ZERO,
            text: String::new(),
        }
    }

    /// Resize to the container and recentre the pointer.
    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.center = Vec2::new(width / 2.0, height / 2.0);
        self.pointer = self.center;
        self.reset();
    }

    /// Change the glyph size; ignored below 0.01 px of difference.
    pub fn set_font_size(&mut self, size: f32) {
        let next = size.max(MIN_FONT_SIZE);
        if (next - self.font_size).abs() < FONT_EPSILON {
            return;
        }
        self.font_size = next;
        if self.width > 0.0 && self.height > 0.0 {
            self.reset();
        }
    }

    fn reset(&mut self) {
        if self.width <= 0.0 || self.height <= 0.0 {
            return;
        }
        let font = f64::from(self.font_size);
        self.cols = (f64::from(self.width) / (font * CHAR_ASPECT)).floor() as u32;
        self.rows = (f64::from(self.height) / font).floor() as u32;
        self.renderer.set_size(self.cols, self.rows);
        log::debug!(
            "ascii: grille {}×{} (police {:.2}px)",
            self.cols,
            self.rows,
            self.font_size
        );
    }

    /// Document-level pointer position, already in device pixels.
    pub fn set_pointer(&mut self, x: f32, y: f32) {
        self.pointer = Vec2::new(x, y);
    }

    /// Render the scene, convert it, and advance the hue.
    pub fn render(&mut self, mesh: &PlaneMesh, camera: &PerspectiveCamera) -> &str {
        self.renderer.render(mesh, camera);
        self.renderer.read_pixels(&mut self.readback);
        self.text = asciify(&self.readback, &self.ramp);
        let d = self.pointer - self.center;
        self.hue.update(d.x, d.y);
        &self.text
    }

    /// Columns of the character grid.
    #[must_use]
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Rows of the character grid.
    #[must_use]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Glyph size in pixels.
    #[must_use]
    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    /// Last converted frame.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Hue state.
    #[must_use]
    pub fn hue(&self) -> &HueCycler {
        &self.hue
    }
}
