/// Rampe par défaut, du plus clair au plus dense.
pub const RAMP_DEFAULT: &str =
    " .'`^\",:;Il!i~+_-?][}{1)(|/tfjrxnuvczXYUJCLQ0OZmwqpdbkhao*#MW&8%B@$";

/// Minimal, haut contraste.
pub const RAMP_COMPACT: &str = " .:-=+*#%@";

/// Luminance weights applied to (R, G, B).
pub const LUMA_WEIGHTS: (f32, f32, f32) = (0.3, 0.6, 0.1);

/// Ordered character ramp mapping a pixel to a glyph.
///
/// Gray is `(0.3R + 0.6G + 0.1B) / 255`. The index is taken from the *darkness*
/// `1 - gray`, so a black pixel selects the densest glyph; `invert` flips the
/// index so bright pixels become dense (text on a dark page). Fully transparent
/// pixels always map to a space.
///
/// # Example
/// ```
/// use cupi_core::charset::AsciiRamp;
/// let ramp = AsciiRamp::new(" .:#@", false);
/// assert_eq!(ramp.map(0, 0, 0, 255), '@');
/// assert_eq!(ramp.map(255, 255, 255, 255), ' ');
/// assert_eq!(ramp.map(255, 255, 255, 0), ' ');
/// ```
#[derive(Clone, Debug)]
pub struct AsciiRamp {
    chars: Vec<char>,
    invert: bool,
}

impl AsciiRamp {
    /// Build a ramp ordered lightest→densest.
    ///
    /// Falls back to `" @"` when fewer than 2 characters are given.
    #[must_use]
    pub fn new(ramp: &str, invert: bool) -> Self {
        let chars: Vec<char> = ramp.chars().collect();
        if chars.len() < 2 {
            return Self::new(" @", invert);
        }
        Self { chars, invert }
    }

    /// Number of glyphs in the ramp.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Always `false`: a ramp holds at least two glyphs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Whether the index is flipped.
    #[must_use]
    pub fn inverted(&self) -> bool {
        self.invert
    }

    /// Map a straight-alpha RGBA pixel to a glyph.
    ///
    /// # Example
    /// ```
    /// use cupi_core::charset::{AsciiRamp, RAMP_DEFAULT};
    /// let ramp = AsciiRamp::new(RAMP_DEFAULT, true);
    /// // Bright text colour on an inverted ramp lands near the dense end.
    /// assert_eq!(ramp.map(253, 249, 243, 255), '@');
    /// ```
    #[inline(always)]
    #[must_use]
    pub fn map(&self, r: u8, g: u8, b: u8, a: u8) -> char {
        if a == 0 {
            return ' ';
        }
        let gray = luma(r, g, b);
        let last = self.chars.len() - 1;
        let mut idx = ((1.0 - gray) * last as f32).floor().clamp(0.0, last as f32) as usize;
        if self.invert {
            idx = last - idx;
        }
        self.chars[idx]
    }
}

impl Default for AsciiRamp {
    fn default() -> Self {
        Self::new(RAMP_DEFAULT, true)
    }
}

/// Weighted gray in [0.0, 1.0].
#[inline(always)]
#[must_use]
pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    let (wr, wg, wb) = LUMA_WEIGHTS;
    (wr * f32::from(r) + wg * f32::from(g) + wb * f32::from(b)) / 255.0
}
