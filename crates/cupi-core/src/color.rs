use crate::error::CoreError;

/// Couleur du texte du hero (`#fdf9f3`).
pub const TEXT_COLOR: (u8, u8, u8) = (0xfd, 0xf9, 0xf3);

/// Parse `#rrggbb` (or `rrggbb`) into RGB.
///
/// # Errors
/// Returns `CoreError::Config` when the string is not six hex digits.
///
/// # Example
/// ```
/// use cupi_core::color::parse_hex;
/// assert_eq!(parse_hex("#fdf9f3").unwrap(), (253, 249, 243));
/// assert!(parse_hex("#fff").is_err());
/// ```
pub fn parse_hex(s: &str) -> Result<(u8, u8, u8), CoreError> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(CoreError::Config(format!("couleur hex invalide : {s}")));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| CoreError::Config(format!("couleur hex invalide : {s}")))
    };
    Ok((channel(0)?, channel(2)?, channel(4)?))
}

/// Applique un filtre `hue-rotate(deg)` tel que défini par Filter Effects.
///
/// Uses the same 3×3 matrix as the CSS filter, so white and grays are
/// untouched while saturated colours rotate around the luminance axis.
///
/// # Example
/// ```
/// use cupi_core::color::hue_rotate;
/// assert_eq!(hue_rotate((255, 255, 255), 123.0), (255, 255, 255));
/// assert_eq!(hue_rotate((200, 40, 10), 0.0), (200, 40, 10));
/// ```
#[must_use]
pub fn hue_rotate(rgb: (u8, u8, u8), deg: f32) -> (u8, u8, u8) {
    let (sin, cos) = deg.to_radians().sin_cos();
    let m = [
        [
            0.213 + cos * 0.787 - sin * 0.213,
            0.715 - cos * 0.715 - sin * 0.715,
            0.072 - cos * 0.072 + sin * 0.928,
        ],
        [
            0.213 - cos * 0.213 + sin * 0.143,
            0.715 + cos * 0.285 + sin * 0.140,
            0.072 - cos * 0.072 - sin * 0.283,
        ],
        [
            0.213 - cos * 0.213 - sin * 0.787,
            0.715 - cos * 0.715 + sin * 0.715,
            0.072 + cos * 0.928 + sin * 0.072,
        ],
    ];
    let r = f32::from(rgb.0);
    let g = f32::from(rgb.1);
    let b = f32::from(rgb.2);
    let apply =
        |row: [f32; 3]| (row[0] * r + row[1] * g + row[2] * b).round().clamp(0.0, 255.0) as u8;
    (apply(m[0]), apply(m[1]), apply(m[2]))
}

/// `mix-blend-mode: difference` per channel.
///
/// # Example
/// ```
/// use cupi_core::color::difference;
/// assert_eq!(difference((253, 249, 243), (26, 26, 26)), (227, 223, 217));
/// ```
#[inline]
#[must_use]
pub fn difference(top: (u8, u8, u8), bottom: (u8, u8, u8)) -> (u8, u8, u8) {
    (
        top.0.abs_diff(bottom.0),
        top.1.abs_diff(bottom.1),
        top.2.abs_diff(bottom.2),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_turn_is_identity() {
        let c = (200, 40, 10);
        let rotated = hue_rotate(c, 360.0);
        assert!((i16::from(rotated.0) - 200).abs() <= 1);
        assert!((i16::from(rotated.1) - 40).abs() <= 1);
        assert!((i16::from(rotated.2) - 10).abs() <= 1);
    }

    #[test]
    fn half_turn_changes_saturated_red() {
        let rotated = hue_rotate((255, 0, 0), 180.0);
        assert!(rotated.0 < rotated.1 || rotated.0 < rotated.2, "red survived: {rotated:?}");
    }

    #[test]
    fn parse_accepts_without_hash() {
        assert_eq!(parse_hex("000000").unwrap(), (0, 0, 0));
        assert!(parse_hex("zzzzzz").is_err());
    }
}
