use glam::{Mat4, Vec2, Vec3, Vec4};

use cupi_core::frame::FrameBuffer;

/// Subdivisions per side of the text plane.
pub const PLANE_SEGMENTS: u32 = 36;

/// Caméra perspective fixe regardant vers −Z.
///
/// # Example
/// ```
/// use cupi_ascii::scene::PerspectiveCamera;
/// let cam = PerspectiveCamera::new(16.0 / 9.0);
/// // 2 · tan(22.5°) · 30
/// assert!((cam.frustum_height() - 24.8528).abs() < 1e-3);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov_deg: f32,
    /// Width over height.
    pub aspect: f32,
    /// Near plane distance.
    pub near: f32,
    /// Far plane distance.
    pub far: f32,
    /// Distance from the origin along +Z.
    pub z: f32,
}

impl PerspectiveCamera {
    /// Camera at z = 30 with a 45° field of view.
    #[must_use]
    pub fn new(aspect: f32) -> Self {
        Self {
            fov_deg: 45.0,
            aspect,
            near: 1.0,
            far: 1000.0,
            z: 30.0,
        }
    }

    /// Projection matrix (OpenGL clip conventions).
    #[must_use]
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_deg.to_radians(), self.aspect, self.near, self.far)
    }

    /// World → view transform.
    #[must_use]
    pub fn view(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, 0.0, -self.z))
    }

    /// Visible height at the origin plane.
    #[must_use]
    pub fn frustum_height(&self) -> f32 {
        2.0 * (self.fov_deg.to_radians() / 2.0).tan() * self.z
    }

    /// Visible width at the origin plane.
    #[must_use]
    pub fn frustum_width(&self) -> f32 {
        self.frustum_height() * self.aspect
    }
}

/// Plan subdivisé centré sur l'origine, UV (0,0) en bas à gauche.
#[derive(Clone, Debug)]
pub struct PlaneGeometry {
    /// Width in world units.
    pub width: f32,
    /// Height in world units.
    pub height: f32,
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Vertex UVs.
    pub uvs: Vec<Vec2>,
    /// Counter-clockwise triangles facing +Z.
    pub triangles: Vec<[u32; 3]>,
}

impl PlaneGeometry {
    /// Build a `width × height` plane with `segments × segments` quads.
    ///
    /// # Example
    /// ```
    /// use cupi_ascii::scene::PlaneGeometry;
    /// let plane = PlaneGeometry::new(4.0, 2.0, 36);
    /// assert_eq!(plane.positions.len(), 37 * 37);
    /// assert_eq!(plane.triangles.len(), 36 * 36 * 2);
    /// ```
    #[must_use]
    pub fn new(width: f32, height: f32, segments: u32) -> Self {
        let segments = segments.max(1);
        let stride = segments + 1;
        let seg_w = width / segments as f32;
        let seg_h = height / segments as f32;
        let mut positions = Vec::with_capacity((stride * stride) as usize);
        let mut uvs = Vec::with_capacity((stride * stride) as usize);
        for iy in 0..stride {
            let y = height / 2.0 - iy as f32 * seg_h;
            for ix in 0..stride {
                let x = ix as f32 * seg_w - width / 2.0;
                positions.push(Vec3::new(x, y, 0.0));
                uvs.push(Vec2::new(
                    ix as f32 / segments as f32,
                    1.0 - iy as f32 / segments as f32,
                ));
            }
        }
        let mut triangles = Vec::with_capacity((segments * segments * 2) as usize);
        for iy in 0..segments {
            for ix in 0..segments {
                let a = ix + stride * iy;
                let b = ix + stride * (iy + 1);
                let c = ix + 1 + stride * (iy + 1);
                let d = ix + 1 + stride * iy;
                triangles.push([a, b, d]);
                triangles.push([b, c, d]);
            }
        }
        Self {
            width,
            height,
            positions,
            uvs,
            triangles,
        }
    }
}

/// Texture RGBA échantillonnée au plus proche, bords étendus.
#[derive(Clone, Debug)]
pub struct Texture {
    image: FrameBuffer,
}

impl Texture {
    /// Wrap an image. Row 0 is the top, sampled at v = 1.
    #[must_use]
    pub fn new(image: FrameBuffer) -> Self {
        Self { image }
    }

    /// Nearest texel at `uv` as straight-alpha floats in [0, 1].
    #[inline(always)]
    #[must_use]
    pub fn sample(&self, uv: Vec2) -> Vec4 {
        let (w, h) = (self.image.width, self.image.height);
        if w == 0 || h == 0 {
            return Vec4::ZERO;
        }
        let texel = |t: f32, size: u32| -> u32 {
            if !t.is_finite() {
                return 0;
            }
            ((t * size as f32).floor().max(0.0) as u32).min(size - 1)
        };
        let x = texel(uv.x, w);
        let y = texel(1.0 - uv.y, h);
        let (r, g, b, a) = self.image.pixel(x, y);
        Vec4::new(r.into(), g.into(), b.into(), a.into()) / 255.0
    }

    /// Image size in texels.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.image.width, self.image.height)
    }
}

/// Uniformes du shader, passés par valeur au rasterizer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Uniforms {
    /// `sin(wall-clock seconds)`.
    pub time: f32,
    /// Container pointer x, normalized to [0, 1].
    pub mouse: f32,
    /// 1.0 enables the vertex wave.
    pub enable_waves: f32,
}

/// Vertex stage: wave displacement in object space.
///
/// # Example
/// ```
/// use glam::Vec3;
/// use cupi_ascii::scene::{displace, Uniforms};
/// let p = Vec3::new(1.0, 2.0, 0.0);
/// assert_eq!(displace(p, &Uniforms::default()), p);
/// ```
#[inline(always)]
#[must_use]
pub fn displace(position: Vec3, uniforms: &Uniforms) -> Vec3 {
    if uniforms.enable_waves == 0.0 {
        return position;
    }
    let t = uniforms.time * 5.0;
    let mut p = position;
    p.x += (t + p.y).sin() * 0.5 * uniforms.enable_waves;
    p.y += (t + p.z).cos() * 0.15 * uniforms.enable_waves;
    p.z += (t + p.x).sin() * uniforms.enable_waves;
    p
}

/// Fragment stage: chromatic jitter, each channel sampled at its own offset.
#[inline(always)]
#[must_use]
pub fn shade(uv: Vec2, texture: &Texture, uniforms: &Uniforms) -> Vec4 {
    let t = uniforms.time;
    let base = texture.sample(uv);
    let r = texture.sample(uv + Vec2::splat((t * 2.0 - t + uv.x).cos() * 0.01)).x;
    let g = texture.sample(uv + Vec2::splat((t * 0.5 + uv.x - t).tan() * 0.01)).y;
    let b = texture.sample(uv - Vec2::splat((t * 2.0 + t + uv.y).cos() * 0.01)).z;
    Vec4::new(r, g, b, base.w)
}

/// Matériau : texture du texte + uniformes.
#[derive(Clone, Debug)]
pub struct ShaderMaterial {
    /// Sampled text raster.
    pub texture: Texture,
    /// Per-frame inputs.
    pub uniforms: Uniforms,
}

/// Plan texturé posé dans la scène.
#[derive(Clone, Debug)]
pub struct PlaneMesh {
    /// Geometry at unit scale.
    pub geometry: PlaneGeometry,
    /// Texture and uniforms.
    pub material: ShaderMaterial,
    /// Scale applied to x and y; depth stays unscaled.
    pub scale: f32,
    /// Vertical offset in world units.
    pub position_y: f32,
}

impl PlaneMesh {
    /// Unscaled, centred mesh.
    #[must_use]
    pub fn new(geometry: PlaneGeometry, material: ShaderMaterial) -> Self {
        Self {
            geometry,
            material,
            scale: 1.0,
            position_y: 0.0,
        }
    }

    /// Object → world transform.
    #[must_use]
    pub fn model(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, self.position_y, 0.0))
            * Mat4::from_scale(Vec3::new(self.scale, self.scale, 1.0))
    }
}

/// Résultat du cadrage du plan dans le frustum.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneFit {
    /// Largest scale keeping the plane inside 92 % × 85 % of the frustum, capped at 1.
    pub safe_scale: f32,
    /// `safe_scale × multiplier`, at least 0.01.
    pub final_scale: f32,
    /// Downward shift compensating growth past the safe scale.
    pub overflow_shift: f32,
    /// Shift requested by the vertical offset.
    pub manual_shift: f32,
    /// Resulting world y of the plane.
    pub position_y: f32,
}

/// Frame a `plane_width × plane_height` plane for `camera`.
///
/// # Example
/// ```
/// use cupi_ascii::scene::{fit_plane, PerspectiveCamera};
/// let cam = PerspectiveCamera::new(1.0);
/// let fit = fit_plane(&cam, 4.0, 2.0, 1.0, 0.0);
/// assert_eq!(fit.safe_scale, 1.0);
/// assert_eq!(fit.position_y, 0.0);
/// ```
#[must_use]
pub fn fit_plane(
    camera: &PerspectiveCamera,
    plane_width: f32,
    plane_height: f32,
    multiplier: f32,
    vertical_offset: f32,
) -> PlaneFit {
    let frustum_h = camera.frustum_height();
    let frustum_w = camera.frustum_width();
    let mut safe = 1.0_f32;
    if plane_width > 0.0 {
        safe = safe.min(frustum_w * 0.92 / plane_width);
    }
    if plane_height > 0.0 {
        safe = safe.min(frustum_h * 0.85 / plane_height);
    }
    if !safe.is_finite() || safe <= 0.0 {
        safe = 0.01;
    }
    let final_scale = (safe * multiplier).max(0.01);
    let overflow_shift = (multiplier - 1.0).max(0.0) * safe * plane_height * 0.5;
    let manual_shift = vertical_offset * plane_height * final_scale;
    PlaneFit {
        safe_scale: safe,
        final_scale,
        overflow_shift,
        manual_shift,
        position_y: -overflow_shift + manual_shift,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_uvs_span_unit_square() {
        let plane = PlaneGeometry::new(6.0, 3.0, 2);
        assert_eq!(plane.positions[0], Vec3::new(-3.0, 1.5, 0.0));
        assert_eq!(plane.uvs[0], Vec2::new(0.0, 1.0));
        assert_eq!(plane.positions[8], Vec3::new(3.0, -1.5, 0.0));
        assert_eq!(plane.uvs[8], Vec2::new(1.0, 0.0));
    }

    #[test]
    fn texture_flip_y_and_clamp() {
        let mut img = FrameBuffer::new(2, 2);
        img.set_pixel(0, 0, (255, 0, 0, 255));
        img.set_pixel(1, 1, (0, 0, 255, 255));
        let tex = Texture::new(img);
        // v = 1 reads the top row.
        assert_eq!(tex.sample(Vec2::new(0.1, 0.9)), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(tex.sample(Vec2::new(0.9, 0.1)), Vec4::new(0.0, 0.0, 1.0, 1.0));
        // Out of range clamps to the edge.
        assert_eq!(tex.sample(Vec2::new(-5.0, 7.0)), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(tex.sample(Vec2::new(f32::NAN, 0.9)).w, 1.0);
    }

    #[test]
    fn waves_move_vertices_when_enabled() {
        let u = Uniforms {
            time: 0.3,
            mouse: 0.0,
            enable_waves: 1.0,
        };
        let p = displace(Vec3::new(1.0, 1.0, 0.0), &u);
        let t = 1.5_f32;
        assert!((p.x - (1.0 + (t + 1.0).sin() * 0.5)).abs() < 1e-5);
        assert!((p.y - (1.0 + t.cos() * 0.15)).abs() < 1e-5);
        assert!((p.z - (t + p.x).sin()).abs() < 1e-5);
    }

    #[test]
    fn alpha_is_not_jittered() {
        let mut img = FrameBuffer::new(4, 1);
        img.set_pixel(1, 0, (255, 255, 255, 128));
        let tex = Texture::new(img);
        let u = Uniforms {
            time: 0.8,
            ..Uniforms::default()
        };
        let c = shade(Vec2::new(0.3, 0.5), &tex, &u);
        assert!((c.w - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn fit_bounds_hold_for_small_multipliers() {
        let cam = PerspectiveCamera::new(1.6);
        for (w, h) in [(40.0, 12.0), (12.0, 40.0), (3.0, 1.0)] {
            for mult in [0.5, 0.9, 1.0] {
                let fit = fit_plane(&cam, w, h, mult, 0.0);
                assert!(fit.final_scale <= mult + 1e-6);
                assert!(w * fit.final_scale <= cam.frustum_width() * 0.92 + 1e-4);
                assert!(h * fit.final_scale <= cam.frustum_height() * 0.85 + 1e-4);
            }
        }
    }

    #[test]
    fn multiplier_above_one_shifts_down() {
        let cam = PerspectiveCamera::new(0.5);
        let fit = fit_plane(&cam, 6.0, 24.0, 1.05, 0.0);
        let expected = 0.05 * fit.safe_scale * 24.0 * 0.5;
        assert!((fit.overflow_shift - expected).abs() < 1e-5);
        assert!((fit.position_y + expected).abs() < 1e-5);
    }

    #[test]
    fn vertical_offset_adds_manual_shift() {
        let cam = PerspectiveCamera::new(1.0);
        let fit = fit_plane(&cam, 2.0, 4.0, 1.0, 0.02);
        assert!((fit.manual_shift - 0.02 * 4.0 * fit.final_scale).abs() < 1e-6);
        assert!(fit.position_y > 0.0);
    }
}
