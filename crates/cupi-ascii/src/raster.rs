use glam::{Vec2, Vec4};

use cupi_core::frame::FrameBuffer;

use crate::scene::{PerspectiveCamera, PlaneMesh, displace, shade};

/// Sommet projeté : position écran, profondeur NDC, 1/w et UV/w.
#[derive(Clone, Copy, Debug)]
struct ScreenVertex {
    pos: Vec2,
    ndc: Vec2,
    depth: f32,
    inv_w: f32,
    uv_over_w: Vec2,
}

/// Rasterizer logiciel : triangles texturés, z-buffer, blending alpha.
///
/// The colour target holds premultiplied RGBA floats; [`read_pixels`]
/// un-premultiplies into a byte image the way a 2D canvas readback does.
///
/// [`read_pixels`]: SoftwareRenderer::read_pixels
pub struct SoftwareRenderer {
    width: u32,
    height: u32,
    color: Vec<Vec4>,
    depth: Vec<f32>,
    projected: Vec<Option<ScreenVertex>>,
}

impl SoftwareRenderer {
    /// Empty render target.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let mut r = Self {
            width: 0,
            height: 0,
            color: Vec::new(),
            depth: Vec::new(),
            projected: Vec::new(),
        };
        r.set_size(width, height);
        r
    }

    /// Resize the target. Contents are cleared.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        let n = width as usize * height as usize;
        self.color.clear();
        self.color.resize(n, Vec4::ZERO);
        self.depth.clear();
        self.depth.resize(n, f32::INFINITY);
    }

    /// Target size in pixels.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Clear to transparent black and reset depth.
    pub fn clear(&mut self) {
        self.color.fill(Vec4::ZERO);
        self.depth.fill(f32::INFINITY);
    }

    /// Draw `mesh` through `camera` over a cleared target.
    pub fn render(&mut self, mesh: &PlaneMesh, camera: &PerspectiveCamera) {
        self.clear();
        if self.width == 0 || self.height == 0 {
            return;
        }
        let uniforms = mesh.material.uniforms;
        let mvp = camera.projection() * camera.view() * mesh.model();
        let (w, h) = (self.width as f32, self.height as f32);

        self.projected.clear();
        self.projected.extend(
            mesh.geometry
                .positions
                .iter()
                .zip(&mesh.geometry.uvs)
                .map(|(&p, &uv)| {
                    let clip = mvp * displace(p, &uniforms).extend(1.0);
                    if clip.w <= 1e-5 {
                        return None;
                    }
                    let inv_w = 1.0 / clip.w;
                    let ndc = Vec2::new(clip.x, clip.y) * inv_w;
                    Some(ScreenVertex {
                        pos: Vec2::new((ndc.x * 0.5 + 0.5) * w, (0.5 - ndc.y * 0.5) * h),
                        ndc,
                        depth: clip.z * inv_w,
                        inv_w,
                        uv_over_w: uv * inv_w,
                    })
                }),
        );

        for tri in &mesh.geometry.triangles {
            let (Some(a), Some(b), Some(c)) = (
                self.projected[tri[0] as usize],
                self.projected[tri[1] as usize],
                self.projected[tri[2] as usize],
            ) else {
                continue;
            };
            // Back faces culled: counter-clockwise in NDC faces the camera.
            if edge(a.ndc, b.ndc, c.ndc) <= 0.0 {
                continue;
            }
            self.fill_triangle(a, b, c, mesh);
        }
    }

    fn fill_triangle(
        &mut self,
        a: ScreenVertex,
        b: ScreenVertex,
        c: ScreenVertex,
        mesh: &PlaneMesh,
    ) {
        // Screen space is y-down, so the winding flips.
        let area = edge(a.pos, c.pos, b.pos);
        if area <= 0.0 {
            return;
        }
        let min = a.pos.min(b.pos).min(c.pos).floor().max(Vec2::ZERO);
        let max = a.pos.max(b.pos).max(c.pos).ceil();
        let x_end = (max.x.max(0.0) as u32).min(self.width);
        let y_end = (max.y.max(0.0) as u32).min(self.height);
        let uniforms = &mesh.material.uniforms;
        let texture = &mesh.material.texture;
        // Shared edges belong to one triangle only.
        let owns = [
            is_top_left(c.pos, b.pos),
            is_top_left(a.pos, c.pos),
            is_top_left(b.pos, a.pos),
        ];
        let inside = |w: f32, owned: bool| w > 0.0 || (w == 0.0 && owned);

        for py in min.y as u32..y_end {
            for px in min.x as u32..x_end {
                let p = Vec2::new(px as f32 + 0.5, py as f32 + 0.5);
                let w0 = edge(c.pos, b.pos, p);
                let w1 = edge(a.pos, c.pos, p);
                let w2 = edge(b.pos, a.pos, p);
                if !(inside(w0, owns[0]) && inside(w1, owns[1]) && inside(w2, owns[2])) {
                    continue;
                }
                let (l0, l1, l2) = (w0 / area, w1 / area, w2 / area);
                let depth = a.depth * l0 + b.depth * l1 + c.depth * l2;
                if !(-1.0..=1.0).contains(&depth) {
                    continue;
                }
                let idx = py as usize * self.width as usize + px as usize;
                if depth > self.depth[idx] {
                    continue;
                }
                let inv_w = a.inv_w * l0 + b.inv_w * l1 + c.inv_w * l2;
                let uv = (a.uv_over_w * l0 + b.uv_over_w * l1 + c.uv_over_w * l2) / inv_w;
                let src = shade(uv, texture, uniforms);
                let dst = self.color[idx];
                let alpha = src.w.clamp(0.0, 1.0);
                let rgb = src.truncate() * alpha + dst.truncate() * (1.0 - alpha);
                self.color[idx] = rgb.extend(alpha + dst.w * (1.0 - alpha));
                self.depth[idx] = depth;
            }
        }
    }

    /// Copy the target into `out` as straight-alpha bytes, resizing it if needed.
    pub fn read_pixels(&self, out: &mut FrameBuffer) {
        if out.width != self.width || out.height != self.height {
            out.resize(self.width, self.height);
        }
        for (px, c) in out.data.chunks_exact_mut(4).zip(&self.color) {
            let a = c.w.clamp(0.0, 1.0);
            let straight = if a > 0.0 { c.truncate() / a } else { c.truncate() };
            let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
            px[0] = byte(straight.x);
            px[1] = byte(straight.y);
            px[2] = byte(straight.z);
            px[3] = byte(a);
        }
    }
}

/// Signed parallelogram area of (a, b, p); positive when p is left of a→b in a y-up frame.
#[inline(always)]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Top or left edge of a triangle wound clockwise on a y-down screen.
#[inline(always)]
fn is_top_left(from: Vec2, to: Vec2) -> bool {
    let d = to - from;
    d.y < 0.0 || (d.y == 0.0 && d.x > 0.0)
}
