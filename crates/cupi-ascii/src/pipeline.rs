use std::sync::Arc;

use glam::Vec2;

use cupi_core::charset::AsciiRamp;
use cupi_core::config::AsciiTextConfig;
use cupi_core::error::CoreError;
use cupi_core::stage::{
    BlendMode, EventKind, EventTarget, FrameId, LayerId, ListenerId, OverlayLayer, Stage,
};
use cupi_core::traits::Animated;

use crate::filter::{AsciiFilter, MIN_FONT_SIZE};
use crate::font::GlyphSource;
use crate::scene::{
    PLANE_SEGMENTS, PerspectiveCamera, PlaneFit, PlaneGeometry, PlaneMesh, ShaderMaterial,
    Texture, Uniforms, fit_plane,
};
use crate::text::TextCanvas;

/// Family of the overlay that displays the art.
pub const OVERLAY_FONT_FAMILY: &str = "IBM Plex Mono";
/// Smaller ASCII font changes are ignored by the pipeline.
const FONT_SIZE_EPSILON: f32 = 0.05;

/// État mutable du pipeline, un seul propriétaire.
///
/// Writers: the pointer handler (`pointer`), `set_size` (`width`,
/// `height`), `set_ascii_font_size` (`ascii_font_size`) and the frame tick
/// (`frames`).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PipelineState {
    width: f32,
    height: f32,
    pointer: Vec2,
    ascii_font_size: f32,
    frames: u64,
}

impl PipelineState {
    /// Container width in pixels.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Container height in pixels.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Last pointer position relative to the container.
    #[must_use]
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    /// Current ASCII glyph size.
    #[must_use]
    pub fn ascii_font_size(&self) -> f32 {
        self.ascii_font_size
    }

    /// Frames rendered.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Ressources GPU simulées : raster du texte et plan texturé.
struct SceneResources {
    text: TextCanvas,
    mesh: PlaneMesh,
}

/// Texte → texture → plan 3D → caméra → ASCII, à chaque frame.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use cupi_core::config::AsciiTextConfig;
/// use cupi_core::stage::{Stage, ViewportMetrics};
/// use cupi_ascii::font::BlockFont;
/// use cupi_ascii::pipeline::AsciiScenePipeline;
///
/// let mut stage = Stage::new(ViewportMetrics::new(800, 400));
/// let mut p = AsciiScenePipeline::new(
///     &mut stage, AsciiTextConfig::default(), Arc::new(BlockFont), 800.0, 400.0,
/// ).unwrap();
/// p.load(&mut stage, 0.0);
/// assert!(p.text().contains('\n'));
/// p.dispose(&mut stage);
/// assert_eq!(stage.scheduler.pending_count(), 0);
/// assert_eq!(stage.layers().count(), 0);
/// ```
pub struct AsciiScenePipeline {
    config: AsciiTextConfig,
    camera: PerspectiveCamera,
    resources: Option<SceneResources>,
    plane: (f32, f32),
    fit: Option<PlaneFit>,
    filter: AsciiFilter,
    state: PipelineState,
    layer: Option<LayerId>,
    document_listener: Option<ListenerId>,
    container_listeners: Vec<ListenerId>,
    pending_frame: Option<FrameId>,
    disposed: bool,
}

impl AsciiScenePipeline {
    /// Build the scene for a `width × height` container and mount its overlay.
    ///
    /// # Errors
    /// Returns `CoreError::Config` for an invalid config and
    /// `CoreError::InvalidDimensions` for an empty container.
    pub fn new(
        stage: &mut Stage,
        config: AsciiTextConfig,
        font: Arc<dyn GlyphSource>,
        width: f32,
        height: f32,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let sized = width > 0.0 && height > 0.0;
        if !sized {
            return Err(CoreError::InvalidDimensions {
                width: width.max(0.0) as u32,
                height: height.max(0.0) as u32,
            });
        }

        let text = TextCanvas::new(
            &config.text,
            font,
            config.text_font_size,
            config.line_spacing,
            config.text_rgb(),
        );
        let plane_h = config.plane_base_height;
        let plane_w = plane_h * text.aspect();
        let mesh = PlaneMesh::new(
            PlaneGeometry::new(plane_w, plane_h, PLANE_SEGMENTS),
            ShaderMaterial {
                texture: Texture::new(text.buffer().clone()),
                uniforms: Uniforms {
                    time: 0.0,
                    mouse: 1.0,
                    enable_waves: if config.enable_waves { 1.0 } else { 0.0 },
                },
            },
        );
        log::debug!(
            "ascii: texte {}×{} px, plan {plane_w:.2}×{plane_h:.2}",
            text.width(),
            text.height()
        );

        let ascii_font_size = config.ascii_font_size.max(MIN_FONT_SIZE);
        let layer = stage.append_layer(OverlayLayer {
            text: String::new(),
            font_size: ascii_font_size,
            font_family: OVERLAY_FONT_FAMILY.into(),
            color: config.text_rgb(),
            hue_rotate_deg: 0.0,
            blend: BlendMode::Difference,
        });
        let document_listener = stage.add_listener(EventTarget::Document, EventKind::PointerMove);
        let container_listeners = vec![
            stage.add_listener(EventTarget::Container, EventKind::PointerMove),
            stage.add_listener(EventTarget::Container, EventKind::TouchMove),
        ];

        let mut pipeline = Self {
            filter: AsciiFilter::new(AsciiRamp::default(), ascii_font_size),
            camera: PerspectiveCamera::new(width / height),
            resources: Some(SceneResources { text, mesh }),
            plane: (plane_w, plane_h),
            fit: None,
            state: PipelineState {
                ascii_font_size,
                ..PipelineState::default()
            },
            layer: Some(layer),
            document_listener: Some(document_listener),
            container_listeners,
            pending_frame: None,
            disposed: false,
            config,
        };
        pipeline.set_size(width, height);
        Ok(pipeline)
    }

    /// Start the loop: queue the next frame, then render this one.
    pub fn load(&mut self, stage: &mut Stage, now_secs: f64) {
        self.on_frame(stage, now_secs);
    }

    /// Resize camera, filter and plane framing to the container.
    pub fn set_size(&mut self, width: f32, height: f32) {
        let sized = width > 0.0 && height > 0.0;
        if self.disposed || !sized {
            return;
        }
        self.state.width = width;
        self.state.height = height;
        self.camera.aspect = width / height;
        self.filter.set_size(width, height);
        self.fit_mesh_to_viewport();
    }

    fn fit_mesh_to_viewport(&mut self) {
        let Some(res) = self.resources.as_mut() else {
            return;
        };
        let (plane_w, plane_h) = self.plane;
        let fit = fit_plane(
            &self.camera,
            plane_w,
            plane_h,
            self.config.scale_multiplier,
            self.config.vertical_offset,
        );
        res.mesh.scale = fit.final_scale;
        res.mesh.position_y = fit.position_y;
        self.fit = Some(fit);
    }

    /// Change the ASCII glyph size. Non-finite sizes and changes under
    /// 0.05 px are ignored; the size never drops below 2 px.
    pub fn set_ascii_font_size(&mut self, stage: &mut Stage, size: f32) {
        if self.disposed || !size.is_finite() {
            return;
        }
        let normalized = size.max(MIN_FONT_SIZE);
        if (normalized - self.state.ascii_font_size).abs() < FONT_SIZE_EPSILON {
            return;
        }
        self.state.ascii_font_size = normalized;
        self.config.ascii_font_size = normalized;
        self.filter.set_font_size(normalized);
        if let Some(layer) = self.layer.and_then(|id| stage.layer_mut(id)) {
            layer.font_size = normalized;
        }
    }

    /// Pointer moved to `client` (page coordinates); the container's
    /// top-left corner is at `container_origin`.
    ///
    /// The document listener feeds the hue cycler in device pixels, the
    /// container listeners feed the `mouse` uniform.
    pub fn on_pointer_move(&mut self, stage: &Stage, client: Vec2, container_origin: Vec2) {
        if self
            .document_listener
            .is_some_and(|id| stage.has_listener(id))
        {
            let scaled = client * stage.viewport().device_pixel_ratio;
            self.filter.set_pointer(scaled.x, scaled.y);
        }
        if self.container_listeners.iter().any(|&id| stage.has_listener(id)) {
            self.state.pointer = client - container_origin;
            let width = self.state.width;
            if let Some(res) = self.resources.as_mut().filter(|_| width > 0.0) {
                res.mesh.material.uniforms.mouse = (self.state.pointer.x / width).clamp(0.0, 1.0);
            }
        }
    }

    /// Toggle the vertex wave without rebuilding the scene.
    pub fn set_waves(&mut self, enabled: bool) {
        self.config.enable_waves = enabled;
        if let Some(res) = self.resources.as_mut() {
            res.mesh.material.uniforms.enable_waves = if enabled { 1.0 } else { 0.0 };
        }
    }

    fn render(&mut self, stage: &mut Stage, now_secs: f64) {
        let Some(res) = self.resources.as_mut() else {
            return;
        };
        res.mesh.material.uniforms.time = now_secs.sin() as f32;
        let art = self.filter.render(&res.mesh, &self.camera);
        if let Some(layer) = self.layer.and_then(|id| stage.layer_mut(id)) {
            layer.text.clear();
            layer.text.push_str(art);
            layer.hue_rotate_deg = self.filter.hue().css_degrees();
        }
        self.state.frames += 1;
    }

    /// Cancel the frame, detach listeners, release the scene and remove the overlay.
    ///
    /// Safe to call more than once.
    pub fn dispose(&mut self, stage: &mut Stage) {
        if let Some(id) = self.pending_frame.take() {
            stage.scheduler.cancel_frame(id);
        }
        if let Some(id) = self.document_listener.take() {
            stage.remove_listener(id);
        }
        for id in self.container_listeners.drain(..) {
            stage.remove_listener(id);
        }
        self.resources = None;
        if let Some(id) = self.layer.take() {
            stage.remove_layer(id);
        }
        if !self.disposed {
            log::debug!("ascii: pipeline libéré après {} frames", self.state.frames);
        }
        self.disposed = true;
    }

    /// Config the scene was built from, font size tracking live updates.
    #[must_use]
    pub fn config(&self) -> &AsciiTextConfig {
        &self.config
    }

    /// Mutable state snapshot.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Last plane framing.
    #[must_use]
    pub fn fit(&self) -> Option<PlaneFit> {
        self.fit
    }

    /// Unscaled plane size in world units.
    #[must_use]
    pub fn plane_size(&self) -> (f32, f32) {
        self.plane
    }

    /// Text raster size, `None` once released.
    #[must_use]
    pub fn text_raster_size(&self) -> Option<(u32, u32)> {
        self.resources.as_ref().map(|r| (r.text.width(), r.text.height()))
    }

    /// Current shader uniforms, `None` once released.
    #[must_use]
    pub fn uniforms(&self) -> Option<Uniforms> {
        self.resources.as_ref().map(|r| r.mesh.material.uniforms)
    }

    /// The ASCII filter.
    #[must_use]
    pub fn filter(&self) -> &AsciiFilter {
        &self.filter
    }

    /// Last frame of art.
    #[must_use]
    pub fn text(&self) -> &str {
        self.filter.text()
    }

    /// Overlay layer, `None` once disposed.
    #[must_use]
    pub fn layer(&self) -> Option<LayerId> {
        self.layer
    }

    /// `true` after [`dispose`](Self::dispose).
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Animated for AsciiScenePipeline {
    fn pending_frame(&self) -> Option<FrameId> {
        self.pending_frame
    }

    fn on_frame(&mut self, stage: &mut Stage, now_secs: f64) {
        self.pending_frame = None;
        if self.disposed {
            return;
        }
        self.pending_frame = Some(stage.scheduler.request_frame());
        self.render(stage, now_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::BlockFont;
    use cupi_core::stage::ViewportMetrics;
    use cupi_core::traits::dispatch_frame;

    fn pipeline(config: AsciiTextConfig, w: f32, h: f32) -> (Stage, AsciiScenePipeline) {
        let mut stage = Stage::new(ViewportMetrics::new(w as u32, h as u32));
        let p = AsciiScenePipeline::new(&mut stage, config, Arc::new(BlockFont), w, h).unwrap();
        (stage, p)
    }

    #[test]
    fn plane_follows_text_aspect() {
        let (_, p) = pipeline(AsciiTextConfig::default(), 800.0, 400.0);
        let (tw, th) = p.text_raster_size().unwrap();
        let (pw, ph) = p.plane_size();
        assert!((ph - 8.0).abs() < f32::EPSILON);
        assert!((pw - 8.0 * tw as f32 / th as f32).abs() < 1e-4);
    }

    #[test]
    fn registers_overlay_and_pointer_listeners() {
        let (stage, p) = pipeline(AsciiTextConfig::default(), 800.0, 400.0);
        let layer = stage.layer(p.layer().unwrap()).unwrap();
        assert_eq!(layer.blend, BlendMode::Difference);
        assert_eq!(layer.font_family, OVERLAY_FONT_FAMILY);
        assert_eq!(stage.listener_count(), 3);
    }

    #[test]
    fn frames_write_art_and_requeue() {
        let (mut stage, mut p) = pipeline(AsciiTextConfig::default(), 640.0, 320.0);
        p.load(&mut stage, 1.0);
        assert_eq!(stage.scheduler.pending_count(), 1);
        dispatch_frame(&mut stage, &mut [&mut p], 1.016);
        assert_eq!(p.state().frames(), 2);
        let art = &stage.layer(p.layer().unwrap()).unwrap().text;
        let rows = art.lines().count() as u32;
        assert_eq!(rows, p.filter().rows());
        assert!(art.lines().all(|l| l.chars().count() as u32 == p.filter().cols()));
        assert!(art.chars().any(|c| c != ' ' && c != '\n'), "plane should be visible");
    }

    #[test]
    fn small_font_changes_are_ignored() {
        let (mut stage, mut p) = pipeline(AsciiTextConfig::default(), 800.0, 400.0);
        p.set_ascii_font_size(&mut stage, 8.03);
        assert!((p.state().ascii_font_size() - 8.0).abs() < f32::EPSILON);
        p.set_ascii_font_size(&mut stage, f32::NAN);
        p.set_ascii_font_size(&mut stage, 1.0);
        assert!((p.state().ascii_font_size() - 2.0).abs() < f32::EPSILON);
        let layer = stage.layer(p.layer().unwrap()).unwrap();
        assert!((layer.font_size - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn container_pointer_drives_mouse_uniform() {
        let (mut stage, mut p) = pipeline(AsciiTextConfig::default(), 800.0, 400.0);
        stage.set_viewport(ViewportMetrics {
            device_pixel_ratio: 2.0,
            ..ViewportMetrics::new(800, 400)
        });
        p.on_pointer_move(&stage, Vec2::new(300.0, 50.0), Vec2::new(100.0, 0.0));
        assert_eq!(p.state().pointer(), Vec2::new(200.0, 50.0));
        assert!((p.uniforms().unwrap().mouse - 0.25).abs() < 1e-6);
    }

    #[test]
    fn compact_fit_shifts_plane_down() {
        let mut config = AsciiTextConfig::default();
        config.apply_layout(cupi_core::config::HeroLayout::Compact);
        let (_, p) = pipeline(config, 390.0, 844.0);
        let fit = p.fit().unwrap();
        let expected = 0.05 * fit.safe_scale * 24.0 * 0.5;
        assert!((fit.overflow_shift - expected).abs() < 1e-4);
        assert!((fit.manual_shift - 0.02 * 24.0 * fit.final_scale).abs() < 1e-4);
    }

    #[test]
    fn dispose_releases_everything() {
        let (mut stage, mut p) = pipeline(AsciiTextConfig::default(), 800.0, 400.0);
        p.load(&mut stage, 0.0);
        p.dispose(&mut stage);
        assert_eq!(stage.scheduler.pending_count(), 0);
        assert_eq!(stage.listener_count(), 0);
        assert_eq!(stage.layers().count(), 0);
        assert!(p.text_raster_size().is_none());
        // A stale frame callback does nothing.
        p.on_frame(&mut stage, 1.0);
        assert_eq!(stage.scheduler.pending_count(), 0);
        p.dispose(&mut stage);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut stage = Stage::new(ViewportMetrics::new(10, 10));
        let mut config = AsciiTextConfig::default();
        config.text_color = "nope".into();
        let result = AsciiScenePipeline::new(&mut stage, config, Arc::new(BlockFont), 10.0, 10.0);
        assert!(matches!(result, Err(CoreError::Config(_))));
        let zero = AsciiScenePipeline::new(
            &mut stage,
            AsciiTextConfig::default(),
            Arc::new(BlockFont),
            0.0,
            10.0,
        );
        assert!(matches!(zero, Err(CoreError::InvalidDimensions { .. })));
        assert_eq!(stage.layers().count(), 0);
    }
}
