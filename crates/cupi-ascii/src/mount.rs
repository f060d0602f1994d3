use std::sync::Arc;

use glam::Vec2;

use cupi_core::config::AsciiTextConfig;
use cupi_core::error::CoreError;
use cupi_core::stage::{FrameId, ObserverId, ObserverKind, Stage};
use cupi_core::traits::Animated;

use crate::filter::responsive_font_size;
use crate::font::{GlyphSource, load_glyph_source};
use crate::pipeline::AsciiScenePipeline;

/// Visible fraction required before a deferred pipeline is built.
pub const INTERSECTION_THRESHOLD: f32 = 0.1;

/// Cycle de vie du composant monté.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MountState {
    /// Not mounted yet.
    Uninitialized,
    /// Mounted on a zero-sized container; waiting for it to become visible.
    SizingPending,
    /// Pipeline built and animating.
    Running,
    /// Unmounted; a fresh mount is needed.
    Disposed,
}

/// Position and size of the container box.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ContainerRect {
    /// Left edge in page pixels.
    pub x: f32,
    /// Top edge in page pixels.
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl ContainerRect {
    /// Box at the origin.
    #[must_use]
    pub fn sized(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    /// `true` when either side is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Notification from the visibility observer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntersectionEntry {
    /// Container visible past the threshold.
    pub is_intersecting: bool,
    /// Container box at the time of the notification.
    pub rect: ContainerRect,
}

/// Composant « texte ASCII » : monte, redimensionne et libère le pipeline.
///
/// A container without area defers construction to the first intersection
/// notification with a non-empty box.
///
/// # Example
/// ```
/// use cupi_core::config::AsciiTextConfig;
/// use cupi_core::stage::{Stage, ViewportMetrics};
/// use cupi_ascii::mount::{AsciiText, ContainerRect, MountState};
///
/// let mut stage = Stage::new(ViewportMetrics::new(1200, 600));
/// let mut hero = AsciiText::new(AsciiTextConfig::default()).unwrap();
/// hero.mount(&mut stage, ContainerRect::sized(1200.0, 600.0), 0.0).unwrap();
/// assert_eq!(hero.state(), MountState::Running);
/// hero.unmount(&mut stage);
/// assert_eq!(stage.scheduler.pending_count(), 0);
/// ```
pub struct AsciiText {
    config: AsciiTextConfig,
    font: Arc<dyn GlyphSource>,
    state: MountState,
    rect: ContainerRect,
    pipeline: Option<AsciiScenePipeline>,
    intersection: Option<ObserverId>,
    resize_observer: Option<ObserverId>,
}

impl AsciiText {
    /// Unmounted component. Loads the configured font.
    ///
    /// # Errors
    /// Returns an error if `font_path` is set but unusable.
    pub fn new(config: AsciiTextConfig) -> Result<Self, CoreError> {
        let font = load_glyph_source(&config)?;
        Ok(Self::with_font(config, font))
    }

    /// Unmounted component drawing with `font`.
    #[must_use]
    pub fn with_font(config: AsciiTextConfig, font: Arc<dyn GlyphSource>) -> Self {
        Self {
            config,
            font,
            state: MountState::Uninitialized,
            rect: ContainerRect::default(),
            pipeline: None,
            intersection: None,
            resize_observer: None,
        }
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> MountState {
        self.state
    }

    /// Active config.
    #[must_use]
    pub fn config(&self) -> &AsciiTextConfig {
        &self.config
    }

    /// The running pipeline.
    #[must_use]
    pub fn pipeline(&self) -> Option<&AsciiScenePipeline> {
        self.pipeline.as_ref()
    }

    /// Mutable access to the running pipeline.
    pub fn pipeline_mut(&mut self) -> Option<&mut AsciiScenePipeline> {
        self.pipeline.as_mut()
    }

    /// Mount into `rect`: build now when it has area, otherwise wait for visibility.
    ///
    /// # Errors
    /// Returns an error if the pipeline cannot be built from the config.
    pub fn mount(
        &mut self,
        stage: &mut Stage,
        rect: ContainerRect,
        now_secs: f64,
    ) -> Result<(), CoreError> {
        if !matches!(self.state, MountState::Uninitialized | MountState::Disposed) {
            return Ok(());
        }
        self.rect = rect;
        if rect.is_empty() {
            self.defer(stage);
            return Ok(());
        }
        self.start(stage, rect, now_secs)
    }

    fn defer(&mut self, stage: &mut Stage) {
        self.intersection = Some(stage.observe(ObserverKind::Intersection {
            threshold: INTERSECTION_THRESHOLD,
        }));
        self.state = MountState::SizingPending;
        log::debug!("ascii: conteneur vide, construction différée");
    }

    fn start(
        &mut self,
        stage: &mut Stage,
        rect: ContainerRect,
        now_secs: f64,
    ) -> Result<(), CoreError> {
        let mut config = self.config.clone();
        config.ascii_font_size = responsive_font_size(self.config.ascii_font_size, rect.width);
        let font = Arc::clone(&self.font);
        let mut pipeline = AsciiScenePipeline::new(stage, config, font, rect.width, rect.height)?;
        pipeline.load(stage, now_secs);
        self.pipeline = Some(pipeline);
        if self.resize_observer.is_none() {
            self.resize_observer = Some(stage.observe(ObserverKind::ContainerResize));
        }
        self.state = MountState::Running;
        log::debug!("ascii: pipeline démarré ({}×{})", rect.width, rect.height);
        Ok(())
    }

    /// Visibility notification for a deferred mount.
    ///
    /// # Errors
    /// Returns an error if the pipeline cannot be built from the config.
    pub fn on_intersection(
        &mut self,
        stage: &mut Stage,
        entry: IntersectionEntry,
        now_secs: f64,
    ) -> Result<(), CoreError> {
        if self.state != MountState::SizingPending
            || !entry.is_intersecting
            || entry.rect.is_empty()
        {
            return Ok(());
        }
        if let Some(id) = self.intersection.take() {
            stage.disconnect(id);
        }
        self.rect = entry.rect;
        self.start(stage, entry.rect, now_secs)
    }

    /// Container box changed. Resizes the running pipeline and rescales its font.
    pub fn on_container_resize(&mut self, stage: &mut Stage, rect: ContainerRect) {
        self.rect = rect;
        if rect.is_empty() {
            return;
        }
        let base = self.config.ascii_font_size;
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.set_size(rect.width, rect.height);
            pipeline.set_ascii_font_size(stage, responsive_font_size(base, rect.width));
        }
    }

    /// Forward pointer motion in page coordinates.
    pub fn on_pointer_move(&mut self, stage: &Stage, client: Vec2) {
        let origin = Vec2::new(self.rect.x, self.rect.y);
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.on_pointer_move(stage, client, origin);
        }
    }

    /// Apply a new config.
    ///
    /// Identical config → nothing. Only the ASCII font size changed → applied
    /// in place. Anything else → the pipeline is disposed and rebuilt
    /// (deferred again if the container has no area).
    ///
    /// # Errors
    /// Returns an error if the font or the new pipeline cannot be built.
    pub fn update_config(
        &mut self,
        stage: &mut Stage,
        config: AsciiTextConfig,
        now_secs: f64,
    ) -> Result<(), CoreError> {
        if config == self.config {
            return Ok(());
        }
        if self.config.differs_only_in_font_size(&config) {
            self.config.ascii_font_size = config.ascii_font_size;
            let size = responsive_font_size(config.ascii_font_size, self.rect.width);
            if let Some(pipeline) = self.pipeline.as_mut() {
                pipeline.set_ascii_font_size(stage, size);
            }
            return Ok(());
        }

        if config.font_path != self.config.font_path {
            self.font = load_glyph_source(&config)?;
        }
        self.config = config;
        if matches!(self.state, MountState::Uninitialized | MountState::Disposed) {
            return Ok(());
        }
        log::debug!("ascii: config modifiée, reconstruction du pipeline");
        let rect = self.rect;
        self.unmount(stage);
        self.mount(stage, rect, now_secs)
    }

    /// Disconnect observers and dispose the pipeline. Safe to call more than once.
    pub fn unmount(&mut self, stage: &mut Stage) {
        if let Some(id) = self.intersection.take() {
            stage.disconnect(id);
        }
        if let Some(id) = self.resize_observer.take() {
            stage.disconnect(id);
        }
        if let Some(mut pipeline) = self.pipeline.take() {
            pipeline.dispose(stage);
        }
        if self.state != MountState::Uninitialized {
            self.state = MountState::Disposed;
        }
    }
}

impl Animated for AsciiText {
    fn pending_frame(&self) -> Option<FrameId> {
        self.pipeline.as_ref().and_then(|p| p.pending_frame())
    }

    fn on_frame(&mut self, stage: &mut Stage, now_secs: f64) {
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.on_frame(stage, now_secs);
        }
    }
}
