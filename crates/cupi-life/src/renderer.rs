use cupi_core::canvas::Canvas2d;
use cupi_core::config::GridConfig;
use cupi_core::stage::{
    EventKind, EventTarget, FrameId, ListenerId, ObserverId, ObserverKind, Stage,
};
use cupi_core::traits::Animated;

use crate::grid::LifeGrid;

/// Couleur de fond opaque.
const BACKGROUND: (u8, u8, u8) = (0, 0, 0);
/// Couleur des cellules vivantes (peinte à `cell_alpha`).
const CELL_COLOR: (u8, u8, u8) = (255, 255, 255);

/// Cycle de vie du composant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridState {
    /// Not mounted yet.
    Idle,
    /// Mounted without a canvas context: does nothing.
    Inert,
    /// Animation loop active.
    Running,
    /// Unmounted; a fresh instance is needed.
    Unmounted,
}

/// Fond animé : automate de Conway peint en carrés arrondis translucides.
///
/// # Example
/// ```
/// use cupi_core::config::GridConfig;
/// use cupi_core::stage::{Stage, ViewportMetrics};
/// use cupi_core::traits::dispatch_frame;
/// use cupi_life::renderer::CellularGridRenderer;
///
/// let mut stage = Stage::new(ViewportMetrics::new(200, 100));
/// let mut bg = CellularGridRenderer::with_seed(GridConfig::default(), 1);
/// bg.mount(&mut stage);
/// assert_eq!((bg.grid().cols(), bg.grid().rows()), (20, 10));
/// dispatch_frame(&mut stage, &mut [&mut bg], 0.0);
/// bg.unmount(&mut stage);
/// assert_eq!(stage.scheduler.pending_count(), 0);
/// ```
pub struct CellularGridRenderer {
    config: GridConfig,
    state: GridState,
    canvas: Option<Canvas2d>,
    grid: LifeGrid,
    rng: fastrand::Rng,
    frame_count: u64,
    generations: u64,
    pending_frame: Option<FrameId>,
    resize_pending: bool,
    listeners: Vec<ListenerId>,
    observers: Vec<ObserverId>,
}

impl CellularGridRenderer {
    /// Create an unmounted renderer. Seeds from `config.seed` when set.
    #[must_use]
    pub fn new(config: GridConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self {
            config,
            state: GridState::Idle,
            canvas: None,
            grid: LifeGrid::new(0, 0),
            rng,
            frame_count: 0,
            generations: 0,
            pending_frame: None,
            resize_pending: false,
            listeners: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Create an unmounted renderer with a fixed RNG seed.
    #[must_use]
    pub fn with_seed(mut config: GridConfig, seed: u64) -> Self {
        config.seed = Some(seed);
        Self::new(config)
    }

    /// Active config.
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> GridState {
        self.state
    }

    /// The automaton.
    #[must_use]
    pub fn grid(&self) -> &LifeGrid {
        &self.grid
    }

    /// Mutable access to the automaton (pattern injection).
    pub fn grid_mut(&mut self) -> &mut LifeGrid {
        &mut self.grid
    }

    /// The painted canvas, if a context was acquired.
    #[must_use]
    pub fn canvas(&self) -> Option<&Canvas2d> {
        self.canvas.as_ref()
    }

    /// Frames seen since mount.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Generations computed since mount.
    #[must_use]
    pub fn generations(&self) -> u64 {
        self.generations
    }

    /// Acquire the canvas, size it, start observing and animating.
    ///
    /// Without a canvas context the renderer stays inert.
    pub fn mount(&mut self, stage: &mut Stage) {
        if self.state != GridState::Idle {
            return;
        }
        let Some(canvas) = stage.acquire_canvas() else {
            log::debug!("grid: pas de contexte 2D, fond désactivé");
            self.state = GridState::Inert;
            return;
        };
        self.canvas = Some(canvas);
        self.state = GridState::Running;
        self.resize(stage);
        self.listeners
            .push(stage.add_listener(EventTarget::Window, EventKind::Resize));
        self.observers
            .push(stage.observe(ObserverKind::DocumentResize));
        self.pending_frame = Some(stage.scheduler.request_frame());
    }

    /// Recompute canvas and grid dimensions from the viewport.
    ///
    /// Reallocates and reseeds only when the column/row counts change;
    /// returns `true` in that case.
    pub fn resize(&mut self, stage: &Stage) -> bool {
        let Some(canvas) = self.canvas.as_mut() else {
            return false;
        };
        let viewport = stage.viewport();
        let width = viewport.inner_width;
        let height = viewport.canvas_height();
        canvas.set_size(width, height);

        let cols = (width as f32 / self.config.pitch).floor() as usize;
        let rows = (height as f32 / self.config.pitch).floor() as usize;
        if cols == self.grid.cols() && rows == self.grid.rows() {
            return false;
        }
        self.grid = LifeGrid::new(cols, rows);
        self.grid.seed(&mut self.rng, self.config.seed_density);
        log::debug!(
            "grid: {cols}×{rows} cellules, {} vivantes",
            self.grid.live_count()
        );
        true
    }

    /// Debounce a resize to the start of the next frame.
    pub fn schedule_resize(&mut self) {
        if self.state == GridState::Running {
            self.resize_pending = true;
        }
    }

    /// `true` while a debounced resize waits for the next frame.
    #[must_use]
    pub fn resize_pending(&self) -> bool {
        self.resize_pending
    }

    /// Reseed the current grid in place.
    pub fn reseed(&mut self) {
        self.grid.seed(&mut self.rng, self.config.seed_density);
    }

    /// Advance the automaton one generation.
    pub fn step(&mut self) {
        if self.grid.is_empty() {
            return;
        }
        self.grid.step();
        self.generations += 1;
    }

    /// Repaint: opaque black, then one translucent rounded square per live cell.
    pub fn draw(&mut self) {
        let Some(canvas) = self.canvas.as_mut() else {
            return;
        };
        canvas.clear_opaque(BACKGROUND);
        let pitch = self.config.pitch;
        let size = self.config.cell_size();
        let inset = (pitch - size) / 2.0;
        for (col, row) in self.grid.live_cells() {
            canvas.fill_rounded_rect(
                col as f32 * pitch + inset,
                row as f32 * pitch + inset,
                size,
                size,
                self.config.corner_radius,
                CELL_COLOR,
                self.config.cell_alpha,
            );
        }
    }

    /// Stop animating, detach everything, and give the canvas back.
    pub fn unmount(&mut self, stage: &mut Stage) {
        if let Some(id) = self.pending_frame.take() {
            stage.scheduler.cancel_frame(id);
        }
        self.resize_pending = false;
        for id in self.listeners.drain(..) {
            stage.remove_listener(id);
        }
        for id in self.observers.drain(..) {
            stage.disconnect(id);
        }
        if let Some(canvas) = self.canvas.take() {
            stage.release_canvas(canvas);
        }
        if self.state != GridState::Unmounted {
            log::debug!("grid: démonté après {} frames", self.frame_count);
        }
        self.state = GridState::Unmounted;
    }
}

impl Animated for CellularGridRenderer {
    fn pending_frame(&self) -> Option<FrameId> {
        self.pending_frame
    }

    fn on_frame(&mut self, stage: &mut Stage, _now_secs: f64) {
        self.pending_frame = None;
        if self.state != GridState::Running {
            return;
        }
        if self.resize_pending {
            self.resize_pending = false;
            self.resize(stage);
        }

        self.frame_count += 1;
        let interval = u64::from(self.config.step_interval.max(1));
        if !self.grid.is_empty() {
            if self.frame_count % interval == 0 {
                self.step();
            }
            self.draw();
        }

        self.pending_frame = Some(stage.scheduler.request_frame());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cupi_core::stage::ViewportMetrics;
    use cupi_core::traits::dispatch_frame;

    fn mounted(width: u32, height: u32) -> (Stage, CellularGridRenderer) {
        let mut stage = Stage::new(ViewportMetrics::new(width, height));
        let mut bg = CellularGridRenderer::with_seed(GridConfig::default(), 7);
        bg.mount(&mut stage);
        (stage, bg)
    }

    #[test]
    fn dimensions_follow_viewport_and_pitch() {
        let (_, bg) = mounted(1005, 399);
        assert_eq!(bg.grid().cols(), 100);
        assert_eq!(bg.grid().rows(), 39);
        let canvas = bg.canvas().unwrap();
        assert_eq!((canvas.width(), canvas.height()), (1005, 399));
    }

    #[test]
    fn canvas_covers_document_scroll_height() {
        let mut metrics = ViewportMetrics::new(300, 200);
        metrics.document_scroll_height = 900;
        let mut stage = Stage::new(metrics);
        let mut bg = CellularGridRenderer::with_seed(GridConfig::default(), 1);
        bg.mount(&mut stage);
        assert_eq!(bg.grid().rows(), 90);
    }

    #[test]
    fn resize_with_same_dimensions_preserves_state() {
        let (mut stage, mut bg) = mounted(200, 100);
        let before = bg.grid().clone();
        // Pixel change that keeps floor(w / 10) and floor(h / 10).
        stage.set_viewport(ViewportMetrics::new(205, 104));
        assert!(!bg.resize(&stage));
        assert_eq!(bg.grid(), &before);
    }

    #[test]
    fn resize_with_new_dimensions_reseeds() {
        let (mut stage, mut bg) = mounted(200, 100);
        stage.set_viewport(ViewportMetrics::new(400, 100));
        assert!(bg.resize(&stage));
        assert_eq!(bg.grid().cols(), 40);
        assert!(bg.grid().live_count() > 0);
    }

    #[test]
    fn steps_only_every_interval_but_draws_every_frame() {
        let (mut stage, mut bg) = mounted(100, 100);
        for _ in 0..149 {
            dispatch_frame(&mut stage, &mut [&mut bg], 0.0);
        }
        assert_eq!(bg.generations(), 0);
        dispatch_frame(&mut stage, &mut [&mut bg], 0.0);
        assert_eq!(bg.generations(), 1);
        assert_eq!(bg.frame_count(), 150);
    }

    #[test]
    fn draw_paints_black_and_translucent_cells() {
        let (_, mut bg) = mounted(30, 30);
        bg.grid_mut().clear();
        bg.grid_mut().set(1, 1, true);
        bg.draw();
        let canvas = bg.canvas().unwrap();
        // Cell (1, 1) spans pixels 13..17.
        assert_eq!(canvas.buffer().pixel(15, 15), (26, 26, 26, 255));
        assert_eq!(canvas.buffer().pixel(5, 5), (0, 0, 0, 255));
    }

    #[test]
    fn resize_is_debounced_to_next_frame() {
        let (mut stage, mut bg) = mounted(100, 100);
        stage.set_viewport(ViewportMetrics::new(300, 100));
        bg.schedule_resize();
        bg.schedule_resize();
        assert_eq!(bg.grid().cols(), 10);
        dispatch_frame(&mut stage, &mut [&mut bg], 0.0);
        assert_eq!(bg.grid().cols(), 30);
        assert!(!bg.resize_pending());
    }

    #[test]
    fn missing_canvas_is_a_silent_noop() {
        let mut stage = Stage::without_canvas(ViewportMetrics::new(100, 100));
        let mut bg = CellularGridRenderer::new(GridConfig::default());
        bg.mount(&mut stage);
        assert_eq!(bg.state(), GridState::Inert);
        assert_eq!(stage.scheduler.pending_count(), 0);
        assert_eq!(stage.listener_count(), 0);
        bg.draw();
        bg.step();
    }

    #[test]
    fn unmount_releases_everything() {
        let (mut stage, mut bg) = mounted(100, 100);
        dispatch_frame(&mut stage, &mut [&mut bg], 0.0);
        bg.unmount(&mut stage);
        assert_eq!(stage.scheduler.pending_count(), 0);
        assert_eq!(stage.listener_count(), 0);
        assert_eq!(stage.observer_count(), 0);
        assert_eq!(stage.live_canvases(), 0);
        assert_eq!(bg.state(), GridState::Unmounted);
        bg.unmount(&mut stage);
    }

    #[test]
    fn same_seed_same_background() {
        let (_, a) = mounted(300, 200);
        let (_, b) = mounted(300, 200);
        assert_eq!(a.grid(), b.grid());
    }
}
