use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use arc_swap::ArcSwap;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind};
use cupi_ascii::font::load_glyph_source;
use cupi_ascii::mount::{AsciiText, ContainerRect, IntersectionEntry, MountState};
use cupi_core::config::{AppConfig, AsciiTextConfig, HeroLayout, HeroProfile};
use cupi_core::presentation::{PresentationEvent, PresentationState};
use cupi_core::stage::{OverlayLayer, Stage, ViewportMetrics};
use cupi_core::traits::{Animated, dispatch_frame};
use cupi_life::renderer::CellularGridRenderer;
use cupi_render::fps::FpsCounter;
use cupi_render::sampler::CellSampler;
use cupi_render::ui::{self, StatusInfo, ViewModel};
use glam::Vec2;
use ratatui::DefaultTerminal;

use crate::cli::Cli;

/// Pas d'ajustement de la police ASCII au clavier.
const FONT_STEP: f32 = 0.5;

/// Application state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppState {
    /// Main loop running.
    Running,
    /// Quit requested.
    Quitting,
}

/// Hôte terminal : possède le `Stage` et pilote les deux composants.
pub struct App {
    /// Config published by the hot-reload watcher.
    source: Arc<ArcSwap<AppConfig>>,
    /// Last published config seen by the loop.
    seen: Arc<AppConfig>,
    /// Effective config: published config plus CLI overrides.
    config: AppConfig,
    cli: Cli,
    state: AppState,
    stage: Stage,
    grid: Option<CellularGridRenderer>,
    ascii: Option<AsciiText>,
    presentation: PresentationState,
    presentation_rx: flume::Receiver<PresentationEvent>,
    sampler: CellSampler,
    fps_counter: FpsCounter,
    terminal_size: (u16, u16),
    cell_px: (f32, f32),
    scroll_y: f32,
    scrolled_at: Option<Instant>,
    show_status: bool,
    font_delta: f32,
    started: Instant,
}

impl App {
    /// Build the stage and mount the components the config asks for.
    ///
    /// # Errors
    /// Returns an error if the terminal size cannot be read or the ASCII
    /// pipeline cannot be built.
    pub fn new(source: Arc<ArcSwap<AppConfig>>, cli: Cli) -> Result<Self> {
        let seen = source.load_full();
        let mut config = (*seen).clone();
        cli.apply(&mut config);

        let terminal_size = crossterm::terminal::size()?;
        let cell_px = cell_pixels(terminal_size, &config);
        let mut presentation = PresentationState::default();
        let presentation_rx = presentation.subscribe();

        let mut app = Self {
            source,
            seen,
            config,
            cli,
            state: AppState::Running,
            stage: Stage::new(ViewportMetrics::default()),
            grid: None,
            ascii: None,
            presentation,
            presentation_rx,
            sampler: CellSampler::new(),
            fps_counter: FpsCounter::new(),
            terminal_size,
            cell_px,
            scroll_y: 0.0,
            scrolled_at: None,
            show_status: true,
            font_delta: 0.0,
            started: Instant::now(),
        };
        let (w, h) = app.viewport_px();
        app.stage.set_viewport(ViewportMetrics::new(w, h));
        log::info!(
            "viewport {w}×{h}px, profil {}",
            profile_name(app.config.app.profile)
        );
        app.sync_components()?;
        Ok(app)
    }

    /// Main loop: events, reload, resize, frame dispatch, draw.
    ///
    /// # Errors
    /// Returns an error if terminal operations fail.
    pub fn run(&mut self, mut terminal: DefaultTerminal) -> Result<()> {
        let mut last_frame = Instant::now();

        loop {
            if self.state == AppState::Quitting {
                break;
            }

            let frame_duration =
                Duration::from_secs_f64(1.0 / f64::from(self.config.app.target_fps));
            let elapsed = last_frame.elapsed();
            if elapsed < frame_duration {
                // Dormir le temps restant, mais rester réactif aux événements
                if event::poll(frame_duration.saturating_sub(elapsed))? {
                    self.handle_event(&event::read()?);
                }
                continue;
            }
            last_frame = Instant::now();

            while event::poll(Duration::ZERO)? {
                self.handle_event(&event::read()?);
            }

            self.check_reload();
            self.check_resize()?;
            self.check_presentation();

            let now = self.now();
            let mut components: Vec<&mut dyn Animated> = Vec::with_capacity(2);
            if let Some(grid) = self.grid.as_mut() {
                components.push(grid);
            }
            if let Some(ascii) = self.ascii.as_mut() {
                components.push(ascii);
            }
            dispatch_frame(&mut self.stage, &mut components, now);

            self.fps_counter.tick();
            let status = self.show_status.then(|| self.status());
            let (w, h) = self.viewport_px();
            let (cols, rows) = self.terminal_size;
            let canvas = self
                .grid
                .as_ref()
                .and_then(CellularGridRenderer::canvas)
                .filter(|c| c.width() > 0 && c.height() > 0);
            let background = match canvas {
                Some(canvas) => match self.sampler.sample(canvas.buffer(), cols, rows) {
                    Ok(cells) => Some(cells),
                    Err(e) => {
                        log::debug!("fond non échantillonné : {e}");
                        None
                    }
                },
                None => None,
            };
            let overlays: Vec<&OverlayLayer> =
                self.stage.layers().map(|(_, layer)| layer).collect();
            let view = ViewModel {
                background,
                overlays,
                viewport_px: (w as f32, h as f32),
                cell_px: self.cell_px,
                status,
            };
            terminal.draw(|frame| ui::draw(frame, &view))?;
        }

        if let Some(grid) = self.grid.as_mut() {
            grid.unmount(&mut self.stage);
        }
        if let Some(ascii) = self.ascii.as_mut() {
            ascii.unmount(&mut self.stage);
        }
        Ok(())
    }

    fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Viewport in pixels: the terminal grid times the cell size.
    fn viewport_px(&self) -> (u32, u32) {
        (
            (f32::from(self.terminal_size.0) * self.cell_px.0).round() as u32,
            (f32::from(self.terminal_size.1) * self.cell_px.1).round() as u32,
        )
    }

    /// ASCII config for the current width, keyboard font adjustment included.
    fn ascii_config(&self) -> AsciiTextConfig {
        let (w, _) = self.viewport_px();
        hero_config(&self.config, w, self.font_delta)
    }

    fn container(&self) -> ContainerRect {
        let (w, h) = self.viewport_px();
        ContainerRect::sized(w as f32, h as f32)
    }

    /// Mount, rebuild or unmount components to match the effective config.
    fn sync_components(&mut self) -> Result<()> {
        let now = self.now();

        if self.config.app.show_grid {
            let stale = self
                .grid
                .as_ref()
                .is_none_or(|g| g.config() != &self.config.grid);
            if stale {
                if let Some(mut old) = self.grid.take() {
                    old.unmount(&mut self.stage);
                }
                let mut grid = CellularGridRenderer::new(self.config.grid.clone());
                grid.mount(&mut self.stage);
                self.grid = Some(grid);
            }
        } else if let Some(mut old) = self.grid.take() {
            old.unmount(&mut self.stage);
        }

        if !self.config.app.show_ascii || self.config.app.reduced_motion {
            if let Some(mut old) = self.ascii.take() {
                old.unmount(&mut self.stage);
            }
            return Ok(());
        }
        // A hero whose rebuild failed is gone; mount a fresh one.
        if self.ascii.as_ref().is_some_and(|a| a.state() == MountState::Disposed) {
            self.ascii = None;
        }
        let ascii_config = self.ascii_config();
        let rect = self.container();
        if let Some(ascii) = self.ascii.as_mut() {
            ascii.update_config(&mut self.stage, ascii_config, now)?;
        } else {
            let mut ascii = AsciiText::new(ascii_config)?;
            ascii.mount(&mut self.stage, rect, now)?;
            self.ascii = Some(ascii);
        }
        Ok(())
    }

    /// Pick up a config published by the watcher.
    fn check_reload(&mut self) {
        let latest = self.source.load_full();
        if Arc::ptr_eq(&latest, &self.seen) {
            return;
        }
        self.seen = Arc::clone(&latest);
        let mut candidate = (*latest).clone();
        self.cli.apply(&mut candidate);
        let cell_px = cell_pixels(self.terminal_size, &candidate);
        let width = (f32::from(self.terminal_size.0) * cell_px.0).round() as u32;
        let hero = hero_config(&candidate, width, self.font_delta);
        if let Err(e) = validate_reload(&candidate, &hero) {
            log::warn!("Config rejetée : {e:#}");
            return;
        }

        let previous = std::mem::replace(&mut self.config, candidate);
        let cells_changed = (previous.app.cell_width_px, previous.app.cell_height_px)
            != (self.config.app.cell_width_px, self.config.app.cell_height_px);
        if cells_changed {
            self.apply_viewport();
        }
        if let Err(e) = self.sync_components() {
            log::warn!("Config rejetée : {e:#}");
            self.config = previous;
            if cells_changed {
                self.apply_viewport();
            }
            if let Err(e) = self.sync_components() {
                log::error!("Retour à la config précédente impossible : {e:#}");
            }
        }
    }

    fn check_resize(&mut self) -> Result<()> {
        let size = crossterm::terminal::size()?;
        if size == self.terminal_size {
            return Ok(());
        }
        self.terminal_size = size;
        self.apply_viewport();
        let ascii_config = self.ascii_config();
        let now = self.now();
        // Crossing the compact breakpoint swaps the hero layout.
        if let Some(ascii) = self.ascii.as_mut()
            && let Err(e) = ascii.update_config(&mut self.stage, ascii_config, now)
        {
            log::warn!("Disposition du hero non appliquée : {e}");
        }
        Ok(())
    }

    /// Recompute the pixel viewport and notify both components.
    fn apply_viewport(&mut self) {
        self.cell_px = cell_pixels(self.terminal_size, &self.config);
        let (w, h) = self.viewport_px();
        self.stage.set_viewport(ViewportMetrics::new(w, h));
        log::debug!(
            "terminal {}×{} → viewport {w}×{h}px",
            self.terminal_size.0,
            self.terminal_size.1
        );
        if let Some(grid) = self.grid.as_mut() {
            grid.schedule_resize();
        }
        let rect = self.container();
        let now = self.now();
        if let Some(ascii) = self.ascii.as_mut()
            && let Err(e) = deliver_container(ascii, &mut self.stage, rect, now)
        {
            log::warn!("Hero non démarré : {e}");
        }
    }

    /// Collapse the debug line once the page has been scrolled long enough ago.
    fn check_presentation(&mut self) {
        let delay = Duration::from_millis(self.config.app.debug_collapse_ms);
        if let Some(at) = self.scrolled_at
            && at.elapsed() >= delay
        {
            self.presentation.hide_debug();
        }
        while let Ok(event) = self.presentation_rx.try_recv() {
            log::debug!("présentation : {event:?}");
            if event == PresentationEvent::DebugHidden {
                self.show_status = false;
            }
        }
    }

    fn status(&self) -> StatusInfo {
        let (w, _) = self.viewport_px();
        let layout = match self.config.app.profile.resolve(w) {
            Some(HeroLayout::Wide) => "wide",
            Some(HeroLayout::Compact) => "compact",
            None => "custom",
        };
        let pipeline = self.ascii.as_ref().and_then(AsciiText::pipeline);
        StatusInfo {
            layout: layout.to_string(),
            grid: self
                .grid
                .as_ref()
                .map(|g| (g.grid().cols() as u32, g.grid().rows() as u32)),
            generations: self.grid.as_ref().map_or(0, CellularGridRenderer::generations),
            ascii: pipeline.map(|p| (p.filter().cols(), p.filter().rows())),
            ascii_font_size: pipeline.map_or(0.0, |p| p.state().ascii_font_size()),
            hue_deg: pipeline.map_or(0.0, |p| p.filter().hue().css_degrees()),
            waves: pipeline.is_some_and(|p| p.config().enable_waves),
            scrolled: self.presentation.scrolled(),
            fps: self.fps_counter.fps(),
        }
    }

    fn handle_event(&mut self, event: &Event) {
        match event {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                ..
            }) => self.handle_key(*code),
            Event::Mouse(mouse) => self.handle_mouse(*mouse),
            _ => {}
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.state = AppState::Quitting,
            KeyCode::Char('d') => self.show_status = !self.show_status,
            KeyCode::Char('w') => {
                if let Some(pipeline) = self.ascii.as_mut().and_then(AsciiText::pipeline_mut) {
                    let on = !pipeline.config().enable_waves;
                    pipeline.set_waves(on);
                    log::debug!("vagues : {on}");
                }
            }
            KeyCode::Char('r') => {
                if let Some(grid) = self.grid.as_mut() {
                    grid.reseed();
                    log::debug!("grid: réensemencée");
                }
            }
            KeyCode::Char('+' | '=') => self.adjust_font(FONT_STEP),
            KeyCode::Char('-') => self.adjust_font(-FONT_STEP),
            KeyCode::Home => {
                self.scroll_y = 0.0;
                self.presentation.reset_scroll();
            }
            _ => {}
        }
    }

    fn adjust_font(&mut self, step: f32) {
        self.font_delta += step;
        let ascii_config = self.ascii_config();
        let now = self.now();
        if let Some(ascii) = self.ascii.as_mut()
            && let Err(e) = ascii.update_config(&mut self.stage, ascii_config, now)
        {
            log::warn!("Taille de police non appliquée : {e}");
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Moved | MouseEventKind::Drag(_) => {
                let client = Vec2::new(
                    (f32::from(mouse.column) + 0.5) * self.cell_px.0,
                    (f32::from(mouse.row) + 0.5) * self.cell_px.1,
                );
                if let Some(ascii) = self.ascii.as_mut() {
                    ascii.on_pointer_move(&self.stage, client);
                }
            }
            MouseEventKind::ScrollDown => self.scroll(self.cell_px.1),
            MouseEventKind::ScrollUp => self.scroll(-self.cell_px.1),
            _ => {}
        }
    }

    fn scroll(&mut self, dy: f32) {
        self.scroll_y = (self.scroll_y + dy).max(0.0);
        self.presentation.on_scroll(self.scroll_y);
        if self.presentation.scrolled_once() && self.scrolled_at.is_none() {
            self.scrolled_at = Some(Instant::now());
        }
    }
}

/// Pixel size of one terminal cell.
///
/// Uses the pixel size the terminal reports, falling back to the
/// configured cell size when it reports none.
fn cell_pixels(size: (u16, u16), config: &AppConfig) -> (f32, f32) {
    let fallback = (
        f32::from(config.app.cell_width_px),
        f32::from(config.app.cell_height_px),
    );
    match crossterm::terminal::window_size() {
        Ok(ws) if ws.width > 0 && ws.height > 0 && size.0 > 0 && size.1 > 0 => (
            f32::from(ws.width) / f32::from(size.0),
            f32::from(ws.height) / f32::from(size.1),
        ),
        _ => fallback,
    }
}

/// ASCII config the hero gets at `width`, shifted by the keyboard adjustment.
fn hero_config(config: &AppConfig, width: u32, font_delta: f32) -> AsciiTextConfig {
    let mut ascii = config.ascii_for_width(width);
    ascii.ascii_font_size = (ascii.ascii_font_size + font_delta).clamp(2.0, 96.0);
    ascii
}

/// Reject a reloaded config the hero could not be built from, before any
/// component is touched.
fn validate_reload(config: &AppConfig, hero: &AsciiTextConfig) -> Result<()> {
    if !config.app.show_ascii || config.app.reduced_motion {
        return Ok(());
    }
    hero.validate()?;
    load_glyph_source(hero)?;
    Ok(())
}

/// Hand the new container box to the hero.
///
/// A hero mounted on an empty container is still waiting for visibility:
/// the terminal has no scroll position, so any box with area counts as an
/// intersecting one.
fn deliver_container(
    ascii: &mut AsciiText,
    stage: &mut Stage,
    rect: ContainerRect,
    now: f64,
) -> Result<()> {
    ascii.on_container_resize(stage, rect);
    if ascii.state() == MountState::SizingPending {
        let entry = IntersectionEntry {
            is_intersecting: !rect.is_empty(),
            rect,
        };
        ascii.on_intersection(stage, entry, now)?;
    }
    Ok(())
}

/// Name of the configured profile, for logs.
#[must_use]
pub fn profile_name(profile: HeroProfile) -> &'static str {
    match profile {
        HeroProfile::Auto => "auto",
        HeroProfile::Wide => "wide",
        HeroProfile::Compact => "compact",
        HeroProfile::Custom => "custom",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hero_on_empty_terminal_starts_after_resize() {
        let mut stage = Stage::new(ViewportMetrics::new(0, 0));
        let mut hero = AsciiText::new(AsciiTextConfig::default()).unwrap();
        hero.mount(&mut stage, ContainerRect::sized(0.0, 0.0), 0.0).unwrap();
        deliver_container(&mut hero, &mut stage, ContainerRect::sized(0.0, 0.0), 0.1).unwrap();
        assert_eq!(hero.state(), MountState::SizingPending);
        assert!(hero.pipeline().is_none());

        stage.set_viewport(ViewportMetrics::new(800, 400));
        deliver_container(&mut hero, &mut stage, ContainerRect::sized(800.0, 400.0), 0.2).unwrap();
        assert_eq!(hero.state(), MountState::Running);
        assert!(hero.pipeline().is_some());
        assert_eq!(stage.scheduler.pending_count(), 1);
        // Only the resize observer is left.
        assert_eq!(stage.observer_count(), 1);
    }

    #[test]
    fn running_hero_only_resizes() {
        let mut stage = Stage::new(ViewportMetrics::new(1200, 600));
        let mut hero = AsciiText::new(AsciiTextConfig::default()).unwrap();
        hero.mount(&mut stage, ContainerRect::sized(1200.0, 600.0), 0.0).unwrap();
        let layer = hero.pipeline().unwrap().layer();
        deliver_container(&mut hero, &mut stage, ContainerRect::sized(600.0, 300.0), 0.1).unwrap();
        let pipeline = hero.pipeline().unwrap();
        assert_eq!(pipeline.layer(), layer);
        assert!((pipeline.state().width() - 600.0).abs() < f32::EPSILON);
    }

    #[test]
    fn reload_with_missing_font_is_rejected() {
        let mut config = AppConfig::default();
        config.ascii.font_path = Some("/nonexistent/hero.ttf".into());
        let hero = hero_config(&config, 1200, 0.0);
        assert!(validate_reload(&config, &hero).is_err());

        // Not rendered, so not checked.
        config.app.reduced_motion = true;
        assert!(validate_reload(&config, &hero).is_ok());
    }

    #[test]
    fn reload_with_bad_colour_is_rejected() {
        let mut config = AppConfig::default();
        config.ascii.text_color = "pas-une-couleur".into();
        let hero = hero_config(&config, 1200, 0.0);
        assert!(validate_reload(&config, &hero).is_err());
    }

    #[test]
    fn default_reload_is_accepted() {
        let config = AppConfig::default();
        let hero = hero_config(&config, 1200, 0.0);
        assert!(validate_reload(&config, &hero).is_ok());
    }

    #[test]
    fn keyboard_font_delta_is_clamped() {
        let config = AppConfig::default();
        let hero = hero_config(&config, 1200, 500.0);
        assert!((hero.ascii_font_size - 96.0).abs() < f32::EPSILON);
    }

    #[test]
    fn profile_names_match_cli_values() {
        for (profile, name) in [
            (HeroProfile::Auto, "auto"),
            (HeroProfile::Wide, "wide"),
            (HeroProfile::Compact, "compact"),
            (HeroProfile::Custom, "custom"),
        ] {
            assert_eq!(profile_name(profile), name);
        }
    }
}
