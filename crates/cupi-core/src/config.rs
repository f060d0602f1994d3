use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Largeur de viewport sous laquelle le hero passe en disposition compacte.
pub const COMPACT_BREAKPOINT: u32 = 640;

/// Police du hero.
pub const HERO_FONT_FAMILY: &str = "'Times New Roman', Times, serif";

/// Configuration du pipeline texte → scène 3D → ASCII.
///
/// Immutable per mount: a change of `ascii_font_size` alone is applied in
/// place, anything else rebuilds the pipeline.
///
/// # Example
/// ```
/// use cupi_core::config::AsciiTextConfig;
/// let config = AsciiTextConfig::default();
/// assert_eq!(config.text, "CUPI");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AsciiTextConfig {
    /// Texte affiché, lignes séparées par `\n`.
    pub text: String,
    /// Taille de base des glyphes ASCII (avant mise à l'échelle responsive).
    pub ascii_font_size: f32,
    /// Taille de la police utilisée pour rasteriser le texte source.
    pub text_font_size: f32,
    /// Couleur du texte source, `#rrggbb`.
    pub text_color: String,
    /// Hauteur du plan 3D en unités scène.
    pub plane_base_height: f32,
    /// Active l'ondulation du vertex shader.
    pub enable_waves: bool,
    /// Famille de police (libellé ; la forme vient de `font_path` ou de la police bloc intégrée).
    pub font_family: String,
    /// Fichier TTF/OTF optionnel pour rasteriser le texte.
    pub font_path: Option<PathBuf>,
    /// Interligne, multiplicateur de la hauteur de ligne.
    pub line_spacing: f32,
    /// Multiplicateur appliqué après l'ajustement au frustum.
    pub scale_multiplier: f32,
    /// Décalage vertical, fraction de la hauteur du plan.
    pub vertical_offset: f32,
}

impl Default for AsciiTextConfig {
    fn default() -> Self {
        Self {
            text: "CUPI".into(),
            ascii_font_size: 8.0,
            text_font_size: 260.0,
            text_color: "#fdf9f3".into(),
            plane_base_height: 8.0,
            enable_waves: true,
            font_family: "IBM Plex Mono".into(),
            font_path: None,
            line_spacing: 1.0,
            scale_multiplier: 1.0,
            vertical_offset: 0.0,
        }
    }
}

impl AsciiTextConfig {
    /// Check every field before handing the config to the renderer.
    ///
    /// # Errors
    /// Returns `CoreError::Config` for non-positive or non-finite sizes and
    /// for a malformed colour.
    pub fn validate(&self) -> Result<(), CoreError> {
        let positive = [
            ("ascii_font_size", self.ascii_font_size),
            ("text_font_size", self.text_font_size),
            ("plane_base_height", self.plane_base_height),
            ("line_spacing", self.line_spacing),
            ("scale_multiplier", self.scale_multiplier),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(CoreError::Config(format!("{name} doit être > 0 (reçu {value})")));
            }
        }
        if !self.vertical_offset.is_finite() {
            return Err(CoreError::Config("vertical_offset non fini".into()));
        }
        crate::color::parse_hex(&self.text_color)?;
        Ok(())
    }

    /// Parsed text colour. Falls back to the hero colour if malformed.
    #[must_use]
    pub fn text_rgb(&self) -> (u8, u8, u8) {
        crate::color::parse_hex(&self.text_color).unwrap_or(crate::color::TEXT_COLOR)
    }

    /// `true` when `other` differs from `self` only by `ascii_font_size`.
    #[must_use]
    pub fn differs_only_in_font_size(&self, other: &Self) -> bool {
        let mut same_size = other.clone();
        same_size.ascii_font_size = self.ascii_font_size;
        same_size == *self && other.ascii_font_size != self.ascii_font_size
    }

    /// Apply the fields a hero layout dictates.
    pub fn apply_layout(&mut self, layout: HeroLayout) {
        match layout {
            HeroLayout::Wide => {
                self.text = "CUPI".into();
                self.ascii_font_size = 10.8;
                self.text_font_size = 384.0;
                self.plane_base_height = 12.0;
                self.scale_multiplier = 1.0;
                self.vertical_offset = 0.0;
                self.line_spacing = 1.0;
            }
            HeroLayout::Compact => {
                self.text = "C\nU\nP\nI".into();
                self.ascii_font_size = 7.8;
                self.text_font_size = 736.0;
                self.plane_base_height = 24.0;
                self.scale_multiplier = 1.05;
                self.vertical_offset = 0.02;
                self.line_spacing = 1.08;
            }
        }
    }
}

/// Disposition concrète du hero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeroLayout {
    /// Single line "CUPI".
    Wide,
    /// Stacked letters for narrow viewports.
    Compact,
}

/// Choix de profil du hero.
///
/// # Example
/// ```
/// use cupi_core::config::{HeroLayout, HeroProfile};
/// assert_eq!(HeroProfile::Auto.resolve(600), Some(HeroLayout::Compact));
/// assert_eq!(HeroProfile::Auto.resolve(1280), Some(HeroLayout::Wide));
/// assert_eq!(HeroProfile::Custom.resolve(600), None);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeroProfile {
    /// Compact below the breakpoint, wide otherwise.
    #[default]
    Auto,
    /// Always wide.
    Wide,
    /// Always compact.
    Compact,
    /// Use the `[ascii]` section verbatim.
    Custom,
}

impl HeroProfile {
    /// Layout for a viewport width, `None` for `Custom`.
    #[must_use]
    pub fn resolve(self, viewport_width: u32) -> Option<HeroLayout> {
        match self {
            Self::Auto if viewport_width < COMPACT_BREAKPOINT => Some(HeroLayout::Compact),
            Self::Auto | Self::Wide => Some(HeroLayout::Wide),
            Self::Compact => Some(HeroLayout::Compact),
            Self::Custom => None,
        }
    }
}

/// Paramètres de l'automate de fond.
///
/// # Example
/// ```
/// use cupi_core::config::GridConfig;
/// let g = GridConfig::default();
/// assert_eq!(g.step_interval, 150);
/// assert!((g.cell_size() - 4.0).abs() < f32::EPSILON);
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GridConfig {
    /// Pas de la grille en pixels.
    pub pitch: f32,
    /// Côté du carré peint, fraction du pas.
    pub cell_ratio: f32,
    /// Rayon des coins.
    pub corner_radius: f32,
    /// Opacité des cellules vivantes.
    pub cell_alpha: f32,
    /// Probabilité qu'une cellule naisse vivante au (ré)ensemencement.
    pub seed_density: f64,
    /// Frames entre deux générations.
    pub step_interval: u32,
    /// Graine RNG pour un rendu reproductible.
    pub seed: Option<u64>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            pitch: 10.0,
            cell_ratio: 0.4,
            corner_radius: 1.5,
            cell_alpha: 0.1,
            seed_density: 0.3,
            step_interval: 150,
            seed: None,
        }
    }
}

impl GridConfig {
    /// Painted square side in pixels.
    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.pitch * self.cell_ratio
    }

    /// Clamp all numeric fields to their valid ranges.
    pub fn clamp_all(&mut self) {
        self.pitch = self.pitch.clamp(2.0, 200.0);
        self.cell_ratio = self.cell_ratio.clamp(0.05, 1.0);
        self.corner_radius = self.corner_radius.clamp(0.0, self.cell_size() / 2.0);
        self.cell_alpha = self.cell_alpha.clamp(0.0, 1.0);
        self.seed_density = self.seed_density.clamp(0.0, 1.0);
        self.step_interval = self.step_interval.max(1);
    }
}

/// Réglages du front-end terminal.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AppSettings {
    /// FPS cible.
    pub target_fps: u32,
    /// Largeur d'une cellule terminal en pixels quand le terminal ne la fournit pas.
    pub cell_width_px: u16,
    /// Hauteur d'une cellule terminal en pixels quand le terminal ne la fournit pas.
    pub cell_height_px: u16,
    /// Profil du hero.
    pub profile: HeroProfile,
    /// Préférence « mouvement réduit » : le texte ASCII n'est pas monté.
    pub reduced_motion: bool,
    /// Afficher le fond automate.
    pub show_grid: bool,
    /// Afficher le texte ASCII.
    pub show_ascii: bool,
    /// Délai avant repli de la barre de debug après le premier scroll (ms).
    pub debug_collapse_ms: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            target_fps: 60,
            cell_width_px: 8,
            cell_height_px: 16,
            profile: HeroProfile::Auto,
            reduced_motion: false,
            show_grid: true,
            show_ascii: true,
            debug_collapse_ms: 500,
        }
    }
}

impl AppSettings {
    /// Clamp all numeric fields to their valid ranges.
    pub fn clamp_all(&mut self) {
        self.target_fps = self.target_fps.clamp(15, 120);
        self.cell_width_px = self.cell_width_px.clamp(2, 64);
        self.cell_height_px = self.cell_height_px.clamp(4, 128);
        self.debug_collapse_ms = self.debug_collapse_ms.min(10_000);
    }
}

/// Configuration complète, hot-rechargeable.
///
/// # Example
/// ```
/// use cupi_core::config::AppConfig;
/// let config = AppConfig::default();
/// assert_eq!(config.app.target_fps, 60);
/// assert!(!config.ascii.enable_waves);
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    /// Pipeline ASCII.
    pub ascii: AsciiTextConfig,
    /// Automate de fond.
    pub grid: GridConfig,
    /// Front-end.
    pub app: AppSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ascii: AsciiTextConfig {
                enable_waves: false,
                font_family: HERO_FONT_FAMILY.into(),
                ..AsciiTextConfig::default()
            },
            grid: GridConfig::default(),
            app: AppSettings::default(),
        }
    }
}

impl AppConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        self.grid.clamp_all();
        self.app.clamp_all();
        let a = &mut self.ascii;
        a.ascii_font_size = a.ascii_font_size.clamp(2.0, 96.0);
        a.text_font_size = a.text_font_size.clamp(8.0, 2048.0);
        a.plane_base_height = a.plane_base_height.clamp(0.5, 200.0);
        a.line_spacing = a.line_spacing.clamp(0.1, 4.0);
        a.scale_multiplier = a.scale_multiplier.clamp(0.05, 4.0);
        a.vertical_offset = a.vertical_offset.clamp(-2.0, 2.0);
    }

    /// The ASCII config to mount for a viewport width, hero layout applied.
    #[must_use]
    pub fn ascii_for_width(&self, viewport_width: u32) -> AsciiTextConfig {
        let mut ascii = self.ascii.clone();
        if let Some(layout) = self.app.profile.resolve(viewport_width) {
            ascii.apply_layout(layout);
        }
        ascii
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    ascii: Option<AsciiSection>,
    grid: Option<GridSection>,
    app: Option<AppSection>,
}

/// `[ascii]` section, all fields optional for partial override.
#[derive(Deserialize)]
struct AsciiSection {
    text: Option<String>,
    ascii_font_size: Option<f32>,
    text_font_size: Option<f32>,
    text_color: Option<String>,
    plane_base_height: Option<f32>,
    enable_waves: Option<bool>,
    font_family: Option<String>,
    font_path: Option<PathBuf>,
    line_spacing: Option<f32>,
    scale_multiplier: Option<f32>,
    vertical_offset: Option<f32>,
}

/// `[grid]` section.
#[derive(Deserialize)]
struct GridSection {
    pitch: Option<f32>,
    cell_ratio: Option<f32>,
    corner_radius: Option<f32>,
    cell_alpha: Option<f32>,
    seed_density: Option<f64>,
    step_interval: Option<u32>,
    seed: Option<u64>,
}

/// `[app]` section.
#[derive(Deserialize)]
struct AppSection {
    target_fps: Option<u32>,
    cell_width_px: Option<u16>,
    cell_height_px: Option<u16>,
    profile: Option<HeroProfile>,
    reduced_motion: Option<bool>,
    show_grid: Option<bool>,
    show_ascii: Option<bool>,
    debug_collapse_ms: Option<u64>,
}

macro_rules! merge {
    ($section:expr, $target:expr, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(v) = $section.$field {
                $target.$field = v;
            }
        )*
    };
}

/// Parse une configuration TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the TOML is malformed or the ASCII section fails validation.
///
/// # Example
/// ```
/// use cupi_core::config::parse_config;
/// let config = parse_config("[grid]\nseed = 7\n").unwrap();
/// assert_eq!(config.grid.seed, Some(7));
/// assert_eq!(config.grid.pitch, 10.0);
/// ```
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;
    let mut config = AppConfig::default();

    if let Some(a) = file.ascii {
        merge!(a, config.ascii, [
            text,
            ascii_font_size,
            text_font_size,
            text_color,
            plane_base_height,
            enable_waves,
            font_family,
            line_spacing,
            scale_multiplier,
            vertical_offset,
        ]);
        if a.font_path.is_some() {
            config.ascii.font_path = a.font_path;
        }
    }
    if let Some(g) = file.grid {
        merge!(g, config.grid, [
            pitch,
            cell_ratio,
            corner_radius,
            cell_alpha,
            seed_density,
            step_interval,
        ]);
        if g.seed.is_some() {
            config.grid.seed = g.seed;
        }
    }
    if let Some(s) = file.app {
        merge!(s, config.app, [
            target_fps,
            cell_width_px,
            cell_height_px,
            profile,
            reduced_motion,
            show_grid,
            show_ascii,
            debug_collapse_ms,
        ]);
    }

    config.clamp_all();
    config.ascii.validate()?;
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use cupi_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Err(CoreError::FileNotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content)
        .with_context(|| format!("Configuration invalide dans {}", path.display()))
}
