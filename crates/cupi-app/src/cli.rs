use std::path::PathBuf;

use clap::Parser;
use cupi_core::config::{AppConfig, HeroProfile};

/// Le hero CUPI dans le terminal, automate de fond et texte ASCII 3D.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Profil du hero : auto, wide, compact, custom.
    #[arg(long, value_parser = ["auto", "wide", "compact", "custom"])]
    pub profile: Option<String>,

    /// Texte affiché (force le profil custom). `\n` sépare les lignes.
    #[arg(long)]
    pub text: Option<String>,

    /// FPS cible.
    #[arg(long)]
    pub fps: Option<u32>,

    /// Graine de l'automate pour un fond reproductible.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Ne pas afficher l'automate de fond.
    #[arg(long, default_value_t = false)]
    pub no_grid: bool,

    /// Ne pas afficher le texte ASCII.
    #[arg(long, default_value_t = false)]
    pub no_ascii: bool,

    /// Mouvement réduit : le texte ASCII n'est pas monté.
    #[arg(long, default_value_t = false)]
    pub reduced_motion: bool,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded config.
    ///
    /// Called again after every hot reload so the flags keep winning.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(profile) = self.profile.as_deref() {
            config.app.profile = match profile {
                "wide" => HeroProfile::Wide,
                "compact" => HeroProfile::Compact,
                "custom" => HeroProfile::Custom,
                _ => HeroProfile::Auto,
            };
        }
        if let Some(text) = &self.text {
            config.ascii.text = text.replace("\\n", "\n");
            config.app.profile = HeroProfile::Custom;
        }
        if let Some(fps) = self.fps {
            config.app.target_fps = fps;
        }
        if self.seed.is_some() {
            config.grid.seed = self.seed;
        }
        if self.no_grid {
            config.app.show_grid = false;
        }
        if self.no_ascii {
            config.app.show_ascii = false;
        }
        if self.reduced_motion {
            config.app.reduced_motion = true;
        }
        config.clamp_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_config_alone() {
        let cli = Cli::try_parse_from(["cupiscii"]).unwrap();
        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert_eq!(config, AppConfig::default());
        assert_eq!(cli.config, PathBuf::from("config/default.toml"));
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn text_forces_custom_profile() {
        let cli =
            Cli::try_parse_from(["cupiscii", "--profile", "wide", "--text", "RO\\nBOT"]).unwrap();
        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.ascii.text, "RO\nBOT");
        assert_eq!(config.app.profile, HeroProfile::Custom);
    }

    #[test]
    fn fps_is_clamped_and_flags_apply() {
        let cli = Cli::try_parse_from([
            "cupiscii",
            "--fps",
            "500",
            "--seed",
            "3",
            "--no-grid",
            "--reduced-motion",
        ])
        .unwrap();
        let mut config = AppConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.app.target_fps, 120);
        assert_eq!(config.grid.seed, Some(3));
        assert!(!config.app.show_grid);
        assert!(config.app.reduced_motion);
    }

    #[test]
    fn unknown_profile_is_rejected() {
        assert!(Cli::try_parse_from(["cupiscii", "--profile", "tall"]).is_err());
    }
}
