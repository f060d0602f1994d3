use std::io::stdout;
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use clap::Parser;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use cupi_core::config::AppConfig;

pub mod app;
pub mod cli;
pub mod hotreload;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Charger la config
    let config = Arc::new(ArcSwap::from_pointee(resolve_config(&cli)?));

    // 4. Hot-reload (thread interne notify), seulement si le fichier existe
    let _watcher = if cli.config.exists() {
        match hotreload::spawn_config_watcher(&cli.config, &config) {
            Ok(w) => Some(w),
            Err(e) => {
                log::warn!("Hot-reload indisponible : {e}");
                None
            }
        }
    } else {
        None
    };

    // 5. Terminal ratatui + souris
    let terminal = ratatui::init();
    crossterm::execute!(stdout(), EnableMouseCapture)?;

    // 6. Boucle principale
    let result = app::App::new(config, cli).and_then(|mut app| app.run(terminal));

    // 7. Restaurer le terminal (TOUJOURS, même en cas d'erreur)
    let _ = crossterm::execute!(stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Load `--config`, or the defaults when the file does not exist.
fn resolve_config(cli: &cli::Cli) -> Result<AppConfig> {
    if cli.config.exists() {
        cupi_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(AppConfig::default())
    }
}
