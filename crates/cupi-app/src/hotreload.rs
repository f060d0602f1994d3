use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use arc_swap::ArcSwap;
use cupi_core::config::{AppConfig, load_config};
use notify::{Event, EventKind, RecursiveMode, Watcher};

/// Surveille le fichier de configuration et publie chaque version valide.
///
/// The returned watcher must outlive the main loop. An invalid file is
/// logged and the previous config stays published.
///
/// # Errors
/// Returns an error if the watcher cannot be created or the path cannot be watched.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use arc_swap::ArcSwap;
/// use cupi_core::config::AppConfig;
/// use cupi_app::hotreload::spawn_config_watcher;
/// use std::path::Path;
///
/// let config = Arc::new(ArcSwap::from_pointee(AppConfig::default()));
/// let _watcher = spawn_config_watcher(Path::new("config/default.toml"), &config);
/// ```
pub fn spawn_config_watcher(
    config_path: &Path,
    config: &Arc<ArcSwap<AppConfig>>,
) -> Result<impl Watcher + use<>> {
    let config = Arc::clone(config);
    let path = config_path.to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let Ok(event) = res else {
            return;
        };
        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            return;
        }
        match load_config(&path) {
            Ok(next) => {
                config.store(Arc::new(next));
                log::info!("Config rechargée depuis {}", path.display());
            }
            Err(e) => log::warn!("Erreur de rechargement config : {e:#}"),
        }
    })?;

    watcher.watch(config_path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
