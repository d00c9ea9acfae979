use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::RollickConfig};

const CONFIG_FILENAME: &str = "rollick.toml";

/// Override for the config directory, set via `set_config_dir()`.
static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Set a custom config directory. When set, discovery only looks there
/// (project-local and user-global paths are skipped). Each call replaces
/// the previous override.
pub fn set_config_dir(path: PathBuf) {
    *CONFIG_DIR_OVERRIDE.lock().unwrap_or_else(|e| e.into_inner()) = Some(path);
}

/// Clear the config directory override, restoring default discovery.
pub fn clear_config_dir() {
    *CONFIG_DIR_OVERRIDE.lock().unwrap_or_else(|e| e.into_inner()) = None;
}

fn config_dir_override() -> Option<PathBuf> {
    CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

/// Load config from the given path, with env substitution.
pub fn load_config(path: &Path) -> anyhow::Result<RollickConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    Ok(toml::from_str(&raw)?)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./rollick.toml` (project-local)
/// 2. `~/.config/rollick/rollick.toml` (user-global)
///
/// Returns `RollickConfig::default()` if no config file is found or the
/// file fails to parse.
pub fn discover_and_load() -> RollickConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return RollickConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            RollickConfig::default()
        },
    }
}

/// Find the first config file in standard locations.
///
/// When a config dir override is set, only that directory is searched.
fn find_config_file() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        let p = dir.join(CONFIG_FILENAME);
        return p.exists().then_some(p);
    }

    // Project-local
    let p = PathBuf::from(CONFIG_FILENAME);
    if p.exists() {
        return Some(p);
    }

    // User-global: ~/.config/rollick/
    if let Some(dir) = home_dir().map(|h| h.join(".config").join("rollick")) {
        let p = dir.join(CONFIG_FILENAME);
        if p.exists() {
            return Some(p);
        }
    }

    None
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;

    // One test owns the global override so parallel tests cannot race it.
    #[test]
    fn override_dir_discovery() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILENAME),
            "[bot]\ntoken = \"${ROLLICK_LOADER_TEST_TOKEN}\"\nowners = [42]\n\n[database]\nurl = \"sqlite::memory:\"\n",
        )
        .unwrap();
        unsafe { std::env::set_var("ROLLICK_LOADER_TEST_TOKEN", "123:abc") };

        set_config_dir(dir.path().to_path_buf());
        let cfg = discover_and_load();
        clear_config_dir();
        unsafe { std::env::remove_var("ROLLICK_LOADER_TEST_TOKEN") };

        assert!(cfg.bot.is_owner(42));
        assert_eq!(cfg.database.url, "sqlite::memory:");
        use secrecy::ExposeSecret;
        assert_eq!(cfg.bot.token.unwrap().expose_secret(), "123:abc");

        // An override dir without a config file yields defaults.
        let empty = tempfile::tempdir().unwrap();
        set_config_dir(empty.path().to_path_buf());
        let cfg = discover_and_load();
        clear_config_dir();
        assert!(cfg.bot.owners.is_empty());
    }
}
