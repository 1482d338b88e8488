use std::path::{Path, PathBuf};

use docsift_core::config::Settings;

use crate::prelude::*;

const CONFIG_FILE: &str = "config.toml";

/// `$XDG_CONFIG_HOME/docsift/config.toml` or the platform equivalent.
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|dir| dir.join("docsift").join(CONFIG_FILE))
}

/// Load settings from `explicit`, else from the default location, else use
/// built-in defaults.
///
/// A missing explicit file is an error. A missing default file is not.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    let path = match explicit {
        Some(path) if !path.exists() => {
            return Err(Error::MissingConfig(path.display().to_string()).into())
        }
        Some(path) => path.to_path_buf(),
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => path,
            None => {
                log::debug!("No config file found, using defaults");
                return Ok(Settings::default());
            }
        },
    };

    log::debug!("Loading config from {}", path.display());
    read_settings(&path)
}

fn read_settings(path: &Path) -> Result<Settings> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;
    Settings::from_toml_str(&text)
        .wrap_err_with(|| format!("Invalid config file {}", path.display()))
}
