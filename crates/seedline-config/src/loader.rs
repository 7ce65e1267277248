//! Layered loading: built-in defaults, then a YAML file, then the command line.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::defaults::{APP_DIR, CONFIG_FILE};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{ClientConfig, ConfigOverlay};
use crate::validate::build_config;

/// `$XDG_CONFIG_HOME/seedline/config.yaml` or the platform equivalent.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Read one YAML configuration file as an overlay.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read and
/// [`ConfigError::Parse`] when it is not a valid configuration document.
pub fn load_file(path: &Path) -> ConfigResult<ConfigOverlay> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if raw.trim().is_empty() {
        return Ok(ConfigOverlay::default());
    }
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve the effective configuration.
///
/// An explicit `file` must exist. Without one, the default location is read
/// when present. `cli` is layered last.
///
/// # Errors
///
/// Returns the first file or validation error encountered.
pub fn load(file: Option<&Path>, cli: ConfigOverlay) -> ConfigResult<ClientConfig> {
    let from_file = match file {
        Some(path) => {
            debug!(path = %path.display(), "loading configuration file");
            load_file(path)?
        }
        None => match default_config_path().filter(|path| path.is_file()) {
            Some(path) => {
                debug!(path = %path.display(), "loading default configuration file");
                load_file(&path)?
            }
            None => ConfigOverlay::default(),
        },
    };
    build_config(from_file.merge(cli))
}
