//! Configuration file discovery and loading
//!
//! Config file resolution follows a fixed priority order:
//! 1. Explicit path (command-line argument)
//! 2. `JUKEBOX_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/jukebox/config.toml`)
//!
//! An explicit path or `JUKEBOX_CONFIG` value naming a missing file is an
//! error. Only the platform default may be absent, in which case callers fall
//! back to compiled defaults. A file that exists but fails to parse is an
//! error too.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "JUKEBOX_CONFIG";

/// Application directory name under the platform config directory
const APP_DIR: &str = "jukebox";

/// Config file name inside the application directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Locate the configuration file to use, if any
///
/// Returns `Ok(None)` only when nothing was requested and the platform
/// default does not exist.
pub fn locate_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    // Priority 1: Command-line argument
    if let Some(path) = explicit {
        return require_existing(path.to_path_buf(), "config file");
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return require_existing(PathBuf::from(path), CONFIG_ENV_VAR);
    }

    // Priority 3: Platform config directory
    let Some(candidate) = default_config_path() else {
        return Ok(None);
    };
    if candidate.exists() {
        Ok(Some(candidate))
    } else {
        debug!("No config file at {}", candidate.display());
        Ok(None)
    }
}

fn require_existing(path: PathBuf, source: &str) -> Result<Option<PathBuf>> {
    if path.exists() {
        Ok(Some(path))
    } else {
        Err(Error::Config(format!(
            "{} {} does not exist",
            source,
            path.display()
        )))
    }
}

/// Platform default config path (`~/.config/jukebox/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE_NAME))
}

/// Read and deserialize a TOML file
pub fn load_toml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str::<T>(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// Load config from the located file, or fall back to `T::default()`
///
/// Returns the config together with the path it was loaded from.
pub fn load_or_default<T: DeserializeOwned + Default>(
    explicit: Option<&Path>,
) -> Result<(T, Option<PathBuf>)> {
    match locate_config_file(explicit)? {
        Some(path) => {
            let config = load_toml_file(&path)?;
            Ok((config, Some(path)))
        }
        None => Ok((T::default(), None)),
    }
}
