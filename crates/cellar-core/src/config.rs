//! User configuration loaded from `config.toml`.
//!
//! A missing file means defaults. A file that is too large or fails to parse
//! also means defaults, plus a warning for the caller to show.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::document::{DEFAULT_COLS, DEFAULT_ROWS, RecalcMode, Recalculator, Sheet};
use crate::error::{CellarError, Result};

const MAX_CONFIG_FILE_BYTES: u64 = 1_048_576; // 1 MiB

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Row count of newly created sheets
    pub default_rows: usize,
    /// Column count of newly created sheets
    pub default_cols: usize,
    /// Propagation strategy used for edits
    pub recalc: RecalcMode,
    /// Directory backing the file store
    pub storage_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_rows: DEFAULT_ROWS,
            default_cols: DEFAULT_COLS,
            recalc: RecalcMode::default(),
            storage_dir: None,
        }
    }
}

impl Config {
    /// Parse configuration from TOML text.
    pub fn from_toml(path: &Path, content: &str) -> Result<Config> {
        toml::from_str(content).map_err(|err| CellarError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Load configuration from `explicit`, or from the user config directory.
    ///
    /// Returns the configuration to use and any warnings produced on the way.
    pub fn load(explicit: Option<&Path>) -> (Config, Vec<String>) {
        let mut warnings = Vec::new();
        let path = explicit.map(Path::to_path_buf).or_else(user_config_path);

        let Some(path) = path else {
            return (Config::default(), warnings);
        };
        if !path.exists() {
            if explicit.is_some() {
                warnings.push(format!("Config file not found: {}", path.display()));
            }
            return (Config::default(), warnings);
        }

        let config = match std::fs::metadata(&path) {
            Ok(meta) if meta.len() > MAX_CONFIG_FILE_BYTES => {
                warnings.push(format!(
                    "Refusing to read {}: file too large ({} bytes, max {})",
                    path.display(),
                    meta.len(),
                    MAX_CONFIG_FILE_BYTES
                ));
                None
            }
            Ok(_) => match std::fs::read_to_string(&path) {
                Ok(content) => match Config::from_toml(&path, &content) {
                    Ok(config) => Some(config),
                    Err(err) => {
                        warnings.push(err.to_string());
                        None
                    }
                },
                Err(err) => {
                    warnings.push(format!("Failed to read {}: {}", path.display(), err));
                    None
                }
            },
            Err(err) => {
                warnings.push(format!(
                    "Failed to read metadata for {}: {}",
                    path.display(),
                    err
                ));
                None
            }
        };

        for warning in &warnings {
            tracing::warn!("{warning}; using default configuration");
        }
        (config.unwrap_or_default(), warnings)
    }

    /// An empty sheet of the configured size.
    pub fn new_sheet(&self) -> Sheet {
        Sheet::new(self.default_rows, self.default_cols)
    }

    pub fn recalculator(&self) -> Recalculator {
        Recalculator::new(self.recalc)
    }
}

/// `<platform config dir>/cellar/config.toml`
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "cellar").map(|dirs| dirs.config_dir().join("config.toml"))
}
