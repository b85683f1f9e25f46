//! Settings parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;

use crate::color::{ColorError, canonical_hex};
use crate::consts::DEFAULT_THEME_COLOR;

pub const WORKSPACE_VAR: &str = "FLOWSTEP_WORKSPACE";
pub const THEME_COLOR_VAR: &str = "FLOWSTEP_THEME_COLOR";
pub const EXPORT_DIR_VAR: &str = "FLOWSTEP_EXPORT_DIR";
pub const DEFAULT_EXPORT_DIR: &str = ".";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid theme color {value:?} (expected #rgb or #rrggbb)")]
    InvalidThemeColor {
        value: String,
        #[source]
        source: ColorError,
    },
}

impl crate::error::ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidThemeColor { .. } => "E_CONFIG_THEME_COLOR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Folder to connect at startup.
    pub workspace: Option<PathBuf>,
    /// Accent color in canonical `#rrggbb` form.
    pub theme_color: String,
    /// Where viewer exports are written.
    pub export_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self { workspace: None, theme_color: DEFAULT_THEME_COLOR.to_string(), export_dir: PathBuf::from(DEFAULT_EXPORT_DIR) }
    }
}

impl Config {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `FLOWSTEP_WORKSPACE`: folder to connect
    /// - `FLOWSTEP_THEME_COLOR`: `#rgb` / `#rrggbb`, default `#6366f1`
    /// - `FLOWSTEP_EXPORT_DIR`: default `.`
    ///
    /// Blank values count as unset.
    ///
    /// # Errors
    ///
    /// `InvalidThemeColor` if the accent color does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_var)
    }

    /// Same as [`Config::from_env`] over an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// `InvalidThemeColor` if the accent color does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let theme_color = match lookup(THEME_COLOR_VAR) {
            Some(raw) => parse_theme(&raw)?,
            None => defaults.theme_color,
        };
        Ok(Self {
            workspace: lookup(WORKSPACE_VAR).map(PathBuf::from),
            theme_color,
            export_dir: lookup(EXPORT_DIR_VAR).map_or(defaults.export_dir, PathBuf::from),
        })
    }

    /// Apply command-line values on top of the environment.
    ///
    /// # Errors
    ///
    /// `InvalidThemeColor` if the override does not parse.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        theme_color: Option<&str>,
        export_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = workspace {
            self.workspace = Some(path);
        }
        if let Some(raw) = theme_color {
            self.theme_color = parse_theme(raw)?;
        }
        if let Some(dir) = export_dir {
            self.export_dir = dir;
        }
        Ok(self)
    }
}

fn parse_theme(raw: &str) -> Result<String, ConfigError> {
    canonical_hex(raw).map_err(|source| ConfigError::InvalidThemeColor { value: raw.to_string(), source })
}

fn env_var(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}
