//! User settings persistence.
//!
//! Remembers the choices of the last run (ratio, export mode, border and
//! output directory) so the next batch starts where the previous one
//! left off.

use crate::error::Result;
use crate::geometry::{AspectRatioMode, BorderSpec};
use crate::image_processing::ExportMode;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the platform directories for this application.
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "cropfit", "cropfit")
}

/// User-configurable settings persisted between sessions.
///
/// Settings are stored as JSON in the user's config directory
/// (e.g., `~/.config/cropfit/settings.json` on Linux).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Target ratio for crop or pad exports.
    #[serde(default)]
    pub ratio_mode: AspectRatioMode,
    /// Crop to a box or pad onto a canvas.
    #[serde(default)]
    pub export_mode: ExportMode,
    /// Border percentage for pad mode.
    #[serde(default)]
    pub border: BorderSpec,
    /// Last chosen output directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Settings {
    /// Returns the path to the settings file.
    ///
    /// Creates the config directory if it doesn't exist.
    fn config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| {
            let config_dir = dirs.config_dir();
            if !config_dir.exists() {
                let _ = fs::create_dir_all(config_dir);
            }
            config_dir.join("settings.json")
        })
    }

    /// Loads settings from disk, falling back to defaults if not found.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Loads settings from a specific file; unreadable or invalid files
    /// yield defaults.
    pub fn load_from(path: &Path) -> Self {
        let loaded = fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str::<Self>(&content).ok());
        match loaded {
            Some(settings) if settings.border.validate().is_ok() => settings,
            Some(_) => {
                tracing::warn!(path = %path.display(), "ignoring settings with invalid border");
                Self::default()
            }
            None => Self::default(),
        }
    }

    /// Persists settings to disk.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save(&self) -> Result<()> {
        if let Some(path) = Self::config_path() {
            self.save_to(&path)?;
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ratio_mode: AspectRatioMode::default(),
            export_mode: ExportMode::Crop,
            border: BorderSpec::default(),
            output_dir: None,
        }
    }
}
