use std::path::PathBuf;

use crate::{error::Error, settings::Settings};

/// Loads [`Settings`] from a JSON file.
#[derive(Debug, Clone)]
pub struct SettingsService {
    path: PathBuf,
}

impl SettingsService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses the settings file in the application configuration directory.
    pub fn from_default_location() -> Result<Self, Error> {
        Ok(Self::new(file_system::get_settings_path()?))
    }

    /// Reads the settings file. A missing file yields the defaults.
    pub async fn load_settings(&self) -> Result<Settings, Error> {
        if !async_std::path::Path::new(&self.path).exists().await {
            tracing::debug!(
                "No settings file at {}, using defaults",
                self.path.display()
            );
            return Ok(Settings::default());
        }

        let contents = async_std::fs::read_to_string(&self.path).await?;
        let settings = serde_json::from_str(&contents).map_err(|e| {
            Error::SettingsError(format!("{}: {}", self.path.display(), e))
        })?;
        tracing::info!("Loaded settings from {}", self.path.display());
        Ok(settings)
    }
}
