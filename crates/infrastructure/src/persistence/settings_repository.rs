//! Engine settings persistence.
//!
//! Stores settings in the platform-specific config directory:
//! - Linux: ~/.config/arbor/settings.json
//! - macOS: ~/Library/Application Support/arbor/settings.json
//! - Windows: %APPDATA%/arbor/settings.json

use std::path::{Path, PathBuf};

use arbor_domain::EngineSettings;
use tokio::fs;
use tracing::debug;

use crate::serialization::{SerializationError, from_json_bytes, to_json_stable_bytes};

/// Error type for settings operations.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Could not determine config directory.
    #[error("Could not determine config directory")]
    NoConfigDir,
}

/// Repository for engine settings.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    path: Option<PathBuf>,
}

impl Default for SettingsRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsRepository {
    /// Creates a repository backed by the platform config directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: Self::config_dir().map(|dir| dir.join("settings.json")),
        }
    }

    /// Creates a repository backed by an explicit file.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Returns the Arbor config directory, if the platform has one.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("arbor"))
    }

    /// Returns the path where settings are stored, if available.
    #[must_use]
    pub fn settings_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Loads settings from disk.
    ///
    /// Returns default settings if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(&self) -> Result<EngineSettings, SettingsError> {
        let Some(path) = &self.path else {
            return Ok(EngineSettings::default());
        };
        let content = match fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No settings file, using defaults");
                return Ok(EngineSettings::default());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(from_json_bytes(&content)?)
    }

    /// Saves settings to disk.
    ///
    /// # Errors
    /// Returns `NoConfigDir` when no location is known, or an IO error.
    pub async fn save(&self, settings: &EngineSettings) -> Result<(), SettingsError> {
        let Some(path) = &self.path else {
            return Err(SettingsError::NoConfigDir);
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        let content = to_json_stable_bytes(settings)?;
        fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn default_path_ends_with_settings_file() {
        if let Some(path) = SettingsRepository::new().settings_path() {
            assert!(path.ends_with("arbor/settings.json"));
        }
    }

    #[tokio::test]
    async fn load_returns_default_when_no_file() {
        let dir = TempDir::new().unwrap();
        let repo = SettingsRepository::at(dir.path().join("settings.json"));
        assert_eq!(repo.load().await.unwrap(), EngineSettings::default());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let repo = SettingsRepository::at(dir.path().join("nested").join("settings.json"));
        let settings = EngineSettings {
            rollback_partial_migrations: true,
            max_batch_size: 8,
            ..EngineSettings::default()
        };

        repo.save(&settings).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), settings);
    }

    #[tokio::test]
    async fn invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ nope").unwrap();
        let err = SettingsRepository::at(path).load().await.unwrap_err();
        assert!(matches!(err, SettingsError::Serialization(_)));
    }
}
