//! Engine Settings Domain Model
//!
//! Tunables for the drag-and-drop engine and its logging.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings for the drop engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// `tracing` filter directive used when `ARBOR_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Re-stream the affected paths after every drop.
    #[serde(default = "default_refresh_after_drop")]
    pub refresh_after_drop: bool,

    /// Undo destination creates when a migration fails part-way.
    #[serde(default)]
    pub rollback_partial_migrations: bool,

    /// Largest batch update sent in one call.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Directory holding persisted UI state. Falls back to the config dir.
    #[serde(default)]
    pub workspace_dir: Option<PathBuf>,
}

fn default_log_filter() -> String {
    "info".to_string()
}

const fn default_refresh_after_drop() -> bool {
    true
}

const fn default_max_batch_size() -> usize {
    256
}

impl EngineSettings {
    /// Batch size with a floor of one.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.max_batch_size.max(1)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            refresh_after_drop: default_refresh_after_drop(),
            rollback_partial_migrations: false,
            max_batch_size: default_max_batch_size(),
            workspace_dir: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_settings() {
        let settings = EngineSettings::default();
        assert_eq!(settings.log_filter, "info");
        assert!(settings.refresh_after_drop);
        assert!(!settings.rollback_partial_migrations);
        assert_eq!(settings.max_batch_size, 256);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let settings: EngineSettings =
            serde_json::from_str(r#"{"rollback_partial_migrations": true}"#).unwrap();
        assert!(settings.rollback_partial_migrations);
        assert!(settings.refresh_after_drop);
        assert_eq!(settings.max_batch_size, 256);
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let settings = EngineSettings {
            max_batch_size: 0,
            ..EngineSettings::default()
        };
        assert_eq!(settings.batch_size(), 1);
    }
}
