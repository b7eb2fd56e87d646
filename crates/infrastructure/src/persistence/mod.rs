//! File-backed persistence for local UI state and settings.

mod activity_bar_repository;
mod file_system;
mod settings_repository;
mod tree_state_repository;

pub use activity_bar_repository::{ACTIVITY_BAR_FILE, FileActivityBarRepository};
pub use file_system::TokioFileSystem;
pub use settings_repository::{SettingsError, SettingsRepository};
pub use tree_state_repository::{FileTreeItemStateRepository, TREE_STATE_FILE};
