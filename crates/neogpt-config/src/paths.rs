//! Application paths management.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Manages all application paths following platform conventions.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
    pub database_file: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    /// Create paths using platform-specific directories.
    pub fn new() -> Option<Self> {
        let proj_dirs = ProjectDirs::from("com", "neogpt", "neogpt")?;

        let config_dir = proj_dirs.config_dir().to_path_buf();
        let data_dir = proj_dirs.data_dir().to_path_buf();

        Some(Self::with_dirs(config_dir, data_dir))
    }

    /// Paths rooted at explicit directories.
    pub fn with_dirs(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            config_file: config_dir.join("config.toml"),
            log_dir: data_dir.join("logs"),
            database_file: data_dir.join("neogpt.db"),
            config_dir,
            data_dir,
        }
    }

    /// Same config location, data rooted somewhere else (`general.data_dir`).
    pub fn relocate_data(&self, data_dir: &Path) -> Self {
        Self::with_dirs(self.config_dir.clone(), data_dir.to_path_buf())
    }

    /// Create all necessary directories.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }

    /// Check if neogpt has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists() && self.database_file.exists()
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("neogpt.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_paths_creation() {
        let paths = AppPaths::new();
        assert!(paths.is_some());

        let paths = paths.unwrap();
        assert!(paths.config_file.to_string_lossy().contains("config.toml"));
        assert!(paths.database_file.to_string_lossy().contains("neogpt.db"));
    }

    #[test]
    fn test_relocate_data() {
        let temp = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_dirs(temp.path().join("cfg"), temp.path().join("data"));
        let moved = paths.relocate_data(&temp.path().join("elsewhere"));

        assert_eq!(moved.config_file, paths.config_file);
        assert_eq!(moved.database_file, temp.path().join("elsewhere").join("neogpt.db"));
        assert_eq!(moved.log_file(), temp.path().join("elsewhere/logs/neogpt.log"));

        moved.ensure_dirs().unwrap();
        assert!(moved.log_dir.is_dir());
        assert!(!moved.is_initialized());
    }
}
