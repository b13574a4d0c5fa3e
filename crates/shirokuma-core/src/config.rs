//! Environment-driven configuration.
//!
//! The database location resolves in order: `SHIROKUMA_DATABASE_URL`
//! (`file:<path>`), then `SHIROKUMA_DATA_DIR`, then the platform data
//! directory. `SHIROKUMA_EXPORT_DIR` enables the Markdown file mirror.

use std::path::PathBuf;

use crate::error::{Result, ServiceError};

/// `file:<path>` URL locating the embedded database
pub const ENV_DATABASE_URL: &str = "SHIROKUMA_DATABASE_URL";
/// Base directory for data when the database URL is unset
pub const ENV_DATA_DIR: &str = "SHIROKUMA_DATA_DIR";
/// Enables the Markdown file mirror when set
pub const ENV_EXPORT_DIR: &str = "SHIROKUMA_EXPORT_DIR";
/// Set to `0` or `false` to skip automatic migrations at open
pub const ENV_AUTO_MIGRATE: &str = "SHIROKUMA_AUTO_MIGRATE";

const DB_FILE_NAME: &str = "shirokuma.db";

/// Resolved configuration for opening a [`crate::Store`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the SQLite database file
    pub database_path: PathBuf,
    /// Export root for the Markdown mirror; `None` disables mirroring
    pub export_dir: Option<PathBuf>,
    /// Apply pending schema migrations at open (default true)
    pub auto_migrate: bool,
}

impl Config {
    /// Resolve configuration from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_path: database_path_from_env()?,
            export_dir: export_dir_from_env(),
            auto_migrate: auto_migrate_from_env(),
        })
    }

    /// Configuration rooted at an explicit data directory (e.g. `--data-dir`).
    /// The export dir still comes from the environment.
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            database_path: dir.join(DB_FILE_NAME),
            export_dir: export_dir_from_env(),
            auto_migrate: auto_migrate_from_env(),
        })
    }

    /// Configuration for a known database path with mirroring disabled.
    /// Used by tests and embedders that manage their own layout.
    pub fn at(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            export_dir: None,
            auto_migrate: true,
        }
    }
}

fn auto_migrate_from_env() -> bool {
    !matches!(
        std::env::var(ENV_AUTO_MIGRATE).as_deref(),
        Ok("0") | Ok("false") | Ok("no")
    )
}

fn export_dir_from_env() -> Option<PathBuf> {
    match std::env::var(ENV_EXPORT_DIR) {
        Ok(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => None,
    }
}

fn database_path_from_env() -> Result<PathBuf> {
    if let Ok(url) = std::env::var(ENV_DATABASE_URL) {
        if !url.is_empty() {
            let path = url.strip_prefix("file:").unwrap_or(&url);
            if path.is_empty() {
                return Err(ServiceError::InvalidInput(format!(
                    "{ENV_DATABASE_URL} must be file:<path>, got '{url}'"
                )));
            }
            return Ok(PathBuf::from(path));
        }
    }

    if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
        if !dir.is_empty() {
            let dir = PathBuf::from(dir);
            std::fs::create_dir_all(&dir)?;
            return Ok(dir.join(DB_FILE_NAME));
        }
    }

    let proj_dirs = directories::ProjectDirs::from("io", "shirokuma", "knowledge-base")
        .ok_or_else(|| {
            ServiceError::Internal("Could not determine project directories".to_string())
        })?;
    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;
    // Restrict directory permissions to owner-only on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        let _ = std::fs::set_permissions(data_dir, perms);
    }
    Ok(data_dir.join(DB_FILE_NAME))
}
