use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Overrides the database location, mostly for scripts and tests.
pub const DB_ENV: &str = "TALLY_DB";

pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(DB_ENV).filter(|p| !p.is_empty()) {
            return Self::at(PathBuf::from(path));
        }

        let proj_dirs =
            ProjectDirs::from("", "", "tally").context("Could not determine home directory")?;
        Self::at(proj_dirs.data_dir().join("tally.db"))
    }

    /// Uses `db_path` as is, creating its parent directory if needed.
    pub fn at(db_path: PathBuf) -> Result<Self> {
        if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            ensure_dir(dir)?;
        }
        Ok(Config { db_path })
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create data directory: {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_creates_parent_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("tally.db");

        let config = Config::at(path.clone()).unwrap();

        assert_eq!(config.db_path, path);
        assert!(tmp.path().join("nested").is_dir());
    }

    #[test]
    fn test_at_accepts_bare_file_name() {
        let config = Config::at(PathBuf::from("tally.db")).unwrap();
        assert_eq!(config.db_path, PathBuf::from("tally.db"));
    }
}
