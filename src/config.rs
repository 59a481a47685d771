//! Application configuration.
//!
//! Load order: `<config dir>/config.toml` → environment variables → defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "proji.db";

/// Top-level proji configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjiConfig {
    pub storage: StorageConfig,
    pub import: ImportConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Location of the SQLite database. Defaults to the platform data directory.
    pub database_path: Option<PathBuf>,
}

/// Directory import configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Glob patterns always excluded from directory imports.
    pub exclude: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            exclude: vec![".git".to_string()],
        }
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "proji")
        .ok_or_else(|| Error::Internal("could not determine the home directory".into()))
}

impl ProjiConfig {
    /// Load config from the platform config directory.
    pub fn load_default() -> Result<Self> {
        Self::load(project_dirs()?.config_dir())
    }

    /// Load config from `config.toml` in `config_dir`, with env var overrides.
    /// Falls back to defaults if no config file exists.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| Error::io(&config_path, e))?;
            toml::from_str(&content).map_err(|source| Error::Parse {
                path: config_path.clone(),
                source,
            })?
        } else {
            Self::default()
        };

        if let Ok(path) = std::env::var("PROJI_DATABASE_PATH") {
            if !path.is_empty() {
                config.storage.database_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(patterns) = std::env::var("PROJI_EXCLUDE") {
            config.import.exclude.extend(
                patterns
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string),
            );
        }

        Ok(config)
    }

    /// The configured database path, or the platform default.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join(DATABASE_FILE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProjiConfig::default();
        assert!(config.storage.database_path.is_none());
        assert_eq!(config.import.exclude, vec![".git"]);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[storage]
database_path = "/tmp/proji-test.db"

[import]
exclude = ["target", "node_modules"]
"#;
        let config: ProjiConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.storage.database_path,
            Some(PathBuf::from("/tmp/proji-test.db"))
        );
        assert_eq!(config.import.exclude, vec!["target", "node_modules"]);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: ProjiConfig = toml::from_str("[storage]\n").unwrap();
        assert_eq!(config.import.exclude, vec![".git"]);
    }

    #[test]
    fn test_load_reads_config_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            "[import]\nexclude = [\"build\"]\n",
        )
        .unwrap();

        let config = ProjiConfig::load(tmp.path()).unwrap();
        assert!(config.import.exclude.contains(&"build".to_string()));
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("config.toml"), "[import\n").unwrap();

        assert!(matches!(
            ProjiConfig::load(tmp.path()),
            Err(Error::Parse { .. })
        ));
    }
}
