use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QuillConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub backup: BackupConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub similarity_threshold: f64,
    pub rebuild_max_entries: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackupConfig {
    pub dir: String,
    pub retain: usize,
}

impl Default for QuillConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
            backup: BackupConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            host: "127.0.0.1".into(),
            port: 7411,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_quill_dir()
            .join("journal.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_quill_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            similarity_threshold: 0.25,
            rebuild_max_entries: 10_000,
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        let dir = default_quill_dir()
            .join("backups")
            .to_string_lossy()
            .into_owned();
        Self { dir, retain: 10 }
    }
}

/// Returns `~/.quill/`
pub fn default_quill_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".quill")
}

/// Returns the default config file path: `~/.quill/config.toml`
pub fn default_config_path() -> PathBuf {
    default_quill_dir().join("config.toml")
}

impl QuillConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            QuillConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (QUILL_DB, QUILL_BACKUP_DIR, QUILL_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("QUILL_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("QUILL_BACKUP_DIR") {
            self.backup.dir = val;
        }
        if let Ok(val) = std::env::var("QUILL_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Resolve the backup directory, expanding `~` if needed.
    pub fn resolved_backup_dir(&self) -> PathBuf {
        expand_tilde(&self.backup.dir)
    }

    /// The vector index lives beside the journal file, never inside it, so
    /// backup/restore of the primary file never drags embedding state along.
    pub fn resolved_vector_path(&self) -> PathBuf {
        let db = self.resolved_db_path();
        db.with_extension("vectors.db")
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = QuillConfig::default();
        assert_eq!(config.server.transport, "stdio");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.search.default_limit, 10);
        assert_eq!(config.backup.retain, 10);
        assert!(config.storage.db_path.ends_with("journal.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[storage]
db_path = "/tmp/test.db"

[search]
default_limit = 25

[backup]
retain = 3
"#;
        let config: QuillConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.search.default_limit, 25);
        assert_eq!(config.backup.retain, 3);
        // defaults still apply for unset fields
        assert!((config.search.similarity_threshold - 0.25).abs() < 1e-9);
    }

    #[test]
    fn vector_path_sits_beside_journal() {
        let mut config = QuillConfig::default();
        config.storage.db_path = "/tmp/quill/journal.db".into();
        assert_eq!(
            config.resolved_vector_path(),
            PathBuf::from("/tmp/quill/journal.vectors.db")
        );
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = QuillConfig::default();
        std::env::set_var("QUILL_DB", "/tmp/override.db");
        std::env::set_var("QUILL_BACKUP_DIR", "/tmp/override-backups");
        std::env::set_var("QUILL_LOG_LEVEL", "trace");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.backup.dir, "/tmp/override-backups");
        assert_eq!(config.server.log_level, "trace");

        // Clean up
        std::env::remove_var("QUILL_DB");
        std::env::remove_var("QUILL_BACKUP_DIR");
        std::env::remove_var("QUILL_LOG_LEVEL");
    }
}
