use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemexConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub ingest: IngestConfig,
    pub thumbnails: ThumbnailConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
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
pub struct IngestConfig {
    /// Whether registering a source also runs its first scan immediately.
    pub scan_on_add: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ThumbnailConfig {
    pub dir: String,
    /// Longest edge of a generated preview, in pixels.
    pub max_dim: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for MemexConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            ingest: IngestConfig::default(),
            thumbnails: ThumbnailConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: path_under_memex_dir("index.db"),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { scan_on_add: true }
    }
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            dir: path_under_memex_dir("thumbnails"),
            max_dim: 256,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 500,
        }
    }
}

/// Returns `~/.memex/`
pub fn default_memex_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".memex")
}

/// Returns the default config file path: `~/.memex/config.toml`
pub fn default_config_path() -> PathBuf {
    default_memex_dir().join("config.toml")
}

fn path_under_memex_dir(name: &str) -> String {
    default_memex_dir().join(name).to_string_lossy().into_owned()
}

impl MemexConfig {
    /// Load the config from its default location. A missing file is not an
    /// error; the built-in defaults apply.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load a TOML config from `path`, then layer env var overrides on top.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("invalid config TOML in {}", path.display()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "config file absent, using defaults");
                MemexConfig::default()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()))
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    // Recognized overrides: MEMEX_DB, MEMEX_LOG_LEVEL.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MEMEX_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("MEMEX_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Database path with `~` expanded.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Thumbnail cache directory with `~` expanded.
    pub fn resolved_thumbnails_dir(&self) -> PathBuf {
        expand_tilde(&self.thumbnails.dir)
    }

    /// Clamp a requested page size to the configured bounds.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.search.default_limit)
            .min(self.search.max_limit)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .expect("home directory must exist")
            .join(rest),
        None => PathBuf::from(path),
    }
}
