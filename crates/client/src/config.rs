//! Client configuration.
//!
//! Reads/writes TOML at `~/.config/tusbridge/client.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tusbridge_transfer::{DEFAULT_CHUNK_SIZE, default_pool_size};

use crate::ClientError;

/// Coordinator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Chunk size for uploads that do not request their own.
    #[serde(default = "default_chunk_size")]
    pub default_chunk_size: usize,
    /// Maximum number of uploads transferring at once.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_chunk_size: DEFAULT_CHUNK_SIZE,
            pool_size: default_pool_size(),
        }
    }
}

impl ClientConfig {
    /// Loads from the default location, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self, ClientError> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ClientError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| ClientError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ClientError> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ClientError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ClientError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        set_permissions_0600(path);
        tracing::debug!(path = %path.display(), "client configuration saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.default_chunk_size == 0 {
            return Err(ClientError::Config("default_chunk_size must be positive".into()));
        }
        if self.pool_size == 0 {
            return Err(ClientError::Config("pool_size must be positive".into()));
        }
        Ok(())
    }
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

/// Default location of the configuration file.
pub fn config_path() -> PathBuf {
    config_base_dir().join("tusbridge").join("client.toml")
}

fn config_base_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata)
    }

    #[cfg(not(target_os = "windows"))]
    {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            if !xdg.is_empty() {
                return PathBuf::from(xdg);
            }
        }
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".config")
    }
}
