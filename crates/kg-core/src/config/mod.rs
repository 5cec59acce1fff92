//! Configuration management for the kernel gateway client

mod gateway;
pub mod serde_utils;

pub use gateway::{GatewayConfig, DEFAULT_API_URL, DEFAULT_KERNEL_NAME, DEFAULT_WS_URL};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kernel-gateway")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    tracing::debug!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Save configuration to a file
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config::<GatewayConfig>(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = GatewayConfig {
            api_url: "http://gateway.internal:8888".to_string(),
            ws_url: "ws://gateway.internal:8888".to_string(),
            kernel_id: Some("k-42".to_string()),
            request_timeout: Some(Duration::from_secs(15)),
            ..GatewayConfig::default()
        };
        save_config(&path, &config).unwrap();

        let loaded: GatewayConfig = load_config(&path).unwrap();
        assert_eq!(loaded.api_url, config.api_url);
        assert_eq!(loaded.kernel_id.as_deref(), Some("k-42"));
        assert_eq!(loaded.request_timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "kernel_name = \"ir\"\n").unwrap();

        let loaded: GatewayConfig = load_config(&path).unwrap();
        assert_eq!(loaded.kernel_name, "ir");
        assert_eq!(loaded.api_url, DEFAULT_API_URL);
        assert_eq!(loaded.inbound_capacity, 256);
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_url = [").unwrap();

        let result = load_config::<GatewayConfig>(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
