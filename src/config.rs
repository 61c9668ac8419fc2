//! Configuration management for wxmcp.
//!
//! Configuration is loaded from `~/.config/wxmcp/config.toml`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// How to launch the weather service.
    #[serde(default)]
    pub server: ServerConfig,
    /// Client shell behaviour.
    #[serde(default)]
    pub client: ClientConfig,
}

/// Command line used to spawn the weather service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Program to run. Defaults to the running wxmcp executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<PathBuf>,
    /// Arguments passed to the program.
    #[serde(default = "default_server_args")]
    pub args: Vec<String>,
    /// Run the service on an in-process task instead of a child process.
    #[serde(default)]
    pub embedded: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: default_server_args(),
            embedded: false,
        }
    }
}

fn default_server_args() -> Vec<String> {
    vec!["serve".to_string()]
}

impl ServerConfig {
    /// The program to spawn, falling back to the current executable.
    pub fn program(&self) -> std::io::Result<PathBuf> {
        match &self.command {
            Some(command) => Ok(command.clone()),
            None => std::env::current_exe(),
        }
    }
}

/// Client shell preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// How long a freshly spawned service has to answer its first ping.
    #[serde(default = "default_start_timeout_ms")]
    pub start_timeout_ms: u64,
    /// How long to wait for the service to exit before killing it.
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
    /// Start the service as soon as the interactive shell opens.
    #[serde(default)]
    pub auto_start: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            start_timeout_ms: default_start_timeout_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
            auto_start: false,
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_start_timeout_ms() -> u64 {
    3_000
}

fn default_stop_timeout_ms() -> u64 {
    2_000
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl Config {
    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("wxmcp"))
            .context("Could not determine config directory")
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location, using defaults if not found.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, using defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.server.command.is_none());
        assert_eq!(config.server.args, vec!["serve"]);
        assert_eq!(config.client.request_timeout(), Duration::from_secs(5));
        assert!(!config.client.auto_start);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[client]"));
        assert!(toml.contains("request_timeout_ms = 5000"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
[server]
command = "/usr/local/bin/wxmcp"

[client]
auto_start = true
request_timeout_ms = 250
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.server.command.as_deref(),
            Some(Path::new("/usr/local/bin/wxmcp"))
        );
        assert_eq!(config.server.args, vec!["serve"]);
        assert!(config.client.auto_start);
        assert_eq!(config.client.request_timeout(), Duration::from_millis(250));
        assert_eq!(config.client.start_timeout_ms, 3_000);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.client.stop_timeout_ms, 2_000);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.client.auto_start = true;
        config.server.args = vec!["serve".to_string(), "--quiet".to_string()];
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!(loaded.client.auto_start);
        assert_eq!(loaded.server.args, vec!["serve", "--quiet"]);
    }

    #[test]
    fn test_program_falls_back_to_current_exe() {
        let server = ServerConfig::default();
        assert_eq!(server.program().unwrap(), std::env::current_exe().unwrap());
    }
}
