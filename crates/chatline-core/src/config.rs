use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::client::DEFAULT_BASE_URL;
use crate::controller::{DisplayMode, DraftClearPolicy};

/// Environment variable that overrides the configured backend URL
pub const BACKEND_URL_ENV: &str = "CHATLINE_BACKEND_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub base_url: Option<String>,
    pub draft_clear: DraftClearPolicy,
    pub display: DisplayMode,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Backend URL to use: explicit flag, then `CHATLINE_BACKEND_URL`, then
    /// the config file, then the built-in default.
    pub fn resolve_base_url(&self, flag: Option<&str>) -> String {
        self.resolve_base_url_with(flag, std::env::var(BACKEND_URL_ENV).ok())
    }

    fn resolve_base_url_with(&self, flag: Option<&str>, env: Option<String>) -> String {
        flag.map(str::to_string)
            .or(env)
            .or_else(|| self.base_url.clone())
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("chatline").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.draft_clear, DraftClearPolicy::OnSuccess);
        assert_eq!(config.display, DisplayMode::History);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            base_url: Some("http://127.0.0.1:5000".to_string()),
            draft_clear: DraftClearPolicy::OnAttempt,
            display: DisplayMode::SingleReply,
        };

        config.save_to(&path).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"on-attempt\""));
        assert!(raw.contains("\"single-reply\""));
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"base_url":"http://example.test"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://example.test"));
        assert_eq!(config.draft_clear, DraftClearPolicy::OnSuccess);
    }

    #[test]
    fn test_garbage_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_base_url_precedence() {
        let config = Config {
            base_url: Some("http://from-file".to_string()),
            ..Config::default()
        };
        let env = || Some("http://from-env".to_string());

        assert_eq!(config.resolve_base_url_with(Some("http://from-flag"), env()), "http://from-flag");
        assert_eq!(config.resolve_base_url_with(None, env()), "http://from-env");
        assert_eq!(config.resolve_base_url_with(None, None), "http://from-file");
        assert_eq!(Config::new().resolve_base_url_with(None, None), DEFAULT_BASE_URL);
        assert_eq!(Config::new().resolve_base_url_with(None, Some("  ".to_string())), DEFAULT_BASE_URL);
    }
}
