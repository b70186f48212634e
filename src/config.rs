//! Config module - Manages lifelog-export configuration (lifelog.toml).
//!
//! Configuration file contains:
//! - API key and API settings
//! - Default timezone for list/export requests
//! - Export defaults (directory, format, layout, page size)
//!
//! Command-line flags take precedence over the file; the file only fills in
//! what the flags leave unset.

use crate::client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::error::LifelogError;
use crate::export::{ExportFormat, ExportLayout, DEFAULT_PAGE_SIZE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted for the API key.
pub const API_KEY_ENV: &str = "LIFELOG_API_KEY";

/// API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API root (default: the production Limitless endpoint)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    /// Request timeout; `0` means unset and falls back to the default.
    pub fn timeout(&self) -> Duration {
        match self.timeout_secs {
            0 => DEFAULT_TIMEOUT,
            secs => Duration::from_secs(secs),
        }
    }
}

/// Export defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Output directory (no default; must be configured or passed)
    #[serde(default)]
    pub dir: Option<PathBuf>,

    #[serde(default)]
    pub format: ExportFormat,

    #[serde(default)]
    pub layout: ExportLayout,

    /// Records per page during `export --all`
    #[serde(default = "default_page_size")]
    pub page_size: i32,
}

fn default_page_size() -> i32 {
    DEFAULT_PAGE_SIZE
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: None,
            format: ExportFormat::default(),
            layout: ExportLayout::default(),
            page_size: default_page_size(),
        }
    }
}

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API key (the LIFELOG_API_KEY environment variable takes precedence)
    #[serde(default)]
    pub api_key: Option<String>,

    /// IANA timezone name sent with list requests
    #[serde(default)]
    pub timezone: Option<String>,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

/// Get default config directory (~/.config/lifelog/).
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("lifelog"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get default config file path.
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("lifelog.toml")
}

impl Config {
    /// Load config from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Cannot parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from `path`, or defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).with_context(|| "Cannot serialize config to TOML")?;

        std::fs::write(path, content)
            .with_context(|| format!("Cannot write config file: {}", path.display()))?;

        // The file holds an API key
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Pick the API key: environment value first, then the file.
    pub fn resolve_api_key(&self, from_env: Option<&str>) -> Result<String, LifelogError> {
        from_env
            .or(self.api_key.as_deref())
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                LifelogError::Configuration(format!(
                    "API key missing. Set {} or api_key in the config file",
                    API_KEY_ENV
                ))
            })
    }

    /// Pick the export directory: flag first, then the file.
    pub fn resolve_export_dir(&self, flag: Option<&Path>) -> Result<PathBuf, LifelogError> {
        flag.or(self.export.dir.as_deref())
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                LifelogError::Configuration(
                    "Output directory missing. Pass --dir or set export.dir in the config file"
                        .to_string(),
                )
            })
    }

    /// Pick the timezone: flag first, then the file.
    pub fn resolve_timezone(&self, flag: Option<&str>) -> Option<String> {
        flag.or(self.timezone.as_deref())
            .filter(|tz| !tz.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.timeout(), Duration::from_secs(10));
        assert_eq!(config.export.page_size, 50);
        assert_eq!(config.export.format, ExportFormat::Json);
        assert!(config.export.dir.is_none());
    }

    #[test]
    fn test_zero_timeout_falls_back_to_default() {
        let config: Config = toml::from_str("[api]\ntimeout_secs = 0\n").unwrap();
        assert_eq!(config.api.timeout(), DEFAULT_TIMEOUT);

        let config: Config = toml::from_str("[api]\ntimeout_secs = 30\n").unwrap();
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            api_key = "secret"

            [export]
            dir = "/data/lifelogs"
            format = "markdown"
            layout = "dated"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.export.format, ExportFormat::Markdown);
        assert_eq!(config.export.layout, ExportLayout::Dated);
        assert_eq!(config.export.page_size, 50);
        assert_eq!(config.api.timeout_secs, 10);
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nested").join("lifelog.toml");

        let mut config = Config::default();
        config.api_key = Some("secret".to_string());
        config.timezone = Some("Europe/Berlin".to_string());
        config.save(&config_path)?;

        let loaded = Config::load(&config_path)?;
        assert_eq!(loaded.api_key.as_deref(), Some("secret"));
        assert_eq!(loaded.timezone.as_deref(), Some("Europe/Berlin"));

        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_save_permissions() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("perms.toml");

        Config::default().save(&config_path)?;

        let mode = std::fs::metadata(&config_path)?.permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        Ok(())
    }

    #[test]
    fn test_load_or_default_missing_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config = Config::load_or_default(&temp_dir.path().join("absent.toml"))?;
        assert!(config.api_key.is_none());
        Ok(())
    }

    #[test]
    fn test_missing_api_key_is_configuration_error() {
        let config = Config::default();
        assert!(matches!(
            config.resolve_api_key(None),
            Err(LifelogError::Configuration(_))
        ));
        assert!(matches!(
            config.resolve_api_key(Some("  ")),
            Err(LifelogError::Configuration(_))
        ));
    }

    #[test]
    fn test_env_key_wins_over_file() {
        let config = Config {
            api_key: Some("from-file".to_string()),
            ..Config::default()
        };
        assert_eq!(config.resolve_api_key(Some("from-env")).unwrap(), "from-env");
        assert_eq!(config.resolve_api_key(None).unwrap(), "from-file");
    }

    #[test]
    fn test_export_dir_resolution() {
        let mut config = Config::default();
        assert!(matches!(
            config.resolve_export_dir(None),
            Err(LifelogError::Configuration(_))
        ));

        config.export.dir = Some(PathBuf::from("/from/config"));
        assert_eq!(
            config.resolve_export_dir(None).unwrap(),
            PathBuf::from("/from/config")
        );
        assert_eq!(
            config
                .resolve_export_dir(Some(Path::new("/from/flag")))
                .unwrap(),
            PathBuf::from("/from/flag")
        );
    }
}
