//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: SEEKPAGE_, e.g. `SEEKPAGE_MAX_LIMIT=50`)
//! 2. Current working directory: ./seekpage.toml
//! 3. XDG config directory: ~/.config/seekpage/{name}/config.toml
//! 4. System directory: /etc/seekpage/{name}/config.toml
//! 5. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cursor::CursorCodec;
use crate::error::{PaginationError, Result};

const ENV_PREFIX: &str = "SEEKPAGE_";
const XDG_PREFIX: &str = "seekpage";

/// How page results obtain a total count
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountMode {
    /// Ask the storage collaborator on every request
    Exact,
    /// Serve a periodically refreshed snapshot, reported as approximate
    Cached,
    /// Never report totals
    #[default]
    Omitted,
}

impl fmt::Display for CountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Cached => write!(f, "cached"),
            Self::Omitted => write!(f, "omitted"),
        }
    }
}

/// Secret keying cursor authentication tags; never printed
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CursorSecret(String);

impl CursorSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CursorSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CursorSecret(***)")
    }
}

/// Pagination engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagerConfig {
    /// Name used for config file lookup and log records
    #[serde(default = "default_name")]
    pub name: String,

    /// Log filter directive for [`init_tracing`](crate::observability::init_tracing)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Largest page size a request may ask for
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,

    /// Page size used when a request gives none
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    /// Largest number of rows an offset request may skip
    #[serde(default = "default_max_skip_depth")]
    pub max_skip_depth: u64,

    /// Total-count strategy
    #[serde(default)]
    pub count_mode: CountMode,

    /// Seconds between cached count refreshes
    #[serde(default = "default_cache_refresh_interval_secs")]
    pub cache_refresh_interval_secs: u64,

    /// Fetch budget when a request carries no deadline
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// How long a page may wait on its total count, measured from the start
    /// of the request and capped by the request deadline
    #[serde(default = "default_count_timeout_ms")]
    pub count_timeout_ms: u64,

    /// Secret for cursor authentication tags; unset means unkeyed tags
    #[serde(default)]
    pub cursor_secret: Option<CursorSecret>,
}

fn default_name() -> String {
    "seekpage".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_limit() -> u32 {
    100
}

fn default_limit() -> u32 {
    20
}

fn default_max_skip_depth() -> u64 {
    10_000
}

fn default_cache_refresh_interval_secs() -> u64 {
    60
}

fn default_query_timeout_ms() -> u64 {
    5_000
}

fn default_count_timeout_ms() -> u64 {
    250
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            max_limit: default_max_limit(),
            default_limit: default_limit(),
            max_skip_depth: default_max_skip_depth(),
            count_mode: CountMode::default(),
            cache_refresh_interval_secs: default_cache_refresh_interval_secs(),
            query_timeout_ms: default_query_timeout_ms(),
            count_timeout_ms: default_count_timeout_ms(),
            cursor_secret: None,
        }
    }
}

impl PagerConfig {
    /// Load configuration from all sources
    ///
    /// Searches for config files in this order (first found wins):
    /// 1. Current working directory: ./seekpage.toml
    /// 2. XDG config directory: ~/.config/seekpage/{name}/config.toml
    /// 3. System directory: /etc/seekpage/{name}/config.toml
    ///
    /// Environment variables (SEEKPAGE_ prefix) override all file-based configs.
    pub fn load() -> Result<Self> {
        let name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(default_name);

        Self::load_for_service(&name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Self {
            name: name.to_string(),
            ..Self::default()
        }));

        // Lowest priority first so later merges override.
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Load configuration from a specific file, then environment overrides
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX));

        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn find_config_paths(name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("seekpage.toml")];

        let service_file = Path::new(name).join("config.toml");

        let xdg_dirs = xdg::BaseDirectories::with_prefix(XDG_PREFIX);
        if let Some(path) = xdg_dirs.find_config_file(&service_file) {
            paths.push(path);
        }

        paths.push(Path::new("/etc/seekpage").join(service_file));
        paths
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    ///
    /// [`PaginationError::Config`] when `max_limit` is zero, `default_limit`
    /// is outside `[1, max_limit]`, or cached counting has a zero refresh
    /// interval.
    pub fn validate(&self) -> Result<()> {
        if self.max_limit == 0 {
            return Err(invalid("max_limit must be at least 1"));
        }
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(invalid(format!(
                "default_limit {} must be between 1 and max_limit {}",
                self.default_limit, self.max_limit
            )));
        }
        if self.count_mode == CountMode::Cached && self.cache_refresh_interval_secs == 0 {
            return Err(invalid(
                "cache_refresh_interval_secs must be positive when count_mode is cached",
            ));
        }
        Ok(())
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn count_timeout(&self) -> Duration {
        Duration::from_millis(self.count_timeout_ms)
    }

    pub fn cache_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.cache_refresh_interval_secs)
    }

    /// Cursor codec keyed with `cursor_secret` when one is set
    pub fn cursor_codec(&self) -> CursorCodec {
        match &self.cursor_secret {
            Some(secret) => CursorCodec::with_secret(secret.expose()),
            None => CursorCodec::new(),
        }
    }
}

fn invalid(message: impl Into<String>) -> PaginationError {
    PaginationError::config(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = PagerConfig::default();
        assert_eq!(config.max_limit, 100);
        assert_eq!(config.default_limit, 20);
        assert_eq!(config.max_skip_depth, 10_000);
        assert_eq!(config.count_mode, CountMode::Omitted);
        assert_eq!(config.query_timeout(), Duration::from_secs(5));
        assert_eq!(config.cache_refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.count_timeout(), Duration::from_millis(250));
        assert!(config.validate().is_ok());
        assert!(!config.cursor_codec().is_keyed());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
max_limit = 50
default_limit = 10
count_mode = "cached"
cache_refresh_interval_secs = 5
cursor_secret = "s3cret"
"#
        )
        .unwrap();

        let config = PagerConfig::load_from(file.path()).unwrap();
        assert_eq!(config.max_limit, 50);
        assert_eq!(config.default_limit, 10);
        assert_eq!(config.count_mode, CountMode::Cached);
        assert_eq!(config.cache_refresh_interval(), Duration::from_secs(5));
        assert_eq!(config.max_skip_depth, 10_000);
        assert!(config.cursor_codec().is_keyed());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let config = PagerConfig::load_from(missing).unwrap();
        assert_eq!(config.max_limit, 100);
    }

    #[test]
    fn test_load_rejects_invalid_limits() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_limit = 10\ndefault_limit = 20").unwrap();
        let err = PagerConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, PaginationError::Config(_)));
    }

    #[test]
    fn test_validate() {
        let zero_max = PagerConfig {
            max_limit: 0,
            ..PagerConfig::default()
        };
        assert!(zero_max.validate().is_err());

        let zero_default = PagerConfig {
            default_limit: 0,
            ..PagerConfig::default()
        };
        assert!(zero_default.validate().is_err());

        let cached_without_interval = PagerConfig {
            count_mode: CountMode::Cached,
            cache_refresh_interval_secs: 0,
            ..PagerConfig::default()
        };
        assert!(cached_without_interval.validate().is_err());

        let omitted_without_interval = PagerConfig {
            cache_refresh_interval_secs: 0,
            ..PagerConfig::default()
        };
        assert!(omitted_without_interval.validate().is_ok());
    }

    #[test]
    fn test_secret_is_redacted() {
        let config = PagerConfig {
            cursor_secret: Some(CursorSecret::new("hunter2")),
            ..PagerConfig::default()
        };
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
