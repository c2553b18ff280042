use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::dose::LowStockPolicy;
use crate::scheduling::PastSlotPolicy;

/// Application-level constants
pub const APP_NAME: &str = "HealthBell";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Database file name inside the data directory.
pub const DB_FILE_NAME: &str = "healthbell.db";

/// Remaining-count value at or below which a medicine counts as low on stock.
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 5;

/// Sessions expire after 24 hours.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_GNEWS_BASE_URL: &str = "https://gnews.io/api/v4";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot determine home directory")]
    NoHomeDir,

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "healthbell_lib=info,tower_http=warn"
}

/// Get the application data directory
/// ~/HealthBell/ unless overridden by `HEALTHBELL_DATA_DIR`.
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(APP_NAME))
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub news: NewsApiConfig,
    pub gemini: GeminiConfig,
    pub low_stock_threshold: u32,
    pub low_stock_policy: LowStockPolicy,
    pub past_slots: PastSlotPolicy,
    pub session_ttl_secs: u64,
}

#[derive(Debug, Clone)]
pub struct NewsApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = match non_empty("HEALTHBELL_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => app_data_dir()?,
        };

        let bind_raw = non_empty("HEALTHBELL_BIND").unwrap_or_else(|| DEFAULT_BIND.into());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::InvalidValue {
            var: "HEALTHBELL_BIND",
            value: bind_raw.clone(),
        })?;

        let low_stock_threshold = match non_empty("HEALTHBELL_LOW_STOCK_THRESHOLD") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "HEALTHBELL_LOW_STOCK_THRESHOLD",
                value: raw.clone(),
            })?,
            None => DEFAULT_LOW_STOCK_THRESHOLD,
        };

        let low_stock_policy = match non_empty("HEALTHBELL_LOW_STOCK_POLICY") {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "level" => LowStockPolicy::Level,
                "edge" => LowStockPolicy::Edge,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "HEALTHBELL_LOW_STOCK_POLICY",
                        value: raw,
                    })
                }
            },
            None => LowStockPolicy::Level,
        };

        let past_slots = match non_empty("HEALTHBELL_PAST_SLOTS") {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "show" => PastSlotPolicy::Show,
                "hide" => PastSlotPolicy::Hide,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "HEALTHBELL_PAST_SLOTS",
                        value: raw,
                    })
                }
            },
            None => PastSlotPolicy::Show,
        };

        let session_ttl_secs = match non_empty("HEALTHBELL_SESSION_TTL_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "HEALTHBELL_SESSION_TTL_SECS",
                value: raw.clone(),
            })?,
            None => DEFAULT_SESSION_TTL_SECS,
        };

        Ok(Self {
            data_dir,
            bind_addr,
            news: NewsApiConfig {
                base_url: non_empty("GNEWS_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GNEWS_BASE_URL.into()),
                api_key: non_empty("GNEWS_API_KEY"),
            },
            gemini: GeminiConfig {
                base_url: non_empty("GEMINI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.into()),
                model: non_empty("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
                api_key: non_empty("GEMINI_API_KEY"),
            },
            low_stock_threshold,
            low_stock_policy,
            past_slots,
            session_ttl_secs,
        })
    }

    /// Configuration rooted at an explicit data directory with defaults
    /// everywhere else. Used by tests and embedders.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            news: NewsApiConfig {
                base_url: DEFAULT_GNEWS_BASE_URL.into(),
                api_key: None,
            },
            gemini: GeminiConfig {
                base_url: DEFAULT_GEMINI_BASE_URL.into(),
                model: DEFAULT_GEMINI_MODEL.into(),
                api_key: None,
            },
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            low_stock_policy: LowStockPolicy::Level,
            past_slots: PastSlotPolicy::Show,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
        }
    }

    /// Path of the SQLite database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let config = AppConfig::from_lookup(lookup(&[("HEALTHBELL_DATA_DIR", "/tmp/hb")])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/hb"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.low_stock_threshold, 5);
        assert_eq!(config.low_stock_policy, LowStockPolicy::Level);
        assert_eq!(config.past_slots, PastSlotPolicy::Show);
        assert!(config.news.api_key.is_none());
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
    }

    #[test]
    fn db_path_is_inside_data_dir() {
        let config = AppConfig::with_data_dir(PathBuf::from("/srv/hb"));
        assert_eq!(config.db_path(), PathBuf::from("/srv/hb/healthbell.db"));
    }

    #[test]
    fn policies_parse_case_insensitively() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HEALTHBELL_DATA_DIR", "/tmp/hb"),
            ("HEALTHBELL_LOW_STOCK_POLICY", "EDGE"),
            ("HEALTHBELL_PAST_SLOTS", "Hide"),
            ("HEALTHBELL_LOW_STOCK_THRESHOLD", "3"),
        ]))
        .unwrap();
        assert_eq!(config.low_stock_policy, LowStockPolicy::Edge);
        assert_eq!(config.past_slots, PastSlotPolicy::Hide);
        assert_eq!(config.low_stock_threshold, 3);
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("HEALTHBELL_DATA_DIR", "/tmp/hb"),
            ("HEALTHBELL_LOW_STOCK_THRESHOLD", "five"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { var: "HEALTHBELL_LOW_STOCK_THRESHOLD", .. }
        ));
    }

    #[test]
    fn invalid_bind_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("HEALTHBELL_DATA_DIR", "/tmp/hb"),
            ("HEALTHBELL_BIND", "not-an-address"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "HEALTHBELL_BIND", .. }));
    }

    #[test]
    fn blank_api_keys_count_as_missing() {
        let config = AppConfig::from_lookup(lookup(&[
            ("HEALTHBELL_DATA_DIR", "/tmp/hb"),
            ("GNEWS_API_KEY", "   "),
            ("GEMINI_API_KEY", "abc"),
        ]))
        .unwrap();
        assert!(config.news.api_key.is_none());
        assert_eq!(config.gemini.api_key.as_deref(), Some("abc"));
    }

    #[test]
    fn app_name_is_healthbell() {
        assert_eq!(APP_NAME, "HealthBell");
    }
}
