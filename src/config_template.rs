//! Fills API-key placeholders in the front-end config file.

use std::path::{Path, PathBuf};

use crate::config::ConfigError;

pub const GEMINI_PLACEHOLDER: &str = "__GEMINI_API_KEY__";
pub const NEWS_PLACEHOLDER: &str = "__NEWS_API_KEY__";

const DEFAULT_CONFIG_FILE: &str = "assets/app-config.js";

/// Template path, `HEALTHBELL_CONFIG_FILE` or `assets/app-config.js`.
pub fn config_file_path<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup("HEALTHBELL_CONFIG_FILE")
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Replace every placeholder occurrence. A missing key becomes an empty string.
pub fn fill_placeholders(
    template: &str,
    gemini_key: Option<&str>,
    news_key: Option<&str>,
) -> String {
    template
        .replace(GEMINI_PLACEHOLDER, gemini_key.unwrap_or_default())
        .replace(NEWS_PLACEHOLDER, news_key.unwrap_or_default())
}

/// Rewrite the file at `path` in place.
pub fn generate<F>(path: &Path, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let template = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let gemini = lookup("GEMINI_API_KEY");
    let news = lookup("NEWS_API_KEY");
    if gemini.is_none() || news.is_none() {
        tracing::warn!(
            gemini_set = gemini.is_some(),
            news_set = news.is_some(),
            "API key missing from environment"
        );
    }

    let filled = fill_placeholders(&template, gemini.as_deref(), news.as_deref());
    std::fs::write(path, filled).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn replaces_every_occurrence() {
        let out = fill_placeholders(
            "a='__GEMINI_API_KEY__'; b='__NEWS_API_KEY__'; c='__GEMINI_API_KEY__';",
            Some("g1"),
            Some("n1"),
        );
        assert_eq!(out, "a='g1'; b='n1'; c='g1';");
    }

    #[test]
    fn missing_key_becomes_empty() {
        assert_eq!(fill_placeholders("k=__NEWS_API_KEY__", Some("g"), None), "k=");
    }

    #[test]
    fn path_defaults_and_override() {
        assert_eq!(config_file_path(env(&[])), PathBuf::from("assets/app-config.js"));
        assert_eq!(
            config_file_path(env(&[("HEALTHBELL_CONFIG_FILE", "/tmp/cfg.js")])),
            PathBuf::from("/tmp/cfg.js")
        );
    }

    #[test]
    fn generate_rewrites_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app-config.js");
        let source = "const GEMINI='__GEMINI_API_KEY__';\nconst NEWS='__NEWS_API_KEY__';\n";
        std::fs::write(&path, source).unwrap();

        generate(&path, env(&[("GEMINI_API_KEY", "gk"), ("NEWS_API_KEY", "nk")])).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "const GEMINI='gk';\nconst NEWS='nk';\n");
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = generate(&dir.path().join("absent.js"), env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
