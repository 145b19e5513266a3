//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global configuration for scrapeline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub fetch: FetchConfig,
    pub crawl: CrawlConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_dir: PathBuf,
    pub compression_level: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_dir: PathBuf::from("data/api_details"),
            compression_level: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub endpoint: String,
    pub batch_size: usize,
    pub concurrency: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
    /// Proxy URLs; `${VAR}` entries are read from the environment
    #[serde(deserialize_with = "deserialize_env_list")]
    pub proxies: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let defaults = scrapeline_ouedkniss::Config::default();
        Self {
            endpoint: defaults.endpoint,
            batch_size: defaults.batch_size,
            concurrency: defaults.concurrency,
            max_retries: defaults.max_retries,
            timeout_secs: defaults.timeout.as_secs(),
            proxies: defaults.proxies,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub endpoint: String,
    pub category: String,
    pub page_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        let defaults = scrapeline_ouedkniss::CrawlOptions::default();
        Self {
            endpoint: scrapeline_ouedkniss::listing::SEARCH_ENDPOINT.to_string(),
            category: defaults.category,
            page_delay_ms: defaults.page_delay.as_millis() as u64,
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LogConfig {
    /// Append log lines to this file as well as stderr
    pub file: Option<PathBuf>,
}

/// Deserialize a list whose entries may be environment references like ${VAR}.
///
/// An entry naming an unset variable is an error: dropping it would shift the
/// position-based proxy assignment of every other entry.
fn deserialize_env_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Vec<String> = Vec::deserialize(deserializer)?;
    raw.iter()
        .map(|s| {
            expand_env_var(s).ok_or_else(|| {
                serde::de::Error::custom(format!("{s} refers to an unset environment variable"))
            })
        })
        .collect()
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./scrapeline.toml (current directory)
    /// 2. ~/.config/scrapeline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("scrapeline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "scrapeline") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.output.default_dir, PathBuf::from("data/api_details"));
        assert_eq!(config.output.compression_level, 3);
        assert_eq!(config.fetch.batch_size, 1000);
        assert_eq!(config.fetch.concurrency, 25);
        assert_eq!(config.fetch.max_retries, 5);
        assert_eq!(config.fetch.timeout_secs, 12);
        assert_eq!(config.crawl.category, "immobilier");
        assert_eq!(config.crawl.page_delay_ms, 1000);
        assert!(config.log.file.is_none());
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(
            expand_env_var("http://10.0.0.1:3128"),
            Some("http://10.0.0.1:3128".to_string())
        );
    }

    #[test]
    fn expand_env_var_missing() {
        assert_eq!(expand_env_var("${SCRAPELINE_NONEXISTENT_12345}"), None);
    }

    #[test]
    fn expand_env_var_from_environment() {
        // PATH is set in any test environment
        let path = std::env::var("PATH").unwrap();
        assert_eq!(expand_env_var("${PATH}"), Some(path));
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[output]
default_dir = "/tmp/details"
compression_level = 5

[fetch]
batch_size = 200
concurrency = 8
proxies = ["http://10.0.0.1:3128", "${PATH}"]

[crawl]
category = "automobiles"

[log]
file = "logs/scraper.log"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.output.default_dir, PathBuf::from("/tmp/details"));
        assert_eq!(config.output.compression_level, 5);
        assert_eq!(config.fetch.batch_size, 200);
        assert_eq!(config.fetch.concurrency, 8);
        assert_eq!(config.fetch.max_retries, 5);
        let path = std::env::var("PATH").unwrap();
        assert_eq!(config.fetch.proxies, vec!["http://10.0.0.1:3128".to_string(), path]);
        assert_eq!(config.crawl.category, "automobiles");
        assert_eq!(config.log.file, Some(PathBuf::from("logs/scraper.log")));
    }

    #[test]
    fn unset_proxy_variable_fails_load() {
        let toml = r#"
[fetch]
proxies = ["http://10.0.0.1:3128", "${SCRAPELINE_NONEXISTENT_12345}"]
"#;
        let err = toml::from_str::<Config>(toml).unwrap_err();
        assert!(err.to_string().contains("SCRAPELINE_NONEXISTENT_12345"));
    }

    #[test]
    fn from_file_reports_path() {
        let err = Config::from_file(Path::new("/nonexistent/scrapeline.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/scrapeline.toml"));
    }
}
