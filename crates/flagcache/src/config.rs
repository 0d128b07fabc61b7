use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

/// Static configuration of the feature client.
///
/// All fields have defaults, so a configuration file only needs to name the
/// values it overrides. Durations are given in humantime format (`90s`,
/// `5min`).
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the feature delivery API.
    pub api_host: Url,

    /// The client-side key naming the feature payload to fetch.
    ///
    /// The key becomes part of the request path:
    /// `{api_host}/api/features/{client_key}`.
    pub client_key: String,

    /// Extra headers to send with every fetch request.
    pub http_headers: BTreeMap<String, String>,

    /// How long a fetched feature set is served before it counts as stale.
    #[serde(with = "humantime_serde")]
    pub cache_ttl: Duration,

    /// The timeout for establishing a connection to the API.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// The overall timeout for one fetch request.
    #[serde(with = "humantime_serde")]
    pub fetch_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_host: Url::parse("http://127.0.0.1:3100").unwrap(),
            client_key: String::new(),
            http_headers: BTreeMap::new(),
            cache_ttl: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(1),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Loads the configuration from a YAML file, or the defaults when `path`
    /// is `None`.
    pub fn get(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_reader(
                fs::File::open(path).context("failed to open configuration file")?,
            ),
            None => Ok(Config::default()),
        }
    }

    fn from_reader(mut reader: impl std::io::Read) -> Result<Self> {
        let mut config = String::new();
        reader
            .read_to_string(&mut config)
            .context("failed reading config file")?;
        if config.trim().is_empty() {
            anyhow::bail!("config file empty");
        }
        serde_yaml::from_str(&config).context("failed to parse YAML")
    }

    /// The fully qualified URL of the features endpoint.
    pub fn features_url(&self) -> Result<Url> {
        let mut url = self.api_host.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow::anyhow!("`api_host` cannot be used as a base URL"))?
            .pop_if_empty()
            .extend(["api", "features", self.client_key.as_str()]);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_file() {
        assert!(Config::from_reader("".as_bytes()).is_err());
    }

    #[test]
    fn test_unspecified_fields_are_default() {
        let yaml = r#"
            client_key: sdk-abc123
        "#;
        let config = Config::from_reader(yaml.as_bytes()).unwrap();
        let default_config = Config::default();

        assert_eq!(config.client_key, "sdk-abc123");
        assert_eq!(config.cache_ttl, default_config.cache_ttl);
        assert_eq!(config.fetch_timeout, default_config.fetch_timeout);
    }

    #[test]
    fn test_humantime_durations() {
        let yaml = r#"
            cache_ttl: 5m
            connect_timeout: 500ms
        "#;
        let config = Config::from_reader(yaml.as_bytes()).unwrap();

        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.connect_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_features_url() {
        let config = Config {
            api_host: Url::parse("https://features.example.com").unwrap(),
            client_key: "sdk-abc123".to_owned(),
            ..Default::default()
        };

        assert_eq!(
            config.features_url().unwrap().as_str(),
            "https://features.example.com/api/features/sdk-abc123"
        );
    }

    #[test]
    fn test_features_url_trailing_slash() {
        let config = Config {
            api_host: Url::parse("https://features.example.com/self-hosted/").unwrap(),
            client_key: "sdk-abc123".to_owned(),
            ..Default::default()
        };

        assert_eq!(
            config.features_url().unwrap().as_str(),
            "https://features.example.com/self-hosted/api/features/sdk-abc123"
        );
    }
}
