//! Value source backed by plain-text files served over HTTP.

use super::ValueSource;
use crate::config::BackendConfig;
use crate::error::{PanelError, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::header::CACHE_CONTROL;
use reqwest::{Client, StatusCode};

/// Reads `<base_url>/<value_dir>/<key>` with caching disabled.
#[derive(Debug, Clone)]
pub struct HttpValueSource {
    http: Client,
    base_url: String,
    value_dir: String,
}

impl HttpValueSource {
    pub fn new(config: &BackendConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Share one connection pool between the read and write paths.
    pub fn with_client(http: Client, config: &BackendConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            value_dir: config.value_dir.trim_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        if self.value_dir.is_empty() {
            format!("{}/{}", self.base_url, key)
        } else {
            format!("{}/{}/{}", self.base_url, self.value_dir, key)
        }
    }
}

#[async_trait]
impl ValueSource for HttpValueSource {
    async fn read(&self, key: &str) -> Result<String> {
        let url = self.url_for(key);
        let response = self
            .http
            .get(&url)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!("GET {} -> {}", url, status);
            return Err(PanelError::ReadStatus {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base_url: &str, value_dir: &str) -> BackendConfig {
        BackendConfig {
            base_url: base_url.to_string(),
            value_dir: value_dir.to_string(),
            command_path: "python.php".to_string(),
        }
    }

    #[test]
    fn test_url_for_joins_directory_and_key() {
        let source = HttpValueSource::new(&backend("http://pi.local/", "/thermostat_files/"));
        assert_eq!(
            source.url_for("mode.txt"),
            "http://pi.local/thermostat_files/mode.txt"
        );
    }

    #[test]
    fn test_url_for_without_directory() {
        let source = HttpValueSource::new(&backend("http://pi.local", ""));
        assert_eq!(source.url_for("fan.txt"), "http://pi.local/fan.txt");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_an_error() {
        // Port 9 on loopback is discard; nothing listens there in test environments
        let source = HttpValueSource::new(&backend("http://127.0.0.1:9", "thermostat_files"));
        assert!(source.read("mode.txt").await.is_err());
    }
}
