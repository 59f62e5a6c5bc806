//! Command delivery as a form POST.

use super::{Command, CommandSink};
use crate::config::BackendConfig;
use crate::error::{PanelError, Result};
use async_trait::async_trait;
use reqwest::Client;

/// Form field carrying the command payload.
pub const FORM_FIELD: &str = "arg";

/// Posts `arg=<group> <option>` to the backend's command endpoint.
#[derive(Debug, Clone)]
pub struct HttpCommandSink {
    http: Client,
    url: String,
}

impl HttpCommandSink {
    pub fn new(config: &BackendConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(http: Client, config: &BackendConfig) -> Self {
        let url = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            config.command_path.trim_start_matches('/')
        );
        Self { http, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CommandSink for HttpCommandSink {
    async fn send(&self, command: &Command) -> Result<()> {
        let payload = command.payload();
        let response = self
            .http
            .post(&self.url)
            .form(&[(FORM_FIELD, payload.as_str())])
            .send()
            .await?;

        // The body carries nothing the panel uses
        let status = response.status();
        if !status.is_success() {
            return Err(PanelError::CommandRejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_base_and_path() {
        let sink = HttpCommandSink::new(&BackendConfig {
            base_url: "http://pi.local/".to_string(),
            value_dir: "thermostat_files".to_string(),
            command_path: "/python.php".to_string(),
        });
        assert_eq!(sink.url(), "http://pi.local/python.php");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_an_error() {
        let sink = HttpCommandSink::new(&BackendConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            value_dir: String::new(),
            command_path: "python.php".to_string(),
        });
        assert!(sink.send(&Command::new("mode", "Off")).await.is_err());
    }
}
