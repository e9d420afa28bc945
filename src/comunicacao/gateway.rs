//! Outbound message delivery
//!
//! With no gateway configured, messages are only written to the log and
//! always count as delivered. With a gateway URL, each message is one POST
//! to `{gateway_url}/{canal}`; any non-2xx answer is a failed delivery.

use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::MessagingConfig;
use crate::database::models::Canal;
use crate::error::MandatoError;

#[derive(Debug, Serialize)]
struct GatewayRequest<'a> {
    destino: &'a str,
    mensagem: &'a str,
}

#[derive(Debug, Clone)]
pub enum Gateway {
    Log,
    Http { client: Client, base_url: String },
}

impl Gateway {
    pub fn from_config(config: &MessagingConfig) -> Result<Self, MandatoError> {
        match config.gateway_url.as_deref().map(str::trim) {
            None | Some("") => Ok(Gateway::Log),
            Some(url) => Gateway::http(url, Duration::from_secs(config.timeout_secs)),
        }
    }

    pub fn http(base_url: &str, timeout: Duration) -> Result<Self, MandatoError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MandatoError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Gateway::Http {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Gateway::Log => "log",
            Gateway::Http { .. } => "http",
        }
    }

    /// Deliver one message on one channel. No retry.
    pub async fn send(&self, canal: Canal, destino: &str, mensagem: &str) -> Result<(), MandatoError> {
        match self {
            Gateway::Log => {
                info!("[{}] -> {}: {}", canal, destino, mensagem);
                Ok(())
            }
            Gateway::Http { client, base_url } => {
                let url = format!("{}/{}", base_url, canal.as_str().to_lowercase());
                debug!("POST {} for {}", url, destino);

                let response = client
                    .post(&url)
                    .json(&GatewayRequest { destino, mensagem })
                    .send()
                    .await
                    .map_err(|e| MandatoError::MessagingError(format!("{}: {}", canal, e)))?;

                let status = response.status();
                if status.is_success() {
                    Ok(())
                } else {
                    Err(MandatoError::MessagingError(format!(
                        "{}: gateway respondeu {}",
                        canal, status
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_selection() {
        let mut config = MessagingConfig {
            gateway_url: None,
            timeout_secs: 5,
        };
        assert_eq!(Gateway::from_config(&config).unwrap().name(), "log");

        config.gateway_url = Some("  ".to_string());
        assert_eq!(Gateway::from_config(&config).unwrap().name(), "log");

        config.gateway_url = Some("http://localhost:9000/".to_string());
        match Gateway::from_config(&config).unwrap() {
            Gateway::Http { base_url, .. } => assert_eq!(base_url, "http://localhost:9000"),
            Gateway::Log => panic!("expected http gateway"),
        }
    }

    #[tokio::test]
    async fn test_log_gateway_always_delivers() {
        let gateway = Gateway::Log;
        assert!(gateway.send(Canal::Sms, "81999990000", "teste").await.is_ok());
    }
}
