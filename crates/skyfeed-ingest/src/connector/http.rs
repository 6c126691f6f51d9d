//! HTTP pull: one GET, whole body in memory.

use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

use super::ConnectorError;

pub const USER_AGENT: &str = concat!("skyfeed/", env!("CARGO_PKG_VERSION"));

/// Build the shared client used for pulls, pushes and notifications.
pub fn build_client(insecure_tls: bool) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .danger_accept_invalid_certs(insecure_tls)
        .build()
}

#[derive(Debug, Clone)]
pub struct HttpPuller {
    client: Client,
    timeout: Duration,
}

impl HttpPuller {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// GET `url`; anything but 2xx is an error.
    pub async fn pull(&self, url: &str) -> anyhow::Result<Bytes> {
        debug!(%url, "Pulling");
        let response = self.client.get(url).timeout(self.timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectorError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response.bytes().await?;
        info!(%url, bytes = body.len(), "Pulled");
        Ok(body)
    }
}
