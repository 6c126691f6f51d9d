//! Batch publisher
//!
//! Each outlet's [`PriceList`] is serialized to JSON, gzipped and sent with
//! `POST {base}/data/add`. A `GET {base}/ping` is made before anything is
//! fetched so that an unreachable API fails the run early.
//!
//! Two authentication schemes are in use:
//!
//! | Scheme   | Key                     | Tag                                   |
//! |----------|-------------------------|---------------------------------------|
//! | Legacy   | `?key=` query parameter | `hashtag=` in `Content-Type`          |
//! | Current  | `X-Morion-Skynet-Key`   | `X-Morion-Skynet-Tag`                 |

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::Client;
use skyfeed_common::compression::gzip_json;
use skyfeed_common::types::PriceList;
use skyfeed_common::SkyfeedError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const GZIP_ENCODING: &str = "application/x-gzip";
const KEY_HEADER: &str = "X-Morion-Skynet-Key";
const TAG_HEADER: &str = "X-Morion-Skynet-Tag";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("ping failed: {0}")]
    PingTransport(#[source] reqwest::Error),

    #[error("ping failed with status {0}")]
    PingStatus(u16),

    #[error("push of '{label}' failed: {source}")]
    Transport {
        label: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("push of '{label}' failed with status {status}")]
    Rejected { label: String, status: u16 },

    #[error("cannot encode '{label}': {source}")]
    Encode {
        label: String,
        #[source]
        source: SkyfeedError,
    },

    #[error("invalid header value for '{label}'")]
    Header { label: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Legacy,
    Current,
}

/// Service key and tag sent with every push
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub key: String,
    pub tag: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            tag: tag.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &"***")
            .field("tag", &self.tag)
            .finish()
    }
}

/// Result of publishing one list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Sent,
    /// The list had no lines
    Skipped,
}

#[derive(Debug, Clone)]
pub struct Publisher {
    client: Client,
    base_url: String,
    credentials: Credentials,
    scheme: AuthScheme,
    ping_timeout: Duration,
    push_timeout: Duration,
}

impl Publisher {
    pub fn new(client: Client, base_url: &str, credentials: Credentials, scheme: AuthScheme) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            scheme,
            ping_timeout: Duration::from_secs(5),
            push_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeouts(mut self, ping: Duration, push: Duration) -> Self {
        self.ping_timeout = ping;
        self.push_timeout = push;
        self
    }

    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    /// `GET /ping`; any transport error or non-2xx status is fatal.
    pub async fn ping(&self) -> Result<(), PublishError> {
        let url = format!("{}/ping", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(self.ping_timeout)
            .send()
            .await
            .map_err(PublishError::PingTransport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::PingStatus(status.as_u16()));
        }
        debug!(%url, "Ingestion API is alive");
        Ok(())
    }

    /// Serialize, compress and push one list. Empty lists are not sent.
    pub async fn publish(&self, list: &PriceList) -> Result<PublishOutcome, PublishError> {
        let label = list.outlet_code().to_string();
        if list.is_empty() {
            debug!(outlet = %label, "Skipping empty price list");
            return Ok(PublishOutcome::Skipped);
        }

        let body = gzip_json(list).map_err(|source| PublishError::Encode {
            label: label.clone(),
            source,
        })?;
        self.push_gzip(body, &label).await?;
        info!(outlet = %label, lines = list.len(), "Published price list");
        Ok(PublishOutcome::Sent)
    }

    /// Push an already gzipped JSON body with this publisher's credentials.
    pub async fn push_gzip(&self, body: Vec<u8>, label: &str) -> Result<(), PublishError> {
        self.push_gzip_as(body, label, &self.credentials).await
    }

    /// Push an already gzipped JSON body with explicit credentials.
    pub async fn push_gzip_as(
        &self,
        body: Vec<u8>,
        label: &str,
        credentials: &Credentials,
    ) -> Result<(), PublishError> {
        let url = format!("{}/data/add", self.base_url);
        let headers = self.headers(label, credentials)?;

        let mut request = self
            .client
            .post(&url)
            .timeout(self.push_timeout)
            .headers(headers)
            .body(body);
        if self.scheme == AuthScheme::Legacy {
            request = request.query(&[("key", credentials.key.as_str())]);
        }

        let response = request.send().await.map_err(|source| PublishError::Transport {
            label: label.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Rejected {
                label: label.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    fn headers(&self, label: &str, credentials: &Credentials) -> Result<HeaderMap, PublishError> {
        let value = |text: &str| {
            HeaderValue::from_str(text).map_err(|_| PublishError::Header {
                label: label.to_string(),
            })
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static(GZIP_ENCODING));
        match self.scheme {
            AuthScheme::Legacy => {
                let content_type = format!("{}; hashtag={}", JSON_CONTENT_TYPE, credentials.tag);
                headers.insert(CONTENT_TYPE, value(&content_type)?);
            },
            AuthScheme::Current => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
                headers.insert(KEY_HEADER, value(&credentials.key)?);
                headers.insert(TAG_HEADER, value(&credentials.tag)?);
            },
        }
        Ok(headers)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use skyfeed_common::types::Outlet;

    fn publisher(scheme: AuthScheme) -> Publisher {
        Publisher::new(Client::new(), "http://api.example.com/", Credentials::new("k", "t"), scheme)
    }

    #[test]
    fn test_legacy_headers() {
        let headers = publisher(AuthScheme::Legacy)
            .headers("101", &Credentials::new("k", "STL"))
            .unwrap();
        assert_eq!(headers[CONTENT_TYPE], "application/json; charset=utf-8; hashtag=STL");
        assert_eq!(headers[CONTENT_ENCODING], "application/x-gzip");
        assert!(!headers.contains_key(KEY_HEADER));
    }

    #[test]
    fn test_current_headers() {
        let headers = publisher(AuthScheme::Current)
            .headers("101", &Credentials::new("secret", "AVE"))
            .unwrap();
        assert_eq!(headers[CONTENT_TYPE], "application/json; charset=utf-8");
        assert_eq!(headers[KEY_HEADER], "secret");
        assert_eq!(headers[TAG_HEADER], "AVE");
    }

    #[test]
    fn test_bad_header_value_names_the_outlet() {
        let err = publisher(AuthScheme::Current)
            .headers("101", &Credentials::new("bad\nkey", "t"))
            .unwrap_err();
        assert!(err.to_string().contains("101"));
    }

    #[test]
    fn test_credentials_debug_hides_key() {
        let text = format!("{:?}", Credentials::new("secret", "t"));
        assert!(!text.contains("secret"));
    }

    #[tokio::test]
    async fn test_empty_list_is_skipped() {
        let list = PriceList::new(Outlet::new("101", "Central", "AVE"));
        let outcome = publisher(AuthScheme::Current).publish(&list).await.unwrap();
        assert_eq!(outcome, PublishOutcome::Skipped);
    }
}
