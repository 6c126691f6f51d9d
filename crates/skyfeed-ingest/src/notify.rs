//! Operator notification through Mailgun
//!
//! A failed run sends one plain-text message when `--mgn` is set. The
//! address has the form `mail://<key>@<domain>`, where the user name is the
//! Mailgun API key. `mail://api:<key>@<domain>` is accepted as well.

use anyhow::Result;
use chrono::Local;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::connector::{redact, ConnectorError};

pub const MAILGUN_API: &str = "https://api.mailgun.net";

const SCHEME: &str = "mail";
const API_USER: &str = "api";
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Mailgun account parsed from `--mgn`
#[derive(Clone, PartialEq, Eq)]
pub struct MailgunAccount {
    pub key: String,
    pub domain: String,
}

impl MailgunAccount {
    pub fn parse(address: &str) -> Result<Self, ConnectorError> {
        let invalid = |reason: &str| ConnectorError::InvalidAddress {
            address: redact(address),
            reason: reason.to_string(),
        };

        let url = Url::parse(address.trim()).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != SCHEME {
            return Err(invalid("expected scheme 'mail'"));
        }
        if url.username().is_empty() {
            return Err(ConnectorError::MissingUser { protocol: "mailgun" });
        }
        let domain = url.host_str().ok_or_else(|| invalid("missing domain"))?;

        let key = match url.password() {
            Some(password) if url.username() == API_USER => password,
            _ => url.username(),
        };

        Ok(Self {
            key: key.to_string(),
            domain: domain.to_string(),
        })
    }
}

impl fmt::Debug for MailgunAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailgunAccount")
            .field("key", &"***")
            .field("domain", &self.domain)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Notifier {
    client: Client,
    api: String,
    account: MailgunAccount,
    from: String,
    to: String,
}

impl Notifier {
    pub fn new(client: Client, account: MailgunAccount, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            client,
            api: MAILGUN_API.to_string(),
            account,
            from: from.into(),
            to: to.into(),
        }
    }

    /// Send to another API host, e.g. the EU region.
    pub fn with_api(mut self, api: &str) -> Self {
        self.api = api.trim_end_matches('/').to_string();
        self
    }

    /// Report a failed run of `command`. Delivery problems are only logged.
    pub async fn report(&self, command: &str, error: &anyhow::Error) {
        let subject = format!("ERROR [{}]", command);
        let text = format!(
            "{}: version {}: {:#}",
            Local::now().to_rfc3339(),
            env!("CARGO_PKG_VERSION"),
            error
        );

        match self.send(&subject, &text).await {
            Ok(()) => info!(to = %self.to, "Sent failure notification"),
            Err(e) => warn!(error = %e, "Failed to send failure notification"),
        }
    }

    pub async fn send(&self, subject: &str, text: &str) -> Result<()> {
        let url = format!("{}/v3/{}/messages", self.api, self.account.domain);
        let response = self
            .client
            .post(&url)
            .timeout(SEND_TIMEOUT)
            .basic_auth(API_USER, Some(&self.account.key))
            .form(&[
                ("from", self.from.as_str()),
                ("to", self.to.as_str()),
                ("subject", subject),
                ("text", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectorError::HttpStatus {
                url,
                status: status.as_u16(),
            }
            .into());
        }
        Ok(())
    }
}
