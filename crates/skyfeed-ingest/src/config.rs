//! Run configuration
//!
//! Command-line flags supply the API endpoint and credentials; timeouts and
//! TLS leniency come from the environment (`.env` is loaded first by the
//! binary).

use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::connector::Timeouts;
use crate::notify::{MailgunAccount, Notifier};
use crate::publish::{AuthScheme, Credentials, Publisher};

pub const DEFAULT_MAIL_FROM: &str = "noreplay@example.com";

const DEFAULT_PING_SECS: u64 = 5;
const DEFAULT_PULL_SECS: u64 = 30;
const DEFAULT_PUSH_SECS: u64 = 60;
const DEFAULT_CONNECT_SECS: u64 = 30;

/// Network timeouts, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// `GET /ping` (default: 5)
    pub ping_secs: u64,
    /// HTTP pulls and FTP/POP3 reads (default: 30)
    pub pull_secs: u64,
    /// `POST /data/add` (default: 60)
    pub push_secs: u64,
    /// TCP connect for FTP and POP3 (default: 30)
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            ping_secs: DEFAULT_PING_SECS,
            pull_secs: DEFAULT_PULL_SECS,
            push_secs: DEFAULT_PUSH_SECS,
            connect_secs: DEFAULT_CONNECT_SECS,
        }
    }
}

impl TimeoutConfig {
    /// Read `SKYFEED_{PING,PULL,PUSH,CONNECT}_TIMEOUT_SECS`, keeping the
    /// default for unset or unparsable values.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secs = |name: &str, default: u64| {
            lookup(name)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(default)
        };

        Self {
            ping_secs: secs("SKYFEED_PING_TIMEOUT_SECS", DEFAULT_PING_SECS),
            pull_secs: secs("SKYFEED_PULL_TIMEOUT_SECS", DEFAULT_PULL_SECS),
            push_secs: secs("SKYFEED_PUSH_TIMEOUT_SECS", DEFAULT_PUSH_SECS),
            connect_secs: secs("SKYFEED_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_SECS),
        }
    }

    pub fn ping(&self) -> Duration {
        Duration::from_secs(self.ping_secs)
    }

    pub fn pull(&self) -> Duration {
        Duration::from_secs(self.pull_secs)
    }

    pub fn push(&self) -> Duration {
        Duration::from_secs(self.push_secs)
    }

    /// Socket timeouts for the blocking connectors
    pub fn connector(&self) -> Timeouts {
        Timeouts {
            connect: Duration::from_secs(self.connect_secs),
            io: self.pull(),
        }
    }
}

/// Failure notification settings (`--mgn`, `--mfm`, `--mto`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyConfig {
    pub mailgun: String,
    pub from: String,
    pub to: String,
}

/// Everything a run needs besides the source address
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Base URL of the ingestion API
    pub srv: String,
    pub key: String,
    pub tag: String,
    pub notify: Option<NotifyConfig>,
    pub timeouts: TimeoutConfig,
    /// Accept invalid TLS certificates on HTTP pulls and pushes
    pub insecure_tls: bool,
}

impl IngestConfig {
    pub fn new(srv: impl Into<String>, key: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            srv: srv.into(),
            key: key.into(),
            tag: tag.into(),
            notify: None,
            timeouts: TimeoutConfig::default(),
            insecure_tls: false,
        }
    }

    /// Apply the environment settings (timeouts, `SKYFEED_INSECURE_TLS`).
    pub fn with_env(mut self) -> Self {
        self.timeouts = TimeoutConfig::from_env();
        self.insecure_tls = std::env::var("SKYFEED_INSECURE_TLS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(false);
        self
    }

    /// Enable notification when a Mailgun address is given.
    pub fn with_notify(mut self, mailgun: Option<String>, from: impl Into<String>, to: Option<String>) -> Self {
        self.notify = mailgun.filter(|m| !m.trim().is_empty()).map(|mailgun| NotifyConfig {
            mailgun,
            from: from.into(),
            to: to.unwrap_or_default(),
        });
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let srv = Url::parse(&self.srv).map_err(|e| anyhow::anyhow!("--srv '{}' is not a URL: {}", self.srv, e))?;
        if !matches!(srv.scheme(), "http" | "https") {
            anyhow::bail!("--srv must be an http(s) URL, got '{}'", self.srv);
        }
        if self.key.trim().is_empty() {
            anyhow::bail!("--key must not be empty");
        }
        if self.tag.trim().is_empty() {
            anyhow::bail!("--tag must not be empty");
        }

        let t = &self.timeouts;
        if t.ping_secs == 0 || t.pull_secs == 0 || t.push_secs == 0 || t.connect_secs == 0 {
            anyhow::bail!("SKYFEED_*_TIMEOUT_SECS must be greater than 0");
        }

        if let Some(notify) = &self.notify {
            MailgunAccount::parse(&notify.mailgun)?;
            if notify.to.trim().is_empty() {
                anyhow::bail!("--mto is required when --mgn is set");
            }
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.key.as_str(), self.tag.as_str())
    }

    pub fn publisher(&self, client: Client, scheme: AuthScheme) -> Publisher {
        Publisher::new(client, &self.srv, self.credentials(), scheme)
            .with_timeouts(self.timeouts.ping(), self.timeouts.push())
    }

    pub fn notifier(&self, client: Client) -> anyhow::Result<Option<Notifier>> {
        let Some(notify) = &self.notify else {
            return Ok(None);
        };
        let account = MailgunAccount::parse(&notify.mailgun)?;
        Ok(Some(Notifier::new(client, account, notify.from.as_str(), notify.to.as_str())))
    }
}
