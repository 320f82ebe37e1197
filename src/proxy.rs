//! Proxy settings and the one-shot reachability probe run before a proxy is
//! accepted.

use std::error::Error as StdError;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::{Proxy, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config_value::{Checked, Level, Note};

pub const PROBE_URL: &str = "https://www.baidu.com/";
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-scheme proxy map. `None` means "connect directly".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Proxies {
    pub http: Option<String>,
    pub https: Option<String>,
    pub ftp: Option<String>,
}

impl Proxies {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn all(url: &str) -> Self {
        Self {
            http: Some(url.to_string()),
            https: Some(url.to_string()),
            ftp: Some(url.to_string()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.http.is_some() || self.https.is_some() || self.ftp.is_some()
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("timed out")]
    Timeout,
    #[error("proxy error: {0}")]
    Proxy(String),
    #[error("TLS error: {0}")]
    Tls(String),
    #[error("broken response body: {0}")]
    ChunkedEncoding(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("unexpected status {0}")]
    Status(StatusCode),
}

impl ProbeError {
    /// Maps a reqwest failure onto the probe's failure categories.
    fn classify(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }

        let chain = error_chain(&err);
        let lowered = chain.to_lowercase();
        if err.is_connect() {
            if ["certificate", "tls", "handshake"]
                .iter()
                .any(|needle| lowered.contains(needle))
            {
                Self::Tls(chain)
            } else if lowered.contains("proxy") || lowered.contains("tunnel") {
                Self::Proxy(chain)
            } else {
                Self::Connection(chain)
            }
        } else if err.is_body() || err.is_decode() {
            Self::ChunkedEncoding(chain)
        } else if err.is_builder() {
            Self::Proxy(chain)
        } else {
            Self::Connection(chain)
        }
    }
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(e) = source {
        parts.push(e.to_string());
        source = e.source();
    }
    parts.join(": ")
}

/// Reachability check for a proxy configuration.
pub trait ProxyProbe {
    fn probe(&self, proxies: &Proxies) -> Result<(), ProbeError>;
}

/// Probe issuing one blocking GET through the proxy.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: String,
    timeout: Duration,
}

impl Default for HttpProbe {
    fn default() -> Self {
        Self {
            url: PROBE_URL.to_string(),
            timeout: PROBE_TIMEOUT,
        }
    }
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

impl ProxyProbe for HttpProbe {
    fn probe(&self, proxies: &Proxies) -> Result<(), ProbeError> {
        let mut builder = Client::builder().timeout(self.timeout).no_proxy();

        if let Some(p) = &proxies.http {
            builder = builder.proxy(Proxy::http(p).map_err(ProbeError::classify)?);
        }
        if let Some(p) = &proxies.https {
            builder = builder.proxy(Proxy::https(p).map_err(ProbeError::classify)?);
        }

        let client = builder.build().map_err(ProbeError::classify)?;
        let response = client.get(&self.url).send().map_err(ProbeError::classify)?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(ProbeError::Status(status)),
        }
    }
}

/// Accepts a proxy URL only once it has been shown to work.
pub fn check_proxies(raw: &Value, probe: &dyn ProxyProbe) -> Checked<Proxies> {
    let url = match raw {
        Value::String(s) if !s.is_empty() => s,
        Value::String(_) | Value::Null => {
            return Checked {
                value: Proxies::disabled(),
                note: None,
            };
        }
        other => {
            return warned(format!("proxies {other} is not a proxy address"));
        }
    };

    let proxies = Proxies::all(url);
    match probe.probe(&proxies) {
        Ok(()) => Checked {
            value: proxies,
            note: Some(Note {
                level: Level::Info,
                message: format!("proxy {url} test succeeded"),
                persist: true,
            }),
        },
        Err(ProbeError::Timeout) => warned(format!("proxy {url} test timed out")),
        Err(e) => warned(format!("proxy {url} test failed: {e}")),
    }
}

fn warned(message: String) -> Checked<Proxies> {
    Checked {
        value: Proxies::disabled(),
        note: Some(Note {
            level: Level::Warning,
            message,
            persist: true,
        }),
    }
}
