//! Server endpoint addresses.
//!
//! An endpoint is written `scheme://[userinfo@]host:port`, e.g.
//! `tcp://localhost:1313` or `tcp://player@game.example:4000`. The host
//! and an explicit, strictly positive port are required; userinfo is
//! accepted and ignored. Anything malformed fails here, before any
//! network activity.

use thiserror::Error;
use url::Url;

/// A validated server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    url: Url,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("invalid endpoint {0:?}: {1}")]
    Unparseable(String, url::ParseError),
    #[error("invalid endpoint {0:?}: missing host")]
    MissingHost(String),
    #[error("invalid endpoint {0:?}: missing or non-positive port")]
    InvalidPort(String),
}

impl Endpoint {
    /// Parse and validate a connection string.
    pub fn parse(conn_str: &str) -> Result<Self, EndpointError> {
        let url = Url::parse(conn_str)
            .map_err(|e| EndpointError::Unparseable(conn_str.to_string(), e))?;
        match url.host_str() {
            Some(host) if !host.is_empty() => {}
            _ => return Err(EndpointError::MissingHost(conn_str.to_string())),
        }
        match url.port() {
            Some(port) if port > 0 => {}
            _ => return Err(EndpointError::InvalidPort(conn_str.to_string())),
        }
        Ok(Self { url })
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn port(&self) -> u16 {
        self.url.port().unwrap_or_default()
    }

    /// Address the WebSocket transport dials, scheme normalized to `ws`.
    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}", self.host(), self.port())
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host(), self.port())
    }
}
