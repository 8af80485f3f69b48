//! Fetch primitive for http, https and file addresses
//!
//! The [`Transport`] trait is the seam between the address resolver and the
//! outside world. [`HttpTransport`] talks to real servers and the local file
//! system; [`MemoryTransport`] serves canned responses.

use std::collections::HashMap;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder};
use tracing::debug;
use url::Url;

use crate::infrastructure::config::Settings;
use crate::infrastructure::errors::RetrievalError;

/// Raw bytes of one fetch plus the charset the transport declared, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fetched {
    pub body: Vec<u8>,
    pub charset: Option<String>,
}

impl Fetched {
    pub fn new(body: impl Into<Vec<u8>>, charset: Option<&str>) -> Self {
        Self {
            body: body.into(),
            charset: charset.map(str::to_string),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url` once. No retries, no caching.
    async fn fetch(&self, url: &Url) -> Result<Fetched, RetrievalError>;
}

/// Production transport: `reqwest` for http(s), `tokio::fs` for file addresses.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, RetrievalError> {
        let client = ClientBuilder::new()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| RetrievalError::generic(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, RetrievalError> {
        Self::new(
            &settings.user_agent,
            Duration::from_secs(settings.request_timeout_seconds),
        )
    }

    async fn fetch_http(&self, url: &Url) -> Result<Fetched, RetrievalError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            debug!("HTTP {} for {}", status.as_u16(), url);
            return Err(RetrievalError::http(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
            ));
        }

        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset_from_content_type);
        let body = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(Fetched {
            body: body.to_vec(),
            charset,
        })
    }

    async fn fetch_file(url: &Url) -> Result<Fetched, RetrievalError> {
        let path = url
            .to_file_path()
            .map_err(|()| RetrievalError::generic(format!("Invalid file address «{url}»")))?;
        let body = tokio::fs::read(&path).await.map_err(|e| classify_io_error(&e))?;
        debug!("Read {} bytes from {}", body.len(), path.display());
        Ok(Fetched { body, charset: None })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &Url) -> Result<Fetched, RetrievalError> {
        match url.scheme() {
            "http" | "https" => self.fetch_http(url).await,
            "file" => Self::fetch_file(url).await,
            _ => Err(RetrievalError::UnknownUrlType {
                url: url.to_string(),
            }),
        }
    }
}

/// Transport answering from a fixed address -> response table.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    responses: HashMap<String, Result<Fetched, RetrievalError>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` (with an optional declared charset) for `address`
    pub fn with_page(mut self, address: &str, body: impl Into<Vec<u8>>, charset: Option<&str>) -> Self {
        self.responses
            .insert(normalize_key(address), Ok(Fetched::new(body, charset)));
        self
    }

    /// Fail every fetch of `address` with `error`
    pub fn with_error(mut self, address: &str, error: RetrievalError) -> Self {
        self.responses.insert(normalize_key(address), Err(error));
        self
    }
}

fn normalize_key(address: &str) -> String {
    Url::parse(address).map_or_else(|_| address.to_string(), String::from)
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn fetch(&self, url: &Url) -> Result<Fetched, RetrievalError> {
        self.responses
            .get(url.as_str())
            .cloned()
            .unwrap_or_else(|| Err(RetrievalError::http(404, "Not Found")))
    }
}

/// `charset` parameter of a Content-Type header value
pub fn charset_from_content_type(value: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|parameter| {
        let (name, value) = parameter.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Walk the source chain of a `reqwest` error looking for an OS-level cause.
fn classify_reqwest_error(error: &reqwest::Error) -> RetrievalError {
    let mut source: Option<&(dyn std::error::Error + 'static)> = std::error::Error::source(error);
    while let Some(cause) = source {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return classify_io_error(io_error);
        }
        source = cause.source();
    }
    if error.is_timeout() {
        return RetrievalError::network("ETIMEDOUT", "Timed out");
    }
    if let Some(status) = error.status() {
        return RetrievalError::http(status.as_u16(), status.canonical_reason().unwrap_or_default());
    }
    let mut reason = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        reason = cause.to_string();
        source = cause.source();
    }
    RetrievalError::generic(reason)
}

/// Network error carrying the symbolic errno name when one is known.
pub fn classify_io_error(error: &io::Error) -> RetrievalError {
    let code = errno_name(error.kind()).map_or_else(
        || {
            error
                .raw_os_error()
                .map_or_else(|| "unknown".to_string(), |number| number.to_string())
        },
        str::to_string,
    );
    let message = error.to_string();
    let message = message
        .rfind(" (os error ")
        .map_or(message.as_str(), |index| &message[..index]);
    RetrievalError::network(code, message)
}

fn errno_name(kind: io::ErrorKind) -> Option<&'static str> {
    use io::ErrorKind;
    let name = match kind {
        ErrorKind::NotFound => "ENOENT",
        ErrorKind::PermissionDenied => "EACCES",
        ErrorKind::ConnectionRefused => "ECONNREFUSED",
        ErrorKind::ConnectionReset => "ECONNRESET",
        ErrorKind::ConnectionAborted => "ECONNABORTED",
        ErrorKind::NotConnected => "ENOTCONN",
        ErrorKind::AddrInUse => "EADDRINUSE",
        ErrorKind::AddrNotAvailable => "EADDRNOTAVAIL",
        ErrorKind::HostUnreachable => "EHOSTUNREACH",
        ErrorKind::NetworkUnreachable => "ENETUNREACH",
        ErrorKind::BrokenPipe => "EPIPE",
        ErrorKind::AlreadyExists => "EEXIST",
        ErrorKind::WouldBlock => "EAGAIN",
        ErrorKind::InvalidInput => "EINVAL",
        ErrorKind::TimedOut => "ETIMEDOUT",
        ErrorKind::Interrupted => "EINTR",
        ErrorKind::IsADirectory => "EISDIR",
        ErrorKind::NotADirectory => "ENOTDIR",
        _ => return None,
    };
    Some(name)
}
