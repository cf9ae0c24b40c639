//! Contains the HTTP remote that simulated users send their requests through.

use std::time::Duration;

use reqwest::{StatusCode, Url};

/// Errors from talking to the storefront.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Any error emitted from the underlying [`reqwest`] client.
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    /// The configured host is not an absolute `http` or `https` URL.
    #[error("invalid host `{host}`: {message}")]
    InvalidHost {
        /// The host as configured.
        host: String,
        /// What is wrong with it.
        message: String,
    },
    /// The storefront answered with a client or server error.
    #[error("HTTP {0}")]
    Status(StatusCode),
}

impl Error {
    /// A short, stable description used to group failures in the report.
    pub fn reason(&self) -> String {
        match self {
            Error::Status(status) => format!("HTTP {}", status.as_u16()),
            Error::Reqwest(err) if err.is_timeout() => "timeout".to_owned(),
            Error::Reqwest(err) if err.is_connect() => "connection error".to_owned(),
            Error::Reqwest(err) if err.is_body() || err.is_decode() => "body error".to_owned(),
            Error::Reqwest(_) => "request error".to_owned(),
            Error::InvalidHost { .. } => "invalid host".to_owned(),
        }
    }
}

/// A convenience alias that defaults our [`Error`] type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The outcome of a successful request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Response {
    /// The status code, always a success or redirect.
    pub status: StatusCode,
    /// Size of the response body in bytes.
    pub bytes: u64,
}

/// A remote storefront reached over HTTP.
///
/// All simulated users share one remote and thereby one connection pool.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    /// The host all paths are appended to, without a trailing slash.
    base: String,
    /// The client used to talk to the storefront.
    client: reqwest::Client,
}

impl HttpRemote {
    /// Default timeout for a single request, including reading the body.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a remote for the given host, such as `http://localhost:8080`.
    pub fn new(host: impl Into<String>) -> Result<Self> {
        Self::with_timeout(host, Self::DEFAULT_TIMEOUT)
    }

    /// Creates a remote for the given host with a custom request timeout.
    pub fn with_timeout(host: impl Into<String>, timeout: Duration) -> Result<Self> {
        let host = host.into();
        let url = Url::parse(&host).map_err(|err| Error::InvalidHost {
            host: host.clone(),
            message: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::InvalidHost {
                message: format!("unsupported scheme `{}`", url.scheme()),
                host,
            });
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("hatload/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            base: host.trim_end_matches('/').to_owned(),
            client,
        })
    }

    /// The host requests are sent to.
    pub fn host(&self) -> &str {
        &self.base
    }

    /// Returns the full URL for a path starting with `/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Issues a `GET` for the path and reads the full response body.
    ///
    /// Statuses of 400 and above are reported as [`Error::Status`]. The body is neither parsed nor
    /// validated.
    pub async fn get(&self, path: &str) -> Result<Response> {
        let response = self.client.get(self.url(path)).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status.is_client_error() || status.is_server_error() {
            return Err(Error::Status(status));
        }

        Ok(Response {
            status,
            bytes: body.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths() {
        let remote = HttpRemote::new("http://localhost:8080/").unwrap();
        assert_eq!(remote.host(), "http://localhost:8080");
        assert_eq!(remote.url("/"), "http://localhost:8080/");
        assert_eq!(
            remote.url("/hatme?style=santa"),
            "http://localhost:8080/hatme?style=santa"
        );

        let prefixed = HttpRemote::new("https://example.com/shop").unwrap();
        assert_eq!(prefixed.url("/list"), "https://example.com/shop/list");
    }

    #[test]
    fn rejects_invalid_hosts() {
        assert!(matches!(
            HttpRemote::new("localhost:8080"),
            Err(Error::InvalidHost { .. })
        ));
        assert!(matches!(
            HttpRemote::new("ftp://localhost"),
            Err(Error::InvalidHost { .. })
        ));
        assert!(matches!(
            HttpRemote::new("not a url"),
            Err(Error::InvalidHost { .. })
        ));
    }

    #[test]
    fn status_reason() {
        assert_eq!(Error::Status(StatusCode::NOT_FOUND).reason(), "HTTP 404");
    }
}
