//! HTTP seam shared by tile downloads and Overpass queries.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use thiserror::Error;
use url::Url;

/// Default `User-Agent` header sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("tiler/", env!("CARGO_PKG_VERSION"));

/// Default Overpass interpreter endpoint.
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Transport-level errors encountered while issuing HTTP requests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The server returned an HTTP error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Fully qualified request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Short error description supplied by the server.
        message: String,
    },
    /// The request failed due to an I/O error.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// I/O error reported by the transport.
        source: io::Error,
    },
    /// The server answered with an empty body.
    #[error("request to {url} returned an empty body")]
    EmptyBody {
        /// Fully qualified request URL.
        url: String,
    },
    /// A configured endpoint is not a valid URL.
    #[error("invalid endpoint {url}: {source}")]
    InvalidUrl {
        /// Rejected URL text.
        url: String,
        /// Parser error.
        source: url::ParseError,
    },
}

/// Fetches raw tile bytes.
#[async_trait(?Send)]
pub trait TileTransport {
    /// Fetch the body at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError>;
}

/// `reqwest`-backed transport for tiles and Overpass queries.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    user_agent: String,
    overpass_url: Url,
}

impl HttpTransport {
    /// Build a transport with the given per-request timeout.
    ///
    /// # Errors
    /// Returns [`TransportError::Network`] when the HTTP client cannot be
    /// initialised.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .map_err(|err| convert_reqwest_error(err, "client"))?;
        let overpass_url = Url::parse(DEFAULT_OVERPASS_URL).map_err(|source| {
            TransportError::InvalidUrl {
                url: DEFAULT_OVERPASS_URL.to_owned(),
                source,
            }
        })?;
        Ok(Self {
            client,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            overpass_url,
        })
    }

    /// Override the default user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Point Overpass queries at another interpreter.
    ///
    /// # Errors
    /// Returns [`TransportError::InvalidUrl`] when `url` does not parse.
    pub fn with_overpass_url(mut self, url: &str) -> Result<Self, TransportError> {
        self.overpass_url = Url::parse(url).map_err(|source| TransportError::InvalidUrl {
            url: url.to_owned(),
            source,
        })?;
        Ok(self)
    }

    /// Overpass endpoint used by [`crate::OverpassSource::query`].
    #[must_use]
    pub const fn overpass_url(&self) -> &Url {
        &self.overpass_url
    }

    pub(crate) async fn post_query(&self, query: &str) -> Result<Vec<u8>, TransportError> {
        let url = self.overpass_url.as_str();
        let response = self
            .client
            .post(url)
            .header(USER_AGENT, self.user_agent.as_str())
            .body(query.to_owned())
            .send()
            .await
            .map_err(|err| convert_reqwest_error(err, url))?
            .error_for_status()
            .map_err(|err| convert_reqwest_error(err, url))?;
        let body = response
            .bytes()
            .await
            .map_err(|err| convert_reqwest_error(err, url))?;
        Ok(body.to_vec())
    }
}

#[async_trait(?Send)]
impl TileTransport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, self.user_agent.as_str())
            .send()
            .await
            .map_err(|err| convert_reqwest_error(err, url))?
            .error_for_status()
            .map_err(|err| convert_reqwest_error(err, url))?;
        let body = response
            .bytes()
            .await
            .map_err(|err| convert_reqwest_error(err, url))?;
        if body.is_empty() {
            return Err(TransportError::EmptyBody {
                url: url.to_owned(),
            });
        }
        Ok(body.to_vec())
    }
}

fn convert_reqwest_error(error: reqwest::Error, url: &str) -> TransportError {
    if let Some(status) = error.status() {
        return TransportError::Http {
            url: url.to_owned(),
            status: status.as_u16(),
            message: error.to_string(),
        };
    }

    let kind = if error.is_timeout() {
        io::ErrorKind::TimedOut
    } else {
        io::ErrorKind::Other
    };
    TransportError::Network {
        url: url.to_owned(),
        source: io::Error::new(kind, error),
    }
}
