use log::debug;
use reqwest::{Client, StatusCode};
use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Why a sheet export could not be downloaded
#[derive(Debug)]
pub enum FetchError {
    /// The server answered with something other than 200 OK
    Status(StatusCode),

    /// Connection, TLS, timeout or body read failure
    Transport(reqwest::Error),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Status(status) => write!(f, "remote answered {}", status),
            FetchError::Transport(e) => write!(f, "request failed: {}", e),
        }
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FetchError::Status(_) => None,
            FetchError::Transport(e) => Some(e),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e)
    }
}

/// Downloads published sheet exports over HTTP
///
/// Wraps one `reqwest::Client` so connections are pooled across queries.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Build a fetcher, optionally bounding each request by `timeout`
    pub fn new(timeout: Option<Duration>) -> Result<Self, FetchError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::from_client(builder.build()?))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// GET `url` and return the body bytes as received
    ///
    /// Only `200 OK` counts as success. No charset decoding happens here, so a
    /// leading BOM or odd bytes reach the cache file unchanged.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
