use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;
use url::Url;

use super::errors::{RevokeError, RevokeResult};

/// Response of a blocking HTTP exchange
pub struct HttpResponse {
    pub status: u16,
    pub body: Box<dyn Read + Send>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: Box::new(io::Cursor::new(body.into())),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Blocking HTTP transport used for issuer, CRL and OCSP fetches.
///
/// Timeouts are the implementation's business; the checker never retries.
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    fn get(&self, url: &str) -> RevokeResult<HttpResponse>;

    fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> RevokeResult<HttpResponse>;
}

impl HttpClient for Client {
    fn get(&self, url: &str) -> RevokeResult<HttpResponse> {
        debug!("GET {}", url);
        let response = Client::get(self, parse_url(url)?).send()?;
        Ok(HttpResponse {
            status: response.status().as_u16(),
            body: Box::new(response),
        })
    }

    fn post(&self, url: &str, content_type: &str, body: Vec<u8>) -> RevokeResult<HttpResponse> {
        debug!("POST {} ({} bytes)", url, body.len());
        let response = Client::post(self, parse_url(url)?)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()?;
        Ok(HttpResponse {
            status: response.status().as_u16(),
            body: Box::new(response),
        })
    }
}

fn parse_url(url: &str) -> RevokeResult<Url> {
    Url::parse(url).map_err(|e| RevokeError::InvalidUrl(format!("{url}: {e}")))
}

/// Build the default blocking client
pub fn default_client(timeout: Duration, user_agent: &str) -> RevokeResult<Client> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()?)
}

/// Reads a response body into memory
pub type BodyReader = Arc<dyn Fn(&mut dyn Read) -> io::Result<Vec<u8>> + Send + Sync>;

/// Reader that consumes the whole body
pub fn read_to_end() -> BodyReader {
    Arc::new(|body: &mut dyn Read| {
        let mut buf = Vec::new();
        body.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

/// Reader that fails on bodies larger than `max_bytes`
pub fn limited(max_bytes: u64) -> BodyReader {
    Arc::new(move |body: &mut dyn Read| {
        let mut buf = Vec::new();
        body.take(max_bytes.saturating_add(1)).read_to_end(&mut buf)?;
        if buf.len() as u64 > max_bytes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("response body exceeds {max_bytes} bytes"),
            ));
        }
        Ok(buf)
    })
}
