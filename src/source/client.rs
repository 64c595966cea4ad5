//! Blocking HTTP client shared by the content source and the download manager.

use crate::download::ImageFetch;
use crate::source::SourceError;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const DEFAULT_REFERER: &str = "https://www.bilibili.com/";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_REDIRECTS: usize = 10;

/// Blocking HTTP client with browser-like headers. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Single GET request. No retry.
    pub fn get(&self, url: &str) -> Result<reqwest::blocking::Response, reqwest::Error> {
        self.inner.get(url).send()
    }

    /// GET `url` and return the body as text; non-success status is an error.
    pub fn get_text(&self, url: &str, context: &str) -> Result<String, SourceError> {
        let response = self.get(url).map_err(|e| SourceError::Network {
            url: url.to_string(),
            source: e,
        })?;
        let response = check_status(response, url, Some(context))?;
        response
            .text()
            .map_err(|e| SourceError::BodyRead { source: e })
    }

    /// GET `url` and return the raw body; non-success status is an error.
    pub fn get_bytes(&self, url: &str) -> Result<Vec<u8>, SourceError> {
        let response = self.get(url).map_err(|e| SourceError::Network {
            url: url.to_string(),
            source: e,
        })?;
        let response = check_status(response, url, Some("image"))?;
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| SourceError::BodyRead { source: e })
    }
}

impl ImageFetch for HttpClient {
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>, SourceError> {
        self.get_bytes(url)
    }
}

fn check_status(
    response: reqwest::blocking::Response,
    url: &str,
    context: Option<&str>,
) -> Result<reqwest::blocking::Response, SourceError> {
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
            context: context.map(String::from),
        });
    }
    Ok(response)
}

/// Builder for HttpClient with optional User-Agent and timeout. The Referer is fixed;
/// the image CDN rejects hotlinks without one.
#[derive(Debug)]
pub struct HttpClientBuilder {
    user_agent: Option<String>,
    timeout_secs: u64,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl HttpClientBuilder {
    /// Set a custom User-Agent. If not set, a browser-like default is used.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<HttpClient, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::REFERER,
            reqwest::header::HeaderValue::from_static(DEFAULT_REFERER),
        );
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(HttpClient { inner })
    }
}
