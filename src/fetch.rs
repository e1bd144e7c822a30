//! HTTP fetching behind a small trait so the pipeline can run without a network.
//!
//! [`HttpFetcher`] wraps a single shared `reqwest::Client` with the configured
//! timeout and user agent. Every fetch in the process goes through it, so no
//! feed or article can stall its loop past the timeout.

use crate::error::FetchError;
use reqwest::header::CONTENT_TYPE;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Raw response body plus the metadata needed to decode it.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl FetchedPage {
    /// The `charset` parameter of the `Content-Type` header, if any.
    pub fn charset(&self) -> Option<&str> {
        self.content_type.as_deref().and_then(|ct| {
            ct.split(';').skip(1).find_map(|param| {
                let (key, value) = param.split_once('=')?;
                key.trim()
                    .eq_ignore_ascii_case("charset")
                    .then(|| value.trim().trim_matches(|c: char| c == '"' || c == '\''))
            })
        })
    }
}

/// Something that can fetch a URL.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedPage, FetchError>> + Send;
}

/// [`Fetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let t0 = Instant::now();
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Non-success response");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        debug!(
            %url,
            bytes = bytes.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched document"
        );
        Ok(FetchedPage {
            url: url.to_string(),
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory [`Fetcher`] for tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct StaticFetcher {
        pages: Mutex<HashMap<String, Result<String, u16>>>,
        hits: Mutex<Vec<String>>,
    }

    impl StaticFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        /// Serve `body` for `url`.
        pub fn page(&self, url: &str, body: &str) -> &Self {
            self.pages
                .lock()
                .unwrap()
                .insert(url.to_string(), Ok(body.to_string()));
            self
        }

        /// Answer `url` with an HTTP error status.
        pub fn status(&self, url: &str, status: u16) -> &Self {
            self.pages
                .lock()
                .unwrap()
                .insert(url.to_string(), Err(status));
            self
        }

        pub fn hits(&self, url: &str) -> usize {
            self.hits.lock().unwrap().iter().filter(|u| *u == url).count()
        }
    }

    impl Fetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            self.hits.lock().unwrap().push(url.to_string());
            let page = self.pages.lock().unwrap().get(url).cloned();
            match page {
                Some(Ok(body)) => Ok(FetchedPage {
                    url: url.to_string(),
                    bytes: body.into_bytes(),
                    content_type: None,
                }),
                Some(Err(status)) => Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                }),
                // Unknown hosts behave like an unreachable server.
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 503,
                }),
            }
        }
    }
}
