use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;

use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Single GET with a per-request timeout and caller supplied headers.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get(
        &self,
        url: &str,
        timeout: Duration,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse>;
}

pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn get(
        &self,
        url: &str,
        timeout: Duration,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| AppError::Config(format!("bad header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| AppError::Config(format!("bad header value {}: {}", value, e)))?;
            header_map.insert(name, value);
        }

        let response = self
            .client
            .get(url)
            .headers(header_map)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Serves canned responses and records every request it receives.
    #[derive(Default)]
    pub struct FakeFetcher {
        responses: HashMap<String, (u16, Vec<u8>)>,
        requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl FakeFetcher {
        pub fn with(mut self, url: &str, status: u16, body: &[u8]) -> Self {
            self.responses
                .insert(url.to_string(), (status, body.to_vec()));
            self
        }

        pub fn requested_urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|(url, _)| url.clone())
                .collect()
        }

        pub fn headers_for(&self, url: &str) -> Vec<(String, String)> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .find(|(u, _)| u == url)
                .map(|(_, h)| h.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl HttpFetch for FakeFetcher {
        async fn get(
            &self,
            url: &str,
            _timeout: Duration,
            headers: &[(&str, &str)],
        ) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push((
                url.to_string(),
                headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ));

            match self.responses.get(url) {
                Some((status, body)) => Ok(HttpResponse {
                    status: *status,
                    body: Bytes::from(body.clone()),
                }),
                None => Err(AppError::Other(anyhow::anyhow!(
                    "connection refused: {}",
                    url
                ))),
            }
        }
    }
}
