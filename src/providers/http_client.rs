//! Pooled HTTP client owned by each provider instance
//!
//! Wraps `reqwest::Client` with the provider's base URL, timeout and a set of
//! default headers that adapters may adjust at runtime (auth tokens etc).

use bytes::Bytes;
use reqwest::{Client, RequestBuilder};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

use crate::errors::{NetworkError, NetworkResult};

const MAX_IDLE_PER_HOST: usize = 10;
const IDLE_TIMEOUT: Duration = Duration::from_secs(90);

pub struct ProviderHttpClient {
    client: Client,
    base_url: String,
    headers: RwLock<HashMap<String, String>>,
}

impl ProviderHttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> NetworkResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .pool_idle_timeout(IDLE_TIMEOUT)
            .build()
            .map_err(|e| NetworkError::ClientBuild {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers: RwLock::new(HashMap::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        let mut headers = self.headers.write().unwrap_or_else(|e| e.into_inner());
        headers.insert(name.into(), value.into());
    }

    pub fn default_headers(&self) -> HashMap<String, String> {
        self.headers.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Absolute URLs pass through; anything else is appended to the base URL
    pub fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    pub async fn get(&self, path: &str, params: &[(&str, &str)]) -> NetworkResult<Bytes> {
        self.get_with_headers(path, params, &[]).await
    }

    pub async fn get_with_headers(
        &self,
        path: &str,
        params: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> NetworkResult<Bytes> {
        let url = self.resolve_url(path);
        let request = self.client.get(&url).query(params);
        self.execute(&url, request, headers).await
    }

    async fn execute(
        &self,
        url: &str,
        mut request: RequestBuilder,
        headers: &[(&str, &str)],
    ) -> NetworkResult<Bytes> {
        for (name, value) in self.default_headers() {
            request = request.header(name, value);
        }
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        debug!("HTTP request: {}", url);
        let response = request
            .send()
            .await
            .map_err(|e| NetworkError::from_reqwest(url, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::from_reqwest(url, e))?;

        if !status.is_success() {
            return Err(NetworkError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        debug!("HTTP {} from {} ({} bytes)", status.as_u16(), url, body.len());
        Ok(body)
    }
}
