// src/fetch/http.rs

//! `reqwest`-backed [`Fetcher`].

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use reqwest::header::USER_AGENT;
use reqwest::{Client, Method, NoProxy, Proxy};
use tracing::debug;

use crate::config::ProxySection;
use crate::errors::Result;
use crate::types::HeaderValues;

use super::{FetchError, FetchRequest, FetchResult, Fetcher};

/// Production fetcher. One shared `reqwest::Client` (connection pool) for
/// all targets.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client whose requests fail after `timeout`, optionally sent
    /// through `proxy`.
    pub fn new(timeout: Duration, proxy: Option<&ProxySection>) -> Result<Self> {
        let mut builder = Client::builder().timeout(timeout);
        if let Some(p) = proxy {
            builder = builder.proxy(build_proxy(p)?);
            debug!(proxy = %p.url, "requests go through proxy");
        }
        let client = builder.build()?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn fetch_inner(&self, request: &FetchRequest) -> std::result::Result<FetchResult, FetchError> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|e| {
            FetchError::Transport {
                url: request.url.clone(),
                message: format!("could not create {} request: {e}", request.method),
            }
        })?;

        let mut builder = self
            .client
            .request(method, &request.url)
            .header(USER_AGENT, &request.user_agent);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let start = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(&request.url, e))?;
        let duration = start.elapsed();

        let status = response.status().as_u16();
        let mut headers = HeaderValues::new();
        for (name, value) in response.headers().iter() {
            headers
                .entry(name.as_str().to_string())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&request.url, e))?
            .to_vec();

        debug!(
            url = %request.url,
            status,
            bodylen = body.len(),
            duration_ms = duration.as_millis() as u64,
            "fetched"
        );

        Ok(FetchResult {
            status,
            headers,
            duration,
            body,
        })
    }
}

fn build_proxy(section: &ProxySection) -> Result<Proxy> {
    let mut proxy = Proxy::all(&section.url)?;
    if let (Some(user), Some(pass)) = (&section.username, &section.password) {
        proxy = proxy.basic_auth(user, pass);
    }
    Ok(proxy.no_proxy(NoProxy::from_string(&section.no_proxy)))
}

fn transport_error(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            message: err.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        request: &'a FetchRequest,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<FetchResult, FetchError>> + Send + 'a>>
    {
        Box::pin(self.fetch_inner(request))
    }
}
