use super::{ByteStream, MediaFetcher};
use crate::config::UpstreamConfig;
use anyhow::Context;
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, RANGE};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tubeproxy_common::{ByteRange, Error, ProbeInfo, Result};

/// [`MediaFetcher`] backed by a shared reqwest connection pool.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    probe_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder().connect_timeout(config.connect_timeout());

        if let Some(ref proxy_url) = config.proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url)
                .with_context(|| format!("Invalid upstream proxy URL: {proxy_url}"))?;
            builder = builder.proxy(proxy);
            tracing::info!("Routing media fetches through proxy {}", proxy_url);
        }

        if let Some(ref user_agent) = config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder
            .build()
            .context("Failed to build upstream HTTP client")?;

        Ok(Self {
            client,
            probe_timeout: config.probe_timeout(),
        })
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch_head(&self, url: &str) -> Result<ProbeInfo> {
        let response = self
            .client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| Error::internal(format!("Upstream probe failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            // An error page's length is not the media's length
            tracing::warn!(%status, "Upstream probe returned non-success status");
            return Ok(ProbeInfo::default());
        }

        // Read the header directly: Response::content_length() reflects the
        // (empty) HEAD body, not the resource.
        let headers = response.headers();
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        Ok(ProbeInfo {
            content_length,
            content_type,
        })
    }

    async fn fetch_body(
        &self,
        url: &str,
        range: Option<ByteRange>,
        cancel: CancellationToken,
    ) -> Result<ByteStream> {
        let mut request = self.client.get(url);
        if let Some(range) = range {
            request = request.header(RANGE, range.header_value());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::upstream(format!("Payload request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::upstream(format!("Upstream returned {status}")));
        }
        if range.is_some() && status != StatusCode::PARTIAL_CONTENT {
            return Err(Error::upstream(format!(
                "Upstream ignored Range request (status {status})"
            )));
        }

        let stream = response
            .bytes_stream()
            .map_err(|e| Error::upstream(format!("Upstream read failed: {e}")))
            .take_until(async move { cancel.cancelled().await });

        Ok(stream.boxed())
    }
}
