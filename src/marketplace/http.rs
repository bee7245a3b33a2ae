//! reqwest-backed transport.
//!
//! Attaches the bearer token (and marketplace header when configured),
//! sends the request and parses the JSON body. Non-2xx statuses are
//! errors so the executor retries them.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{ApiRequest, HttpMethod, Transport};
use crate::config::EbayConfig;

const USER_AGENT: &str = "ebay-sniper/0.1.0";
const MARKETPLACE_HEADER: &str = "X-EBAY-C-MARKETPLACE-ID";

pub struct HttpTransport {
    http: Client,
    marketplace_id: Option<String>,
}

impl HttpTransport {
    pub fn new(cfg: &EbayConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client for eBay")?;

        Ok(Self {
            http,
            marketplace_id: cfg.marketplace_id.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    /// Any non-2xx status is an `Err`, as is a 2xx whose body is not JSON.
    ///
    /// A 2xx with an empty body is `Ok(Value::Null)`, not an error, so the
    /// executor does not retry it. A bid answered that way counts as placed.
    async fn send(&self, request: &ApiRequest, token: &SecretString) -> Result<Value> {
        debug!(method = %request.method, url = %request.url, "Sending eBay request");

        let mut builder = match request.method {
            HttpMethod::Get => self.http.get(&request.url),
            HttpMethod::Post => self.http.post(&request.url),
        };

        builder = builder.bearer_auth(token.expose_secret());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        if let Some(ref marketplace) = self.marketplace_id {
            builder = builder.header(MARKETPLACE_HEADER, marketplace);
        }

        let resp = builder
            .send()
            .await
            .with_context(|| format!("{request} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("eBay API error {status}: {body}");
        }

        let text = resp
            .text()
            .await
            .with_context(|| format!("Failed to read {request} response"))?;

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).with_context(|| format!("Failed to parse {request} response"))
    }
}
