//! Upstream Tool Providers
//!
//! Inference providers invoked only after a quota check passes. The gateway
//! proxies the request body through and returns the provider's JSON; it adds
//! no retry or timeout policy beyond the HTTP client's defaults.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::quota::key::Resource;

/// Downstream inference provider seam.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// Whether this backend can serve the given tool.
    fn supports(&self, resource: Resource) -> bool;

    /// Forward a tool request and return the provider's JSON response.
    async fn run(&self, resource: Resource, payload: Value) -> Result<Value>;
}

/// HTTP proxy to per-tool provider URLs.
pub struct HttpBackend {
    client: reqwest::Client,
    urls: HashMap<Resource, String>,
}

impl HttpBackend {
    pub fn new(urls: HashMap<Resource, String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            urls,
        }
    }
}

#[async_trait]
impl ToolBackend for HttpBackend {
    fn supports(&self, resource: Resource) -> bool {
        self.urls.contains_key(&resource)
    }

    async fn run(&self, resource: Resource, payload: Value) -> Result<Value> {
        let url = self
            .urls
            .get(&resource)
            .with_context(|| format!("no upstream configured for {}", resource))?;

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("upstream request for {} failed", resource))?;

        let response = response
            .error_for_status()
            .with_context(|| format!("upstream for {} returned an error status", resource))?;

        response
            .json()
            .await
            .with_context(|| format!("upstream for {} returned invalid JSON", resource))
    }
}
