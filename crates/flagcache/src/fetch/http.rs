//! Support to fetch feature definitions from an HTTP delivery API.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url, header};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::caching::RefreshError;
use crate::config::Config;
use crate::types::{Feature, FeatureSet};

use super::{FetchFeatures, USER_AGENT};

/// The response envelope of the features endpoint.
#[derive(Debug, Deserialize)]
struct FeaturesEnvelope {
    #[serde(default)]
    features: BTreeMap<String, Feature>,
}

/// Fetcher implementation for an HTTP feature delivery API.
#[derive(Debug)]
pub struct HttpFeatureFetcher {
    client: Client,
    url: Url,
    headers: BTreeMap<String, String>,
}

impl HttpFeatureFetcher {
    /// Creates a fetcher for the features endpoint named by `config`.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.fetch_timeout)
            .build()?;

        Ok(HttpFeatureFetcher {
            client,
            url: config.features_url()?,
            headers: config.http_headers.clone(),
        })
    }

    async fn send_request(&self) -> Result<FeatureSet, RefreshError> {
        let mut builder = self.client.get(self.url.clone());

        for (key, value) in &self.headers {
            if let Ok(key) = header::HeaderName::from_bytes(key.as_bytes()) {
                builder = builder.header(key, value.as_str());
            }
        }
        builder = builder.header(header::USER_AGENT, USER_AGENT);

        let response = builder.send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RefreshError::Fetch(format!("permission denied: {status}")));
        }
        if !status.is_success() {
            return Err(RefreshError::Fetch(format!(
                "unexpected status code: {status}"
            )));
        }

        let payload = response.bytes().await?;
        let envelope: FeaturesEnvelope = serde_json::from_slice(&payload)
            .map_err(|e| RefreshError::Malformed(e.to_string()))?;

        Ok(Arc::new(envelope.features))
    }
}

#[async_trait]
impl FetchFeatures for HttpFeatureFetcher {
    async fn fetch_features(&self, ct: &CancellationToken) -> Result<FeatureSet, RefreshError> {
        tracing::debug!("Fetching feature definitions from `{}`", self.url);

        tokio::select! {
            _ = ct.cancelled() => Err(RefreshError::Cancelled),
            result = self.send_request() => result,
        }
    }
}
