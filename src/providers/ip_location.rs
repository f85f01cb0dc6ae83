//! IP geolocation binding for detecting the caller's region

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{IpLocation, LocationProvider, ProviderError, ProviderResult};

const DEFAULT_BASE_URL: &str = "http://ip-api.com";

/// ip-api.com client
pub struct IpApiClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    city: Option<String>,
    #[serde(default, rename = "regionName")]
    region_name: Option<String>,
}

impl IpApiClient {
    /// Create a new client
    pub fn new() -> anyhow::Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    /// Create a new client with a custom base URL
    pub fn with_base_url(base_url: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("Eventopia/0.1.0")
            .build()?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl LocationProvider for IpApiClient {
    #[instrument(skip(self))]
    async fn locate(&self) -> ProviderResult<Option<IpLocation>> {
        let url = format!("{}/json", self.base_url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Unavailable(format!(
                "IP geolocation service returned {status}"
            )));
        }

        let response: IpApiResponse = response.json().await.map_err(|e| {
            ProviderError::Malformed(format!("failed to parse IP geolocation response: {e}"))
        })?;

        if response.status != "success" {
            debug!("IP geolocation lookup did not succeed: {}", response.status);
            return Ok(None);
        }

        Ok(Some(IpLocation {
            city: response.city,
            region: response.region_name,
        }))
    }
}
