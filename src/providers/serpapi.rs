//! SerpAPI bindings for event search and geocoding
//!
//! One client serves both capabilities: the `google_events` engine for
//! paginated event listings and the `google_maps` engine for resolving an
//! address string to coordinates.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{
    EventSearchProvider, GeocodingProvider, ProviderError, ProviderResult, SearchPage,
};
use crate::config::EventopiaConfig;
use crate::models::Coordinates;

/// SerpAPI client
pub struct SerpApiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MapsResponse {
    #[serde(default)]
    place_results: Option<PlaceResults>,
}

#[derive(Debug, Deserialize)]
struct PlaceResults {
    #[serde(default)]
    gps_coordinates: Option<GpsCoordinates>,
}

#[derive(Debug, Deserialize)]
struct GpsCoordinates {
    latitude: f64,
    longitude: f64,
}

impl SerpApiClient {
    /// Create a new client from configuration
    pub fn new(config: &EventopiaConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.search.timeout_seconds.into()))
            .user_agent("Eventopia/0.1.0")
            .build()?;

        Ok(Self {
            client,
            api_key: config.search.api_key.clone().unwrap_or_default(),
            base_url: config.search.base_url.clone(),
        })
    }

    fn map_request_error(e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else {
            ProviderError::Unavailable(e.to_string())
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        params: &[(&str, &str)],
    ) -> ProviderResult<T> {
        let url = format!("{}/search.json", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Unavailable(format!(
                "SerpAPI returned {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(format!("failed to parse SerpAPI response: {e}")))
    }
}

#[async_trait]
impl EventSearchProvider for SerpApiClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, offset: u32) -> ProviderResult<SearchPage> {
        debug!("Searching events: '{}' (offset {})", query, offset);

        let offset = offset.to_string();
        let page: SearchPage = self
            .get_json(&[
                ("engine", "google_events"),
                ("q", query),
                ("hl", "en"),
                ("gl", "us"),
                ("start", offset.as_str()),
            ])
            .await?;

        debug!("Search returned {} raw events", page.events_results.len());
        Ok(page)
    }
}

#[async_trait]
impl GeocodingProvider for SerpApiClient {
    #[instrument(skip(self))]
    async fn geocode(&self, address: &str) -> ProviderResult<Option<Coordinates>> {
        debug!("Geocoding address: '{}'", address);

        let response: MapsResponse = self
            .get_json(&[
                ("engine", "google_maps"),
                ("type", "search"),
                ("q", address),
                ("google_domain", "google.com"),
            ])
            .await?;

        let coordinates = response
            .place_results
            .and_then(|p| p.gps_coordinates)
            .map(|gps| Coordinates::new(gps.latitude, gps.longitude));

        if coordinates.is_none() {
            warn!("No coordinates in maps response for '{}'", address);
        }

        Ok(coordinates)
    }
}
