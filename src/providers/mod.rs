//! Provider abstractions for the external services the pipeline orchestrates
//!
//! The core never binds to concrete services directly; it consumes these
//! traits and tolerates their failures per the error taxonomy below. The
//! concrete HTTP bindings live in the submodules.

pub mod gemini;
pub mod ip_location;
pub mod serpapi;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{Coordinates, Event, EventDate, TicketLink, Venue};

pub use gemini::GeminiClient;
pub use ip_location::IpApiClient;
pub use serpapi::SerpApiClient;

/// Failure taxonomy at the provider boundary.
///
/// Timeouts are retried per component policy; everything else causes the
/// current unit of work (candidate, page, model call) to be abandoned while
/// the pipeline continues with partial data.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider timed out: {0}")]
    Timeout(String),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// One page of raw search results. A response with no `events_results`
/// key is treated as an empty page.
#[derive(Debug, Default, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub events_results: Vec<RawEvent>,
}

/// Raw event record as returned by the search provider
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    pub title: String,
    #[serde(default)]
    pub date: Option<RawEventDate>,
    #[serde(default)]
    pub address: Vec<String>,
    #[serde(default)]
    pub venue: Option<RawVenue>,
    #[serde(default)]
    pub ticket_info: Vec<RawTicketInfo>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEventDate {
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub when: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawVenue {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub reviews: Option<u32>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTicketInfo {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub link_type: Option<String>,
}

impl From<RawEvent> for Event {
    fn from(raw: RawEvent) -> Self {
        Event {
            title: raw.title,
            date: raw
                .date
                .map(|d| EventDate {
                    start_date: d.start_date,
                    when: d.when,
                })
                .unwrap_or_default(),
            address: raw.address,
            venue: raw.venue.map(|v| Venue {
                name: v.name,
                rating: v.rating,
                reviews: v.reviews,
                link: v.link,
            }),
            ticket_links: raw
                .ticket_info
                .into_iter()
                .map(|t| TicketLink {
                    source: t.source,
                    link: t.link,
                    link_type: t.link_type,
                })
                .collect(),
            description: raw.description,
            link: raw.link,
            thumbnail: raw.thumbnail,
            coordinates: None,
            category: None,
        }
    }
}

/// Result of an IP geolocation lookup
#[derive(Debug, Clone, Deserialize)]
pub struct IpLocation {
    pub city: Option<String>,
    pub region: Option<String>,
}

impl IpLocation {
    /// "City, Region" string, only when both parts are known
    #[must_use]
    pub fn region_string(&self) -> Option<String> {
        match (&self.city, &self.region) {
            (Some(city), Some(region)) if !city.is_empty() && !region.is_empty() => {
                Some(format!("{city}, {region}"))
            }
            _ => None,
        }
    }
}

/// Paginated event search
#[async_trait]
pub trait EventSearchProvider: Send + Sync {
    async fn search(&self, query: &str, offset: u32) -> ProviderResult<SearchPage>;
}

/// Address-to-coordinates resolution. `Ok(None)` means the provider
/// answered but found no fix for the address.
#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    async fn geocode(&self, address: &str) -> ProviderResult<Option<Coordinates>>;
}

/// Free-form text generation. No structural guarantee on the output.
#[async_trait]
pub trait GenerativeTextProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> ProviderResult<String>;
}

/// IP-based caller location. `Ok(None)` means the lookup answered but
/// could not place the caller.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn locate(&self) -> ProviderResult<Option<IpLocation>>;
}
