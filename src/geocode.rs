//! Geocoding resolution with retry, backoff, and rate limiting
//!
//! Resolution walks the candidate list from most to least specific and
//! never surfaces provider failures: exhausting every candidate is a
//! legitimate terminal state (unresolved), not a fault.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::GeocodingConfig;
use crate::models::Coordinates;
use crate::providers::{GeocodingProvider, ProviderError};
use crate::rate_limit::RateGate;

/// Resolves address candidate lists to coordinates
pub struct GeocodeResolver {
    provider: Arc<dyn GeocodingProvider>,
    gate: Arc<RateGate>,
    max_retries: u32,
    backoff: Duration,
}

impl GeocodeResolver {
    /// Create a resolver with explicit retry settings
    pub fn new(
        provider: Arc<dyn GeocodingProvider>,
        gate: Arc<RateGate>,
        max_retries: u32,
        backoff: Duration,
    ) -> Self {
        Self {
            provider,
            gate,
            max_retries,
            backoff,
        }
    }

    /// Create a resolver from configuration
    pub fn from_config(
        provider: Arc<dyn GeocodingProvider>,
        gate: Arc<RateGate>,
        config: &GeocodingConfig,
    ) -> Self {
        Self::new(
            provider,
            gate,
            config.max_retries,
            Duration::from_secs(config.backoff_seconds.into()),
        )
    }

    /// Resolve a candidate list to coordinates; first success wins.
    ///
    /// Returns `None` when every candidate and retry is exhausted. An empty
    /// candidate list short-circuits without calling the provider.
    #[instrument(skip(self, candidates), fields(candidates = candidates.len()))]
    pub async fn resolve(&self, candidates: &[String]) -> Option<Coordinates> {
        if candidates.is_empty() {
            debug!("No address candidates, skipping resolution");
            return None;
        }

        for candidate in candidates {
            if let Some(coordinates) = self.try_candidate(candidate).await {
                debug!(
                    "Resolved '{}' to {}",
                    candidate,
                    coordinates.format()
                );
                return Some(coordinates);
            }
        }

        debug!("All candidates exhausted, leaving unresolved");
        None
    }

    /// Attempt one candidate, retrying timeouts up to `max_retries` times.
    /// Any non-timeout failure abandons the candidate immediately.
    async fn try_candidate(&self, candidate: &str) -> Option<Coordinates> {
        for attempt in 1..=self.max_retries {
            self.gate.acquire().await;

            match self.provider.geocode(candidate).await {
                Ok(Some(coordinates)) => return Some(coordinates),
                Ok(None) => {
                    debug!("No fix for '{}', advancing to next candidate", candidate);
                    return None;
                }
                Err(ProviderError::Timeout(e)) => {
                    warn!(
                        "Geocoding timeout for '{}' (attempt {}/{}): {}",
                        candidate, attempt, self.max_retries, e
                    );
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
                Err(e) => {
                    warn!("Abandoning candidate '{}': {}", candidate, e);
                    return None;
                }
            }
        }

        None
    }
}
