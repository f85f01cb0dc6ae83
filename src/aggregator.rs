//! Event aggregation across paginated search results
//!
//! Issues a fixed number of paginated queries, merges pages in request
//! order, deduplicates on `(title, start_date)` since the provider has no
//! upstream dedup key, and drives geocoding resolution for every event.
//! Page failures are logged and skipped; an empty result set is a valid
//! output, not an error.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::address::address_candidates;
use crate::config::SearchConfig;
use crate::geocode::GeocodeResolver;
use crate::models::{Coordinates, Event};
use crate::providers::{EventSearchProvider, LocationProvider};

/// Location keyword that triggers IP-based detection
pub const CURRENT_LOCATION: &str = "current";

/// Aggregates and enriches event listings for one location/date query
pub struct EventAggregator {
    search: Arc<dyn EventSearchProvider>,
    location: Arc<dyn LocationProvider>,
    resolver: Arc<GeocodeResolver>,
    pages: u32,
    page_size: u32,
    workers: usize,
    fallback_region: String,
}

impl EventAggregator {
    /// Create an aggregator from configuration
    pub fn new(
        search: Arc<dyn EventSearchProvider>,
        location: Arc<dyn LocationProvider>,
        resolver: Arc<GeocodeResolver>,
        config: &SearchConfig,
    ) -> Self {
        Self {
            search,
            location,
            resolver,
            pages: config.pages,
            page_size: config.page_size,
            workers: config.workers.max(1) as usize,
            fallback_region: config.fallback_region.clone(),
        }
    }

    /// Resolve the effective region for a query. `"current"` triggers IP
    /// detection; anything else passes through unchanged.
    pub async fn resolve_region(&self, location: &str) -> String {
        if location == CURRENT_LOCATION {
            self.detect_region().await
        } else {
            location.to_string()
        }
    }

    /// Aggregate events for a location and date range.
    ///
    /// Always returns the best-effort aggregate: failed pages are skipped,
    /// unresolvable events keep `coordinates: None`, and cancellation
    /// returns whatever has been collected so far.
    #[instrument(skip(self, cancel))]
    pub async fn aggregate(
        &self,
        location: &str,
        date_range: &str,
        cancel: &CancellationToken,
    ) -> Vec<Event> {
        let region = self.resolve_region(location).await;

        info!("Aggregating events in {} on {}", region, date_range);
        let query = format!("Events in {region} on {date_range}");

        let mut events: Vec<Event> = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for page in 0..self.pages {
            if cancel.is_cancelled() {
                warn!("Aggregation cancelled after {} pages", page);
                return events;
            }

            let offset = page * self.page_size;
            match self.search.search(&query, offset).await {
                Ok(result) => {
                    for raw in result.events_results {
                        let event = Event::from(raw);
                        if seen.insert(event.dedup_key()) {
                            events.push(event);
                        }
                    }
                }
                Err(e) => {
                    warn!("Page {} fetch failed, skipping: {}", page, e);
                }
            }
        }

        info!("Merged {} unique events across pages", events.len());
        self.resolve_all(&mut events, cancel).await;
        events
    }

    /// Detect the caller's region via IP geolocation, falling back to the
    /// configured default region rather than failing the aggregation.
    async fn detect_region(&self) -> String {
        match self.location.locate().await {
            Ok(Some(location)) => {
                if let Some(region) = location.region_string() {
                    debug!("Detected location: {}", region);
                    return region;
                }
                warn!(
                    "IP lookup returned incomplete location, using fallback region '{}'",
                    self.fallback_region
                );
                self.fallback_region.clone()
            }
            Ok(None) => {
                warn!(
                    "IP lookup could not place the caller, using fallback region '{}'",
                    self.fallback_region
                );
                self.fallback_region.clone()
            }
            Err(e) => {
                warn!(
                    "IP lookup failed ({}), using fallback region '{}'",
                    e, self.fallback_region
                );
                self.fallback_region.clone()
            }
        }
    }

    /// Resolve coordinates for every event on a bounded worker pool.
    ///
    /// Results are written back by index, so first-seen order is preserved
    /// regardless of completion order.
    async fn resolve_all(&self, events: &mut [Event], cancel: &CancellationToken) {
        let tasks: Vec<_> = events
            .iter()
            .enumerate()
            .map(|(idx, event)| {
                let candidates = address_candidates(&event.address);
                let resolver = Arc::clone(&self.resolver);
                let cancel = cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        return (idx, None);
                    }
                    (idx, resolver.resolve(&candidates).await)
                }
            })
            .collect();
        let resolved: Vec<(usize, Option<Coordinates>)> = stream::iter(tasks)
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let mut hits = 0usize;
        for (idx, coordinates) in resolved {
            if coordinates.is_some() {
                hits += 1;
            }
            events[idx].coordinates = coordinates;
        }

        info!("Resolved coordinates for {}/{} events", hits, events.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::providers::{
        GeocodingProvider, IpLocation, ProviderError, ProviderResult, RawEvent, SearchPage,
    };
    use crate::rate_limit::RateGate;

    fn raw_event(title: &str, start_date: &str, city: &str) -> RawEvent {
        serde_json::from_value(serde_json::json!({
            "title": title,
            "date": {"start_date": start_date, "when": start_date},
            "address": [format!("{title} Hall"), city],
        }))
        .unwrap()
    }

    /// Search provider serving a fixed page list; out-of-range offsets are
    /// empty pages, negative scripts are unavailable pages.
    struct ScriptedSearch {
        pages: Vec<Option<Vec<RawEvent>>>,
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventSearchProvider for ScriptedSearch {
        async fn search(&self, query: &str, offset: u32) -> ProviderResult<SearchPage> {
            self.queries.lock().unwrap().push(query.to_string());
            let index = (offset / 10) as usize;
            match self.pages.get(index) {
                Some(Some(events)) => Ok(SearchPage {
                    events_results: events.clone(),
                }),
                Some(None) => Err(ProviderError::Unavailable("page down".to_string())),
                None => Ok(SearchPage::default()),
            }
        }
    }

    struct ScriptedLocation {
        result: ProviderResult<Option<IpLocation>>,
    }

    #[async_trait]
    impl LocationProvider for ScriptedLocation {
        async fn locate(&self) -> ProviderResult<Option<IpLocation>> {
            match &self.result {
                Ok(v) => Ok(v.clone()),
                Err(_) => Err(ProviderError::Unavailable("down".to_string())),
            }
        }
    }

    /// Geocoder that resolves any address mentioning "Austin"
    struct CityGeocoder;

    #[async_trait]
    impl GeocodingProvider for CityGeocoder {
        async fn geocode(&self, address: &str) -> ProviderResult<Option<Coordinates>> {
            if address.contains("Austin") {
                Ok(Some(Coordinates::new(30.2672, -97.7431)))
            } else {
                Ok(None)
            }
        }
    }

    fn aggregator(
        pages: Vec<Option<Vec<RawEvent>>>,
        location: ProviderResult<Option<IpLocation>>,
    ) -> (EventAggregator, Arc<ScriptedSearch>) {
        let search = Arc::new(ScriptedSearch {
            pages,
            queries: Mutex::new(Vec::new()),
        });
        let resolver = Arc::new(GeocodeResolver::new(
            Arc::new(CityGeocoder),
            Arc::new(RateGate::new(Duration::from_millis(10))),
            3,
            Duration::from_secs(2),
        ));
        let config = crate::config::EventopiaConfig::default().search;
        let aggregator = EventAggregator::new(
            Arc::clone(&search) as Arc<dyn EventSearchProvider>,
            Arc::new(ScriptedLocation { result: location }),
            resolver,
            &config,
        );
        (aggregator, search)
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_pages_are_deduplicated() {
        let shared = raw_event("Jazz Night", "Mar 15", "Austin, TX");
        let pages = vec![
            Some(vec![shared.clone(), raw_event("Art Walk", "Mar 15", "Austin, TX")]),
            Some(vec![shared, raw_event("Food Fair", "Mar 16", "Nowhere, ZZ")]),
        ];
        let (aggregator, _) = aggregator(pages, Ok(None));
        let cancel = CancellationToken::new();
        let events = aggregator.aggregate("Austin, Texas", "Mar 15", &cancel).await;

        let titles: Vec<&str> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Jazz Night", "Art Walk", "Food Fair"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_page_is_skipped() {
        let pages = vec![
            Some(vec![raw_event("Jazz Night", "Mar 15", "Austin, TX")]),
            None,
            Some(vec![raw_event("Food Fair", "Mar 16", "Austin, TX")]),
        ];
        let (aggregator, _) = aggregator(pages, Ok(None));
        let cancel = CancellationToken::new();
        let events = aggregator.aggregate("Austin, Texas", "Mar 15", &cancel).await;
        assert_eq!(events.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_result_set_is_valid() {
        let (aggregator, _) = aggregator(vec![], Ok(None));
        let cancel = CancellationToken::new();
        let events = aggregator.aggregate("Austin, Texas", "Mar 15", &cancel).await;
        assert!(events.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_location_is_detected() {
        let pages = vec![Some(vec![raw_event("Jazz Night", "Mar 15", "Austin, TX")])];
        let (aggregator, search) = aggregator(
            pages,
            Ok(Some(IpLocation {
                city: Some("Austin".to_string()),
                region: Some("Texas".to_string()),
            })),
        );
        let cancel = CancellationToken::new();
        aggregator.aggregate(CURRENT_LOCATION, "Mar 15", &cancel).await;

        let queries = search.queries.lock().unwrap();
        assert!(queries[0].contains("Austin, Texas"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_failure_falls_back_to_default_region() {
        let pages = vec![Some(vec![raw_event("Jazz Night", "Mar 15", "Austin, TX")])];
        let (aggregator, search) =
            aggregator(pages, Err(ProviderError::Unavailable("down".to_string())));
        let cancel = CancellationToken::new();
        aggregator.aggregate(CURRENT_LOCATION, "Mar 15", &cancel).await;

        let queries = search.queries.lock().unwrap();
        assert!(queries[0].contains("USA"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_coordinates_are_written_back_in_first_seen_order() {
        let pages = vec![Some(vec![
            raw_event("Jazz Night", "Mar 15", "Austin, TX"),
            raw_event("Mystery Show", "Mar 15", "Nowhere, ZZ"),
            raw_event("Food Fair", "Mar 16", "Austin, TX"),
        ])];
        let (aggregator, _) = aggregator(pages, Ok(None));
        let cancel = CancellationToken::new();
        let events = aggregator.aggregate("Austin, Texas", "Mar 15", &cancel).await;

        assert_eq!(events[0].title, "Jazz Night");
        assert!(events[0].coordinates.is_some());
        assert_eq!(events[1].title, "Mystery Show");
        assert!(events[1].coordinates.is_none());
        assert_eq!(events[2].title, "Food Fair");
        assert!(events[2].coordinates.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_region_passes_explicit_location_through() {
        let (aggregator, _) = aggregator(
            vec![],
            Ok(Some(IpLocation {
                city: Some("Austin".to_string()),
                region: Some("Texas".to_string()),
            })),
        );
        assert_eq!(
            aggregator.resolve_region("Portland, Oregon").await,
            "Portland, Oregon"
        );
        assert_eq!(
            aggregator.resolve_region(CURRENT_LOCATION).await,
            "Austin, Texas"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_token_returns_partial_aggregate() {
        let pages = vec![Some(vec![raw_event("Jazz Night", "Mar 15", "Austin, TX")])];
        let (aggregator, search) = aggregator(pages, Ok(None));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let events = aggregator.aggregate("Austin, Texas", "Mar 15", &cancel).await;
        assert!(events.is_empty());
        assert!(search.queries.lock().unwrap().is_empty());
    }
}
