//! Pipeline facade wiring aggregation, enrichment, and planning
//!
//! Owns the shared rate gate, the document store, and the component
//! instances. Event aggregates are cached per location/date query with a
//! jittered TTL so simultaneous expiry does not stampede the provider.

use rand::RngExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::address::address_candidates;
use crate::aggregator::EventAggregator;
use crate::categorize::Categorizer;
use crate::config::EventopiaConfig;
use crate::geocode::GeocodeResolver;
use crate::itinerary::{ItineraryPlanner, PlanOutcome};
use crate::models::{Coordinates, Event, ItineraryConstraints};
use crate::providers::{
    EventSearchProvider, GenerativeTextProvider, GeocodingProvider, LocationProvider,
};
use crate::rate_limit::RateGate;
use crate::store::DocumentStore;

const LAST_COORDINATES_KEY: &str = "coordinates:last_resolved";
const LAST_RAW_ITINERARY_KEY: &str = "itinerary:last_raw";
const USER_PREFERENCES_KEY: &str = "user:preferences";

/// Retention for bookkeeping documents unrelated to the event cache
const BOOKKEEPING_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// End-to-end event discovery and itinerary planning pipeline
pub struct EventPipeline {
    aggregator: EventAggregator,
    resolver: Arc<GeocodeResolver>,
    categorizer: Categorizer,
    planner: ItineraryPlanner,
    store: Arc<dyn DocumentStore>,
    cache_ttl: Duration,
}

impl EventPipeline {
    /// Assemble the pipeline from configuration and provider instances
    pub fn new(
        config: &EventopiaConfig,
        search: Arc<dyn EventSearchProvider>,
        geocoding: Arc<dyn GeocodingProvider>,
        generative: Arc<dyn GenerativeTextProvider>,
        location: Arc<dyn LocationProvider>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        let gate = Arc::new(RateGate::new(Duration::from_millis(
            config.geocoding.min_request_interval_ms.into(),
        )));
        let resolver = Arc::new(GeocodeResolver::from_config(
            geocoding,
            gate,
            &config.geocoding,
        ));
        let aggregator = EventAggregator::new(
            search,
            location,
            Arc::clone(&resolver),
            &config.search,
        );

        Self {
            aggregator,
            resolver,
            categorizer: Categorizer::new(Arc::clone(&generative)),
            planner: ItineraryPlanner::new(generative),
            store,
            cache_ttl: Duration::from_secs(u64::from(config.store.ttl_hours) * 3600),
        }
    }

    /// Aggregate events for a location and date range, served from the
    /// document store when a fresh aggregate exists.
    ///
    /// The cache key uses the resolved region, not the request string, so
    /// a `"current"` query never pins another network's detection result.
    #[instrument(skip(self, cancel))]
    pub async fn aggregate_events(
        &self,
        location: &str,
        date_range: &str,
        cancel: &CancellationToken,
    ) -> Vec<Event> {
        let region = self.aggregator.resolve_region(location).await;
        let key = format!("events:{region}:{date_range}");

        match self.store.get(&key).await {
            Ok(Some(value)) => {
                if let Ok(events) = serde_json::from_value::<Vec<Event>>(value) {
                    info!("Serving {} events from the store", events.len());
                    return events;
                }
                warn!("Stored aggregate is malformed, refetching");
            }
            Ok(None) => debug!("No stored aggregate for this query"),
            Err(e) => warn!("Store read failed, refetching: {}", e),
        }

        let events = self.aggregator.aggregate(&region, date_range, cancel).await;

        // Partial results from a cancelled run are not worth caching
        if !events.is_empty() && !cancel.is_cancelled() {
            let jitter: f32 = rand::rng().random_range(0.9..1.1);
            let ttl = self.cache_ttl.mul_f32(jitter);
            if let Ok(value) = serde_json::to_value(&events) {
                if let Err(e) = self.store.put(&key, value, ttl).await {
                    warn!("Failed to cache event aggregate: {}", e);
                }
            }
        }

        events
    }

    /// Resolve a free-form address (one line per element) to coordinates,
    /// remembering the most recent successful fix.
    #[instrument(skip(self, address_lines))]
    pub async fn resolve_coordinates(&self, address_lines: &[String]) -> Option<Coordinates> {
        let candidates = address_candidates(address_lines);
        let coordinates = self.resolver.resolve(&candidates).await;

        if let Some(fix) = &coordinates {
            let record = serde_json::json!({
                "coordinates": fix,
                "resolved_at": chrono::Utc::now().to_rfc3339(),
            });
            if let Err(e) = self
                .store
                .put(LAST_COORDINATES_KEY, record, BOOKKEEPING_TTL)
                .await
            {
                warn!("Failed to persist last resolved coordinates: {}", e);
            }
        }

        coordinates
    }

    /// Attach category labels to the given events
    pub async fn categorize_events(&self, events: Vec<Event>) -> Vec<Event> {
        self.categorizer.categorize(events).await
    }

    /// Plan an itinerary over the given events.
    ///
    /// Stored user preferences fill in when the constraints carry none.
    /// A raw (unparsable) plan is persisted before being returned so the
    /// text survives the request.
    #[instrument(skip(self, events, constraints), fields(events = events.len()))]
    pub async fn plan_itinerary(
        &self,
        events: &[Event],
        constraints: &ItineraryConstraints,
    ) -> anyhow::Result<PlanOutcome> {
        let constraints = self.with_stored_preferences(constraints).await;
        let outcome = self.planner.plan(events, &constraints).await?;

        if let PlanOutcome::Raw(text) = &outcome {
            if let Err(e) = self
                .store
                .put(LAST_RAW_ITINERARY_KEY, Value::String(text.clone()), BOOKKEEPING_TTL)
                .await
            {
                warn!("Failed to persist raw itinerary text: {}", e);
            }
        }

        Ok(outcome)
    }

    /// Remember user preferences for future planning requests
    pub async fn save_preferences(&self, preferences: &str) -> anyhow::Result<()> {
        self.store
            .put(
                USER_PREFERENCES_KEY,
                Value::String(preferences.to_string()),
                BOOKKEEPING_TTL,
            )
            .await
    }

    async fn with_stored_preferences(
        &self,
        constraints: &ItineraryConstraints,
    ) -> ItineraryConstraints {
        let mut constraints = constraints.clone();
        if constraints.user_preferences.is_none() {
            match self.store.get(USER_PREFERENCES_KEY).await {
                Ok(Some(Value::String(preferences))) => {
                    debug!("Applying stored user preferences");
                    constraints.user_preferences = Some(preferences);
                }
                Ok(_) => {}
                Err(e) => warn!("Preference lookup failed: {}", e),
            }
        }
        constraints
    }
}
