//! `Eventopia` - location-aware event discovery and AI-assisted itinerary planning
//!
//! This library provides the core functionality for aggregating event listings
//! from a search provider, enriching them with geographic coordinates,
//! categorizing them, and synthesizing budget/time-bounded itineraries.

pub mod address;
pub mod aggregator;
pub mod api;
pub mod categorize;
pub mod config;
pub mod error;
pub mod geocode;
pub mod itinerary;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod rate_limit;
pub mod sanitize;
pub mod store;
pub mod web;

// Re-export core types for public API
pub use address::address_candidates;
pub use aggregator::EventAggregator;
pub use categorize::{CATEGORIES, Categorizer};
pub use config::EventopiaConfig;
pub use error::EventopiaError;
pub use geocode::GeocodeResolver;
pub use itinerary::{ItineraryPlanner, PlanOutcome};
pub use models::{Coordinates, Event, Itinerary, ItineraryConstraints, Leg, TransportMode};
pub use pipeline::EventPipeline;
pub use rate_limit::RateGate;
pub use sanitize::{Sanitized, sanitize_and_parse};
pub use store::{DocumentStore, MemoryStore, PersistentStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
