//! Itinerary synthesis via the generative model
//!
//! Builds a single natural-language instruction embedding the event set,
//! optional user preferences, and every numeric constraint, then parses the
//! model's GeoJSON-shaped answer leniently. Budget and time are soft upper
//! bounds communicated to the model; the pipeline performs no arithmetic
//! verification of the model's output.

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::models::{Coordinates, Event, Itinerary, ItineraryConstraints, Leg, LegSource};
use crate::providers::GenerativeTextProvider;
use crate::sanitize::{Sanitized, sanitize_and_parse};

/// Result of one planning request.
///
/// `Raw` carries the model's unparsed text; the caller persists it for
/// inspection or manual correction rather than discarding it.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    Planned(Itinerary),
    Raw(String),
}

/// Synthesizes itineraries from enriched events and constraints
pub struct ItineraryPlanner {
    model: Arc<dyn GenerativeTextProvider>,
}

impl ItineraryPlanner {
    pub fn new(model: Arc<dyn GenerativeTextProvider>) -> Self {
        Self { model }
    }

    /// Plan an itinerary under the given constraints.
    ///
    /// Provider failure is a real error; an unparsable response is not and
    /// degrades to `PlanOutcome::Raw`.
    #[instrument(skip(self, events, constraints), fields(events = events.len()))]
    pub async fn plan(
        &self,
        events: &[Event],
        constraints: &ItineraryConstraints,
    ) -> anyhow::Result<PlanOutcome> {
        let prompt = build_prompt(events, constraints);
        let text = self
            .model
            .generate(&prompt)
            .await
            .map_err(|e| anyhow::anyhow!("itinerary generation failed: {e}"))?;

        match sanitize_and_parse(&text) {
            Sanitized::Parsed(value) => match parse_feature_collection(value) {
                Some(itinerary) => {
                    debug!("Planned itinerary with {} legs", itinerary.legs.len());
                    Ok(PlanOutcome::Planned(itinerary))
                }
                None => {
                    warn!("Model output parsed as JSON but not as an itinerary");
                    Ok(PlanOutcome::Raw(text))
                }
            },
            Sanitized::Raw(raw) => {
                warn!("Unparsable itinerary response, returning raw text");
                Ok(PlanOutcome::Raw(raw))
            }
        }
    }
}

fn build_prompt(events: &[Event], constraints: &ItineraryConstraints) -> String {
    let events_json = serde_json::to_string(events).unwrap_or_default();
    let preferences = constraints
        .user_preferences
        .as_deref()
        .map(|p| format!("Take these traveler preferences into account: {p}. "))
        .unwrap_or_default();

    let day_structure = if constraints.is_single_day() {
        format!(
            "The entire trip takes place on {}. ",
            constraints.start_date
        )
    } else {
        format!(
            "The trip spans {} to {}; structure the itinerary day by day, \
             grouping each day's legs together in chronological order. ",
            constraints.start_date, constraints.end_date
        )
    };

    format!(
        "Based on all the events that are happening around my location which is {start}, \
         create a comprehensive itinerary about things I can do in a defined time period. \
         You should ensure that the entire trip (including transport and event duration) \
         is less than or equal to {time} hours and the total budget of the trip is less \
         than or equal to {budget} dollars. \
         {day_structure}{preferences}\
         In addition to your own knowledge of events that are happening, include restaurants \
         and public spaces if needed in your output. The events under consideration are: {events}. \
         Ensure that you design the entire itinerary using {transport} transport and include \
         that in your output. The start and end location should be {start}. \
         Your output must be in a geoJSON format: a FeatureCollection where each feature \
         details the name of the place, location (coordinates), description, time since start \
         in hours, mode of transport to get there from the previous location, cost for this \
         segment, and a source field set to \"from_event\" when the stop comes from the event \
         list and \"generated\" otherwise. \
         Include the total estimated cost and time of the entire journey as total_cost and \
         total_time properties of the collection. \
         Output only the geojson data and nothing else. Do not include any notes at the end.",
        start = constraints.start_location,
        time = constraints.total_time_hours,
        budget = constraints.total_budget,
        transport = constraints.transport_mode,
        events = events_json,
    )
}

#[derive(Debug, Default, Deserialize)]
struct RawFeatureCollection {
    #[serde(default)]
    features: Vec<RawFeature>,
    #[serde(default)]
    properties: Option<RawTotals>,
    #[serde(default, alias = "total_estimated_cost")]
    total_cost: Option<f64>,
    #[serde(default, alias = "total_estimated_time", alias = "total_time_hours")]
    total_time: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTotals {
    #[serde(default, alias = "total_estimated_cost")]
    total_cost: Option<f64>,
    #[serde(default, alias = "total_estimated_time", alias = "total_time_hours")]
    total_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: RawLegProperties,
}

#[derive(Debug, Default, Deserialize)]
struct RawGeometry {
    #[serde(default)]
    coordinates: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLegProperties {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(
        default,
        alias = "time_since_start",
        alias = "time_offset",
        alias = "time_since_start_hours"
    )]
    time_offset_hours: Option<f64>,
    #[serde(default, alias = "mode_of_transport")]
    transport: Option<String>,
    #[serde(default)]
    cost: Option<f64>,
    #[serde(default)]
    source: Option<String>,
}

/// Interpret a parsed JSON value as a GeoJSON-shaped itinerary.
///
/// Lenient on property names and missing fields; returns `None` when the
/// value has no usable features at all.
fn parse_feature_collection(value: Value) -> Option<Itinerary> {
    let collection: RawFeatureCollection = serde_json::from_value(value).ok()?;
    if collection.features.is_empty() {
        return None;
    }

    let mut legs: Vec<Leg> = collection
        .features
        .into_iter()
        .map(|feature| {
            // GeoJSON coordinates are [longitude, latitude]
            let coordinates = feature.geometry.and_then(|g| {
                if g.coordinates.len() == 2 {
                    Some(Coordinates::new(g.coordinates[1], g.coordinates[0]))
                } else {
                    None
                }
            });

            let source = match feature.properties.source.as_deref() {
                Some("from_event") => LegSource::FromEvent,
                _ => LegSource::Generated,
            };

            Leg {
                name: feature.properties.name.unwrap_or_else(|| "Unnamed stop".to_string()),
                coordinates,
                description: feature.properties.description,
                source,
                time_offset_hours: feature.properties.time_offset_hours.unwrap_or(0.0),
                transport: feature.properties.transport,
                cost: feature.properties.cost.unwrap_or(0.0),
            }
        })
        .collect();

    legs.sort_by(|a, b| {
        a.time_offset_hours
            .partial_cmp(&b.time_offset_hours)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let totals = collection.properties.unwrap_or_default();
    let total_cost = collection
        .total_cost
        .or(totals.total_cost)
        .unwrap_or_else(|| legs.iter().map(|leg| leg.cost).sum());
    let total_time_hours = collection
        .total_time
        .or(totals.total_time)
        .unwrap_or_else(|| {
            legs.last().map(|leg| leg.time_offset_hours).unwrap_or(0.0)
        });

    Some(Itinerary {
        legs,
        total_cost,
        total_time_hours,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::models::TransportMode;
    use crate::providers::ProviderResult;

    struct CannedModel {
        response: String,
    }

    #[async_trait]
    impl GenerativeTextProvider for CannedModel {
        async fn generate(&self, _prompt: &str) -> ProviderResult<String> {
            Ok(self.response.clone())
        }
    }

    fn constraints() -> ItineraryConstraints {
        ItineraryConstraints {
            total_time_hours: 6.0,
            total_budget: 150.0,
            transport_mode: TransportMode::Public,
            start_location: "Austin, Texas".to_string(),
            start_date: "2025-03-15".to_string(),
            end_date: "2025-03-15".to_string(),
            user_preferences: None,
        }
    }

    const GEOJSON_RESPONSE: &str = r#"{
        "type": "FeatureCollection",
        "total_cost": 85.0,
        "total_time": 5.5,
        "features": [
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-97.7431, 30.2672]},
                "properties": {
                    "name": "Food Fair",
                    "description": "Street food market",
                    "time_since_start": 2.5,
                    "mode_of_transport": "bus",
                    "cost": 35.0,
                    "source": "from_event"
                }
            },
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-97.75, 30.26]},
                "properties": {
                    "name": "Riverside Walk",
                    "time_since_start": 0.5,
                    "mode_of_transport": "walk",
                    "cost": 0.0,
                    "source": "generated"
                }
            }
        ]
    }"#;

    #[tokio::test]
    async fn test_geojson_response_is_parsed_and_legs_sorted() {
        let planner = ItineraryPlanner::new(Arc::new(CannedModel {
            response: GEOJSON_RESPONSE.to_string(),
        }));
        let outcome = planner.plan(&[], &constraints()).await.unwrap();

        let itinerary = match outcome {
            PlanOutcome::Planned(itinerary) => itinerary,
            PlanOutcome::Raw(text) => panic!("expected planned itinerary, got raw: {text}"),
        };

        assert_eq!(itinerary.legs.len(), 2);
        // sorted by time offset, not response order
        assert_eq!(itinerary.legs[0].name, "Riverside Walk");
        assert_eq!(itinerary.legs[0].source, LegSource::Generated);
        assert_eq!(itinerary.legs[1].name, "Food Fair");
        assert_eq!(itinerary.legs[1].source, LegSource::FromEvent);
        // GeoJSON [lon, lat] mapped back to (lat, lon)
        assert_eq!(
            itinerary.legs[1].coordinates,
            Some(Coordinates::new(30.2672, -97.7431))
        );
        assert_eq!(itinerary.total_cost, 85.0);
        assert_eq!(itinerary.total_time_hours, 5.5);
    }

    #[tokio::test]
    async fn test_fenced_response_is_repaired() {
        let planner = ItineraryPlanner::new(Arc::new(CannedModel {
            response: format!("```json\n{GEOJSON_RESPONSE}\n```"),
        }));
        let outcome = planner.plan(&[], &constraints()).await.unwrap();
        assert!(matches!(outcome, PlanOutcome::Planned(_)));
    }

    #[tokio::test]
    async fn test_prose_response_degrades_to_raw() {
        let prose = "Unfortunately I couldn't plan a trip for those dates.";
        let planner = ItineraryPlanner::new(Arc::new(CannedModel {
            response: prose.to_string(),
        }));
        let outcome = planner.plan(&[], &constraints()).await.unwrap();
        assert_eq!(outcome, PlanOutcome::Raw(prose.to_string()));
    }

    #[tokio::test]
    async fn test_json_without_features_degrades_to_raw() {
        let planner = ItineraryPlanner::new(Arc::new(CannedModel {
            response: r#"{"message": "no events found"}"#.to_string(),
        }));
        let outcome = planner.plan(&[], &constraints()).await.unwrap();
        assert!(matches!(outcome, PlanOutcome::Raw(_)));
    }

    #[test]
    fn test_missing_totals_fall_back_to_leg_sums() {
        let value: Value = serde_json::from_str(
            r#"{
                "features": [
                    {"properties": {"name": "A", "time_since_start": 1.0, "cost": 10.0}},
                    {"properties": {"name": "B", "time_since_start": 3.0, "cost": 20.0}}
                ]
            }"#,
        )
        .unwrap();
        let itinerary = parse_feature_collection(value).unwrap();
        assert_eq!(itinerary.total_cost, 30.0);
        assert_eq!(itinerary.total_time_hours, 3.0);
    }

    #[test]
    fn test_single_day_prompt_mentions_the_day() {
        let prompt = build_prompt(&[], &constraints());
        assert!(prompt.contains("takes place on 2025-03-15"));
        assert!(prompt.contains("less than or equal to 6 hours"));
        assert!(prompt.contains("less than or equal to 150 dollars"));
        assert!(prompt.contains("public transport"));
    }

    #[test]
    fn test_multi_day_prompt_requests_per_day_structure() {
        let mut multi_day = constraints();
        multi_day.end_date = "2025-03-17".to_string();
        let prompt = build_prompt(&[], &multi_day);
        assert!(prompt.contains("spans 2025-03-15 to 2025-03-17"));
        assert!(prompt.contains("day by day"));
    }

    #[test]
    fn test_preferences_are_embedded_when_present() {
        let mut with_preferences = constraints();
        with_preferences.user_preferences = Some("vegetarian food, live music".to_string());
        let prompt = build_prompt(&[], &with_preferences);
        assert!(prompt.contains("vegetarian food, live music"));
    }
}
