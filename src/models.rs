//! Core data models for events, constraints, and itineraries

use serde::{Deserialize, Serialize};

/// Geographic coordinates
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinates {
    /// Create new coordinates
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Format coordinates as a display string
    #[must_use]
    pub fn format(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Date information attached to an event listing
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct EventDate {
    /// Start date as reported by the search provider (e.g. "Mar 15")
    #[serde(default)]
    pub start_date: String,
    /// Human-readable date range (e.g. "Sat, Mar 15, 7 - 10 PM")
    #[serde(default)]
    pub when: String,
}

/// Venue details for an event listing
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Venue {
    pub name: String,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub reviews: Option<u32>,
    #[serde(default)]
    pub link: Option<String>,
}

/// A ticket purchase link for an event
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TicketLink {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub link_type: Option<String>,
}

/// One event listing.
///
/// Created by the aggregator from provider output, then mutated in place:
/// the geocode resolver fills `coordinates`, the categorizer fills
/// `category`. `coordinates: None` means unresolved; `category: None`
/// means unassigned. Both are legitimate terminal states, not faults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Event {
    pub title: String,
    #[serde(default)]
    pub date: EventDate,
    /// Address lines; line 0 is the street, the last line is city/state
    #[serde(default)]
    pub address: Vec<String>,
    #[serde(default)]
    pub venue: Option<Venue>,
    #[serde(default)]
    pub ticket_links: Vec<TicketLink>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Event {
    /// Key used to deduplicate events across overlapping result pages
    #[must_use]
    pub fn dedup_key(&self) -> (String, String) {
        (self.title.clone(), self.date.start_date.clone())
    }
}

/// Transport mode for itinerary planning
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    Public,
    Private,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportMode::Public => write!(f, "public"),
            TransportMode::Private => write!(f, "private"),
        }
    }
}

/// Numeric and textual constraints for one planning request.
///
/// Immutable once built; budget and time are soft upper bounds
/// communicated to the model, never arithmetic the pipeline verifies.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ItineraryConstraints {
    pub total_time_hours: f64,
    pub total_budget: f64,
    pub transport_mode: TransportMode,
    pub start_location: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub user_preferences: Option<String>,
}

impl ItineraryConstraints {
    /// Whether the request covers a single day (picks the single-day prompt mode)
    #[must_use]
    pub fn is_single_day(&self) -> bool {
        self.start_date == self.end_date
    }
}

/// Where an itinerary leg came from
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LegSource {
    /// Suggested by the model from its own knowledge
    Generated,
    /// Drawn from the aggregated event set
    FromEvent,
}

/// One waypoint/segment of a synthesized itinerary
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Leg {
    pub name: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub description: Option<String>,
    pub source: LegSource,
    /// Hours since the start of the trip
    pub time_offset_hours: f64,
    #[serde(default)]
    pub transport: Option<String>,
    pub cost: f64,
}

/// An ordered sequence of legs plus the model's reported totals
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Itinerary {
    pub legs: Vec<Leg>,
    pub total_cost: f64,
    pub total_time_hours: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_deserializes_with_missing_optionals() {
        let json = r#"{"title": "Jazz Night"}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.title, "Jazz Night");
        assert!(event.address.is_empty());
        assert!(event.venue.is_none());
        assert!(event.coordinates.is_none());
        assert!(event.category.is_none());
    }

    #[test]
    fn test_event_dedup_key() {
        let event = Event {
            title: "Jazz Night".to_string(),
            date: EventDate {
                start_date: "Mar 15".to_string(),
                when: "Sat, Mar 15, 7 - 10 PM".to_string(),
            },
            address: vec![],
            venue: None,
            ticket_links: vec![],
            description: None,
            link: None,
            thumbnail: None,
            coordinates: None,
            category: None,
        };
        assert_eq!(
            event.dedup_key(),
            ("Jazz Night".to_string(), "Mar 15".to_string())
        );
    }

    #[test]
    fn test_unresolved_coordinates_are_omitted_from_output() {
        let event: Event = serde_json::from_str(r#"{"title": "A"}"#).unwrap();
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("coordinates"));
        assert!(!json.contains("category"));
    }

    #[test]
    fn test_constraints_single_day() {
        let mut constraints = ItineraryConstraints {
            total_time_hours: 3.0,
            total_budget: 100.0,
            transport_mode: TransportMode::Private,
            start_location: "Austin, Texas".to_string(),
            start_date: "2025-03-15".to_string(),
            end_date: "2025-03-15".to_string(),
            user_preferences: None,
        };
        assert!(constraints.is_single_day());

        constraints.end_date = "2025-03-17".to_string();
        assert!(!constraints.is_single_day());
    }

    #[test]
    fn test_transport_mode_serde() {
        assert_eq!(
            serde_json::to_string(&TransportMode::Public).unwrap(),
            "\"public\""
        );
        let mode: TransportMode = serde_json::from_str("\"private\"").unwrap();
        assert_eq!(mode, TransportMode::Private);
    }

    #[test]
    fn test_coordinates_format() {
        let coords = Coordinates::new(30.2672, -97.7431);
        assert_eq!(coords.format(), "30.2672, -97.7431");
    }
}
