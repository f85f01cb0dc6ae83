//! Category enrichment via the generative model
//!
//! One model call labels the whole event set against a closed taxonomy.
//! Enrichment failure is non-destructive: any model or parse failure
//! returns the original events with `category` left unassigned.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::models::Event;
use crate::providers::GenerativeTextProvider;
use crate::sanitize::{Sanitized, sanitize_and_parse};

/// The closed set of category labels events are classified into
pub const CATEGORIES: &[&str] = &[
    "Music",
    "Sports",
    "Arts & Theatre",
    "Food & Drink",
    "Festivals",
    "Nightlife",
    "Family",
    "Community",
    "Other",
];

/// Attaches a category label to each event
pub struct Categorizer {
    model: Arc<dyn GenerativeTextProvider>,
}

impl Categorizer {
    pub fn new(model: Arc<dyn GenerativeTextProvider>) -> Self {
        Self { model }
    }

    /// Categorize every event in one model call.
    ///
    /// Returns the input unchanged (category unassigned) when the model
    /// call fails or the response cannot be parsed.
    #[instrument(skip(self, events), fields(events = events.len()))]
    pub async fn categorize(&self, mut events: Vec<Event>) -> Vec<Event> {
        if events.is_empty() {
            return events;
        }

        let prompt = build_prompt(&events);
        let response = match self.model.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Categorization call failed, leaving events unassigned: {}", e);
                return events;
            }
        };

        match sanitize_and_parse(&response) {
            Sanitized::Parsed(value) => {
                apply_categories(&mut events, &value);
                let assigned = events.iter().filter(|e| e.category.is_some()).count();
                debug!("Assigned categories to {}/{} events", assigned, events.len());
                events
            }
            Sanitized::Raw(_) => {
                warn!("Unparsable categorization response, leaving events unassigned");
                events
            }
        }
    }
}

fn build_prompt(events: &[Event]) -> String {
    let listing: Vec<Value> = events
        .iter()
        .map(|event| {
            serde_json::json!({
                "title": event.title,
                "when": event.date.when,
                "description": event.description,
                "venue": event.venue.as_ref().map(|v| v.name.clone()),
            })
        })
        .collect();

    format!(
        "Assign exactly one category to every event below. \
         The only allowed categories are: {}. \
         Respond with a JSON array of objects, one per event and in the same order, \
         each with a \"title\" field and a \"category\" field. \
         Output only the JSON array and nothing else. The events are: {}",
        CATEGORIES.join(", "),
        serde_json::to_string(&listing).unwrap_or_default()
    )
}

/// Merge a parsed categorization response back into the event list.
///
/// Entries are matched by title when present, falling back to position.
/// Labels outside the taxonomy are ignored, leaving the event unassigned.
fn apply_categories(events: &mut [Event], value: &Value) {
    let items = match value
        .as_array()
        .or_else(|| value.get("events").and_then(Value::as_array))
    {
        Some(items) => items,
        None => return,
    };

    let by_title: std::collections::HashMap<&str, &str> = items
        .iter()
        .filter_map(|item| {
            let title = item.get("title")?.as_str()?;
            let category = item.get("category")?.as_str()?;
            Some((title, category))
        })
        .collect();

    for (idx, event) in events.iter_mut().enumerate() {
        let label = by_title.get(event.title.as_str()).copied().or_else(|| {
            items
                .get(idx)
                .and_then(|item| item.get("category"))
                .and_then(Value::as_str)
        });

        if let Some(label) = label {
            if let Some(canonical) = CATEGORIES.iter().find(|c| c.eq_ignore_ascii_case(label)) {
                event.category = Some((*canonical).to_string());
            }
        }
    }
}
