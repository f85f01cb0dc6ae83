//! HTTP API routes
//!
//! Thin JSON layer over the pipeline. Best-effort operations never fail;
//! error responses carry the sanitized `user_message` form of the
//! application error, never provider detail.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::error::EventopiaError;
use crate::itinerary::PlanOutcome;
use crate::models::{Event, ItineraryConstraints};
use crate::pipeline::EventPipeline;

#[derive(Deserialize)]
pub struct EventsRequest {
    pub location: String,
    pub date_range: String,
}

#[derive(Deserialize)]
pub struct CategorizeRequest {
    pub events: Vec<Event>,
}

#[derive(Deserialize)]
pub struct ItineraryRequest {
    pub events: Vec<Event>,
    #[serde(flatten)]
    pub constraints: ItineraryConstraints,
}

#[derive(Deserialize)]
pub struct PreferencesRequest {
    pub preferences: String,
}

type ErrorResponse = (StatusCode, Json<Value>);

fn error_response(status: StatusCode, error: &EventopiaError) -> ErrorResponse {
    (status, Json(json!({"error": error.user_message()})))
}

fn validate_events_request(request: &EventsRequest) -> Result<(), EventopiaError> {
    if request.location.trim().is_empty() {
        return Err(EventopiaError::validation("location must be non-empty"));
    }
    if request.date_range.trim().is_empty() {
        return Err(EventopiaError::validation("date_range must be non-empty"));
    }
    Ok(())
}

pub fn router(pipeline: Arc<EventPipeline>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", post(aggregate_events))
        .route("/events/categorize", post(categorize_events))
        .route("/itinerary", post(plan_itinerary))
        .route("/preferences", post(save_preferences))
        .with_state(pipeline)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "version": crate::VERSION}))
}

async fn aggregate_events(
    State(pipeline): State<Arc<EventPipeline>>,
    Json(request): Json<EventsRequest>,
) -> Result<Json<Vec<Event>>, ErrorResponse> {
    validate_events_request(&request)
        .map_err(|e| error_response(StatusCode::UNPROCESSABLE_ENTITY, &e))?;

    let cancel = CancellationToken::new();
    let events = pipeline
        .aggregate_events(&request.location, &request.date_range, &cancel)
        .await;
    Ok(Json(events))
}

async fn categorize_events(
    State(pipeline): State<Arc<EventPipeline>>,
    Json(request): Json<CategorizeRequest>,
) -> Json<Vec<Event>> {
    Json(pipeline.categorize_events(request.events).await)
}

async fn plan_itinerary(
    State(pipeline): State<Arc<EventPipeline>>,
    Json(request): Json<ItineraryRequest>,
) -> Result<Json<Value>, ErrorResponse> {
    match pipeline
        .plan_itinerary(&request.events, &request.constraints)
        .await
    {
        Ok(PlanOutcome::Planned(itinerary)) => {
            let value = serde_json::to_value(&itinerary).map_err(|e| {
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    &EventopiaError::api(e.to_string()),
                )
            })?;
            Ok(Json(value))
        }
        Ok(PlanOutcome::Raw(text)) => Ok(Json(json!({"raw": text}))),
        Err(e) => {
            error!("Itinerary planning failed: {:#}", e);
            Err(error_response(
                StatusCode::BAD_GATEWAY,
                &EventopiaError::api(e.to_string()),
            ))
        }
    }
}

async fn save_preferences(
    State(pipeline): State<Arc<EventPipeline>>,
    Json(request): Json<PreferencesRequest>,
) -> Result<StatusCode, ErrorResponse> {
    pipeline
        .save_preferences(&request.preferences)
        .await
        .map_err(|e| {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &EventopiaError::store(e.to_string()),
            )
        })?;
    Ok(StatusCode::OK)
}
