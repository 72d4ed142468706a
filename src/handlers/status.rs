use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::models::{QueryResult, ReferenceFlight};
use crate::state::CoordinatorState;

pub async fn api_greeting() -> Json<Value> {
    Json(json!({
        "message": "An API for use with your Dapp!"
    }))
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn list_flights(
    State(state): State<Arc<CoordinatorState>>,
) -> Json<QueryResult<Vec<ReferenceFlight>>> {
    Json(QueryResult {
        result: state.reference_flights().to_vec(),
    })
}

/// Index of the most recent `RequestIssued` event; `null` until one is seen.
pub async fn event_index(
    State(state): State<Arc<CoordinatorState>>,
) -> Json<QueryResult<Option<u8>>> {
    Json(QueryResult {
        result: state.last_observed_index().await,
    })
}
