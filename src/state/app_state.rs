//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use tokio::sync::RwLock;

use crate::models::{flight, ReferenceFlight};

/// Coordinator state written by event callbacks and read by the query service.
///
/// Readers may observe a value older than the most recently delivered event if
/// the read is scheduled before the callback runs.
#[derive(Debug)]
pub struct CoordinatorState {
    last_observed_index: RwLock<Option<u8>>,
    reference_flights: Vec<ReferenceFlight>,
}

impl CoordinatorState {
    pub fn new(reference_flights: Vec<ReferenceFlight>) -> Self {
        Self {
            last_observed_index: RwLock::new(None),
            reference_flights,
        }
    }

    /// Record the index of a `RequestIssued` event. Last write wins.
    pub async fn record_request_index(&self, index: u8) {
        *self.last_observed_index.write().await = Some(index);
    }

    pub async fn last_observed_index(&self) -> Option<u8> {
        *self.last_observed_index.read().await
    }

    pub fn reference_flights(&self) -> &[ReferenceFlight] {
        &self.reference_flights
    }
}

impl Default for CoordinatorState {
    fn default() -> Self {
        Self::new(flight::reference_flights())
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<CoordinatorState>,
}

impl AppState {
    pub fn new(coordinator: Arc<CoordinatorState>) -> Self {
        Self { coordinator }
    }
}

impl FromRef<AppState> for Arc<CoordinatorState> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.coordinator.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn index_is_unset_until_recorded_then_last_write_wins() {
        let state = CoordinatorState::default();
        assert_eq!(state.last_observed_index().await, None);

        state.record_request_index(3).await;
        state.record_request_index(1).await;
        assert_eq!(state.last_observed_index().await, Some(1));
        assert_eq!(state.reference_flights().len(), 5);
    }
}
