//! API handlers for the coordinator query service

mod status;

pub use status::{api_greeting, event_index, health_check, list_flights};
