//! Flight Oracle Coordinator Library
//!
//! Bootstraps a pool of simulated flight status oracles against the flight
//! status contract, fans their responses out whenever the contract asks, and
//! exposes a small read-only query API over coordinator state.

pub mod config;
pub mod coordinator;
pub mod event_listener;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
