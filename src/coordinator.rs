//! Process wiring: bootstrap, then subscriptions, then the query service
//!
//! Nothing past bootstrap starts unless the full oracle pool registered. Once
//! bootstrap succeeds, ledger outages are logged by the subscriptions and never
//! stop the coordinator.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::CoordinatorConfig;
use crate::event_listener::{ActiveSubscriptions, EventSubscriber, SubscriptionPlan};
use crate::ledger::LedgerClient;
use crate::routes;
use crate::services::{BootstrapError, OracleRegistrar, OracleRegistry, ResponseDispatcher};
use crate::state::{AppState, CoordinatorState};

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("oracle bootstrap failed: {0}")]
    Bootstrap(#[from] BootstrapError),
    #[error("query service I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A coordinator whose oracle pool is registered and whose subscriptions are live.
pub struct Coordinator {
    registry: Arc<OracleRegistry>,
    state: Arc<CoordinatorState>,
    subscriptions: ActiveSubscriptions,
    cors_allowed_origins: Vec<String>,
}

impl Coordinator {
    pub async fn start(
        ledger: Arc<dyn LedgerClient>,
        config: &CoordinatorConfig,
        plan: SubscriptionPlan,
    ) -> Result<Self, CoordinatorError> {
        let registrar = OracleRegistrar::new(
            ledger.clone(),
            config.pool_size,
            config.registration_gas_limit,
        );
        let candidates = registrar
            .resolve_candidates(config.oracle_candidates.clone())
            .await?;
        let registry = Arc::new(registrar.bootstrap(&candidates).await?);

        let state = Arc::new(CoordinatorState::default());
        let dispatcher = Arc::new(ResponseDispatcher::new(
            ledger.clone(),
            registry.clone(),
            config.dispatch_max_in_flight,
        ));
        let subscriptions = EventSubscriber::new(ledger, state.clone(), dispatcher)
            .start(plan)
            .await;

        Ok(Self {
            registry,
            state,
            subscriptions,
            cors_allowed_origins: config.cors_allowed_origins.clone(),
        })
    }

    pub fn registry(&self) -> &OracleRegistry {
        &self.registry
    }

    pub fn state(&self) -> &Arc<CoordinatorState> {
        &self.state
    }

    pub fn router(&self) -> Router {
        routes::build_router(AppState::new(self.state.clone()), &self.cors_allowed_origins)
    }

    /// Serve the query API until `shutdown` resolves, then stop subscriptions.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), CoordinatorError> {
        info!(addr = %listener.local_addr()?, "query service listening");

        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;

        self.subscriptions.shutdown().await;
        served.map_err(CoordinatorError::from)
    }
}
