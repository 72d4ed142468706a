//! Oracle pool services: bootstrap, registry and response fan-out

pub mod oracle_registrar;
pub mod oracle_registry;
pub mod response_dispatcher;

pub use oracle_registrar::{BootstrapError, OracleRegistrar};
pub use oracle_registry::{OracleRegistry, OracleRegistryBuilder};
pub use response_dispatcher::{DispatchReport, ResponseDispatcher};
