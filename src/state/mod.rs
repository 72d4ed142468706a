//! Process-wide coordinator state

mod app_state;

pub use app_state::{AppState, CoordinatorState};
