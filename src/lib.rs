pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use {services::coordinator::Coordinator, std::sync::Arc};

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
}
