pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod models;

pub use api::server::{build_state, create_app, init_tracing, run_server, shutdown_tracing};
pub use api::{ApiError, AppState};
pub use config::AppConfig;
pub use db::{create_lazy_pool, create_pool, with_retry, DatabaseError};
pub use domain::DomainError;
