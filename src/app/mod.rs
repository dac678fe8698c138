//! Application layer containing configuration, shared state and services.

pub mod config;
pub mod service;
pub mod state;

pub use config::{AppConfig, HttpPolicy, RateLimitConfig, SecurityConfig};
pub use service::AppService;
pub use state::AppState;
