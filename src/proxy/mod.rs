// proxy module - CMS gateway service

pub mod config;
pub mod server;

pub mod common;
pub mod handlers; // API endpoint handlers
pub mod mappers; // Payload mappers
pub mod middleware; // Axum middleware
pub mod upstream; // Upstream client

pub use config::ProxyConfig;
pub use server::{build_router, AppState, AxumServer};
