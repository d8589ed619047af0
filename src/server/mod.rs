//! HTTP host surface

pub mod http;

pub use http::{run, serve, AppState, HealthResponse};
