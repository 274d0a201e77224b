//! Cross-service plumbing for Patron services: tracing setup, health
//! endpoints, env-backed configuration, request-id middleware.

pub mod config;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
