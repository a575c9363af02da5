//! jobtrace dashboard observer.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! mirror cache, WebSocket infrastructure) so integration tests and the
//! binary entrypoint share them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod mirror;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod ws;
