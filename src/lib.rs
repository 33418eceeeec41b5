//! Library crate for scramble-board, exposing modules for binaries and tests.

/// Configuration loaded at startup.
pub mod config;
/// Persistence: entities, the store trait and its backends.
pub mod dao;
mod dto;
mod error;
/// HTTP routes.
pub mod routes;
/// Business logic behind the routes.
pub mod services;
/// Shared application state.
pub mod state;
