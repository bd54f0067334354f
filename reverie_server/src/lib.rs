//! # Reverie server
//! This crate hosts the HTTP surface of the reverie equipment marketplace. It is responsible for:
//! * Resolving the caller from a bearer JWT and checking their role against each route.
//! * Translating requests into calls on the engine APIs, and engine errors into HTTP status codes.
//! * Wiring the engine's events to the notification feeds.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: The marketplace routes. See [routes](routes/index.html).
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
