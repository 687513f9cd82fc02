//! # Collectarium Backend Library
//!
//! REST backend for a collection-management web application. Users keep
//! collections of items; items carry likes and custom fields and can be commented on;
//! a global tag list is shared by all users.
//!
//! ## Architecture
//!
//! - **Axum**: HTTP server and routing
//! - **SQLx**: SQLite, used as a JSON document store
//! - **Tokio**: async runtime
//! - **Serde**: JSON documents and request bodies
//!
//! ## Core Components
//!
//! - [`config`]: layered configuration (defaults, file, environment)
//! - [`db`]: connection setup and schema initialization
//! - [`error`]: the single error-to-HTTP mapping
//! - [`hooks`]: collection bookkeeping triggered by item writes
//! - [`metrics`]: document counters
//! - [`middleware`]: CORS and security headers
//! - [`routes`]: HTTP handlers and the router
//! - [`state`]: shared application state
//! - [`store`]: the document store seam and its SQLite implementation
//! - [`types`]: request and document types
//! - [`validation`]: request body and identifier validation

pub mod config;
pub mod db;
pub mod error;
pub mod hooks;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod tests;
