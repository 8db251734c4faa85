//! HTTP front for the blackjack service.
//!
//! The binary in `main.rs` wires configuration, backends and the router
//! together; everything it uses lives here so integration tests can build the
//! same router around in-memory backends.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
