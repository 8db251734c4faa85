//! Live round registry with per-session locking and TTL eviction.

pub mod config;
pub mod registry;

pub use config::SessionConfig;
pub use registry::SessionRegistry;
