//! Shared library for the walletscope dashboard: typed rows for the
//! analytics API, the derived-metrics computations behind the dashboard
//! cards, address screening for the wallet console, and the HTTP client
//! that talks to the remote API.

pub mod address;
pub mod client;
pub mod config;
pub mod format;
pub mod metrics;
pub mod observability;
pub mod types;
