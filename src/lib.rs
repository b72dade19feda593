pub mod common;
pub mod config;
pub mod metrics;
pub mod observability;
pub mod parser;

// Layered boundaries: ports and use cases, adapters behind them
pub mod app;
pub mod infra;

// Data shapes shared across layers
pub mod domain;
