// Observability: logging setup for the binary

pub mod logging;

pub use logging::init_logging;
