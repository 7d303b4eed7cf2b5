//! Process-level infrastructure.

pub mod telemetry;

pub use telemetry::init_tracing;
