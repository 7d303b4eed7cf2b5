//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Handlers own retries on optimistic-concurrency conflicts; domain types stay
//! free of I/O.

pub mod handlers;

pub use handlers::*;
