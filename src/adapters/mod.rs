//! Adapters - Implementations of port interfaces.
//!
//! - `memory` - in-process implementations of every port (development, tests)
//! - `postgres` - idempotency keys and reconciliation results in PostgreSQL
//! - `redis` - idempotency keys and run locks shared across instances
//! - `signature` - JWS verification for signed notifications
//! - `settlement` - settlement exports read from a file drop

pub mod memory;
pub mod postgres;
pub mod redis;
pub mod settlement;
pub mod signature;
