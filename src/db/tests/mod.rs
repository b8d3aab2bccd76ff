//! Shared database repository test infrastructure
//!
//! Each repository has a test module containing shared test functions that
//! take `&dyn XxxRepo`, instantiated once per backend:
//!
//! - **Memory**: the process-local store, always compiled
//! - **SQLite**: in-memory databases with real migrations (`database-sqlite`)

pub mod harness;
