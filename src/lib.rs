//! Robot accounts: scoped, expiring machine credentials for a multi-tenant
//! registry.
//!
//! Each robot belongs to exactly one project, carries an explicit list of
//! permission grants and authenticates with a bearer secret that is shown
//! once at creation (or regeneration) and only ever stored as a hash.
//!
//! Layers, leaves first:
//! - [`models`]: value types, validation rules and the query contract
//! - [`db`]: the persistence contract with in-memory and SQLite stores
//! - [`authz`]: the authorization engine that owns grants and project ownership
//! - [`services`]: [`RobotService`](services::RobotService), the lifecycle manager
//! - [`config`] and `observability`: TOML configuration and logging setup

pub mod authz;
pub mod config;
pub mod db;
pub mod models;
#[cfg(feature = "logging")]
pub mod observability;
pub mod services;

pub use config::RobotsConfig;
pub use models::{CreateRobot, Policy, Robot, RobotCredential, RobotQuery};
pub use services::{RobotError, RobotErrorKind, RobotService};
