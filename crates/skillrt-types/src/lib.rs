//! Shared domain types for skillrt.
//!
//! This crate contains the core domain types used across the runtime:
//! skill definitions and records, session snapshots, presence records,
//! tool payloads, runtime configuration, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod presence;
pub mod session;
pub mod skill;
pub mod tool;
